use crate::{
    component::{
        Component, ComponentBit, ComponentInfo, ComponentSet, Family,
    },
    EcsError, EcsResult,
};
use kin_common::{
    parking_lot::{
        RwLock, RwLockUpgradableReadGuard,
    },
    prelude::*,
};
use std::{
    any::TypeId,
    fmt::{
        Debug, Formatter,
    },
    sync::Arc,
};

/// Assigns every component type a stable [`ComponentBit`], on first use.
///
/// Cloning a registry yields another handle to the same assignments, so every
/// [`EntityManager`](crate::manager::EntityManager) built from clones of one registry agrees on
/// the bit of each type. Bits are never reassigned nor reclaimed.
#[derive(Clone, Default)]
pub struct ComponentRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

#[derive(Default)]
struct RegistryInner {
    ids: FxHashMap<TypeId, ComponentBit>,
    info: Vec<ComponentInfo>,
}

impl ComponentRegistry {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn register<T: Component>(&self) -> ComponentBit {
        self.register_raw(TypeId::of::<T>(), ComponentInfo::of::<T>())
    }

    /// Type-erased form of [`register`](ComponentRegistry::register). `info` is ignored if
    /// `type_id` is already registered.
    pub fn register_raw(&self, type_id: TypeId, info: ComponentInfo) -> ComponentBit {
        let inner = self.inner.upgradable_read();
        if let Some(&bit) = inner.ids.get(&type_id) {
            return bit;
        }

        let mut inner = RwLockUpgradableReadGuard::upgrade(inner);
        let bit = ComponentBit(inner.info.len());
        inner.info.push(info);
        inner.ids.insert(type_id, bit);

        log::debug!("assigned bit {} to component `{}`", bit.0, info.name());
        bit
    }

    #[inline]
    pub fn get<T: Component>(&self) -> Option<ComponentBit> {
        self.get_raw(TypeId::of::<T>())
    }

    #[inline]
    pub fn get_raw(&self, type_id: TypeId) -> Option<ComponentBit> {
        self.inner.read().ids.get(&type_id).copied()
    }

    #[inline]
    pub fn info(&self, bit: ComponentBit) -> Option<ComponentInfo> {
        self.inner.read().info.get(bit.0).copied()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.read().info.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registers every type of `S` and returns their bits as a family. Signals
    /// [`EcsError::DuplicateComponent`] if `S` names a type more than once.
    pub fn family_of<S: ComponentSet>(&self) -> EcsResult<Family> {
        let mut family = Family::new();
        let mut duplicate = None;

        S::metadata(&mut |type_id, info| {
            if !family.insert(self.register_raw(type_id, info)) {
                duplicate.get_or_insert(info.name());
            }
        });

        match duplicate {
            Some(component) => Err(EcsError::DuplicateComponent { component }),
            None => Ok(family),
        }
    }

    /// Resolves the bits of `S` without registering anything. Returns [`None`] if any type of `S`
    /// was never registered, in which case no entity can possibly hold all of `S`.
    pub fn lookup<S: ComponentSet>(&self) -> Option<Family> {
        let mut types = Vec::new();
        S::metadata(&mut |type_id, _| types.push(type_id));
        self.lookup_raw(types)
    }

    /// Type-erased form of [`lookup`](ComponentRegistry::lookup).
    pub fn lookup_raw(&self, types: impl IntoIterator<Item = TypeId>) -> Option<Family> {
        let inner = self.inner.read();
        types
            .into_iter()
            .map(|type_id| inner.ids.get(&type_id).copied())
            .collect()
    }

    /// Whether both handles share the same assignments.
    #[inline]
    pub fn ptr_eq(&self, other: &ComponentRegistry) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Debug for ComponentRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_map()
            .entries(inner.info.iter().enumerate().map(|(bit, info)| (bit, info.name())))
            .finish()
    }
}
