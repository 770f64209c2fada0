use crate::{
    component::{
        Component, ComponentBit, ComponentInfo, ComponentSet, Family,
    },
    entity::Entity,
    manager::EntityManager,
    EcsError, EcsResult,
};
use kin_common::prelude::*;
use std::{
    any::{
        Any, TypeId,
    },
    fmt::{
        Debug, Formatter,
    },
};

trait Staged: Any {
    fn info(&self) -> ComponentInfo;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    fn install(self: Box<Self>, manager: &EntityManager, index: u32) -> EcsResult<ComponentBit>;
}

impl<T: Component> Staged for T {
    #[inline]
    fn info(&self) -> ComponentInfo {
        ComponentInfo::of::<T>()
    }

    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    #[inline]
    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    #[inline]
    fn install(self: Box<Self>, manager: &EntityManager, index: u32) -> EcsResult<ComponentBit> {
        manager.put(index, *self)
    }
}

/// Components staged for an entity that has no index yet.
///
/// Staging follows the same rules as [`Entity`], but against a local map instead of the pools.
/// [`realize`](UnallocatedEntity::realize)-ing allocates an index in the block of the staged
/// signature and installs every component before the entity becomes visible to views, so a
/// partially-installed entity is never observable.
pub struct UnallocatedEntity<'m> {
    manager: &'m EntityManager,
    staged: FxHashMap<TypeId, Box<dyn Staged>>,
}

impl<'m> UnallocatedEntity<'m> {
    #[inline]
    pub fn new(manager: &'m EntityManager) -> Self {
        Self {
            manager,
            staged: FxHashMap::default(),
        }
    }

    #[inline]
    pub fn manager(&self) -> &'m EntityManager {
        self.manager
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.staged.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    pub fn has<S: ComponentSet>(&self) -> bool {
        let mut all = true;
        S::metadata(&mut |type_id, _| all &= self.staged.contains_key(&type_id));
        all
    }

    pub fn add<T: Component>(&mut self, value: T) -> EcsResult<()> {
        match self.staged.entry(TypeId::of::<T>()) {
            hashbrown::hash_map::Entry::Occupied(..) => Err(EcsError::duplicate::<T>()),
            hashbrown::hash_map::Entry::Vacant(e) => {
                e.insert(Box::new(value));
                Ok(())
            },
        }
    }

    #[inline]
    pub fn set<T: Component>(&mut self, value: T) {
        self.staged.insert(TypeId::of::<T>(), Box::new(value));
    }

    pub fn remove<T: Component>(&mut self) -> EcsResult<T> {
        self.staged
            .remove(&TypeId::of::<T>())
            .and_then(|staged| staged.into_any().downcast::<T>().ok())
            .map(|value| *value)
            .ok_or_else(EcsError::missing::<T>)
    }

    pub fn get<T: Component>(&self) -> EcsResult<&T> {
        self.staged
            .get(&TypeId::of::<T>())
            .and_then(|staged| staged.as_any().downcast_ref())
            .ok_or_else(EcsError::missing::<T>)
    }

    pub fn get_mut<T: Component>(&mut self) -> EcsResult<&mut T> {
        self.staged
            .get_mut(&TypeId::of::<T>())
            .and_then(|staged| staged.as_any_mut().downcast_mut())
            .ok_or_else(EcsError::missing::<T>)
    }

    /// Allocates an entity for the staged signature and moves every staged component into it. On
    /// failure, whatever was installed is dropped and the index is released.
    pub fn realize(self) -> EcsResult<Entity<'m>> {
        let Self { manager, staged } = self;
        let family = staged
            .iter()
            .map(|(&type_id, component)| manager.registry().register_raw(type_id, component.info()))
            .collect::<Family>();

        let index = manager.reserve(&family, true)?;
        let mut installed = Vec::with_capacity(staged.len());
        let mut error = None;

        for component in staged.into_values() {
            match component.install(manager, index) {
                Ok(bit) => installed.push(bit),
                Err(e) => {
                    error = Some(e);
                    break;
                },
            }
        }

        let id = manager.commit(index, family, &installed, error)?;
        Ok(Entity::new(id, manager))
    }
}

impl<'m> TryFrom<UnallocatedEntity<'m>> for Entity<'m> {
    type Error = EcsError;

    #[inline]
    fn try_from(staged: UnallocatedEntity<'m>) -> EcsResult<Self> {
        staged.realize()
    }
}

impl Debug for UnallocatedEntity<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.staged.values().map(|staged| staged.info().name())).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Component,
        BLOCK_SIZE,
    };

    #[derive(Component, Debug, Default, Eq, PartialEq)]
    struct Name(&'static str);
    #[derive(Component, Debug, Default, Eq, PartialEq)]
    struct Health(i32);

    #[test]
    fn staging() -> anyhow::Result<()> {
        let entities = EntityManager::new();
        let mut staged = entities.stage();
        assert!(staged.is_empty());

        staged.add(Name("alice"))?;
        assert_eq!(staged.add(Name("bob")), Err(EcsError::duplicate::<Name>()));
        staged.set(Health(3));
        staged.set(Health(8));
        staged.get_mut::<Health>()?.0 += 1;

        assert_eq!(staged.len(), 2);
        assert!(staged.has::<(Health, Name)>());
        assert_eq!(staged.get::<Health>()?, &Health(9));
        assert_eq!(staged.remove::<Name>()?, Name("alice"));
        assert!(!staged.has::<Name>());
        assert_eq!(staged.remove::<Name>(), Err(EcsError::missing::<Name>()));

        // Nothing touched the manager so far.
        assert_eq!(entities.count(), 0);
        assert!(entities.registry().is_empty());
        Ok(())
    }

    #[test]
    fn realization() -> anyhow::Result<()> {
        let entities = EntityManager::new();
        let plain = entities.create()?;

        let mut staged = entities.stage();
        staged.add(Name("alice"))?;
        staged.add(Health(8))?;
        let alice = Entity::try_from(staged)?;

        // Allocated in the block of its signature.
        assert_eq!(plain.id().index(), 0);
        assert_eq!(alice.id().index(), BLOCK_SIZE as u32);
        assert_eq!(*alice.get::<Name>()?, Name("alice"));
        assert_eq!(alice.get::<Health>()?.0, 8);
        assert_eq!(entities.with::<(Name, Health)>().count(), 1);

        // Same signature, same block, whatever the staging order.
        let mut staged = entities.stage();
        staged.add(Health(12))?;
        staged.add(Name("bob"))?;
        let bob = staged.realize()?;
        assert_eq!(bob.id().index(), BLOCK_SIZE as u32 + 1);

        // An empty staging is a plain entity.
        assert_eq!(entities.stage().realize()?.id().index(), 1);
        assert_eq!(entities.count(), 4);
        Ok(())
    }
}
