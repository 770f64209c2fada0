use crate::{
    manager::EntityManager,
    system::{
        System, SystemObject,
    },
    EcsError, EcsResult,
};
use kin_common::{
    anyhow::Context,
    prelude::*,
};
use std::{
    any::{
        TypeId,
        type_name,
    },
    fmt::{
        Debug, Formatter,
    },
};

struct SystemEntry {
    name: &'static str,
    system: Box<dyn SystemObject>,
}

/// Runs systems over one [`EntityManager`], at most one system per type, in registration order.
pub struct SystemManager<'m> {
    entities: &'m EntityManager,
    systems: Vec<SystemEntry>,
    indices: FxHashMap<TypeId, usize>,
}

impl<'m> SystemManager<'m> {
    #[inline]
    pub fn new(entities: &'m EntityManager) -> Self {
        Self {
            entities,
            systems: Vec::new(),
            indices: FxHashMap::default(),
        }
    }

    /// The manager every system of this instance updates against.
    #[inline]
    pub fn entities(&self) -> &'m EntityManager {
        self.entities
    }

    /// Registers `system` after every other one. Signals [`EcsError::RegistrationConflict`] if a
    /// system of the same type is already registered, in which case `system` is dropped.
    pub fn add<S: System>(&mut self, system: S) -> EcsResult<()> {
        let name = type_name::<S>();
        if self.indices.contains_key(&TypeId::of::<S>()) {
            return Err(EcsError::RegistrationConflict { system: name, reason: "is already registered" });
        }

        self.indices.insert(TypeId::of::<S>(), self.systems.len());
        self.systems.push(SystemEntry {
            name,
            system: Box::new(system),
        });

        log::debug!("registered system `{name}`");
        Ok(())
    }

    #[inline]
    pub fn add_default<S: System + Default>(&mut self) -> EcsResult<()> {
        self.add(S::default())
    }

    /// Unregisters the system `S` and hands it back. Signals [`EcsError::RegistrationConflict`] if
    /// there's none.
    pub fn remove<S: System>(&mut self) -> EcsResult<S> {
        let name = type_name::<S>();
        let index = self.indices
            .remove(&TypeId::of::<S>())
            .ok_or(EcsError::RegistrationConflict { system: name, reason: "is not registered" })?;

        let entry = self.systems.remove(index);
        for shifted in self.indices.values_mut().filter(|shifted| **shifted > index) {
            *shifted -= 1;
        }

        log::debug!("unregistered system `{name}`");
        entry.system
            .into_any()
            .downcast::<S>()
            .map(|system| *system)
            .map_err(|_| EcsError::RegistrationConflict { system: name, reason: "is registered under another type" })
    }

    #[inline]
    pub fn exists<S: System>(&self) -> bool {
        self.indices.contains_key(&TypeId::of::<S>())
    }

    pub fn get<S: System>(&self) -> Option<&S> {
        let &index = self.indices.get(&TypeId::of::<S>())?;
        self.systems[index].system.as_any().downcast_ref()
    }

    pub fn get_mut<S: System>(&mut self) -> Option<&mut S> {
        let &index = self.indices.get(&TypeId::of::<S>())?;
        self.systems[index].system.as_any_mut().downcast_mut()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Updates every system once, in registration order. Each system sees the changes of the ones
    /// before it. The first failing system aborts the tick.
    pub fn update(&mut self, delta: f32) -> anyhow::Result<()> {
        for entry in &mut self.systems {
            entry.system
                .update(self.entities, delta)
                .with_context(|| format!("system `{}` failed", entry.name))?;
        }

        Ok(())
    }
}

impl Debug for SystemManager<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.systems.iter().map(|entry| entry.name)).finish()
    }
}
