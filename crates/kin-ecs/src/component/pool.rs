use crate::{
    component::{
        Component, ComponentBit,
    },
    EcsError, EcsResult, BLOCK_SIZE,
};
use kin_common::prelude::*;
use std::{
    any::Any,
    cell::{
        OnceCell, Ref, RefCell, RefMut,
    },
};

/// Per-type component storage, one slot per entity index. Slots are grouped in chunks of
/// [`BLOCK_SIZE`] allocated on first write, so the index blocks of shapes that never hold a `T`
/// cost nothing here.
pub struct ComponentPool<T: Component> {
    slots: ChunkVec<RefCell<Option<T>>, BLOCK_SIZE>,
}

impl<T: Component> ComponentPool<T> {
    #[inline]
    pub fn new() -> Self {
        Self { slots: ChunkVec::new() }
    }

    #[inline]
    fn slot(&self, index: u32) -> Option<&RefCell<Option<T>>> {
        self.slots.get(index as usize)
    }

    pub fn get(&self, index: u32) -> EcsResult<Ref<'_, T>> {
        let slot = self.slot(index).ok_or_else(EcsError::missing::<T>)?;
        let value = slot.try_borrow().map_err(|_| EcsError::borrowed::<T>())?;
        Ref::filter_map(value, Option::as_ref).map_err(|_| EcsError::missing::<T>())
    }

    pub fn get_mut(&self, index: u32) -> EcsResult<RefMut<'_, T>> {
        let slot = self.slot(index).ok_or_else(EcsError::missing::<T>)?;
        let value = slot.try_borrow_mut().map_err(|_| EcsError::borrowed::<T>())?;
        RefMut::filter_map(value, Option::as_mut).map_err(|_| EcsError::missing::<T>())
    }

    /// Stores `value` at `index`, returning the value it replaces. The replaced value is handed back
    /// instead of dropped in place, so that its destructor runs outside of the slot borrow.
    pub fn insert(&self, index: u32, value: T) -> EcsResult<Option<T>> {
        let mut slot = self.slots
            .get_or_grow(index as usize)
            .try_borrow_mut()
            .map_err(|_| EcsError::borrowed::<T>())?;
        Ok(slot.replace(value))
    }

    pub fn take(&self, index: u32) -> EcsResult<Option<T>> {
        match self.slot(index) {
            Some(slot) => Ok(slot.try_borrow_mut().map_err(|_| EcsError::borrowed::<T>())?.take()),
            None => Ok(None),
        }
    }

    /// Amount of slots currently holding a value.
    pub fn len(&self) -> usize {
        self.slots
            .iter()
            .filter(|(_, slot)| slot.try_borrow().map_or(true, |value| value.is_some()))
            .count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Component> Default for ComponentPool<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

/// Type-erased access to a [`ComponentPool`], for operations that must touch every component of an
/// entity without knowing their types.
pub trait ErasedPool: 'static {
    fn as_any(&self) -> &dyn Any;

    /// Drops the value at `index`, if any. Signals [`EcsError::ComponentBorrowed`] if the slot is
    /// borrowed.
    fn clear(&self, index: u32) -> EcsResult<()>;
}

impl<T: Component> ErasedPool for ComponentPool<T> {
    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn clear(&self, index: u32) -> EcsResult<()> {
        // Taken out first; dropped once the borrow is released.
        let value = self.take(index)?;
        drop(value);
        Ok(())
    }
}

/// Every pool of one entity manager, indexed by [`ComponentBit`]. Pools are created on first
/// attach of their type and live as long as the manager.
#[derive(Default)]
pub(crate) struct Pools {
    pools: ChunkVec<OnceCell<Box<dyn ErasedPool>>, BLOCK_SIZE>,
}

impl Pools {
    #[inline]
    pub fn get<T: Component>(&self, bit: ComponentBit) -> Option<&ComponentPool<T>> {
        self.erased(bit)?.as_any().downcast_ref()
    }

    /// Returns the pool at `bit`, creating it if needed. Signals [`EcsError::MissingComponent`] if
    /// the pool at `bit` holds another type, which means `bit` didn't come from this manager's
    /// registry.
    pub fn get_or_init<T: Component>(&self, bit: ComponentBit) -> EcsResult<&ComponentPool<T>> {
        self.pools
            .get_or_grow(bit.index())
            .get_or_init(|| Box::new(ComponentPool::<T>::new()))
            .as_any()
            .downcast_ref()
            .ok_or_else(EcsError::missing::<T>)
    }

    #[inline]
    pub fn erased(&self, bit: ComponentBit) -> Option<&dyn ErasedPool> {
        self.pools.get(bit.index())?.get().map(|pool| &**pool)
    }
}
