use crate::manager::EntityManager;
use kin_common::prelude::*;
use std::any::Any;

/// A per-tick behaviour over the entities of one [`EntityManager`].
///
/// Systems may create, query, mutate, and destroy entities freely during
/// [`update`](System::update). Anything a system wants to remember across ticks is its own state.
pub trait System: 'static {
    fn update(&mut self, entities: &EntityManager, delta: f32) -> anyhow::Result<()>;
}

/// Object-safe access to a registered system as its concrete type.
pub(crate) trait SystemObject: System {
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<S: System> SystemObject for S {
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
}
