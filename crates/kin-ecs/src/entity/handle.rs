use crate::{
    component::{
        Component, ComponentSet,
    },
    entity::{
        EntityAlias, EntityId,
    },
    manager::EntityManager,
    EcsResult,
};
use std::{
    cell::{
        Ref, RefMut,
    },
    cmp::Ordering,
    fmt::{
        Debug, Formatter,
    },
    hash::{
        Hash, Hasher,
    },
};

/// A handle to an entity of an [`EntityManager`]: its [`EntityId`] plus the manager it lives in.
///
/// Handles are plain values; copying one doesn't copy the entity. Every operation first checks the
/// handle's generation against the manager's table, so a handle outliving its entity can never
/// reach the components of whatever entity reuses its index.
#[derive(Copy, Clone)]
pub struct Entity<'m> {
    id: EntityId,
    manager: &'m EntityManager,
}

impl<'m> Entity<'m> {
    #[inline]
    pub(crate) fn new(id: EntityId, manager: &'m EntityManager) -> Self {
        Self { id, manager }
    }

    #[inline]
    pub fn id(self) -> EntityId {
        self.id
    }

    #[inline]
    pub fn manager(self) -> &'m EntityManager {
        self.manager
    }

    /// Whether the entity hasn't been destroyed since this handle was made.
    #[inline]
    pub fn is_valid(self) -> bool {
        self.manager.is_valid(self.id)
    }

    /// Whether every component type of `S` is attached. Always `false` for invalid handles.
    #[inline]
    pub fn has<S: ComponentSet>(self) -> bool {
        self.manager.has::<S>(self.id)
    }

    /// Borrows the component `T`. The entity's `T` can't be replaced or removed while the returned
    /// guard is alive; attempts to do so signal
    /// [`ComponentBorrowed`](crate::EcsError::ComponentBorrowed).
    #[inline]
    pub fn get<T: Component>(self) -> EcsResult<Ref<'m, T>> {
        self.manager.component::<T>(self.id)
    }

    /// Mutably borrows the component `T`, with the same restrictions as [`get`](Entity::get).
    #[inline]
    pub fn get_mut<T: Component>(self) -> EcsResult<RefMut<'m, T>> {
        self.manager.component_mut::<T>(self.id)
    }

    /// Attaches `value`. Signals [`DuplicateComponent`](crate::EcsError::DuplicateComponent) if a
    /// `T` is already attached, in which case `value` is dropped.
    #[inline]
    pub fn add<T: Component>(self, value: T) -> EcsResult<()> {
        self.manager.attach(self.id, value, false)
    }

    /// Attaches `value`, replacing the current `T` if there is one.
    #[inline]
    pub fn set<T: Component>(self, value: T) -> EcsResult<()> {
        self.manager.attach(self.id, value, true)
    }

    /// Detaches `T` and hands it back.
    #[inline]
    pub fn remove<T: Component>(self) -> EcsResult<T> {
        self.manager.detach::<T>(self.id)
    }

    /// Drops every attached component and frees the entity's index. Signals
    /// [`DoubleDestroy`](crate::EcsError::DoubleDestroy) if the entity is already gone.
    ///
    /// The entity is invalid as soon as this returns. Components still borrowed through a guard are
    /// dropped once the guard is released, and only then is the index reused.
    #[inline]
    pub fn destroy(self) -> EcsResult<()> {
        self.manager.destroy(self.id)
    }

    /// Whether the entity currently satisfies the alias `A`.
    #[inline]
    pub fn is<A: EntityAlias<'m>>(self) -> bool {
        self.has::<A::Components>()
    }

    /// Reinterprets this handle as `A` without checking [`is`](Entity::is). Accessing a component
    /// that isn't there through the alias still signals
    /// [`MissingComponent`](crate::EcsError::MissingComponent).
    #[inline]
    pub fn as_alias<A: EntityAlias<'m>>(self) -> A {
        A::from_entity(self)
    }

    /// Reinterprets this handle as `A`, signalling
    /// [`MissingComponent`](crate::EcsError::MissingComponent) with the first absent type if the
    /// entity doesn't satisfy `A`.
    #[inline]
    pub fn assume<A: EntityAlias<'m>>(self) -> EcsResult<A> {
        self.manager.require::<A::Components>(self.id)?;
        Ok(A::from_entity(self))
    }
}

impl PartialEq for Entity<'_> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Entity<'_> {}

impl PartialOrd for Entity<'_> {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entity<'_> {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl Hash for Entity<'_> {
    #[inline]
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Debug for Entity<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.id)
    }
}
