use crate::{
    component::Family,
    entity::{
        Entity, EntityAlias,
    },
    manager::EntityManager,
    EcsResult,
};
use std::{
    fmt::{
        Debug, Formatter,
    },
    iter::FusedIterator,
    marker::PhantomData,
};

/// A restartable sequence of the entities satisfying the alias `E`, in ascending index order.
///
/// A view stores nothing but its manager; every [`iter`](View::iter) resolves the required
/// components anew and scans the entity table from the start, up to its extent at that moment. The
/// table is only borrowed while looking for the next match, so the store may be freely mutated
/// mid-traversal: entities destroyed before being reached are skipped, entities created meanwhile
/// are seen only if they land on a free index the traversal hasn't passed yet.
pub struct View<'m, E: EntityAlias<'m>> {
    manager: &'m EntityManager,
    _marker: PhantomData<fn() -> E>,
}

impl<'m, E: EntityAlias<'m>> View<'m, E> {
    #[inline]
    pub(crate) fn new(manager: &'m EntityManager) -> Self {
        Self { manager, _marker: PhantomData }
    }

    #[inline]
    pub fn manager(&self) -> &'m EntityManager {
        self.manager
    }

    #[inline]
    pub fn iter(&self) -> ViewIter<'m, E> {
        ViewIter {
            manager: self.manager,
            required: self.manager.registry().lookup::<E::Components>(),
            cursor: 0,
            end: self.manager.extent(),
            _marker: PhantomData,
        }
    }

    /// Amount of currently matching entities.
    #[inline]
    pub fn count(&self) -> usize {
        self.iter().count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Calls `f` on every matching entity, stopping at the first error.
    pub fn each(&self, f: impl FnMut(E) -> EcsResult<()>) -> EcsResult<()> {
        self.iter().try_for_each(f)
    }
}

impl<'m, E: EntityAlias<'m>> Copy for View<'m, E> {}

impl<'m, E: EntityAlias<'m>> Clone for View<'m, E> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<'m, E: EntityAlias<'m>> IntoIterator for View<'m, E> {
    type Item = E;
    type IntoIter = ViewIter<'m, E>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'m, E: EntityAlias<'m>> IntoIterator for &View<'m, E> {
    type Item = E;
    type IntoIter = ViewIter<'m, E>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'m, E: EntityAlias<'m>> Debug for View<'m, E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter().map(|alias| alias.entity().id())).finish()
    }
}

/// One traversal of a [`View`].
pub struct ViewIter<'m, E: EntityAlias<'m>> {
    manager: &'m EntityManager,
    /// [`None`] if some required type was never registered, so nothing matches.
    required: Option<Family>,
    cursor: usize,
    end: usize,
    _marker: PhantomData<fn() -> E>,
}

impl<'m, E: EntityAlias<'m>> Iterator for ViewIter<'m, E> {
    type Item = E;

    fn next(&mut self) -> Option<Self::Item> {
        let required = self.required.as_ref()?;
        self.manager.reclaim();

        let id = self.manager.next_match(&mut self.cursor, self.end, required)?;
        Some(E::from_entity(Entity::new(id, self.manager)))
    }
}

impl<'m, E: EntityAlias<'m>> FusedIterator for ViewIter<'m, E> {}
