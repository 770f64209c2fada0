mod query;
mod unallocated;
mod view;

pub use query::*;
pub use unallocated::*;
pub use view::*;

use crate::{
    component::{
        Component, ComponentBit, ComponentRegistry, ComponentSet, ComponentSink, Family, Pools,
    },
    entity::{
        Alias, Entity, EntityAlias, EntityId, EntityTable, ShapeId,
    },
    EcsError, EcsResult,
};
use kin_common::prelude::*;
use std::{
    cell::{
        Ref, RefCell, RefMut,
    },
    fmt::{
        Debug, Formatter,
    },
    mem,
};

/// Owns the entity table and every component pool, and is the only way to mutate either.
///
/// Every operation takes `&self`: entity handles, views, and component guards all borrow the
/// manager immutably, and exclusivity is checked per component slot at runtime instead. The
/// manager isn't [`Sync`]; it belongs to one thread at a time.
///
/// Destroying an entity whose components are still borrowed kills it at once, but parks the
/// borrowed components until their guards are gone. Parked components are dropped, and their index
/// freed, on the next traversal step or creation.
///
/// ```
/// use kin_ecs::prelude::*;
///
/// #[derive(Component, Property, Debug, Clone, Copy, Default)]
/// struct Health(i32);
/// #[derive(Component, Property, Debug, Clone, Copy, Default)]
/// struct Mana(i32);
///
/// # fn main() -> EcsResult<()> {
/// let entities = EntityManager::new();
/// entities.create_shaped((Health(8), Mana(12)))?;
/// entities.create_with(Health(1))?;
/// entities.create()?;
///
/// entities.each::<(&mut Health, &Mana), _>(|(mut health, mana)| {
///     *health += mana.get();
///     Ok(())
/// })?;
///
/// let total = entities.with::<Health>().iter().map(|e| e.get::<Health>().map(|h| h.get())).sum::<EcsResult<i32>>()?;
/// assert_eq!(total, 21);
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct EntityManager {
    registry: ComponentRegistry,
    table: RefCell<EntityTable>,
    pools: Pools,
    parked: RefCell<Vec<Parked>>,
}

/// Components of a destroyed entity that were borrowed at the time.
struct Parked {
    index: u32,
    reusable: bool,
    bits: Vec<ComponentBit>,
}

impl EntityManager {
    /// Creates a manager with a registry of its own.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a manager sharing `registry`, so that component bits agree with every other
    /// manager using it.
    #[inline]
    pub fn with_registry(registry: ComponentRegistry) -> Self {
        Self {
            registry,
            table: RefCell::default(),
            pools: Pools::default(),
            parked: RefCell::default(),
        }
    }

    #[inline]
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Amount of live entities.
    #[inline]
    pub fn count(&self) -> usize {
        self.table.borrow().live()
    }

    #[inline]
    pub fn is_valid(&self, id: EntityId) -> bool {
        self.table.borrow().valid(id).is_some()
    }

    /// Returns a handle to `id`, signalling [`EcsError::InvalidHandle`] if it's gone.
    pub fn entity(&self, id: EntityId) -> EcsResult<Entity<'_>> {
        if self.is_valid(id) {
            Ok(Entity::new(id, self))
        } else {
            Err(EcsError::InvalidHandle(id))
        }
    }

    /// Returns a handle to whatever is at `index` right now, without checking liveness. If nothing
    /// lives there, the handle is invalid and never becomes valid.
    pub fn at(&self, index: u32) -> Entity<'_> {
        let generation = self.table.borrow().generation_at(index);
        Entity::new(EntityId::new(index, generation), self)
    }

    /// Creates an entity without components, at the lowest free index of the untyped block.
    pub fn create(&self) -> EcsResult<Entity<'_>> {
        self.reclaim();
        let id = {
            let mut table = self.table.borrow_mut();
            let index = table.allocate(ShapeId::UNTYPED)?;
            table.activate(index, Family::new())
        };

        log::trace!("created entity {id}");
        Ok(Entity::new(id, self))
    }

    /// Creates `count` entities without components, in creation order.
    pub fn create_many(&self, count: usize) -> EcsResult<Vec<Entity<'_>>> {
        (0..count).map(|_| self.create()).collect()
    }

    /// Creates `count` entities without components, calling `init` on each right after it's
    /// created. The first error stops creation and is returned; entities created so far stay alive.
    pub fn create_many_with<'m>(
        &'m self,
        count: usize,
        mut init: impl FnMut(Entity<'m>) -> EcsResult<()>,
    ) -> EcsResult<Vec<Entity<'m>>> {
        let mut created = Vec::with_capacity(count);
        for _ in 0..count {
            let entity = self.create()?;
            init(entity)?;
            created.push(entity);
        }

        Ok(created)
    }

    /// Creates an entity holding `components`, allocated in the block of its signature so that
    /// entities of the same signature stay packed together.
    pub fn create_shaped<S: ComponentSet>(&self, components: S) -> EcsResult<Alias<'_, S>> {
        let id = self.spawn(components, true)?;
        Ok(Alias::from_entity(Entity::new(id, self)))
    }

    /// [`create_shaped`](EntityManager::create_shaped), as the alias `A`.
    pub fn create_as<'m, A: EntityAlias<'m>>(&'m self, components: A::Components) -> EcsResult<A> {
        let id = self.spawn(components, true)?;
        Ok(A::from_entity(Entity::new(id, self)))
    }

    /// [`create_as`](EntityManager::create_as) with every component default-constructed.
    #[inline]
    pub fn create_as_default<'m, A: EntityAlias<'m>>(&'m self) -> EcsResult<A>
    where
        A::Components: Default,
    {
        self.create_as(Default::default())
    }

    /// Creates an entity holding `components` in the untyped block, like [`create`](EntityManager::create).
    pub fn create_with<S: ComponentSet>(&self, components: S) -> EcsResult<Entity<'_>> {
        let id = self.spawn(components, false)?;
        Ok(Entity::new(id, self))
    }

    /// [`create_with`](EntityManager::create_with) with every component default-constructed.
    #[inline]
    pub fn create_with_default<S: ComponentSet + Default>(&self) -> EcsResult<Entity<'_>> {
        self.create_with(S::default())
    }

    /// Starts staging components for an entity that doesn't exist yet.
    #[inline]
    pub fn stage(&self) -> UnallocatedEntity<'_> {
        UnallocatedEntity::new(self)
    }

    /// Entities holding at least every component of `S`.
    #[inline]
    pub fn with<S: ComponentSet>(&self) -> View<'_, Alias<'_, S>> {
        View::new(self)
    }

    /// Entities satisfying the alias `A`.
    #[inline]
    pub fn fetch_every<'m, A: EntityAlias<'m>>(&'m self) -> View<'m, A> {
        View::new(self)
    }

    /// Calls `f` with the components `Q` asks for, on every entity holding all of them.
    ///
    /// Only indices below the table's extent at the start are visited, so entities created by `f`
    /// may or may not be seen, and the traversal always ends. The guards of the current entity's
    /// queried components are held during the call, so replacing or removing exactly those signals
    /// [`EcsError::ComponentBorrowed`]; destroying the entity is fine, and its parked components
    /// are dropped right after the call. The first error stops the traversal and is returned.
    pub fn each<'m, Q: Query, F>(&'m self, mut f: F) -> EcsResult<()>
    where
        F: FnMut(Q::Item<'m>) -> EcsResult<()>,
    {
        let Some(required) = Q::required(&self.registry) else { return Ok(()) };

        let end = self.extent();
        let mut cursor = 0;
        while let Some(id) = self.next_match(&mut cursor, end, &required) {
            let result = Q::fetch(Entity::new(id, self)).and_then(&mut f);
            self.reclaim();
            result?;
        }

        Ok(())
    }

    /// One past the highest index ever handed out.
    #[inline]
    pub(crate) fn extent(&self) -> usize {
        self.table.borrow().len()
    }

    #[inline]
    pub(crate) fn next_match(&self, cursor: &mut usize, end: usize, required: &Family) -> Option<EntityId> {
        self.table.borrow().next_match(cursor, end, required)
    }

    pub(crate) fn has<S: ComponentSet>(&self, id: EntityId) -> bool {
        let table = self.table.borrow();
        let Some(slot) = table.valid(id) else { return false };

        self.registry
            .lookup::<S>()
            .is_some_and(|required| slot.family.is_superset(&required))
    }

    /// Checks that `id` is valid and holds every type of `S`, naming the first absent one otherwise.
    pub(crate) fn require<S: ComponentSet>(&self, id: EntityId) -> EcsResult<()> {
        let table = self.table.borrow();
        let slot = table.valid(id).ok_or(EcsError::InvalidHandle(id))?;

        let mut missing = None;
        S::metadata(&mut |type_id, info| {
            if missing.is_none() && !self.registry.get_raw(type_id).is_some_and(|bit| slot.family.contains(bit)) {
                missing = Some(info.name());
            }
        });

        match missing {
            Some(component) => Err(EcsError::MissingComponent { component }),
            None => Ok(()),
        }
    }

    /// Returns the bit of `T` if `id` is valid and holds a `T`.
    fn present<T: Component>(&self, id: EntityId) -> EcsResult<ComponentBit> {
        let table = self.table.borrow();
        let slot = table.valid(id).ok_or(EcsError::InvalidHandle(id))?;

        self.registry
            .get::<T>()
            .filter(|&bit| slot.family.contains(bit))
            .ok_or_else(EcsError::missing::<T>)
    }

    pub(crate) fn component<T: Component>(&self, id: EntityId) -> EcsResult<Ref<'_, T>> {
        let bit = self.present::<T>(id)?;
        self.pools.get::<T>(bit).ok_or_else(EcsError::missing::<T>)?.get(id.index)
    }

    pub(crate) fn component_mut<T: Component>(&self, id: EntityId) -> EcsResult<RefMut<'_, T>> {
        let bit = self.present::<T>(id)?;
        self.pools.get::<T>(bit).ok_or_else(EcsError::missing::<T>)?.get_mut(id.index)
    }

    pub(crate) fn attach<T: Component>(&self, id: EntityId, value: T, replace: bool) -> EcsResult<()> {
        if !self.is_valid(id) {
            return Err(EcsError::InvalidHandle(id));
        }

        let bit = self.registry.register::<T>();
        if !replace && self.table.borrow().valid(id).is_some_and(|slot| slot.family.contains(bit)) {
            return Err(EcsError::duplicate::<T>());
        }

        let replaced = self.pools.get_or_init::<T>(bit)?.insert(id.index, value)?;
        if let Some(slot) = self.table.borrow_mut().valid_mut(id) {
            slot.family.insert(bit);
        }

        log::trace!("attached `{}` to entity {id}", std::any::type_name::<T>());
        drop(replaced);
        Ok(())
    }

    pub(crate) fn detach<T: Component>(&self, id: EntityId) -> EcsResult<T> {
        let bit = self.present::<T>(id)?;
        let value = self.pools
            .get::<T>(bit)
            .ok_or_else(EcsError::missing::<T>)?
            .take(id.index)?
            .ok_or_else(EcsError::missing::<T>)?;

        if let Some(slot) = self.table.borrow_mut().valid_mut(id) {
            slot.family.remove(bit);
        }

        log::trace!("detached `{}` from entity {id}", std::any::type_name::<T>());
        Ok(value)
    }

    pub(crate) fn destroy(&self, id: EntityId) -> EcsResult<()> {
        let (family, reusable) = {
            let mut table = self.table.borrow_mut();
            let family = table
                .valid(id)
                .map(|slot| slot.family.clone())
                .ok_or(EcsError::DoubleDestroy(id))?;

            (family, table.kill(id.index))
        };

        // Dead from here on; whatever can't be dropped yet holds the index until it can.
        let borrowed = self.clear_slots(id.index, family.bits());
        if borrowed.is_empty() {
            if reusable {
                self.table.borrow_mut().release(id.index);
            }

            log::trace!("destroyed entity {id}");
        } else {
            log::trace!("destroyed entity {id}, parking {} borrowed component(s)", borrowed.len());
            self.parked.borrow_mut().push(Parked { index: id.index, reusable, bits: borrowed });
        }

        Ok(())
    }

    /// Drops the components at `index` for every bit in `bits`, returning the bits whose slots are
    /// still borrowed.
    fn clear_slots(&self, index: u32, bits: impl IntoIterator<Item = ComponentBit>) -> Vec<ComponentBit> {
        bits.into_iter()
            .filter(|&bit| self.pools.erased(bit).is_some_and(|pool| pool.clear(index).is_err()))
            .collect()
    }

    /// Drops parked components that aren't borrowed anymore, and frees the indices they held.
    pub(crate) fn reclaim(&self) {
        if self.parked.borrow().is_empty() {
            return;
        }

        let parked = mem::take(&mut *self.parked.borrow_mut());
        let mut remaining = Vec::new();
        for Parked { index, reusable, bits } in parked {
            let bits = self.clear_slots(index, bits);
            if !bits.is_empty() {
                remaining.push(Parked { index, reusable, bits });
            } else if reusable {
                self.table.borrow_mut().release(index);
                log::trace!("reclaimed index {index}");
            }
        }

        self.parked.borrow_mut().extend(remaining);
    }

    fn spawn<S: ComponentSet>(&self, components: S, shaped: bool) -> EcsResult<EntityId> {
        let family = self.registry.family_of::<S>()?;
        let index = self.reserve(&family, shaped)?;

        let mut installer = Installer {
            manager: self,
            index,
            installed: Vec::with_capacity(family.len()),
            error: None,
        };

        components.install(&mut installer);
        let Installer { installed, error, .. } = installer;
        self.commit(index, family, &installed, error)
    }

    /// Reserves a dead index for an entity of `family`, in the block of its shape if `shaped`.
    pub(crate) fn reserve(&self, family: &Family, shaped: bool) -> EcsResult<u32> {
        self.reclaim();
        let mut table = self.table.borrow_mut();
        let shape = if shaped { table.shape_of(family) } else { ShapeId::UNTYPED };
        table.allocate(shape)
    }

    /// Moves `value` into the pool slot of a reserved index, without touching the family.
    pub(crate) fn put<T: Component>(&self, index: u32, value: T) -> EcsResult<ComponentBit> {
        let bit = self.registry.register::<T>();
        let replaced = self.pools.get_or_init::<T>(bit)?.insert(index, value)?;
        debug_assert!(replaced.is_none(), "reserved slot of `{}` wasn't empty", std::any::type_name::<T>());

        Ok(bit)
    }

    /// Finishes creating a reserved index: makes it alive with `family`, or on `error` clears
    /// every `installed` slot and releases the index.
    pub(crate) fn commit(
        &self,
        index: u32,
        family: Family,
        installed: &[ComponentBit],
        error: Option<EcsError>,
    ) -> EcsResult<EntityId> {
        if let Some(error) = error {
            for &bit in installed {
                if let Some(pool) = self.pools.erased(bit) {
                    // Freshly installed and never handed out; can't be borrowed.
                    pool.clear(index).ok();
                }
            }

            self.table.borrow_mut().release(index);
            return Err(error);
        }

        log::trace!("created entity #{index} with {family:?}");
        Ok(self.table.borrow_mut().activate(index, family))
    }
}

impl Debug for EntityManager {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let table = self.table.borrow();
        f.debug_struct("EntityManager")
            .field("live", &table.live())
            .field("slots", &table.len())
            .field("parked", &self.parked.borrow().len())
            .field("registry", &self.registry)
            .finish()
    }
}

struct Installer<'a> {
    manager: &'a EntityManager,
    index: u32,
    installed: Vec<ComponentBit>,
    error: Option<EcsError>,
}

impl ComponentSink for Installer<'_> {
    fn put<T: Component>(&mut self, value: T) {
        if self.error.is_some() {
            return;
        }

        match self.manager.put(self.index, value) {
            Ok(bit) => self.installed.push(bit),
            Err(e) => self.error = Some(e),
        }
    }
}
