use crate::{
    component::ComponentSet,
    entity::Entity,
};
use std::{
    fmt::{
        Debug, Formatter,
    },
    marker::PhantomData,
    ops::Deref,
};

/// A typed handle asserting that its entity holds every type of [`Components`](EntityAlias::Components).
///
/// The assertion is a precondition established on construction, not a stored flag; removing a
/// component later makes it stale. Aliases are usually declared as newtypes with
/// `#[derive(EntityAlias)]`, and add behaviour purely through the component accessors:
///
/// ```
/// use kin_ecs::prelude::*;
///
/// #[derive(Component, Property, Debug, Clone, Copy, Default)]
/// struct Speed(f32);
/// #[derive(Component, Property, Debug, Clone, Copy, Default)]
/// struct Fuel(f32);
///
/// #[derive(EntityAlias, Clone, Copy)]
/// #[alias(Speed, Fuel)]
/// struct Car<'m>(Entity<'m>);
///
/// impl Car<'_> {
///     fn drive(self, speed: f32) -> EcsResult<()> {
///         self.set(Speed(speed))?;
///         *self.get_mut::<Fuel>()? -= speed / 10.0;
///         Ok(())
///     }
/// }
///
/// # fn main() -> EcsResult<()> {
/// let entities = EntityManager::new();
/// let car = entities.create_as::<Car>((Speed(0.0), Fuel(1.0)))?;
/// car.drive(5.0)?;
///
/// assert_eq!(car.get::<Fuel>()?.get(), 0.5);
/// assert_eq!(entities.fetch_every::<Car>().count(), 1);
/// # Ok(())
/// # }
/// ```
pub trait EntityAlias<'m>: Copy {
    /// Component types every entity of this alias holds.
    type Components: ComponentSet;

    fn from_entity(entity: Entity<'m>) -> Self;

    fn entity(&self) -> Entity<'m>;
}

impl<'m> EntityAlias<'m> for Entity<'m> {
    type Components = ();

    #[inline]
    fn from_entity(entity: Entity<'m>) -> Self {
        entity
    }

    #[inline]
    fn entity(&self) -> Entity<'m> {
        *self
    }
}

/// The anonymous alias of the component set `S`, as returned by
/// [`create_shaped`](crate::manager::EntityManager::create_shaped) and
/// [`with`](crate::manager::EntityManager::with).
pub struct Alias<'m, S: ComponentSet> {
    entity: Entity<'m>,
    _marker: PhantomData<fn() -> S>,
}

impl<'m, S: ComponentSet> EntityAlias<'m> for Alias<'m, S> {
    type Components = S;

    #[inline]
    fn from_entity(entity: Entity<'m>) -> Self {
        Self { entity, _marker: PhantomData }
    }

    #[inline]
    fn entity(&self) -> Entity<'m> {
        self.entity
    }
}

impl<S: ComponentSet> Copy for Alias<'_, S> {}

impl<S: ComponentSet> Clone for Alias<'_, S> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: ComponentSet> PartialEq for Alias<'_, S> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.entity == other.entity
    }
}

impl<S: ComponentSet> Eq for Alias<'_, S> {}

impl<'m, S: ComponentSet> Deref for Alias<'m, S> {
    type Target = Entity<'m>;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.entity
    }
}

impl<'m, S: ComponentSet> From<Alias<'m, S>> for Entity<'m> {
    #[inline]
    fn from(alias: Alias<'m, S>) -> Self {
        alias.entity
    }
}

impl<S: ComponentSet> Debug for Alias<'_, S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Alias({})", self.entity.id())
    }
}
