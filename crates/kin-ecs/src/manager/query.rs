use crate::{
    component::{
        Component, ComponentRegistry, Family,
    },
    entity::Entity,
    EcsResult,
};
use kin_common::prelude::*;
use std::{
    any::TypeId,
    cell::{
        Ref, RefMut,
    },
    marker::PhantomData,
};

/// Parameters of [`EntityManager::each`](crate::manager::EntityManager::each): what a callable
/// asks for, per matching entity.
///
/// - `&T` borrows the component `T`, as a [`Ref`].
/// - `&mut T` mutably borrows the component `T`, as a [`RefMut`].
/// - [`Cloned<T>`] copies the component `T` out, so changes to the copy stay local.
/// - [`Entity`] is the matching entity itself, and requires nothing.
/// - Tuples of the above require the union of their elements.
pub trait Query {
    type Item<'m>;

    /// Reports the type of every component this query requires.
    fn components(callback: &mut impl FnMut(TypeId));

    fn fetch<'m>(entity: Entity<'m>) -> EcsResult<Self::Item<'m>>;

    /// Resolves the required family, or [`None`] if no entity can match.
    fn required(registry: &ComponentRegistry) -> Option<Family> {
        let mut types = Vec::new();
        Self::components(&mut |type_id| types.push(type_id));
        registry.lookup_raw(types)
    }
}

impl<T: Component> Query for &T {
    type Item<'m> = Ref<'m, T>;

    #[inline]
    fn components(callback: &mut impl FnMut(TypeId)) {
        callback(TypeId::of::<T>());
    }

    #[inline]
    fn fetch<'m>(entity: Entity<'m>) -> EcsResult<Self::Item<'m>> {
        entity.get::<T>()
    }
}

impl<T: Component> Query for &mut T {
    type Item<'m> = RefMut<'m, T>;

    #[inline]
    fn components(callback: &mut impl FnMut(TypeId)) {
        callback(TypeId::of::<T>());
    }

    #[inline]
    fn fetch<'m>(entity: Entity<'m>) -> EcsResult<Self::Item<'m>> {
        entity.get_mut::<T>()
    }
}

impl Query for Entity<'_> {
    type Item<'m> = Entity<'m>;

    #[inline]
    fn components(_: &mut impl FnMut(TypeId)) {}

    #[inline]
    fn fetch<'m>(entity: Entity<'m>) -> EcsResult<Self::Item<'m>> {
        Ok(entity)
    }
}

/// Queries a copy of the component `T` instead of a borrow.
pub struct Cloned<T: Component + Clone>(PhantomData<fn() -> T>);

impl<T: Component + Clone> Query for Cloned<T> {
    type Item<'m> = T;

    #[inline]
    fn components(callback: &mut impl FnMut(TypeId)) {
        callback(TypeId::of::<T>());
    }

    #[inline]
    fn fetch<'m>(entity: Entity<'m>) -> EcsResult<Self::Item<'m>> {
        entity.get::<T>().map(|value| value.clone())
    }
}

macro_rules! impl_query {
    ($($tuple_type:ident $tuple_index:tt),*) => {
        impl<$($tuple_type: Query,)*> Query for ($($tuple_type,)*) {
            type Item<'m> = ($($tuple_type::Item<'m>,)*);

            #[inline]
            #[allow(unused_variables)]
            fn components(callback: &mut impl FnMut(TypeId)) {
                $($tuple_type::components(callback);)*
            }

            #[inline]
            #[allow(unused_variables)]
            fn fetch<'m>(entity: Entity<'m>) -> EcsResult<Self::Item<'m>> {
                Ok(($($tuple_type::fetch(entity)?,)*))
            }
        }
    };
} impl_tuples!(impl_query! 8);
