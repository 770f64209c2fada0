use kin_common::{
    fixedbitset::FixedBitSet,
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
    hash::{
        Hash, Hasher,
    },
};

/// A value type attachable to entities. Presence of a component on an entity is recorded solely
/// by its [`ComponentBit`] in the entity's [`Family`]. Usually implemented with
/// `#[derive(Component)]`.
pub trait Component: 'static {}

/// The bit position a [`ComponentRegistry`](crate::component::ComponentRegistry) assigned to a
/// component type. Stable for the registry's whole lifetime.
#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct ComponentBit(pub(crate) usize);

impl ComponentBit {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Static metadata of a component type.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ComponentInfo {
    name: &'static str,
}

impl ComponentInfo {
    #[inline]
    pub fn of<T: Component>() -> Self {
        Self { name: type_name::<T>() }
    }

    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

/// The set of component types attached to an entity, or required by a query, as a bit vector
/// indexed by [`ComponentBit`].
#[derive(Clone, Default)]
pub struct Family(FixedBitSet);

impl Family {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn contains(&self, bit: ComponentBit) -> bool {
        self.0.contains(bit.0)
    }

    /// Sets `bit`, returning `false` if it was already set.
    #[inline]
    pub fn insert(&mut self, bit: ComponentBit) -> bool {
        if self.0.contains(bit.0) {
            false
        } else {
            self.0.grow(bit.0 + 1);
            self.0.insert(bit.0);
            true
        }
    }

    /// Clears `bit`, returning `false` if it wasn't set.
    #[inline]
    pub fn remove(&mut self, bit: ComponentBit) -> bool {
        if self.0.contains(bit.0) {
            self.0.set(bit.0, false);
            true
        } else {
            false
        }
    }

    #[inline]
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Whether every bit of `other` is also set in `self`.
    #[inline]
    pub fn is_superset(&self, other: &Family) -> bool {
        self.0.is_superset(&other.0)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.count_ones(..) == 0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.count_ones(..)
    }

    #[inline]
    pub fn bits(&self) -> impl Iterator<Item = ComponentBit> + '_ {
        self.0.ones().map(ComponentBit)
    }

    /// The sorted bit list of this family, used as the key of its allocation shape.
    #[inline]
    pub(crate) fn key(&self) -> Box<[ComponentBit]> {
        self.bits().collect()
    }
}

impl PartialEq for Family {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.is_superset(other) && other.is_superset(self)
    }
}

impl Eq for Family {}

impl Hash for Family {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for bit in self.0.ones() {
            bit.hash(state);
        }
    }
}

impl Debug for Family {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.0.ones()).finish()
    }
}

impl FromIterator<ComponentBit> for Family {
    fn from_iter<I: IntoIterator<Item = ComponentBit>>(iter: I) -> Self {
        let mut family = Self::new();
        for bit in iter {
            family.insert(bit);
        }
        family
    }
}

/// Receives the values of a [`ComponentSet`] one by one, in declaration order.
pub trait ComponentSink {
    fn put<T: Component>(&mut self, value: T);
}

/// A single [`Component`] or a tuple of component sets. Describes a set of types for predicates
/// and allocation shapes, and carries the values when used to construct entities.
pub trait ComponentSet: 'static {
    /// Reports the type of every component in the set, in declaration order.
    fn metadata(callback: &mut impl FnMut(TypeId, ComponentInfo));

    /// Moves every component value of the set into `sink`.
    fn install(self, sink: &mut impl ComponentSink);
}

impl<T: Component> ComponentSet for T {
    #[inline]
    fn metadata(callback: &mut impl FnMut(TypeId, ComponentInfo)) {
        callback(TypeId::of::<T>(), ComponentInfo::of::<T>());
    }

    #[inline]
    fn install(self, sink: &mut impl ComponentSink) {
        sink.put(self);
    }
}

macro_rules! impl_component_set {
    ($($tuple_type:ident $tuple_index:tt),*) => {
        impl<$($tuple_type: ComponentSet,)*> ComponentSet for ($($tuple_type,)*) {
            #[inline]
            #[allow(unused_variables)]
            fn metadata(callback: &mut impl FnMut(TypeId, ComponentInfo)) {
                $($tuple_type::metadata(callback);)*
            }

            #[inline]
            #[allow(unused_variables)]
            fn install(self, sink: &mut impl ComponentSink) {
                $(self.$tuple_index.install(sink);)*
            }
        }
    };
} impl_tuples!(impl_component_set! 8);

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(crate::Component)]
    struct Position(f32, f32);
    #[derive(crate::Component)]
    struct Velocity(f32, f32);

    #[test]
    fn family_bits() {
        let mut family = Family::new();
        assert!(family.is_empty());
        assert!(family.insert(ComponentBit(70)));
        assert!(!family.insert(ComponentBit(70)));
        assert!(family.insert(ComponentBit(2)));
        assert_eq!(family.len(), 2);
        assert_eq!(&*family.key(), &[ComponentBit(2), ComponentBit(70)]);

        let required = [ComponentBit(2)].into_iter().collect::<Family>();
        assert!(family.is_superset(&required));
        assert!(!required.is_superset(&family));
        // Everything is a superset of the empty set.
        assert!(required.is_superset(&Family::new()));

        assert!(family.remove(ComponentBit(70)));
        assert!(!family.remove(ComponentBit(70)));
        assert!(!family.remove(ComponentBit(500)));
        // Differing capacities don't matter, only the set bits do.
        assert_eq!(family, required);
    }

    #[test]
    fn set_metadata() {
        let mut names = Vec::new();
        <(Position, (Velocity,), ())>::metadata(&mut |_, info| names.push(info.name()));
        assert_eq!(names.len(), 2);
        assert!(names[0].ends_with("Position"));
        assert!(names[1].ends_with("Velocity"));

        struct Collect(Vec<&'static str>);
        impl ComponentSink for Collect {
            fn put<T: Component>(&mut self, _: T) {
                self.0.push(type_name::<T>());
            }
        }

        let mut sink = Collect(Vec::new());
        (Velocity(1.0, 0.0), Position(0.0, 0.0)).install(&mut sink);
        assert!(sink.0[0].ends_with("Velocity"));
        assert!(sink.0[1].ends_with("Position"));
    }
}
