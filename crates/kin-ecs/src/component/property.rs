use std::{
    mem,
    ops::{
        AddAssign, SubAssign,
    },
};

/// Numeric values that can be stepped by one.
pub trait Step: Copy + AddAssign + SubAssign {
    fn one() -> Self;
}

macro_rules! impl_step {
    ($($int:ty),*) => {
        $(impl Step for $int {
            #[inline]
            fn one() -> Self {
                1 as $int
            }
        })*
    };
}

impl_step!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64);

/// A single-value wrapper that behaves like the value it wraps.
///
/// Usually implemented with `#[derive(Property)]`, which additionally forwards dereferencing,
/// conversions, compound assignment operators, and comparisons against any other property with a
/// comparable value:
///
/// ```
/// use kin_ecs::prelude::*;
///
/// #[derive(Component, Property, Debug, Clone, Copy)]
/// struct Health(i32);
///
/// #[derive(Component, Property, Debug, Clone, Copy)]
/// struct Mana(i32);
///
/// let mut health = Health::from(8);
/// health -= 3;
/// assert_eq!(health.post_inc(), 5);
/// assert_eq!(health.pre_dec(), 5);
///
/// assert!(health < Mana(6));
/// assert_eq!(health, Health(5));
/// assert_eq!(*health + 1, 6);
/// assert_eq!(i32::from(health), 5);
/// ```
pub trait Property: Sized {
    type Value;

    fn value(&self) -> &Self::Value;

    fn value_mut(&mut self) -> &mut Self::Value;

    fn from_value(value: Self::Value) -> Self;

    fn into_value(self) -> Self::Value;

    /// Returns a copy of the wrapped value.
    #[inline]
    fn get(&self) -> Self::Value where Self::Value: Clone {
        self.value().clone()
    }

    /// Replaces the wrapped value, returning the previous one.
    #[inline]
    fn replace(&mut self, value: Self::Value) -> Self::Value {
        mem::replace(self.value_mut(), value)
    }

    /// Increments, then returns the new value.
    #[inline]
    fn pre_inc(&mut self) -> Self::Value where Self::Value: Step {
        let value = self.value_mut();
        *value += Step::one();
        *value
    }

    /// Increments, then returns the old value.
    #[inline]
    fn post_inc(&mut self) -> Self::Value where Self::Value: Step {
        let value = self.value_mut();
        let old = *value;
        *value += Step::one();
        old
    }

    /// Decrements, then returns the new value.
    #[inline]
    fn pre_dec(&mut self) -> Self::Value where Self::Value: Step {
        let value = self.value_mut();
        *value -= Step::one();
        *value
    }

    /// Decrements, then returns the old value.
    #[inline]
    fn post_dec(&mut self) -> Self::Value where Self::Value: Step {
        let value = self.value_mut();
        let old = *value;
        *value -= Step::one();
        old
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Property;

    #[derive(Property, Debug, Clone)]
    struct Name {
        inner: String,
    }

    #[derive(Property, Debug, Clone, Copy)]
    struct Speed(f32);

    #[derive(Property, Debug, Clone, Copy)]
    struct Limit(f32);

    #[derive(Property, Debug, Clone, Copy)]
    struct Wrapper<T>(T);

    #[test]
    fn named_field() {
        let mut name = Name::from("kin".to_string());
        name.push_str("-ecs");
        assert_eq!(name.len(), 7);
        assert_eq!(name.replace("ecs".to_string()), "kin-ecs");
        name += "!";
        assert_eq!(name.get(), "ecs!");
        assert_eq!(String::from(name), "ecs!");
    }

    #[test]
    fn arithmetic() {
        let mut speed = Speed(1.5);
        speed *= 2.0;
        speed -= 1.0;
        speed /= 4.0;
        assert_eq!(speed.get(), 0.5);
        assert_eq!(speed.pre_inc(), 1.5);
        assert_eq!(speed.post_dec(), 1.5);
        assert_eq!(speed.into_value(), 0.5);

        let mut counter = Wrapper(7u8);
        counter %= 4;
        assert_eq!(counter.post_inc(), 3);
        assert_eq!(*counter, 4);
        counter += 1;
        assert_eq!(counter.0, 5);
    }

    #[test]
    fn cross_comparison() {
        let speed = Speed(3.0);
        assert!(speed < Limit(4.0));
        assert!(speed >= Limit(3.0));
        assert_eq!(speed, Limit(3.0));
        assert_ne!(speed, Wrapper(2.0f32));
        assert_eq!(Wrapper(2.0f32), Speed(2.0));
        assert!(*speed > 2.0);
    }
}
