pub use kin_common_macros;

pub use anyhow;
pub use fixedbitset;
pub use fxhash;
pub use hashbrown;
pub use log;
pub use parking_lot;
pub use thiserror;

mod chunk_vec;
pub use chunk_vec::*;

pub mod prelude {
    pub use kin_common_macros::{
        self,
        impl_tuples,
    };

    pub use anyhow;
    pub use fixedbitset;
    pub use fxhash;
    pub use hashbrown;
    pub use log;
    pub use parking_lot;
    pub use thiserror::Error;

    pub use super::{
        ChunkVec,
        FxHashMap, FxHashSet,
    };
}

use fxhash::FxBuildHasher;
use hashbrown::{
    HashMap, HashSet,
};

/// A [`HashMap`] that uses [`FxHasher`](fxhash::FxHasher) as the hasher for performance gains.
pub type FxHashMap<K, V> = HashMap<K, V, FxBuildHasher>;
/// A [`HashSet`] that uses [`FxHasher`](fxhash::FxHasher) as the hasher for performance gains.
pub type FxHashSet<T> = HashSet<T, FxBuildHasher>;

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use std::any::type_name;

    trait Describe {
        fn names(into: &mut Vec<&'static str>);
    }

    impl Describe for u8 {
        fn names(into: &mut Vec<&'static str>) {
            into.push(type_name::<Self>());
        }
    }

    impl Describe for &'static str {
        fn names(into: &mut Vec<&'static str>) {
            into.push("str");
        }
    }

    macro_rules! impl_describe {
        ($($tuple_type:ident $tuple_index:tt),*) => {
            impl<$($tuple_type: Describe,)*> Describe for ($($tuple_type,)*) {
                #[allow(unused_variables)]
                fn names(into: &mut Vec<&'static str>) {
                    $($tuple_type::names(into);)*
                }
            }
        };
    } impl_tuples!(impl_describe! 6);

    #[test]
    fn impl_tuples() {
        let mut names = Vec::new();
        <(u8, &'static str, (u8, u8))>::names(&mut names);
        assert_eq!(names, ["u8", "str", "u8", "u8"]);

        names.clear();
        <()>::names(&mut names);
        assert!(names.is_empty());
    }

    #[test]
    fn fx_collections() {
        let mut map = FxHashMap::<u32, &str>::default();
        map.insert(3, "three");
        *map.entry(3).or_insert("none") = "trois";
        assert_eq!(map.get(&3), Some(&"trois"));

        let set = [1, 2, 2, 3].into_iter().collect::<FxHashSet<_>>();
        assert_eq!(set.len(), 3);
    }
}
