pub use kin_common as common;
pub use kin_ecs as ecs;

pub mod prelude {
    pub use super::{
        common::prelude::*,
        ecs::prelude::*,
    };
}
