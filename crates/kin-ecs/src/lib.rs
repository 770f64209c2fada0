extern crate self as kin_ecs;

pub use kin_ecs_macros::{
    self,
    Component, EntityAlias, Property,
};

pub mod component;
pub mod entity;
pub mod manager;
pub mod system;

mod error;
pub use error::*;

/// Granularity of shape-blocked allocation: every component signature passed to
/// [`EntityManager::create_shaped`](manager::EntityManager::create_shaped) owns blocks of this many
/// consecutive indices. Also the chunk length of every component pool.
pub const BLOCK_SIZE: usize = 64;

pub mod prelude {
    pub use kin_ecs_macros::{
        Component, EntityAlias, Property,
    };

    pub use crate::{
        component::{
            Component, ComponentRegistry, ComponentSet, Property, Step,
        },
        entity::{
            Alias, Entity, EntityAlias, EntityId,
        },
        manager::{
            Cloned, EntityManager, Query, UnallocatedEntity, View,
        },
        system::{
            System, SystemManager,
        },
        EcsError, EcsResult,
    };
}
