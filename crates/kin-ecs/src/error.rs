use crate::entity::EntityId;
use thiserror::Error;

/// Contract violations raised synchronously by the entity manager, its handles, and the system
/// manager. None of these are recovered from internally; a failed operation leaves the store as it
/// was before the call.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum EcsError {
    #[error("component `{component}` is not attached")]
    MissingComponent { component: &'static str },
    #[error("component `{component}` is already attached")]
    DuplicateComponent { component: &'static str },
    #[error("component `{component}` is currently borrowed")]
    ComponentBorrowed { component: &'static str },
    #[error("entity {0} is no longer valid")]
    InvalidHandle(EntityId),
    #[error("entity {0} is already destroyed")]
    DoubleDestroy(EntityId),
    #[error("too many entities")]
    TooManyEntities,
    #[error("system `{system}` {reason}")]
    RegistrationConflict { system: &'static str, reason: &'static str },
}

pub type EcsResult<T> = Result<T, EcsError>;

impl EcsError {
    #[inline]
    pub(crate) fn missing<T: ?Sized>() -> Self {
        Self::MissingComponent { component: std::any::type_name::<T>() }
    }

    #[inline]
    pub(crate) fn duplicate<T: ?Sized>() -> Self {
        Self::DuplicateComponent { component: std::any::type_name::<T>() }
    }

    #[inline]
    pub(crate) fn borrowed<T: ?Sized>() -> Self {
        Self::ComponentBorrowed { component: std::any::type_name::<T>() }
    }
}
