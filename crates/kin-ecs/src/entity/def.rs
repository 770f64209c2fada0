use std::fmt::{
    Display, Formatter,
};

/// Identifies an entity slot in one [`EntityManager`](crate::manager::EntityManager).
#[derive(Copy, Clone, Debug, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct EntityId {
    /// Slot index in the entity table.
    pub(crate) index: u32,
    /// Generation of the slot at the time this ID was handed out. Generations older than the one
    /// stored in the table mean the entity is already destroyed.
    pub(crate) generation: u32,
}

impl EntityId {
    #[inline]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    #[inline]
    pub const fn index(self) -> u32 {
        self.index
    }

    #[inline]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl Display for EntityId {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}
