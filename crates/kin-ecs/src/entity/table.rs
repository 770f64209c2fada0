use crate::{
    component::{
        ComponentBit, Family,
    },
    entity::EntityId,
    EcsError, EcsResult, BLOCK_SIZE,
};
use kin_common::prelude::*;
use std::{
    cmp::Reverse,
    collections::BinaryHeap,
};

const BLOCK: u32 = BLOCK_SIZE as u32;

/// Generation no live entity ever has. An index whose generation reaches it is never reused.
pub(crate) const EXPIRED: u32 = u32::MAX;

/// Identifies an allocation shape, i.e. the set of component types entities were created with.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub(crate) struct ShapeId(usize);

impl ShapeId {
    /// The shape of entities created without a signature. Owns the very first block.
    pub const UNTYPED: Self = Self(0);
}

#[derive(Clone, Default)]
pub(crate) struct Slot {
    pub generation: u32,
    pub alive: bool,
    pub family: Family,
    shape: ShapeId,
}

struct Shape {
    /// Freed indices of this shape's blocks, lowest first.
    free: BinaryHeap<Reverse<u32>>,
    /// Next never-used index of the current block.
    cursor: u32,
    /// End of the current block, exclusive.
    end: u32,
}

impl Shape {
    #[inline]
    fn empty() -> Self {
        Self {
            free: BinaryHeap::new(),
            cursor: 0,
            end: 0,
        }
    }
}

/// Per-index liveness, generation, and family of every entity, along with the block allocator.
///
/// The index space is carved into blocks of [`BLOCK_SIZE`], each owned by exactly one shape.
/// Entities created with the same component signature are thus packed into the same blocks, which
/// keeps their components in the same pool chunks.
pub(crate) struct EntityTable {
    slots: Vec<Slot>,
    shapes: Vec<Shape>,
    shape_ids: FxHashMap<Box<[ComponentBit]>, ShapeId>,
    next_block: u32,
    live: usize,
}

impl Default for EntityTable {
    fn default() -> Self {
        let mut shape_ids = FxHashMap::default();
        shape_ids.insert(Box::default(), ShapeId::UNTYPED);

        Self {
            slots: Vec::new(),
            shapes: vec![Shape {
                free: BinaryHeap::new(),
                cursor: 0,
                end: BLOCK,
            }],
            shape_ids,
            next_block: 1,
            live: 0,
        }
    }
}

impl EntityTable {
    /// Amount of live entities.
    #[inline]
    pub fn live(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn slot(&self, index: u32) -> Option<&Slot> {
        self.slots.get(index as usize)
    }

    /// Returns the slot `id` refers to, if it's still alive and of the same generation.
    #[inline]
    pub fn valid(&self, id: EntityId) -> Option<&Slot> {
        self.slot(id.index).filter(|slot| slot.alive && slot.generation == id.generation)
    }

    #[inline]
    pub fn valid_mut(&mut self, id: EntityId) -> Option<&mut Slot> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.alive && slot.generation == id.generation)
    }

    /// Generation of the entity living at `index`, or [`EXPIRED`] if none does.
    #[inline]
    pub fn generation_at(&self, index: u32) -> u32 {
        self.slot(index).filter(|slot| slot.alive).map_or(EXPIRED, |slot| slot.generation)
    }

    /// Returns the shape whose signature is exactly `family`, creating it if needed.
    pub fn shape_of(&mut self, family: &Family) -> ShapeId {
        if family.is_empty() {
            return ShapeId::UNTYPED;
        }

        let key = family.key();
        if let Some(&id) = self.shape_ids.get(&key) {
            return id;
        }

        let id = ShapeId(self.shapes.len());
        log::debug!("new allocation shape #{} for {family:?}", id.0);

        self.shapes.push(Shape::empty());
        self.shape_ids.insert(key, id);
        id
    }

    /// Reserves an index for `shape`: its lowest freed index, else the next index of its current
    /// block, else the first index of a fresh block. The slot stays dead until
    /// [`activate`](EntityTable::activate)-d, or goes back to the free list on
    /// [`release`](EntityTable::release).
    ///
    /// Signals [`EcsError::TooManyEntities`] if the `u32` index space is exhausted.
    pub fn allocate(&mut self, shape: ShapeId) -> EcsResult<u32> {
        let Self { slots, shapes, next_block, .. } = self;
        let owner = &mut shapes[shape.0];

        let index = if let Some(Reverse(index)) = owner.free.pop() {
            index
        } else if owner.cursor < owner.end {
            owner.cursor += 1;
            owner.cursor - 1
        } else {
            let start = next_block
                .checked_mul(BLOCK)
                .filter(|start| start.checked_add(BLOCK - 1).is_some())
                .ok_or(EcsError::TooManyEntities)?;

            log::debug!("shape #{} takes block [{start}, {})", shape.0, start as u64 + BLOCK as u64);
            *next_block += 1;
            owner.cursor = start + 1;
            owner.end = start + BLOCK;
            start
        };

        if slots.len() <= index as usize {
            slots.resize_with(index as usize + 1, Slot::default);
        }

        let slot = &mut slots[index as usize];
        slot.shape = shape;
        Ok(index)
    }

    /// Makes a reserved slot alive with the given family, returning its ID.
    pub fn activate(&mut self, index: u32, family: Family) -> EntityId {
        let slot = &mut self.slots[index as usize];
        slot.alive = true;
        slot.family = family;

        self.live += 1;
        EntityId::new(index, slot.generation)
    }

    /// Returns a reserved, never activated slot to its shape's free list.
    pub fn release(&mut self, index: u32) {
        let shape = self.slots[index as usize].shape;
        self.shapes[shape.0].free.push(Reverse(index));
    }

    /// Kills a live slot: clears its family and bumps its generation. The index isn't freed; returns
    /// whether it may be [`release`](EntityTable::release)-d for reuse, which it may not once its
    /// generation reaches [`EXPIRED`].
    pub fn kill(&mut self, index: u32) -> bool {
        let slot = &mut self.slots[index as usize];
        slot.alive = false;
        slot.family.clear();
        slot.generation += 1;
        self.live -= 1;

        let reusable = slot.generation != EXPIRED;
        if !reusable {
            log::debug!("index {index} ran out of generations and is retired");
        }

        reusable
    }

    /// Finds the first live entity in `*cursor..end` whose family holds every bit of `required`,
    /// and moves the cursor past it.
    pub fn next_match(&self, cursor: &mut usize, end: usize, required: &Family) -> Option<EntityId> {
        let end = end.min(self.slots.len());
        while *cursor < end {
            let slot = &self.slots[*cursor];
            let index = *cursor;
            *cursor += 1;

            if slot.alive && slot.family.is_superset(required) {
                return Some(EntityId::new(index as u32, slot.generation));
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family(bits: &[usize]) -> Family {
        bits.iter().map(|&bit| ComponentBit(bit)).collect()
    }

    fn spawn(table: &mut EntityTable, bits: &[usize]) -> EcsResult<EntityId> {
        let index = table.allocate(ShapeId::UNTYPED)?;
        Ok(table.activate(index, family(bits)))
    }

    fn retire(table: &mut EntityTable, index: u32) {
        if table.kill(index) {
            table.release(index);
        }
    }

    #[test]
    fn untyped_block() -> anyhow::Result<()> {
        let mut table = EntityTable::default();
        let ids = (0..3).map(|_| spawn(&mut table, &[])).collect::<EcsResult<Vec<_>>>()?;

        assert_eq!(ids, [EntityId::new(0, 0), EntityId::new(1, 0), EntityId::new(2, 0)]);
        assert_eq!(table.live(), 3);

        retire(&mut table, 1);
        assert!(table.valid(ids[1]).is_none());
        assert!(table.valid(ids[2]).is_some());
        assert_eq!(table.generation_at(1), EXPIRED);

        // Lowest freed index first, with a bumped generation.
        assert_eq!(spawn(&mut table, &[])?, EntityId::new(1, 1));
        assert_eq!(table.generation_at(1), 1);
        assert!(table.valid(ids[1]).is_none());

        // Never allocated.
        assert_eq!(table.generation_at(1000), EXPIRED);
        Ok(())
    }

    #[test]
    fn shape_blocks() -> anyhow::Result<()> {
        let mut table = EntityTable::default();
        let ab = table.shape_of(&family(&[0, 1]));
        let b = table.shape_of(&family(&[1]));
        assert_ne!(ab, b);
        assert_eq!(table.shape_of(&family(&[1, 0])), ab);
        assert_eq!(table.shape_of(&Family::new()), ShapeId::UNTYPED);

        assert_eq!(table.allocate(ab)?, BLOCK);
        assert_eq!(table.allocate(b)?, 2 * BLOCK);
        assert_eq!(table.allocate(ab)?, BLOCK + 1);
        assert_eq!(table.allocate(ShapeId::UNTYPED)?, 0);

        // Filling up a block moves on to the next free one.
        for i in 2..BLOCK {
            assert_eq!(table.allocate(ab)?, BLOCK + i);
        }
        assert_eq!(table.allocate(ab)?, 3 * BLOCK);

        // Released indices go back to their own shape.
        table.release(BLOCK + 5);
        assert_eq!(table.allocate(b)?, 2 * BLOCK + 1);
        assert_eq!(table.allocate(ab)?, BLOCK + 5);
        assert_eq!(table.live(), 0);
        Ok(())
    }

    #[test]
    fn matching() -> anyhow::Result<()> {
        let mut table = EntityTable::default();
        let families: [&[usize]; 4] = [&[0, 1], &[1], &[], &[0, 1, 2]];
        for bits in families {
            spawn(&mut table, bits)?;
        }
        retire(&mut table, 3);

        let required = family(&[1]);
        let mut cursor = 0;
        let mut found = Vec::new();
        while let Some(id) = table.next_match(&mut cursor, usize::MAX, &required) {
            found.push(id.index());
        }
        assert_eq!(found, [0, 1]);

        let mut cursor = 0;
        assert_eq!(std::iter::from_fn(|| table.next_match(&mut cursor, table.len(), &Family::new())).count(), 3);

        // Nothing at or past the end bound is looked at.
        let mut cursor = 0;
        assert_eq!(table.next_match(&mut cursor, 1, &family(&[1])).map(EntityId::index), Some(0));
        assert_eq!(table.next_match(&mut cursor, 1, &family(&[1])), None);
        assert_eq!(cursor, 1);
        Ok(())
    }

    #[test]
    fn exhaustion() {
        let mut table = EntityTable::default();
        table.next_block = u32::MAX / BLOCK + 1;
        let shape = table.shape_of(&family(&[0]));
        assert_eq!(table.allocate(shape), Err(EcsError::TooManyEntities));

        // The untyped block is still usable.
        assert_eq!(table.allocate(ShapeId::UNTYPED), Ok(0));
    }

    #[test]
    fn expired_generations() -> anyhow::Result<()> {
        let mut table = EntityTable::default();
        let id = spawn(&mut table, &[])?;
        table.slots[0].generation = EXPIRED - 1;

        // The last generation is spent; the index is never handed out again.
        assert!(!table.kill(id.index()));
        assert_eq!(table.generation_at(0), EXPIRED);
        assert_eq!(spawn(&mut table, &[])?.index(), 1);
        assert_eq!(table.live(), 1);
        Ok(())
    }
}
