use std::{
    cell::RefCell,
    fmt::{
        Debug, Formatter,
    },
    marker::PhantomData,
    ptr::NonNull,
};

/// An append-only sparse vector of fixed-size chunks, growable through a shared reference.
///
/// Every chunk holds `N` slots and is allocated on first access to any of its slots. Chunks are
/// never moved nor freed before the container itself is dropped, so references handed out by
/// [`get`](ChunkVec::get) and [`get_or_grow`](ChunkVec::get_or_grow) stay valid for as long as the
/// container is borrowed, even while other calls allocate new chunks. Mutation of the slots
/// themselves must go through interior mutability (e.g. `RefCell<T>` or `OnceCell<T>` slots).
pub struct ChunkVec<T, const N: usize> {
    /// Chunk pointers, each one obtained from [`Box::into_raw`] on a `Box<[T]>` of length `N`.
    /// Raw pointers are stored instead of boxes so that moving them around on growth doesn't
    /// assert uniqueness over slots that are currently borrowed.
    chunks: RefCell<Vec<Option<NonNull<[T]>>>>,
    _marker: PhantomData<Box<[T]>>,
}

impl<T, const N: usize> ChunkVec<T, N> {
    /// Amount of slots per chunk.
    pub const CHUNK_LEN: usize = N;

    #[inline]
    pub const fn new() -> Self {
        assert!(N > 0, "chunk length must be non-zero");
        Self {
            chunks: RefCell::new(Vec::new()),
            _marker: PhantomData,
        }
    }

    /// Returns the slot at `index`, or [`None`] if its chunk was never allocated.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        let chunk = self.chunks.borrow().get(index / N).copied().flatten()?;
        // Safety:
        // - The chunk lives until `self` drops, and is never handed out mutably.
        // - `index % N` is always in bounds of a chunk of length `N`.
        Some(unsafe { chunk.as_ref().get_unchecked(index % N) })
    }

    /// Amount of chunks that are currently allocated.
    #[inline]
    pub fn allocated_chunks(&self) -> usize {
        self.chunks.borrow().iter().filter(|chunk| chunk.is_some()).count()
    }

    /// Total amount of addressable slots, including the ones in unallocated chunks.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.chunks.borrow().len() * N
    }

    /// Iterates over every allocated slot along with its index, in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        let chunks = self.chunks.borrow().clone();
        chunks
            .into_iter().enumerate()
            .filter_map(|(i, chunk)| chunk.map(|chunk| (i, chunk)))
            .flat_map(|(i, chunk)| {
                // Safety: Same as in `get()`.
                let slots = unsafe { chunk.as_ref() };
                slots.iter().enumerate().map(move |(offset, slot)| (i * N + offset, slot))
            })
    }
}

impl<T: Default, const N: usize> ChunkVec<T, N> {
    /// Returns the slot at `index`, allocating its chunk filled with default values if needed.
    pub fn get_or_grow(&self, index: usize) -> &T {
        if let Some(slot) = self.get(index) {
            return slot;
        }

        // Construct outside of the borrow; `T::default()` is foreign code.
        let fresh = (0..N).map(|_| T::default()).collect::<Box<[T]>>();
        let chunk_index = index / N;

        let chunk = {
            let mut chunks = self.chunks.borrow_mut();
            if chunks.len() <= chunk_index {
                chunks.resize(chunk_index + 1, None);
            }

            // Safety: `Box::into_raw` never returns null.
            *chunks[chunk_index].get_or_insert_with(|| unsafe { NonNull::new_unchecked(Box::into_raw(fresh)) })
        };

        // Safety: Same as in `get()`.
        unsafe { chunk.as_ref().get_unchecked(index % N) }
    }
}

impl<T, const N: usize> Default for ChunkVec<T, N> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> Drop for ChunkVec<T, N> {
    fn drop(&mut self) {
        for chunk in self.chunks.get_mut().drain(..).flatten() {
            // Safety: Obtained from `Box::into_raw`, and no borrow can outlive `&mut self`.
            drop(unsafe { Box::from_raw(chunk.as_ptr()) });
        }
    }
}

impl<T: Debug, const N: usize> Debug for ChunkVec<T, N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        cell::{
            Cell, RefCell,
        },
        rc::Rc,
    };

    #[derive(Default)]
    struct Counted(Option<Rc<Cell<usize>>>);
    impl Drop for Counted {
        fn drop(&mut self) {
            if let Some(counter) = &self.0 {
                counter.set(counter.get() + 1);
            }
        }
    }

    #[test]
    fn lazy_chunks() {
        let vec = ChunkVec::<RefCell<Option<u32>>, 4>::new();
        assert!(vec.get(0).is_none());
        assert_eq!(vec.allocated_chunks(), 0);

        *vec.get_or_grow(9).borrow_mut() = Some(9);
        // Only the third chunk, [8, 12), is allocated.
        assert_eq!(vec.allocated_chunks(), 1);
        assert_eq!(vec.capacity(), 12);
        assert!(vec.get(0).is_none());
        assert!(vec.get(12).is_none());
        assert_eq!(*vec.get(9).unwrap().borrow(), Some(9));
        assert_eq!(*vec.get(8).unwrap().borrow(), None);

        let indices = vec.iter().map(|(i, _)| i).collect::<Vec<_>>();
        assert_eq!(indices, [8, 9, 10, 11]);
    }

    #[test]
    fn stable_across_growth() {
        let vec = ChunkVec::<RefCell<Option<String>>, 2>::new();
        let first = vec.get_or_grow(0);
        *first.borrow_mut() = Some("kin".to_string());

        // Hold a borrow into the first chunk while allocating many more.
        let held = first.borrow();
        for i in 1..256 {
            *vec.get_or_grow(i).borrow_mut() = Some(i.to_string());
        }

        assert_eq!(held.as_deref(), Some("kin"));
        assert_eq!(vec.get(255).unwrap().borrow().as_deref(), Some("255"));
    }

    #[test]
    fn drops_every_slot() {
        let counter = Rc::new(Cell::new(0));
        {
            let vec = ChunkVec::<RefCell<Counted>, 8>::new();
            for i in [0, 3, 17] {
                *vec.get_or_grow(i).borrow_mut() = Counted(Some(counter.clone()));
            }
        }

        assert_eq!(counter.get(), 3);
    }
}
