//! Node allocators.
//!
//! Node memory itself lives in the sequence's arena; an allocator is the
//! budget that arena draws from. A sequence asks for `allocate(n)` before
//! it materializes nodes, reports `construct`/`destroy` exactly once per
//! node lifetime, and hands the budget back with `deallocate(n)`.
//!
//! The propagation flags decide whether an allocator travels with its
//! contents on copy-assignment, move-assignment and swap. Copy
//! construction always goes through [`NodeAlloc::select_on_copy`].

use core::cell::Cell;
use std::rc::Rc;

/// The allocator could not supply the requested number of nodes.
#[derive(thiserror::Error, Copy, Clone, Debug, Eq, PartialEq)]
#[error("allocator exhausted: requested {requested} node(s), {available} available")]
pub struct AllocError {
    pub requested: usize,
    pub available: usize,
}

/// Allocation contract consumed by [`Sequence`](crate::Sequence) and
/// [`SeqHashMap`](crate::SeqHashMap).
pub trait NodeAlloc: Clone {
    /// Copy-assignment replaces the destination's allocator with the source's.
    const PROPAGATE_ON_COPY_ASSIGN: bool = false;
    /// Move-assignment replaces the destination's allocator with the source's.
    const PROPAGATE_ON_MOVE_ASSIGN: bool = true;
    /// Swap exchanges allocators along with contents.
    const PROPAGATE_ON_SWAP: bool = false;

    /// Reserve budget for `count` nodes.
    fn allocate(&self, count: usize) -> Result<(), AllocError>;

    /// Return budget for `count` nodes previously obtained from `allocate`.
    fn deallocate(&self, count: usize);

    /// Called once after a node's payload has been constructed.
    fn construct(&self) {}

    /// Called once before a node's payload is dropped.
    fn destroy(&self) {}

    /// Allocator used by a copy-constructed container.
    fn select_on_copy(&self) -> Self {
        self.clone()
    }

    /// Whether budget taken from `self` may be returned through `other`.
    fn interchangeable(&self, other: &Self) -> bool;
}

/// Unbounded allocator; node memory comes from the arena's own growth.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Global;

impl NodeAlloc for Global {
    #[inline]
    fn allocate(&self, _count: usize) -> Result<(), AllocError> {
        Ok(())
    }

    #[inline]
    fn deallocate(&self, _count: usize) {}

    #[inline]
    fn interchangeable(&self, _other: &Self) -> bool {
        true
    }
}

#[derive(Debug)]
struct ArenaStorage {
    capacity: usize,
    used: Cell<usize>,
}

/// Fixed-capacity bump budget shared by every clone of the handle.
///
/// Deallocation is a no-op: the budget only comes back when the storage
/// itself is dropped, i.e. when the last clone goes away. Clones share
/// storage, so the allocator propagates on copy, move and swap.
#[derive(Clone, Debug)]
pub struct FixedArena {
    storage: Rc<ArenaStorage>,
}

impl FixedArena {
    pub fn new(capacity: usize) -> Self {
        Self {
            storage: Rc::new(ArenaStorage {
                capacity,
                used: Cell::new(0),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.storage.capacity
    }

    /// Nodes handed out so far, including ones already destroyed.
    pub fn used(&self) -> usize {
        self.storage.used.get()
    }

    pub fn remaining(&self) -> usize {
        self.storage.capacity - self.storage.used.get()
    }
}

impl NodeAlloc for FixedArena {
    const PROPAGATE_ON_COPY_ASSIGN: bool = true;
    const PROPAGATE_ON_MOVE_ASSIGN: bool = true;
    const PROPAGATE_ON_SWAP: bool = true;

    fn allocate(&self, count: usize) -> Result<(), AllocError> {
        let available = self.remaining();
        if count > available {
            return Err(AllocError {
                requested: count,
                available,
            });
        }
        self.storage.used.set(self.storage.used.get() + count);
        Ok(())
    }

    fn deallocate(&self, _count: usize) {}

    fn interchangeable(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.storage, &other.storage)
    }
}
