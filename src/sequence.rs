//! Sequence: a sentinel-anchored doubly-linked list whose nodes live in a
//! generational arena.
//!
//! Links are arena keys rather than addresses. A node keeps its key for its
//! whole lifetime, so a [`Handle`] stays valid while the node is relinked
//! anywhere inside the same arena; that is what lets the hash map rewire
//! every entry during a rehash without touching entry storage.
//!
//! The sentinel is not a node. Its forward and backward links are the
//! `first`/`last` fields of a [`Chain`], and `None` in a node's `prev` or
//! `next` means "the sentinel". An empty chain therefore links the sentinel
//! to itself.

use crate::alloc::{Global, NodeAlloc};
use crate::error::Error;
use core::convert::Infallible;
use core::fmt;
use core::iter::FusedIterator;
use slotmap::{DefaultKey, SecondaryMap, SlotMap};

/// Stable, generational reference to one node of a [`Sequence`].
///
/// Handles do not own anything. After the node is erased, every accessor
/// given the stale handle returns `None`, even if the arena slot is reused.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Handle(DefaultKey);

impl Handle {
    pub(crate) fn new(k: DefaultKey) -> Self {
        Handle(k)
    }
    pub(crate) fn raw_handle(&self) -> DefaultKey {
        self.0
    }
}

#[derive(Clone, Debug)]
pub(crate) struct Node<T> {
    value: T,
    prev: Option<DefaultKey>,
    next: Option<DefaultKey>,
}

type Nodes<T> = SlotMap<DefaultKey, Node<T>>;

/// Sentinel links and length of one chain of nodes inside an arena.
///
/// A sequence owns exactly one live chain. During a rehash the hash map
/// detaches it into a scratch chain over the same arena and relinks nodes
/// one at a time.
#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct Chain {
    first: Option<DefaultKey>,
    last: Option<DefaultKey>,
    len: usize,
}

impl Chain {
    fn link_between<T>(
        &mut self,
        nodes: &mut Nodes<T>,
        prev: Option<DefaultKey>,
        next: Option<DefaultKey>,
        k: DefaultKey,
    ) {
        let node = &mut nodes[k];
        debug_assert!(node.prev.is_none() && node.next.is_none());
        node.prev = prev;
        node.next = next;
        match prev {
            Some(p) => nodes[p].next = Some(k),
            None => self.first = Some(k),
        }
        match next {
            Some(n) => nodes[n].prev = Some(k),
            None => self.last = Some(k),
        }
        self.len += 1;
    }

    /// Link the detached node `k` immediately before `pos` (`None`: the end).
    fn link_before<T>(&mut self, nodes: &mut Nodes<T>, pos: Option<DefaultKey>, k: DefaultKey) {
        let prev = match pos {
            Some(p) => nodes[p].prev,
            None => self.last,
        };
        self.link_between(nodes, prev, pos, k);
    }

    /// Link the detached node `k` immediately after `anchor` (`None`: the front).
    fn link_after<T>(&mut self, nodes: &mut Nodes<T>, anchor: Option<DefaultKey>, k: DefaultKey) {
        let next = match anchor {
            Some(a) => nodes[a].next,
            None => self.first,
        };
        self.link_between(nodes, anchor, next, k);
    }

    /// Unlink `k`, leaving it detached (both links `None`) but alive.
    fn unlink<T>(&mut self, nodes: &mut Nodes<T>, k: DefaultKey) {
        let node = &mut nodes[k];
        let prev = node.prev.take();
        let next = node.next.take();
        match prev {
            Some(p) => nodes[p].next = next,
            None => self.first = next,
        }
        match next {
            Some(n) => nodes[n].prev = prev,
            None => self.last = prev,
        }
        self.len -= 1;
    }

    fn pop_front<T>(&mut self, nodes: &mut Nodes<T>) -> Option<DefaultKey> {
        let k = self.first?;
        self.unlink(nodes, k);
        Some(k)
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }
}

/// Returns the reserved node budget to the allocator unless committed.
struct Reservation<'a, A: NodeAlloc> {
    alloc: &'a A,
    count: usize,
}

impl<A: NodeAlloc> Reservation<'_, A> {
    fn commit(self) {
        core::mem::forget(self);
    }
}

impl<A: NodeAlloc> Drop for Reservation<'_, A> {
    fn drop(&mut self) {
        self.alloc.deallocate(self.count);
    }
}

/// Ordered container with O(1) insertion and removal at any handle.
///
/// Not thread-safe; a sequence must not be shared across threads while
/// being mutated.
pub struct Sequence<T, A: NodeAlloc = Global> {
    nodes: Nodes<T>,
    chain: Chain,
    alloc: A,
}

impl<T> Sequence<T> {
    pub fn new() -> Self {
        Self::new_in(Global)
    }
}

impl<T> Default for Sequence<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, A: NodeAlloc> Sequence<T, A> {
    pub fn new_in(alloc: A) -> Self {
        Self {
            nodes: SlotMap::with_key(),
            chain: Chain::default(),
            alloc,
        }
    }

    /// A sequence of `count` default values.
    pub fn with_default_in(count: usize, alloc: A) -> Result<Self, Error>
    where
        T: Default,
    {
        let mut out = Self::new_in(alloc);
        for _ in 0..count {
            out.push_back(T::default())?;
        }
        Ok(out)
    }

    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    pub fn len(&self) -> usize {
        self.chain.len
    }

    pub fn is_empty(&self) -> bool {
        self.chain.len == 0
    }

    /// Handle of the first node, `None` when empty.
    pub fn first(&self) -> Option<Handle> {
        self.chain.first.map(Handle::new)
    }

    /// Handle of the last node, `None` when empty.
    pub fn last(&self) -> Option<Handle> {
        self.chain.last.map(Handle::new)
    }

    /// The node after `h`; `None` if `h` is the last node or stale.
    pub fn next(&self, h: Handle) -> Option<Handle> {
        self.nodes.get(h.raw_handle())?.next.map(Handle::new)
    }

    /// The node before `h`; `None` if `h` is the first node or stale.
    pub fn prev(&self, h: Handle) -> Option<Handle> {
        self.nodes.get(h.raw_handle())?.prev.map(Handle::new)
    }

    pub fn contains(&self, h: Handle) -> bool {
        self.nodes.contains_key(h.raw_handle())
    }

    pub fn get(&self, h: Handle) -> Option<&T> {
        self.nodes.get(h.raw_handle()).map(|n| &n.value)
    }

    pub fn get_mut(&mut self, h: Handle) -> Option<&mut T> {
        self.nodes.get_mut(h.raw_handle()).map(|n| &mut n.value)
    }

    pub fn front(&self) -> Option<&T> {
        let h = self.first()?;
        self.get(h)
    }

    pub fn back(&self) -> Option<&T> {
        let h = self.last()?;
        self.get(h)
    }

    pub fn front_mut(&mut self) -> Option<&mut T> {
        let h = self.first()?;
        self.get_mut(h)
    }

    pub fn back_mut(&mut self) -> Option<&mut T> {
        let h = self.last()?;
        self.get_mut(h)
    }

    pub fn push_back(&mut self, value: T) -> Result<Handle, Error> {
        self.insert_before(None, value)
    }

    pub fn push_front(&mut self, value: T) -> Result<Handle, Error> {
        self.insert_after(None, value)
    }

    /// Insert `value` before `pos`; `None` means the end position.
    ///
    /// # Panics
    /// If `pos` is a handle that does not refer to a live node.
    pub fn insert_before(&mut self, pos: Option<Handle>, value: T) -> Result<Handle, Error> {
        self.emplace_before(pos, || Ok::<T, Infallible>(value))
    }

    /// Insert `value` after `anchor`; `None` means before the first node.
    ///
    /// # Panics
    /// If `anchor` is a handle that does not refer to a live node.
    pub fn insert_after(&mut self, anchor: Option<Handle>, value: T) -> Result<Handle, Error> {
        self.check_position(anchor);
        let k = self.materialize(|| Ok::<T, Infallible>(value))?;
        self.chain
            .link_after(&mut self.nodes, anchor.map(|h| h.raw_handle()), k);
        Ok(Handle::new(k))
    }

    /// Construct a payload with `make` and insert it before `pos`.
    ///
    /// Budget is reserved before `make` runs. If `make` fails or panics the
    /// budget is returned and the sequence is unchanged.
    pub fn emplace_before<F, E>(&mut self, pos: Option<Handle>, make: F) -> Result<Handle, Error>
    where
        F: FnOnce() -> Result<T, E>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        self.check_position(pos);
        let k = self.materialize(make)?;
        self.chain
            .link_before(&mut self.nodes, pos.map(|h| h.raw_handle()), k);
        Ok(Handle::new(k))
    }

    /// Unlink and destroy the node at `h`, returning its payload.
    ///
    /// Returns `None` for a stale handle.
    pub fn erase(&mut self, h: Handle) -> Option<T> {
        let k = h.raw_handle();
        if !self.nodes.contains_key(k) {
            return None;
        }
        self.chain.unlink(&mut self.nodes, k);
        Some(self.release(k))
    }

    pub fn pop_front(&mut self) -> Option<T> {
        let h = self.first()?;
        self.erase(h)
    }

    pub fn pop_back(&mut self) -> Option<T> {
        let h = self.last()?;
        self.erase(h)
    }

    /// Destroy every node. Handles into the sequence become stale.
    pub fn clear(&mut self) {
        let count = self.nodes.len();
        for (_k, node) in self.nodes.drain() {
            self.alloc.destroy();
            drop(node);
        }
        self.alloc.deallocate(count);
        self.chain = Chain::default();
    }

    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            nodes: &self.nodes,
            front: self.chain.first,
            back: self.chain.last,
            remaining: self.chain.len,
        }
    }

    /// Mutable iteration in sequence order.
    ///
    /// Collects the link order up front so each payload can be lent out
    /// independently; O(n) extra memory.
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        let order: Vec<DefaultKey> = {
            let mut order = Vec::with_capacity(self.chain.len);
            let mut cursor = self.chain.first;
            while let Some(k) = cursor {
                order.push(k);
                cursor = self.nodes[k].next;
            }
            order
        };
        let values: SecondaryMap<DefaultKey, &mut T> = self
            .nodes
            .iter_mut()
            .map(|(k, n)| (k, &mut n.value))
            .collect();
        IterMut {
            order: order.into_iter(),
            values,
        }
    }

    /// Move the contents out, leaving an empty sequence that shares the
    /// allocator.
    pub fn take(&mut self) -> Self {
        let empty = Self::new_in(self.alloc.clone());
        core::mem::replace(self, empty)
    }

    /// Deep copy. The copy's allocator comes from
    /// [`NodeAlloc::select_on_copy`]; on failure all partial copies are
    /// destroyed.
    pub fn try_clone(&self) -> Result<Self, Error>
    where
        T: Clone,
    {
        self.copy_into(self.alloc.select_on_copy())
    }

    /// Copy-assignment. `self` is only replaced once the full copy exists,
    /// so on failure it is unchanged.
    pub fn try_clone_from(&mut self, source: &Self) -> Result<(), Error>
    where
        T: Clone,
    {
        let alloc = if A::PROPAGATE_ON_COPY_ASSIGN {
            source.alloc.clone()
        } else {
            self.alloc.clone()
        };
        *self = source.copy_into(alloc)?;
        Ok(())
    }

    /// Move-assignment.
    ///
    /// When the allocator propagates, or the two allocators are
    /// interchangeable, `source`'s nodes (and every handle into them) are
    /// adopted in O(1). Otherwise each payload is moved into a node budgeted
    /// from `self`'s allocator and handles into `source` become stale. On
    /// failure `self` is unchanged and `source` is dropped.
    pub fn assign(&mut self, mut source: Self) -> Result<(), Error> {
        if self.adopts(&source) {
            if !A::PROPAGATE_ON_MOVE_ASSIGN {
                source.alloc = self.alloc.clone();
            }
            *self = source;
            return Ok(());
        }
        let alloc = self.alloc.clone();
        alloc.allocate(source.len())?;
        let mut fresh = Self::new_in(alloc);
        while let Some(value) = source.pop_front() {
            fresh.alloc.construct();
            let k = fresh.nodes.insert(Node {
                value,
                prev: None,
                next: None,
            });
            fresh.chain.link_before(&mut fresh.nodes, None, k);
        }
        *self = fresh;
        Ok(())
    }

    /// Whether [`assign`](Self::assign) from `source` keeps its nodes in place.
    pub(crate) fn adopts(&self, source: &Self) -> bool {
        A::PROPAGATE_ON_MOVE_ASSIGN || self.alloc.interchangeable(&source.alloc)
    }

    /// Exchange contents in O(1). Allocators travel only when
    /// `A::PROPAGATE_ON_SWAP`; otherwise they must be interchangeable.
    pub fn swap(&mut self, other: &mut Self) {
        if A::PROPAGATE_ON_SWAP {
            core::mem::swap(self, other);
            return;
        }
        debug_assert!(
            self.alloc.interchangeable(&other.alloc),
            "swapping sequences whose allocators are not interchangeable"
        );
        core::mem::swap(&mut self.nodes, &mut other.nodes);
        core::mem::swap(&mut self.chain, &mut other.chain);
    }

    fn copy_into(&self, alloc: A) -> Result<Self, Error>
    where
        T: Clone,
    {
        let mut out = Self::new_in(alloc);
        for value in self.iter() {
            out.push_back(value.clone())?;
        }
        Ok(out)
    }

    fn check_position(&self, pos: Option<Handle>) {
        if let Some(h) = pos {
            assert!(
                self.nodes.contains_key(h.raw_handle()),
                "position handle does not refer to a live node of this sequence"
            );
        }
    }

    /// Allocate and construct a detached node.
    fn materialize<F, E>(&mut self, make: F) -> Result<DefaultKey, Error>
    where
        F: FnOnce() -> Result<T, E>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        if let Err(e) = self.alloc.allocate(1) {
            log::warn!("node allocation refused: {e}");
            return Err(e.into());
        }
        let reservation = Reservation {
            alloc: &self.alloc,
            count: 1,
        };
        let value = make().map_err(|e| Error::ConstructionFailure(e.into()))?;
        reservation.commit();
        self.alloc.construct();
        Ok(self.nodes.insert(Node {
            value,
            prev: None,
            next: None,
        }))
    }

    /// Destroy a detached node and return its budget.
    fn release(&mut self, k: DefaultKey) -> T {
        let node = self
            .nodes
            .remove(k)
            .expect("released node must be live in the arena");
        debug_assert!(node.prev.is_none() && node.next.is_none());
        self.alloc.destroy();
        self.alloc.deallocate(1);
        node.value
    }

    // Link surgery used by the hash map. Nodes created with `detached_with`
    // belong to no chain until `splice_after` links them; they are still
    // owned by the arena and released on drop.

    pub(crate) fn detached_with<F, E>(&mut self, make: F) -> Result<Handle, Error>
    where
        F: FnOnce() -> Result<T, E>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        self.materialize(make).map(Handle::new)
    }

    pub(crate) fn release_detached(&mut self, h: Handle) -> T {
        self.release(h.raw_handle())
    }

    pub(crate) fn splice_after(&mut self, anchor: Option<Handle>, h: Handle) {
        self.chain.link_after(
            &mut self.nodes,
            anchor.map(|a| a.raw_handle()),
            h.raw_handle(),
        );
    }

    /// Take the whole chain out, leaving the sequence empty while its nodes
    /// stay alive in the arena.
    pub(crate) fn detach_chain(&mut self) -> Chain {
        core::mem::take(&mut self.chain)
    }

    /// Unlink the first node of a detached `scratch` chain.
    pub(crate) fn pop_scratch(&mut self, scratch: &mut Chain) -> Option<Handle> {
        scratch.pop_front(&mut self.nodes).map(Handle::new)
    }

    /// Panics if links are inconsistent: `a.next.prev == a` for adjacent
    /// pairs, sentinel links reach both ends, length matches, and no node
    /// is left outside the chain.
    pub(crate) fn check_links(&self) {
        let mut count = 0usize;
        let mut prev: Option<DefaultKey> = None;
        let mut cursor = self.chain.first;
        while let Some(k) = cursor {
            let node = self
                .nodes
                .get(k)
                .expect("chain link points at a dead node");
            assert_eq!(node.prev, prev, "backward link mismatch");
            count += 1;
            assert!(count <= self.nodes.len(), "chain is cyclic");
            prev = Some(k);
            cursor = node.next;
        }
        assert_eq!(self.chain.last, prev, "sentinel backward link mismatch");
        assert_eq!(count, self.chain.len, "chain length mismatch");
        assert_eq!(count, self.nodes.len(), "arena holds unlinked nodes");
    }
}

impl<T, A: NodeAlloc> Drop for Sequence<T, A> {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Deep copy through [`Sequence::try_clone`].
///
/// # Panics
/// If the allocator refuses budget for the copy.
impl<T: Clone, A: NodeAlloc> Clone for Sequence<T, A> {
    fn clone(&self) -> Self {
        self.try_clone()
            .unwrap_or_else(|e| panic!("Sequence::clone: {e}"))
    }

    fn clone_from(&mut self, source: &Self) {
        self.try_clone_from(source)
            .unwrap_or_else(|e| panic!("Sequence::clone_from: {e}"))
    }
}

impl<T: fmt::Debug, A: NodeAlloc> fmt::Debug for Sequence<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq, A: NodeAlloc> PartialEq for Sequence<T, A> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T: Eq, A: NodeAlloc> Eq for Sequence<T, A> {}

/// # Panics
/// If the allocator refuses budget.
impl<T, A: NodeAlloc> Extend<T> for Sequence<T, A> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            if let Err(e) = self.push_back(value) {
                panic!("Sequence::extend: {e}");
            }
        }
    }
}

impl<T, A: NodeAlloc + Default> FromIterator<T> for Sequence<T, A> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut out = Self::new_in(A::default());
        out.extend(iter);
        out
    }
}

/// Iterator over shared payloads in sequence order.
pub struct Iter<'a, T> {
    nodes: &'a Nodes<T>,
    front: Option<DefaultKey>,
    back: Option<DefaultKey>,
    remaining: usize,
}

impl<T> Clone for Iter<'_, T> {
    fn clone(&self) -> Self {
        Iter { ..*self }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let nodes = self.nodes;
        let node = &nodes[self.front?];
        self.front = node.next;
        self.remaining -= 1;
        Some(&node.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let nodes = self.nodes;
        let node = &nodes[self.back?];
        self.back = node.prev;
        self.remaining -= 1;
        Some(&node.value)
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}
impl<T> FusedIterator for Iter<'_, T> {}

/// Iterator over mutable payloads in sequence order.
pub struct IterMut<'a, T> {
    order: std::vec::IntoIter<DefaultKey>,
    values: SecondaryMap<DefaultKey, &'a mut T>,
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = &'a mut T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let k = self.order.next()?;
        self.values.remove(k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.order.size_hint()
    }
}

impl<T> DoubleEndedIterator for IterMut<'_, T> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        let k = self.order.next_back()?;
        self.values.remove(k)
    }
}

impl<T> ExactSizeIterator for IterMut<'_, T> {}
impl<T> FusedIterator for IterMut<'_, T> {}

/// Owning iterator; pops from the front (or back).
pub struct IntoIter<T, A: NodeAlloc = Global> {
    seq: Sequence<T, A>,
}

impl<T, A: NodeAlloc> Iterator for IntoIter<T, A> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<T> {
        self.seq.pop_front()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.seq.len(), Some(self.seq.len()))
    }
}

impl<T, A: NodeAlloc> DoubleEndedIterator for IntoIter<T, A> {
    #[inline]
    fn next_back(&mut self) -> Option<T> {
        self.seq.pop_back()
    }
}

impl<T, A: NodeAlloc> ExactSizeIterator for IntoIter<T, A> {}
impl<T, A: NodeAlloc> FusedIterator for IntoIter<T, A> {}

impl<T, A: NodeAlloc> IntoIterator for Sequence<T, A> {
    type Item = T;
    type IntoIter = IntoIter<T, A>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter { seq: self }
    }
}

impl<'a, T, A: NodeAlloc> IntoIterator for &'a Sequence<T, A> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, A: NodeAlloc> IntoIterator for &'a mut Sequence<T, A> {
    type Item = &'a mut T;
    type IntoIter = IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
