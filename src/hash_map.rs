//! SeqHashMap: a bucket array indexing contiguous runs of one shared
//! entry sequence.
//!
//! Every entry sits in a single [`Sequence`]. `buckets[slot]` holds the
//! handle of the first entry of the run whose cached hashes map to `slot`;
//! the rest of the run follows it via next links. New entries are spliced
//! right after their run's head (or at the sequence front when the run is
//! empty), so a run is never interleaved with another one.

use crate::alloc::{Global, NodeAlloc};
use crate::error::Error;
use crate::guard::ReentryFlag;
use crate::map_iter::{IntoIter, Iter, IterMut, Keys, Values, ValuesMut};
use crate::sequence::{Handle, Sequence};
use core::borrow::Borrow;
use core::convert::Infallible;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::ops::Index;
use hashbrown::hash_map::DefaultHashBuilder;

/// Bucket count used by [`SeqHashMap::new`].
pub const DEFAULT_BUCKETS: usize = 8;
/// Max load factor of a freshly constructed map.
pub const DEFAULT_MAX_LOAD_FACTOR: f32 = 1.0;

/// Largest bucket array a map will try to allocate.
const MAX_BUCKETS: usize = isize::MAX as usize / core::mem::size_of::<Option<Handle>>();

#[derive(Clone, Debug)]
pub(crate) struct Entry<K, V> {
    pub(crate) key: K,
    pub(crate) value: V,
    pub(crate) hash: u64,
}

/// Bucket heads plus the entry sequence.
///
/// Only `locate` runs user code (`Eq`). Splicing, unlinking and rehashing
/// work from cached hashes alone.
struct Table<K, V, A: NodeAlloc> {
    buckets: Vec<Option<Handle>>,
    entries: Sequence<Entry<K, V>, A>,
    max_load_factor: f32,
}

impl<K, V, A: NodeAlloc> Table<K, V, A> {
    fn new_in(buckets: usize, alloc: A) -> Self {
        Self {
            buckets: vec![None; buckets.max(1)],
            entries: Sequence::new_in(alloc),
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
        }
    }

    #[inline]
    fn slot_of(&self, hash: u64) -> usize {
        (hash % self.buckets.len() as u64) as usize
    }

    fn entry(&self, h: Handle) -> &Entry<K, V> {
        self.entries
            .get(h)
            .expect("bucket structure references a live entry")
    }

    fn entry_mut(&mut self, h: Handle) -> &mut Entry<K, V> {
        self.entries
            .get_mut(h)
            .expect("bucket structure references a live entry")
    }

    /// Walk the run of `hash`'s bucket. The run ends at the first entry
    /// that maps to another slot, or at the sentinel.
    fn locate<Q>(&self, hash: u64, q: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: ?Sized + Eq,
    {
        let slot = self.slot_of(hash);
        let mut cursor = self.buckets[slot];
        while let Some(h) = cursor {
            let entry = self.entry(h);
            if self.slot_of(entry.hash) != slot {
                break;
            }
            if entry.hash == hash && entry.key.borrow() == q {
                return Some(h);
            }
            cursor = self.entries.next(h);
        }
        None
    }

    /// Link the detached entry `h` into the run of its bucket.
    fn place(&mut self, h: Handle, hash: u64) {
        let slot = self.slot_of(hash);
        match self.buckets[slot] {
            Some(head) => self.entries.splice_after(Some(head), h),
            None => {
                self.entries.splice_after(None, h);
                self.buckets[slot] = Some(h);
            }
        }
    }

    /// Link the detached entry `h` and grow if the table is now at its
    /// max load. The growth target is checked before anything is linked,
    /// so an error leaves the table untouched.
    fn attach(&mut self, h: Handle, hash: u64) -> Result<(), Error> {
        let len = self.entries.len() + 1;
        let grow_to = if self.overloaded(len) {
            Some(self.growth_target(len).ok_or(Error::CapacityOverflow)?)
        } else {
            None
        };
        self.place(h, hash);
        if let Some(target) = grow_to {
            self.rehash_to(target);
        }
        Ok(())
    }

    fn overloaded(&self, len: usize) -> bool {
        len as f32 / self.buckets.len() as f32 >= self.max_load_factor
    }

    /// At least double, and enough that `len` entries end up at half the
    /// max load. `None` when that would exceed [`MAX_BUCKETS`].
    fn growth_target(&self, len: usize) -> Option<usize> {
        let needed = (2.0 * len as f64 / f64::from(self.max_load_factor)).ceil();
        if needed > MAX_BUCKETS as f64 {
            return None;
        }
        let doubled = self.buckets.len().saturating_mul(2).min(MAX_BUCKETS);
        Some((needed as usize).max(doubled).max(1))
    }

    /// Fewest buckets that keep `len / bucket_count <= max_load_factor`.
    fn min_buckets(&self) -> usize {
        (self.entries.len() as f64 / f64::from(self.max_load_factor)).ceil() as usize
    }

    /// Replace the bucket array and relink every entry in place.
    ///
    /// The chain is detached into a scratch chain first so relinking never
    /// walks nodes it has already moved. No entry is reallocated.
    ///
    /// # Panics
    /// If `count` exceeds [`MAX_BUCKETS`]; the table is untouched then.
    fn rehash_to(&mut self, count: usize) {
        assert!(count <= MAX_BUCKETS, "capacity overflow");
        let count = count.max(1);
        let old = self.buckets.len();
        self.buckets.clear();
        self.buckets.resize(count, None);
        let mut scratch = self.entries.detach_chain();
        let moved = scratch.len();
        while let Some(h) = self.entries.pop_scratch(&mut scratch) {
            let hash = self.entry(h).hash;
            self.place(h, hash);
        }
        log::debug!("rehash: {old} -> {count} buckets, {moved} entries relinked");
    }

    /// Unlink and destroy `h`, handing its bucket to the next entry of the
    /// run if there is one.
    fn detach(&mut self, h: Handle) -> Option<Entry<K, V>> {
        let hash = self.entries.get(h)?.hash;
        let slot = self.slot_of(hash);
        if self.buckets[slot] == Some(h) {
            let successor = self
                .entries
                .next(h)
                .filter(|&n| self.slot_of(self.entry(n).hash) == slot);
            self.buckets[slot] = successor;
        }
        self.entries.erase(h)
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.buckets.fill(None);
    }

    /// Panics unless: sequence links are consistent; every bucket's entries
    /// form exactly one contiguous run; the bucket head is that run's first
    /// entry; empty buckets have no head.
    fn check_invariants(&self) {
        self.entries.check_links();
        let mut seen = vec![false; self.buckets.len()];
        let mut current = None;
        let mut cursor = self.entries.first();
        while let Some(h) = cursor {
            let slot = self.slot_of(self.entry(h).hash);
            if current != Some(slot) {
                assert!(!seen[slot], "bucket {slot} is split into several runs");
                seen[slot] = true;
                assert_eq!(
                    self.buckets[slot],
                    Some(h),
                    "bucket {slot} head is not the first entry of its run"
                );
                current = Some(slot);
            }
            cursor = self.entries.next(h);
        }
        for (slot, head) in self.buckets.iter().enumerate() {
            assert_eq!(
                head.is_some(),
                seen[slot],
                "bucket {slot} head disagrees with its run"
            );
        }
    }
}

/// A freshly built entry that is not linked into its run yet.
///
/// Dropped while still armed (a panicking `Eq`, a refused growth) it
/// releases the node, so the arena never keeps an unlinked entry.
struct Pending<'t, K, V, A: NodeAlloc> {
    table: &'t mut Table<K, V, A>,
    node: Handle,
    armed: bool,
}

impl<'t, K, V, A: NodeAlloc> Pending<'t, K, V, A> {
    fn new(table: &'t mut Table<K, V, A>, node: Handle) -> Self {
        Self {
            table,
            node,
            armed: true,
        }
    }

    fn key(&self) -> &K {
        &self.table.entry(self.node).key
    }

    /// Give the node back, returning its entry for the caller to drop.
    fn discard(mut self) -> Entry<K, V> {
        self.armed = false;
        self.table.entries.release_detached(self.node)
    }

    fn link(mut self, hash: u64) -> Result<Handle, Error> {
        self.table.attach(self.node, hash)?;
        self.armed = false;
        Ok(self.node)
    }
}

impl<K, V, A: NodeAlloc> Drop for Pending<'_, K, V, A> {
    fn drop(&mut self) {
        if self.armed {
            drop(self.table.entries.release_detached(self.node));
        }
    }
}

/// Hash map with unique keys whose entries are kept in one doubly-linked
/// sequence, bucket by bucket.
///
/// Entries never move in memory during a rehash; the [`Handle`]s returned
/// by insertion and lookup remain valid until that entry is removed.
/// Iteration follows sequence order, which is neither insertion order nor
/// bucket order.
///
/// Single-threaded: the map is `!Sync`, and callers must not share it
/// across threads while mutating it.
pub struct SeqHashMap<K, V, S = DefaultHashBuilder, A: NodeAlloc = Global> {
    hasher: S,
    table: Table<K, V, A>,
    reentrancy: ReentryFlag,
}

impl<K, V> SeqHashMap<K, V> {
    pub fn new() -> Self {
        Self::with_buckets(DEFAULT_BUCKETS)
    }

    /// An empty map with `buckets` buckets (at least one).
    pub fn with_buckets(buckets: usize) -> Self {
        Self::with_buckets_and_hasher(buckets, DefaultHashBuilder::default())
    }
}

impl<K, V> Default for SeqHashMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> SeqHashMap<K, V, S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_buckets_and_hasher(DEFAULT_BUCKETS, hasher)
    }

    pub fn with_buckets_and_hasher(buckets: usize, hasher: S) -> Self {
        Self::with_buckets_and_hasher_in(buckets, hasher, Global)
    }
}

impl<K, V, S, A: NodeAlloc> SeqHashMap<K, V, S, A> {
    pub fn with_buckets_and_hasher_in(buckets: usize, hasher: S, alloc: A) -> Self {
        Self {
            hasher,
            table: Table::new_in(buckets, alloc),
            reentrancy: ReentryFlag::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.table.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.entries.is_empty()
    }

    pub fn bucket_count(&self) -> usize {
        self.table.buckets.len()
    }

    pub fn load_factor(&self) -> f32 {
        self.len() as f32 / self.bucket_count() as f32
    }

    pub fn max_load_factor(&self) -> f32 {
        self.table.max_load_factor
    }

    /// Set the growth threshold. Rehashes right away if the current load
    /// already meets it.
    ///
    /// A factor so small that the current entries would need more than the
    /// largest possible bucket array is refused with
    /// [`Error::CapacityOverflow`] and the map is left as it was.
    pub fn set_max_load_factor(&mut self, factor: f32) -> Result<(), Error> {
        if !(factor.is_finite() && factor > 0.0) {
            return Err(Error::InvalidLoadFactor(factor));
        }
        let _g = self.reentrancy.enter();
        let previous = core::mem::replace(&mut self.table.max_load_factor, factor);
        let len = self.table.entries.len();
        if self.table.overloaded(len) {
            match self.table.growth_target(len) {
                Some(target) => self.table.rehash_to(target),
                None => {
                    self.table.max_load_factor = previous;
                    return Err(Error::CapacityOverflow);
                }
            }
        }
        log::trace!("max load factor {previous} -> {factor}");
        self.audit();
        Ok(())
    }

    /// Rebuild with `buckets` buckets, raised if needed so the load stays
    /// within the max load factor. Handles stay valid.
    ///
    /// # Panics
    /// If the bucket array would not fit in memory, like
    /// [`Vec::reserve`]. The map is left as it was.
    pub fn rehash(&mut self, buckets: usize) {
        let _g = self.reentrancy.enter();
        let target = buckets.max(self.table.min_buckets());
        self.table.rehash_to(target);
        self.audit();
    }

    /// Make room for `entries` entries in total without triggering growth.
    /// Never shrinks.
    ///
    /// # Panics
    /// If the bucket array would not fit in memory, like
    /// [`Vec::reserve`]. The map is left as it was.
    pub fn reserve(&mut self, entries: usize) {
        let _g = self.reentrancy.enter();
        let needed = ((entries as f64 / f64::from(self.table.max_load_factor)).floor() as usize)
            .saturating_add(1);
        if needed > self.table.buckets.len() {
            self.table.rehash_to(needed);
            self.audit();
        }
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    pub fn allocator(&self) -> &A {
        self.table.entries.allocator()
    }

    /// Handle of the first entry in iteration order.
    pub fn first(&self) -> Option<Handle> {
        self.table.entries.first()
    }

    /// Handle of the entry after `h` in iteration order.
    pub fn next_handle(&self, h: Handle) -> Option<Handle> {
        self.table.entries.next(h)
    }

    pub fn handle_key(&self, h: Handle) -> Option<&K> {
        self.table.entries.get(h).map(|e| &e.key)
    }

    pub fn handle_value(&self, h: Handle) -> Option<&V> {
        self.table.entries.get(h).map(|e| &e.value)
    }

    pub fn handle_value_mut(&mut self, h: Handle) -> Option<&mut V> {
        self.table.entries.get_mut(h).map(|e| &mut e.value)
    }

    /// Remove the entry behind `h`.
    ///
    /// Returns `None` if `h` is stale. A handle taken from a different map
    /// is a contract violation: it either resolves to nothing or removes
    /// whichever entry of this map happens to share its arena slot.
    pub fn remove_handle(&mut self, h: Handle) -> Option<(K, V)> {
        let removed = {
            let _g = self.reentrancy.enter();
            let removed = self.table.detach(h)?;
            self.audit();
            removed
        };
        Some((removed.key, removed.value))
    }

    /// Destroy every entry; the bucket count is kept.
    pub fn clear(&mut self) {
        let _g = self.reentrancy.enter();
        self.table.clear();
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.table.entries.iter(),
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            inner: self.table.entries.iter_mut(),
        }
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { inner: self.iter() }
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values { inner: self.iter() }
    }

    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }

    /// Move the contents out, leaving an empty map with the same hasher
    /// and allocator.
    pub fn take(&mut self) -> Self
    where
        S: Clone,
    {
        let empty = Self::with_buckets_and_hasher_in(
            DEFAULT_BUCKETS,
            self.hasher.clone(),
            self.allocator().clone(),
        );
        core::mem::replace(self, empty)
    }

    /// Deep copy with the same bucket count, hasher and max load factor.
    /// Cached hashes are copied, so `K: Hash` is not called.
    pub fn try_clone(&self) -> Result<Self, Error>
    where
        K: Clone,
        V: Clone,
        S: Clone,
    {
        let mut table = Table {
            buckets: Vec::new(),
            entries: self.table.entries.try_clone()?,
            max_load_factor: self.table.max_load_factor,
        };
        table.rehash_to(self.bucket_count());
        Ok(Self {
            hasher: self.hasher.clone(),
            table,
            reentrancy: ReentryFlag::new(),
        })
    }

    /// Copy-assignment; `self` is unchanged on failure.
    pub fn try_clone_from(&mut self, source: &Self) -> Result<(), Error>
    where
        K: Clone,
        V: Clone,
        S: Clone,
    {
        let _g = self.reentrancy.enter();
        self.table.entries.try_clone_from(&source.table.entries)?;
        self.hasher = source.hasher.clone();
        self.table.max_load_factor = source.table.max_load_factor;
        self.table.rehash_to(source.bucket_count());
        self.audit();
        Ok(())
    }

    /// Move-assignment.
    ///
    /// Handles into `source` stay valid in `self` when the allocator
    /// propagates on move or the two allocators are interchangeable;
    /// otherwise entries are moved into nodes from `self`'s allocator and
    /// the bucket array is rebuilt. On failure `self` is unchanged.
    pub fn assign(&mut self, source: Self) -> Result<(), Error> {
        let _g = self.reentrancy.enter();
        let SeqHashMap { hasher, table, .. } = source;
        let Table {
            buckets,
            entries,
            max_load_factor,
        } = table;
        let adopted = self.table.entries.adopts(&entries);
        self.table.entries.assign(entries)?;
        self.hasher = hasher;
        self.table.max_load_factor = max_load_factor;
        if adopted {
            self.table.buckets = buckets;
        } else {
            self.table.rehash_to(buckets.len());
        }
        self.audit();
        Ok(())
    }

    /// Exchange contents. Handles follow their entries to the other map.
    pub fn swap(&mut self, other: &mut Self) {
        self.table.entries.swap(&mut other.table.entries);
        core::mem::swap(&mut self.table.buckets, &mut other.table.buckets);
        core::mem::swap(
            &mut self.table.max_load_factor,
            &mut other.table.max_load_factor,
        );
        core::mem::swap(&mut self.hasher, &mut other.hasher);
    }

    #[inline]
    fn audit(&self) {
        #[cfg(feature = "check_invariants")]
        self.table.check_invariants();
    }
}

impl<K, V, S, A> SeqHashMap<K, V, S, A>
where
    K: Eq + Hash,
    S: BuildHasher,
    A: NodeAlloc,
{
    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    pub fn find<Q>(&self, q: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        let hash = self.make_hash(q);
        self.table.locate(hash, q)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.find(q).is_some()
    }

    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let h = self.find(q)?;
        Some(&self.table.entry(h).value)
    }

    pub fn get_key_value<Q>(&self, q: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let h = self.find(q)?;
        let e = self.table.entry(h);
        Some((&e.key, &e.value))
    }

    pub fn get_mut<Q>(&mut self, q: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let h = self.find(q)?;
        Some(&mut self.table.entry_mut(h).value)
    }

    /// Like [`get`](Self::get), but a missing key is an error.
    pub fn at<Q>(&self, q: &Q) -> Result<&V, Error>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get(q).ok_or(Error::KeyNotFound)
    }

    pub fn at_mut<Q>(&mut self, q: &Q) -> Result<&mut V, Error>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.get_mut(q).ok_or(Error::KeyNotFound)
    }

    /// Insert `key -> value` unless `key` is already present.
    ///
    /// Returns the entry's handle and whether it was newly inserted. On a
    /// duplicate the stored value is left alone and `key`/`value` are
    /// dropped.
    pub fn insert(&mut self, key: K, value: V) -> Result<(Handle, bool), Error> {
        self.emplace_with(key, || Ok::<V, Infallible>(value))
    }

    /// Build the entry first, then check for a duplicate.
    ///
    /// The entry is constructed off to the side before the table is
    /// searched, so a failing or panicking `make` never touches table
    /// structure; its budget is returned before the error surfaces. A
    /// duplicate discards the freshly built entry.
    pub fn emplace_with<F, E>(&mut self, key: K, make: F) -> Result<(Handle, bool), Error>
    where
        F: FnOnce() -> Result<V, E>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let guard = self.reentrancy.enter();
        let hash = self.make_hash(&key);
        let fresh = self
            .table
            .entries
            .detached_with(|| make().map(|value| Entry { key, value, hash }))?;
        let pending = Pending::new(&mut self.table, fresh);
        let existing = pending.table.locate(hash, pending.key());
        if let Some(existing) = existing {
            let discarded = pending.discard();
            drop(guard);
            drop(discarded);
            return Ok((existing, false));
        }
        let h = pending.link(hash)?;
        self.audit();
        Ok((h, true))
    }

    /// Insert with a lazily built value; `default` only runs if `key` is
    /// absent.
    pub fn insert_with<F>(&mut self, key: K, default: F) -> Result<(Handle, bool), Error>
    where
        F: FnOnce() -> V,
    {
        self.try_insert_with(key, || Ok::<V, Infallible>(default()))
    }

    /// Insert with a fallible, lazily run constructor. The existence check
    /// happens before anything is allocated or built.
    pub fn try_insert_with<F, E>(&mut self, key: K, make: F) -> Result<(Handle, bool), Error>
    where
        F: FnOnce() -> Result<V, E>,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let _g = self.reentrancy.enter();
        let hash = self.make_hash(&key);
        if let Some(existing) = self.table.locate(hash, &key) {
            return Ok((existing, false));
        }
        let fresh = self
            .table
            .entries
            .detached_with(|| make().map(|value| Entry { key, value, hash }))?;
        let h = Pending::new(&mut self.table, fresh).link(hash)?;
        self.audit();
        Ok((h, true))
    }

    /// Mutable access to `key`'s value, inserting `V::default()` first if
    /// the key is absent. The returned entry is the inserted one even when
    /// the insertion grew the table.
    pub fn get_or_insert_default(&mut self, key: K) -> Result<&mut V, Error>
    where
        V: Default,
    {
        let (h, _) = self.insert_with(key, V::default)?;
        Ok(&mut self.table.entry_mut(h).value)
    }

    pub fn remove<Q>(&mut self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.remove_entry(q).map(|(_, v)| v)
    }

    pub fn remove_entry<Q>(&mut self, q: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let h = self.find(q)?;
        self.remove_handle(h)
    }

    /// Insert each pair in order; returns how many were newly inserted.
    /// Stops at the first failure, keeping everything inserted before it.
    pub fn insert_many<I>(&mut self, pairs: I) -> Result<usize, Error>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut inserted = 0;
        for (k, v) in pairs {
            if self.insert(k, v)?.1 {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    /// Remove each key in order; returns how many were present.
    pub fn erase_many<'q, Q, I>(&mut self, keys: I) -> usize
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq + 'q,
        I: IntoIterator<Item = &'q Q>,
    {
        keys.into_iter()
            .filter(|q| self.remove_entry(*q).is_some())
            .count()
    }

    /// Full structural check, including that every cached hash still
    /// matches its key. O(n); panics on the first violation.
    pub fn check_invariants(&self) {
        let _g = self.reentrancy.enter();
        self.table.check_invariants();
        for e in self.table.entries.iter() {
            assert_eq!(
                e.hash,
                self.make_hash(&e.key),
                "cached hash does not match its key"
            );
        }
    }
}

/// # Panics
/// If the allocator refuses budget for the copy.
impl<K, V, S, A> Clone for SeqHashMap<K, V, S, A>
where
    K: Clone,
    V: Clone,
    S: Clone,
    A: NodeAlloc,
{
    fn clone(&self) -> Self {
        self.try_clone()
            .unwrap_or_else(|e| panic!("SeqHashMap::clone: {e}"))
    }

    fn clone_from(&mut self, source: &Self) {
        self.try_clone_from(source)
            .unwrap_or_else(|e| panic!("SeqHashMap::clone_from: {e}"))
    }
}

impl<K, V, S, A> fmt::Debug for SeqHashMap<K, V, S, A>
where
    K: fmt::Debug,
    V: fmt::Debug,
    A: NodeAlloc,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S, A> PartialEq for SeqHashMap<K, V, S, A>
where
    K: Eq + Hash,
    V: PartialEq,
    S: BuildHasher,
    A: NodeAlloc,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).map_or(false, |ov| v == ov))
    }
}

impl<K, V, S, A> Eq for SeqHashMap<K, V, S, A>
where
    K: Eq + Hash,
    V: Eq,
    S: BuildHasher,
    A: NodeAlloc,
{
}

impl<K, Q, V, S, A> Index<&Q> for SeqHashMap<K, V, S, A>
where
    K: Eq + Hash + Borrow<Q>,
    Q: ?Sized + Eq + Hash,
    S: BuildHasher,
    A: NodeAlloc,
{
    type Output = V;

    /// # Panics
    /// If `key` is not present.
    fn index(&self, key: &Q) -> &V {
        self.get(key).expect("key not present in SeqHashMap")
    }
}

/// # Panics
/// If the allocator refuses budget.
impl<K, V, S, A> Extend<(K, V)> for SeqHashMap<K, V, S, A>
where
    K: Eq + Hash,
    S: BuildHasher,
    A: NodeAlloc,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        if let Err(e) = self.insert_many(iter) {
            panic!("SeqHashMap::extend: {e}");
        }
    }
}

impl<K, V, S, A> FromIterator<(K, V)> for SeqHashMap<K, V, S, A>
where
    K: Eq + Hash,
    S: BuildHasher + Default,
    A: NodeAlloc + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::with_buckets_and_hasher_in(DEFAULT_BUCKETS, S::default(), A::default());
        map.extend(iter);
        map
    }
}

impl<K, V, S, A: NodeAlloc> IntoIterator for SeqHashMap<K, V, S, A> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V, A>;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.table.entries.into_iter(),
        }
    }
}

impl<'a, K, V, S, A: NodeAlloc> IntoIterator for &'a SeqHashMap<K, V, S, A> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S, A: NodeAlloc> IntoIterator for &'a mut SeqHashMap<K, V, S, A> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
