//! seq-hashmap: a single-threaded hash map whose buckets are contiguous
//! runs inside one shared doubly-linked sequence of entries.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a map where growth never moves an entry. Rehashing rewires
//!   links and rebuilds a small bucket-head array; entries stay put and
//!   their handles stay valid.
//! - Layers:
//!   - `NodeAlloc`: the allocation contract. A budget source with
//!     `allocate`/`deallocate`, per-node `construct`/`destroy` hooks and
//!     propagation flags for copy, move and swap.
//!   - `Sequence<T, A>`: a doubly-linked list over a slotmap arena. Every
//!     element has a generational `Handle`. Node budget is reserved
//!     before any payload is built, so a failed insert changes nothing.
//!   - `SeqHashMap<K, V, S, A>`: unique keys. `buckets[slot]` points at
//!     the first entry of that slot's run, and the run continues through
//!     next links until an entry maps elsewhere.
//!
//! Constraints
//! - Single-threaded: the map is `!Sync`; no atomics.
//! - Entries of one bucket are always adjacent in the sequence, and the
//!   head is the first of them.
//! - `len / bucket_count` stays at or below the max load factor after
//!   every insertion; reaching it doubles the bucket count (at least).
//! - Handles are generational: a removed entry's handle never resolves
//!   again, even after its arena slot is reused.
//!
//! Insertion and lookup
//! - A new entry is spliced right after its bucket's head. An empty
//!   bucket gets the entry at the front of the whole sequence and records
//!   it as head.
//! - Lookup hashes the key once, starts at the head and walks forward.
//!   Each step compares the cached hash, then the key. It stops at the
//!   first entry whose cached hash maps to a different slot.
//! - Removing a head hands the bucket to the next entry only when that
//!   entry belongs to the same slot; otherwise the bucket becomes empty.
//!
//! Rehashing
//! - Each entry stores its full `u64` hash. Rehash detaches the whole
//!   chain, pops entries off it one by one and re-splices them by cached
//!   hash. `K: Hash` is never invoked after insertion.
//!
//! Reentrancy policy
//! - Public map methods hold a debug-only guard while user `Hash`/`Eq`
//!   code may run or while links are half-spliced. A nested call panics
//!   in debug builds. Removed keys and values are handed back to the
//!   caller, so their `Drop` runs after the structure is consistent.
//!
//! Failure semantics
//! - Operations return [`Error`]. An allocation or construction failure
//!   leaves the container exactly as it was; partially built nodes hand
//!   their budget back before the error surfaces.
//! - A node built for an insert stays unlinked until its growth target is
//!   known to be reachable. If user `Eq` panics first, or growth would
//!   overflow the bucket array, the node is released on the way out.
//!
//! Notes and non-goals
//! - No multimap, no shrink-on-erase, no concurrency.
//! - Iteration order is sequence order, which is neither insertion order
//!   nor bucket order.
//! - The `check_invariants` feature validates the full structure after
//!   every mutating operation; `SeqHashMap::check_invariants` does the
//!   same on demand.
//!
//! ```
//! use seq_hashmap::SeqHashMap;
//!
//! let mut m: SeqHashMap<&str, u32> = SeqHashMap::new();
//! let (h, fresh) = m.insert("a", 1).unwrap();
//! assert!(fresh);
//! m.rehash(64);
//! assert_eq!(m.handle_value(h), Some(&1));
//! assert_eq!(m["a"], 1);
//! ```

pub mod alloc;
mod error;
mod guard;
mod hash_map;
mod hash_map_proptest;
mod map_iter;
pub mod sequence;

// Public surface
pub use alloc::{AllocError, FixedArena, Global, NodeAlloc};
pub use error::Error;
pub use hash_map::{SeqHashMap, DEFAULT_BUCKETS, DEFAULT_MAX_LOAD_FACTOR};
pub use map_iter::{IntoIter, Iter, IterMut, Keys, Values, ValuesMut};
pub use sequence::{Handle, Sequence};
