// Allocator contract tests (public API only).
//
// Invariants exercised:
// - Balance: every constructed node is destroyed exactly once and every
//   allocated unit of budget is handed back, whatever path removed it.
// - Failure atomicity: a refused allocation or a failing constructor
//   leaves the container unchanged and leaks no budget.
// - Propagation: move-assignment keeps handles only when nodes can be
//   adopted; otherwise entries are relocated into the destination's
//   allocator.
use seq_hashmap::{AllocError, Error, FixedArena, NodeAlloc, SeqHashMap, Sequence};
use std::cell::Cell;
use std::hash::{BuildHasherDefault, Hasher};
use std::rc::Rc;

#[derive(Debug, Default)]
struct Ledger {
    live_budget: Cell<usize>,
    constructed: Cell<usize>,
    destroyed: Cell<usize>,
}

/// Budget pool with bookkeeping. Pools are interchangeable only with
/// clones of themselves, and never travel on move-assignment.
#[derive(Clone, Debug, Default)]
struct Pool(Rc<Ledger>);

impl Pool {
    fn live(&self) -> usize {
        self.0.live_budget.get()
    }
    fn balanced(&self) -> bool {
        self.0.constructed.get() == self.0.destroyed.get() && self.live() == 0
    }
}

impl NodeAlloc for Pool {
    const PROPAGATE_ON_MOVE_ASSIGN: bool = false;

    fn allocate(&self, count: usize) -> Result<(), AllocError> {
        self.0.live_budget.set(self.live() + count);
        Ok(())
    }
    fn deallocate(&self, count: usize) {
        self.0.live_budget.set(self.live() - count);
    }
    fn construct(&self) {
        self.0.constructed.set(self.0.constructed.get() + 1);
    }
    fn destroy(&self) {
        self.0.destroyed.set(self.0.destroyed.get() + 1);
    }
    fn interchangeable(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Default)]
struct IdentityHasher(u64);
impl Hasher for IdentityHasher {
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = self.0.rotate_left(8) ^ u64::from(b);
        }
    }
    fn write_u64(&mut self, n: u64) {
        self.0 = n;
    }
    fn finish(&self) -> u64 {
        self.0
    }
}
type Identity = BuildHasherDefault<IdentityHasher>;

fn pooled(pool: &Pool) -> SeqHashMap<u64, String, Identity, Pool> {
    SeqHashMap::with_buckets_and_hasher_in(8, Identity::default(), pool.clone())
}

// Test: budget and construct/destroy balance across every removal path.
// Verifies: remove, remove_handle, clear, into_iter and drop all return
// budget; a duplicate `insert` builds and discards one entry while a
// duplicate `insert_with` builds nothing.
#[test]
fn removal_paths_return_budget() {
    let pool = Pool::default();
    {
        let mut m = pooled(&pool);
        for k in 0..20 {
            m.insert(k, k.to_string()).unwrap();
        }
        assert_eq!(pool.live(), 20);

        let constructed = pool.0.constructed.get();
        m.insert(3, "again".into()).unwrap();
        assert_eq!(pool.0.constructed.get(), constructed + 1);
        assert_eq!(pool.live(), 20);
        m.insert_with(3, || unreachable!("key exists")).unwrap();
        assert_eq!(pool.0.constructed.get(), constructed + 1);

        m.remove(&0);
        let h = m.find(&1).unwrap();
        m.remove_handle(h);
        assert_eq!(pool.live(), 18);

        let mut rest = m.take();
        assert_eq!(pool.live(), 18);
        let drained: Vec<_> = rest.iter().map(|(k, _)| *k).collect();
        assert_eq!(drained.len(), 18);
        let first_half: Vec<_> = rest.take().into_iter().take(9).collect();
        assert_eq!(first_half.len(), 9);
        assert_eq!(pool.live(), 0, "dropping a partly consumed IntoIter releases the rest");

        m.insert(100, "x".into()).unwrap();
        m.clear();
        assert_eq!(pool.live(), 0);
        m.insert(101, "y".into()).unwrap();
    }
    assert!(pool.balanced());
}

// Test: failing constructors.
// Verifies: ConstructionFailure is reported, the map is unchanged and
// the reserved budget is back in the pool; a panicking constructor is
// equally clean.
#[test]
fn constructor_failure_and_panic_are_atomic() {
    let pool = Pool::default();
    let mut m = pooled(&pool);
    m.insert(1, "one".into()).unwrap();

    let err = m
        .try_insert_with(2, || Err::<String, _>("no value for you"))
        .unwrap_err();
    match err {
        Error::ConstructionFailure(source) => assert_eq!(source.to_string(), "no value for you"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(m.len(), 1);
    assert_eq!(pool.live(), 1);

    let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _ = m.emplace_with(3, || -> Result<String, Error> { panic!("constructor panicked") });
    }));
    assert!(res.is_err());
    assert_eq!(pool.live(), 1);
    assert_eq!(m.len(), 1);
    assert!(!m.contains_key(&3));
    m.check_invariants();

    drop(m);
    assert!(pool.balanced());
}

// Test: a bounded arena refuses growth past its capacity.
// Verifies: AllocationFailure carries the arena numbers; existing entries
// and handles are untouched; erasing does not refund a bump arena.
#[test]
fn fixed_arena_exhaustion() {
    let arena = FixedArena::new(4);
    let mut m: SeqHashMap<u64, u64, Identity, FixedArena> =
        SeqHashMap::with_buckets_and_hasher_in(8, Identity::default(), arena.clone());
    let handles: Vec<_> = (0..4).map(|k| m.insert(k, k * 2).unwrap().0).collect();
    match m.insert(9, 9) {
        Err(Error::AllocationFailure(AllocError {
            requested,
            available,
        })) => {
            assert_eq!(requested, 1);
            assert_eq!(available, 0);
        }
        other => panic!("expected allocation failure, got {other:?}"),
    }
    for (k, h) in (0..4).zip(&handles) {
        assert_eq!(m.handle_value(*h), Some(&(k * 2)));
    }
    m.remove(&0);
    assert!(m.insert(0, 0).is_err(), "bump budget is not recycled");
    assert_eq!(arena.used(), 4);
}

// Test: copies draw from the copied allocator and fail atomically.
// Verifies: try_clone on an exhausted arena errors and leaves the source
// intact; try_clone_from failure leaves the destination intact.
#[test]
fn copies_respect_arena_budget() {
    let arena = FixedArena::new(5);
    let mut a: SeqHashMap<u64, u64, Identity, FixedArena> =
        SeqHashMap::with_buckets_and_hasher_in(8, Identity::default(), arena.clone());
    for k in 0..3 {
        a.insert(k, k).unwrap();
    }
    assert!(matches!(a.try_clone(), Err(Error::AllocationFailure(_))));
    assert_eq!(a.len(), 3);
    a.check_invariants();

    let other = FixedArena::new(8);
    let mut b: SeqHashMap<u64, u64, Identity, FixedArena> =
        SeqHashMap::with_buckets_and_hasher_in(8, Identity::default(), other);
    b.insert(42, 42).unwrap();
    // FixedArena propagates on copy: the copy would draw from `arena`.
    assert!(b.try_clone_from(&a).is_err());
    assert_eq!(b.len(), 1);
    assert_eq!(b.get(&42), Some(&42));
}

// Test: move-assignment between interchangeable allocators.
// Verifies: nodes are adopted, so handles minted by the source resolve
// in the destination afterwards.
#[test]
fn move_assign_adopts_when_interchangeable() {
    let pool = Pool::default();
    let mut src = pooled(&pool);
    let h = src.insert(7, "seven".into()).unwrap().0;
    let mut dst = pooled(&pool);
    dst.insert(1, "one".into()).unwrap();

    dst.assign(src).unwrap();
    assert_eq!(dst.len(), 1);
    assert_eq!(dst.handle_value(h).map(String::as_str), Some("seven"));
    assert!(!dst.contains_key(&1));
    dst.check_invariants();
    drop(dst);
    assert!(pool.balanced());
}

// Test: move-assignment between foreign, non-propagating allocators.
// Verifies: entries are relocated into the destination pool, the source
// pool gets all its budget back and lookups still work after the
// bucket array is rebuilt.
#[test]
fn move_assign_relocates_between_foreign_pools() {
    let src_pool = Pool::default();
    let dst_pool = Pool::default();
    let mut src = pooled(&src_pool);
    for k in 0..12 {
        src.insert(k, format!("v{k}")).unwrap();
    }
    let buckets = src.bucket_count();
    let mut dst = pooled(&dst_pool);
    dst.insert(99, "gone".into()).unwrap();

    dst.assign(src).unwrap();
    assert_eq!(src_pool.live(), 0);
    assert!(src_pool.balanced());
    assert_eq!(dst_pool.live(), 12);
    assert_eq!(dst.bucket_count(), buckets);
    for k in 0..12 {
        assert_eq!(dst.get(&k), Some(&format!("v{k}")));
    }
    assert!(!dst.contains_key(&99));
    dst.check_invariants();
}

// Test: sequences follow the same contract on their own.
// Verifies: with_default_in builds n default nodes; swap of
// interchangeable sequences exchanges nodes and handles follow them.
#[test]
fn sequence_swap_and_defaults() {
    let pool = Pool::default();
    let mut a: Sequence<u8, Pool> = Sequence::with_default_in(3, pool.clone()).unwrap();
    assert_eq!(a.iter().copied().collect::<Vec<_>>(), vec![0, 0, 0]);
    let mut b: Sequence<u8, Pool> = Sequence::new_in(pool.clone());
    let hb = b.push_back(5).unwrap();
    a.swap(&mut b);
    assert_eq!(a.get(hb), Some(&5));
    assert_eq!(b.len(), 3);
    assert_eq!(pool.live(), 4);
    drop((a, b));
    assert!(pool.balanced());
}
