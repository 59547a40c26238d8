#![cfg(test)]

// Property tests for SeqHashMap kept inside the crate so they can look at
// bucket heads directly.

use crate::hash_map::SeqHashMap;
use crate::sequence::Handle;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::cell::Cell;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::hash::{BuildHasher, Hasher};
use std::rc::Rc;

// Key newtype with Borrow<str> to exercise borrowed lookup.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
struct Key(String);
impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
impl std::borrow::Borrow<str> for Key {
    fn borrow(&self) -> &str {
        &self.0
    }
}

// Pool-indexed operations so shrinking moves toward earlier keys.
#[derive(Clone, Debug)]
enum OpI {
    Insert(usize, i32),
    InsertWith(usize, i32),
    Remove(usize),
    RemoveHandle(usize),
    Find(usize),
    Contains(String),
    Mutate(usize, i32),
    Rehash(usize),
    Reserve(usize),
    SetMaxLoad(f32),
    Iterate,
    Clear,
}

fn key_from(pool: &[String], i: usize) -> Key {
    Key(pool[i].clone())
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,5}", 1..=12).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let contains_pool = proptest::sample::select(pool.clone());
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Insert(i, v)),
            2 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::InsertWith(i, v)),
            2 => idx.clone().prop_map(OpI::Remove),
            1 => idx.clone().prop_map(OpI::RemoveHandle),
            2 => idx.clone().prop_map(OpI::Find),
            1 => prop_oneof![contains_pool, "[a-z]{0,5}"].prop_map(OpI::Contains),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| OpI::Mutate(i, d)),
            2 => prop_oneof![
                (0usize..40).prop_map(OpI::Rehash),
                (0usize..40).prop_map(OpI::Reserve),
            ],
            1 => proptest::sample::select(vec![0.5f32, 0.75, 1.0, 2.0, 4.0])
                .prop_map(OpI::SetMaxLoad),
            1 => prop_oneof![Just(OpI::Iterate), Just(OpI::Clear)],
        ];
        proptest::collection::vec(op, 1..80).prop_map(move |ops| (pool.clone(), ops))
    })
}

// State-machine equivalence against std::collections::HashMap.
// Checked after every op:
// - bucket runs are contiguous and every head starts its run;
// - live handles still resolve to their key, stale ones never resolve;
// - load factor never exceeds the max load factor;
// - len/is_empty parity with the model.
fn run_state_machine<S: BuildHasher>(
    mut sut: SeqHashMap<Key, i32, S>,
    pool: Vec<String>,
    ops: Vec<OpI>,
) -> Result<(), TestCaseError> {
    let mut model: HashMap<Key, i32> = HashMap::new();
    let mut live: HashMap<Key, Handle> = HashMap::new();
    let mut stale: Vec<Handle> = Vec::new();
    let default_calls = Rc::new(Cell::new(0));

    for op in ops {
        match op {
            OpI::Insert(i, v) => {
                let k = key_from(&pool, i);
                let already = model.contains_key(&k);
                let (h, fresh) = sut.insert(k.clone(), v).expect("global allocator");
                prop_assert_eq!(fresh, !already, "insert reports fresh iff absent");
                if fresh {
                    prop_assert!(sut.load_factor() < sut.max_load_factor());
                    live.insert(k.clone(), h);
                    model.insert(k, v);
                } else {
                    prop_assert_eq!(Some(&h), live.get(&k));
                }
            }
            OpI::InsertWith(i, v) => {
                let k = key_from(&pool, i);
                let already = model.contains_key(&k);
                let counter = default_calls.clone();
                let before = counter.get();
                let (h, fresh) = sut
                    .insert_with(k.clone(), move || {
                        counter.set(counter.get() + 1);
                        v
                    })
                    .expect("global allocator");
                prop_assert_eq!(fresh, !already);
                if fresh {
                    prop_assert_eq!(default_calls.get(), before + 1, "default runs once on insert");
                    prop_assert!(sut.load_factor() < sut.max_load_factor());
                    live.insert(k.clone(), h);
                    model.insert(k, v);
                } else {
                    prop_assert_eq!(default_calls.get(), before, "default must not run on duplicate");
                }
            }
            OpI::Remove(i) => {
                let k = key_from(&pool, i);
                let got = sut.remove(k.0.as_str());
                prop_assert_eq!(got, model.remove(&k));
                if let Some(h) = live.remove(&k) {
                    stale.push(h);
                }
            }
            OpI::RemoveHandle(i) => {
                let k = key_from(&pool, i);
                if let Some(h) = live.remove(&k) {
                    let (kk, vv) = sut.remove_handle(h).expect("live handle removes");
                    prop_assert!(kk == k);
                    prop_assert_eq!(Some(vv), model.remove(&k));
                    stale.push(h);
                }
            }
            OpI::Find(i) => {
                let k = key_from(&pool, i);
                let s = sut.find(&k);
                prop_assert_eq!(s.is_some(), model.contains_key(&k));
                if let Some(h) = s {
                    prop_assert_eq!(Some(&h), live.get(&k));
                }
            }
            OpI::Contains(s) => {
                let has_model = model.keys().any(|k| k.0 == s);
                prop_assert_eq!(sut.contains_key(s.as_str()), has_model);
            }
            OpI::Mutate(i, d) => {
                let k = key_from(&pool, i);
                if let Some(&h) = live.get(&k) {
                    let vr = sut.handle_value_mut(h).expect("live handle should resolve");
                    *vr = vr.saturating_add(d);
                    let mv = model.get_mut(&k).expect("present in model");
                    *mv = mv.saturating_add(d);
                }
            }
            OpI::Rehash(n) => {
                sut.rehash(n);
                prop_assert!(sut.bucket_count() >= n.max(1));
            }
            OpI::Reserve(n) => {
                let before = sut.bucket_count();
                sut.reserve(n);
                prop_assert!(sut.bucket_count() >= before, "reserve never shrinks");
                prop_assert!((n as f32) < sut.bucket_count() as f32 * sut.max_load_factor());
            }
            OpI::SetMaxLoad(f) => {
                sut.set_max_load_factor(f).expect("valid factor");
                prop_assert_eq!(sut.max_load_factor(), f);
            }
            OpI::Iterate => {
                let s_keys: BTreeSet<_> = sut.keys().cloned().collect();
                let m_keys: BTreeSet<_> = model.keys().cloned().collect();
                prop_assert_eq!(s_keys, m_keys);
                prop_assert_eq!(sut.iter().count(), model.len());
            }
            OpI::Clear => {
                let buckets = sut.bucket_count();
                sut.clear();
                prop_assert_eq!(sut.bucket_count(), buckets);
                model.clear();
                stale.extend(live.drain().map(|(_, h)| h));
            }
        }

        sut.check_invariants();
        for &h in &stale {
            prop_assert!(sut.handle_value(h).is_none());
        }
        for (k, &h) in &live {
            prop_assert_eq!(sut.handle_key(h), Some(k));
            prop_assert_eq!(sut.handle_value(h), model.get(k));
        }
        prop_assert!(sut.load_factor() <= sut.max_load_factor());
        prop_assert_eq!(sut.len(), model.len());
        prop_assert_eq!(sut.is_empty(), model.is_empty());
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_state_machine(SeqHashMap::new(), pool, ops)?;
    }
}

// Constant hasher: every key lands in one run, which stresses the
// equality walk and head hand-off on removal.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Few buckets and short hashes: many distinct runs sharing neighbours,
// so walks regularly cross into a foreign run.
#[derive(Clone, Default)]
struct LowBitsBuildHasher;
struct LowBitsHasher(u64);
impl BuildHasher for LowBitsBuildHasher {
    type Hasher = LowBitsHasher;
    fn build_hasher(&self) -> Self::Hasher {
        LowBitsHasher(0)
    }
}
impl Hasher for LowBitsHasher {
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = self.0.wrapping_mul(31).wrapping_add(u64::from(b));
        }
    }
    fn finish(&self) -> u64 {
        self.0 % 5
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_with_collisions((pool, ops) in arb_scenario()) {
        run_state_machine(SeqHashMap::with_hasher(ConstBuildHasher), pool, ops)?;
    }

    #[test]
    fn prop_state_machine_with_clustered_hashes((pool, ops) in arb_scenario()) {
        run_state_machine(SeqHashMap::with_buckets_and_hasher(2, LowBitsBuildHasher), pool, ops)?;
    }
}

// Deep copies keep their own structure: mutating either side never shows
// through the other, and both stay internally consistent.
proptest! {
    #![proptest_config(ProptestConfig { cases: 32, .. ProptestConfig::default() })]
    #[test]
    fn prop_clone_is_independent(
        keys in proptest::collection::vec(0u16..64, 0..40),
        extra in proptest::collection::vec(0u16..64, 0..10),
    ) {
        let mut a: SeqHashMap<u16, u16> = SeqHashMap::new();
        for &k in &keys {
            a.insert(k, k).expect("global allocator");
        }
        let mut b = a.clone();
        prop_assert_eq!(&a, &b);
        prop_assert_eq!(a.bucket_count(), b.bucket_count());
        for &k in &extra {
            b.insert(k, k.wrapping_add(1000)).expect("global allocator");
            a.remove(&k);
        }
        for &k in &extra {
            prop_assert!(!a.contains_key(&k));
            prop_assert!(b.contains_key(&k));
        }
        a.check_invariants();
        b.check_invariants();
    }
}
