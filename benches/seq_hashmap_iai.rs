#[cfg(target_os = "linux")]
mod bench {
    use iai::black_box;
    use seq_hashmap::SeqHashMap;

    const OPS: usize = 1_000;

    fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
        std::iter::from_fn(move || {
            s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
            Some(s)
        })
    }

    fn key(n: u64) -> String {
        format!("k{:016x}", n)
    }

    // Insert 1k entries, growing from the default bucket count.
    pub fn seq_hashmap_insert_1000_ops() {
        let mut m = SeqHashMap::<String, u64>::new();
        for (i, x) in lcg(1).take(OPS).enumerate() {
            m.insert(key(x), i as u64).unwrap();
        }
        black_box(m);
    }

    // Repeated hits on existing keys.
    pub fn seq_hashmap_find_hit_1000_ops() {
        let mut m = SeqHashMap::new();
        let keys: Vec<_> = lcg(7).take(OPS * 2).map(key).collect();
        for (i, k) in keys.iter().enumerate() {
            m.insert(k.clone(), i as u64).unwrap();
        }
        let mut it = keys.iter().cycle();
        for _ in 0..OPS {
            let k = it.next().unwrap();
            black_box(m.find(k));
        }
    }

    // Repeated misses for keys unlikely to be present.
    pub fn seq_hashmap_find_miss_1000_ops() {
        let mut m = SeqHashMap::new();
        for (i, x) in lcg(11).take(OPS).enumerate() {
            m.insert(key(x), i as u64).unwrap();
        }
        let mut miss = lcg(0xdead_beef);
        for _ in 0..OPS {
            let k = key(miss.next().unwrap());
            black_box(m.find(&k));
        }
    }

    // Insert then erase the same key; the bucket head flips every time.
    pub fn seq_hashmap_insert_remove_1000_ops() {
        let mut m = SeqHashMap::new();
        for _ in 0..OPS {
            let (h, _) = m.insert("k".to_string(), 1u64).unwrap();
            black_box(m.remove_handle(h));
        }
    }

    // Mutable walk over 1k entries; counts the order buffer built up front.
    pub fn seq_hashmap_values_mut_1000_entries() {
        let mut m = SeqHashMap::<String, u64>::new();
        for (i, x) in lcg(17).take(OPS).enumerate() {
            m.insert(key(x), i as u64).unwrap();
        }
        for v in m.values_mut() {
            *v = v.wrapping_add(1);
        }
        black_box(m);
    }

    // Relink 1k entries into a table four times larger.
    pub fn seq_hashmap_rehash_1000_entries() {
        let mut m = SeqHashMap::<String, u64>::new();
        for (i, x) in lcg(13).take(OPS).enumerate() {
            m.insert(key(x), i as u64).unwrap();
        }
        let target = m.bucket_count() * 4;
        m.rehash(target);
        black_box(m);
    }
}

#[cfg(target_os = "linux")]
use bench::{
    seq_hashmap_find_hit_1000_ops, seq_hashmap_find_miss_1000_ops, seq_hashmap_insert_1000_ops,
    seq_hashmap_insert_remove_1000_ops, seq_hashmap_rehash_1000_entries,
    seq_hashmap_values_mut_1000_entries,
};

#[cfg(target_os = "linux")]
iai::main!(
    seq_hashmap_insert_1000_ops,
    seq_hashmap_find_hit_1000_ops,
    seq_hashmap_find_miss_1000_ops,
    seq_hashmap_insert_remove_1000_ops,
    seq_hashmap_rehash_1000_entries,
    seq_hashmap_values_mut_1000_entries
);

#[cfg(not(target_os = "linux"))]
fn main() {
    eprintln!("Skipping: iai benches require Linux/valgrind.");
}
