use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use seq_hashmap::{Handle, SeqHashMap};
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn key(n: u64) -> String {
    format!("k{:016x}", n)
}

fn filled(seed: u64, n: usize) -> SeqHashMap<String, u64> {
    let mut m = SeqHashMap::new();
    for (i, x) in lcg(seed).take(n).enumerate() {
        m.insert(key(x), i as u64).unwrap();
    }
    m
}

/// `count` pseudo-random picks out of `0..n`.
fn picks(count: usize, n: usize) -> impl Iterator<Item = usize> {
    let mut s = 0x9e3779b97f4a7c15u64;
    (0..count).map(move |_| {
        s = s.wrapping_mul(2862933555777941757).wrapping_add(3037000493);
        (s as usize) % n
    })
}

// Growth from the default 8 buckets relinks the whole chain each doubling.
fn bench_insert_fresh_100k(c: &mut Criterion) {
    c.bench_function("seq::insert_fresh_100k", |b| {
        b.iter_batched(
            SeqHashMap::<String, u64>::new,
            |mut m| {
                for (i, x) in lcg(1).take(100_000).enumerate() {
                    m.insert(key(x), i as u64).unwrap();
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_insert_reserved_100k(c: &mut Criterion) {
    c.bench_function("seq::insert_reserved_100k", |b| {
        b.iter_batched(
            || {
                let mut m = SeqHashMap::<String, u64>::new();
                m.reserve(100_000);
                m
            },
            |mut m| {
                for (i, x) in lcg(3).take(100_000).enumerate() {
                    m.insert(key(x), i as u64).unwrap();
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

// Pure relinking: no hashing, no allocation of entries.
fn bench_rehash_100k(c: &mut Criterion) {
    c.bench_function("seq::rehash_100k_to_4x", |b| {
        b.iter_batched(
            || filled(4, 100_000),
            |mut m| {
                let target = m.bucket_count() * 4;
                m.rehash(target);
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_remove_random_10k(c: &mut Criterion) {
    c.bench_function("seq::remove_random_10k_of_110k", |b| {
        b.iter_batched(
            || {
                let mut m = SeqHashMap::new();
                let handles: Vec<Handle> = lcg(5)
                    .take(110_000)
                    .enumerate()
                    .map(|(i, x)| m.insert(key(x), i as u64).unwrap().0)
                    .collect();
                let to_remove: Vec<Handle> =
                    picks(10_000, handles.len()).map(|i| handles[i]).collect();
                (m, to_remove)
            },
            |(mut m, to_remove)| {
                for h in to_remove {
                    black_box(m.remove_handle(h));
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_find_hit_10k(c: &mut Criterion) {
    c.bench_function("seq::find_hit_10k_on_100k", |b| {
        let keys: Vec<_> = lcg(7).take(100_000).map(key).collect();
        let mut m = SeqHashMap::new();
        for (i, k) in keys.iter().enumerate() {
            m.insert(k.clone(), i as u64).unwrap();
        }
        let queries: Vec<&String> = picks(10_000, keys.len()).map(|i| &keys[i]).collect();
        b.iter(|| {
            for k in &queries {
                black_box(m.find(k.as_str()));
            }
        })
    });
}

fn bench_find_miss_10k(c: &mut Criterion) {
    c.bench_function("seq::find_miss_10k_on_100k", |b| {
        let m = filled(11, 100_000);
        let mut miss = lcg(0xdead_beef);
        b.iter(|| {
            for _ in 0..10_000 {
                let k = key(miss.next().unwrap());
                black_box(m.find(&k));
            }
        })
    });
}

fn bench_iter(c: &mut Criterion) {
    c.bench_function("seq::iter_all_100k", |b| {
        let m = filled(999, 100_000);
        b.iter(|| {
            let mut sum = 0u64;
            for v in m.values() {
                sum = sum.wrapping_add(*v);
            }
            black_box(sum)
        })
    });

    // Mutable iteration first collects the link order and a per-node
    // lookup table, so this pays an O(n) allocation on top of the walk.
    c.bench_function("seq::values_mut_increment_all_100k", |b| {
        b.iter_batched(
            || filled(1001, 100_000),
            |mut m| {
                for v in m.values_mut() {
                    *v = v.wrapping_add(1);
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(12)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1))
}

criterion_group! {
    name = benches_insert;
    config = bench_config();
    targets = bench_insert_fresh_100k, bench_insert_reserved_100k, bench_rehash_100k
}
criterion_group! {
    name = benches_ops;
    config = bench_config();
    targets = bench_remove_random_10k,
              bench_find_hit_10k,
              bench_find_miss_10k,
              bench_iter
}
criterion_main!(benches_insert, benches_ops);
