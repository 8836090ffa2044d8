use criterion::{criterion_group, criterion_main, Criterion, BenchmarkId};
use rand::prelude::*;

use std::sync::Arc;
use probedb::index::hash::LinearProbeHashTable;
use probedb::storage::buffer::BufferPoolManager;

// Create temporary db for testing
fn create_test_buffer_pool(pool_size: usize) -> Arc<BufferPoolManager> {
    let temp_file = tempfile::NamedTempFile::new().unwrap();
    let path = temp_file.path().to_str().unwrap().to_string();
    let buffer_pool = Arc::new(BufferPoolManager::new(pool_size, path).unwrap());

    // Keep the temp file alive
    std::mem::forget(temp_file);

    buffer_pool
}

fn hash_index_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("HashIndex");

    for entries in [100, 1000].iter() {
        group.bench_with_input(BenchmarkId::new("insert", entries), entries, |b, &entries| {
            b.iter_with_setup(
                || {
                    let buffer_pool = create_test_buffer_pool(64);
                    LinearProbeHashTable::<i32, i32>::new(buffer_pool, entries as usize * 2)
                        .unwrap()
                },
                |table| {
                    for key in 0..entries {
                        table.insert(None, &key, &(key * 2)).unwrap();
                    }
                },
            );
        });

        group.bench_with_input(BenchmarkId::new("lookup", entries), entries, |b, &entries| {
            let buffer_pool = create_test_buffer_pool(64);
            let table =
                LinearProbeHashTable::<i32, i32>::new(buffer_pool, entries as usize * 2).unwrap();

            for key in 0..entries {
                table.insert(None, &key, &(key * 2)).unwrap();
            }

            let mut rng = StdRng::seed_from_u64(42);

            b.iter(|| {
                let key = rng.gen_range(0..entries);
                let results = table.get_value(None, &key).unwrap();
                assert_eq!(results, vec![key * 2]);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, hash_index_benchmark);
criterion_main!(benches);
