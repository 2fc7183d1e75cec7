use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use engine::{Config, Engine};
use tempfile::{tempdir, TempDir};

const N_KEYS: usize = 1_000;
const VALUE_SIZE: usize = 100;

const USER: &[u8] = b"bench";

fn bench_config(root: &std::path::Path) -> Config {
    Config {
        path: root.join("data"),
        wal_path: root.join("log"),
        db_name: "bench".to_string(),
        memtable_capacity: 256,
        wal_max_recs_in_seg: 512,
        wal_buffer_capacity: 64,
        token_bucket_tokens: i64::MAX / 2,
        token_bucket_interval: 3600,
        cache_capacity: 128,
        ..Config::default()
    }
}

fn fresh_engine() -> (TempDir, Engine) {
    let dir = tempdir().unwrap();
    let engine = Engine::open(bench_config(dir.path())).unwrap();
    (dir, engine)
}

fn loaded_engine() -> (TempDir, Engine) {
    let (dir, mut engine) = fresh_engine();
    for i in 0..N_KEYS {
        engine
            .put(
                USER,
                format!("key{:05}", i).as_bytes(),
                &vec![b'x'; VALUE_SIZE],
                0,
            )
            .unwrap();
    }
    (dir, engine)
}

fn put_benchmark(c: &mut Criterion) {
    c.bench_function("engine_put_1k", |b| {
        b.iter_batched(
            fresh_engine,
            |(_dir, mut engine)| {
                for i in 0..N_KEYS {
                    engine
                        .put(
                            USER,
                            format!("key{:05}", i).as_bytes(),
                            &vec![b'x'; VALUE_SIZE],
                            0,
                        )
                        .unwrap();
                }
            },
            BatchSize::SmallInput,
        );
    });
}

fn get_hit_benchmark(c: &mut Criterion) {
    c.bench_function("engine_get_hit_1k", |b| {
        b.iter_batched(
            loaded_engine,
            |(_dir, mut engine)| {
                for i in 0..N_KEYS {
                    let key = format!("key{:05}", i);
                    let v = engine.get(USER, key.as_bytes()).unwrap();
                    assert!(v.is_some());
                }
            },
            BatchSize::SmallInput,
        );
    });
}

fn get_miss_benchmark(c: &mut Criterion) {
    c.bench_function("engine_get_miss_1k", |b| {
        b.iter_batched(
            loaded_engine,
            |(_dir, mut engine)| {
                for i in 0..N_KEYS {
                    let key = format!("missing{:05}", i);
                    let v = engine.get(USER, key.as_bytes()).unwrap();
                    assert!(v.is_none());
                }
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, put_benchmark, get_hit_benchmark, get_miss_benchmark);
criterion_main!(benches);
