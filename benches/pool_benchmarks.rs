use criterion::{criterion_group, criterion_main, Criterion, BenchmarkId, Throughput};
use elastic_pool::{Config as PoolConfig, WorkerPoolInner};
use tokio::sync::oneshot;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use std::hint::black_box;

fn create_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .enable_all()
        .build()
        .unwrap()
}

// Benchmark 1: submit + ожидание результата
fn bench_submit_overhead(c: &mut Criterion) {
    let mut group = c.benchmark_group("submit_overhead");

    for size in [100, 1000, 10000] {
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("spawn", size), &size, |b, &size| {
            let rt = create_runtime();
            let pool = rt.block_on(async {
                let pool = WorkerPoolInner::<usize>::new(PoolConfig::default()).unwrap();
                pool.start().unwrap();
                pool
            });

            b.to_async(&rt).iter(|| {
                let pool = &pool;
                async move {
                    let mut handles = Vec::with_capacity(size);
                    for i in 0..size {
                        handles.push(pool.spawn(move || black_box(i)).await.unwrap());
                    }
                    for handle in handles {
                        black_box(handle.await.unwrap());
                    }
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("submit", size), &size, |b, &size| {
            let rt = create_runtime();
            let pool = rt.block_on(async {
                let pool = WorkerPoolInner::<usize>::new(PoolConfig::default()).unwrap();
                pool.start().unwrap();
                pool
            });
            let cancel = CancellationToken::new();

            b.to_async(&rt).iter(|| {
                let (pool, cancel) = (&pool, &cancel);
                async move {
                    let mut receivers = Vec::with_capacity(size);
                    for i in 0..size {
                        let (tx, rx) = oneshot::channel();
                        pool.submit(cancel, move || black_box(i), tx).await.unwrap();
                        receivers.push(rx);
                    }
                    for rx in receivers {
                        black_box(rx.await.unwrap().unwrap());
                    }
                }
            });
        });
    }

    group.finish();
}

// Benchmark 2: число воркеров
fn bench_worker_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("worker_scaling");
    group.sample_size(20);

    let tasks = 2000;
    group.throughput(Throughput::Elements(tasks as u64));

    for workers in [1, 2, 4, 8].iter() {
        if *workers <= num_cpus::get() * 2 {
            group.bench_with_input(BenchmarkId::new("workers", workers), workers, |b, &workers| {
                let rt = create_runtime();
                b.to_async(&rt).iter(|| async move {
                    let pool = WorkerPoolInner::<u64>::new(PoolConfig::new(workers, workers, 256)).unwrap();
                    pool.start().unwrap();

                    let mut handles = Vec::with_capacity(tasks);
                    for i in 0..tasks as u64 {
                        handles.push(pool.spawn(move || {
                            let mut sum = 0u64;
                            for j in 0..1000 {
                                sum = sum.wrapping_add(i * j);
                            }
                            black_box(sum)
                        }).await.unwrap());
                    }
                    for handle in handles {
                        let _ = handle.await;
                    }
                    pool.stop().await.unwrap();
                });
            });
        }
    }

    group.finish();
}

// Benchmark 3: CPU-bound vs I/O-bound config
fn bench_config_comparison(c: &mut Criterion) {
    let mut group = c.benchmark_group("config_comparison");
    group.sample_size(20);

    let tasks = 1000u64;

    for (name, config) in [("cpu_bound", PoolConfig::cpu_bound()), ("io_bound", PoolConfig::io_bound())] {
        group.bench_function(name, |b| {
            let rt = create_runtime();
            b.to_async(&rt).iter(|| {
                let config = config.clone();
                async move {
                    let pool = WorkerPoolInner::<u64>::new(config).unwrap();
                    pool.start().unwrap();
                    let mut handles = Vec::new();
                    for x in 0..tasks {
                        handles.push(pool.spawn(move || black_box(x * x * x)).await.unwrap());
                    }
                    for handle in handles {
                        let _ = handle.await;
                    }
                    pool.stop().await.unwrap();
                }
            });
        });
    }

    group.finish();
}

// Benchmark 4: Latency под нагрузкой
fn bench_latency_under_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("latency_under_load");
    group.sample_size(30);

    group.bench_function("single_with_load", |b| {
        let rt = create_runtime();
        b.to_async(&rt).iter(|| async {
            let pool = WorkerPoolInner::<u32>::new(PoolConfig::new(4, 4, 2048)).unwrap();
            pool.start().unwrap();

            // Фоновая нагрузка
            let mut background = Vec::new();
            for i in 0..200u32 {
                background.push(pool.spawn(move || {
                    std::thread::sleep(Duration::from_micros(200));
                    i
                }).await.unwrap());
            }

            let handle = pool.spawn(|| black_box(42)).await.unwrap();
            let _result = handle.await;
            pool.stop().await.unwrap();
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_submit_overhead,
    bench_worker_scaling,
    bench_config_comparison,
    bench_latency_under_load,
);
criterion_main!(benches);
