use elastic_pool::{telemetry, Config, WorkerPoolInner};
use tokio::runtime::Builder;
use tokio::time::Duration;
use std::time::Instant;


fn main() -> Result<(), Box<dyn std::error::Error>> {
    telemetry::init_tracing();

    let rt = Builder::new_multi_thread()
    .enable_all()
    .build()?;

    rt.block_on(async{
        let now = Instant::now();
        let config = Config::new(2, 8, 64).with_scale_interval(Duration::from_millis(200));
        let pool = WorkerPoolInner::<u64>::new(config)?;
        pool.start()?;

        let monitor = pool.start_monitoring(Duration::from_millis(500), |metrics| {
            tracing::info!(
                workers = metrics.active_workers,
                queued = metrics.queue_length,
                completed = metrics.completed,
                "pool metrics"
            );
        });

        let mut handles = Vec::new();
        for i in 0..1_000u64 {
            handles.push(pool.spawn(move || {
                std::thread::sleep(Duration::from_millis(5));
                i * i
            }).await?);
        }
        let mut sum = 0u64;
        for handle in handles {
            sum += handle.await?;
        }

        monitor.cancel();
        pool.stop().await?;
        println!("sum: {sum}, elapsed: {:?}", now.elapsed());
        print!("{}", pool.metrics());
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}
