use at_same_time::{AsyncPool, PoolConfig, Promise};
use std::thread;
use std::time::Duration;
use tracing::info;

struct WorkArgs {
  task_number: usize,
  duration: Duration,
}

fn work(args: WorkArgs) -> usize {
  // do a lot of work
  thread::sleep(args.duration);
  info!("thread: {}", args.task_number);
  args.task_number
}

fn report(pool: &AsyncPool<usize>, promises: &[Promise]) {
  for (i, promise) in promises.iter().enumerate() {
    info!("result{} finished: {}", i + 1, pool.is_finished(*promise));
  }
}

fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false)
    .init();

  info!("--- Three Tasks Example ---");

  let pool = AsyncPool::<usize>::with_config(
    PoolConfig::new()
      .name("three_tasks")
      .initial_capacity(16)
      .poll_interval(Duration::from_micros(10)),
  );

  let promises: Vec<Promise> = (1..=3)
    .map(|task_number| {
      let args = WorkArgs {
        task_number,
        duration: Duration::from_secs(task_number as u64),
      };
      pool.register(work, args)
    })
    .collect();

  // Wait indefinitely for the first task.
  let result1 = pool.get_result(promises[0], None);
  report(&pool, &promises);

  // Only wait 500 microseconds for the second one.
  match pool.get_result(promises[1], Some(Duration::from_micros(500))) {
    Ok(value) => info!("result2: {}", value),
    Err(e) => info!("result2: {}", e),
  }
  report(&pool, &promises);

  let result2 = pool.get_result(promises[1], None);
  report(&pool, &promises);

  info!("result1: {:?}", result1);
  info!("result2: {:?}", result2);

  // Joins the third task too.
  pool.shutdown();
  info!("--- Three Tasks Example End ---");
}
