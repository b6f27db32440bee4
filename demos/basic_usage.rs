//! Basic worker pool usage
//!
//! Demonstrates task submission, result handles, shared state and the
//! shutdown lifecycle.
//!
//! Run with: RUST_LOG=debug cargo run --example basic_usage

use rust_worker_kit::prelude::*;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn main() -> Result<()> {
    env_logger::init();

    println!("=== Rust Worker Kit - Basic Usage Example ===\n");

    let pool = WorkerPool::with_config(WorkerPoolConfig::new(4).with_pool_name("demo"))?;
    println!("1. Started pool '{}' with {} workers", pool.name(), pool.num_workers());

    println!("\n2. Submitting tasks that share a counter and a listener list:");
    let counter = Arc::new(GuardedCounter::new(0));
    let seen = Arc::new(SnapshotList::new());

    for i in 0..10 {
        let counter = Arc::clone(&counter);
        let seen = Arc::clone(&seen);
        pool.execute(move || {
            println!("  Task {} executing on {:?}", i, thread::current().name());
            thread::sleep(Duration::from_millis(20));
            counter.increment();
            seen.append(i);
            Ok(())
        })?;
    }

    pool.execute(|| Err(WorkerError::other("this task fails on purpose")))?;

    let answer = pool.submit_with_result(|| Ok(6 * 7))?;
    println!("   Result handle returned {}", answer.join()?);

    println!("\n3. Graceful shutdown:");
    pool.shutdown();
    let terminated = pool.await_termination(Duration::from_secs(5));
    println!("   Terminated: {} (state: {})", terminated, pool.state());
    println!("   Counter: {}", counter.get());
    println!("   Completion order: {:?}", seen.snapshot());

    println!("\n4. Per-worker statistics:");
    for (i, stat) in pool.worker_stats().iter().enumerate() {
        println!(
            "   Worker {}: {} executed, {} failed, avg time: {:.2}μs",
            i,
            stat.tasks_executed(),
            stat.snapshot().tasks_failed,
            stat.average_busy_time_us()
        );
    }

    println!("\n5. Pool snapshot:\n   {}", pool.stats().to_json()?);

    println!("\n6. Immediate shutdown of a busy pool:");
    let busy = WorkerPool::new(1)?;
    busy.execute_interruptible(|token| token.sleep(Duration::from_secs(60)))?;
    for _ in 0..5 {
        busy.execute(|| Ok(()))?;
    }
    thread::sleep(Duration::from_millis(50));
    let discarded = busy.shutdown_now();
    println!("   Discarded {} queued tasks", discarded.len());
    println!(
        "   Terminated: {}",
        busy.await_termination(Duration::from_secs(5))
    );

    println!("\n=== Example completed successfully ===");
    Ok(())
}
