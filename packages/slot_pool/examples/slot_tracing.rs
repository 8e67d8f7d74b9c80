//! Example showing how to observe `SlotPool` events.
//!
//! Pool events are emitted through `tracing` under the `slot_pool` target. This example installs
//! a `tracing_subscriber` formatter to print them, and also shows the diagnostics sink and the
//! error callback, which work without any subscriber.

use std::thread;

use slot_pool::SlotPool;
use tracing::Level;

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(Level::TRACE)
        .init();

    let pool = SlotPool::<String>::builder(2)
        .thread_safe()
        .diagnostics(|line| println!("[sink] {line}"))
        .error_callback(|message, code| println!("[callback] code {code}: {message}"))
        .build()
        .expect("capacity is non-zero and small enough to allocate");

    thread::scope(|s| {
        for worker in 0..3 {
            let pool = &pool;

            s.spawn(move || {
                let handle = pool
                    .emplace(format!("job from worker {worker}"))
                    .expect("exhaustion is reported to the callback");

                match handle.get() {
                    Some(job) => println!("worker {worker} got {job}"),
                    None => println!("worker {worker} found the pool full"),
                }
            });
        }
    });

    println!(
        "Used: {}, high-water mark: {}",
        pool.used(),
        pool.high_water_mark()
    );
}
