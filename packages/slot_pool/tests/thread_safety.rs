//! Tests for sharing a thread-safe `SlotPool` between threads.

use std::sync::Barrier;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use slot_pool::{SlotPool, ThreadSafe};

const THREADS: usize = 8;

#[test]
fn concurrent_traffic_never_exceeds_capacity() {
    const CAPACITY: usize = 16;
    const ROUNDS: usize = 500;

    let pool: SlotPool<usize, ThreadSafe> =
        SlotPool::builder(CAPACITY).thread_safe().build().unwrap();

    thread::scope(|s| {
        for worker in 0..THREADS {
            let pool = &pool;

            s.spawn(move || {
                for round in 0..ROUNDS {
                    let first = pool.emplace(worker * ROUNDS + round);
                    let second = pool.emplace(round);

                    assert!(pool.used() <= CAPACITY);

                    if let Ok(handle) = &first {
                        assert_eq!(**handle, worker * ROUNDS + round);
                    }

                    drop(second);
                    drop(first);
                }
            });
        }
    });

    assert_eq!(pool.used(), 0);
    assert!(pool.high_water_mark() <= CAPACITY);
}

#[test]
fn exactly_capacity_threads_win_the_last_slots() {
    const CAPACITY: usize = 3;

    let pool: SlotPool<usize, ThreadSafe> =
        SlotPool::builder(CAPACITY).thread_safe().build().unwrap();

    let barrier = Barrier::new(THREADS);
    let succeeded = AtomicUsize::new(0);
    let release = Barrier::new(THREADS);

    thread::scope(|s| {
        for worker in 0..THREADS {
            let (pool, barrier, succeeded, release) = (&pool, &barrier, &succeeded, &release);

            s.spawn(move || {
                barrier.wait();

                let result = pool.emplace(worker);

                if result.is_ok() {
                    succeeded.fetch_add(1, Ordering::Relaxed);
                }

                // Keep winners alive until everyone has tried.
                release.wait();
                drop(result);
            });
        }
    });

    assert_eq!(succeeded.load(Ordering::Relaxed), CAPACITY);
    assert_eq!(pool.used(), 0);
}

#[test]
fn handles_can_move_between_threads() {
    let pool = SlotPool::<String>::builder(4).thread_safe().build().unwrap();

    let handle = pool.emplace("traveler".to_string()).unwrap();

    thread::scope(|s| {
        s.spawn(move || {
            assert_eq!(*handle, "traveler");
            drop(handle);
        });
    });

    assert!(pool.is_empty());
}

#[test]
fn pool_can_move_to_another_thread() {
    let pool = SlotPool::<u64>::new(4).unwrap();

    let used = thread::spawn(move || {
        let handle = pool.emplace(1).unwrap();
        let used = pool.used();
        drop(handle);
        used
    })
    .join()
    .unwrap();

    assert_eq!(used, 1);
}
