#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! A fixed-capacity object pool that hands out equally sized slots from one pre-allocated block.
//!
//! This crate provides [`SlotPool`], which reserves storage for a fixed number of `T` values when
//! it is built and then constructs, drops and reuses values in that storage in constant time.
//! After construction, no operation of the pool touches the global allocator, which makes it
//! suitable for latency-sensitive code that creates and destroys many short-lived objects.
//!
//! # Key Features
//!
//! - **Single allocation**: All slots live in one contiguous, correctly aligned heap block
//! - **Constant-time emplace and drop**: Freed slots go onto an intrusive free-list
//! - **LIFO reuse**: The most recently freed slot is handed out next, keeping caches warm
//! - **RAII ownership**: Every object is owned by a [`Handle`] that drops it and frees its slot
//! - **Unwind safety**: A panicking or failing constructor leaves the pool as it was
//! - **Configurable error reporting**: Return errors or route them to a callback via
//!   [`ErrorPolicy`]
//! - **Optional thread safety**: Choose [`Unsynchronized`] or [`ThreadSafe`] at build time
//! - **Diagnostics**: Every pool event is emitted through `tracing` and, optionally, a text sink
//!
//! # Examples
//!
//! ## Basic usage
//!
//! ```rust
//! use slot_pool::SlotPool;
//!
//! #[derive(Debug)]
//! struct Order {
//!     id: u64,
//!     quantity: u32,
//! }
//!
//! let pool = SlotPool::<Order>::new(1024).unwrap();
//!
//! let mut order = pool.emplace(Order { id: 1, quantity: 10 }).unwrap();
//! order.quantity += 5;
//!
//! assert_eq!(order.id, 1);
//! assert_eq!(order.quantity, 15);
//! assert_eq!(pool.used(), 1);
//!
//! // Dropping the handle drops the order and frees its slot.
//! drop(order);
//! assert_eq!(pool.used(), 0);
//! ```
//!
//! ## Reacting to exhaustion without errors
//!
//! ```rust
//! use slot_pool::{Error, SlotPool};
//!
//! let pool = SlotPool::<u32>::builder(1)
//!     .error_callback(|message, code| {
//!         assert_eq!(code, Error::POOL_EXHAUSTED);
//!         eprintln!("{message}");
//!     })
//!     .build()
//!     .unwrap();
//!
//! let first = pool.emplace(1).unwrap();
//! let second = pool.emplace(2).unwrap();
//!
//! assert!(first.is_occupied());
//! assert!(second.is_empty());
//! ```
//!
//! ## Sharing a pool between threads
//!
//! ```rust
//! use std::thread;
//!
//! use slot_pool::SlotPool;
//!
//! let pool = SlotPool::<String>::builder(16).thread_safe().build().unwrap();
//!
//! thread::scope(|s| {
//!     for worker in 0..4 {
//!         let pool = &pool;
//!
//!         s.spawn(move || {
//!             let name = pool.emplace(format!("worker {worker}")).unwrap();
//!             assert!(name.starts_with("worker"));
//!         });
//!     }
//! });
//!
//! assert!(pool.is_empty());
//! assert!(pool.high_water_mark() <= 4);
//! ```

mod builder;
mod diagnostics;
mod error;
mod error_policy;
mod handle;
mod ledger;
mod pool;
mod slot;
mod sync;

pub use builder::*;
pub(crate) use diagnostics::Diagnostics;
pub use diagnostics::DiagnosticsSink;
pub(crate) use error::Result;
pub use error::{EmplaceError, Error};
pub use error_policy::*;
pub use handle::*;
pub(crate) use ledger::*;
pub use pool::*;
pub(crate) use slot::*;
pub use sync::{Synchronization, ThreadSafe, Unsynchronized};
