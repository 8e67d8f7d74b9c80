use std::cell::RefCell;
use std::fmt::Debug;
use std::sync::Mutex;

use crate::Ledger;

const ERR_POISONED_LOCK: &str = "slot pool ledger lock was poisoned, which can only happen if \
    pool bookkeeping itself panicked; the pool is in an unknown state";

/// Decides how a [`SlotPool`][crate::SlotPool] protects its allocation bookkeeping.
///
/// The strategy is chosen when the pool is built and is part of the pool type:
///
/// * [`Unsynchronized`] (the default) keeps bookkeeping in a `RefCell`. The pool can be moved
///   between threads but not shared between them.
/// * [`ThreadSafe`] keeps bookkeeping behind a single mutex. The pool is [`Sync`] and can be
///   shared between threads, with each thread emplacing and dropping its own handles.
///
/// In both cases the bookkeeping is only ever accessed for a few pointer and counter updates.
/// Object constructors and destructors run outside of it.
///
/// This trait is sealed and cannot be implemented outside this crate.
pub trait Synchronization: sealed::Sealed + Debug {}

pub(crate) mod sealed {
    use crate::Ledger;

    #[allow(
        unnameable_types,
        unreachable_pub,
        reason = "sealed trait pattern, the trait must be public but unnameable"
    )]
    pub trait Sealed: Sized {
        fn new(ledger: Ledger) -> Self;

        fn with_ledger<R>(&self, f: impl FnOnce(&mut Ledger) -> R) -> R;

        fn with_ledger_mut<R>(&mut self, f: impl FnOnce(&mut Ledger) -> R) -> R;
    }
}

/// Single-threaded bookkeeping without any locking.
///
/// Pools using this strategy are [`Send`] (if the item type is) but not [`Sync`].
///
/// # Example
///
/// ```
/// use slot_pool::{SlotPool, Unsynchronized};
///
/// let pool: SlotPool<u32, Unsynchronized> = SlotPool::new(4).unwrap();
/// let item = pool.emplace(5).unwrap();
/// assert_eq!(*item, 5);
/// ```
#[derive(Debug)]
pub struct Unsynchronized {
    ledger: RefCell<Ledger>,
}

impl sealed::Sealed for Unsynchronized {
    fn new(ledger: Ledger) -> Self {
        Self {
            ledger: RefCell::new(ledger),
        }
    }

    fn with_ledger<R>(&self, f: impl FnOnce(&mut Ledger) -> R) -> R {
        // The borrow never overlaps with user code, so it cannot be taken twice.
        f(&mut self.ledger.borrow_mut())
    }

    fn with_ledger_mut<R>(&mut self, f: impl FnOnce(&mut Ledger) -> R) -> R {
        f(self.ledger.get_mut())
    }
}

impl Synchronization for Unsynchronized {}

/// Thread-safe bookkeeping behind one mutex.
///
/// Pools using this strategy are [`Send`] and [`Sync`] as long as the item type is [`Send`].
/// The mutex is held only while a slot is reserved, committed or returned.
///
/// # Example
///
/// ```
/// use std::thread;
///
/// use slot_pool::SlotPool;
///
/// let pool = SlotPool::<u64>::builder(8).thread_safe().build().unwrap();
///
/// thread::scope(|s| {
///     for worker in 0..4_u64 {
///         let pool = &pool;
///         s.spawn(move || {
///             let item = pool.emplace(worker).unwrap();
///             assert_eq!(*item, worker);
///         });
///     }
/// });
///
/// assert_eq!(pool.used(), 0);
/// ```
#[derive(Debug)]
pub struct ThreadSafe {
    ledger: Mutex<Ledger>,
}

impl sealed::Sealed for ThreadSafe {
    fn new(ledger: Ledger) -> Self {
        Self {
            ledger: Mutex::new(ledger),
        }
    }

    fn with_ledger<R>(&self, f: impl FnOnce(&mut Ledger) -> R) -> R {
        let mut ledger = self.ledger.lock().expect(ERR_POISONED_LOCK);
        f(&mut ledger)
    }

    fn with_ledger_mut<R>(&mut self, f: impl FnOnce(&mut Ledger) -> R) -> R {
        f(self.ledger.get_mut().expect(ERR_POISONED_LOCK))
    }
}

impl Synchronization for ThreadSafe {}
