use std::any::type_name;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::{
    Diagnostics, DiagnosticsSink, ErrorPolicy, Result, SlotPool, Synchronization, ThreadSafe,
    Unsynchronized,
};

/// Builder for creating an instance of [`SlotPool`].
///
/// The capacity is mandatory and is given when the builder is created, whereas other settings
/// are optional.
///
/// # Examples
///
/// ```
/// use slot_pool::{ErrorPolicy, SlotPool};
///
/// let pool = SlotPool::<String>::builder(64)
///     .error_policy(ErrorPolicy::Propagate)
///     .diagnostics(|line| eprintln!("{line}"))
///     .build()
///     .unwrap();
///
/// assert_eq!(pool.capacity(), 64);
/// ```
#[must_use]
pub struct SlotPoolBuilder<T, S: Synchronization = Unsynchronized> {
    capacity: usize,
    error_policy: ErrorPolicy,
    sink: Option<Arc<DiagnosticsSink>>,

    _item: PhantomData<fn() -> T>,
    _sync: PhantomData<fn() -> S>,
}

impl<T> SlotPoolBuilder<T> {
    #[inline]
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            error_policy: ErrorPolicy::default(),
            sink: None,
            _item: PhantomData,
            _sync: PhantomData,
        }
    }

    /// Makes the pool shareable between threads, guarding its bookkeeping with a mutex.
    ///
    /// # Examples
    ///
    /// ```
    /// use slot_pool::{SlotPool, ThreadSafe};
    ///
    /// let pool: SlotPool<u64, ThreadSafe> = SlotPool::builder(16).thread_safe().build().unwrap();
    /// ```
    #[inline]
    pub fn thread_safe(self) -> SlotPoolBuilder<T, ThreadSafe> {
        SlotPoolBuilder {
            capacity: self.capacity,
            error_policy: self.error_policy,
            sink: self.sink,
            _item: PhantomData,
            _sync: PhantomData,
        }
    }
}

impl<T, S: Synchronization> SlotPoolBuilder<T, S> {
    /// Sets the [error policy][ErrorPolicy] of the pool.
    #[inline]
    pub fn error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    /// Shorthand for `.error_policy(ErrorPolicy::callback(f))`.
    ///
    /// # Examples
    ///
    /// ```
    /// use slot_pool::SlotPool;
    ///
    /// let pool = SlotPool::<u8>::builder(1)
    ///     .error_callback(|message, code| eprintln!("pool error {code}: {message}"))
    ///     .build()
    ///     .unwrap();
    ///
    /// let _first = pool.emplace(1).unwrap();
    /// assert!(pool.emplace(2).unwrap().is_empty());
    /// ```
    #[inline]
    pub fn error_callback(self, f: impl Fn(&str, usize) + Send + Sync + 'static) -> Self {
        self.error_policy(ErrorPolicy::callback(f))
    }

    /// Sets a sink that receives a one-line description of every pool event.
    ///
    /// Events are always emitted through `tracing` under the `slot_pool` target. The sink is an
    /// additional channel for callers who want the same information without a subscriber.
    #[inline]
    pub fn diagnostics(mut self, sink: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Builds the pool, allocating storage for all of its slots.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`][crate::Error::InvalidArgument] if the capacity is zero
    /// and [`Error::AllocationFailure`][crate::Error::AllocationFailure] if the storage cannot
    /// be allocated. If an error callback is configured, it is invoked before the error is
    /// returned.
    #[inline]
    pub fn build(self) -> Result<SlotPool<T, S>> {
        SlotPool::from_config(
            self.capacity,
            self.error_policy,
            Diagnostics::new::<T>(self.sink),
        )
    }
}

impl<T, S: Synchronization> fmt::Debug for SlotPoolBuilder<T, S> {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("capacity", &self.capacity)
            .field("error_policy", &self.error_policy)
            .field("sink", &self.sink.as_ref().map(|_| ".."))
            .finish_non_exhaustive()
    }
}
