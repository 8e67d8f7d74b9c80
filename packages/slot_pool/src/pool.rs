use std::alloc::Layout;
use std::any::type_name;
use std::convert::Infallible;
use std::fmt;
use std::mem::MaybeUninit;
use std::num::NonZero;
use std::ptr::NonNull;
use std::thread;

use scopeguard::ScopeGuard;

use crate::{
    Diagnostics, EmplaceError, Error, ErrorPolicy, Handle, Ledger, Reservation, Result, SlotArray,
    SlotPoolBuilder, Synchronization, Unsynchronized,
};

/// A fixed-capacity pool of equally sized slots for objects of type `T`.
///
/// All storage is allocated once, when the pool is built, as one contiguous block of
/// [`capacity()`][Self::capacity] slots. Emplacing an object takes a slot, constructs the object
/// directly in it and returns a [`Handle`] that owns the object. Dropping the handle drops the
/// object and returns the slot to the pool. Neither operation touches the global allocator.
///
/// Vacant slots are reused last-in-first-out: the most recently freed slot is the next one handed
/// out. Slots that have never been used are only taken when no freed slot is available.
///
/// # Lifetimes
///
/// Handles borrow the pool, so the pool cannot be dropped or moved while any handle is alive.
///
/// # Thread safety
///
/// The second type parameter selects the [synchronization strategy][Synchronization]:
///
/// * `SlotPool<T>` (the same as `SlotPool<T, Unsynchronized>`) is [`Send`] if `T` is, but not
///   [`Sync`]. This is the default and does no locking.
/// * `SlotPool<T, ThreadSafe>`, created via [`SlotPoolBuilder::thread_safe()`], is both [`Send`]
///   and [`Sync`] if `T` is [`Send`].
///
/// # Example
///
/// ```
/// use slot_pool::SlotPool;
///
/// let pool = SlotPool::<String>::new(2).unwrap();
///
/// let mut greeting = pool.emplace("Hello".to_string()).unwrap();
/// greeting.push_str(", world");
///
/// assert_eq!(*greeting, "Hello, world");
/// assert_eq!(pool.used(), 1);
/// assert_eq!(pool.available(), 1);
///
/// drop(greeting);
/// assert_eq!(pool.used(), 0);
/// ```
pub struct SlotPool<T, S: Synchronization = Unsynchronized> {
    slots: SlotArray<T>,

    // Allocation bookkeeping behind the chosen synchronization strategy. Everything else in the
    // pool is immutable after construction.
    sync: S,

    error_policy: ErrorPolicy,

    diagnostics: Diagnostics,
}

impl<T> SlotPool<T> {
    /// Creates a single-threaded pool with room for `capacity` objects.
    ///
    /// Use [`builder()`][Self::builder] to configure error reporting, diagnostics or
    /// thread safety.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `capacity` is zero and [`Error::AllocationFailure`]
    /// if the storage cannot be allocated.
    ///
    /// # Example
    ///
    /// ```
    /// use slot_pool::SlotPool;
    ///
    /// let pool = SlotPool::<u64>::new(100).unwrap();
    /// assert_eq!(pool.capacity(), 100);
    /// assert!(pool.is_empty());
    /// ```
    #[inline]
    pub fn new(capacity: usize) -> Result<Self> {
        Self::builder(capacity).build()
    }

    /// Starts building a pool with room for `capacity` objects.
    #[inline]
    pub fn builder(capacity: usize) -> SlotPoolBuilder<T> {
        SlotPoolBuilder::new(capacity)
    }
}

impl<T, S: Synchronization> SlotPool<T, S> {
    pub(crate) fn from_config(
        capacity: usize,
        error_policy: ErrorPolicy,
        diagnostics: Diagnostics,
    ) -> Result<Self> {
        let slots = NonZero::new(capacity)
            .ok_or(Error::InvalidArgument)
            .and_then(SlotArray::<T>::allocate);

        let slots = match slots {
            Ok(slots) => slots,
            Err(error) => {
                diagnostics.error_reported(&error);

                // There is no safe default for a pool that does not exist, so the error is
                // returned even if a callback has seen it.
                _ = error_policy.notify(&error);

                return Err(error);
            }
        };

        diagnostics.pool_created(
            capacity,
            SlotArray::<T>::slot_layout().size(),
            slots.size_in_bytes(),
        );

        Ok(Self {
            slots,
            sync: S::new(Ledger::new(capacity)),
            error_policy,
            diagnostics,
        })
    }

    /// The number of objects the pool can hold at the same time.
    #[must_use]
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.capacity().get()
    }

    /// The number of slots currently holding an object.
    ///
    /// Objects detached from their handle with [`Handle::into_raw()`] are still counted.
    #[must_use]
    #[inline]
    pub fn used(&self) -> usize {
        self.sync.with_ledger(|ledger| ledger.used())
    }

    /// The number of objects that can still be emplaced before the pool is exhausted.
    #[must_use]
    #[inline]
    pub fn available(&self) -> usize {
        // Cannot overflow, used never exceeds capacity.
        self.capacity().wrapping_sub(self.used())
    }

    /// The number of distinct slots that have ever held an object.
    ///
    /// This never decreases. It reaches [`capacity()`][Self::capacity] only once every slot has
    /// been in use at some point, which makes it a useful signal when sizing pools.
    #[must_use]
    #[inline]
    pub fn high_water_mark(&self) -> usize {
        self.sync.with_ledger(|ledger| ledger.high_water())
    }

    /// Whether no slot currently holds an object.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.used() == 0
    }

    /// Whether every slot currently holds an object.
    #[must_use]
    #[inline]
    pub fn is_full(&self) -> bool {
        self.used() == self.capacity()
    }

    /// The memory layout of one slot.
    ///
    /// The size is the larger of `size_of::<T>()` and `size_of::<usize>()`, rounded up to the
    /// larger of the two alignments. The size is also the distance in bytes between
    /// neighboring slots.
    ///
    /// # Example
    ///
    /// ```
    /// use slot_pool::SlotPool;
    ///
    /// assert_eq!(SlotPool::<u8>::slot_layout().size(), size_of::<usize>());
    /// assert_eq!(SlotPool::<[u64; 4]>::slot_layout().size(), 32);
    /// ```
    #[must_use]
    #[inline]
    pub fn slot_layout() -> Layout {
        SlotArray::<T>::slot_layout()
    }

    /// The error policy the pool was built with.
    #[must_use]
    #[inline]
    pub fn error_policy(&self) -> &ErrorPolicy {
        &self.error_policy
    }

    /// Moves `value` into a vacant slot and returns a handle that owns it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolExhausted`] if every slot is in use. If the pool was built with an
    /// [error callback][ErrorPolicy::Callback], the callback is invoked instead and an empty
    /// handle is returned.
    ///
    /// # Example
    ///
    /// ```
    /// use slot_pool::SlotPool;
    ///
    /// let pool = SlotPool::<u32>::new(1).unwrap();
    ///
    /// let first = pool.emplace(1).unwrap();
    /// assert!(pool.emplace(2).is_err());
    ///
    /// drop(first);
    /// assert_eq!(*pool.emplace(3).unwrap(), 3);
    /// ```
    #[inline]
    pub fn emplace(&self, value: T) -> Result<Handle<'_, T, S>> {
        self.emplace_with(|| value)
    }

    /// Reserves a vacant slot, then calls `f` to create the object for it.
    ///
    /// Nothing is constructed if the pool is exhausted. If `f` panics, the reserved slot is
    /// returned to the pool before the panic continues and the pool remains fully usable.
    ///
    /// # Errors
    ///
    /// Same as [`emplace()`][Self::emplace].
    ///
    /// # Example
    ///
    /// ```
    /// use slot_pool::SlotPool;
    ///
    /// let pool = SlotPool::<Vec<u8>>::new(4).unwrap();
    /// let buffer = pool.emplace_with(|| Vec::with_capacity(1024)).unwrap();
    ///
    /// assert!(buffer.capacity() >= 1024);
    /// ```
    pub fn emplace_with(&self, f: impl FnOnce() -> T) -> Result<Handle<'_, T, S>> {
        let Some(reservation) = self.reserve() else {
            return self.exhausted();
        };

        let handle = self.construct(reservation, |ptr| {
            let value = f();

            // SAFETY: The slot is reserved for us, so nobody else is accessing it, and slot
            // storage is sized and aligned for `T`.
            unsafe {
                ptr.write(value);
            }

            Ok::<(), Infallible>(())
        });

        Ok(handle.unwrap_or_else(|never| match never {}))
    }

    /// Reserves a vacant slot, then calls a fallible `f` to create the object for it.
    ///
    /// If `f` returns an error or panics, the reserved slot is returned to the pool and the pool
    /// state is as it was before the call.
    ///
    /// # Errors
    ///
    /// Returns [`EmplaceError::Construction`] with the error from `f`, or [`EmplaceError::Pool`]
    /// under the same conditions in which [`emplace()`][Self::emplace] fails.
    ///
    /// # Example
    ///
    /// ```
    /// use slot_pool::{EmplaceError, SlotPool};
    ///
    /// let pool = SlotPool::<u16>::new(4).unwrap();
    ///
    /// let parsed = pool.try_emplace_with(|| "443".parse::<u16>()).unwrap();
    /// assert_eq!(*parsed, 443);
    ///
    /// let failed = pool.try_emplace_with(|| "https".parse::<u16>());
    /// assert!(matches!(failed, Err(EmplaceError::Construction(_))));
    /// assert_eq!(pool.used(), 1);
    /// ```
    pub fn try_emplace_with<E>(
        &self,
        f: impl FnOnce() -> Result<T, E>,
    ) -> Result<Handle<'_, T, S>, EmplaceError<E>> {
        let Some(reservation) = self.reserve() else {
            return self.exhausted().map_err(EmplaceError::Pool);
        };

        self.construct(reservation, |ptr| {
            let value = f()?;

            // SAFETY: The slot is reserved for us, so nobody else is accessing it, and slot
            // storage is sized and aligned for `T`.
            unsafe {
                ptr.write(value);
            }

            Ok(())
        })
        .map_err(EmplaceError::Construction)
    }

    /// Reserves a vacant slot and lets `f` initialize the object directly in slot memory.
    ///
    /// This avoids constructing the object on the stack first, which matters for large types.
    ///
    /// # Errors
    ///
    /// Same as [`emplace()`][Self::emplace]. `f` is not called if the pool is exhausted.
    ///
    /// # Example
    ///
    /// ```
    /// use std::mem::MaybeUninit;
    ///
    /// use slot_pool::SlotPool;
    ///
    /// let pool = SlotPool::<[u64; 512]>::new(2).unwrap();
    ///
    /// // SAFETY: The closure fully initializes the array.
    /// let table = unsafe {
    ///     pool.emplace_in_place(|uninit: &mut MaybeUninit<[u64; 512]>| {
    ///         let first = uninit.as_mut_ptr().cast::<u64>();
    ///
    ///         for i in 0..512 {
    ///             first.add(i).write(i as u64);
    ///         }
    ///     })
    /// }
    /// .unwrap();
    ///
    /// assert_eq!(table[511], 511);
    /// ```
    ///
    /// # Safety
    ///
    /// `f` must fully initialize the value before returning. If it panics, the slot is returned
    /// to the pool and whatever it wrote is forgotten without being dropped.
    pub unsafe fn emplace_in_place(
        &self,
        f: impl FnOnce(&mut MaybeUninit<T>),
    ) -> Result<Handle<'_, T, S>> {
        let Some(reservation) = self.reserve() else {
            return self.exhausted();
        };

        let handle = self.construct(reservation, |ptr| {
            // SAFETY: The slot is reserved for us and `MaybeUninit<T>` has the layout of `T`.
            let uninit = unsafe { ptr.cast::<MaybeUninit<T>>().as_mut() };

            f(uninit);

            Ok::<(), Infallible>(())
        });

        Ok(handle.unwrap_or_else(|never| match never {}))
    }

    /// Adopts an object previously detached with [`Handle::into_raw()`].
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `into_raw()` on a handle of this pool, and must not have
    /// been adopted since. The object must not have been dropped or moved out.
    ///
    /// # Panics
    ///
    /// Panics if `ptr` does not point into this pool.
    #[must_use]
    pub unsafe fn from_raw(&self, ptr: NonNull<T>) -> Handle<'_, T, S> {
        // Panics if the pointer belongs to another pool.
        _ = self.slots.index_of(ptr);

        Handle::new(self, ptr)
    }

    /// Drops the object in a slot and returns the slot to the pool.
    ///
    /// The slot is returned even if the object's destructor panics.
    ///
    /// # Safety
    ///
    /// `ptr` must point to a live object of this pool that the caller owns. The object must not
    /// be accessed afterwards.
    pub(crate) unsafe fn destroy(&self, ptr: NonNull<T>) {
        let index = self.slots.index_of(ptr);

        let _release = scopeguard::guard(index, |index| self.release(index));

        // SAFETY: Forwarding guarantees from the caller.
        unsafe {
            ptr.drop_in_place();
        }

        self.diagnostics.object_destroyed(index);
    }

    /// Moves the object out of a slot and returns the slot to the pool.
    ///
    /// # Safety
    ///
    /// Same as [`destroy()`][Self::destroy].
    #[must_use]
    pub(crate) unsafe fn take_value(&self, ptr: NonNull<T>) -> T {
        let index = self.slots.index_of(ptr);

        // SAFETY: Forwarding guarantees from the caller. Once the slot is released, the bytes
        // left behind are never treated as a `T` again.
        let value = unsafe { ptr.read() };

        self.release(index);

        value
    }

    fn reserve(&self) -> Option<Reservation> {
        self.sync.with_ledger(|ledger| ledger.reserve(&self.slots))
    }

    /// Reports exhaustion according to the error policy.
    fn exhausted(&self) -> Result<Handle<'_, T, S>> {
        let error = Error::PoolExhausted {
            capacity: self.capacity(),
        };

        self.diagnostics.error_reported(&error);

        if self.error_policy.notify(&error) {
            Ok(Handle::default())
        } else {
            Err(error)
        }
    }

    /// Runs `init` against a reserved slot, committing the slot if it succeeds and cancelling
    /// the reservation if it fails or panics.
    fn construct<E>(
        &self,
        reservation: Reservation,
        init: impl FnOnce(NonNull<T>) -> Result<(), E>,
    ) -> Result<Handle<'_, T, S>, E> {
        let index = reservation.index();
        let ptr = self.slots.value_ptr(index);

        let cancel_on_failure = scopeguard::guard(index, |index| {
            self.sync
                .with_ledger(|ledger| ledger.cancel(&self.slots, index));

            self.diagnostics.construction_failed(index);
        });

        // The sink may panic, so user code only runs once the guard is armed.
        self.diagnostics.slot_reserved(reservation);

        init(ptr)?;

        let index = ScopeGuard::into_inner(cancel_on_failure);

        self.sync.with_ledger(Ledger::commit);

        // From here on the handle owns the object, dropping it if the sink panics.
        let handle = Handle::new(self, ptr);
        self.diagnostics.object_constructed(index);

        Ok(handle)
    }

    fn release(&self, index: usize) {
        self.sync
            .with_ledger(|ledger| ledger.retire(&self.slots, index));

        self.diagnostics.slot_freed(index);
    }
}

impl<T, S: Synchronization> Drop for SlotPool<T, S> {
    #[cfg_attr(test, mutants::skip)] // Impractical to test drop-time assertions.
    fn drop(&mut self) {
        let (used, high_water) = self
            .sync
            .with_ledger_mut(|ledger| (ledger.used(), ledger.high_water()));

        self.diagnostics.pool_dropped(used, high_water);

        if thread::panicking() {
            // A second panic here would abort and hide the first one.
            return;
        }

        #[cfg(debug_assertions)]
        self.sync
            .with_ledger_mut(|ledger| ledger.integrity_check(&self.slots));

        // Objects still counted as used were detached with `into_raw()` and never adopted.
        // Their slots are released with the storage and their destructors never run.
        debug_assert!(
            used == 0,
            "SlotPool<{}> dropped while {used} objects were still alive",
            type_name::<T>()
        );
    }
}

impl<T, S: Synchronization> fmt::Debug for SlotPool<T, S> {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(type_name::<Self>())
            .field("capacity", &self.capacity())
            .field("slot_layout", &Self::slot_layout())
            .field("sync", &self.sync)
            .field("error_policy", &self.error_policy)
            .field("diagnostics", &self.diagnostics)
            .finish_non_exhaustive()
    }
}

// SAFETY: The pool owns the `T` values in its slots, so it can be moved to another thread if the
// values can. The synchronization strategy decides whether the bookkeeping can move.
unsafe impl<T: Send, S: Synchronization + Send> Send for SlotPool<T, S> {}

// SAFETY: A shared pool lets any thread emplace values and drop them through handles, which
// requires `T: Send`. The pool never hands out `&T` by itself. The synchronization strategy decides
// whether the bookkeeping can be shared.
unsafe impl<T: Send, S: Synchronization + Sync> Sync for SlotPool<T, S> {}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
#[allow(
    clippy::indexing_slicing,
    reason = "tests focus on succinct code and do not need to tick all the boxes"
)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::rc::Rc;
    use std::sync::{Arc, Mutex};

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;
    use crate::ThreadSafe;

    assert_impl_all!(SlotPool<u32>: Send);
    assert_not_impl_any!(SlotPool<u32>: Sync);
    assert_impl_all!(SlotPool<u32, ThreadSafe>: Send, Sync);
    assert_impl_all!(SlotPool<Cell<u32>, ThreadSafe>: Send, Sync);
    assert_not_impl_any!(SlotPool<Rc<u32>>: Send, Sync);
    assert_not_impl_any!(SlotPool<Rc<u32>, ThreadSafe>: Send, Sync);

    /// Records when it is dropped, to count destructor calls.
    struct DropCounter(Rc<Cell<usize>>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn fresh_pool_is_empty() {
        let pool = SlotPool::<u64>::new(8).unwrap();

        assert_eq!(pool.capacity(), 8);
        assert_eq!(pool.used(), 0);
        assert_eq!(pool.available(), 8);
        assert_eq!(pool.high_water_mark(), 0);
        assert!(pool.is_empty());
        assert!(!pool.is_full());
    }

    #[test]
    fn zero_capacity_is_invalid() {
        let result = SlotPool::<u64>::new(0);
        assert!(matches!(result, Err(Error::InvalidArgument)));
    }

    #[test]
    fn overflowing_capacity_is_allocation_failure() {
        let result = SlotPool::<[u64; 4]>::new(usize::MAX);
        assert!(matches!(
            result,
            Err(Error::AllocationFailure {
                capacity: usize::MAX,
                slot_size: 32
            })
        ));
    }

    #[test]
    fn used_plus_available_is_capacity() {
        let pool = SlotPool::<u32>::new(5).unwrap();
        let mut handles = Vec::new();

        for i in 0..5 {
            handles.push(pool.emplace(i).unwrap());
            assert_eq!(pool.used() + pool.available(), pool.capacity());
        }

        assert!(pool.is_full());

        while handles.pop().is_some() {
            assert_eq!(pool.used() + pool.available(), pool.capacity());
        }

        assert!(pool.is_empty());
    }

    #[test]
    fn exhausted_without_callback_is_error() {
        let pool = SlotPool::<u32>::new(2).unwrap();

        let _a = pool.emplace(1).unwrap();
        let _b = pool.emplace(2).unwrap();

        let result = pool.emplace(3);
        assert!(matches!(result, Err(Error::PoolExhausted { capacity: 2 })));
        assert_eq!(pool.used(), 2);
    }

    #[test]
    fn exhausted_does_not_call_constructor() {
        let pool = SlotPool::<u32>::new(1).unwrap();
        let _a = pool.emplace(1).unwrap();

        let called = Cell::new(false);
        let result = pool.emplace_with(|| {
            called.set(true);
            2
        });

        assert!(result.is_err());
        assert!(!called.get());
    }

    #[test]
    fn high_water_mark_only_grows() {
        let pool = SlotPool::<u32>::new(4).unwrap();

        let a = pool.emplace(1).unwrap();
        let b = pool.emplace(2).unwrap();
        assert_eq!(pool.high_water_mark(), 2);

        drop(a);
        drop(b);
        assert_eq!(pool.high_water_mark(), 2);

        let _c = pool.emplace(3).unwrap();
        let _d = pool.emplace(4).unwrap();
        assert_eq!(pool.high_water_mark(), 2);

        let _e = pool.emplace(5).unwrap();
        assert_eq!(pool.high_water_mark(), 3);
    }

    #[test]
    fn freed_slot_is_reused_first() {
        let pool = SlotPool::<u32>::new(4).unwrap();

        let a = pool.emplace(1).unwrap();
        let _b = pool.emplace(2).unwrap();

        let a_ptr = a.as_ptr().unwrap();
        drop(a);

        let c = pool.emplace(3).unwrap();
        assert_eq!(c.as_ptr(), Some(a_ptr));
    }

    #[test]
    fn every_handle_drops_its_object_once() {
        let drops = Rc::new(Cell::new(0));
        let pool = SlotPool::<DropCounter>::new(3).unwrap();

        let a = pool.emplace(DropCounter(Rc::clone(&drops))).unwrap();
        let mut b = pool.emplace(DropCounter(Rc::clone(&drops))).unwrap();

        drop(a);
        assert_eq!(drops.get(), 1);

        b.reset();
        b.reset();
        assert_eq!(drops.get(), 2);

        drop(b);
        assert_eq!(drops.get(), 2);
        assert!(pool.is_empty());
    }

    #[test]
    fn panicking_constructor_returns_slot() {
        let pool = SlotPool::<u32>::new(2).unwrap();
        let _a = pool.emplace(1).unwrap();

        let result = catch_unwind(AssertUnwindSafe(|| {
            _ = pool.emplace_with(|| panic!("constructor failed"));
        }));

        assert!(result.is_err());
        assert_eq!(pool.used(), 1);
        assert_eq!(pool.high_water_mark(), 2);

        // The slot reserved for the failed object is the next one handed out.
        let b = pool.emplace(2).unwrap();
        assert_eq!(pool.used(), 2);
        assert!(pool.is_full());
        assert_eq!(pool.high_water_mark(), 2);
        assert_eq!(*b, 2);
    }

    #[test]
    fn failing_constructor_returns_slot() {
        let pool = SlotPool::<u32>::new(1).unwrap();

        let result = pool.try_emplace_with(|| Err::<u32, _>("no"));
        assert!(matches!(result, Err(EmplaceError::Construction("no"))));
        assert_eq!(pool.used(), 0);

        let handle = pool.try_emplace_with(|| Ok::<_, &str>(5)).unwrap();
        assert_eq!(*handle, 5);
    }

    #[test]
    fn try_emplace_exhausted_is_pool_error() {
        let pool = SlotPool::<u32>::new(1).unwrap();
        let _a = pool.emplace(1).unwrap();

        let result = pool.try_emplace_with(|| Ok::<_, &str>(2));
        assert!(matches!(
            result,
            Err(EmplaceError::Pool(Error::PoolExhausted { capacity: 1 }))
        ));
    }

    #[test]
    fn panicking_destructor_still_returns_slot() {
        struct PanicOnDrop;

        impl Drop for PanicOnDrop {
            fn drop(&mut self) {
                panic!("destructor failed");
            }
        }

        let pool = SlotPool::<PanicOnDrop>::new(1).unwrap();
        let handle = pool.emplace(PanicOnDrop).unwrap();

        let result = catch_unwind(AssertUnwindSafe(|| drop(handle)));

        assert!(result.is_err());
        assert_eq!(pool.used(), 0);
    }

    #[test]
    fn emplace_in_place_initializes_slot() {
        let pool = SlotPool::<[u8; 16]>::new(1).unwrap();

        // SAFETY: The closure fully initializes the array.
        let handle = unsafe {
            pool.emplace_in_place(|uninit| {
                uninit.write([7; 16]);
            })
        }
        .unwrap();

        assert_eq!(handle[15], 7);
    }

    #[test]
    fn emplace_in_place_exhausted_does_not_call_closure() {
        let pool = SlotPool::<u8>::new(1).unwrap();
        let _a = pool.emplace(1).unwrap();

        // SAFETY: The closure is never called.
        let result = unsafe { pool.emplace_in_place(|_| panic!("must not be called")) };

        assert!(result.is_err());
    }

    #[test]
    fn take_value_moves_object_out() {
        let drops = Rc::new(Cell::new(0));
        let pool = SlotPool::<DropCounter>::new(1).unwrap();

        let handle = pool.emplace(DropCounter(Rc::clone(&drops))).unwrap();
        let value = handle.into_inner().unwrap();

        assert_eq!(drops.get(), 0);
        assert!(pool.is_empty());

        drop(value);
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn raw_round_trip_keeps_accounting() {
        let pool = SlotPool::<String>::new(2).unwrap();

        let handle = pool.emplace("detached".to_string()).unwrap();
        let ptr = handle.into_raw().unwrap();
        assert_eq!(pool.used(), 1);

        // SAFETY: The pointer came from into_raw() on this pool and was not adopted yet.
        let handle = unsafe { pool.from_raw(ptr) };
        assert_eq!(*handle, "detached");

        drop(handle);
        assert!(pool.is_empty());
    }

    #[test]
    #[should_panic]
    fn from_raw_foreign_pointer_panics() {
        let pool = SlotPool::<u32>::new(2).unwrap();
        let mut outsider = 4_u32;

        // SAFETY: Not safe, which is why we expect a panic before the pointer is used.
        _ = unsafe { pool.from_raw(NonNull::from(&mut outsider)) };
    }

    #[test]
    fn diagnostics_sink_sees_events() {
        let lines = Arc::new(Mutex::new(Vec::<String>::new()));

        {
            let pool = SlotPool::<u32>::builder(1)
                .diagnostics({
                    let lines = Arc::clone(&lines);
                    move |line| lines.lock().unwrap().push(line.to_owned())
                })
                .build()
                .unwrap();

            let handle = pool.emplace(1).unwrap();
            _ = pool.emplace(2);
            drop(handle);
        }

        let lines = lines.lock().unwrap();

        // Created, reserved, constructed, exhausted, destroyed, freed, dropped.
        assert_eq!(lines.len(), 7, "{lines:?}");
        assert!(lines[3].starts_with("error 1"), "{}", lines[3]);
    }

    #[test]
    fn user_code_runs_outside_bookkeeping() {
        // Re-entering the pool from a constructor would deadlock or panic
        // if bookkeeping were held while user code runs.
        let pool = SlotPool::<u32>::new(2).unwrap();
        let inner = RefCell::new(None);

        let outer = pool
            .emplace_with(|| {
                *inner.borrow_mut() = Some(pool.emplace(1).unwrap());
                2
            })
            .unwrap();

        assert_eq!(*outer, 2);
        assert_eq!(pool.used(), 2);
        drop(inner);
    }

    #[test]
    fn thread_safe_constructor_can_reenter() {
        let pool = SlotPool::<u32>::builder(2).thread_safe().build().unwrap();

        let outer = pool
            .emplace_with(|| u32::try_from(pool.used()).unwrap() + 10)
            .unwrap();

        assert_eq!(*outer, 10);
    }
}
