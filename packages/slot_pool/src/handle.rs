use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use crate::{SlotPool, Synchronization, Unsynchronized};

const ERR_EMPTY: &str = "dereferenced an empty slot pool handle";

/// Exclusive owner of one object stored in a [`SlotPool`].
///
/// A handle is either occupied, owning exactly one live object, or empty. Only the pool's
/// `emplace` methods create occupied handles. Empty handles come from [`Default`], from
/// [`take()`][Self::take] and from pools that report exhaustion through an error callback.
///
/// Dropping an occupied handle drops its object and returns the slot to the pool. The same happens
/// when calling [`reset()`][Self::reset]. Moving a handle moves ownership of the object without
/// touching the object itself.
///
/// The handle borrows its pool, which keeps the pool alive and in place for as long as the
/// object exists.
///
/// # Thread safety
///
/// Handles of a [`ThreadSafe`][crate::ThreadSafe] pool can be sent to other threads if `T` is
/// [`Send`] and shared between threads if `T` is [`Sync`]. Handles of a single-threaded pool stay
/// on the thread that owns the pool.
///
/// # Example
///
/// ```
/// use slot_pool::SlotPool;
///
/// let pool = SlotPool::<Vec<u32>>::new(2).unwrap();
///
/// let mut numbers = pool.emplace(vec![1, 2]).unwrap();
/// numbers.push(3);
/// assert_eq!(numbers.len(), 3);
///
/// // Ownership can move out, leaving an empty handle behind.
/// let moved = numbers.take();
/// assert!(numbers.is_empty());
/// assert_eq!(*moved, [1, 2, 3]);
/// assert_eq!(pool.used(), 1);
///
/// drop(moved);
/// assert_eq!(pool.used(), 0);
/// ```
pub struct Handle<'p, T, S: Synchronization = Unsynchronized> {
    slot: Option<(&'p SlotPool<T, S>, NonNull<T>)>,

    // We own a `T` for drop check purposes.
    _owns: PhantomData<T>,
}

impl<'p, T, S: Synchronization> Handle<'p, T, S> {
    #[must_use]
    pub(crate) fn new(pool: &'p SlotPool<T, S>, ptr: NonNull<T>) -> Self {
        Self {
            slot: Some((pool, ptr)),
            _owns: PhantomData,
        }
    }

    /// Whether the handle owns no object.
    #[must_use]
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }

    /// Whether the handle owns an object.
    #[must_use]
    #[inline]
    pub fn is_occupied(&self) -> bool {
        self.slot.is_some()
    }

    /// A shared reference to the object, if there is one.
    #[must_use]
    #[inline]
    pub fn get(&self) -> Option<&T> {
        // SAFETY: An occupied handle points at a live object it exclusively owns.
        self.slot.map(|(_, ptr)| unsafe { ptr.as_ref() })
    }

    /// An exclusive reference to the object, if there is one.
    #[must_use]
    #[inline]
    pub fn get_mut(&mut self) -> Option<&mut T> {
        // SAFETY: An occupied handle points at a live object it exclusively owns, and we have
        // exclusive access to the handle.
        self.slot.map(|(_, mut ptr)| unsafe { ptr.as_mut() })
    }

    /// A pointer to the object, if there is one. Ownership stays with the handle.
    #[must_use]
    #[inline]
    pub fn as_ptr(&self) -> Option<NonNull<T>> {
        self.slot.map(|(_, ptr)| ptr)
    }

    /// Drops the owned object, if any, and leaves the handle empty.
    ///
    /// Calling this on an empty handle does nothing.
    pub fn reset(&mut self) {
        if let Some((pool, ptr)) = self.slot.take() {
            // SAFETY: The object is live and we owned it. We have just given up the pointer, so
            // nothing can access the object after this.
            unsafe {
                pool.destroy(ptr);
            }
        }
    }

    /// Moves ownership of the object into a new handle, leaving this one empty.
    ///
    /// # Example
    ///
    /// ```
    /// use slot_pool::SlotPool;
    ///
    /// let pool = SlotPool::<u32>::new(1).unwrap();
    ///
    /// let mut first = pool.emplace(7).unwrap();
    /// let second = first.take();
    ///
    /// assert!(first.is_empty());
    /// assert_eq!(*second, 7);
    /// ```
    #[must_use]
    #[inline]
    pub fn take(&mut self) -> Self {
        mem::take(self)
    }

    /// Gives up ownership without dropping the object.
    ///
    /// The slot remains counted as used until the pointer is given back via
    /// [`SlotPool::from_raw()`]. Returns `None` for an empty handle.
    ///
    /// # Example
    ///
    /// ```
    /// use slot_pool::SlotPool;
    ///
    /// let pool = SlotPool::<u32>::new(1).unwrap();
    ///
    /// let ptr = pool.emplace(7).unwrap().into_raw().unwrap();
    /// assert_eq!(pool.used(), 1);
    ///
    /// // SAFETY: The pointer came from into_raw() on this pool and was not adopted yet.
    /// let handle = unsafe { pool.from_raw(ptr) };
    /// assert_eq!(*handle, 7);
    /// ```
    #[must_use]
    #[inline]
    pub fn into_raw(mut self) -> Option<NonNull<T>> {
        self.slot.take().map(|(_, ptr)| ptr)
    }

    /// Moves the object out of the pool, returning its slot. Returns `None` for an empty handle.
    ///
    /// # Example
    ///
    /// ```
    /// use slot_pool::SlotPool;
    ///
    /// let pool = SlotPool::<String>::new(1).unwrap();
    ///
    /// let name = pool.emplace("pooled".to_string()).unwrap();
    /// let name: String = name.into_inner().unwrap();
    ///
    /// assert_eq!(name, "pooled");
    /// assert!(pool.is_empty());
    /// ```
    #[must_use]
    pub fn into_inner(mut self) -> Option<T> {
        self.slot.take().map(|(pool, ptr)| {
            // SAFETY: The object is live and we owned it. We have just given up the pointer, so
            // nothing can access the object after this.
            unsafe { pool.take_value(ptr) }
        })
    }
}

impl<T, S: Synchronization> Default for Handle<'_, T, S> {
    /// Creates an empty handle.
    #[inline]
    fn default() -> Self {
        Self {
            slot: None,
            _owns: PhantomData,
        }
    }
}

impl<T, S: Synchronization> Deref for Handle<'_, T, S> {
    type Target = T;

    /// # Panics
    ///
    /// Panics if the handle is empty.
    #[inline]
    fn deref(&self) -> &Self::Target {
        self.get().expect(ERR_EMPTY)
    }
}

impl<T, S: Synchronization> DerefMut for Handle<'_, T, S> {
    /// # Panics
    ///
    /// Panics if the handle is empty.
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.get_mut().expect(ERR_EMPTY)
    }
}

impl<T, S: Synchronization> Drop for Handle<'_, T, S> {
    #[inline]
    fn drop(&mut self) {
        self.reset();
    }
}

impl<T: fmt::Debug, S: Synchronization> fmt::Debug for Handle<'_, T, S> {
    #[cfg_attr(test, mutants::skip)] // No API contract to test.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("value", &self.get())
            .finish_non_exhaustive()
    }
}

// SAFETY: Moving a handle to another thread moves ownership of the `T` and lets that thread
// return the slot through `&SlotPool`, which the synchronization strategy must allow.
unsafe impl<T: Send, S: Synchronization + Sync> Send for Handle<'_, T, S> {}

// SAFETY: A shared handle only gives out `&T` and never touches the pool.
unsafe impl<T: Sync, S: Synchronization + Sync> Sync for Handle<'_, T, S> {}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use static_assertions::{assert_impl_all, assert_not_impl_any};

    use super::*;
    use crate::ThreadSafe;

    assert_impl_all!(Handle<'static, u32, ThreadSafe>: Send, Sync, Default);
    assert_impl_all!(Handle<'static, Cell<u32>, ThreadSafe>: Send);
    assert_not_impl_any!(Handle<'static, Cell<u32>, ThreadSafe>: Sync);
    assert_not_impl_any!(Handle<'static, u32>: Send, Sync, Clone);
    assert_not_impl_any!(Handle<'static, Rc<u32>, ThreadSafe>: Send, Sync);

    #[test]
    fn default_is_empty() {
        let mut handle = Handle::<u32>::default();

        assert!(handle.is_empty());
        assert!(!handle.is_occupied());
        assert!(handle.get().is_none());
        assert!(handle.get_mut().is_none());
        assert!(handle.as_ptr().is_none());

        handle.reset();
        assert!(handle.is_empty());

        assert!(handle.into_inner().is_none());
    }

    #[test]
    fn empty_into_raw_is_none() {
        assert!(Handle::<u32>::default().into_raw().is_none());
    }

    #[test]
    #[should_panic]
    fn deref_empty_panics() {
        let handle = Handle::<u32>::default();
        let _value: u32 = *handle;
    }

    #[test]
    #[should_panic]
    fn deref_mut_empty_panics() {
        let mut handle = Handle::<u32>::default();
        *handle = 5;
    }

    #[test]
    fn get_mut_changes_object() {
        let pool = SlotPool::<u32>::new(1).unwrap();
        let mut handle = pool.emplace(1).unwrap();

        *handle.get_mut().unwrap() += 1;
        *handle += 1;

        assert_eq!(handle.get(), Some(&3));
    }

    #[test]
    fn take_moves_ownership() {
        let pool = SlotPool::<u32>::new(2).unwrap();

        let mut first = pool.emplace(1).unwrap();
        let ptr = first.as_ptr();

        let second = first.take();

        assert!(first.is_empty());
        assert_eq!(second.as_ptr(), ptr);
        assert_eq!(pool.used(), 1);

        // Taking from an empty handle yields another empty handle.
        assert!(first.take().is_empty());
    }

    #[test]
    fn assign_over_occupied_drops_previous_once() {
        struct Counted(Rc<Cell<usize>>);

        impl Drop for Counted {
            fn drop(&mut self) {
                self.0.set(self.0.get() + 1);
            }
        }

        let drops = Rc::new(Cell::new(0));
        let pool = SlotPool::<Counted>::new(2).unwrap();

        let mut target = pool.emplace(Counted(Rc::clone(&drops))).unwrap();
        let source = pool.emplace(Counted(Rc::clone(&drops))).unwrap();
        let source_ptr = source.as_ptr();
        assert_ne!(target.as_ptr(), source_ptr);

        target = source;

        assert_eq!(drops.get(), 1);
        assert_eq!(pool.used(), 1);
        assert_eq!(target.as_ptr(), source_ptr);

        drop(target);
        assert_eq!(drops.get(), 2);
    }

    #[test]
    fn take_then_assign_back_is_harmless() {
        let pool = SlotPool::<String>::new(1).unwrap();

        let mut handle = pool.emplace("stays".to_string()).unwrap();
        let moved = handle.take();
        handle = moved;

        assert_eq!(*handle, "stays");
        assert_eq!(pool.used(), 1);
    }

    #[test]
    fn debug_shows_value() {
        let pool = SlotPool::<u32>::new(1).unwrap();
        let handle = pool.emplace(42).unwrap();

        assert!(format!("{handle:?}").contains("42"));
        assert!(format!("{:?}", Handle::<u32>::default()).contains("None"));
    }
}
