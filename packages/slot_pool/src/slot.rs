use std::alloc::{Layout, alloc, dealloc};
use std::any::type_name;
use std::marker::PhantomData;
use std::mem::ManuallyDrop;
use std::num::NonZero;
use std::ptr::NonNull;

use crate::{Error, Result};

/// Link value meaning "no next free slot".
pub(crate) const NO_SLOT: usize = usize::MAX;

/// One unit of pool storage.
///
/// A slot holds either a live `T` or, while vacant, the index of the next vacant slot. Being a
/// union, its size is the larger of the two rounded up to the larger alignment, which is exactly
/// what is needed for any slot to switch between the two roles.
#[repr(C)]
pub(crate) union Slot<T> {
    _value: ManuallyDrop<T>,
    next_free: usize,
}

/// The backing storage of a pool: one heap block of `capacity` contiguous slots.
///
/// The array never creates references to slot contents. Callers work through raw pointers and are
/// responsible for knowing which slots are occupied, which is the job of the `Ledger`.
#[derive(Debug)]
pub(crate) struct SlotArray<T> {
    first_slot: NonNull<Slot<T>>,

    capacity: NonZero<usize>,

    _item: PhantomData<T>,
}

impl<T> SlotArray<T> {
    /// Allocates uninitialized storage for `capacity` slots.
    ///
    /// Fails with [`Error::AllocationFailure`] if the total size overflows or the allocator
    /// cannot satisfy the request.
    pub(crate) fn allocate(capacity: NonZero<usize>) -> Result<Self> {
        let layout = Self::layout(capacity)?;

        // SAFETY: A slot is at least as large as a `usize` and capacity is non-zero,
        // so the layout is never zero-sized.
        let ptr = unsafe { alloc(layout) };

        #[allow(
            clippy::cast_ptr_alignment,
            reason = "the block was allocated with the alignment of the slot type"
        )]
        let first_slot = NonNull::new(ptr.cast::<Slot<T>>()).ok_or(Error::AllocationFailure {
            capacity: capacity.get(),
            slot_size: Self::slot_layout().size(),
        })?;

        Ok(Self {
            first_slot,
            capacity,
            _item: PhantomData,
        })
    }

    /// Layout of a single slot. Its size is also the stride between slots.
    #[must_use]
    pub(crate) fn slot_layout() -> Layout {
        Layout::new::<Slot<T>>()
    }

    fn layout(capacity: NonZero<usize>) -> Result<Layout> {
        Layout::array::<Slot<T>>(capacity.get()).map_err(|_overflow| Error::AllocationFailure {
            capacity: capacity.get(),
            slot_size: Self::slot_layout().size(),
        })
    }

    #[must_use]
    pub(crate) fn capacity(&self) -> NonZero<usize> {
        self.capacity
    }

    /// Total size of the storage block in bytes.
    #[must_use]
    pub(crate) fn size_in_bytes(&self) -> usize {
        // Cannot overflow, the same product was validated when the block was allocated.
        self.capacity
            .get()
            .wrapping_mul(Self::slot_layout().size())
    }

    /// Indices come from the ledger or from `index_of()`, both of which only produce
    /// in-bounds values, so the bounds check is only made in debug builds.
    fn slot_ptr(&self, index: usize) -> NonNull<Slot<T>> {
        debug_assert!(
            index < self.capacity.get(),
            "slot {index} out of bounds in pool of {} slots of {}",
            self.capacity,
            type_name::<T>()
        );

        // SAFETY: Every caller passes an index below `capacity`, so the pointer stays inside
        // the block.
        unsafe { self.first_slot.add(index) }
    }

    /// Pointer to the value storage of a slot. The pointee may or may not be initialized,
    /// depending on whether the slot is occupied.
    #[must_use]
    pub(crate) fn value_ptr(&self, index: usize) -> NonNull<T> {
        // Union fields all live at offset zero.
        self.slot_ptr(index).cast::<T>()
    }

    /// Translates a value pointer previously obtained from [`value_ptr()`][Self::value_ptr]
    /// back into the index of its slot.
    ///
    /// # Panics
    ///
    /// Panics if the pointer does not point at the start of a slot in this array.
    #[must_use]
    pub(crate) fn index_of(&self, ptr: NonNull<T>) -> usize {
        let base = self.first_slot.as_ptr().addr();
        let stride = Self::slot_layout().size();

        let offset = ptr
            .as_ptr()
            .addr()
            .checked_sub(base)
            .expect("pointer does not belong to this pool");

        let index = offset
            .checked_div(stride)
            .expect("slots are never zero-sized");

        assert!(
            offset.checked_rem(stride) == Some(0) && index < self.capacity.get(),
            "pointer does not point at a slot of this pool"
        );

        index
    }

    /// Stores a free-list link in a slot.
    ///
    /// # Safety
    ///
    /// The slot must not hold a live value and the caller must have exclusive access to it.
    pub(crate) unsafe fn write_link(&self, index: usize, next_free: usize) {
        let slot = self.slot_ptr(index).as_ptr();

        // SAFETY: The pointer is in bounds and the caller guarantees nobody else touches
        // the slot. Writing a `Copy` union field does not drop anything.
        unsafe {
            (*slot).next_free = next_free;
        }
    }

    /// Reads the free-list link of a vacant slot.
    ///
    /// # Safety
    ///
    /// The slot must be vacant and its link must have been written by
    /// [`write_link()`][Self::write_link].
    #[must_use]
    pub(crate) unsafe fn read_link(&self, index: usize) -> usize {
        let slot = self.slot_ptr(index).as_ptr();

        // SAFETY: The caller guarantees the slot currently holds a link.
        unsafe { (*slot).next_free }
    }
}

impl<T> Drop for SlotArray<T> {
    fn drop(&mut self) {
        let layout = Self::layout(self.capacity)
            .expect("the same layout was successfully computed when the block was allocated");

        // SAFETY: The layout matches the one used for the allocation. Slot contents are never
        // dropped here; whoever owns the values is responsible for them.
        unsafe {
            dealloc(self.first_slot.as_ptr().cast(), layout);
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::undocumented_unsafe_blocks,
    clippy::multiple_unsafe_ops_per_block,
    reason = "tests focus on succinct code and do not need to tick all the boxes"
)]
mod tests {
    use std::mem::{align_of, size_of};

    use super::*;

    fn nz(value: usize) -> NonZero<usize> {
        NonZero::new(value).unwrap()
    }

    #[test]
    fn small_items_get_link_sized_slots() {
        let layout = SlotArray::<u8>::slot_layout();
        assert_eq!(layout.size(), size_of::<usize>());
        assert_eq!(layout.align(), align_of::<usize>());
    }

    #[test]
    fn large_items_keep_their_size() {
        let layout = SlotArray::<[u64; 5]>::slot_layout();
        assert_eq!(layout.size(), 40);
        assert_eq!(layout.align(), align_of::<u64>());
    }

    #[test]
    fn over_aligned_items_round_up() {
        #[repr(align(64))]
        struct CacheLine {
            _byte: u8,
        }

        let layout = SlotArray::<CacheLine>::slot_layout();
        assert_eq!(layout.size(), 64);
        assert_eq!(layout.align(), 64);
    }

    #[test]
    fn slots_are_contiguous_and_aligned() {
        let slots = SlotArray::<u32>::allocate(nz(4)).unwrap();
        let stride = SlotArray::<u32>::slot_layout().size();

        let first = slots.value_ptr(0).as_ptr().addr();

        for index in 0..4 {
            let addr = slots.value_ptr(index).as_ptr().addr();
            assert_eq!(addr, first + index * stride);
            assert_eq!(addr % align_of::<u32>(), 0);
            assert_eq!(slots.index_of(slots.value_ptr(index)), index);
        }

        assert_eq!(slots.size_in_bytes(), 4 * stride);
    }

    #[test]
    fn links_round_trip() {
        let slots = SlotArray::<u16>::allocate(nz(3)).unwrap();

        unsafe {
            slots.write_link(0, 2);
            slots.write_link(2, NO_SLOT);

            assert_eq!(slots.read_link(0), 2);
            assert_eq!(slots.read_link(2), NO_SLOT);
        }
    }

    #[test]
    fn overflowing_capacity_is_allocation_failure() {
        let result = SlotArray::<u64>::allocate(nz(usize::MAX / 4));

        assert!(matches!(
            result,
            Err(Error::AllocationFailure { slot_size: 8, .. })
        ));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic]
    fn out_of_bounds_index_panics() {
        let slots = SlotArray::<u32>::allocate(nz(2)).unwrap();
        _ = slots.value_ptr(2);
    }

    #[test]
    #[should_panic]
    fn foreign_pointer_panics() {
        let slots = SlotArray::<u32>::allocate(nz(2)).unwrap();
        let mut outsider = 5_u32;
        _ = slots.index_of(NonNull::from(&mut outsider));
    }
}
