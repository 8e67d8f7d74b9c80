use crate::{NO_SLOT, SlotArray};

/// How a slot was obtained by [`Ledger::reserve()`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Reservation {
    /// Popped off the free-list, i.e. the slot held an object before.
    Reused(usize),

    /// Taken from the never-used region at the high-water mark.
    Fresh(usize),
}

impl Reservation {
    #[must_use]
    pub(crate) fn index(self) -> usize {
        match self {
            Self::Reused(index) | Self::Fresh(index) => index,
        }
    }
}

/// Allocation bookkeeping of a pool: the free-list head and the usage counters.
///
/// This is the only pool state that mutates after construction, so it is the only state that the
/// [synchronization strategy][crate::Synchronization] has to protect. The free-list links themselves
/// live inside vacant slots of the [`SlotArray`], which is why most methods take it as a parameter.
/// Whoever holds `&mut Ledger` has exclusive access to every vacant slot.
#[derive(Debug)]
#[allow(
    unreachable_pub,
    reason = "public only so the sealed synchronization trait can name it"
)]
pub struct Ledger {
    capacity: usize,

    /// Index of the most recently freed slot. Think of this as a stack of vacant slots, with the
    /// stack entries stored in the vacant slots themselves.
    free_head: usize,

    /// Slots that hold a fully constructed object. Reserved slots whose object is still under
    /// construction are not included.
    used: usize,

    /// Slots ever handed out from the never-used region. Slots below this index have all been
    /// occupied at least once; slots at or above it have never been touched.
    high_water: usize,
}

impl Ledger {
    #[must_use]
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            free_head: NO_SLOT,
            used: 0,
            high_water: 0,
        }
    }

    #[must_use]
    pub(crate) fn used(&self) -> usize {
        self.used
    }

    #[must_use]
    pub(crate) fn high_water(&self) -> usize {
        self.high_water
    }

    /// Takes a vacant slot out of circulation, preferring the most recently freed one.
    ///
    /// Returns `None` if every slot is occupied or reserved.
    #[must_use]
    pub(crate) fn reserve<T>(&mut self, slots: &SlotArray<T>) -> Option<Reservation> {
        if self.free_head != NO_SLOT {
            let index = self.free_head;

            // SAFETY: Slots on the free-list are vacant and carry a link written by `push_free()`.
            // We hold `&mut self`, which grants exclusive access to vacant slots.
            self.free_head = unsafe { slots.read_link(index) };

            return Some(Reservation::Reused(index));
        }

        if self.high_water < self.capacity {
            let index = self.high_water;

            // Cannot overflow, we just checked it is below capacity.
            self.high_water = self.high_water.wrapping_add(1);

            return Some(Reservation::Fresh(index));
        }

        None
    }

    /// Returns a reserved slot whose object was never constructed.
    pub(crate) fn cancel<T>(&mut self, slots: &SlotArray<T>, index: usize) {
        self.push_free(slots, index);
    }

    /// Records that the object in a reserved slot has been constructed.
    pub(crate) fn commit(&mut self) {
        // Cannot overflow, every committed slot was reserved first and there are at most
        // `capacity` of those.
        self.used = self.used.wrapping_add(1);

        debug_assert!(
            self.used <= self.capacity,
            "used count {} exceeds capacity {}",
            self.used,
            self.capacity
        );
    }

    /// Returns a slot whose object has been dropped or moved out.
    pub(crate) fn retire<T>(&mut self, slots: &SlotArray<T>, index: usize) {
        self.used = self
            .used
            .checked_sub(1)
            .expect("retired a slot while the pool reported no used slots");

        self.push_free(slots, index);
    }

    fn push_free<T>(&mut self, slots: &SlotArray<T>, index: usize) {
        debug_assert!(
            index < self.high_water,
            "slot {index} was never handed out (high-water mark {})",
            self.high_water
        );

        // SAFETY: The caller is giving up the slot, so it no longer holds a live value, and
        // `&mut self` grants us exclusive access to it from here on.
        unsafe {
            slots.write_link(index, self.free_head);
        }

        self.free_head = index;
    }

    #[cfg_attr(test, mutants::skip)] // This is essentially test logic, mutation is meaningless.
    #[cfg(debug_assertions)]
    pub(crate) fn integrity_check<T>(&self, slots: &SlotArray<T>) {
        let mut free_count: usize = 0;
        let mut cursor = self.free_head;

        while cursor != NO_SLOT {
            assert!(
                cursor < self.high_water,
                "free-list entry {cursor} is beyond the high-water mark {}",
                self.high_water
            );

            free_count = free_count
                .checked_add(1)
                .expect("free-list longer than the address space");

            assert!(
                free_count <= self.high_water,
                "free-list is longer than the number of slots ever handed out, it must contain a cycle"
            );

            // SAFETY: Every entry on the free-list is a vacant slot with a valid link.
            cursor = unsafe { slots.read_link(cursor) };
        }

        assert!(
            self.used
                .checked_add(free_count)
                .is_some_and(|accounted| accounted <= self.high_water),
            "used {} + free {free_count} exceeds the high-water mark {}",
            self.used,
            self.high_water
        );
    }
}
