//! Tests for ownership transfer, reset and destruction through `Handle`.

use std::cell::Cell;
use std::mem;
use std::rc::Rc;

use slot_pool::{Handle, SlotPool};

/// Counts how many times values sharing the same counter have been dropped.
struct Tracked {
    drops: Rc<Cell<usize>>,
    label: &'static str,
}

impl Tracked {
    fn new(drops: &Rc<Cell<usize>>, label: &'static str) -> Self {
        Self {
            drops: Rc::clone(drops),
            label,
        }
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

#[test]
fn scope_exit_drops_exactly_once() {
    let drops = Rc::new(Cell::new(0));
    let pool = SlotPool::<Tracked>::new(2).unwrap();

    {
        let handle = pool.emplace(Tracked::new(&drops, "scoped")).unwrap();
        assert_eq!(handle.label, "scoped");
        assert_eq!(pool.used(), 1);
    }

    assert_eq!(drops.get(), 1);
    assert_eq!(pool.used(), 0);
}

#[test]
fn moving_a_handle_does_not_drop() {
    let drops = Rc::new(Cell::new(0));
    let pool = SlotPool::<Tracked>::new(2).unwrap();

    let original = pool.emplace(Tracked::new(&drops, "moved")).unwrap();
    let ptr = original.as_ptr();

    let moved = original;
    let mut boxed = Box::new(moved);

    assert_eq!(drops.get(), 0);
    assert_eq!(boxed.as_ptr(), ptr);

    let taken = boxed.take();
    assert!(boxed.is_empty());
    assert!(taken.is_occupied());
    assert_eq!(taken.as_ptr(), ptr);
    assert_eq!(drops.get(), 0);

    drop(boxed);
    assert_eq!(drops.get(), 0);

    drop(taken);
    assert_eq!(drops.get(), 1);
}

#[test]
fn mem_take_leaves_empty_source() {
    let pool = SlotPool::<u32>::new(1).unwrap();

    let mut source = pool.emplace(5).unwrap();
    let destination = mem::take(&mut source);

    assert!(source.is_empty());
    assert_eq!(*destination, 5);
    assert_eq!(pool.used(), 1);
}

#[test]
fn move_assignment_replaces_and_drops_old() {
    let drops = Rc::new(Cell::new(0));
    let pool = SlotPool::<Tracked>::new(2).unwrap();

    let mut destination = pool.emplace(Tracked::new(&drops, "old")).unwrap();
    let mut source = pool.emplace(Tracked::new(&drops, "new")).unwrap();
    assert_eq!(destination.label, "old");

    destination = source.take();

    assert_eq!(drops.get(), 1);
    assert!(source.is_empty());
    assert_eq!(destination.label, "new");
    assert_eq!(pool.used(), 1);
}

#[test]
fn self_assignment_is_harmless() {
    let drops = Rc::new(Cell::new(0));
    let pool = SlotPool::<Tracked>::new(1).unwrap();

    let mut handle = pool.emplace(Tracked::new(&drops, "self")).unwrap();
    let ptr = handle.as_ptr();

    let same = handle.take();
    handle = same;

    assert_eq!(drops.get(), 0);
    assert_eq!(handle.as_ptr(), ptr);
    assert_eq!(handle.label, "self");
}

#[test]
fn swap_exchanges_objects() {
    let pool = SlotPool::<&'static str>::new(2).unwrap();

    let mut left = pool.emplace("left").unwrap();
    let mut right = pool.emplace("right").unwrap();

    mem::swap(&mut left, &mut right);

    assert_eq!(*left, "right");
    assert_eq!(*right, "left");
    assert_eq!(pool.used(), 2);
}

#[test]
fn reset_is_idempotent() {
    let drops = Rc::new(Cell::new(0));
    let pool = SlotPool::<Tracked>::new(1).unwrap();

    let mut handle = pool.emplace(Tracked::new(&drops, "reset")).unwrap();

    handle.reset();
    handle.reset();
    handle.reset();

    assert!(handle.is_empty());
    assert_eq!(drops.get(), 1);
    assert_eq!(pool.used(), 0);
}

#[test]
fn into_inner_returns_value_without_drop() {
    let drops = Rc::new(Cell::new(0));
    let pool = SlotPool::<Tracked>::new(1).unwrap();

    let handle = pool.emplace(Tracked::new(&drops, "escaped")).unwrap();
    let value = handle.into_inner().unwrap();

    assert_eq!(drops.get(), 0);
    assert_eq!(pool.used(), 0);
    assert_eq!(value.label, "escaped");

    // The slot can be used again while the value lives on outside the pool.
    let _other = pool.emplace(Tracked::new(&drops, "other")).unwrap();

    drop(value);
    assert_eq!(drops.get(), 1);
}

#[test]
fn raw_pointer_round_trip() {
    let drops = Rc::new(Cell::new(0));
    let pool = SlotPool::<Tracked>::new(2).unwrap();

    let ptr = pool
        .emplace(Tracked::new(&drops, "raw"))
        .unwrap()
        .into_raw()
        .unwrap();

    assert_eq!(drops.get(), 0);
    assert_eq!(pool.used(), 1);

    // SAFETY: We have exclusive ownership of the detached object.
    assert_eq!(unsafe { ptr.as_ref() }.label, "raw");

    // SAFETY: The pointer came from into_raw() on this pool and was not adopted yet.
    let handle: Handle<'_, Tracked> = unsafe { pool.from_raw(ptr) };
    drop(handle);

    assert_eq!(drops.get(), 1);
    assert_eq!(pool.used(), 0);
}

#[test]
fn handles_in_collections_drop_with_collection() {
    let drops = Rc::new(Cell::new(0));
    let pool = SlotPool::<Tracked>::new(10).unwrap();

    let handles = (0..10)
        .map(|_| pool.emplace(Tracked::new(&drops, "many")).unwrap())
        .collect::<Vec<_>>();

    assert!(pool.is_full());

    drop(handles);

    assert_eq!(drops.get(), 10);
    assert!(pool.is_empty());
}
