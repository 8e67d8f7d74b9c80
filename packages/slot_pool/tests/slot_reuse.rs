//! Tests for slot reuse order, accounting and address stability of `SlotPool`.

use std::mem::align_of;
use std::ptr::NonNull;

use slot_pool::{Handle, SlotPool};

#[derive(Debug, PartialEq)]
struct Record {
    id: u32,
    weight: u16,
}

fn addr<T>(handle: &Handle<'_, T>) -> NonNull<T> {
    handle.as_ptr().expect("handle must be occupied")
}

#[test]
fn new_pool_has_full_availability() {
    for capacity in [1, 2, 7, 64, 1000] {
        let pool = SlotPool::<Record>::new(capacity).unwrap();

        assert_eq!(pool.used(), 0);
        assert_eq!(pool.available(), capacity);
        assert_eq!(pool.high_water_mark(), 0);
    }
}

#[test]
fn freed_slot_is_next_allocation() {
    let pool = SlotPool::<Record>::new(3).unwrap();

    let a = pool.emplace(Record { id: 1, weight: 1 }).unwrap();
    let _b = pool.emplace(Record { id: 2, weight: 2 }).unwrap();
    let a_addr = addr(&a);

    drop(a);

    let c = pool.emplace(Record { id: 3, weight: 3 }).unwrap();
    assert_eq!(addr(&c), a_addr);
    assert_eq!(c.id, 3);
}

#[test]
fn frees_are_reused_as_a_stack() {
    let pool = SlotPool::<Record>::new(3).unwrap();

    let a = pool.emplace(Record { id: 1, weight: 0 }).unwrap();
    let b = pool.emplace(Record { id: 2, weight: 0 }).unwrap();
    let c = pool.emplace(Record { id: 3, weight: 0 }).unwrap();

    let (a_addr, b_addr, c_addr) = (addr(&a), addr(&b), addr(&c));

    drop(a);
    drop(b);
    drop(c);

    let first = pool.emplace(Record { id: 4, weight: 0 }).unwrap();
    let second = pool.emplace(Record { id: 5, weight: 0 }).unwrap();
    let third = pool.emplace(Record { id: 6, weight: 0 }).unwrap();

    assert_eq!(addr(&first), c_addr);
    assert_eq!(addr(&second), b_addr);
    assert_eq!(addr(&third), a_addr);
}

#[test]
fn full_cycle_is_deterministic() {
    let pool = SlotPool::<Record>::new(4).unwrap();

    let mut handles = (0..4)
        .map(|id| pool.emplace(Record { id, weight: 7 }).unwrap())
        .collect::<Vec<_>>();

    let original = handles.iter().map(addr).collect::<Vec<_>>();

    for (i, ptr) in original.iter().enumerate() {
        assert_eq!(ptr.as_ptr().addr() % align_of::<Record>(), 0);

        for other in &original[i + 1..] {
            assert_ne!(ptr, other);
        }
    }

    assert!(pool.is_full());

    // Free in reverse allocation order.
    while let Some(handle) = handles.pop() {
        drop(handle);
    }

    assert!(pool.is_empty());

    let again = (0..4)
        .map(|id| pool.emplace(Record { id, weight: 8 }).unwrap())
        .collect::<Vec<_>>();

    assert_eq!(again.iter().map(addr).collect::<Vec<_>>(), original);
    assert_eq!(pool.high_water_mark(), 4);
}

#[test]
fn accounting_holds_through_mixed_traffic() {
    let pool = SlotPool::<u64>::new(8).unwrap();
    let mut handles = Vec::new();
    let mut high_water = 0;

    for step in 0_u64..200 {
        // Deterministic pattern of grows and shrinks.
        if step % 3 == 2 || pool.is_full() {
            if !handles.is_empty() {
                let index = usize::try_from(step).unwrap() % handles.len();
                let mut handle: Handle<'_, u64> = handles.swap_remove(index);
                handle.reset();
                assert!(handle.is_empty());
            }
        } else {
            handles.push(pool.emplace(step).unwrap());
        }

        assert_eq!(pool.used(), handles.len());
        assert_eq!(pool.used() + pool.available(), pool.capacity());

        assert!(pool.high_water_mark() >= high_water);
        high_water = pool.high_water_mark();
    }

    for handle in &handles {
        let value = **handle;
        assert!(value < 200);
    }
}

#[test]
fn small_items_share_nothing() {
    let pool = SlotPool::<u8>::new(16).unwrap();

    let handles = (0..16_u8)
        .map(|value| pool.emplace(value).unwrap())
        .collect::<Vec<_>>();

    for (expected, handle) in (0..16_u8).zip(&handles) {
        assert_eq!(**handle, expected);
    }

    let stride = SlotPool::<u8>::slot_layout().size();
    let first = addr(&handles[0]).as_ptr().addr();
    let last = addr(&handles[15]).as_ptr().addr();
    assert_eq!(last - first, 15 * stride);
}
