//! Basic usage example for `SlotPool`.
//!
//! This example demonstrates emplacing objects into a fixed-capacity pool, observing slot reuse
//! and handling exhaustion.

use slot_pool::{Error, SlotPool};

#[derive(Debug)]
struct Particle {
    x: f32,
    y: f32,
    ttl: u32,
}

fn main() -> Result<(), Error> {
    let pool = SlotPool::<Particle>::new(4)?;

    println!(
        "Created SlotPool with capacity {} and slots of {} bytes",
        pool.capacity(),
        SlotPool::<Particle>::slot_layout().size()
    );

    let mut first = pool.emplace(Particle {
        x: 0.0,
        y: 0.0,
        ttl: 3,
    })?;
    let second = pool.emplace_with(|| Particle {
        x: 1.0,
        y: 2.0,
        ttl: 5,
    })?;

    first.x += 0.5;
    first.ttl -= 1;
    println!("First particle: {:?}", *first);
    println!("Second particle: {:?} at height {}", *second, second.y);
    println!("Used: {}, available: {}", pool.used(), pool.available());

    // Dropping a handle returns its slot; the next emplace reuses it.
    let first_addr = first.as_ptr();
    drop(first);

    let third = pool.emplace(Particle {
        x: -1.0,
        y: -1.0,
        ttl: 1,
    })?;
    println!(
        "Third particle reused the first slot: {}",
        third.as_ptr() == first_addr
    );

    let _fourth = pool.emplace(Particle {
        x: 4.0,
        y: 4.0,
        ttl: 4,
    })?;
    let _fifth = pool.emplace(Particle {
        x: 5.0,
        y: 5.0,
        ttl: 5,
    })?;

    match pool.emplace(Particle {
        x: 6.0,
        y: 6.0,
        ttl: 6,
    }) {
        Ok(_) => println!("Unexpectedly found room for a sixth particle"),
        Err(error) => println!("Sixth particle rejected with code {}: {error}", error.code()),
    }

    println!(
        "Used: {}, high-water mark: {}",
        pool.used(),
        pool.high_water_mark()
    );

    Ok(())
}
