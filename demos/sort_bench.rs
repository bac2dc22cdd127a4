//! Benchmark and verification driver
//!
//! Generates a vector one-third random and two-thirds copies, then times
//! and verifies three passes with a greater-than comparator (descending):
//! sorting the random data, re-sorting the sorted result, and sorting the
//! reversed result.

use parasort::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;

/// Walk the output and fail if any later element must precede an earlier
/// one under the comparator.
fn check<T, C>(v: &[T], before: &C) -> std::result::Result<(), usize>
where
    C: Fn(&T, &T) -> bool,
{
    for i in 1..v.len() {
        if before(&v[i], &v[i - 1]) {
            return Err(i);
        }
    }
    Ok(())
}

fn timed<F: FnOnce()>(label: &str, f: F) {
    let start = Instant::now();
    f();
    println!("{label}:\t{:?}", start.elapsed());
}

fn main() {
    env_logger::init();

    let len: usize = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(3_000_000);
    let descending = |a: &u32, b: &u32| a > b;
    let sorter = HybridSort::new();

    let mut data = vec![0u32; len];
    timed("generate", || {
        // One third random values, duplicated into the next two thirds;
        // any division remainder keeps its zeros
        let mut rng = StdRng::from_entropy();
        let third = len / 3;
        for slot in data.iter_mut().take(third) {
            *slot = rng.gen();
        }
        let (head, tail) = data.split_at_mut(third);
        tail[..third].copy_from_slice(head);
        let (mid, rest) = tail.split_at_mut(third);
        rest[..third].copy_from_slice(mid);
    });

    println!("\nsort random ({len} elements, descending):");
    timed("sort", || sorter.sort_by(&mut data, descending).unwrap());
    if let Err(at) = check(&data, &descending) {
        eprintln!("verification failed at index {at}");
        std::process::exit(1);
    }

    println!("\nsort already-sorted:");
    timed("sort", || sorter.sort_by(&mut data, descending).unwrap());
    if let Err(at) = check(&data, &descending) {
        eprintln!("verification failed at index {at}");
        std::process::exit(1);
    }

    println!("\nsort reversed:");
    timed("reverse", || data.reverse());
    timed("sort", || sorter.sort_by(&mut data, descending).unwrap());
    if let Err(at) = check(&data, &descending) {
        eprintln!("verification failed at index {at}");
        std::process::exit(1);
    }

    println!("\nall passes verified");
}
