//! Hybrid adaptive sort
//!
//! Detects natural runs in the input, pads short runs via pool-dispatched
//! sequential sorts, then merges runs back together with the adaptive
//! in-place merge. Descending runs are reversed in a stability-preserving
//! way before being recorded.
//!
//! Note: this module uses unsafe code to hand pairwise-disjoint sub-ranges
//! of the slice to pool tasks through raw spans; the pool is drained
//! before the borrow ends.

#![allow(unsafe_code)]

use super::merge::merge;
use super::sequential::{insertion_sort, merge_sort, INSERTION_THRESHOLD};
use crate::error::Result;
use crate::pool::{PoolConfig, ThreadPool};

/// A contiguous half-open sub-range `[first, last)` already sorted
/// relative to itself. Runs never outlive one sort invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Run {
    first: usize,
    last: usize,
}

impl Run {
    fn len(&self) -> usize {
        self.last - self.first
    }
}

/// Raw view of a sub-range and comparator handed to a pool task.
///
/// Disjointness of the sub-ranges is established by the scan before any
/// span is created, and the pool is drained before the slice borrow ends,
/// so the pointers never outlive or alias the data they cover.
struct SortSpan<T, C> {
    data: *mut T,
    len: usize,
    before: *const C,
}

// SAFETY: the span moves between threads as an opaque token; the data it
// points at is only touched by the one task that receives it, and the
// comparator is Sync.
unsafe impl<T: Send, C: Sync> Send for SortSpan<T, C> {}

impl<T, C> SortSpan<T, C>
where
    C: Fn(&T, &T) -> bool,
{
    fn new(v: &mut [T], before: &C) -> Self {
        Self {
            data: v.as_mut_ptr(),
            len: v.len(),
            before,
        }
    }

    /// # Safety
    ///
    /// Must be called at most once, while the slice and comparator the
    /// span was created from are still live, with no other access to the
    /// spanned sub-range.
    unsafe fn sort(self) {
        let v = std::slice::from_raw_parts_mut(self.data, self.len);
        merge_sort(v, &*self.before);
    }
}

fn is_equal<T, C>(a: &T, b: &T, before: &C) -> bool
where
    C: Fn(&T, &T) -> bool,
{
    !before(a, b) && !before(b, a)
}

/// Reverse a descending run without disturbing the relative order of
/// elements the comparator considers equal: reverse wholesale, then
/// re-reverse each maximal block of mutually equal adjacent elements.
fn reverse_stable<T, C>(v: &mut [T], before: &C)
where
    C: Fn(&T, &T) -> bool,
{
    v.reverse();
    let n = v.len();
    let mut i = 0;
    while i < n {
        while i + 1 < n && !is_equal(&v[i], &v[i + 1], before) {
            i += 1;
        }
        let block = i;
        if i < n {
            i += 1;
            while i < n && is_equal(&v[i - 1], &v[i], before) {
                i += 1;
            }
        }
        v[block..i].reverse();
    }
}

/// Walk the slice left to right, recording maximal sorted runs.
///
/// Equal neighbors are absorbed before the run's direction is decided, so
/// stability never depends on the direction chosen. Runs shorter than
/// `min_run = ceil(n / 9)` are padded to `min_run` and the padded range is
/// sorted asynchronously on the pool; the pool is drained before the run
/// list is returned.
fn collect_runs<T, C>(v: &mut [T], before: &C, pool: &ThreadPool) -> Vec<Run>
where
    T: Send + 'static,
    C: Fn(&T, &T) -> bool + Send + Sync + 'static,
{
    let n = v.len();
    let min_run = (n + 8) / 9;
    let mut runs = Vec::new();
    let mut i = 0;
    while i < n {
        let start = i;
        while i + 1 < n && is_equal(&v[i], &v[i + 1], before) {
            i += 1;
        }
        if i + 1 < n && before(&v[i + 1], &v[i]) {
            // Descending: extend while non-ascending, then restore
            // ascending order stably
            i += 1;
            while i < n && !before(&v[i - 1], &v[i]) {
                i += 1;
            }
            reverse_stable(&mut v[start..i], before);
        } else {
            i += 1;
            while i < n && !before(&v[i], &v[i - 1]) {
                i += 1;
            }
        }
        if i - start < min_run {
            i = (start + min_run).min(n);
            let span = SortSpan::new(&mut v[start..i], before);
            // SAFETY: [start, i) never overlaps any other submitted range
            // and the scan does not touch it again; collect_runs drains
            // the pool before returning the borrow.
            let _ = pool.submit(move || unsafe { span.sort() });
        }
        runs.push(Run { first: start, last: i });
    }
    log::debug!("scan found {} runs (min_run {})", runs.len(), min_run);
    pool.wait();
    runs
}

/// Merge two memory-adjacent runs in place, in either list order.
///
/// Non-adjacent pairs cannot be produced by the scan; reaching one here is
/// an internal bug.
fn merge_adjacent<T, C>(v: &mut [T], x: Run, y: Run, before: &C) -> Run
where
    C: Fn(&T, &T) -> bool,
{
    let (lo, hi) = if x.last == y.first { (x, y) } else { (y, x) };
    debug_assert_eq!(lo.last, hi.first, "reduction reached non-adjacent runs");
    merge(&mut v[lo.first..hi.last], lo.last - lo.first, before);
    Run {
        first: lo.first,
        last: hi.last,
    }
}

/// One reduction pass: drain `source` from its end into merges or into
/// `dest`.
///
/// A pair whose combined length is disproportionate to the pass mean or to
/// the next pending run is deferred rather than merged, biasing the
/// reduction toward similarly-sized merges. The final two runs of a pass
/// merge unconditionally.
fn reduce<T, C>(v: &mut [T], source: &mut Vec<Run>, dest: &mut Vec<Run>, before: &C)
where
    C: Fn(&T, &T) -> bool,
{
    let (Some(head), Some(tail)) = (source.first(), source.last()) else {
        return;
    };
    // The covered span is endpoint-to-endpoint regardless of which memory
    // order the alternating passes left the list in
    let span = head.last.max(tail.last) - head.first.min(tail.first);
    let mean = span / source.len();
    log::trace!("reducing {} runs, mean length {}", source.len(), mean);

    while let Some(run_a) = source.pop() {
        let Some(run_b) = source.pop() else {
            dest.push(run_a);
            break;
        };
        if let Some(&run_c) = source.first() {
            let combined = run_a.len() + run_b.len();
            if combined / 3 > mean || combined / 3 > run_c.len() {
                dest.push(run_a);
                source.push(run_b);
                continue;
            }
            let merged = merge_adjacent(v, run_a, run_b, before);
            source.push(merged);
        } else {
            let merged = merge_adjacent(v, run_a, run_b, before);
            dest.push(merged);
        }
    }
}

/// The hybrid adaptive sorter.
///
/// Each `sort_by` call spins up its own [`ThreadPool`] for the run-padding
/// phase and tears it down before returning.
#[derive(Debug, Clone)]
pub struct HybridSort {
    num_workers: usize,
}

impl HybridSort {
    /// A sorter using one worker per CPU core.
    pub fn new() -> Self {
        Self { num_workers: 0 }
    }

    /// A sorter with an explicit worker count (0 = number of CPU cores).
    pub fn with_workers(num_workers: usize) -> Self {
        Self { num_workers }
    }

    /// Sort the slice in place according to `before`, a strict-weak-order
    /// predicate safe to invoke concurrently: `before(a, b)` means `a`
    /// must precede `b`. The sort is stable.
    ///
    /// # Errors
    ///
    /// Propagates worker thread spawn failure.
    pub fn sort_by<T, C>(&self, v: &mut [T], before: C) -> Result<()>
    where
        T: Send + 'static,
        C: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        if v.len() <= INSERTION_THRESHOLD {
            insertion_sort(v, &before);
            return Ok(());
        }

        let pool = ThreadPool::with_config(PoolConfig {
            num_workers: self.num_workers,
            ..Default::default()
        })?;

        let mut source = collect_runs(v, &before, &pool);
        let mut dest = Vec::new();
        loop {
            if source.len() > 1 {
                reduce(v, &mut source, &mut dest, &before);
            } else {
                break;
            }
            if dest.len() > 1 {
                reduce(v, &mut dest, &mut source, &before);
            } else {
                break;
            }
        }
        Ok(())
    }

    /// Sort the slice in place into ascending order.
    pub fn sort<T>(&self, v: &mut [T]) -> Result<()>
    where
        T: Ord + Send + 'static,
    {
        self.sort_by(v, |a: &T, b: &T| a < b)
    }
}

impl Default for HybridSort {
    fn default() -> Self {
        Self::new()
    }
}

/// Sort in place with a strict-weak-order predicate, using one worker per
/// CPU core for the run-padding phase.
pub fn sort_by<T, C>(v: &mut [T], before: C) -> Result<()>
where
    T: Send + 'static,
    C: Fn(&T, &T) -> bool + Send + Sync + 'static,
{
    HybridSort::new().sort_by(v, before)
}

/// Sort in place into ascending order.
pub fn sort<T>(v: &mut [T]) -> Result<()>
where
    T: Ord + Send + 'static,
{
    HybridSort::new().sort(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverse_stable_keeps_equal_order() {
        // Descending by key; payload records original position
        let mut v = vec![(5u32, 0u32), (5, 1), (3, 2), (3, 3), (1, 4)];
        reverse_stable(&mut v, &|a: &(u32, u32), b: &(u32, u32)| a.0 < b.0);
        assert_eq!(v, vec![(1, 4), (3, 2), (3, 3), (5, 0), (5, 1)]);
    }

    #[test]
    fn test_sort_small_input() {
        let mut v = vec![3u32, 1, 2];
        sort(&mut v).unwrap();
        assert_eq!(v, vec![1, 2, 3]);
    }

    #[test]
    fn test_sort_empty_and_single() {
        let mut empty: Vec<u32> = Vec::new();
        sort(&mut empty).unwrap();
        assert!(empty.is_empty());

        let mut single = vec![9u32];
        sort(&mut single).unwrap();
        assert_eq!(single, vec![9]);
    }

    #[test]
    fn test_sort_medium_random() {
        let mut v: Vec<u32> = (0..5000u32).map(|i| i.wrapping_mul(2654435761)).collect();
        let mut expected = v.clone();
        expected.sort_unstable();
        sort(&mut v).unwrap();
        assert_eq!(v, expected);
    }

    #[test]
    fn test_sort_descending_comparator() {
        let mut v: Vec<u32> = (0..3000).map(|i| (i * 31) % 512).collect();
        sort_by(&mut v, |a: &u32, b: &u32| a > b).unwrap();
        for pair in v.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
    }

    #[test]
    fn test_sort_idempotent_on_sorted() {
        let mut v: Vec<u32> = (0..2000).collect();
        let expected = v.clone();
        sort(&mut v).unwrap();
        assert_eq!(v, expected);
    }

    #[test]
    fn test_sort_sawtooth_runs() {
        // Alternating ascending and descending natural runs
        let mut v = Vec::new();
        for block in 0..40u32 {
            if block % 2 == 0 {
                v.extend((0..50).map(|i| block * 100 + i));
            } else {
                v.extend((0..50).rev().map(|i| block * 100 + i));
            }
        }
        let mut expected = v.clone();
        expected.sort_unstable();
        sort(&mut v).unwrap();
        assert_eq!(v, expected);
    }
}
