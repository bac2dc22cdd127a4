//! Adaptive in-place merge primitive
//!
//! Merges two adjacent pre-sorted runs using O(min(left, right)) auxiliary
//! memory. The already-ordered prefix of the left run and suffix of the
//! right run are trimmed first; fully disjoint remainders take a
//! block-swap shortcut instead of a comparison merge.
//!
//! Note: this module uses unsafe code for the scratch-buffer merge loops,
//! which move elements through raw pointers the way the standard library's
//! stable sort does.

#![allow(unsafe_code)]

use std::ptr;

/// Scratch-buffer bookkeeping for the merge loops.
///
/// `start..end` is the range of buffered elements not yet merged back and
/// `dest` is where they belong in the slice. Writing the remainder back in
/// `Drop` guarantees the slice is restored to a valid permutation on every
/// exit path, including a panicking comparator.
struct MergeHole<T> {
    start: *mut T,
    end: *mut T,
    dest: *mut T,
}

impl<T> Drop for MergeHole<T> {
    fn drop(&mut self) {
        // SAFETY: `start..end` holds initialized elements owned by the
        // hole, and `dest` points at a gap of at least that many slots in
        // the slice being merged. Buffer and slice never overlap.
        unsafe {
            let len = self.end.offset_from(self.start) as usize;
            ptr::copy_nonoverlapping(self.start, self.dest, len);
        }
    }
}

/// Merge the sorted runs `v[..div]` and `v[div..]` into a sorted `v`.
///
/// `before` is a strict-weak-order predicate (`before(a, b)` means `a`
/// must precede `b`), pure and consistent across calls. Ties between the
/// runs keep the left run's elements first, preserving stability.
pub fn merge<T, C>(v: &mut [T], div: usize, before: &C)
where
    C: Fn(&T, &T) -> bool,
{
    let mut first = 0;
    let mut last = v.len();
    debug_assert!(div <= last);
    if div == 0 || div == last {
        return;
    }

    // Trim the already-ordered prefix of the left run and suffix of the
    // right run; only the genuinely interleaved region is merged.
    while first < div && !before(&v[div], &v[first]) {
        first += 1;
    }
    while div < last && !before(&v[last - 1], &v[div - 1]) {
        last -= 1;
    }
    if first == div || div == last {
        return;
    }

    // Disjoint remainders (all of right < all of left): swap the smaller
    // block into place, leaving at most one residual merge.
    if before(&v[last - 1], &v[first]) {
        let left_len = div - first;
        let right_len = last - div;
        if right_len < left_len {
            for i in 0..right_len {
                v.swap(first + i, div + i);
            }
            first += right_len;
        } else {
            for i in 1..=left_len {
                last -= 1;
                v.swap(last, div - i);
            }
        }
        if first == div || div == last {
            return;
        }
    }

    if last - div < div - first {
        merge_right(v, first, div, last, before);
    } else {
        merge_left(v, first, div, last, before);
    }
}

/// Buffer `v[first..div]` and merge forward into `v[first..last]`.
fn merge_left<T, C>(v: &mut [T], first: usize, div: usize, last: usize, before: &C)
where
    C: Fn(&T, &T) -> bool,
{
    let len = div - first;
    let mut buf: Vec<T> = Vec::with_capacity(len);
    let buf_ptr = buf.as_mut_ptr();
    let v_ptr = v.as_mut_ptr();

    // SAFETY: `first <= div <= last <= v.len()` and `buf` has capacity for
    // the whole left run. Elements moved into the buffer are owned by the
    // hole from here on; `buf` itself stays length zero and frees only its
    // allocation. Source and destination of every 1-element copy are
    // distinct because the write cursor trails the right-run read cursor.
    unsafe {
        ptr::copy_nonoverlapping(v_ptr.add(first), buf_ptr, len);
        let mut hole = MergeHole {
            start: buf_ptr,
            end: buf_ptr.add(len),
            dest: v_ptr.add(first),
        };
        let mut right = v_ptr.add(div);
        let right_end = v_ptr.add(last);

        while hole.start < hole.end && right < right_end {
            // Consume the lesser side; ties prefer the buffered left run.
            let to_copy = if before(&*right, &*hole.start) {
                let p = right;
                right = right.add(1);
                p
            } else {
                let p = hole.start;
                hole.start = hole.start.add(1);
                p
            };
            ptr::copy_nonoverlapping(to_copy, hole.dest, 1);
            hole.dest = hole.dest.add(1);
        }
        // Any unconsumed buffered elements are written back when `hole`
        // drops.
    }
}

/// Buffer `v[div..last]` and merge backward into `v[first..last]`.
fn merge_right<T, C>(v: &mut [T], first: usize, div: usize, last: usize, before: &C)
where
    C: Fn(&T, &T) -> bool,
{
    let len = last - div;
    let mut buf: Vec<T> = Vec::with_capacity(len);
    let buf_ptr = buf.as_mut_ptr();
    let v_ptr = v.as_mut_ptr();

    // SAFETY: as in `merge_left`, with the roles mirrored. `dest` doubles
    // as the left run's backward read cursor, so the unfilled gap is
    // always `[dest, out)` and holds exactly `end - start` slots, which is
    // what the hole's drop fills from the buffer.
    unsafe {
        ptr::copy_nonoverlapping(v_ptr.add(div), buf_ptr, len);
        let mut hole = MergeHole {
            start: buf_ptr,
            end: buf_ptr.add(len),
            dest: v_ptr.add(div),
        };
        let left_first = v_ptr.add(first);
        let mut out = v_ptr.add(last);

        while left_first < hole.dest && hole.start < hole.end {
            // Consume the greater side; ties prefer the buffered right run,
            // which keeps left-run elements ahead of equal right-run ones.
            let to_copy = if before(&*hole.end.sub(1), &*hole.dest.sub(1)) {
                hole.dest = hole.dest.sub(1);
                hole.dest
            } else {
                hole.end = hole.end.sub(1);
                hole.end
            };
            out = out.sub(1);
            ptr::copy_nonoverlapping(to_copy, out, 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn less(a: &u32, b: &u32) -> bool {
        a < b
    }

    fn check_merge(mut v: Vec<u32>, div: usize) {
        let mut expected = v.clone();
        expected.sort_unstable();
        merge(&mut v, div, &less);
        assert_eq!(v, expected);
    }

    #[test]
    fn test_interleaved() {
        check_merge(vec![1, 4, 7, 9, 2, 3, 8, 10], 4);
    }

    #[test]
    fn test_already_ordered() {
        check_merge(vec![1, 2, 3, 4, 5, 6], 3);
    }

    #[test]
    fn test_disjoint_block_swap() {
        // Every right element precedes every left element
        check_merge(vec![5, 6, 7, 8, 1, 2], 4);
        check_merge(vec![7, 8, 1, 2, 3, 4], 2);
        check_merge(vec![5, 6, 7, 1, 2, 3], 3);
    }

    #[test]
    fn test_empty_sides() {
        check_merge(vec![1, 2, 3], 0);
        check_merge(vec![1, 2, 3], 3);
        check_merge(vec![], 0);
    }

    #[test]
    fn test_single_elements() {
        check_merge(vec![2, 1], 1);
        check_merge(vec![1, 2], 1);
    }

    #[test]
    fn test_uneven_runs() {
        check_merge(vec![10, 20, 30, 40, 50, 60, 70, 25], 7);
        check_merge(vec![35, 1, 2, 3, 4, 5, 6, 7], 1);
    }

    #[test]
    fn test_stability_on_ties() {
        // Pairs compared by key only; payload records original position
        let mut v = vec![(1u32, 0u32), (3, 1), (5, 2), (1, 3), (3, 4), (5, 5)];
        let before = |a: &(u32, u32), b: &(u32, u32)| a.0 < b.0;
        merge(&mut v, 3, &before);
        assert_eq!(v, vec![(1, 0), (1, 3), (3, 1), (3, 4), (5, 2), (5, 5)]);
    }

    #[test]
    fn test_non_copy_elements() {
        let mut v: Vec<String> = ["b", "d", "f", "a", "c", "e"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        merge(&mut v, 3, &|a: &String, b: &String| a < b);
        assert_eq!(v, vec!["a", "b", "c", "d", "e", "f"]);
    }

    #[test]
    fn test_large_random_runs() {
        let mut left: Vec<u32> = (0..500).map(|i| (i * 37) % 1000).collect();
        let mut right: Vec<u32> = (0..300).map(|i| (i * 53) % 1000).collect();
        left.sort_unstable();
        right.sort_unstable();
        let div = left.len();
        let mut v = left;
        v.extend(right);
        check_merge(v, div);
    }
}
