//! Thread-safe growable circular double-ended queue
//!
//! [`ConcurrentRingDeque`] is the task inbox used by each pool worker. Every
//! operation takes a single per-instance lock; the structure trades
//! throughput for straightforward correctness under concurrent producers
//! and consumers.

use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};

/// Storage arena plus cursors. Occupied slots form a contiguous range with
/// wraparound, starting at `front` for `len` elements.
struct RingBuf<T> {
    slots: Box<[Option<T>]>,
    front: usize,
    len: usize,
}

impl<T> RingBuf<T> {
    fn new() -> Self {
        Self {
            slots: Box::new([]),
            front: 0,
            len: 0,
        }
    }

    fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Translate a logical index (0 = front) to a physical slot index.
    fn slot(&self, logical: usize) -> usize {
        debug_assert!(logical < self.len);
        (self.front + logical) % self.capacity()
    }

    fn back_slot(&self) -> usize {
        self.slot(self.len - 1)
    }

    /// Reallocate to hold at least `min_cap` elements, moving the occupied
    /// range into the new arena in logical order.
    fn reserve(&mut self, min_cap: usize) {
        if self.capacity() >= min_cap {
            return;
        }
        let mut arena: Vec<Option<T>> = Vec::with_capacity(min_cap);
        for logical in 0..self.len {
            let physical = self.slot(logical);
            arena.push(self.slots[physical].take());
        }
        arena.resize_with(min_cap, || None);
        self.slots = arena.into_boxed_slice();
        self.front = 0;
    }

    /// Grow when full. The new capacity strictly exceeds `len`, keeping
    /// pushes amortized O(1); the factor itself is a tuning choice.
    fn grow(&mut self) {
        let new_cap = (self.capacity() * 2).max(8);
        self.reserve(new_cap);
    }

    fn push_front(&mut self, value: T) {
        if self.len == self.capacity() {
            self.grow();
        }
        let cap = self.capacity();
        self.front = (self.front + cap - 1) % cap;
        self.slots[self.front] = Some(value);
        self.len += 1;
    }

    fn push_back(&mut self, value: T) {
        if self.len == self.capacity() {
            self.grow();
        }
        let physical = (self.front + self.len) % self.capacity();
        self.slots[physical] = Some(value);
        self.len += 1;
    }

    fn pop_front(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let value = self.slots[self.front].take();
        self.front = (self.front + 1) % self.capacity();
        self.len -= 1;
        value
    }

    fn pop_back(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let value = self.slots[self.back_slot()].take();
        self.len -= 1;
        value
    }

    fn clear(&mut self) {
        while self.pop_back().is_some() {}
    }
}

/// A mutex-protected, amortized-O(1) growable circular deque.
///
/// `pull_front`/`pull_back` are the non-blocking poll primitives used by
/// workers and the pool's rebalancer; `pop_front`/`pop_back`/`front`/`back`
/// panic on an empty instance, which is a caller bug rather than a
/// recoverable error.
pub struct ConcurrentRingDeque<T> {
    inner: Mutex<RingBuf<T>>,
}

impl<T> ConcurrentRingDeque<T> {
    /// Create an empty deque with no allocated storage.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RingBuf::new()),
        }
    }

    /// Number of elements currently held.
    pub fn len(&self) -> usize {
        self.inner.lock().len
    }

    /// Whether the deque holds no elements.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().len == 0
    }

    /// Raw storage size.
    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }

    /// Ensure storage for at least `n` elements without changing contents.
    pub fn reserve(&self, n: usize) {
        self.inner.lock().reserve(n);
    }

    /// Reference to the logically first element, holding the instance lock
    /// for the guard's lifetime.
    ///
    /// # Panics
    ///
    /// Panics if the deque is empty; callers must check first.
    pub fn front(&self) -> MappedMutexGuard<'_, T> {
        MutexGuard::map(self.inner.lock(), |buf| {
            assert!(buf.len > 0, "front() on empty deque");
            let slot = buf.front;
            buf.slots[slot].as_mut().expect("occupied front slot")
        })
    }

    /// Reference to the logically last element, holding the instance lock
    /// for the guard's lifetime.
    ///
    /// # Panics
    ///
    /// Panics if the deque is empty; callers must check first.
    pub fn back(&self) -> MappedMutexGuard<'_, T> {
        MutexGuard::map(self.inner.lock(), |buf| {
            assert!(buf.len > 0, "back() on empty deque");
            let slot = buf.back_slot();
            buf.slots[slot].as_mut().expect("occupied back slot")
        })
    }

    /// Insert at the front, growing storage first if full.
    pub fn push_front(&self, value: T) {
        self.inner.lock().push_front(value);
    }

    /// Insert at the back, growing storage first if full.
    pub fn push_back(&self, value: T) {
        self.inner.lock().push_back(value);
    }

    /// Evict the front element.
    ///
    /// # Panics
    ///
    /// Panics if the deque is empty; `pull_front` is the checked
    /// alternative.
    pub fn pop_front(&self) -> T {
        self.inner
            .lock()
            .pop_front()
            .expect("pop_front() on empty deque")
    }

    /// Evict the back element.
    ///
    /// # Panics
    ///
    /// Panics if the deque is empty; `pull_back` is the checked
    /// alternative.
    pub fn pop_back(&self) -> T {
        self.inner
            .lock()
            .pop_back()
            .expect("pop_back() on empty deque")
    }

    /// Move the front element out if one exists. Never blocks beyond the
    /// instance lock.
    pub fn pull_front(&self) -> Option<T> {
        self.inner.lock().pop_front()
    }

    /// Move the back element out if one exists. Never blocks beyond the
    /// instance lock.
    pub fn pull_back(&self) -> Option<T> {
        self.inner.lock().pop_back()
    }

    /// Evict all elements, keeping the storage.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Exchange contents with another instance.
    ///
    /// Both locks are acquired in address order so that two threads
    /// swapping the same pair in opposite directions cannot deadlock.
    pub fn swap(&self, other: &Self) {
        let self_addr = self as *const Self as usize;
        let other_addr = other as *const Self as usize;
        if self_addr == other_addr {
            return;
        }
        let (mut first, mut second) = if self_addr < other_addr {
            (self.inner.lock(), other.inner.lock())
        } else {
            let second = other.inner.lock();
            let first = self.inner.lock();
            (first, second)
        };
        std::mem::swap(&mut *first, &mut *second);
    }
}

impl<T> Default for ConcurrentRingDeque<T> {
    fn default() -> Self {
        Self::new()
    }
}
