//! Reusable scratch buffers for the merge engine.
//!
//! Each merge call checks out one boundary array, owns it exclusively for the
//! duration of the call, and hands it back on drop. Buffers that grew past
//! `max_capacity` are dropped instead of returned so one pathological chunk
//! cannot pin memory for the life of the codec.

use std::ops::{Deref, DerefMut};
use std::sync::Mutex;

use super::vocab::Rank;

/// Initial capacity of a freshly allocated boundary array.
pub const DEFAULT_PART_CAPACITY: usize = 128;

/// Buffers with a larger capacity are discarded on return.
pub const MAX_POOLED_PART_CAPACITY: usize = 1024;

/// Maximum number of idle buffers retained.
pub const MAX_IDLE_PARTS: usize = 64;

/// One boundary of the current segmentation.
///
/// `rank` is the merge score: the rank of the piece formed by joining the span
/// starting here with the following span, or [`Rank::MAX`] if that piece is not
/// in the vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Part {
    pub offset: usize,
    pub rank: Rank,
}

/// A pool of boundary arrays shared by concurrent merge calls.
#[derive(Debug)]
pub struct PartPool {
    free: Mutex<Vec<Vec<Part>>>,
    initial_capacity: usize,
    max_capacity: usize,
    max_idle: usize,
}

impl PartPool {
    pub fn new() -> Self {
        Self::with_limits(
            DEFAULT_PART_CAPACITY,
            MAX_POOLED_PART_CAPACITY,
            MAX_IDLE_PARTS,
        )
    }

    pub fn with_limits(initial_capacity: usize, max_capacity: usize, max_idle: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            initial_capacity,
            max_capacity,
            max_idle,
        }
    }

    /// Check out an empty buffer with room for at least `len` parts.
    pub fn checkout(&self, len: usize) -> PooledParts<'_> {
        let recycled = self.free.lock().ok().and_then(|mut free| free.pop());
        let mut parts = recycled.unwrap_or_else(|| Vec::with_capacity(self.initial_capacity));
        parts.clear();
        parts.reserve(len);
        PooledParts { pool: self, parts }
    }

    /// Number of idle buffers currently held.
    pub fn idle(&self) -> usize {
        self.free.lock().map(|free| free.len()).unwrap_or(0)
    }

    fn give_back(&self, parts: Vec<Part>) {
        if parts.capacity() > self.max_capacity {
            return;
        }
        if let Ok(mut free) = self.free.lock() {
            if free.len() < self.max_idle {
                free.push(parts);
            }
        }
    }
}

impl Default for PartPool {
    fn default() -> Self {
        Self::new()
    }
}

/// A boundary array checked out of a [`PartPool`], returned when dropped.
pub struct PooledParts<'a> {
    pool: &'a PartPool,
    parts: Vec<Part>,
}

impl Deref for PooledParts<'_> {
    type Target = Vec<Part>;

    fn deref(&self) -> &Self::Target {
        &self.parts
    }
}

impl DerefMut for PooledParts<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.parts
    }
}

impl Drop for PooledParts<'_> {
    fn drop(&mut self) {
        self.pool.give_back(std::mem::take(&mut self.parts));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_returns_on_drop() {
        let pool = PartPool::new();
        assert_eq!(pool.idle(), 0);
        {
            let mut parts = pool.checkout(10);
            assert!(parts.is_empty());
            assert!(parts.capacity() >= 10);
            parts.push(Part { offset: 0, rank: 1 });
            assert_eq!(pool.idle(), 0);
        }
        assert_eq!(pool.idle(), 1);

        // A recycled buffer comes back empty.
        let parts = pool.checkout(4);
        assert!(parts.is_empty());
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn test_concurrent_checkouts_are_distinct() {
        let pool = PartPool::new();
        let mut a = pool.checkout(2);
        let mut b = pool.checkout(2);
        a.push(Part { offset: 1, rank: 1 });
        b.push(Part { offset: 2, rank: 2 });
        assert_eq!(a[0].offset, 1);
        assert_eq!(b[0].offset, 2);
        drop(a);
        drop(b);
        assert_eq!(pool.idle(), 2);
    }

    #[test]
    fn test_oversized_buffers_are_discarded() {
        let pool = PartPool::with_limits(4, 16, 8);
        drop(pool.checkout(17));
        assert_eq!(pool.idle(), 0);
        drop(pool.checkout(8));
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn test_idle_limit() {
        let pool = PartPool::with_limits(4, 16, 1);
        let a = pool.checkout(1);
        let b = pool.checkout(1);
        drop(a);
        drop(b);
        assert_eq!(pool.idle(), 1);
    }
}
