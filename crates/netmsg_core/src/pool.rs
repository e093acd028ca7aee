//! # Buffer Pool
//!
//! Recycles writer backing buffers so that nested message sessions do not
//! allocate once the pool is warm.

use crate::writer::Writer;

/// A pool of reusable byte buffers for [`Writer`]s.
///
/// At most `max_spare` buffers are retained; extra buffers are dropped on
/// release. Buffers that grew beyond `max_retained_capacity` are also dropped
/// so one oversized message does not pin memory forever.
///
/// # Thread Safety
///
/// This pool is NOT thread-safe. Use one pool per session or wrap in a mutex.
///
/// # Example
///
/// ```rust,ignore
/// let mut pool = BufferPool::new(4, 256, 64 * 1024);
///
/// let writer = pool.acquire(1024);
/// // ... write a message ...
/// pool.release(writer.into_vec());
/// ```
#[derive(Debug)]
pub struct BufferPool {
    /// Spare buffers, all empty.
    spare: Vec<Vec<u8>>,
    /// Maximum number of spare buffers kept.
    max_spare: usize,
    /// Capacity given to freshly allocated buffers.
    initial_capacity: usize,
    /// Buffers larger than this are not kept.
    max_retained_capacity: usize,
    /// Number of acquisitions served from the spare list.
    reused: u64,
    /// Number of acquisitions that allocated.
    allocated: u64,
}

impl BufferPool {
    /// Creates an empty pool.
    ///
    /// # Arguments
    ///
    /// * `max_spare` - Maximum number of idle buffers kept
    /// * `initial_capacity` - Capacity of newly allocated buffers
    /// * `max_retained_capacity` - Larger buffers are freed on release
    #[must_use]
    pub fn new(max_spare: usize, initial_capacity: usize, max_retained_capacity: usize) -> Self {
        Self {
            spare: Vec::with_capacity(max_spare),
            max_spare,
            initial_capacity,
            max_retained_capacity,
            reused: 0,
            allocated: 0,
        }
    }

    /// Returns the number of idle buffers.
    #[inline]
    #[must_use]
    pub fn spare_count(&self) -> usize {
        self.spare.len()
    }

    /// Returns how many acquisitions reused a buffer.
    #[inline]
    #[must_use]
    pub const fn reused_count(&self) -> u64 {
        self.reused
    }

    /// Returns how many acquisitions allocated a new buffer.
    #[inline]
    #[must_use]
    pub const fn allocated_count(&self) -> u64 {
        self.allocated
    }

    /// Returns a growable writer limited to `limit` bytes.
    pub fn acquire(&mut self, limit: usize) -> Writer<'static> {
        if let Some(buf) = self.spare.pop() {
            self.reused += 1;
            Writer::from_vec(buf, limit)
        } else {
            self.allocated += 1;
            Writer::with_limit(self.initial_capacity, limit)
        }
    }

    /// Returns a buffer to the pool.
    pub fn release(&mut self, mut buf: Vec<u8>) {
        if self.spare.len() >= self.max_spare || buf.capacity() > self.max_retained_capacity {
            return;
        }
        buf.clear();
        self.spare.push(buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_allocates_then_reuses() {
        let mut pool = BufferPool::new(2, 32, 1024);
        let writer = pool.acquire(100);
        assert_eq!(pool.allocated_count(), 1);
        assert_eq!(writer.capacity(), 100);

        pool.release(writer.into_vec());
        assert_eq!(pool.spare_count(), 1);

        let writer = pool.acquire(50);
        assert_eq!(pool.reused_count(), 1);
        assert!(writer.is_empty());
        assert_eq!(writer.capacity(), 50);
    }

    #[test]
    fn test_release_discards_dirty_contents() {
        let mut pool = BufferPool::new(1, 8, 1024);
        let mut writer = pool.acquire(64);
        writer.write_u32(0xDEAD_BEEF).unwrap();
        pool.release(writer.into_vec());
        let writer = pool.acquire(64);
        assert!(writer.data().is_empty());
    }

    #[test]
    fn test_spare_limit() {
        let mut pool = BufferPool::new(1, 8, 1024);
        pool.release(Vec::with_capacity(8));
        pool.release(Vec::with_capacity(8));
        assert_eq!(pool.spare_count(), 1);
    }

    #[test]
    fn test_oversized_buffers_are_freed() {
        let mut pool = BufferPool::new(4, 8, 16);
        pool.release(Vec::with_capacity(4096));
        assert_eq!(pool.spare_count(), 0);
    }
}
