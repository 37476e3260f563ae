//! Pooled copy buffers
//!
//! A bounded pool of fixed-size byte buffers shared by all copy workers.
//! Buffers are handed out through [`PooledBuffer`], which returns its
//! buffer to the pool when dropped, on success and error paths alike.

use crossbeam::queue::ArrayQueue;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Pool of reusable fixed-size buffers
pub struct BufferPool {
    /// Idle buffers
    idle: ArrayQueue<Box<[u8]>>,
    /// Size of every buffer
    buffer_size: usize,
    /// Buffers allocated over the pool's lifetime
    allocated: AtomicUsize,
    /// Buffers currently checked out
    in_use: AtomicUsize,
}

impl BufferPool {
    /// Create a pool keeping at most `max_idle` buffers of `buffer_size` bytes
    pub fn new(buffer_size: usize, max_idle: usize) -> Self {
        Self {
            idle: ArrayQueue::new(max_idle.max(1)),
            buffer_size: buffer_size.max(1),
            allocated: AtomicUsize::new(0),
            in_use: AtomicUsize::new(0),
        }
    }

    /// Pool sized for `workers` concurrent copies
    pub fn for_workers(buffer_size: usize, workers: usize) -> Self {
        Self::new(buffer_size, workers)
    }

    /// Check out a buffer, allocating one if the pool is empty
    pub fn acquire(&self) -> PooledBuffer<'_> {
        let buffer = self.idle.pop().unwrap_or_else(|| {
            self.allocated.fetch_add(1, Ordering::Relaxed);
            vec![0u8; self.buffer_size].into_boxed_slice()
        });
        self.in_use.fetch_add(1, Ordering::SeqCst);

        PooledBuffer {
            pool: self,
            buffer: Some(buffer),
        }
    }

    fn release(&self, buffer: Box<[u8]>) {
        self.in_use.fetch_sub(1, Ordering::SeqCst);
        // Surplus buffers are dropped once the pool is full
        let _ = self.idle.push(buffer);
    }

    /// Get pool statistics
    pub fn stats(&self) -> BufferPoolStats {
        BufferPoolStats {
            idle: self.idle.len(),
            in_use: self.in_use.load(Ordering::SeqCst),
            allocated: self.allocated.load(Ordering::Relaxed),
        }
    }
}

/// Buffer checked out of a [`BufferPool`]
pub struct PooledBuffer<'a> {
    pool: &'a BufferPool,
    buffer: Option<Box<[u8]>>,
}

impl Deref for PooledBuffer<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.buffer.as_deref().unwrap_or(&[])
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.buffer.as_deref_mut().unwrap_or(&mut [])
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            self.pool.release(buffer);
        }
    }
}

/// Pool statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPoolStats {
    /// Buffers waiting in the pool
    pub idle: usize,
    /// Buffers currently checked out
    pub in_use: usize,
    /// Buffers allocated so far
    pub allocated: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_buffer_is_reused() {
        let pool = BufferPool::new(32 * 1024, 2);

        {
            let buf = pool.acquire();
            assert_eq!(buf.len(), 32 * 1024);
            assert_eq!(pool.stats().in_use, 1);
        }

        let stats = pool.stats();
        assert_eq!(stats.in_use, 0);
        assert_eq!(stats.idle, 1);

        let _again = pool.acquire();
        assert_eq!(pool.stats().allocated, 1);
    }

    #[test]
    fn test_released_on_panic_unwind() {
        let pool = Arc::new(BufferPool::new(16, 1));
        let inner = Arc::clone(&pool);
        let result = std::thread::spawn(move || {
            let _buf = inner.acquire();
            panic!("copy blew up");
        })
        .join();

        assert!(result.is_err());
        assert_eq!(pool.stats().in_use, 0);
    }

    #[test]
    fn test_pool_is_bounded() {
        let pool = BufferPool::new(8, 2);
        let held: Vec<_> = (0..5).map(|_| pool.acquire()).collect();
        assert_eq!(pool.stats().allocated, 5);
        drop(held);

        let stats = pool.stats();
        assert_eq!(stats.idle, 2);
        assert_eq!(stats.in_use, 0);
    }

    #[test]
    fn test_concurrent_acquire_release() {
        let pool = Arc::new(BufferPool::new(64, 4));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let mut buf = pool.acquire();
                        buf[0] = i as u8;
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(pool.stats().in_use, 0);
        assert!(pool.stats().idle <= 4);
    }
}
