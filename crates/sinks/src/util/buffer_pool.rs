//! Lock-free pool of reusable byte buffers
//!
//! Records are rendered into `BytesMut` buffers rented from a process-wide
//! pool, so steady-state emission does not allocate. Buffers that grew past
//! [`MAX_CAPACITY`] while holding an unusually large record are dropped on
//! return rather than pooled, which bounds the memory the pool can pin.
//!
//! A second, per-thread scratch buffer serves the contended emission path:
//! it is only ever touched by its owning thread, so it needs no queue at all.
//!
//! # Example
//!
//! ```ignore
//! let mut buf = BufferPool::global().get();
//! record.format(&mut buf);
//! file.write(&buf)?;
//! BufferPool::global().put(buf);
//! ```

use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::BytesMut;
use crossbeam::queue::SegQueue;

/// Capacity of a freshly allocated buffer
pub const INITIAL_CAPACITY: usize = 16 * 1024;

/// Buffers above this capacity are not returned to the pool
pub const MAX_CAPACITY: usize = 128 * 1024;

static GLOBAL: BufferPool = BufferPool::new(INITIAL_CAPACITY, MAX_CAPACITY);

thread_local! {
    static SCRATCH: RefCell<BytesMut> = RefCell::new(BytesMut::new());
}

/// Lock-free pool of reusable `BytesMut` buffers
///
/// Unlike a fixed-size pool nothing is pre-allocated: buffers are created on
/// demand and kept for reuse once returned.
pub struct BufferPool {
    /// Lock-free queue of available buffers
    queue: SegQueue<BytesMut>,

    /// Capacity for newly allocated buffers
    initial_capacity: usize,

    /// Largest capacity accepted back into the pool
    max_capacity: usize,

    /// Metrics
    metrics: BufferPoolMetrics,
}

/// Metrics for buffer pool monitoring
#[derive(Debug, Default)]
pub struct BufferPoolMetrics {
    /// Number of successful pool hits (buffer reused)
    pub hits: AtomicU64,

    /// Number of pool misses (new allocation required)
    pub misses: AtomicU64,

    /// Number of buffers returned to pool
    pub returns: AtomicU64,

    /// Number of oversized buffers dropped instead of pooled
    pub drops: AtomicU64,
}

impl BufferPoolMetrics {
    /// Create new metrics instance
    pub const fn new() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            returns: AtomicU64::new(0),
            drops: AtomicU64::new(0),
        }
    }

    /// Get snapshot of metrics
    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            returns: self.returns.load(Ordering::Relaxed),
            drops: self.drops.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of buffer pool metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub returns: u64,
    pub drops: u64,
}

impl BufferPool {
    /// Create an empty pool
    pub const fn new(initial_capacity: usize, max_capacity: usize) -> Self {
        Self {
            queue: SegQueue::new(),
            initial_capacity,
            max_capacity,
            metrics: BufferPoolMetrics::new(),
        }
    }

    /// The process-wide pool shared by every sink
    #[inline]
    pub fn global() -> &'static BufferPool {
        &GLOBAL
    }

    /// Rent a buffer with its cursor at zero
    ///
    /// Reuses a returned buffer when one is available, otherwise allocates.
    #[inline]
    pub fn get(&self) -> BytesMut {
        match self.queue.pop() {
            Some(buf) => {
                self.metrics.hits.fetch_add(1, Ordering::Relaxed);
                buf
            }
            None => {
                self.metrics.misses.fetch_add(1, Ordering::Relaxed);
                BytesMut::with_capacity(self.initial_capacity)
            }
        }
    }

    /// Return a buffer for reuse
    ///
    /// The buffer is cleared. If its capacity exceeds the pool maximum it is
    /// dropped instead, letting the allocator reclaim it.
    #[inline]
    pub fn put(&self, mut buf: BytesMut) {
        if buf.capacity() > self.max_capacity {
            self.metrics.drops.fetch_add(1, Ordering::Relaxed);
            return;
        }

        buf.clear();
        self.queue.push(buf);
        self.metrics.returns.fetch_add(1, Ordering::Relaxed);
    }

    /// Whether `buf` has outgrown what the pool would accept back
    #[inline]
    pub fn is_oversized(&self, buf: &BytesMut) -> bool {
        buf.capacity() > self.max_capacity
    }

    /// Number of buffers currently waiting for reuse
    #[inline]
    pub fn available(&self) -> usize {
        self.queue.len()
    }

    /// Largest capacity accepted back into the pool
    #[inline]
    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    /// Get reference to metrics
    #[inline]
    pub fn metrics(&self) -> &BufferPoolMetrics {
        &self.metrics
    }
}

/// Run `f` with this thread's scratch buffer, cleared beforehand
///
/// Re-entrant calls on the same thread get a temporary buffer instead of
/// panicking on the already-borrowed scratch. A scratch buffer that grew past
/// [`MAX_CAPACITY`] is released afterwards.
pub fn with_thread_local<R>(f: impl FnOnce(&mut BytesMut) -> R) -> R {
    SCRATCH.with(|cell| match cell.try_borrow_mut() {
        Ok(mut buf) => {
            buf.clear();
            let result = f(&mut buf);
            if buf.capacity() > MAX_CAPACITY {
                *buf = BytesMut::new();
            }
            result
        }
        Err(_) => f(&mut BytesMut::new()),
    })
}

#[cfg(test)]
#[path = "buffer_pool_test.rs"]
mod buffer_pool_test;
