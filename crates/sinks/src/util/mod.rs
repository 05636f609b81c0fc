//! Sink utilities
//!
//! - **buffer_pool**: lock-free pool of render buffers plus a per-thread
//!   scratch buffer for the contended emission path
//! - **rate_limited_logger**: throttled reporting of discarded bytes

pub mod buffer_pool;
pub mod rate_limited_logger;

pub use buffer_pool::{
    BufferPool, BufferPoolMetrics, INITIAL_CAPACITY, MAX_CAPACITY, PoolSnapshot, with_thread_local,
};
pub use rate_limited_logger::{DEFAULT_LOG_INTERVAL, RateLimitedLogger};
