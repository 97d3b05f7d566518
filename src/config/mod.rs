//! Configuration models for pools and defaults.

pub mod pool;

pub use pool::{
    PoolSettings, PoolsConfig, DEFAULT_MAX_ADMISSION_WAIT_MILLIS, DEFAULT_MAX_CONCURRENT,
    DEFAULT_MAX_QUEUE, DEFAULT_POOL_ID,
};
