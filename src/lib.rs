//! A thread-per-task pool: register a function with its argument, get a
//! [`Promise`] back immediately, and retrieve the result later, either
//! blocking or bounded by a timeout.

mod config;
mod error;
mod pool;
mod promise;
mod registry;
mod supervisor;
mod task;

pub use config::{PoolConfig, DEFAULT_INITIAL_CAPACITY, DEFAULT_POLL_INTERVAL};
pub use error::PoolError;
pub use pool::AsyncPool;
pub use promise::Promise;
