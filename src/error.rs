use crate::promise::Promise;

use std::time::Duration;

use thiserror::Error;

/// Errors that can be returned when retrieving a task's result from the pool.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
  /// The timeout expired before the task finished. This is a normal outcome,
  /// the task keeps running and its result can be requested again later.
  #[error("Task {promise} did not finish within {waited:?}")]
  NotReady { promise: Promise, waited: Duration },

  #[error("Registered task function panicked")]
  TaskPanicked,

  #[error("Failed to spawn the execution thread for the task: {0}")]
  SpawnFailed(String),
}

impl PoolError {
  /// Returns `true` for the timeout outcome of `get_result`.
  pub fn is_not_ready(&self) -> bool {
    matches!(self, PoolError::NotReady { .. })
  }
}
