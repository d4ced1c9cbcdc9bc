use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::Duration;

lazy_static::lazy_static! {
  static ref NEXT_POOL_ID_COUNTER: AtomicU64 = AtomicU64::new(0);
}

pub const DEFAULT_INITIAL_CAPACITY: usize = 16;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Construction parameters for an `AsyncPool`.
#[derive(Debug, Clone)]
pub struct PoolConfig {
  /// Used in log fields and as the prefix of every thread the pool spawns.
  /// Defaults to `pool-<n>` with a process-wide counter.
  pub name: Option<String>,
  /// Capacity hint for the task registry. Guess how many tasks will be
  /// registered to avoid reallocations.
  pub initial_capacity: usize,
  /// Delay between two supervisor scans. A newly registered task waits at
  /// most this long before its execution thread is started.
  pub poll_interval: Duration,
}

impl Default for PoolConfig {
  fn default() -> Self {
    Self {
      name: None,
      initial_capacity: DEFAULT_INITIAL_CAPACITY,
      poll_interval: DEFAULT_POLL_INTERVAL,
    }
  }
}

impl PoolConfig {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn name(mut self, name: impl Into<String>) -> Self {
    self.name = Some(name.into());
    self
  }

  pub fn initial_capacity(mut self, capacity: usize) -> Self {
    self.initial_capacity = capacity;
    self
  }

  pub fn poll_interval(mut self, interval: Duration) -> Self {
    self.poll_interval = interval;
    self
  }

  /// Consumes the configured name, or hands out the next `pool-<n>` one.
  pub(crate) fn take_name(&mut self) -> String {
    self.name.take().unwrap_or_else(|| {
      let id = NEXT_POOL_ID_COUNTER.fetch_add(1, AtomicOrdering::Relaxed);
      format!("pool-{}", id)
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_names_are_distinct() {
    let a = PoolConfig::new().take_name();
    let b = PoolConfig::new().take_name();
    assert_ne!(a, b);
    assert!(a.starts_with("pool-"));
  }

  #[test]
  fn explicit_name_is_kept() {
    let mut config = PoolConfig::new().name("workers").poll_interval(Duration::from_millis(1));
    assert_eq!(config.take_name(), "workers");
    assert_eq!(config.poll_interval, Duration::from_millis(1));
    assert_eq!(config.initial_capacity, DEFAULT_INITIAL_CAPACITY);
  }
}
