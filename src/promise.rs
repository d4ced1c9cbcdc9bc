use std::fmt;

/// A handle to a task registered with an `AsyncPool`.
///
/// A promise is the position of the task in the pool's registry at
/// registration time. It stays valid for as long as the pool that issued it
/// is alive; using it with another pool, or after `shutdown`, is a bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Promise(pub(crate) usize);

impl Promise {
  /// Returns the registry position this promise refers to.
  pub fn index(&self) -> usize {
    self.0
  }
}

impl From<Promise> for usize {
  fn from(promise: Promise) -> Self {
    promise.0
  }
}

impl fmt::Display for Promise {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}
