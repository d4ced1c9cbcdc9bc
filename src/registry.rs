use crate::task::TaskRecord;

use std::slice;

/// Append-only, insertion-ordered store of task records.
///
/// A record's position never changes once appended, which is what makes
/// promises stable. Records are only released all at once, when the registry
/// is dropped together with the pool.
#[derive(Debug)]
pub(crate) struct TaskRegistry<R> {
  records: Vec<TaskRecord<R>>,
}

impl<R> TaskRegistry<R> {
  pub(crate) fn with_capacity(capacity: usize) -> Self {
    Self {
      records: Vec::with_capacity(capacity),
    }
  }

  /// Appends a record and returns its position.
  pub(crate) fn append(&mut self, record: TaskRecord<R>) -> usize {
    let index = self.records.len();
    self.records.push(record);
    index
  }

  /// # Panics
  /// If `index` was never handed out by `append`. An unknown promise is a
  /// caller bug, not a runtime condition.
  pub(crate) fn at(&self, index: usize) -> &TaskRecord<R> {
    assert!(
      index < self.records.len(),
      "promise #{} is out of range: the pool holds {} tasks",
      index,
      self.records.len()
    );
    &self.records[index]
  }

  /// # Panics
  /// Same as [`TaskRegistry::at`].
  pub(crate) fn at_mut(&mut self, index: usize) -> &mut TaskRecord<R> {
    assert!(
      index < self.records.len(),
      "promise #{} is out of range: the pool holds {} tasks",
      index,
      self.records.len()
    );
    &mut self.records[index]
  }

  pub(crate) fn len(&self) -> usize {
    self.records.len()
  }

  pub(crate) fn iter_mut(&mut self) -> slice::IterMut<'_, TaskRecord<R>> {
    self.records.iter_mut()
  }

  pub(crate) fn count_where(&self, predicate: impl Fn(&TaskRecord<R>) -> bool) -> usize {
    self.records.iter().filter(|record| predicate(record)).count()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn record(value: u8) -> TaskRecord<u8> {
    TaskRecord::new(Box::new(move || value))
  }

  #[test]
  fn append_returns_dense_positions() {
    let mut registry = TaskRegistry::with_capacity(2);
    assert!(registry.records.capacity() >= 2);
    for expected in 0..5 {
      assert_eq!(registry.append(record(expected as u8)), expected);
    }
    assert_eq!(registry.len(), 5);
    assert_eq!(registry.count_where(TaskRecord::is_pending), 5);
  }

  #[test]
  fn zero_capacity_hint_still_grows() {
    let mut registry = TaskRegistry::with_capacity(0);
    registry.append(record(1));
    registry.append(record(2));
    assert_eq!(registry.len(), 2);
    assert!(registry.at(1).is_pending());
  }

  #[test]
  #[should_panic(expected = "out of range")]
  fn lookup_past_the_end_panics() {
    let mut registry = TaskRegistry::with_capacity(1);
    registry.append(record(1));
    let _ = registry.at(1);
  }

  #[test]
  #[should_panic(expected = "out of range")]
  fn mutable_lookup_on_empty_registry_panics() {
    let mut registry: TaskRegistry<u8> = TaskRegistry::with_capacity(4);
    let _ = registry.at_mut(0);
  }
}
