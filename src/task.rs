use crate::error::PoolError;

use std::fmt;
use std::mem;
use std::thread::JoinHandle;

/// The unit of work stored for a registered task: the function with its
/// argument already bound.
pub(crate) type Job<R> = Box<dyn FnOnce() -> R + Send + 'static>;

/// What a task produced once it stopped running.
#[derive(Debug)]
pub(crate) enum TaskOutcome<R> {
  Completed(R),
  Panicked,
  SpawnFailed(String),
}

impl<R: Clone> TaskOutcome<R> {
  pub(crate) fn to_result(&self) -> Result<R, PoolError> {
    match self {
      TaskOutcome::Completed(value) => Ok(value.clone()),
      TaskOutcome::Panicked => Err(PoolError::TaskPanicked),
      TaskOutcome::SpawnFailed(reason) => Err(PoolError::SpawnFailed(reason.clone())),
    }
  }
}

/// Lifecycle of one task record.
///
/// `Pending -> Spawning -> Running -> Finished -> Reclaimed`. `Spawning` only
/// exists inside the supervisor's critical section, between taking the job
/// and storing the execution thread handle, so no other lock holder ever
/// observes it. A spawn failure goes straight from `Spawning` to `Reclaimed`.
pub(crate) enum TaskState<R> {
  Pending(Job<R>),
  Spawning,
  Running(JoinHandle<()>),
  /// Finished, execution thread not joined yet.
  Finished { outcome: TaskOutcome<R>, thread: JoinHandle<()> },
  Reclaimed { outcome: TaskOutcome<R> },
}

impl<R> fmt::Debug for TaskState<R> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      TaskState::Pending(_) => "Pending",
      TaskState::Spawning => "Spawning",
      TaskState::Running(_) => "Running",
      TaskState::Finished { .. } => "Finished",
      TaskState::Reclaimed { .. } => "Reclaimed",
    };
    f.write_str(name)
  }
}

/// Internal representation of a task held by the registry.
///
/// Every method expects the caller to hold the pool lock.
#[derive(Debug)]
pub(crate) struct TaskRecord<R> {
  state: TaskState<R>,
}

impl<R> TaskRecord<R> {
  pub(crate) fn new(job: Job<R>) -> Self {
    Self {
      state: TaskState::Pending(job),
    }
  }

  pub(crate) fn is_pending(&self) -> bool {
    matches!(self.state, TaskState::Pending(_) | TaskState::Spawning)
  }

  pub(crate) fn is_running(&self) -> bool {
    matches!(self.state, TaskState::Running(_))
  }

  pub(crate) fn is_finished(&self) -> bool {
    matches!(self.state, TaskState::Finished { .. } | TaskState::Reclaimed { .. })
  }

  pub(crate) fn outcome(&self) -> Option<&TaskOutcome<R>> {
    match &self.state {
      TaskState::Finished { outcome, .. } | TaskState::Reclaimed { outcome } => Some(outcome),
      _ => None,
    }
  }

  /// Takes the job out of a `Pending` record, leaving it `Spawning`.
  /// Returns `None` for any other state.
  pub(crate) fn take_job(&mut self) -> Option<Job<R>> {
    if !matches!(self.state, TaskState::Pending(_)) {
      return None;
    }
    match mem::replace(&mut self.state, TaskState::Spawning) {
      TaskState::Pending(job) => Some(job),
      _ => None,
    }
  }

  /// Publishes the execution thread of a `Spawning` record.
  pub(crate) fn mark_running(&mut self, thread: JoinHandle<()>) {
    debug_assert!(matches!(self.state, TaskState::Spawning), "mark_running on {:?}", self.state);
    self.state = TaskState::Running(thread);
  }

  /// Records that the execution thread could not be created. There is no
  /// thread to join, so the record is reclaimed right away.
  pub(crate) fn mark_spawn_failed(&mut self, reason: String) {
    debug_assert!(matches!(self.state, TaskState::Spawning), "mark_spawn_failed on {:?}", self.state);
    self.state = TaskState::Reclaimed {
      outcome: TaskOutcome::SpawnFailed(reason),
    };
  }

  /// Stores the outcome of a `Running` record. Returns `false`, leaving the
  /// record untouched, if the record was not running.
  pub(crate) fn finish(&mut self, outcome: TaskOutcome<R>) -> bool {
    if !self.is_running() {
      return false;
    }
    match mem::replace(&mut self.state, TaskState::Spawning) {
      TaskState::Running(thread) => {
        self.state = TaskState::Finished { outcome, thread };
        true
      }
      other => {
        self.state = other;
        false
      }
    }
  }

  /// Moves a `Finished` record to `Reclaimed` and hands back its thread
  /// handle. A handle is returned at most once per record, so each execution
  /// thread is joined exactly once.
  pub(crate) fn take_thread(&mut self) -> Option<JoinHandle<()>> {
    if !matches!(self.state, TaskState::Finished { .. }) {
      return None;
    }
    match mem::replace(&mut self.state, TaskState::Spawning) {
      TaskState::Finished { outcome, thread } => {
        self.state = TaskState::Reclaimed { outcome };
        Some(thread)
      }
      other => {
        self.state = other;
        None
      }
    }
  }
}
