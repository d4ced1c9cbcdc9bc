use crate::config::PoolConfig;
use crate::error::PoolError;
use crate::promise::Promise;
use crate::registry::TaskRegistry;
use crate::supervisor;
use crate::task::{Job, TaskOutcome, TaskRecord};

use std::pin::pin;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tokio::sync::Notify;
use tracing::{debug, error, info, trace};

/// Everything guarded by the pool lock.
pub(crate) struct PoolState<R> {
  pub(crate) running: bool,
  pub(crate) registry: TaskRegistry<R>,
}

/// State shared between the pool handle, the supervisor and the execution
/// threads.
pub(crate) struct Shared<R> {
  pub(crate) name: String,
  pub(crate) poll_interval: Duration,
  pub(crate) state: Mutex<PoolState<R>>,
  /// Wakes the supervisor out of its poll sleep on shutdown.
  pub(crate) supervisor_wakeup: Condvar,
  /// Signalled every time a task reaches a terminal state.
  pub(crate) task_finished: Condvar,
  pub(crate) task_finished_async: Notify,
}

impl<R> Shared<R> {
  pub(crate) fn notify_task_finished(&self) {
    self.task_finished.notify_all();
    self.task_finished_async.notify_waiters();
  }
}

/// A pool that runs every registered task on its own thread.
///
/// Tasks are registered with [`AsyncPool::register`], which returns a
/// [`Promise`] right away. A supervisor thread picks new tasks up every
/// `poll_interval` and starts them; results are retrieved with
/// [`AsyncPool::get_result`], optionally bounded by a timeout.
///
/// All methods take `&self`, so the pool can be shared between caller threads
/// (for example through `Arc` or scoped threads).
pub struct AsyncPool<R: Send + 'static> {
  shared: Arc<Shared<R>>,
  supervisor_join_handle: Option<JoinHandle<()>>,
}

impl<R: Send + 'static> AsyncPool<R> {
  /// Creates a pool whose registry preallocates room for `initial_capacity`
  /// tasks and whose supervisor scans every `poll_interval`.
  ///
  /// # Panics
  /// If the supervisor thread cannot be spawned.
  pub fn init(initial_capacity: usize, poll_interval: Duration) -> Self {
    Self::with_config(
      PoolConfig::new()
        .initial_capacity(initial_capacity)
        .poll_interval(poll_interval),
    )
  }

  /// Creates a pool from a full [`PoolConfig`].
  ///
  /// # Panics
  /// If the supervisor thread cannot be spawned.
  pub fn with_config(mut config: PoolConfig) -> Self {
    let name = config.take_name();
    let shared = Arc::new(Shared {
      name,
      poll_interval: config.poll_interval,
      state: Mutex::new(PoolState {
        running: true,
        registry: TaskRegistry::with_capacity(config.initial_capacity),
      }),
      supervisor_wakeup: Condvar::new(),
      task_finished: Condvar::new(),
      task_finished_async: Notify::new(),
    });

    let worker_shared = shared.clone();
    let supervisor_join_handle = match thread::Builder::new()
      .name(format!("{}-supervisor", shared.name))
      .spawn(move || supervisor::run_supervisor_loop(worker_shared))
    {
      Ok(handle) => handle,
      Err(spawn_error) => {
        error!(pool_name = %shared.name, "Failed to spawn supervisor thread: {}", spawn_error);
        panic!("pool {}: cannot spawn supervisor thread: {}", shared.name, spawn_error);
      }
    };

    info!(
      pool_name = %shared.name,
      initial_capacity = config.initial_capacity,
      poll_interval = ?config.poll_interval,
      "Pool initialized."
    );

    Self {
      shared,
      supervisor_join_handle: Some(supervisor_join_handle),
    }
  }

  pub fn name(&self) -> &str {
    &self.shared.name
  }

  pub fn poll_interval(&self) -> Duration {
    self.shared.poll_interval
  }

  /// Registers `func` to be called with `arg` on its own thread and returns
  /// the promise to retrieve its result with.
  ///
  /// This never waits for execution; it only takes the pool lock briefly.
  /// Promises are handed out in registration order: `0, 1, 2, ...`.
  pub fn register<F, A>(&self, func: F, arg: A) -> Promise
  where
    F: FnOnce(A) -> R + Send + 'static,
    A: Send + 'static,
  {
    self.register_job(Box::new(move || func(arg)))
  }

  /// Same as [`AsyncPool::register`] for a closure that already owns its
  /// inputs.
  pub fn register_fn<F>(&self, func: F) -> Promise
  where
    F: FnOnce() -> R + Send + 'static,
  {
    self.register_job(Box::new(func))
  }

  fn register_job(&self, job: Job<R>) -> Promise {
    let promise = {
      let mut state = self.shared.state.lock();
      Promise(state.registry.append(TaskRecord::new(job)))
    };
    debug!(pool_name = %self.shared.name, %promise, "Registered task.");
    promise
  }

  /// Returns whether the task behind `promise` has finished running.
  ///
  /// # Panics
  /// If `promise` was not issued by this pool.
  pub fn is_finished(&self, promise: Promise) -> bool {
    self.shared.state.lock().registry.at(promise.0).is_finished()
  }

  /// Total number of tasks registered so far.
  pub fn task_count(&self) -> usize {
    self.shared.state.lock().registry.len()
  }

  /// Tasks registered but not dispatched by the supervisor yet.
  pub fn pending_count(&self) -> usize {
    self.shared.state.lock().registry.count_where(TaskRecord::is_pending)
  }

  /// Tasks whose execution thread is currently running.
  pub fn running_count(&self) -> usize {
    self.shared.state.lock().registry.count_where(TaskRecord::is_running)
  }

  pub fn finished_count(&self) -> usize {
    self.shared.state.lock().registry.count_where(TaskRecord::is_finished)
  }

  /// Stops the supervisor, then waits for every registered task to finish
  /// and joins the execution threads that were not reclaimed yet.
  ///
  /// Consuming the pool invalidates all promises it issued.
  pub fn shutdown(mut self) {
    info!(pool_name = %self.shared.name, "Initiating pool shutdown.");
    self.signal_stop();

    if let Some(handle) = self.supervisor_join_handle.take() {
      info!(pool_name = %self.shared.name, "Waiting for supervisor loop to join.");
      if handle.join().is_err() {
        error!(pool_name = %self.shared.name, "Supervisor thread panicked.");
      }
    }

    let task_count = self.task_count();
    debug!(pool_name = %self.shared.name, task_count, "Draining registered tasks.");
    for index in 0..task_count {
      let thread = {
        let mut state = self.shared.state.lock();
        while !state.registry.at(index).is_finished() {
          self.shared.task_finished.wait(&mut state);
        }
        state.registry.at_mut(index).take_thread()
      };
      if let Some(thread) = thread {
        if thread.join().is_err() {
          error!(pool_name = %self.shared.name, promise = index, "Execution thread panicked outside of its task.");
        } else {
          trace!(pool_name = %self.shared.name, promise = index, "Reclaimed execution thread during shutdown.");
        }
      }
    }

    info!(pool_name = %self.shared.name, task_count, "Pool shutdown completed.");
  }

  fn signal_stop(&self) {
    self.shared.state.lock().running = false;
    self.shared.supervisor_wakeup.notify_all();
  }
}

impl<R: Clone + Send + 'static> AsyncPool<R> {
  /// Returns the outcome of the task if it has finished, without waiting.
  ///
  /// # Panics
  /// If `promise` was not issued by this pool.
  pub fn try_result(&self, promise: Promise) -> Option<Result<R, PoolError>> {
    self
      .shared
      .state
      .lock()
      .registry
      .at(promise.0)
      .outcome()
      .map(TaskOutcome::to_result)
  }

  /// Waits for the task behind `promise` and returns a clone of its result.
  ///
  /// With `timeout: None` this blocks until the task finishes. With
  /// `Some(timeout)` it gives up after that long and returns
  /// [`PoolError::NotReady`]; the task keeps running and can be asked for
  /// again. A finished task always yields the same result.
  ///
  /// # Errors
  /// - [`PoolError::NotReady`] if the timeout expired first.
  /// - [`PoolError::TaskPanicked`] if the task function panicked.
  /// - [`PoolError::SpawnFailed`] if no thread could be created for the task.
  ///
  /// # Panics
  /// If `promise` was not issued by this pool.
  pub fn get_result(&self, promise: Promise, timeout: Option<Duration>) -> Result<R, PoolError> {
    let started = Instant::now();
    let deadline = timeout.and_then(|timeout| started.checked_add(timeout));

    let mut state = self.shared.state.lock();
    loop {
      if let Some(outcome) = state.registry.at(promise.0).outcome() {
        return outcome.to_result();
      }
      match deadline {
        None => self.shared.task_finished.wait(&mut state),
        Some(deadline) => {
          if Instant::now() >= deadline {
            trace!(pool_name = %self.shared.name, %promise, "Timed out waiting for task.");
            return Err(PoolError::NotReady {
              promise,
              waited: started.elapsed(),
            });
          }
          self.shared.task_finished.wait_until(&mut state, deadline);
        }
      }
    }
  }

  /// Async counterpart of [`AsyncPool::get_result`], for callers running on a
  /// Tokio runtime. A timeout requires the runtime's time driver.
  ///
  /// # Errors
  /// Same as [`AsyncPool::get_result`].
  ///
  /// # Panics
  /// If `promise` was not issued by this pool.
  pub async fn get_result_async(&self, promise: Promise, timeout: Option<Duration>) -> Result<R, PoolError> {
    let started = Instant::now();
    loop {
      // Register interest before checking, so a completion in between is not missed.
      let mut notified = pin!(self.shared.task_finished_async.notified());
      notified.as_mut().enable();

      if let Some(result) = self.try_result(promise) {
        return result;
      }

      match timeout {
        None => notified.await,
        Some(timeout) => {
          let remaining = timeout.saturating_sub(started.elapsed());
          if remaining.is_zero() || tokio::time::timeout(remaining, notified).await.is_err() {
            return self.try_result(promise).unwrap_or_else(|| {
              trace!(pool_name = %self.shared.name, %promise, "Timed out waiting for task.");
              Err(PoolError::NotReady {
                promise,
                waited: started.elapsed(),
              })
            });
          }
        }
      }
    }
  }
}

impl<R: Send + 'static> Drop for AsyncPool<R> {
  fn drop(&mut self) {
    // `shutdown` already took the handle and joined everything.
    if self.supervisor_join_handle.take().is_some() {
      // Not joining here: tasks may run for a long time. The supervisor
      // still dispatches everything already registered before it exits, and
      // execution threads keep the shared state alive until they finish.
      info!(
        pool_name = %self.shared.name,
        "AsyncPool dropped without shutdown. Signalling supervisor to stop; running tasks are detached."
      );
      self.signal_stop();
    }
  }
}
