use crate::pool::{PoolState, Shared};
use crate::task::{Job, TaskOutcome, TaskRecord};

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::MutexGuard;
use tracing::{debug, error, info, info_span, trace, warn};

/// Body of the supervisor thread.
///
/// Every `poll_interval` it scans the registry in order, starting the
/// execution thread of each pending task and collecting the threads of
/// finished ones, which are joined with the lock released. After the run
/// flag is cleared it performs one last scan, so every task registered
/// before shutdown has been dispatched when this returns.
pub(crate) fn run_supervisor_loop<R: Send + 'static>(shared: Arc<Shared<R>>) {
  let _span = info_span!("supervisor_loop", pool_name = %shared.name).entered();
  info!(poll_interval = ?shared.poll_interval, "Supervisor loop started.");

  let mut state = shared.state.lock();
  loop {
    let reclaimable = scan(&shared, &mut state);
    let keep_running = state.running;

    if !reclaimable.is_empty() {
      MutexGuard::unlocked(&mut state, || reclaim(reclaimable));
    }

    if !keep_running {
      break;
    }
    // The flag may have been cleared while joining; scan again right away.
    if state.running {
      shared.supervisor_wakeup.wait_for(&mut state, shared.poll_interval);
    }
  }
  let remaining = state.registry.count_where(TaskRecord::is_running);
  drop(state);

  info!(still_running = remaining, "Supervisor loop stopped.");
}

fn scan<R: Send + 'static>(shared: &Arc<Shared<R>>, state: &mut PoolState<R>) -> Vec<(usize, JoinHandle<()>)> {
  let mut dispatched = 0usize;
  let mut reclaimable = Vec::new();

  for (index, record) in state.registry.iter_mut().enumerate() {
    if let Some(job) = record.take_job() {
      dispatch(shared, index, record, job);
      dispatched += 1;
    } else if let Some(thread) = record.take_thread() {
      reclaimable.push((index, thread));
    }
  }

  trace!(dispatched, reclaimable = reclaimable.len(), "Scan complete.");
  reclaimable
}

/// Spawns the execution thread for `record`. Runs under the pool lock, so the
/// new thread cannot store its outcome before the record is marked running.
fn dispatch<R: Send + 'static>(shared: &Arc<Shared<R>>, index: usize, record: &mut TaskRecord<R>, job: Job<R>) {
  let thread_shared = shared.clone();
  let spawn_result = thread::Builder::new()
    .name(format!("{}-task-{}", shared.name, index))
    .spawn(move || run_task(thread_shared, index, job));

  match spawn_result {
    Ok(thread) => {
      record.mark_running(thread);
      debug!(promise = index, "Dispatched task to its execution thread.");
    }
    Err(spawn_error) => {
      error!(promise = index, "Failed to spawn execution thread: {}", spawn_error);
      record.mark_spawn_failed(spawn_error.to_string());
      shared.notify_task_finished();
    }
  }
}

fn reclaim(threads: Vec<(usize, JoinHandle<()>)>) {
  for (index, thread) in threads {
    match thread.join() {
      Ok(()) => debug!(promise = index, "Reclaimed execution thread."),
      Err(_) => error!(promise = index, "Execution thread panicked outside of its task."),
    }
  }
}

/// Body of an execution thread: runs the job, then publishes its outcome.
fn run_task<R: Send + 'static>(shared: Arc<Shared<R>>, index: usize, job: Job<R>) {
  let _span = info_span!("managed_task", pool_name = %shared.name, promise = index).entered();
  trace!("Execution thread started.");

  let outcome = match panic::catch_unwind(AssertUnwindSafe(job)) {
    Ok(value) => TaskOutcome::Completed(value),
    Err(_panic_payload) => {
      error!("Task panicked during execution.");
      TaskOutcome::Panicked
    }
  };

  let stored = shared.state.lock().registry.at_mut(index).finish(outcome);
  if stored {
    trace!("Task finished, outcome stored.");
  } else {
    warn!("Task finished but its record was not running; outcome dropped.");
  }
  shared.notify_task_finished();
}
