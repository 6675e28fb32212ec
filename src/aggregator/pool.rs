//! Bounded worker pool for independent tasks.
//!
//! Jobs go into a shared lock-free queue and a fixed number of scoped
//! worker threads drain it. A task that panics is recorded as a failure
//! for its job; it never takes down the worker or the other jobs. With
//! [`FailurePolicy::CancelOnFirst`] the remaining queued jobs are skipped
//! once any task has failed.

use crate::utils::error::{BatchFailure, GroupError};
use crossbeam::queue::SegQueue;
use log::{debug, warn};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};

/// What to do with queued work after a task fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum FailurePolicy {
    /// Stop starting new tasks after the first failure
    #[default]
    #[value(name = "cancel")]
    CancelOnFirst,

    /// Attempt every task, then report all failures together
    #[value(name = "drain")]
    Drain,
}

enum TaskOutcome<R> {
    Done(R),
    Failed(String),
    Cancelled,
}

/// Number of workers to use when none is configured
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Run `task` over every job on at most `workers` threads
///
/// **Public** - shared by batch grouping and per-trace assembly
///
/// # Returns
/// One result per job, in job order
///
/// # Errors
/// * `GroupError::TasksFailed` - one or more tasks panicked; carries every
///   failure and the number of jobs cancelled
pub fn run_tasks<T, R, F>(
    jobs: Vec<T>,
    workers: usize,
    policy: FailurePolicy,
    task: F,
) -> Result<Vec<R>, GroupError>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync,
{
    let job_count = jobs.len();
    if job_count == 0 {
        return Ok(Vec::new());
    }

    let workers = workers.clamp(1, job_count);
    debug!("Running {} tasks on {} workers ({:?})", job_count, workers, policy);

    let queue = SegQueue::new();
    for job in jobs.into_iter().enumerate() {
        queue.push(job);
    }
    let cancel = AtomicBool::new(false);
    let (queue, cancel, task) = (&queue, &cancel, &task);

    let per_worker = crossbeam::scope(|s| {
        let handles: Vec<_> = (0..workers)
            .map(|_| s.spawn(move |_| drain_queue(queue, cancel, policy, task)))
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_default())
            .collect::<Vec<_>>()
    })
    .unwrap_or_default();

    let mut slots: Vec<Option<R>> = (0..job_count).map(|_| None).collect();
    let mut seen = vec![false; job_count];
    let mut failures = Vec::new();
    let mut cancelled = 0;

    for (index, outcome) in per_worker.into_iter().flatten() {
        seen[index] = true;
        match outcome {
            TaskOutcome::Done(r) => slots[index] = Some(r),
            TaskOutcome::Failed(reason) => failures.push(BatchFailure { batch: index, reason }),
            TaskOutcome::Cancelled => cancelled += 1,
        }
    }

    // A job nobody reported on went down with its worker thread
    for (index, _) in seen.iter().enumerate().filter(|(_, s)| !**s) {
        failures.push(BatchFailure {
            batch: index,
            reason: "worker thread exited".to_string(),
        });
    }

    if !failures.is_empty() {
        failures.sort_by_key(|f| f.batch);
        warn!("{} of {} tasks failed, {} cancelled", failures.len(), job_count, cancelled);
        return Err(GroupError::TasksFailed { failures, cancelled });
    }

    Ok(slots.into_iter().flatten().collect())
}

/// Worker loop: pop jobs until the queue is empty
///
/// **Private** - runs on each pool thread
fn drain_queue<T, R, F>(
    queue: &SegQueue<(usize, T)>,
    cancel: &AtomicBool,
    policy: FailurePolicy,
    task: &F,
) -> Vec<(usize, TaskOutcome<R>)>
where
    F: Fn(T) -> R,
{
    let mut outcomes = Vec::new();

    while let Some((index, job)) = queue.pop() {
        if cancel.load(Ordering::Acquire) {
            outcomes.push((index, TaskOutcome::Cancelled));
            continue;
        }

        match panic::catch_unwind(AssertUnwindSafe(|| task(job))) {
            Ok(r) => outcomes.push((index, TaskOutcome::Done(r))),
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                warn!("Task {} failed: {}", index, reason);
                if policy == FailurePolicy::CancelOnFirst {
                    cancel.store(true, Ordering::Release);
                }
                outcomes.push((index, TaskOutcome::Failed(reason)));
            }
        }
    }

    outcomes
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "task panicked".to_string()
    }
}
