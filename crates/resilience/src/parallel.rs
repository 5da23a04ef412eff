// crates/resilience/src/parallel.rs
//! Bounded parallel execution of independent sub-queries

use crate::error::{ResilienceError, ResilienceResult};
use std::error::Error;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::{Builder, Runtime};

/// Boxed error returned by a failing sub-query
pub type TaskError = Box<dyn Error + Send + Sync>;

type Job<T> = Box<dyn FnOnce(&CancelSignal) -> Result<T, TaskError> + Send>;

/// Cooperative cancellation flag handed to every sub-query
///
/// Set when the executor abandons the task. Work that polls it can stop
/// early; work that ignores it keeps running on its worker until done.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    cancelled: Arc<AtomicBool>,
}

impl CancelSignal {
    /// Creates an unset signal
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once the task has been abandoned
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

/// An independent unit of work with its own timeout
pub struct ParallelTask<T> {
    id: String,
    timeout: Option<Duration>,
    job: Job<T>,
}

impl<T> ParallelTask<T> {
    /// Creates a task that ignores cancellation
    pub fn new<F, E>(id: impl Into<String>, job: F) -> Self
    where
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: Into<TaskError>,
    {
        Self::cancellable(id, move |_| job())
    }

    /// Creates a task that receives the cancellation signal
    pub fn cancellable<F, E>(id: impl Into<String>, job: F) -> Self
    where
        F: FnOnce(&CancelSignal) -> Result<T, E> + Send + 'static,
        E: Into<TaskError>,
    {
        Self {
            id: id.into(),
            timeout: None,
            job: Box::new(move |signal| job(signal).map_err(Into::into)),
        }
    }

    /// Overrides the executor's default timeout for this task
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the task id
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl<T> fmt::Debug for ParallelTask<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelTask")
            .field("id", &self.id)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Terminal state of a task
#[derive(Debug)]
pub enum TaskOutcome<T> {
    /// Finished within its timeout
    Completed(T),
    /// Returned an error or panicked within its timeout
    Failed(TaskError),
    /// Exceeded its timeout; the wait was dropped
    Abandoned { timeout: Duration },
}

/// What happened to one task
#[derive(Debug)]
pub struct TaskReport<T> {
    /// Task id
    pub id: String,
    /// Terminal state
    pub outcome: TaskOutcome<T>,
    /// Time from submission until the outcome was known
    pub elapsed: Duration,
}

impl<T> TaskReport<T> {
    /// Converts an abandoned outcome into the matching error, if any
    pub fn timeout_error(&self) -> Option<ResilienceError> {
        match self.outcome {
            TaskOutcome::Abandoned { timeout } => Some(ResilienceError::TaskTimeout {
                task: self.id.clone(),
                timeout,
            }),
            _ => None,
        }
    }
}

/// Aggregate of every task submitted to one [`ParallelExecutor::run`]
///
/// Reports are in submission order.
#[derive(Debug)]
pub struct ParallelResults<T> {
    reports: Vec<TaskReport<T>>,
}

impl<T> ParallelResults<T> {
    /// Returns every report
    pub fn reports(&self) -> &[TaskReport<T>] {
        &self.reports
    }

    /// Iterates over completed results as `(id, value)`
    pub fn completed(&self) -> impl Iterator<Item = (&str, &T)> {
        self.reports.iter().filter_map(|r| match &r.outcome {
            TaskOutcome::Completed(value) => Some((r.id.as_str(), value)),
            _ => None,
        })
    }

    /// Ids of tasks that were abandoned on timeout
    pub fn abandoned(&self) -> Vec<&str> {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, TaskOutcome::Abandoned { .. }))
            .map(|r| r.id.as_str())
            .collect()
    }

    /// Ids and errors of tasks that failed
    pub fn failed(&self) -> Vec<(&str, &TaskError)> {
        self.reports
            .iter()
            .filter_map(|r| match &r.outcome {
                TaskOutcome::Failed(e) => Some((r.id.as_str(), e)),
                _ => None,
            })
            .collect()
    }

    /// Consumes the aggregate, keeping only completed results
    pub fn into_completed(self) -> Vec<(String, T)> {
        self.reports
            .into_iter()
            .filter_map(|r| match r.outcome {
                TaskOutcome::Completed(value) => Some((r.id, value)),
                _ => None,
            })
            .collect()
    }
}

/// Runs small sets of independent tasks on a bounded worker pool
///
/// Each task gets its own timeout, measured from submission. Tasks that miss
/// it are abandoned: they contribute nothing to the aggregate, their
/// [`CancelSignal`] is set, and the call returns without waiting for them.
/// An abandoned task still queued for a worker is dropped without running.
/// A `run` therefore takes roughly the longest timeout among its tasks, not
/// the sum of their durations.
///
/// `run` blocks the calling thread and must not be called from inside an
/// async runtime.
pub struct ParallelExecutor {
    runtime: Option<Runtime>,
    workers: usize,
    default_timeout: Duration,
}

impl ParallelExecutor {
    /// Starts a pool of `workers` threads
    pub fn new(workers: usize, default_timeout: Duration) -> ResilienceResult<Self> {
        let workers = workers.max(1);
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(workers)
            .thread_name("rampart-parallel")
            .enable_time()
            .build()
            .map_err(ResilienceError::WorkerPool)?;

        Ok(Self {
            runtime: Some(runtime),
            workers,
            default_timeout,
        })
    }

    /// Returns the pool size
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Returns the timeout used by tasks without their own
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Runs every task concurrently and collects what finishes in time
    pub fn run<T>(&self, tasks: Vec<ParallelTask<T>>) -> ResilienceResult<ParallelResults<T>>
    where
        T: Send + 'static,
    {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(ResilienceError::BlockingInAsyncContext);
        }
        let runtime = self
            .runtime
            .as_ref()
            .ok_or_else(|| ResilienceError::Custom("Worker pool has shut down".to_string()))?;

        let default_timeout = self.default_timeout;
        let reports = runtime.block_on(async move {
            let pending = tasks.into_iter().map(|task| {
                let ParallelTask { id, timeout, job } = task;
                let timeout = timeout.unwrap_or(default_timeout);
                let signal = CancelSignal::new();
                let worker_signal = signal.clone();
                let started = Instant::now();
                let handle = tokio::task::spawn_blocking(move || {
                    // Abandoned while queued for a worker: never start it.
                    if worker_signal.is_cancelled() {
                        return Err(TaskError::from("abandoned before start"));
                    }
                    job(&worker_signal)
                });

                async move {
                    let outcome = match tokio::time::timeout(timeout, handle).await {
                        Ok(Ok(Ok(value))) => TaskOutcome::Completed(value),
                        Ok(Ok(Err(e))) => {
                            log::warn!("Parallel task '{}' failed: {}", id, e);
                            TaskOutcome::Failed(e)
                        }
                        Ok(Err(join_error)) => {
                            log::error!("Parallel task '{}' panicked: {}", id, join_error);
                            TaskOutcome::Failed(format!("task panicked: {}", join_error).into())
                        }
                        Err(_) => {
                            signal.cancel();
                            log::warn!(
                                "Parallel task '{}' exceeded {:?} and was abandoned",
                                id,
                                timeout
                            );
                            TaskOutcome::Abandoned { timeout }
                        }
                    };

                    TaskReport {
                        id,
                        outcome,
                        elapsed: started.elapsed(),
                    }
                }
            });

            futures::future::join_all(pending).await
        });

        Ok(ParallelResults { reports })
    }
}

impl fmt::Debug for ParallelExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParallelExecutor")
            .field("workers", &self.workers)
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}

impl Drop for ParallelExecutor {
    fn drop(&mut self) {
        // Abandoned tasks may still be running; do not join them.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn sleeper(id: &str, millis: u64) -> ParallelTask<String> {
        let id_owned = id.to_string();
        ParallelTask::new(id, move || {
            std::thread::sleep(Duration::from_millis(millis));
            Ok::<_, TaskError>(format!("{}-done", id_owned))
        })
    }

    #[test]
    fn test_all_tasks_complete() {
        let executor = ParallelExecutor::new(3, Duration::from_secs(2)).expect("pool");
        let results = executor
            .run(vec![sleeper("a", 10), sleeper("b", 20), sleeper("c", 5)])
            .expect("run");

        let ids: Vec<&str> = results.completed().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(results.abandoned().is_empty());
    }

    #[test]
    fn test_slow_task_is_abandoned_without_blocking() {
        let executor = ParallelExecutor::new(3, Duration::from_millis(500)).expect("pool");
        let started = Instant::now();

        let results = executor
            .run(vec![sleeper("fast", 100), sleeper("slow", 3_000), sleeper("medium", 150)])
            .expect("run");

        let elapsed = started.elapsed();
        assert!(elapsed < Duration::from_millis(1_500), "took {:?}", elapsed);

        let completed = results.into_completed();
        let ids: Vec<&str> = completed.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["fast", "medium"]);
    }

    #[test]
    fn test_failed_task_is_reported() {
        let executor = ParallelExecutor::new(2, Duration::from_secs(1)).expect("pool");
        let results = executor
            .run(vec![
                sleeper("ok", 1),
                ParallelTask::new("broken", || Err::<String, _>("upstream said no")),
            ])
            .expect("run");

        assert_eq!(results.completed().count(), 1);
        let failed = results.failed();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, "broken");
        assert_eq!(failed[0].1.to_string(), "upstream said no");
    }

    #[test]
    fn test_panicking_task_is_reported_as_failed() {
        let executor = ParallelExecutor::new(2, Duration::from_secs(1)).expect("pool");
        let results = executor
            .run(vec![ParallelTask::new("boom", || -> Result<u8, TaskError> {
                panic!("boom")
            })])
            .expect("run");

        assert_eq!(results.failed().len(), 1);
    }

    #[test]
    fn test_per_task_timeout_override() {
        let executor = ParallelExecutor::new(2, Duration::from_secs(5)).expect("pool");
        let results = executor
            .run(vec![
                sleeper("patient", 50),
                sleeper("impatient", 1_000).with_timeout(Duration::from_millis(100)),
            ])
            .expect("run");

        assert_eq!(results.abandoned(), vec!["impatient"]);
        let report = &results.reports()[1];
        assert!(matches!(
            report.timeout_error(),
            Some(ResilienceError::TaskTimeout { .. })
        ));
    }

    #[test]
    fn test_abandoned_task_sees_cancellation() {
        let executor = ParallelExecutor::new(1, Duration::from_millis(50)).expect("pool");
        let observed = Arc::new(AtomicBool::new(false));
        let observed_clone = Arc::clone(&observed);

        let task = ParallelTask::cancellable("poller", move |signal: &CancelSignal| {
            let deadline = Instant::now() + Duration::from_secs(2);
            while Instant::now() < deadline {
                if signal.is_cancelled() {
                    observed_clone.store(true, Ordering::SeqCst);
                    return Err::<(), TaskError>("cancelled".into());
                }
                std::thread::sleep(Duration::from_millis(5));
            }
            Ok(())
        });

        let results = executor.run(vec![task]).expect("run");
        assert_eq!(results.abandoned(), vec!["poller"]);

        std::thread::sleep(Duration::from_millis(200));
        assert!(observed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_task_abandoned_while_queued_never_runs() {
        let executor = ParallelExecutor::new(1, Duration::from_millis(100)).expect("pool");
        let runs = Arc::new(AtomicUsize::new(0));
        let runs_clone = Arc::clone(&runs);

        let queued = ParallelTask::new("queued", move || {
            runs_clone.fetch_add(1, Ordering::SeqCst);
            Ok::<_, TaskError>("queued-done".to_string())
        });

        let results = executor.run(vec![sleeper("slow", 300), queued]).expect("run");
        assert_eq!(results.abandoned(), vec!["slow", "queued"]);

        std::thread::sleep(Duration::from_millis(500));
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_empty_task_list() {
        let executor = ParallelExecutor::new(2, Duration::from_secs(1)).expect("pool");
        let results = executor.run(Vec::<ParallelTask<u8>>::new()).expect("run");
        assert!(results.reports().is_empty());
    }

    #[test]
    fn test_pool_is_bounded() {
        let executor = ParallelExecutor::new(2, Duration::from_secs(2)).expect("pool");
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks = (0..6)
            .map(|i| {
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                ParallelTask::new(format!("t{}", i), move || {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(30));
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, TaskError>(i)
                })
            })
            .collect();

        let results = executor.run(tasks).expect("run");
        assert_eq!(results.completed().count(), 6);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
