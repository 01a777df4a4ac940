//! Worker-pool execution (spec §5), grounded in
//! `pyqa/execution/action_executor.py::_execute_in_parallel` /
//! `_execute_serial`, reworked onto `std::thread::scope` in place of
//! `ThreadPoolExecutor` per the synchronous concurrency model this crate is
//! built on (no tokio, no async runtime — spec §5).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use qa_core::ToolOutcome;

/// One scheduled unit of work: its position in the original schedule (so
/// output can be restored to submission order regardless of completion
/// order) and a thunk that produces its outcome when run.
pub struct Job<'a> {
    pub order: usize,
    pub run: Box<dyn FnOnce() -> ToolOutcome + Send + 'a>,
}

impl<'a> Job<'a> {
    pub fn new(order: usize, run: impl FnOnce() -> ToolOutcome + Send + 'a) -> Self {
        Self {
            order,
            run: Box::new(run),
        }
    }
}

/// Run `jobs` to completion using up to `worker_count` concurrent OS
/// threads (spec §5's `jobs` knob), honoring bail: once `should_bail` reports
/// true for a completed outcome, no further *unstarted* jobs are pulled from
/// the queue — jobs already in flight are allowed to finish and still
/// report, matching `ThreadPoolExecutor`'s `as_completed` draining of
/// already-submitted futures rather than a hard cancel.
///
/// Results are returned sorted by `order`, not completion order.
pub fn run_scheduled<'a>(
    worker_count: usize,
    bail: bool,
    jobs: Vec<Job<'a>>,
    should_bail: impl Fn(&ToolOutcome) -> bool + Send + Sync + 'a,
) -> Vec<ToolOutcome> {
    if jobs.is_empty() {
        return Vec::new();
    }

    let worker_count = worker_count.max(1).min(jobs.len());
    if worker_count == 1 {
        return run_serial(jobs, bail, &should_bail);
    }
    run_parallel(worker_count, bail, jobs, &should_bail)
}

fn run_serial<'a>(
    jobs: Vec<Job<'a>>,
    bail: bool,
    should_bail: &(impl Fn(&ToolOutcome) -> bool + Send + Sync),
) -> Vec<ToolOutcome> {
    let mut results = Vec::with_capacity(jobs.len());
    for job in jobs {
        let outcome = (job.run)();
        let bailed = bail && should_bail(&outcome);
        results.push(outcome);
        if bailed {
            tracing::warn!("bail triggered; skipping remaining scheduled actions");
            break;
        }
    }
    results.sort_by_key(|o: &ToolOutcome| o.order);
    results
}

fn run_parallel<'a>(
    worker_count: usize,
    bail: bool,
    jobs: Vec<Job<'a>>,
    should_bail: &(impl Fn(&ToolOutcome) -> bool + Send + Sync),
) -> Vec<ToolOutcome> {
    let queue: Mutex<VecDeque<Job<'a>>> = Mutex::new(jobs.into_iter().collect());
    let bail_triggered = AtomicBool::new(false);
    let results: Mutex<Vec<ToolOutcome>> = Mutex::new(Vec::new());

    std::thread::scope(|scope| {
        for _ in 0..worker_count {
            scope.spawn(|| loop {
                if bail && bail_triggered.load(Ordering::Acquire) {
                    return;
                }
                let Some(job) = queue.lock().unwrap().pop_front() else {
                    return;
                };
                let outcome = (job.run)();
                if bail && should_bail(&outcome) {
                    bail_triggered.store(true, Ordering::Release);
                    tracing::warn!("bail triggered; remaining unstarted actions will be skipped");
                }
                results.lock().unwrap().push(outcome);
            });
        }
    });

    let mut results = results.into_inner().unwrap();
    results.sort_by_key(|o: &ToolOutcome| o.order);
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use qa_core::ExitCategory;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn outcome(order: usize, returncode: i32) -> ToolOutcome {
        ToolOutcome {
            tool: "ruff".to_string(),
            action: "lint".to_string(),
            order,
            returncode,
            stdout: String::new(),
            stderr: String::new(),
            duration: Duration::from_secs(0),
            diagnostics: vec![],
            cached: false,
            timed_out: false,
            category: if returncode == 0 { ExitCategory::Success } else { ExitCategory::ToolFailure },
        }
    }

    #[test]
    fn test_run_scheduled_empty_returns_empty() {
        let result = run_scheduled(4, false, Vec::new(), |_| false);
        assert!(result.is_empty());
    }

    #[test]
    fn test_run_scheduled_serial_preserves_order() {
        let jobs = vec![
            Job::new(2, || outcome(2, 0)),
            Job::new(0, || outcome(0, 0)),
            Job::new(1, || outcome(1, 0)),
        ];
        let result = run_scheduled(1, false, jobs, |_| false);
        assert_eq!(result.iter().map(|o| o.order).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_run_scheduled_parallel_restores_order_despite_varied_completion_time() {
        let jobs = vec![
            Job::new(0, || {
                std::thread::sleep(Duration::from_millis(30));
                outcome(0, 0)
            }),
            Job::new(1, || outcome(1, 0)),
            Job::new(2, || {
                std::thread::sleep(Duration::from_millis(10));
                outcome(2, 0)
            }),
        ];
        let result = run_scheduled(4, false, jobs, |_| false);
        assert_eq!(result.iter().map(|o| o.order).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_run_scheduled_runs_all_jobs_exactly_once() {
        let counter = AtomicUsize::new(0);
        let jobs: Vec<Job> = (0..20)
            .map(|i| {
                let counter_ref = &counter;
                Job::new(i, move || {
                    counter_ref.fetch_add(1, Ordering::SeqCst);
                    outcome(i, 0)
                })
            })
            .collect();
        let result = run_scheduled(4, false, jobs, |_| false);
        assert_eq!(result.len(), 20);
        assert_eq!(counter.load(Ordering::SeqCst), 20);
    }

    #[test]
    fn test_run_scheduled_serial_bail_stops_remaining_jobs() {
        let ran = AtomicUsize::new(0);
        let jobs = vec![
            Job::new(0, || {
                outcome(0, 1)
            }),
            Job::new(1, || {
                outcome(1, 0)
            }),
        ];
        let ran_ref = &ran;
        let result = run_scheduled(1, true, jobs, move |o| {
            ran_ref.fetch_add(1, Ordering::SeqCst);
            o.returncode != 0
        });
        assert_eq!(result.len(), 1);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_run_scheduled_no_bail_runs_all_despite_failures() {
        let jobs = vec![Job::new(0, || outcome(0, 1)), Job::new(1, || outcome(1, 1))];
        let result = run_scheduled(1, false, jobs, |o| o.returncode != 0);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_worker_count_clamped_to_job_count() {
        let jobs = vec![Job::new(0, || outcome(0, 0))];
        let result = run_scheduled(16, false, jobs, |_| false);
        assert_eq!(result.len(), 1);
    }
}
