//! Plan execution with bounded concurrency
//!
//! Workers pull planned invocations under a semaphore and push their results
//! to a collector that waits for exactly one result per planned entry. One
//! tool failing, timing out, or being skipped never stops its siblings.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Serialize, Serializer};
use tokio::sync::{mpsc, Semaphore};
use tracing::{debug, warn};

use super::runner::{ProcessRunner, RunOutcome};
use super::{cancellation, CancelSignal};
use crate::plan::{ExecutionPlan, PlanEntry, SkipReason};

/// Per-invocation lifecycle endpoint: pending entries either run to one of
/// the terminal states or are skipped without launching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    Completed,
    Failed,
    TimedOut,
    Skipped(SkipReason),
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::TimedOut => "timed_out",
            ExecutionStatus::Skipped(_) => "skipped",
        }
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            ExecutionStatus::Skipped(reason) => Some(*reason),
            _ => None,
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for ExecutionStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Outcome of one planned tool invocation. Produced exactly once per entry.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub tool: String,
    pub status: ExecutionStatus,
    /// Raw stdout, including partial output from timed out or cancelled runs
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub duration: Duration,
    pub error: Option<String>,
}

impl ExecutionResult {
    fn skipped(tool: &str, reason: SkipReason) -> Self {
        Self {
            tool: tool.to_string(),
            status: ExecutionStatus::Skipped(reason),
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
            duration: Duration::ZERO,
            error: None,
        }
    }
}

/// Runs execution plans over an injected [`ProcessRunner`]
pub struct ProcessSupervisor {
    runner: Arc<dyn ProcessRunner>,
}

impl ProcessSupervisor {
    pub fn new(runner: Arc<dyn ProcessRunner>) -> Self {
        Self { runner }
    }

    /// Execute every entry in the plan, up to `max_parallel` at a time.
    /// Always returns exactly one result per planned entry, in plan order.
    pub async fn execute(&self, plan: &ExecutionPlan, cancel: CancelSignal) -> Vec<ExecutionResult> {
        let expected = plan.entries.len();
        let semaphore = Arc::new(Semaphore::new(plan.max_parallel.max(1)));
        let (tx, mut rx) = mpsc::channel::<ExecutionResult>(expected.max(1));

        // Merge caller cancellation with the plan deadline so a wedged child
        // cannot hold the whole request open.
        let (deadline_handle, worker_signal) = cancellation();
        let plan_timeout = plan.plan_timeout;
        let mut caller = cancel;
        let watchdog = tokio::spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(plan_timeout) => {
                    warn!("plan deadline reached after {:?}", plan_timeout);
                }
                () = caller.cancelled() => {
                    debug!("caller cancelled plan");
                }
            }
            deadline_handle.cancel();
        });

        for entry in plan.entries.iter().cloned() {
            if let Some(reason) = entry.skip {
                let _ = tx.send(ExecutionResult::skipped(&entry.tool, reason)).await;
                continue;
            }

            let tx = tx.clone();
            let semaphore = Arc::clone(&semaphore);
            let runner = Arc::clone(&self.runner);
            let signal = worker_signal.clone();

            tokio::spawn(async move {
                let result = run_entry(&*runner, &entry, semaphore, signal).await;
                let _ = tx.send(result).await;
            });
        }
        drop(tx);

        let mut results = Vec::with_capacity(expected);
        while let Some(result) = rx.recv().await {
            results.push(result);
        }
        watchdog.abort();

        debug_assert_eq!(results.len(), expected);

        // Completion order is scheduling-dependent; report in plan order
        let order: HashMap<&str, usize> = plan
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.tool.as_str(), i))
            .collect();
        results.sort_by_key(|r| order.get(r.tool.as_str()).copied().unwrap_or(usize::MAX));
        results
    }
}

async fn run_entry(
    runner: &dyn ProcessRunner,
    entry: &PlanEntry,
    semaphore: Arc<Semaphore>,
    signal: CancelSignal,
) -> ExecutionResult {
    // Closed semaphore cannot happen; treat it like cancellation if it does
    let _permit = match semaphore.acquire().await {
        Ok(permit) => permit,
        Err(_) => return ExecutionResult::skipped(&entry.tool, SkipReason::Cancelled),
    };

    // No new launches once cancellation is observed
    if signal.is_cancelled() {
        return ExecutionResult::skipped(&entry.tool, SkipReason::Cancelled);
    }

    debug!("launching {}", entry.tool);
    let started = Instant::now();
    let outcome = runner.run(&entry.invocation, signal).await;
    let duration = started.elapsed();

    match outcome {
        RunOutcome::Exited {
            stdout,
            stderr,
            exit_code,
        } => {
            let status = if exit_code == 0 {
                ExecutionStatus::Completed
            } else {
                ExecutionStatus::Failed
            };
            let error = (exit_code != 0).then(|| format!("exit status {exit_code}"));
            ExecutionResult {
                tool: entry.tool.clone(),
                status,
                stdout,
                stderr,
                exit_code: Some(exit_code),
                duration,
                error,
            }
        }
        RunOutcome::TimedOut { stdout, stderr } => ExecutionResult {
            tool: entry.tool.clone(),
            status: ExecutionStatus::TimedOut,
            stdout,
            stderr,
            exit_code: None,
            duration,
            error: Some(format!(
                "timed out after {}s",
                entry.invocation.timeout.as_secs()
            )),
        },
        RunOutcome::Cancelled { stdout, stderr } => ExecutionResult {
            tool: entry.tool.clone(),
            status: ExecutionStatus::Skipped(SkipReason::Cancelled),
            stdout,
            stderr,
            exit_code: None,
            duration,
            error: None,
        },
        RunOutcome::SpawnFailed { error } => ExecutionResult {
            tool: entry.tool.clone(),
            status: ExecutionStatus::Failed,
            stdout: String::new(),
            stderr: String::new(),
            exit_code: None,
            duration,
            error: Some(error),
        },
    }
}
