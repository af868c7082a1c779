// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for batch orchestration events.
//!
//! This module contains message types for logging events related to:
//! * Batch start and completion
//! * Per run spec lifecycle
//! * Probe task outcomes

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// Batch started with the configured stages and concurrency.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use sglx_pipeline::observability::messages::engine::BatchStarted;
///
/// let msg = BatchStarted {
///     run_spec_count: 3,
///     stage_count: 8,
///     max_concurrency: 1,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct BatchStarted {
    pub run_spec_count: usize,
    pub stage_count: usize,
    pub max_concurrency: usize,
}

impl Display for BatchStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting batch: {} run specs, {} stages selected, max_concurrency={}",
            self.run_spec_count, self.stage_count, self.max_concurrency
        )
    }
}

impl StructuredLog for BatchStarted {
    fn log(&self) {
        tracing::info!(
            run_spec_count = self.run_spec_count,
            stage_count = self.stage_count,
            max_concurrency = self.max_concurrency,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "batch",
            span_name = name,
            run_spec_count = self.run_spec_count,
            stage_count = self.stage_count,
            max_concurrency = self.max_concurrency,
        )
    }
}

/// Batch finished; every run spec has been attempted.
///
/// # Log Level
/// `info!` - Important operational event
pub struct BatchCompleted {
    pub run_count: usize,
    pub failed_runs: usize,
    pub incomplete_tasks: usize,
    pub duration: Duration,
}

impl Display for BatchCompleted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Batch completed: {} runs ({} failed), {} probe tasks incomplete, in {:?}",
            self.run_count, self.failed_runs, self.incomplete_tasks, self.duration
        )
    }
}

impl StructuredLog for BatchCompleted {
    fn log(&self) {
        tracing::info!(
            run_count = self.run_count,
            failed_runs = self.failed_runs,
            incomplete_tasks = self.incomplete_tasks,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "batch_completed",
            span_name = name,
            run_count = self.run_count,
            failed_runs = self.failed_runs,
            duration = ?self.duration,
        )
    }
}

/// Processing of one run spec has begun.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use sglx_pipeline::observability::messages::engine::RunStarted;
///
/// let msg = RunStarted { run_name: "sess1", index: 0 };
/// assert!(msg.to_string().contains("sess1"));
/// ```
pub struct RunStarted<'a> {
    pub run_name: &'a str,
    pub index: usize,
}

impl Display for RunStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Processing run spec #{} '{}'", self.index, self.run_name)
    }
}

impl StructuredLog for RunStarted<'_> {
    fn log(&self) {
        tracing::info!(run_name = self.run_name, index = self.index, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "run",
            span_name = name,
            run_name = self.run_name,
            index = self.index,
        )
    }
}

/// A run spec could not be processed at all.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct RunFailed<'a> {
    pub run_name: &'a str,
    pub kind: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for RunFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Run spec '{}' failed: {}", self.run_name, self.error)
    }
}

impl StructuredLog for RunFailed<'_> {
    fn log(&self) {
        tracing::error!(
            run_name = self.run_name,
            kind = self.kind,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "run_failed",
            span_name = name,
            run_name = self.run_name,
            kind = self.kind,
        )
    }
}

/// A probe task ran through its selected stages, or stopped at one.
///
/// # Log Level
/// `info!` when the task completed, `warn!` otherwise
///
/// # Example
/// ```
/// use sglx_pipeline::observability::messages::engine::TaskFinished;
/// use std::time::Duration;
///
/// let msg = TaskFinished {
///     session_id: "sess1_g0-2_imec0",
///     outcome: "completed",
///     completed: true,
///     executed_stages: 6,
///     duration: Duration::from_secs(3600),
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct TaskFinished<'a> {
    pub session_id: &'a str,
    pub outcome: &'a str,
    pub completed: bool,
    pub executed_stages: usize,
    pub duration: Duration,
}

impl Display for TaskFinished<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Probe task {} finished with outcome {} after {} stages in {:?}",
            self.session_id, self.outcome, self.executed_stages, self.duration
        )
    }
}

impl StructuredLog for TaskFinished<'_> {
    fn log(&self) {
        if self.completed {
            tracing::info!(
                session_id = self.session_id,
                outcome = self.outcome,
                executed_stages = self.executed_stages,
                duration_ms = self.duration.as_millis() as u64,
                "{}", self
            );
        } else {
            tracing::warn!(
                session_id = self.session_id,
                outcome = self.outcome,
                executed_stages = self.executed_stages,
                duration_ms = self.duration.as_millis() as u64,
                "{}", self
            );
        }
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "task_finished",
            span_name = name,
            session_id = self.session_id,
            outcome = self.outcome,
        )
    }
}

/// A probe task was skipped before any stage ran.
///
/// # Log Level
/// `warn!` - Expected for partially acquired sessions
pub struct TaskShortCircuited<'a> {
    pub session_id: &'a str,
    pub reason: &'a str,
    pub detail: String,
}

impl Display for TaskShortCircuited<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Skipping probe task {} ({}): {}",
            self.session_id, self.reason, self.detail
        )
    }
}

impl StructuredLog for TaskShortCircuited<'_> {
    fn log(&self) {
        tracing::warn!(
            session_id = self.session_id,
            reason = self.reason,
            detail = %self.detail,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "task_short_circuited",
            span_name = name,
            session_id = self.session_id,
            reason = self.reason,
        )
    }
}

/// A probe task was dispatched to the probe-level loop.
pub struct TaskStarted<'a> {
    pub session_id: &'a str,
    pub region: &'a str,
}

impl Display for TaskStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting probe task {} (region {})",
            self.session_id, self.region
        )
    }
}

impl StructuredLog for TaskStarted<'_> {
    fn log(&self) {
        tracing::debug!(
            session_id = self.session_id,
            region = self.region,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "task",
            span_name = name,
            session_id = self.session_id,
            region = self.region,
        )
    }
}
