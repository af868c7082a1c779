// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for stage configuration and external stage execution.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Duration;
use tracing::Span;

/// A stage configuration was written to the JSON directory.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct StageConfigPersisted<'a> {
    pub stage: &'a str,
    pub key: &'a str,
    pub path: &'a Path,
}

impl Display for StageConfigPersisted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Persisted {} configuration for {} to {}",
            self.stage,
            self.key,
            self.path.display()
        )
    }
}

impl StructuredLog for StageConfigPersisted<'_> {
    fn log(&self) {
        tracing::debug!(
            stage = self.stage,
            key = self.key,
            path = %self.path.display(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "stage_config",
            span_name = name,
            stage = self.stage,
            key = self.key,
        )
    }
}

/// An external stage is about to be launched.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use sglx_pipeline::observability::messages::stage::StageStarted;
///
/// let msg = StageStarted {
///     stage: "catgt",
///     key: "sess1_g0-2",
///     runner: "process",
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct StageStarted<'a> {
    pub stage: &'a str,
    pub key: &'a str,
    pub runner: &'a str,
}

impl Display for StageStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Running stage {} for {} via {} runner",
            self.stage, self.key, self.runner
        )
    }
}

impl StructuredLog for StageStarted<'_> {
    fn log(&self) {
        tracing::info!(
            stage = self.stage,
            key = self.key,
            runner = self.runner,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "stage",
            span_name = name,
            stage = self.stage,
            key = self.key,
            runner = self.runner,
        )
    }
}

/// An external stage exited with code 0.
///
/// # Log Level
/// `info!` - Important operational event
pub struct StageSucceeded<'a> {
    pub stage: &'a str,
    pub key: &'a str,
    pub duration: Duration,
}

impl Display for StageSucceeded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Stage {} completed for {} in {:?}",
            self.stage, self.key, self.duration
        )
    }
}

impl StructuredLog for StageSucceeded<'_> {
    fn log(&self) {
        tracing::info!(
            stage = self.stage,
            key = self.key,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "stage_succeeded",
            span_name = name,
            stage = self.stage,
            key = self.key,
            duration = ?self.duration,
        )
    }
}

/// An external stage exited non-zero or was killed.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct StageFailed<'a> {
    pub stage: &'a str,
    pub key: &'a str,
    pub exit_code: Option<i32>,
}

impl Display for StageFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self.exit_code {
            Some(code) => write!(
                f,
                "Stage {} failed for {} with exit code {}",
                self.stage, self.key, code
            ),
            None => write!(
                f,
                "Stage {} for {} was terminated without an exit code",
                self.stage, self.key
            ),
        }
    }
}

impl StructuredLog for StageFailed<'_> {
    fn log(&self) {
        tracing::error!(
            stage = self.stage,
            key = self.key,
            exit_code = ?self.exit_code,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "stage_failed",
            span_name = name,
            stage = self.stage,
            key = self.key,
            exit_code = ?self.exit_code,
        )
    }
}

/// The declared output of a stage's dependency is not on disk.
///
/// # Log Level
/// `warn!` - The task ends with missing data
pub struct StageInputMissing<'a> {
    pub stage: &'a str,
    pub key: &'a str,
    pub path: &'a Path,
}

impl Display for StageInputMissing<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Cannot run {} for {}: required input {} does not exist",
            self.stage,
            self.key,
            self.path.display()
        )
    }
}

impl StructuredLog for StageInputMissing<'_> {
    fn log(&self) {
        tracing::warn!(
            stage = self.stage,
            key = self.key,
            path = %self.path.display(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "stage_input_missing",
            span_name = name,
            stage = self.stage,
            key = self.key,
        )
    }
}

/// A run-level stage was not launched because no task can use it.
pub struct StageSkipped<'a> {
    pub stage: &'a str,
    pub key: &'a str,
    pub reason: &'a str,
}

impl Display for StageSkipped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Skipping {} for {}: {}", self.stage, self.key, self.reason)
    }
}

impl StructuredLog for StageSkipped<'_> {
    fn log(&self) {
        tracing::info!(
            stage = self.stage,
            key = self.key,
            reason = self.reason,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "stage_skipped",
            span_name = name,
            stage = self.stage,
            key = self.key,
        )
    }
}

/// A persisted stage configuration was copied next to the data it describes.
pub struct StageConfigArchived<'a> {
    pub stage: &'a str,
    pub key: &'a str,
    pub path: &'a Path,
}

impl Display for StageConfigArchived<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Archived {} configuration for {} at {}",
            self.stage,
            self.key,
            self.path.display()
        )
    }
}

impl StructuredLog for StageConfigArchived<'_> {
    fn log(&self) {
        tracing::debug!(
            stage = self.stage,
            key = self.key,
            path = %self.path.display(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "stage_config_archived",
            span_name = name,
            stage = self.stage,
            key = self.key,
        )
    }
}

/// Logs left behind by an earlier batch were removed.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct ToolLogsCleared<'a> {
    pub directory: &'a Path,
    pub removed: usize,
}

impl Display for ToolLogsCleared<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Removed {} stale tool log(s) from {}",
            self.removed,
            self.directory.display()
        )
    }
}

impl StructuredLog for ToolLogsCleared<'_> {
    fn log(&self) {
        tracing::debug!(
            directory = %self.directory.display(),
            removed = self.removed,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "tool_logs",
            span_name = name,
            directory = %self.directory.display(),
        )
    }
}

/// Artifact-repair rate CatGT reported for one probe.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use sglx_pipeline::observability::messages::stage::GfixEditRate;
///
/// let msg = GfixEditRate {
///     run_key: "sess1_g0-2",
///     probe: "0",
///     edits_per_sec: 0.0133,
/// };
///
/// assert_eq!(msg.to_string(), "sess1_g0-2 probe 0: gfix edits/sec 0.013");
/// ```
pub struct GfixEditRate<'a> {
    pub run_key: &'a str,
    pub probe: &'a str,
    pub edits_per_sec: f64,
}

impl Display for GfixEditRate<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} probe {}: gfix edits/sec {:.3}",
            self.run_key, self.probe, self.edits_per_sec
        )
    }
}

impl StructuredLog for GfixEditRate<'_> {
    fn log(&self) {
        tracing::info!(
            run_key = self.run_key,
            probe = self.probe,
            edits_per_sec = self.edits_per_sec,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "gfix",
            span_name = name,
            run_key = self.run_key,
            probe = self.probe,
        )
    }
}

/// A tool log could not be read after its stage ran.
///
/// # Log Level
/// `warn!` - Degraded report, processing continues
pub struct ToolLogUnreadable<'a> {
    pub run_key: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for ToolLogUnreadable<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "No gfix edit rates for {}: {}", self.run_key, self.error)
    }
}

impl StructuredLog for ToolLogUnreadable<'_> {
    fn log(&self) {
        tracing::warn!(
            run_key = self.run_key,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!("tool_log", span_name = name, run_key = self.run_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_failed_display_without_exit_code() {
        let msg = StageFailed {
            stage: "catgt",
            key: "sess1_g0",
            exit_code: None,
        };
        assert!(msg.to_string().contains("terminated without an exit code"));

        let msg = StageFailed {
            stage: "catgt",
            key: "sess1_g0",
            exit_code: Some(4),
        };
        assert!(msg.to_string().ends_with("exit code 4"));
    }
}
