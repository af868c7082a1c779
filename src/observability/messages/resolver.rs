// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for run spec resolution.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A run spec was resolved into probe tasks.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use sglx_pipeline::observability::messages::resolver::RunSpecResolved;
///
/// let msg = RunSpecResolved {
///     run_name: "sess1",
///     gate_signature: "0-2",
///     first_trigger: 0,
///     last_trigger: 5,
///     task_count: 2,
/// };
///
/// assert_eq!(
///     msg.to_string(),
///     "Resolved run 'sess1': gates 0-2, triggers 0..5, 2 probe tasks"
/// );
/// ```
pub struct RunSpecResolved<'a> {
    pub run_name: &'a str,
    pub gate_signature: &'a str,
    pub first_trigger: u32,
    pub last_trigger: u32,
    pub task_count: usize,
}

impl Display for RunSpecResolved<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Resolved run '{}': gates {}, triggers {}..{}, {} probe tasks",
            self.run_name,
            self.gate_signature,
            self.first_trigger,
            self.last_trigger,
            self.task_count
        )
    }
}

impl StructuredLog for RunSpecResolved<'_> {
    fn log(&self) {
        tracing::info!(
            run_name = self.run_name,
            gate_signature = self.gate_signature,
            first_trigger = self.first_trigger,
            last_trigger = self.last_trigger,
            task_count = self.task_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "run_spec_resolved",
            span_name = name,
            run_name = self.run_name,
            gate_signature = self.gate_signature,
        )
    }
}
