// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Error taxonomy for run resolution, stage execution and reconciliation.
//!
//! Each variant maps onto a propagation rule enforced by the orchestrator:
//!
//! * `MalformedSpec` - fatal for one RunSpec only
//! * `MissingData` - short-circuits one ProbeTask, recorded with no stages
//! * `UnknownRegion` - fatal for one ProbeTask, raised before any process starts
//! * `StageFailed` - aborts the remaining stages of one ProbeTask
//! * `ReconciliationConflict` - blocks every probe-level stage of the run

use std::path::PathBuf;
use thiserror::Error;

use crate::stages::PipelineStage;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("malformed run spec '{run_name}': {reason}")]
    MalformedSpec { run_name: String, reason: String },

    #[error("missing data at {}: {context}", .path.display())]
    MissingData { path: PathBuf, context: String },

    #[error("no parameter overrides for region '{region}' (probe {probe})")]
    UnknownRegion { region: String, probe: String },

    #[error("stage '{stage}' failed for {session_id}: {}", describe_exit(.exit_code))]
    StageFailed {
        stage: PipelineStage,
        session_id: String,
        exit_code: Option<i32>,
    },

    #[error("reconciliation conflict: cannot rename {} to {}, target already exists", .from.display(), .to.display())]
    ReconciliationConflict { from: PathBuf, to: PathBuf },

    #[error("invalid parameters for stage '{stage}': {reason}")]
    InvalidParameters { stage: PipelineStage, reason: String },

    #[error("i/o error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize stage configuration: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("ledger write failed: {0}")]
    Ledger(#[from] csv::Error),

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl PipelineError {
    /// Stable label used in the ledger `outcome` column and in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::MalformedSpec { .. } => "malformed_spec",
            PipelineError::MissingData { .. } => "missing_data",
            PipelineError::UnknownRegion { .. } => "unknown_region",
            PipelineError::StageFailed { .. } => "stage_failed",
            PipelineError::ReconciliationConflict { .. } => "reconciliation_conflict",
            PipelineError::InvalidParameters { .. } => "invalid_parameters",
            PipelineError::Io { .. } => "io_error",
            PipelineError::Serialization(_) => "serialization_error",
            PipelineError::Ledger(_) => "ledger_error",
            PipelineError::Internal { .. } => "internal_error",
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn missing(path: impl Into<PathBuf>, context: impl Into<String>) -> Self {
        PipelineError::MissingData {
            path: path.into(),
            context: context.into(),
        }
    }

    pub fn malformed(run_name: &str, reason: impl Into<String>) -> Self {
        PipelineError::MalformedSpec {
            run_name: run_name.to_string(),
            reason: reason.into(),
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated without an exit code".to_string(),
    }
}
