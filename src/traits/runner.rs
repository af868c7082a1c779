// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::PipelineError;
use crate::stages::PipelineStage;

/// Everything an external stage needs to run once.
#[derive(Debug, Clone, PartialEq)]
pub struct StageInvocation {
    pub stage: PipelineStage,
    /// Session id for probe-level stages, run key for run-level stages.
    pub key: String,
    /// The persisted stage configuration.
    pub input_json: PathBuf,
    /// Where the stage writes its output summary.
    pub output_json: PathBuf,
    /// The path this stage owns and is expected to produce.
    pub declared_output: PathBuf,
}

/// How an external stage process ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageExit {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub duration: Duration,
}

impl StageExit {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Uniform "run external stage" interface.
///
/// Implementations block the caller until the stage has exited; the exit code
/// is the only success signal.
#[async_trait]
pub trait StageRunner: Send + Sync {
    async fn run(&self, invocation: &StageInvocation) -> Result<StageExit, PipelineError>;

    fn name(&self) -> &'static str;
}
