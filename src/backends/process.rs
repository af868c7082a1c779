// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Instant;
use tokio::process::Command;

use crate::config::RunnerConfig;
use crate::errors::PipelineError;
use crate::traits::{StageExit, StageInvocation, StageRunner};

/// Runs each stage as a child process:
/// `<program> <args..> <module_prefix><module> --input_json <in> --output_json <out>`
///
/// The child is killed when the returned future is dropped, so an aborted
/// task never leaves its stage process running.
#[derive(Debug, Clone)]
pub struct ProcessStageRunner {
    program: String,
    args: Vec<String>,
    module_prefix: String,
    working_directory: Option<PathBuf>,
}

impl ProcessStageRunner {
    pub fn new(program: impl Into<String>, args: Vec<String>, module_prefix: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args,
            module_prefix: module_prefix.into(),
            working_directory: None,
        }
    }

    /// Runs every stage process in `dir`.
    pub fn in_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    pub fn from_config(runner: &RunnerConfig) -> Self {
        Self::new(runner.program(), runner.args(), runner.module_prefix())
    }

    /// Arguments passed after the program.
    pub fn arguments(&self, invocation: &StageInvocation) -> Vec<String> {
        let mut args = self.args.clone();
        args.push(format!("{}{}", self.module_prefix, invocation.stage.module()));
        args.push("--input_json".to_string());
        args.push(invocation.input_json.display().to_string());
        args.push("--output_json".to_string());
        args.push(invocation.output_json.display().to_string());
        args
    }
}

#[async_trait]
impl StageRunner for ProcessStageRunner {
    async fn run(&self, invocation: &StageInvocation) -> Result<StageExit, PipelineError> {
        let started = Instant::now();
        let mut command = Command::new(&self.program);
        command.args(self.arguments(invocation)).kill_on_drop(true);
        if let Some(dir) = &self.working_directory {
            command.current_dir(dir);
        }
        let status = command
            .status()
            .await
            .map_err(|e| PipelineError::io(PathBuf::from(&self.program), e))?;

        Ok(StageExit {
            code: status.code(),
            duration: started.elapsed(),
        })
    }

    fn name(&self) -> &'static str {
        "process"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages::PipelineStage;

    fn invocation() -> StageInvocation {
        StageInvocation {
            stage: PipelineStage::CatGt,
            key: "sess1_g0-2".to_string(),
            input_json: PathBuf::from("/json/sess1_g0-2-catgt-input.json"),
            output_json: PathBuf::from("/json/sess1_g0-2-catgt-output.json"),
            declared_output: PathBuf::from("/dest/catgt_sess1_g0-2"),
        }
    }

    #[test]
    fn test_command_line() {
        let runner = ProcessStageRunner::from_config(&RunnerConfig::default());
        assert_eq!(
            runner.arguments(&invocation()),
            vec![
                "-W",
                "ignore",
                "-m",
                "ecephys_spike_sorting.modules.catGT_helper",
                "--input_json",
                "/json/sess1_g0-2-catgt-input.json",
                "--output_json",
                "/json/sess1_g0-2-catgt-output.json",
            ]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exit_codes_are_reported() {
        let ok = ProcessStageRunner::new("true", vec![], "");
        assert!(ok.run(&invocation()).await.unwrap().success());

        let failing = ProcessStageRunner::new(
            "sh",
            vec!["-c".to_string(), "exit 3".to_string()],
            "",
        );
        let exit = failing.run(&invocation()).await.unwrap();
        assert_eq!(exit.code, Some(3));
        assert!(!exit.success());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_dropped_run_kills_child() {
        let dir = tempfile::TempDir::new().unwrap();
        let marker = dir.path().join("finished");
        let runner = ProcessStageRunner::new(
            "sh",
            vec![
                "-c".to_string(),
                format!("sleep 1 && touch {}", marker.display()),
            ],
            "",
        );

        let invocation = invocation();
        let timed_out =
            tokio::time::timeout(std::time::Duration::from_millis(100), runner.run(&invocation))
                .await;
        assert!(timed_out.is_err());

        tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
        assert!(!marker.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stage_runs_in_working_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let runner = ProcessStageRunner::new(
            "sh",
            vec!["-c".to_string(), "echo run > CatGT.log".to_string()],
            "",
        )
        .in_directory(dir.path());

        assert!(runner.run(&invocation()).await.unwrap().success());
        assert!(dir.path().join("CatGT.log").is_file());
    }

    #[tokio::test]
    async fn test_missing_program_is_io_error() {
        let runner = ProcessStageRunner::new("/definitely/not/a/program", vec![], "");
        let err = runner.run(&invocation()).await.unwrap_err();
        assert_eq!(err.kind(), "io_error");
    }
}
