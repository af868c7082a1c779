// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::Instrument;

use crate::config::Config;
use crate::errors::PipelineError;
use crate::layout;
use crate::ledger::LedgerEntry;
use crate::observability::messages::engine::{TaskFinished, TaskStarted};
use crate::observability::messages::stage::{
    StageConfigArchived, StageConfigPersisted, StageFailed, StageInputMissing, StageStarted,
    StageSucceeded,
};
use crate::observability::messages::StructuredLog;
use crate::run_spec::{ProbeTask, ResolvedRun};
use crate::stages::{PipelineStage, StageConfig, StageConfigStore, StageConfigSynthesizer};
use crate::traits::{StageInvocation, StageRunner};

/// A stage whose external process was launched, successfully or not.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutedStage {
    pub stage: PipelineStage,
    pub config_path: PathBuf,
}

/// Final state of one probe task.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TaskOutcome {
    Completed,
    MissingData { detail: String },
    UnknownRegion { region: String },
    StageFailed {
        stage: PipelineStage,
        exit_code: Option<i32>,
    },
    ReconciliationConflict { detail: String },
    Error { kind: String, detail: String },
}

impl TaskOutcome {
    pub fn from_error(error: &PipelineError) -> Self {
        match error {
            PipelineError::MissingData { .. } => TaskOutcome::MissingData {
                detail: error.to_string(),
            },
            PipelineError::UnknownRegion { region, .. } => TaskOutcome::UnknownRegion {
                region: region.clone(),
            },
            PipelineError::StageFailed {
                stage, exit_code, ..
            } => TaskOutcome::StageFailed {
                stage: *stage,
                exit_code: *exit_code,
            },
            PipelineError::ReconciliationConflict { .. } => TaskOutcome::ReconciliationConflict {
                detail: error.to_string(),
            },
            other => TaskOutcome::Error {
                kind: other.kind().to_string(),
                detail: other.to_string(),
            },
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, TaskOutcome::Completed)
    }

    /// Compact form written to the ledger `outcome` column.
    ///
    /// ```
    /// use sglx_pipeline::engine::TaskOutcome;
    /// use sglx_pipeline::stages::PipelineStage;
    ///
    /// let outcome = TaskOutcome::StageFailed {
    ///     stage: PipelineStage::KilosortHelper,
    ///     exit_code: Some(2),
    /// };
    /// assert_eq!(outcome.label(), "stage_failed:kilosort_helper(exit 2)");
    /// ```
    pub fn label(&self) -> String {
        match self {
            TaskOutcome::Completed => "completed".to_string(),
            TaskOutcome::MissingData { .. } => "missing_data".to_string(),
            TaskOutcome::UnknownRegion { region } => format!("unknown_region:{}", region),
            TaskOutcome::StageFailed {
                stage,
                exit_code: Some(code),
            } => format!("stage_failed:{}(exit {})", stage, code),
            TaskOutcome::StageFailed {
                stage,
                exit_code: None,
            } => format!("stage_failed:{}(signal)", stage),
            TaskOutcome::ReconciliationConflict { .. } => "reconciliation_conflict".to_string(),
            TaskOutcome::Error { kind, .. } => kind.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskReport {
    pub session_id: String,
    pub outcome: TaskOutcome,
    pub executed: Vec<ExecutedStage>,
    pub execution_time_s: f64,
}

impl TaskReport {
    pub fn new(
        session_id: impl Into<String>,
        outcome: TaskOutcome,
        executed: Vec<ExecutedStage>,
        started: Instant,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            outcome,
            executed,
            execution_time_s: started.elapsed().as_secs_f64(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.outcome.is_completed()
    }

    pub fn to_ledger_entry(&self) -> LedgerEntry {
        LedgerEntry {
            session_id: self.session_id.clone(),
            timestamp: chrono::Utc::now(),
            outcome: self.outcome.label(),
            executed_stages: self
                .executed
                .iter()
                .map(|e| e.stage.name().to_string())
                .collect(),
            stage_configs: self.executed.iter().map(|e| e.config_path.clone()).collect(),
            execution_time_s: self.execution_time_s,
        }
    }
}

/// Drives the selected stages of one task, or one run-level stage, through
/// synthesize -> persist -> invoke.
///
/// Every invocation blocks until the external process exits; the next stage
/// of the same task never starts before that.
pub struct StageSequencer {
    synthesizer: StageConfigSynthesizer,
    store: StageConfigStore,
    runner: Arc<dyn StageRunner>,
    stages: Vec<PipelineStage>,
}

impl StageSequencer {
    pub fn new(config: Arc<Config>, runner: Arc<dyn StageRunner>) -> Self {
        let store = StageConfigStore::new(config.json_directory());
        let stages = config.selected_stages();
        Self {
            synthesizer: StageConfigSynthesizer::new(config),
            store,
            runner,
            stages,
        }
    }

    pub fn synthesizer(&self) -> &StageConfigSynthesizer {
        &self.synthesizer
    }

    /// Selected stages in catalog order.
    pub fn stages(&self) -> &[PipelineStage] {
        &self.stages
    }

    pub fn is_selected(&self, stage: PipelineStage) -> bool {
        self.stages.contains(&stage)
    }

    /// Checks a task before any process is launched for its run: the raw
    /// probe folder must exist and the region tag must be known.
    pub fn preflight(&self, task: &ProbeTask) -> Result<(), PipelineError> {
        let config = self.synthesizer.config();
        let raw = layout::raw_probe_dir(
            &config.raw_root,
            task.run_name(),
            task.gates().first(),
            task.probe(),
        );
        if !raw.is_dir() {
            return Err(PipelineError::missing(raw, "raw probe folder"));
        }
        self.synthesizer.region_params(task)?;
        Ok(())
    }

    /// Runs a run-level stage once over the run's tasks.
    ///
    /// CatGT writes first-gate names that reconciliation renames afterwards,
    /// so its configuration record is archived by [`Self::archive`] once the
    /// run directory carries its final name.
    pub async fn run_run_level(
        &self,
        stage: PipelineStage,
        run: &ResolvedRun,
        executed: &mut Vec<ExecutedStage>,
    ) -> Result<(), PipelineError> {
        let config = self.synthesizer.synthesize_run_level(stage, run)?;
        let required = self.synthesizer.run_required_input(stage, run);
        let declared = self.synthesizer.run_output(run);
        let artifact_dir = match stage {
            PipelineStage::CatGt => None,
            _ => Some(declared.clone()),
        };
        self.execute(&config, &required, declared, artifact_dir.as_deref(), executed)
            .await
    }

    /// Copies the configuration record of an executed stage into `dir`.
    pub fn archive(
        &self,
        executed: &ExecutedStage,
        key: &str,
        dir: &Path,
    ) -> Result<PathBuf, PipelineError> {
        let copy = self.store.archive(&executed.config_path, dir)?;
        StageConfigArchived {
            stage: executed.stage.name(),
            key,
            path: &copy,
        }
        .log();
        Ok(copy)
    }

    /// Runs every selected probe-level stage of `task` in catalog order,
    /// stopping at the first failure.
    ///
    /// `inherited` carries the run-level stages already executed on the task's
    /// behalf so they appear in its ledger row.
    pub async fn run_task(&self, task: &ProbeTask, inherited: Vec<ExecutedStage>) -> TaskReport {
        let started = Instant::now();
        let msg = TaskStarted {
            session_id: task.session_id(),
            region: task.region(),
        };
        let span = msg.span("probe_task");
        msg.log();

        let mut executed = inherited;
        let result = self
            .run_probe_stages(task, &mut executed)
            .instrument(span)
            .await;
        let outcome = match result {
            Ok(()) => TaskOutcome::Completed,
            Err(e) => TaskOutcome::from_error(&e),
        };

        let report = TaskReport::new(task.session_id(), outcome, executed, started);
        TaskFinished {
            session_id: &report.session_id,
            outcome: &report.outcome.label(),
            completed: report.is_completed(),
            executed_stages: report.executed.len(),
            duration: started.elapsed(),
        }
        .log();
        report
    }

    async fn run_probe_stages(
        &self,
        task: &ProbeTask,
        executed: &mut Vec<ExecutedStage>,
    ) -> Result<(), PipelineError> {
        let artifact_dir = self.synthesizer.artifact_dir(task);
        for stage in self.stages.iter().copied().filter(|s| !s.is_run_level()) {
            let config = self.synthesizer.synthesize(stage, task)?;
            let required = self.synthesizer.required_input(stage, task);
            let declared = self.synthesizer.probe_output(stage, task);
            self.execute(&config, &required, declared, Some(&artifact_dir), executed)
                .await?;
        }
        Ok(())
    }

    async fn execute(
        &self,
        config: &StageConfig,
        required: &Path,
        declared_output: PathBuf,
        artifact_dir: Option<&Path>,
        executed: &mut Vec<ExecutedStage>,
    ) -> Result<(), PipelineError> {
        let stage = config.stage();
        let key = config.key();

        if !required.exists() {
            StageInputMissing {
                stage: stage.name(),
                key,
                path: required,
            }
            .log();
            return Err(PipelineError::missing(
                required,
                format!("input of stage {}", stage),
            ));
        }

        let persisted = self.store.persist(config)?;
        StageConfigPersisted {
            stage: stage.name(),
            key,
            path: &persisted.input_json,
        }
        .log();
        if let Some(dir) = artifact_dir.filter(|d| d.is_dir()) {
            let copy = self.store.archive(&persisted.input_json, dir)?;
            StageConfigArchived {
                stage: stage.name(),
                key,
                path: &copy,
            }
            .log();
        }

        let input_json = persisted.input_json.clone();
        let invocation = StageInvocation {
            stage,
            key: key.to_string(),
            input_json: persisted.input_json,
            output_json: persisted.output_json,
            declared_output,
        };
        let msg = StageStarted {
            stage: stage.name(),
            key,
            runner: self.runner.name(),
        };
        let span = msg.span("stage");
        msg.log();

        let exit = self.runner.run(&invocation).instrument(span).await?;
        executed.push(ExecutedStage {
            stage,
            config_path: input_json,
        });

        if exit.success() {
            StageSucceeded {
                stage: stage.name(),
                key,
                duration: exit.duration,
            }
            .log();
            Ok(())
        } else {
            StageFailed {
                stage: stage.name(),
                key,
                exit_code: exit.code,
            }
            .log();
            Err(PipelineError::StageFailed {
                stage,
                session_id: key.to_string(),
                exit_code: exit.code,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_labels() {
        assert_eq!(TaskOutcome::Completed.label(), "completed");
        assert_eq!(
            TaskOutcome::UnknownRegion {
                region: "thalamus".to_string()
            }
            .label(),
            "unknown_region:thalamus"
        );
        assert_eq!(
            TaskOutcome::StageFailed {
                stage: PipelineStage::CatGt,
                exit_code: None
            }
            .label(),
            "stage_failed:catgt(signal)"
        );
    }

    #[test]
    fn test_outcome_from_error() {
        let err = PipelineError::missing("/raw/sess1_g0/sess1_g0_imec2", "raw probe folder");
        assert!(matches!(
            TaskOutcome::from_error(&err),
            TaskOutcome::MissingData { .. }
        ));

        let err = PipelineError::Internal {
            message: "join".to_string(),
        };
        assert_eq!(TaskOutcome::from_error(&err).label(), "internal_error");
    }

    #[test]
    fn test_ledger_entry_lists_executed_stages() {
        let report = TaskReport {
            session_id: "sess1_g0_imec0".to_string(),
            outcome: TaskOutcome::Completed,
            executed: vec![
                ExecutedStage {
                    stage: PipelineStage::CatGt,
                    config_path: PathBuf::from("/json/sess1_g0-catgt-input.json"),
                },
                ExecutedStage {
                    stage: PipelineStage::KilosortHelper,
                    config_path: PathBuf::from("/json/sess1_g0_imec0-kilosort_helper-input.json"),
                },
            ],
            execution_time_s: 1.0,
        };
        let entry = report.to_ledger_entry();
        assert_eq!(entry.executed_stages, vec!["catgt", "kilosort_helper"]);
        assert_eq!(entry.stage_configs.len(), 2);
        assert_eq!(entry.outcome, "completed");
    }
}
