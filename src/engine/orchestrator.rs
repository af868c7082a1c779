// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::Instrument;

use super::sequencer::{ExecutedStage, StageSequencer, TaskOutcome, TaskReport};
use crate::config::Config;
use crate::errors::PipelineError;
use crate::layout;
use crate::ledger::ProvenanceLedger;
use crate::observability::messages::engine::{
    BatchCompleted, BatchStarted, RunFailed, RunStarted, TaskShortCircuited,
};
use crate::observability::messages::stage::{
    GfixEditRate, StageSkipped, ToolLogUnreadable, ToolLogsCleared,
};
use crate::observability::messages::StructuredLog;
use crate::reconcile::DirectoryReconciler;
use crate::run_spec::{ResolvedRun, RunSpec, RunSpecResolver};
use crate::stages::tool_logs::{self, GfixEdits};
use crate::stages::PipelineStage;
use crate::traits::StageRunner;

type SharedLedger = Arc<Mutex<ProvenanceLedger>>;

/// What happened to one run spec.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub run_name: String,
    /// `<run>_g<signature>` once the spec resolved.
    pub run_key: Option<String>,
    /// Set when the spec as a whole could not be processed.
    pub error: Option<String>,
    pub tasks: Vec<TaskReport>,
    /// Outcome of the alignment stage, when it ran.
    pub alignment: Option<TaskOutcome>,
    /// Per-probe artifact-repair rates from the CatGT log.
    pub gfix_edits: Vec<GfixEdits>,
}

impl RunReport {
    fn new(run_name: &str) -> Self {
        Self {
            run_name: run_name.to_string(),
            run_key: None,
            error: None,
            tasks: Vec::new(),
            alignment: None,
            gfix_edits: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
            && self.tasks.iter().all(TaskReport::is_completed)
            && self
                .alignment
                .as_ref()
                .map_or(true, TaskOutcome::is_completed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    pub runs: Vec<RunReport>,
    pub execution_time_s: f64,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.runs.iter().all(RunReport::is_success)
    }

    pub fn failed_runs(&self) -> usize {
        self.runs.iter().filter(|r| r.error.is_some()).count()
    }

    pub fn incomplete_tasks(&self) -> usize {
        self.runs
            .iter()
            .flat_map(|r| r.tasks.iter())
            .filter(|t| !t.is_completed())
            .count()
    }
}

/// Batch driver: resolves each run spec, runs the run-level and probe-level
/// stages around the reconciliation barrier, and records every probe task in
/// the provenance ledger.
///
/// Failures are contained: a bad run spec never stops the batch, and a failed
/// probe task never stops its siblings.
pub struct Orchestrator {
    config: Arc<Config>,
    resolver: RunSpecResolver,
    sequencer: Arc<StageSequencer>,
}

impl Orchestrator {
    pub fn new(config: Arc<Config>, runner: Arc<dyn StageRunner>) -> Self {
        Self {
            resolver: RunSpecResolver::new(config.raw_root.clone()),
            sequencer: Arc::new(StageSequencer::new(Arc::clone(&config), runner)),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Processes every run spec in order.
    ///
    /// Tool logs left by an earlier batch are removed first. Only a ledger or
    /// log directory that cannot be written stops the batch early.
    pub async fn run_batch(&self) -> Result<BatchReport, PipelineError> {
        let started = Instant::now();
        let msg = BatchStarted {
            run_spec_count: self.config.run_specs.len(),
            stage_count: self.sequencer.stages().len(),
            max_concurrency: self.config.executor_options.max_concurrency(),
        };
        let span = msg.span("batch");
        msg.log();

        let ledger: SharedLedger = Arc::new(Mutex::new(ProvenanceLedger::open(
            self.config.ledger_path(),
        )?));

        let log_dir = self.config.tool_log_directory();
        let removed = tool_logs::clear_tool_logs(log_dir)?;
        ToolLogsCleared {
            directory: log_dir,
            removed,
        }
        .log();

        let mut runs = Vec::with_capacity(self.config.run_specs.len());
        for (index, spec) in self.config.run_specs.iter().enumerate() {
            let report = self
                .run_spec(index, spec, &ledger)
                .instrument(span.clone())
                .await?;
            runs.push(report);
        }

        let report = BatchReport {
            runs,
            execution_time_s: started.elapsed().as_secs_f64(),
        };
        BatchCompleted {
            run_count: report.runs.len(),
            failed_runs: report.failed_runs(),
            incomplete_tasks: report.incomplete_tasks(),
            duration: started.elapsed(),
        }
        .log();
        Ok(report)
    }

    async fn run_spec(
        &self,
        index: usize,
        spec: &RunSpec,
        ledger: &SharedLedger,
    ) -> Result<RunReport, PipelineError> {
        let started = Instant::now();
        let msg = RunStarted {
            run_name: &spec.run_name,
            index,
        };
        let span = msg.span("run");
        msg.log();

        let mut report = RunReport::new(&spec.run_name);
        let run = match self.resolver.resolve(spec) {
            Ok(run) => run,
            Err(e) => {
                RunFailed {
                    run_name: &spec.run_name,
                    kind: e.kind(),
                    error: &e,
                }
                .log();
                report.error = Some(e.to_string());
                if matches!(e, PipelineError::MissingData { .. }) {
                    let outcome = TaskOutcome::from_error(&e);
                    for session_id in self.resolver.fallback_session_ids(spec) {
                        let task = TaskReport::new(session_id, outcome.clone(), Vec::new(), started);
                        record(ledger, &task).await?;
                        report.tasks.push(task);
                    }
                }
                return Ok(report);
            }
        };
        report.run_key = Some(run.run_key());

        self.process_run(run, started, ledger, &mut report)
            .instrument(span)
            .await?;
        Ok(report)
    }

    async fn process_run(
        &self,
        run: ResolvedRun,
        started: Instant,
        ledger: &SharedLedger,
        report: &mut RunReport,
    ) -> Result<(), PipelineError> {
        let mut viable = Vec::new();
        for task in &run.tasks {
            match self.sequencer.preflight(task) {
                Ok(()) => viable.push(task.session_id().to_string()),
                Err(e) => {
                    TaskShortCircuited {
                        session_id: task.session_id(),
                        reason: e.kind(),
                        detail: e.to_string(),
                    }
                    .log();
                    let task =
                        TaskReport::new(task.session_id(), TaskOutcome::from_error(&e), Vec::new(), started);
                    record(ledger, &task).await?;
                    report.tasks.push(task);
                }
            }
        }
        let viable_run = run.retain_tasks(|t| viable.iter().any(|id| id == t.session_id()));
        if viable_run.tasks.is_empty() {
            return Ok(());
        }

        let mut shared = Vec::new();
        let barrier = match self.preprocess(&viable_run, &mut shared).await {
            Ok(()) => {
                report.gfix_edits = self.gfix_edits(&viable_run);
                self.reconcile(&viable_run)
                    .and_then(|()| self.archive_run_level(&viable_run, &shared))
            }
            Err(e) => Err(e),
        };
        if let Err(e) = barrier {
            let outcome = TaskOutcome::from_error(&e);
            for task in &viable_run.tasks {
                let task = TaskReport::new(task.session_id(), outcome.clone(), shared.clone(), started);
                record(ledger, &task).await?;
                report.tasks.push(task);
            }
            return Ok(());
        }

        let finished = self.run_probe_tasks(&viable_run, shared, ledger).await?;
        let completed: Vec<String> = finished
            .iter()
            .filter(|t| t.is_completed())
            .map(|t| t.session_id.clone())
            .collect();
        report.tasks.extend(finished);

        if self.sequencer.is_selected(PipelineStage::TPrime) {
            let aligned =
                viable_run.retain_tasks(|t| completed.iter().any(|id| id == t.session_id()));
            report.alignment = self.align(&aligned).await;
        }
        Ok(())
    }

    /// Run-level preprocessing, once per run.
    async fn preprocess(
        &self,
        run: &ResolvedRun,
        executed: &mut Vec<ExecutedStage>,
    ) -> Result<(), PipelineError> {
        if !self.sequencer.is_selected(PipelineStage::CatGt) {
            return Ok(());
        }
        self.sequencer
            .run_run_level(PipelineStage::CatGt, run, executed)
            .await
    }

    /// Reads the rates CatGT logged for this run; an unreadable log only
    /// costs the report its rates.
    fn gfix_edits(&self, run: &ResolvedRun) -> Vec<GfixEdits> {
        if !self.sequencer.is_selected(PipelineStage::CatGt) {
            return Vec::new();
        }
        let run_key = run.run_key();
        let log = self.config.tool_log_directory().join(tool_logs::CATGT_LOG);
        match tool_logs::parse_gfix_edits(&log, &run.run_name, &run.probes()) {
            Ok(edits) => {
                for edit in &edits {
                    if let Some(rate) = edit.edits_per_sec {
                        GfixEditRate {
                            run_key: &run_key,
                            probe: &edit.probe,
                            edits_per_sec: rate,
                        }
                        .log();
                    }
                }
                edits
            }
            Err(e) => {
                ToolLogUnreadable {
                    run_key: &run_key,
                    error: &e,
                }
                .log();
                Vec::new()
            }
        }
    }

    /// Copies run-level configuration records into the reconciled output.
    fn archive_run_level(
        &self,
        run: &ResolvedRun,
        executed: &[ExecutedStage],
    ) -> Result<(), PipelineError> {
        let dir = self.sequencer.synthesizer().run_output(run);
        if !dir.is_dir() {
            return Ok(());
        }
        let run_key = run.run_key();
        for stage in executed {
            self.sequencer.archive(stage, &run_key, &dir)?;
        }
        Ok(())
    }

    /// Renames first-gate CatGT output to the gate-list signature.
    ///
    /// Must finish before any probe-level stage of the run starts.
    fn reconcile(&self, run: &ResolvedRun) -> Result<(), PipelineError> {
        let Some(reconciler) = DirectoryReconciler::for_gates(&run.gates) else {
            return Ok(());
        };
        let first_gate_dir = layout::catgt_run_dir(
            &self.config.destination,
            &run.run_name,
            &run.gates.first().to_string(),
        );
        let signature_dir = self.sequencer.synthesizer().run_output(run);

        match (first_gate_dir.exists(), signature_dir.exists()) {
            (true, true) => Err(PipelineError::ReconciliationConflict {
                from: first_gate_dir,
                to: signature_dir,
            }),
            (true, false) => reconciler.reconcile_entry(&first_gate_dir).map(|_| ()),
            (false, true) => reconciler.reconcile_tree(&signature_dir).map(|_| ()),
            // nothing to rename; stage input checks report the missing data
            (false, false) => Ok(()),
        }
    }

    async fn run_probe_tasks(
        &self,
        run: &ResolvedRun,
        shared: Vec<ExecutedStage>,
        ledger: &SharedLedger,
    ) -> Result<Vec<TaskReport>, PipelineError> {
        let max_concurrency = self.config.executor_options.max_concurrency();
        let mut reports = Vec::with_capacity(run.tasks.len());

        if max_concurrency <= 1 {
            for task in &run.tasks {
                let report = self.sequencer.run_task(task, shared.clone()).await;
                record(ledger, &report).await?;
                reports.push(report);
            }
            return Ok(reports);
        }

        let semaphore = Arc::new(Semaphore::new(max_concurrency));
        let mut set = JoinSet::new();
        for task in run.tasks.iter().cloned() {
            let sequencer = Arc::clone(&self.sequencer);
            let semaphore = Arc::clone(&semaphore);
            let ledger = Arc::clone(ledger);
            let inherited = shared.clone();
            set.spawn(
                async move {
                    let _permit = semaphore.acquire_owned().await.map_err(|e| {
                        PipelineError::Internal {
                            message: format!(
                                "failed to acquire permit for {}: {}",
                                task.session_id(),
                                e
                            ),
                        }
                    })?;
                    let report = sequencer.run_task(&task, inherited).await;
                    record(&ledger, &report).await?;
                    Ok::<TaskReport, PipelineError>(report)
                }
                .in_current_span(),
            );
        }

        while let Some(joined) = set.join_next().await {
            let failure = match joined {
                Ok(Ok(report)) => {
                    reports.push(report);
                    continue;
                }
                Ok(Err(e)) => e,
                Err(join_error) => PipelineError::Internal {
                    message: format!("probe task join error: {}", join_error),
                },
            };
            // siblings are aborted; their stage processes die with them
            set.shutdown().await;
            return Err(failure);
        }

        let order: HashMap<&str, usize> = run
            .tasks
            .iter()
            .enumerate()
            .map(|(i, t)| (t.session_id(), i))
            .collect();
        reports.sort_by_key(|r| order.get(r.session_id.as_str()).copied());
        Ok(reports)
    }

    /// Run-level alignment over the tasks that completed; `None` when no
    /// task completed and alignment was skipped.
    async fn align(&self, run: &ResolvedRun) -> Option<TaskOutcome> {
        if run.tasks.is_empty() {
            StageSkipped {
                stage: PipelineStage::TPrime.name(),
                key: &run.run_key(),
                reason: "no probe task completed",
            }
            .log();
            return None;
        }
        let mut executed = Vec::new();
        let outcome = match self
            .sequencer
            .run_run_level(PipelineStage::TPrime, run, &mut executed)
            .await
        {
            Ok(()) => TaskOutcome::Completed,
            Err(e) => TaskOutcome::from_error(&e),
        };
        Some(outcome)
    }
}

/// Appends one ledger row; concurrent tasks serialise on the mutex.
async fn record(ledger: &SharedLedger, report: &TaskReport) -> Result<(), PipelineError> {
    let ledger = ledger.lock().await;
    ledger.append(&report.to_ledger_entry())
}
