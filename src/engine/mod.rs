// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Batch execution engine.
//!
//! [`Orchestrator`] walks the run specs of a configuration. Per run it
//! resolves the spec, short-circuits probe tasks that cannot start, runs the
//! run-level preprocessing stage once, reconciles CatGT's first-gate naming,
//! then hands each probe task to the [`StageSequencer`], sequentially or with
//! bounded concurrency. Every probe task ends as exactly one ledger row.

mod orchestrator;
mod sequencer;


pub use orchestrator::{BatchReport, Orchestrator, RunReport};
pub use sequencer::{ExecutedStage, StageSequencer, TaskOutcome, TaskReport};
