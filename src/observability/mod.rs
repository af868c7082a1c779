// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! Every diagnostic the pipeline emits is a message struct implementing
//! `Display` plus [`messages::StructuredLog`], so log text lives in one place
//! and every event carries the same structured fields (session id, stage,
//! run name) regardless of where it is raised.
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::engine` - batch, run and probe task lifecycle
//! * `messages::stage` - stage configuration and external stage execution
//! * `messages::resolver` - run spec resolution
//! * `messages::reconcile` - post-concatenation directory renaming
//! * `messages::ledger` - provenance ledger writes
//! * `messages::validation` - configuration validation warnings
//!
//! # Usage
//!
//! ```rust
//! use sglx_pipeline::observability::messages::stage::StageFailed;
//!
//! let msg = StageFailed {
//!     stage: "kilosort_helper",
//!     key: "sess1_g0-2_imec0",
//!     exit_code: Some(1),
//! };
//!
//! tracing::error!("{}", msg);
//! ```

pub mod messages;
