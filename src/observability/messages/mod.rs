// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! This module contains all message types used throughout the pipeline for
//! diagnostic and operational logging. Each message type implements the
//! `Display` trait to provide consistent, human-readable output, and the
//! [`StructuredLog`] trait to emit the same event with typed fields.
//!
//! # Organization
//!
//! Messages are organized by subsystem:
//!
//! * `engine` - Batch and run lifecycle events
//! * `stage` - External stage invocation events
//! * `resolver` - Run spec resolution events
//! * `reconcile` - Gate directory reconciliation events
//! * `ledger` - Provenance ledger events
//! * `validation` - Configuration validation warnings
//!
//! # Usage Pattern
//!
//! ```rust
//! use sglx_pipeline::observability::messages::engine::BatchStarted;
//! use sglx_pipeline::observability::messages::StructuredLog;
//!
//! let msg = BatchStarted {
//!     run_spec_count: 2,
//!     stage_count: 6,
//!     max_concurrency: 1,
//! };
//!
//! msg.log();
//! ```

use tracing::Span;

pub mod engine;
pub mod ledger;
pub mod reconcile;
pub mod resolver;
pub mod stage;
pub mod validation;

/// A log message that knows its own level and structured fields.
pub trait StructuredLog {
    /// Emit the message as a tracing event at its level.
    fn log(&self);

    /// Open a span carrying the message's fields.
    fn span(&self, name: &str) -> Span;
}
