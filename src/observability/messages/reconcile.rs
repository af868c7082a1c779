// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for post-concatenation directory reconciliation.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::path::Path;
use tracing::Span;

/// Reconciliation of a CatGT output tree has begun.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ReconcileStarted<'a> {
    pub root: &'a Path,
    pub first_gate: u32,
    pub signature: &'a str,
}

impl Display for ReconcileStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Reconciling {}: renaming _g{} to _g{}",
            self.root.display(),
            self.first_gate,
            self.signature
        )
    }
}

impl StructuredLog for ReconcileStarted<'_> {
    fn log(&self) {
        tracing::info!(
            root = %self.root.display(),
            first_gate = self.first_gate,
            signature = self.signature,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "reconcile",
            span_name = name,
            root = %self.root.display(),
            signature = self.signature,
        )
    }
}

/// One path was renamed.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct EntryRenamed<'a> {
    pub from: &'a Path,
    pub to: &'a Path,
}

impl Display for EntryRenamed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Renamed {} -> {}", self.from.display(), self.to.display())
    }
}

impl StructuredLog for EntryRenamed<'_> {
    fn log(&self) {
        tracing::debug!(
            from = %self.from.display(),
            to = %self.to.display(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "entry_renamed",
            span_name = name,
            from = %self.from.display(),
            to = %self.to.display(),
        )
    }
}

/// Reconciliation finished.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use sglx_pipeline::observability::messages::reconcile::ReconcileCompleted;
/// use std::path::Path;
///
/// let msg = ReconcileCompleted {
///     root: Path::new("/out/catgt_sess1_g0-2"),
///     directories_renamed: 2,
///     files_renamed: 4,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct ReconcileCompleted<'a> {
    pub root: &'a Path,
    pub directories_renamed: usize,
    pub files_renamed: usize,
}

impl Display for ReconcileCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Reconciled {}: {} directories and {} files renamed",
            self.root.display(),
            self.directories_renamed,
            self.files_renamed
        )
    }
}

impl StructuredLog for ReconcileCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            root = %self.root.display(),
            directories_renamed = self.directories_renamed,
            files_renamed = self.files_renamed,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "reconcile_completed",
            span_name = name,
            root = %self.root.display(),
        )
    }
}

/// A rename target already exists; the source was left in place.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct ReconcileConflict<'a> {
    pub from: &'a Path,
    pub to: &'a Path,
}

impl Display for ReconcileConflict<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Cannot rename {} to {}: target already exists",
            self.from.display(),
            self.to.display()
        )
    }
}

impl StructuredLog for ReconcileConflict<'_> {
    fn log(&self) {
        tracing::error!(
            from = %self.from.display(),
            to = %self.to.display(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "reconcile_conflict",
            span_name = name,
            from = %self.from.display(),
            to = %self.to.display(),
        )
    }
}
