// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for provenance ledger writes.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::path::Path;
use tracing::Span;

/// The ledger file was opened, and created with a header if it was new.
pub struct LedgerOpened<'a> {
    pub path: &'a Path,
    pub created: bool,
}

impl Display for LedgerOpened<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.created {
            write!(f, "Created provenance ledger at {}", self.path.display())
        } else {
            write!(f, "Appending to provenance ledger at {}", self.path.display())
        }
    }
}

impl StructuredLog for LedgerOpened<'_> {
    fn log(&self) {
        tracing::info!(
            path = %self.path.display(),
            created = self.created,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "ledger",
            span_name = name,
            path = %self.path.display(),
        )
    }
}

/// One row was appended and synced.
///
/// # Log Level
/// `debug!` - Detailed diagnostic information
pub struct LedgerEntryAppended<'a> {
    pub session_id: &'a str,
    pub outcome: &'a str,
}

impl Display for LedgerEntryAppended<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Recorded {} in ledger with outcome {}",
            self.session_id, self.outcome
        )
    }
}

impl StructuredLog for LedgerEntryAppended<'_> {
    fn log(&self) {
        tracing::debug!(
            session_id = self.session_id,
            outcome = self.outcome,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "ledger_append",
            span_name = name,
            session_id = self.session_id,
        )
    }
}
