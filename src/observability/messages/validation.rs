// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for configuration validation warnings.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A run spec uses a region tag the region table does not cover.
///
/// # Log Level
/// `warn!` - The affected probe task will fail with an unknown region
///
/// # Example
/// ```
/// use sglx_pipeline::observability::messages::validation::UnknownRegionTag;
///
/// let msg = UnknownRegionTag {
///     run_name: "sess1",
///     region: "thalamus",
/// };
///
/// tracing::warn!("{}", msg);
/// ```
pub struct UnknownRegionTag<'a> {
    pub run_name: &'a str,
    pub region: &'a str,
}

impl Display for UnknownRegionTag<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Run '{}' uses region '{}' which has no entry in the region table; its probes will not be processed",
            self.run_name, self.region
        )
    }
}

impl StructuredLog for UnknownRegionTag<'_> {
    fn log(&self) {
        tracing::warn!(
            run_name = self.run_name,
            region = self.region,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::WARN,
            "unknown_region_tag",
            span_name = name,
            run_name = self.run_name,
            region = self.region,
        )
    }
}
