// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration validation
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// The same stage was selected more than once
    DuplicateStage {
        /// The duplicated stage name
        stage: String,
    },
    /// The configuration contains no run specs to process
    NoRunSpecs,
    /// A run spec has an empty run name
    EmptyRunName {
        /// Position of the run spec in the configuration
        index: usize,
    },
    /// A numeric parameter is outside its accepted bounds
    OutOfBounds {
        /// Dotted path to the offending parameter
        parameter: String,
        /// Human readable description of the accepted range
        expected: String,
    },
    /// A region table entry refers to nothing and overrides nothing
    EmptyRegionOverride {
        /// The region tag with no overrides
        region: String,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::DuplicateStage { stage } => {
                write!(f, "Stage '{}' is selected more than once", stage)
            }
            ValidationError::NoRunSpecs => write!(f, "Configuration contains no run_specs"),
            ValidationError::EmptyRunName { index } => {
                write!(f, "run_specs[{}] has an empty run_name", index)
            }
            ValidationError::OutOfBounds {
                parameter,
                expected,
            } => {
                write!(f, "Parameter '{}' is out of bounds: expected {}", parameter, expected)
            }
            ValidationError::EmptyRegionOverride { region } => {
                write!(f, "Region '{}' is declared but overrides no parameters", region)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Errors raised while loading a pipeline configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Configuration validation failed:\n{}", join_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
