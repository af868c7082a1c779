// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::catalog::PipelineStage;
use crate::errors::PipelineError;
use crate::utils::fs::atomic_create_bytes;

/// Fully resolved parameters of one stage for one task or run.
///
/// Built from a typed parameter record, so it never carries fields the stage
/// does not recognize. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageConfig {
    stage: PipelineStage,
    key: String,
    parameters: BTreeMap<String, Value>,
}

impl StageConfig {
    /// Serializes `params` into an ordered parameter map.
    ///
    /// # Arguments
    /// * `stage` - The stage the parameters belong to
    /// * `key` - Session id for probe-level stages, run key for run-level stages
    /// * `params` - A typed parameter record that serializes to an object
    pub fn from_params<P: Serialize>(
        stage: PipelineStage,
        key: impl Into<String>,
        params: &P,
    ) -> Result<Self, PipelineError> {
        let parameters = match serde_json::to_value(params)? {
            Value::Object(map) => map.into_iter().collect(),
            other => {
                return Err(PipelineError::InvalidParameters {
                    stage,
                    reason: format!("parameters must serialize to an object, got {}", other),
                })
            }
        };
        Ok(Self {
            stage,
            key: key.into(),
            parameters,
        })
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn parameters(&self) -> &BTreeMap<String, Value> {
        &self.parameters
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }
}

/// Timestamp part of persisted file names, sortable and free of `:`.
const STAMP_FORMAT: &str = "%Y%m%dT%H%M%S%6fZ";
const MAX_NAME_ATTEMPTS: u32 = 100;

/// A stage configuration as written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedStageConfig {
    /// `<json_dir>/<key>-<stage>-<stamp>-input.json`, never rewritten.
    pub input_json: PathBuf,
    /// Where the stage writes its output summary, paired with `input_json`.
    pub output_json: PathBuf,
}

/// Where persisted stage configurations and stage output summaries live.
///
/// Every persist creates a new file; an earlier ledger row therefore always
/// points at the parameters that were actually used.
#[derive(Debug, Clone)]
pub struct StageConfigStore {
    json_dir: PathBuf,
}

impl StageConfigStore {
    pub fn new(json_dir: impl Into<PathBuf>) -> Self {
        Self {
            json_dir: json_dir.into(),
        }
    }

    pub fn json_dir(&self) -> &Path {
        &self.json_dir
    }

    /// Atomically writes the parameter map under a fresh name.
    pub fn persist(&self, config: &StageConfig) -> Result<PersistedStageConfig, PipelineError> {
        let bytes = serde_json::to_vec_pretty(config.parameters())?;
        let stamp = Utc::now().format(STAMP_FORMAT).to_string();

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let stem = match attempt {
                0 => format!("{}-{}-{}", config.key(), config.stage(), stamp),
                n => format!("{}-{}-{}-{}", config.key(), config.stage(), stamp, n),
            };
            let input_json = self.json_dir.join(format!("{}-input.json", stem));
            if atomic_create_bytes(&input_json, &bytes)? {
                return Ok(PersistedStageConfig {
                    input_json,
                    output_json: self.json_dir.join(format!("{}-output.json", stem)),
                });
            }
        }
        Err(PipelineError::Internal {
            message: format!(
                "no free file name for {} {} configuration in {}",
                config.key(),
                config.stage(),
                self.json_dir.display()
            ),
        })
    }

    /// Copies a persisted configuration into `artifact_dir`, next to the
    /// data it describes. Copying the same file twice is a no-op.
    pub fn archive(&self, input_json: &Path, artifact_dir: &Path) -> Result<PathBuf, PipelineError> {
        let name = input_json.file_name().ok_or_else(|| PipelineError::Internal {
            message: format!("{} has no file name", input_json.display()),
        })?;
        let target = artifact_dir.join(name);
        let bytes = fs::read(input_json).map_err(|e| PipelineError::io(input_json, e))?;
        atomic_create_bytes(&target, &bytes)?;
        Ok(target)
    }
}
