// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::sync::Arc;

use crate::backends::process::ProcessStageRunner;
use crate::config::Config;
use crate::engine::Orchestrator;
use crate::traits::StageRunner;

/// Pipeline runtime builder - wires the stage runner and orchestrator from
/// configuration.
///
/// # Examples
///
/// ```
/// use sglx_pipeline::config::{Config, RuntimeBuilder};
/// use std::sync::Arc;
///
/// let config: Config = serde_yaml::from_str(
///     "raw_root: /raw\ndestination: /dest\nstages: [catgt]\nrun_specs: []\n",
/// )
/// .unwrap();
///
/// let orchestrator = RuntimeBuilder::from_config(Arc::new(config));
/// assert_eq!(orchestrator.config().runner.program(), "python");
/// ```
pub struct RuntimeBuilder;

impl RuntimeBuilder {
    /// Orchestrator launching every stage as a child process per `config.runner`.
    pub fn from_config(config: Arc<Config>) -> Orchestrator {
        let runner: Arc<dyn StageRunner> = Arc::new(
            ProcessStageRunner::from_config(&config.runner).in_directory(config.tool_log_directory()),
        );
        Orchestrator::new(config, runner)
    }

    /// Orchestrator driving stages through a caller-supplied runner.
    pub fn with_runner(config: Arc<Config>, runner: Arc<dyn StageRunner>) -> Orchestrator {
        Orchestrator::new(config, runner)
    }
}
