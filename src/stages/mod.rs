// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Stage catalog, typed stage parameters and stage configuration synthesis.

mod catalog;
pub mod params;
pub mod routing;
mod stage_config;
mod synthesizer;
pub mod tool_logs;

pub use catalog::{PipelineStage, StageDependency, StageScope};
pub use params::RegionParams;
pub use stage_config::{PersistedStageConfig, StageConfig, StageConfigStore};
pub use synthesizer::StageConfigSynthesizer;
pub use tool_logs::GfixEdits;
