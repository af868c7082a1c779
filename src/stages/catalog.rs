// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The fixed, ordered catalog of pipeline stages.
//!
//! Every stage is tagged with its scope and the single upstream dependency whose
//! declared output it reads. The declaration order of [`PipelineStage`] is the
//! execution order; the order a configuration lists stages in is irrelevant.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Filtering, artifact removal and multi-gate concatenation.
    #[serde(rename = "catgt")]
    CatGt,
    KilosortHelper,
    KilosortPostprocessing,
    NoiseTemplates,
    PsthEvents,
    MeanWaveforms,
    QualityMetrics,
    /// Cross-stream clock alignment.
    #[serde(rename = "tprime")]
    TPrime,
}

/// Whether a stage runs once per run spec or once per probe task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageScope {
    RunLevel,
    ProbeLevel,
}

/// What must exist on disk before a stage may start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageDependency {
    /// The raw probe folder of the first gate.
    RawRecording,
    /// The declared output of another stage for the same task.
    Stage(PipelineStage),
}

impl PipelineStage {
    const CATALOG: [PipelineStage; 8] = [
        PipelineStage::CatGt,
        PipelineStage::KilosortHelper,
        PipelineStage::KilosortPostprocessing,
        PipelineStage::NoiseTemplates,
        PipelineStage::PsthEvents,
        PipelineStage::MeanWaveforms,
        PipelineStage::QualityMetrics,
        PipelineStage::TPrime,
    ];

    /// Every stage, in execution order.
    pub fn all() -> &'static [PipelineStage] {
        &Self::CATALOG
    }

    pub fn name(&self) -> &'static str {
        match self {
            PipelineStage::CatGt => "catgt",
            PipelineStage::KilosortHelper => "kilosort_helper",
            PipelineStage::KilosortPostprocessing => "kilosort_postprocessing",
            PipelineStage::NoiseTemplates => "noise_templates",
            PipelineStage::PsthEvents => "psth_events",
            PipelineStage::MeanWaveforms => "mean_waveforms",
            PipelineStage::QualityMetrics => "quality_metrics",
            PipelineStage::TPrime => "tprime",
        }
    }

    /// Module name of the external tool implementing this stage.
    pub fn module(&self) -> &'static str {
        match self {
            PipelineStage::CatGt => "catGT_helper",
            PipelineStage::TPrime => "tPrime_helper",
            other => other.name(),
        }
    }

    pub fn scope(&self) -> StageScope {
        match self {
            PipelineStage::CatGt | PipelineStage::TPrime => StageScope::RunLevel,
            _ => StageScope::ProbeLevel,
        }
    }

    pub fn is_run_level(&self) -> bool {
        self.scope() == StageScope::RunLevel
    }

    pub fn dependency(&self) -> StageDependency {
        match self {
            PipelineStage::CatGt => StageDependency::RawRecording,
            PipelineStage::KilosortHelper | PipelineStage::TPrime => {
                StageDependency::Stage(PipelineStage::CatGt)
            }
            _ => StageDependency::Stage(PipelineStage::KilosortHelper),
        }
    }

    /// Restricts the catalog to `selected`, keeping catalog order.
    pub fn in_catalog_order(selected: &[PipelineStage]) -> Vec<PipelineStage> {
        Self::CATALOG
            .iter()
            .copied()
            .filter(|stage| selected.contains(stage))
            .collect()
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_follows_catalog_order() {
        let selected = [
            PipelineStage::QualityMetrics,
            PipelineStage::TPrime,
            PipelineStage::KilosortHelper,
            PipelineStage::CatGt,
        ];
        assert_eq!(
            PipelineStage::in_catalog_order(&selected),
            vec![
                PipelineStage::CatGt,
                PipelineStage::KilosortHelper,
                PipelineStage::QualityMetrics,
                PipelineStage::TPrime,
            ]
        );
    }

    #[test]
    fn test_scopes_and_dependencies() {
        assert!(PipelineStage::CatGt.is_run_level());
        assert!(PipelineStage::TPrime.is_run_level());
        assert!(!PipelineStage::MeanWaveforms.is_run_level());
        assert_eq!(
            PipelineStage::MeanWaveforms.dependency(),
            StageDependency::Stage(PipelineStage::KilosortHelper)
        );
        assert_eq!(PipelineStage::CatGt.dependency(), StageDependency::RawRecording);
    }

    #[test]
    fn test_names_round_trip_through_yaml() {
        let stages: Vec<PipelineStage> =
            serde_yaml::from_str("[catgt, kilosort_helper, tprime]").unwrap();
        assert_eq!(
            stages,
            vec![PipelineStage::CatGt, PipelineStage::KilosortHelper, PipelineStage::TPrime]
        );
        for stage in PipelineStage::all() {
            let yaml = serde_yaml::to_string(stage).unwrap();
            assert_eq!(yaml.trim(), stage.name());
        }
        assert!(serde_yaml::from_str::<PipelineStage>("spike_sort").is_err());
    }

    #[test]
    fn test_module_names() {
        assert_eq!(PipelineStage::CatGt.module(), "catGT_helper");
        assert_eq!(PipelineStage::TPrime.module(), "tPrime_helper");
        assert_eq!(PipelineStage::NoiseTemplates.module(), "noise_templates");
    }
}
