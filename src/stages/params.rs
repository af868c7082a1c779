// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Typed parameter records, one per stage.
//!
//! Each record carries only the fields its external module reads and is
//! serialized into the stage's [`StageConfig`](super::StageConfig). Field names
//! on the wire follow the external modules' spelling.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::consts::{
    DEFAULT_KS_THRESHOLD, DEFAULT_MINFR_GOODCHANNELS, DEFAULT_REFRACTORY_PERIOD_MS,
};
use crate::config::RegionOverrides;
use crate::errors::PipelineError;

/// Region-scoped parameters after layering built-ins, defaults and one region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionParams {
    pub ks_threshold: [u32; 2],
    pub refractory_period_ms: f64,
    pub minfr_goodchannels: f64,
}

impl RegionParams {
    pub fn builtin() -> Self {
        Self {
            ks_threshold: DEFAULT_KS_THRESHOLD,
            refractory_period_ms: DEFAULT_REFRACTORY_PERIOD_MS,
            minfr_goodchannels: DEFAULT_MINFR_GOODCHANNELS,
        }
    }

    /// Returns a copy with every field `overrides` sets replaced.
    pub fn overlay(&self, overrides: &RegionOverrides) -> Self {
        Self {
            ks_threshold: overrides.ks_threshold.unwrap_or(self.ks_threshold),
            refractory_period_ms: overrides
                .refractory_period_ms
                .unwrap_or(self.refractory_period_ms),
            minfr_goodchannels: overrides
                .minfr_goodchannels
                .unwrap_or(self.minfr_goodchannels),
        }
    }

    /// Kilosort's `[a,b]` threshold notation.
    pub fn ks_threshold_string(&self) -> String {
        format!("[{},{}]", self.ks_threshold[0], self.ks_threshold[1])
    }

    /// ISI violation threshold in seconds.
    pub fn isi_threshold_s(&self) -> f64 {
        self.refractory_period_ms / 1000.0
    }
}

/// Layers built-ins, then `defaults`, then `regions[region]`.
///
/// A region missing from the table is an error, never a silent fallback to
/// the defaults.
pub fn resolve_region_params(
    defaults: &RegionOverrides,
    regions: &BTreeMap<String, RegionOverrides>,
    region: &str,
    probe: &str,
) -> Result<RegionParams, PipelineError> {
    let overrides = regions
        .get(region)
        .ok_or_else(|| PipelineError::UnknownRegion {
            region: region.to_string(),
            probe: probe.to_string(),
        })?;
    Ok(RegionParams::builtin().overlay(defaults).overlay(overrides))
}

#[derive(Debug, Clone, Serialize)]
pub struct CatGtParams {
    pub npx_directory: PathBuf,
    pub input_meta_path: PathBuf,
    pub continuous_file: PathBuf,
    #[serde(rename = "catGT_run_name")]
    pub run_name: String,
    pub gate_string: String,
    pub gate_list_string: String,
    pub trigger_string: String,
    pub probe_string: String,
    #[serde(rename = "catGT_stream_string")]
    pub stream_string: String,
    #[serde(rename = "catGT_car_mode")]
    pub car_mode: String,
    #[serde(rename = "catGT_loccar_min_um")]
    pub loccar_min_um: u32,
    #[serde(rename = "catGT_loccar_max_um")]
    pub loccar_max_um: u32,
    #[serde(rename = "catGT_cmd_string")]
    pub cmd_string: String,
    /// One line per probe; see [`routing`](super::routing).
    pub extract_string: String,
    pub extracted_data_directory: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct KilosortParams {
    pub continuous_file: PathBuf,
    pub kilosort_output_directory: PathBuf,
    pub input_meta_path: PathBuf,
    pub ks_make_copy: bool,
    #[serde(rename = "ks_Th")]
    pub ks_threshold: String,
    #[serde(rename = "ks_remDup")]
    pub ks_rem_dup: u8,
    #[serde(rename = "ks_saveRez")]
    pub ks_save_rez: u8,
    pub ks_copy_fproc: u8,
    pub ks_minfr_goodchannels: f64,
    #[serde(rename = "ks_whiteningRadius_um")]
    pub ks_whitening_radius_um: u32,
    #[serde(rename = "ks_templateRadius_um")]
    pub ks_template_radius_um: u32,
    #[serde(rename = "ks_finalSplits")]
    pub ks_final_splits: u8,
    #[serde(rename = "ks_labelGood")]
    pub ks_label_good: u8,
    #[serde(rename = "ks_CSBseed")]
    pub ks_csb_seed: u32,
    #[serde(rename = "ks_LTseed")]
    pub ks_lt_seed: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostprocessingParams {
    pub kilosort_output_directory: PathBuf,
    pub ks_make_copy: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct NoiseTemplatesParams {
    pub kilosort_output_directory: PathBuf,
    pub noise_template_use_rf: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PsthEventsParams {
    pub kilosort_output_directory: PathBuf,
    pub extracted_data_directory: PathBuf,
    pub event_ex_param_str: String,
    pub events_file: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeanWaveformsParams {
    pub continuous_file: PathBuf,
    pub kilosort_output_directory: PathBuf,
    #[serde(rename = "c_Waves_snr_um")]
    pub c_waves_snr_um: u32,
    pub waveform_metrics_file: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct QualityMetricsParams {
    pub kilosort_output_directory: PathBuf,
    pub qm_isi_thresh: f64,
    pub cluster_metrics_file: PathBuf,
    pub waveform_metrics_file: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct TPrimeParams {
    #[serde(rename = "catGT_run_name")]
    pub run_name: String,
    pub gate_string: String,
    pub gate_list_string: String,
    pub probe_string: String,
    pub extracted_data_directory: PathBuf,
    #[serde(rename = "tPrime_im_ex_list")]
    pub im_ex_list: String,
    #[serde(rename = "tPrime_ni_ex_list")]
    pub ni_ex_list: String,
    pub event_ex_param_str: String,
    pub sync_period: f64,
    #[serde(rename = "toStream_sync_params")]
    pub to_stream_sync_params: String,
    #[serde(rename = "niStream_sync_params")]
    pub ni_stream_sync_params: Option<String>,
    pub kilosort_output_directories: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> BTreeMap<String, RegionOverrides> {
        let mut regions = BTreeMap::new();
        regions.insert(
            "cortex".to_string(),
            RegionOverrides {
                ks_threshold: Some([9, 4]),
                ..RegionOverrides::default()
            },
        );
        regions.insert(
            "medulla".to_string(),
            RegionOverrides {
                refractory_period_ms: Some(1.5),
                ..RegionOverrides::default()
            },
        );
        regions
    }

    #[test]
    fn test_layering_order() {
        let defaults = RegionOverrides {
            ks_threshold: Some([12, 5]),
            minfr_goodchannels: Some(0.1),
            ..RegionOverrides::default()
        };

        let cortex = resolve_region_params(&defaults, &table(), "cortex", "0").unwrap();
        assert_eq!(cortex.ks_threshold, [9, 4]);
        assert_eq!(cortex.minfr_goodchannels, 0.1);
        assert_eq!(cortex.refractory_period_ms, 2.0);

        let medulla = resolve_region_params(&defaults, &table(), "medulla", "1").unwrap();
        assert_eq!(medulla.ks_threshold, [12, 5]);
        assert_eq!(medulla.refractory_period_ms, 1.5);
    }

    #[test]
    fn test_unknown_region_never_falls_back() {
        let err = resolve_region_params(&RegionOverrides::default(), &table(), "thalamus", "2")
            .unwrap_err();
        match err {
            PipelineError::UnknownRegion { region, probe } => {
                assert_eq!(region, "thalamus");
                assert_eq!(probe, "2");
            }
            other => panic!("expected UnknownRegion, got {:?}", other),
        }
    }

    #[test]
    fn test_derived_values() {
        let params = RegionParams::builtin();
        assert_eq!(params.ks_threshold_string(), "[10,4]");
        assert!((params.isi_threshold_s() - 0.002).abs() < 1e-12);
    }

    #[test]
    fn test_wire_names() {
        let params = QualityMetricsParams {
            kilosort_output_directory: PathBuf::from("/ks"),
            qm_isi_thresh: 0.002,
            cluster_metrics_file: PathBuf::from("/ks/metrics.csv"),
            waveform_metrics_file: PathBuf::from("/ks/waveform_metrics.csv"),
        };
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value["qm_isi_thresh"], 0.002);

        let params = MeanWaveformsParams {
            continuous_file: PathBuf::from("/a.bin"),
            kilosort_output_directory: PathBuf::from("/ks"),
            c_waves_snr_um: 160,
            waveform_metrics_file: PathBuf::from("/ks/waveform_metrics.csv"),
        };
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value["c_Waves_snr_um"], 160);
    }
}
