// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Builds the [`StageConfig`] of a stage from layered parameters and paths
//! derived by convention from upstream stages' declared outputs.
//!
//! The synthesizer never inspects what another stage actually produced; every
//! path is a pure function of the configuration and the task, so the same run
//! spec always yields the same configurations.

use std::path::PathBuf;
use std::sync::Arc;

use super::catalog::{PipelineStage, StageDependency};
use super::params::*;
use super::routing;
use super::stage_config::StageConfig;
use crate::config::Config;
use crate::errors::PipelineError;
use crate::layout;
use crate::run_spec::{ProbeTask, ResolvedRun};

pub struct StageConfigSynthesizer {
    config: Arc<Config>,
}

impl StageConfigSynthesizer {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Region-scoped parameters of the task's region tag.
    pub fn region_params(&self, task: &ProbeTask) -> Result<RegionParams, PipelineError> {
        resolve_region_params(
            &self.config.defaults,
            &self.config.regions,
            task.region(),
            task.probe(),
        )
    }

    /// Declared output of every run-level stage: the CatGT run directory.
    pub fn run_output(&self, run: &ResolvedRun) -> PathBuf {
        layout::catgt_run_dir(&self.config.destination, &run.run_name, &run.gates.signature())
    }

    /// Directory holding a task's artifacts, where records of its stage
    /// configurations are archived.
    pub fn artifact_dir(&self, task: &ProbeTask) -> PathBuf {
        self.catgt_probe_dir(task)
    }

    /// Declared output of a stage for one probe task.
    pub fn probe_output(&self, stage: PipelineStage, task: &ProbeTask) -> PathBuf {
        let ks_dir = self.kilosort_dir(task);
        match stage {
            PipelineStage::CatGt | PipelineStage::TPrime => self.catgt_probe_dir(task),
            PipelineStage::KilosortHelper
            | PipelineStage::KilosortPostprocessing
            | PipelineStage::NoiseTemplates => ks_dir,
            PipelineStage::PsthEvents => ks_dir.join(layout::EVENTS_FILE),
            PipelineStage::MeanWaveforms => ks_dir.join(layout::WAVEFORM_METRICS_FILE),
            PipelineStage::QualityMetrics => ks_dir.join(layout::CLUSTER_METRICS_FILE),
        }
    }

    /// Path that must exist before `stage` may start for `task`.
    pub fn required_input(&self, stage: PipelineStage, task: &ProbeTask) -> PathBuf {
        match stage.dependency() {
            StageDependency::RawRecording => layout::raw_probe_dir(
                &self.config.raw_root,
                task.run_name(),
                task.gates().first(),
                task.probe(),
            ),
            StageDependency::Stage(PipelineStage::CatGt) => self.catgt_probe_dir(task),
            StageDependency::Stage(upstream) => self.probe_output(upstream, task),
        }
    }

    /// Path that must exist before a run-level `stage` may start.
    pub fn run_required_input(&self, stage: PipelineStage, run: &ResolvedRun) -> PathBuf {
        match stage.dependency() {
            StageDependency::RawRecording => {
                layout::raw_run_dir(&self.config.raw_root, &run.run_name, run.gates.first())
            }
            StageDependency::Stage(_) => self.run_output(run),
        }
    }

    /// Synthesizes the configuration of a probe-level stage.
    ///
    /// Fails with `UnknownRegion` before anything else when the task's region
    /// has no entry in the region table, even for stages that read no
    /// region-scoped parameter.
    pub fn synthesize(
        &self,
        stage: PipelineStage,
        task: &ProbeTask,
    ) -> Result<StageConfig, PipelineError> {
        let region = self.region_params(task)?;
        let key = task.session_id();
        let ks_dir = self.kilosort_dir(task);

        match stage {
            PipelineStage::KilosortHelper => {
                let ks = &self.config.kilosort;
                let params = KilosortParams {
                    continuous_file: layout::tcat_ap_file(
                        &self.config.destination,
                        task.run_name(),
                        &task.gates().signature(),
                        task.probe(),
                    ),
                    kilosort_output_directory: ks_dir,
                    input_meta_path: layout::raw_meta_file(
                        &self.config.raw_root,
                        task.run_name(),
                        task.gates().first(),
                        task.triggers().first,
                        task.probe(),
                    ),
                    ks_make_copy: self.make_copy(),
                    ks_threshold: region.ks_threshold_string(),
                    ks_rem_dup: flag(ks.remove_duplicates),
                    ks_save_rez: flag(ks.save_rez),
                    ks_copy_fproc: flag(ks.copy_fproc),
                    ks_minfr_goodchannels: region.minfr_goodchannels,
                    ks_whitening_radius_um: ks.whitening_radius_um,
                    ks_template_radius_um: ks.template_radius_um,
                    ks_final_splits: flag(ks.final_splits),
                    ks_label_good: flag(ks.label_good),
                    ks_csb_seed: ks.csb_seed,
                    ks_lt_seed: ks.lt_seed,
                };
                StageConfig::from_params(stage, key, &params)
            }
            PipelineStage::KilosortPostprocessing => StageConfig::from_params(
                stage,
                key,
                &PostprocessingParams {
                    kilosort_output_directory: ks_dir,
                    ks_make_copy: self.make_copy(),
                },
            ),
            PipelineStage::NoiseTemplates => StageConfig::from_params(
                stage,
                key,
                &NoiseTemplatesParams {
                    kilosort_output_directory: ks_dir,
                    noise_template_use_rf: self.config.kilosort.noise_template_use_rf,
                },
            ),
            PipelineStage::PsthEvents => StageConfig::from_params(
                stage,
                key,
                &PsthEventsParams {
                    events_file: ks_dir.join(layout::EVENTS_FILE),
                    kilosort_output_directory: ks_dir,
                    extracted_data_directory: layout::catgt_run_dir(
                        &self.config.destination,
                        task.run_name(),
                        &task.gates().signature(),
                    ),
                    event_ex_param_str: self.config.psth_events.event_ex_param_str.clone(),
                },
            ),
            PipelineStage::MeanWaveforms => StageConfig::from_params(
                stage,
                key,
                &MeanWaveformsParams {
                    continuous_file: layout::tcat_ap_file(
                        &self.config.destination,
                        task.run_name(),
                        &task.gates().signature(),
                        task.probe(),
                    ),
                    waveform_metrics_file: ks_dir.join(layout::WAVEFORM_METRICS_FILE),
                    kilosort_output_directory: ks_dir,
                    c_waves_snr_um: self.config.mean_waveforms.c_waves_snr_um,
                },
            ),
            PipelineStage::QualityMetrics => StageConfig::from_params(
                stage,
                key,
                &QualityMetricsParams {
                    qm_isi_thresh: region.isi_threshold_s(),
                    cluster_metrics_file: ks_dir.join(layout::CLUSTER_METRICS_FILE),
                    waveform_metrics_file: ks_dir.join(layout::WAVEFORM_METRICS_FILE),
                    kilosort_output_directory: ks_dir,
                },
            ),
            PipelineStage::CatGt | PipelineStage::TPrime => Err(PipelineError::InvalidParameters {
                stage,
                reason: "run-level stage synthesized for a single probe".to_string(),
            }),
        }
    }

    /// Synthesizes the configuration of a run-level stage over the run's tasks.
    pub fn synthesize_run_level(
        &self,
        stage: PipelineStage,
        run: &ResolvedRun,
    ) -> Result<StageConfig, PipelineError> {
        let probes = run.probes();
        let Some(first_probe) = probes.first().copied() else {
            return Err(PipelineError::InvalidParameters {
                stage,
                reason: format!("run {} has no probe tasks", run.run_key()),
            });
        };
        let catgt = &self.config.catgt;
        let signature = run.gates.signature();
        let run_dir = layout::catgt_run_dir(&self.config.destination, &run.run_name, &signature);

        match stage {
            PipelineStage::CatGt => {
                let lines = routing::routing_lines(catgt, &probes);
                let params = CatGtParams {
                    npx_directory: self.config.raw_root.clone(),
                    input_meta_path: layout::raw_meta_file(
                        &self.config.raw_root,
                        &run.run_name,
                        run.gates.first(),
                        run.triggers.first,
                        first_probe,
                    ),
                    continuous_file: layout::raw_ap_file(
                        &self.config.raw_root,
                        &run.run_name,
                        run.gates.first(),
                        run.triggers.first,
                        first_probe,
                    ),
                    run_name: run.run_name.clone(),
                    gate_string: run.gates.span_string(),
                    gate_list_string: signature,
                    trigger_string: run.triggers.to_catgt_string(),
                    probe_string: run.probe_string(),
                    stream_string: routing::stream_string(catgt).to_string(),
                    car_mode: catgt.car_mode.as_tool_str().to_string(),
                    loccar_min_um: catgt.loccar_inner_um,
                    loccar_max_um: catgt.loccar_outer_um,
                    cmd_string: format!("{} {}", catgt.command, lines.join(" ")),
                    extract_string: lines.join("\n"),
                    extracted_data_directory: self.config.destination.clone(),
                };
                StageConfig::from_params(stage, run.run_key(), &params)
            }
            PipelineStage::TPrime => {
                let tprime = &self.config.tprime;
                let params = TPrimeParams {
                    run_name: run.run_name.clone(),
                    gate_string: run.gates.span_string(),
                    gate_list_string: signature,
                    probe_string: run.probe_string(),
                    extracted_data_directory: run_dir,
                    im_ex_list: routing::imec_sync_list(catgt, &probes),
                    ni_ex_list: routing::ni_entries(catgt).join(" "),
                    event_ex_param_str: self.config.psth_events.event_ex_param_str.clone(),
                    sync_period: tprime.sync_period,
                    to_stream_sync_params: tprime.to_stream_sync_params.clone(),
                    ni_stream_sync_params: if catgt.ni_present {
                        tprime.ni_stream_sync_params.clone()
                    } else {
                        None
                    },
                    kilosort_output_directories: run
                        .tasks
                        .iter()
                        .map(|task| self.kilosort_dir(task))
                        .collect(),
                };
                StageConfig::from_params(stage, run.run_key(), &params)
            }
            other => Err(PipelineError::InvalidParameters {
                stage: other,
                reason: "probe-level stage synthesized for a whole run".to_string(),
            }),
        }
    }

    fn catgt_probe_dir(&self, task: &ProbeTask) -> PathBuf {
        layout::catgt_probe_dir(
            &self.config.destination,
            task.run_name(),
            &task.gates().signature(),
            task.probe(),
        )
    }

    fn kilosort_dir(&self, task: &ProbeTask) -> PathBuf {
        layout::kilosort_output_dir(
            &self.config.destination,
            task.run_name(),
            &task.gates().signature(),
            task.probe(),
        )
    }

    /// Postprocessing and noise templates alter sorter output in place.
    fn make_copy(&self) -> bool {
        self.config.is_selected(PipelineStage::KilosortPostprocessing)
            || self.config.is_selected(PipelineStage::NoiseTemplates)
    }
}

fn flag(value: bool) -> u8 {
    u8::from(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run_spec::{GateList, TriggerPair};
    use serde_json::json;

    fn config(stages: &str) -> Arc<Config> {
        let yaml = format!(
            r#"
raw_root: /raw
destination: /dest
stages: {}
defaults:
  minfr_goodchannels: 0.1
regions:
  cortex:
    ks_threshold: [9, 4]
  medulla:
    refractory_period_ms: 1.5
catgt:
  ni_extract: ["-XA=1,2.5,2.49,0"]
run_specs:
  - run_name: sess1
    gates: "0,2"
    triggers: "start,end"
    probes: "0,1"
    regions: [cortex, medulla]
"#,
            stages
        );
        Arc::new(serde_yaml::from_str(&yaml).unwrap())
    }

    fn task(probe: &str, region: &str) -> ProbeTask {
        ProbeTask::new(
            "sess1",
            GateList::new([0, 1, 2]).unwrap(),
            TriggerPair { first: 0, last: 5 },
            probe,
            region,
        )
    }

    fn run(tasks: Vec<ProbeTask>) -> ResolvedRun {
        ResolvedRun {
            run_name: "sess1".to_string(),
            gates: GateList::new([0, 1, 2]).unwrap(),
            triggers: TriggerPair { first: 0, last: 5 },
            tasks,
        }
    }

    #[test]
    fn test_kilosort_config_layers_region_and_derives_paths() {
        let synth = StageConfigSynthesizer::new(config("[catgt, kilosort_helper, noise_templates]"));
        let cfg = synth
            .synthesize(PipelineStage::KilosortHelper, &task("0", "cortex"))
            .unwrap();

        assert_eq!(cfg.key(), "sess1_g0-2_imec0");
        assert_eq!(cfg.get("ks_Th"), Some(&json!("[9,4]")));
        assert_eq!(cfg.get("ks_minfr_goodchannels"), Some(&json!(0.1)));
        assert_eq!(cfg.get("ks_make_copy"), Some(&json!(true)));
        assert_eq!(
            cfg.get("continuous_file"),
            Some(&json!("/dest/catgt_sess1_g0-2/sess1_g0-2_imec0/sess1_g0-2_tcat.imec0.ap.bin"))
        );
        assert_eq!(
            cfg.get("kilosort_output_directory"),
            Some(&json!("/dest/catgt_sess1_g0-2/sess1_g0-2_imec0/imec0_ks2"))
        );
        assert_eq!(
            cfg.get("input_meta_path"),
            Some(&json!("/raw/sess1_g0/sess1_g0_imec0/sess1_g0_t0.imec0.ap.meta"))
        );
    }

    #[test]
    fn test_make_copy_off_without_postprocessing() {
        let synth = StageConfigSynthesizer::new(config("[kilosort_helper]"));
        let cfg = synth
            .synthesize(PipelineStage::KilosortHelper, &task("0", "cortex"))
            .unwrap();
        assert_eq!(cfg.get("ks_make_copy"), Some(&json!(false)));
    }

    #[test]
    fn test_quality_metrics_isi_threshold_from_region() {
        let synth = StageConfigSynthesizer::new(config("[quality_metrics]"));
        let cfg = synth
            .synthesize(PipelineStage::QualityMetrics, &task("1", "medulla"))
            .unwrap();
        assert_eq!(cfg.get("qm_isi_thresh"), Some(&json!(0.0015)));
    }

    #[test]
    fn test_unknown_region_fails_for_every_probe_stage() {
        let synth = StageConfigSynthesizer::new(config("[mean_waveforms]"));
        for stage in [PipelineStage::MeanWaveforms, PipelineStage::NoiseTemplates] {
            let err = synth.synthesize(stage, &task("0", "thalamus")).unwrap_err();
            assert_eq!(err.kind(), "unknown_region");
        }
    }

    #[test]
    fn test_synthesis_is_deterministic() {
        let synth = StageConfigSynthesizer::new(config("[mean_waveforms]"));
        let a = synth.synthesize(PipelineStage::MeanWaveforms, &task("0", "cortex")).unwrap();
        let b = synth.synthesize(PipelineStage::MeanWaveforms, &task("0", "cortex")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_catgt_config_carries_routing() {
        let synth = StageConfigSynthesizer::new(config("[catgt]"));
        let cfg = synth
            .synthesize_run_level(
                PipelineStage::CatGt,
                &run(vec![task("0", "cortex"), task("1", "medulla")]),
            )
            .unwrap();

        assert_eq!(cfg.key(), "sess1_g0-2");
        assert_eq!(cfg.get("gate_string"), Some(&json!("0,2")));
        assert_eq!(cfg.get("gate_list_string"), Some(&json!("0-2")));
        assert_eq!(cfg.get("trigger_string"), Some(&json!("0,5")));
        assert_eq!(cfg.get("probe_string"), Some(&json!("0,1")));
        assert_eq!(cfg.get("catGT_stream_string"), Some(&json!("-ap -ni -lf")));
        assert_eq!(
            cfg.get("extract_string"),
            Some(&json!("-XA=0,1,3,500 -XA=1,2.5,2.49,0 -SY=0,-1,6,500\n-SY=1,-1,6,500"))
        );
        let cmd = cfg.get("catGT_cmd_string").unwrap().as_str().unwrap();
        assert!(cmd.ends_with("-XA=0,1,3,500 -XA=1,2.5,2.49,0 -SY=0,-1,6,500 -SY=1,-1,6,500"));
    }

    #[test]
    fn test_tprime_config_lists_every_probe() {
        let synth = StageConfigSynthesizer::new(config("[catgt, tprime]"));
        let cfg = synth
            .synthesize_run_level(
                PipelineStage::TPrime,
                &run(vec![task("0", "cortex"), task("1", "medulla")]),
            )
            .unwrap();
        assert_eq!(
            cfg.get("tPrime_im_ex_list"),
            Some(&json!("-SY=0,-1,6,500 -SY=1,-1,6,500"))
        );
        assert_eq!(
            cfg.get("extracted_data_directory"),
            Some(&json!("/dest/catgt_sess1_g0-2"))
        );
        let dirs = cfg.get("kilosort_output_directories").unwrap().as_array().unwrap();
        assert_eq!(dirs.len(), 2);
    }

    #[test]
    fn test_scope_mismatch_is_rejected() {
        let synth = StageConfigSynthesizer::new(config("[catgt]"));
        let err = synth
            .synthesize(PipelineStage::CatGt, &task("0", "cortex"))
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_parameters");

        let err = synth
            .synthesize_run_level(PipelineStage::QualityMetrics, &run(vec![task("0", "cortex")]))
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_parameters");
    }

    #[test]
    fn test_required_inputs_follow_dependencies() {
        let synth = StageConfigSynthesizer::new(config("[catgt]"));
        let t = task("1", "medulla");
        assert_eq!(
            synth.required_input(PipelineStage::CatGt, &t),
            PathBuf::from("/raw/sess1_g0/sess1_g0_imec1")
        );
        assert_eq!(
            synth.required_input(PipelineStage::KilosortHelper, &t),
            PathBuf::from("/dest/catgt_sess1_g0-2/sess1_g0-2_imec1")
        );
        assert_eq!(
            synth.required_input(PipelineStage::QualityMetrics, &t),
            PathBuf::from("/dest/catgt_sess1_g0-2/sess1_g0-2_imec1/imec1_ks2")
        );
        assert_eq!(
            synth.probe_output(PipelineStage::QualityMetrics, &t),
            PathBuf::from("/dest/catgt_sess1_g0-2/sess1_g0-2_imec1/imec1_ks2/metrics.csv")
        );
    }
}
