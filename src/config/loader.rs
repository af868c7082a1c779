// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::consts::*;
use crate::errors::ConfigError;
use crate::run_spec::RunSpec;
use crate::stages::PipelineStage;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure for a sorting batch.
///
/// One YAML document describes where the raw recordings live, where
/// everything derived from them goes, which stages run, the parameter layers
/// applied to each stage, and the run specs to process. Loaded once and shared
/// read-only for the whole batch.
///
/// # Fields
/// * `raw_root` - Root of the raw acquisition tree (`<run>_g<gate>` folders)
/// * `destination` - Root of CatGT output, sorter output and the ledger
/// * `json_directory` - Where persisted stage configurations go (optional, defaults to `destination`)
/// * `ledger` - Provenance ledger options (optional)
/// * `runner` - How external stage modules are launched (optional)
/// * `executor_options` - Probe task concurrency (optional)
/// * `stages` - Stages to execute; always run in catalog order
/// * `defaults` - Global values for region-scoped parameters (optional)
/// * `regions` - Per-region overrides keyed by region tag
/// * `run_specs` - The recording runs to process, in order
///
/// # Example
/// ```yaml
/// raw_root: /data/raw
/// destination: /data/sorted
/// stages: [catgt, kilosort_helper, quality_metrics]
/// regions:
///   cortex:
///     ks_threshold: [9, 4]
/// run_specs:
///   - run_name: sess1
///     gates: "0,2"
///     triggers: "start,end"
///     probes: "0:1"
///     regions: [cortex, cortex]
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub raw_root: PathBuf,
    pub destination: PathBuf,
    #[serde(default)]
    pub json_directory: Option<PathBuf>,
    #[serde(default)]
    pub ledger: LedgerOptions,
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub executor_options: ExecutorOptions,
    pub stages: Vec<PipelineStage>,
    #[serde(default)]
    pub defaults: RegionOverrides,
    #[serde(default)]
    pub regions: BTreeMap<String, RegionOverrides>,
    #[serde(default)]
    pub catgt: CatGtOptions,
    #[serde(default)]
    pub kilosort: KilosortOptions,
    #[serde(default)]
    pub mean_waveforms: MeanWaveformsOptions,
    #[serde(default)]
    pub psth_events: PsthEventsOptions,
    #[serde(default)]
    pub tprime: TPrimeOptions,
    pub run_specs: Vec<RunSpec>,
}

impl Config {
    pub fn json_directory(&self) -> &Path {
        self.json_directory.as_deref().unwrap_or(&self.destination)
    }

    /// Working directory of every stage process, where the tools keep their logs.
    pub fn tool_log_directory(&self) -> &Path {
        self.runner
            .working_directory
            .as_deref()
            .unwrap_or(&self.destination)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.destination.join(self.ledger.file_name())
    }

    /// Selected stages in execution order.
    pub fn selected_stages(&self) -> Vec<PipelineStage> {
        PipelineStage::in_catalog_order(&self.stages)
    }

    pub fn is_selected(&self, stage: PipelineStage) -> bool {
        self.stages.contains(&stage)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerOptions {
    pub file_name: Option<String>,
}

impl LedgerOptions {
    pub fn file_name(&self) -> &str {
        self.file_name.as_deref().unwrap_or(DEFAULT_LEDGER_FILE)
    }
}

/// How an external stage process is launched:
/// `<program> <args..> <module_prefix><module> --input_json <in> --output_json <out>`
///
/// # Example
/// ```yaml
/// runner:
///   program: /opt/conda/envs/ecephys/bin/python
///   args: ["-W", "ignore", "-m"]
///   module_prefix: ecephys_spike_sorting.modules.
///   working_directory: /data/sorted/logs
/// ```
///
/// Stage processes run in `working_directory` (defaults to `destination`),
/// which is where CatGT, TPrime and C_Waves write their logs.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunnerConfig {
    pub program: Option<String>,
    pub args: Option<Vec<String>>,
    pub module_prefix: Option<String>,
    pub working_directory: Option<PathBuf>,
}

impl RunnerConfig {
    pub fn program(&self) -> &str {
        self.program.as_deref().unwrap_or(DEFAULT_RUNNER_PROGRAM)
    }

    pub fn args(&self) -> Vec<String> {
        match &self.args {
            Some(args) => args.clone(),
            None => DEFAULT_RUNNER_ARGS.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn module_prefix(&self) -> &str {
        self.module_prefix.as_deref().unwrap_or(DEFAULT_MODULE_PREFIX)
    }
}

/// Executor-specific configuration options.
///
/// # Fields
/// * `max_concurrency` - Maximum number of probe tasks sorted at once (optional, defaults to 1)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutorOptions {
    pub max_concurrency: Option<usize>,
}

impl ExecutorOptions {
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency.unwrap_or(DEFAULT_MAX_CONCURRENCY)
    }
}

/// Region-scoped parameters. Every field is optional so the same record
/// serves as the global `defaults` layer and as a per-region override.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegionOverrides {
    pub ks_threshold: Option<[u32; 2]>,
    pub refractory_period_ms: Option<f64>,
    pub minfr_goodchannels: Option<f64>,
}

impl RegionOverrides {
    pub fn is_empty(&self) -> bool {
        self.ks_threshold.is_none()
            && self.refractory_period_ms.is_none()
            && self.minfr_goodchannels.is_none()
    }
}

/// Common average referencing applied by CatGT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarMode {
    #[serde(alias = "None")]
    None,
    Gbldmx,
    Loccar,
}

impl CarMode {
    /// Spelling CatGT's helper expects.
    pub fn as_tool_str(&self) -> &'static str {
        match self {
            CarMode::None => "None",
            CarMode::Gbldmx => "gbldmx",
            CarMode::Loccar => "loccar",
        }
    }
}

/// CatGT preprocessing options.
///
/// # Example
/// ```yaml
/// catgt:
///   car_mode: loccar
///   loccar_inner_um: 40
///   loccar_outer_um: 160
///   ni_present: true
///   ni_extract: ["-XA=1,2.5,2.49,0", "-XD=2,0,0"]
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatGtOptions {
    pub car_mode: CarMode,
    pub loccar_inner_um: u32,
    pub loccar_outer_um: u32,
    pub command: String,
    /// Route the NI auxiliary stream along with the first probe.
    pub ni_present: bool,
    /// Primary clock-reference extraction on the NI stream.
    pub ni_clock_extract: String,
    /// Remaining NI extractions, in the order CatGT should see them.
    pub ni_extract: Vec<String>,
    /// Parameters following `-SY=<probe>,` for every probe.
    pub sync_extract_params: String,
}

impl Default for CatGtOptions {
    fn default() -> Self {
        Self {
            car_mode: CarMode::Gbldmx,
            loccar_inner_um: DEFAULT_LOCCAR_INNER_UM,
            loccar_outer_um: DEFAULT_LOCCAR_OUTER_UM,
            command: DEFAULT_CATGT_COMMAND.to_string(),
            ni_present: true,
            ni_clock_extract: DEFAULT_NI_CLOCK_EXTRACT.to_string(),
            ni_extract: Vec::new(),
            sync_extract_params: DEFAULT_SYNC_EXTRACT_PARAMS.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KilosortOptions {
    pub remove_duplicates: bool,
    pub save_rez: bool,
    pub copy_fproc: bool,
    pub template_radius_um: u32,
    pub whitening_radius_um: u32,
    pub final_splits: bool,
    pub label_good: bool,
    pub csb_seed: u32,
    pub lt_seed: u32,
    pub noise_template_use_rf: bool,
}

impl Default for KilosortOptions {
    fn default() -> Self {
        Self {
            remove_duplicates: false,
            save_rez: true,
            copy_fproc: false,
            template_radius_um: DEFAULT_KS_TEMPLATE_RADIUS_UM,
            whitening_radius_um: DEFAULT_KS_WHITENING_RADIUS_UM,
            final_splits: true,
            label_good: true,
            csb_seed: DEFAULT_KS_SEED,
            lt_seed: DEFAULT_KS_SEED,
            noise_template_use_rf: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MeanWaveformsOptions {
    pub c_waves_snr_um: u32,
}

impl Default for MeanWaveformsOptions {
    fn default() -> Self {
        Self {
            c_waves_snr_um: DEFAULT_C_WAVES_SNR_UM,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PsthEventsOptions {
    pub event_ex_param_str: String,
}

impl Default for PsthEventsOptions {
    fn default() -> Self {
        Self {
            event_ex_param_str: DEFAULT_EVENT_EX_PARAMS.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TPrimeOptions {
    pub sync_period: f64,
    pub to_stream_sync_params: String,
    /// `None` when no auxiliary stream was recorded.
    pub ni_stream_sync_params: Option<String>,
}

impl Default for TPrimeOptions {
    fn default() -> Self {
        Self {
            sync_period: DEFAULT_SYNC_PERIOD_S,
            to_stream_sync_params: DEFAULT_TO_STREAM_SYNC_PARAMS.to_string(),
            ni_stream_sync_params: Some(DEFAULT_NI_STREAM_SYNC_PARAMS.to_string()),
        }
    }
}

/// Load a config from a YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load and validate a config from a YAML file
///
/// Every structural problem is reported at once. Region tags with no entry in
/// `regions` are only warned about here; they fail the affected probe task.
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let cfg = load_config(path)?;
    crate::config::validate_config(&cfg).map_err(ConfigError::Invalid)?;
    crate::config::warn_unknown_regions(&cfg);
    Ok(cfg)
}
