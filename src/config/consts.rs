// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Default ledger file name inside the destination directory
pub const DEFAULT_LEDGER_FILE: &str = "pipeline_log.csv";

/// Interpreter used to launch external stages
pub const DEFAULT_RUNNER_PROGRAM: &str = "python";
/// Arguments placed before the module name
pub const DEFAULT_RUNNER_ARGS: [&str; 3] = ["-W", "ignore", "-m"];
/// Package prefix of every stage module
pub const DEFAULT_MODULE_PREFIX: &str = "ecephys_spike_sorting.modules.";

/// Probe tasks run one at a time unless configured otherwise
pub const DEFAULT_MAX_CONCURRENCY: usize = 1;
/// Upper bound on concurrently sorted probes
pub const MAX_CONCURRENCY: usize = 64;

/// Kilosort spike detection thresholds
pub const DEFAULT_KS_THRESHOLD: [u32; 2] = [10, 4];
/// Refractory period for the ISI violation metric, in milliseconds
pub const DEFAULT_REFRACTORY_PERIOD_MS: f64 = 2.0;
/// Minimum firing rate for a channel to be kept by Kilosort
pub const DEFAULT_MINFR_GOODCHANNELS: f64 = 0.05;

pub const DEFAULT_CATGT_COMMAND: &str = "-t_miss_ok -zerofillmax=500 -prb_fld -out_prb_fld \
-aphipass=300 -aplopass=6000 -lflopass=400 -gfix=0,0.10,0.02";
pub const DEFAULT_LOCCAR_INNER_UM: u32 = 40;
pub const DEFAULT_LOCCAR_OUTER_UM: u32 = 160;
/// Imec sync extraction parameters following the probe index in `-SY=`
pub const DEFAULT_SYNC_EXTRACT_PARAMS: &str = "-1,6,500";
/// NI sync channel, the primary clock reference
pub const DEFAULT_NI_CLOCK_EXTRACT: &str = "-XA=0,1,3,500";

pub const DEFAULT_KS_TEMPLATE_RADIUS_UM: u32 = 163;
pub const DEFAULT_KS_WHITENING_RADIUS_UM: u32 = 163;
pub const DEFAULT_KS_SEED: u32 = 1;

pub const DEFAULT_C_WAVES_SNR_UM: u32 = 160;
pub const DEFAULT_EVENT_EX_PARAMS: &str = "XD=4,1,50";

pub const DEFAULT_SYNC_PERIOD_S: f64 = 1.0;
pub const DEFAULT_TO_STREAM_SYNC_PARAMS: &str = "SY=0,-1,6,500";
pub const DEFAULT_NI_STREAM_SYNC_PARAMS: &str = "XA=0,1,3,500";
