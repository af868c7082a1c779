// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! On-disk naming for raw SpikeGLX recordings and CatGT output.
//!
//! These names are consumed by external tools and must match bit-for-bit:
//!
//! ```text
//! <root>/<run>_g<gate>/<run>_g<gate>_imec<p>/<run>_g<gate>_t<trig>.imec<p>.ap.bin
//! <dest>/catgt_<run>_g<sig>/<run>_g<sig>_imec<p>/<run>_g<sig>_tcat.imec<p>.ap.bin
//! ```

use std::path::{Path, PathBuf};

/// Folder name of one probe, e.g. `imec0`.
pub fn probe_folder(probe: &str) -> String {
    format!("imec{}", probe)
}

/// `<run>_g<gate>`; `gate` is either a single index or a gate-list signature.
pub fn run_gate_name(run: &str, gate: &str) -> String {
    format!("{}_g{}", run, gate)
}

pub fn raw_run_dir(root: &Path, run: &str, gate: u32) -> PathBuf {
    root.join(run_gate_name(run, &gate.to_string()))
}

pub fn raw_probe_dir(root: &Path, run: &str, gate: u32, probe: &str) -> PathBuf {
    let run_gate = run_gate_name(run, &gate.to_string());
    root.join(&run_gate)
        .join(format!("{}_{}", run_gate, probe_folder(probe)))
}

/// Metadata file of the first trigger of a raw recording.
pub fn raw_meta_file(root: &Path, run: &str, gate: u32, trigger: u32, probe: &str) -> PathBuf {
    let run_gate = run_gate_name(run, &gate.to_string());
    raw_probe_dir(root, run, gate, probe).join(format!(
        "{}_t{}.{}.ap.meta",
        run_gate,
        trigger,
        probe_folder(probe)
    ))
}

pub fn raw_ap_file(root: &Path, run: &str, gate: u32, trigger: u32, probe: &str) -> PathBuf {
    let run_gate = run_gate_name(run, &gate.to_string());
    raw_probe_dir(root, run, gate, probe).join(format!(
        "{}_t{}.{}.ap.bin",
        run_gate,
        trigger,
        probe_folder(probe)
    ))
}

/// `<dest>/catgt_<run>_g<signature>`
pub fn catgt_run_dir(dest: &Path, run: &str, signature: &str) -> PathBuf {
    dest.join(format!("catgt_{}", run_gate_name(run, signature)))
}

/// `<dest>/catgt_<run>_g<signature>/<run>_g<signature>_imec<p>`
pub fn catgt_probe_dir(dest: &Path, run: &str, signature: &str, probe: &str) -> PathBuf {
    catgt_run_dir(dest, run, signature).join(format!(
        "{}_{}",
        run_gate_name(run, signature),
        probe_folder(probe)
    ))
}

/// Concatenated continuous AP-band file written by CatGT.
pub fn tcat_ap_file(dest: &Path, run: &str, signature: &str, probe: &str) -> PathBuf {
    catgt_probe_dir(dest, run, signature, probe).join(format!(
        "{}_tcat.{}.ap.bin",
        run_gate_name(run, signature),
        probe_folder(probe)
    ))
}

/// Sorter output directory inside the CatGT probe folder, e.g. `imec0_ks2`.
pub fn kilosort_output_dir(dest: &Path, run: &str, signature: &str, probe: &str) -> PathBuf {
    catgt_probe_dir(dest, run, signature, probe).join(format!("{}_ks2", probe_folder(probe)))
}

pub const CLUSTER_METRICS_FILE: &str = "metrics.csv";
pub const WAVEFORM_METRICS_FILE: &str = "waveform_metrics.csv";
pub const EVENTS_FILE: &str = "events.csv";
