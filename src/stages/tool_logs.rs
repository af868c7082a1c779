// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Logs the SpikeGLX tools append to in their working directory.
//!
//! CatGT, TPrime and C_Waves never truncate their logs, so logs from an
//! earlier batch are removed before a batch starts. After CatGT has run, its
//! log is the only place the per-probe artifact-repair (`-gfix`) rate is
//! reported:
//!
//! ```text
//! CatGT -dir=/data/raw -run=sess1 -g=0,2 -t=0,5 -prb=0,1 -gfix=0.40,0.10,0.02
//! Gfix prb 0 edits/sec 0.0133
//! Gfix prb 1 edits/sec 0.2010
//! ```

use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use crate::errors::PipelineError;

pub const CATGT_LOG: &str = "CatGT.log";
pub const TPRIME_LOG: &str = "Tprime.log";
pub const C_WAVES_LOG: &str = "C_Waves.log";

/// Every log a batch clears before it starts.
pub const TOOL_LOGS: [&str; 3] = [CATGT_LOG, TPRIME_LOG, C_WAVES_LOG];

const GFIX_MARKER: &str = "Gfix prb";
const RATE_MARKER: &str = "edits/sec";
const RUN_FLAG: &str = "-run=";

/// Artifact-repair rate CatGT reported for one probe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GfixEdits {
    pub probe: String,
    /// `None` when the log has no entry for the probe.
    pub edits_per_sec: Option<f64>,
}

/// Removes stale tool logs from `dir`, creating `dir` if needed.
///
/// Returns the number of logs removed.
pub fn clear_tool_logs(dir: &Path) -> Result<usize, PipelineError> {
    fs::create_dir_all(dir).map_err(|e| PipelineError::io(dir, e))?;
    let mut removed = 0;
    for name in TOOL_LOGS {
        let path = dir.join(name);
        match fs::remove_file(&path) {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(PipelineError::io(path, e)),
        }
    }
    Ok(removed)
}

/// Reads the gfix edit rate of each of `probes` from the latest CatGT
/// invocation for `run_name` in `log`.
///
/// The invocation's block ends at the next CatGT command line. When no
/// command line for the run is found the whole log is searched.
pub fn parse_gfix_edits(
    log: &Path,
    run_name: &str,
    probes: &[&str],
) -> Result<Vec<GfixEdits>, PipelineError> {
    if !log.is_file() {
        return Err(PipelineError::missing(log, "CatGT log"));
    }
    let text = fs::read_to_string(log).map_err(|e| PipelineError::io(log, e))?;
    let lines: Vec<&str> = text.lines().collect();

    let anchor = lines.iter().rposition(|line| invokes_run(line, run_name));
    let block: Vec<&str> = match anchor {
        Some(i) => lines[i + 1..]
            .iter()
            .take_while(|line| !line.contains(RUN_FLAG))
            .copied()
            .collect(),
        None => lines,
    };

    let mut rates: HashMap<&str, f64> = HashMap::new();
    for line in block {
        if let Some((probe, rate)) = gfix_entry(line) {
            rates.insert(probe, rate);
        }
    }

    Ok(probes
        .iter()
        .map(|probe| GfixEdits {
            probe: probe.to_string(),
            edits_per_sec: rates.get(probe).copied(),
        })
        .collect())
}

fn invokes_run(line: &str, run_name: &str) -> bool {
    line.split_whitespace()
        .any(|token| token.strip_prefix(RUN_FLAG) == Some(run_name))
}

/// `Gfix prb <p> edits/sec <rate>`, with or without a colon after the marker.
fn gfix_entry(line: &str) -> Option<(&str, f64)> {
    let rest = &line[line.find(GFIX_MARKER)? + GFIX_MARKER.len()..];
    let mut tokens = rest.split_whitespace();
    let probe = tokens.next()?;
    if tokens.next()?.trim_end_matches(':') != RATE_MARKER {
        return None;
    }
    let rate = tokens.next()?.parse().ok()?;
    Some((probe, rate))
}
