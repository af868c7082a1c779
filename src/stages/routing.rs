// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Extraction routing for CatGT.
//!
//! CatGT's parser is order sensitive: on the first probe's line the NI clock
//! reference must precede the other NI extractions, which precede the probe's
//! own `-SY` entry. Every entry for one probe sits on a single line.

use crate::config::CatGtOptions;

const STREAMS_WITH_NI: &str = "-ap -ni -lf";
const STREAMS_WITHOUT_NI: &str = "-ap -lf";

/// `-SY=<probe>,<params>`
pub fn sync_entry(probe: &str, sync_params: &str) -> String {
    format!("-SY={},{}", probe, sync_params)
}

/// One routing line per probe, in probe order.
pub fn routing_lines(options: &CatGtOptions, probes: &[&str]) -> Vec<String> {
    probes
        .iter()
        .enumerate()
        .map(|(i, probe)| {
            let sync = sync_entry(probe, &options.sync_extract_params);
            if i == 0 && options.ni_present {
                let mut entries = ni_entries(options);
                entries.push(sync);
                entries.join(" ")
            } else {
                sync
            }
        })
        .collect()
}

/// Streams CatGT should read.
pub fn stream_string(options: &CatGtOptions) -> &'static str {
    if options.ni_present {
        STREAMS_WITH_NI
    } else {
        STREAMS_WITHOUT_NI
    }
}

/// NI extractions, clock reference first; empty when NI is not routed.
pub fn ni_entries(options: &CatGtOptions) -> Vec<String> {
    if !options.ni_present {
        return Vec::new();
    }
    std::iter::once(&options.ni_clock_extract)
        .chain(options.ni_extract.iter())
        .map(|entry| as_flag(entry))
        .collect()
}

/// The `-SY` entries of every probe on one line, as TPrime expects them.
pub fn imec_sync_list(options: &CatGtOptions, probes: &[&str]) -> String {
    probes
        .iter()
        .map(|probe| sync_entry(probe, &options.sync_extract_params))
        .collect::<Vec<_>>()
        .join(" ")
}

fn as_flag(entry: &str) -> String {
    let entry = entry.trim();
    if entry.starts_with('-') {
        entry.to_string()
    } else {
        format!("-{}", entry)
    }
}
