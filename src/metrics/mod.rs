// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Merges the per-cluster quality metrics table with the waveform metrics
//! table written by the mean-waveforms stage.
//!
//! The join is an inner join on `cluster_id` that keeps the quality table's
//! row order. Columns present in both tables are suffixed
//! `_quality_metrics` / `_waveform_metrics`. Leading unnamed index columns in
//! the inputs are dropped and a fresh unnamed index column is written.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::errors::PipelineError;
use crate::stages::PipelineStage;
use crate::utils::fs::atomic_write_bytes;

pub const JOIN_COLUMN: &str = "cluster_id";
pub const QUALITY_SUFFIX: &str = "_quality_metrics";
pub const WAVEFORM_SUFFIX: &str = "_waveform_metrics";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeSummary {
    pub rows: usize,
    pub columns: usize,
    /// False when the waveform table was absent and the quality table was
    /// copied through.
    pub merged: bool,
}

struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    key: usize,
}

impl Table {
    fn read(path: &Path) -> Result<Self, PipelineError> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
        let raw_headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let skip = raw_headers.iter().take_while(|h| is_unnamed(h)).count();

        let headers: Vec<String> = raw_headers[skip..].to_vec();
        let key = headers
            .iter()
            .position(|h| h == JOIN_COLUMN)
            .ok_or_else(|| PipelineError::InvalidParameters {
                stage: PipelineStage::QualityMetrics,
                reason: format!("{} has no '{}' column", path.display(), JOIN_COLUMN),
            })?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut row: Vec<String> = record.iter().skip(skip).map(str::to_string).collect();
            row.resize(headers.len(), String::new());
            rows.push(row);
        }
        Ok(Self { headers, rows, key })
    }
}

fn is_unnamed(header: &str) -> bool {
    header.trim().is_empty() || header.starts_with("Unnamed:")
}

/// Joins `quality` with `waveform` into `output`, written atomically.
///
/// A missing `waveform` file is not an error: the quality table is copied
/// through unchanged.
pub fn merge_cluster_metrics(
    quality: &Path,
    waveform: &Path,
    output: &Path,
) -> Result<MergeSummary, PipelineError> {
    if !quality.is_file() {
        return Err(PipelineError::missing(quality, "cluster quality metrics"));
    }
    if !waveform.is_file() {
        let bytes = fs::read(quality).map_err(|e| PipelineError::io(quality, e))?;
        let table = Table::read(quality)?;
        atomic_write_bytes(output, &bytes)?;
        return Ok(MergeSummary {
            rows: table.rows.len(),
            columns: table.headers.len(),
            merged: false,
        });
    }

    let left = Table::read(quality)?;
    let right = Table::read(waveform)?;

    let mut by_key: HashMap<&str, Vec<&Vec<String>>> = HashMap::new();
    for row in &right.rows {
        by_key.entry(row[right.key].as_str()).or_default().push(row);
    }

    let right_columns: Vec<usize> = (0..right.headers.len()).filter(|&i| i != right.key).collect();
    let overlaps = |name: &str| name != JOIN_COLUMN;

    let mut header = vec![String::new()];
    for name in &left.headers {
        if overlaps(name) && right.headers.contains(name) {
            header.push(format!("{}{}", name, QUALITY_SUFFIX));
        } else {
            header.push(name.clone());
        }
    }
    for &i in &right_columns {
        let name = &right.headers[i];
        if left.headers.contains(name) {
            header.push(format!("{}{}", name, WAVEFORM_SUFFIX));
        } else {
            header.push(name.clone());
        }
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&header)?;
    let mut index = 0usize;
    for row in &left.rows {
        let Some(matches) = by_key.get(row[left.key].as_str()) else {
            continue;
        };
        for other in matches {
            let mut record = Vec::with_capacity(header.len());
            record.push(index.to_string());
            record.extend(row.iter().cloned());
            record.extend(right_columns.iter().map(|&i| other[i].clone()));
            writer.write_record(&record)?;
            index += 1;
        }
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| PipelineError::io(output, e.into_error()))?;
    atomic_write_bytes(output, &bytes)?;

    Ok(MergeSummary {
        rows: index,
        columns: header.len() - 1,
        merged: true,
    })
}
