// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Append-only provenance ledger.
//!
//! One CSV row per finished probe task:
//!
//! ```text
//! session_id,timestamp,outcome,executed_stages,stage_configs,execution_time_s
//! sess1_g0-2_imec0,2025-03-01T10:00:00Z,completed,catgt;kilosort_helper,/json/a.json;/json/b.json,3600.000
//! ```
//!
//! Every append opens the file, writes one record, flushes and syncs, so a
//! crash loses at most the row being written.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use crate::errors::PipelineError;
use crate::observability::messages::ledger::{LedgerEntryAppended, LedgerOpened};
use crate::observability::messages::StructuredLog;

pub const LEDGER_HEADER: [&str; 6] = [
    "session_id",
    "timestamp",
    "outcome",
    "executed_stages",
    "stage_configs",
    "execution_time_s",
];

const LIST_SEPARATOR: &str = ";";

/// One finished probe task.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub outcome: String,
    pub executed_stages: Vec<String>,
    pub stage_configs: Vec<PathBuf>,
    pub execution_time_s: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct LedgerRow {
    session_id: String,
    timestamp: String,
    outcome: String,
    executed_stages: String,
    stage_configs: String,
    execution_time_s: String,
}

impl From<&LedgerEntry> for LedgerRow {
    fn from(entry: &LedgerEntry) -> Self {
        LedgerRow {
            session_id: entry.session_id.clone(),
            timestamp: entry.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            outcome: entry.outcome.clone(),
            executed_stages: entry.executed_stages.join(LIST_SEPARATOR),
            stage_configs: entry
                .stage_configs
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(LIST_SEPARATOR),
            execution_time_s: format!("{:.3}", entry.execution_time_s),
        }
    }
}

impl LedgerRow {
    fn into_entry(self) -> Option<LedgerEntry> {
        let split = |s: &str| -> Vec<String> {
            s.split(LIST_SEPARATOR)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect()
        };
        Some(LedgerEntry {
            timestamp: DateTime::parse_from_rfc3339(&self.timestamp)
                .ok()?
                .with_timezone(&Utc),
            execution_time_s: self.execution_time_s.parse().ok()?,
            executed_stages: split(&self.executed_stages),
            stage_configs: split(&self.stage_configs)
                .into_iter()
                .map(PathBuf::from)
                .collect(),
            session_id: self.session_id,
            outcome: self.outcome,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ProvenanceLedger {
    path: PathBuf,
}

impl ProvenanceLedger {
    /// Opens the ledger, writing the header when the file is new or empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PipelineError> {
        let path = path.into();
        let created = fs::metadata(&path).map(|m| m.len() == 0).unwrap_or(true);
        if created {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
            }
            let file = fs::File::create(&path).map_err(|e| PipelineError::io(&path, e))?;
            let mut writer = csv::Writer::from_writer(&file);
            writer.write_record(LEDGER_HEADER)?;
            writer.flush().map_err(|e| PipelineError::io(&path, e))?;
            drop(writer);
            file.sync_all().map_err(|e| PipelineError::io(&path, e))?;
        }

        LedgerOpened {
            path: &path,
            created,
        }
        .log();
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, entry: &LedgerEntry) -> Result<(), PipelineError> {
        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| PipelineError::io(&self.path, e))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(&file);
        writer.serialize(LedgerRow::from(entry))?;
        writer.flush().map_err(|e| PipelineError::io(&self.path, e))?;
        drop(writer);
        file.sync_all().map_err(|e| PipelineError::io(&self.path, e))?;

        LedgerEntryAppended {
            session_id: &entry.session_id,
            outcome: &entry.outcome,
        }
        .log();
        Ok(())
    }

    /// Reads every well-formed row back.
    pub fn read_entries(&self) -> Result<Vec<LedgerEntry>, PipelineError> {
        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut entries = Vec::new();
        for row in reader.deserialize::<LedgerRow>() {
            if let Some(entry) = row?.into_entry() {
                entries.push(entry);
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn entry(session_id: &str, stages: &[&str]) -> LedgerEntry {
        LedgerEntry {
            session_id: session_id.to_string(),
            timestamp: Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap(),
            outcome: "completed".to_string(),
            executed_stages: stages.iter().map(|s| s.to_string()).collect(),
            stage_configs: stages
                .iter()
                .map(|s| PathBuf::from(format!("/json/{}-{}-input.json", session_id, s)))
                .collect(),
            execution_time_s: 12.5,
        }
    }

    #[test]
    fn test_header_written_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pipeline_log.csv");

        let ledger = ProvenanceLedger::open(&path).unwrap();
        ledger.append(&entry("sess1_g0_imec0", &["catgt"])).unwrap();
        let ledger = ProvenanceLedger::open(&path).unwrap();
        ledger.append(&entry("sess1_g0_imec1", &["catgt"])).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "session_id,timestamp,outcome,executed_stages,stage_configs,execution_time_s"
        );
        assert!(lines[1].starts_with("sess1_g0_imec0,2025-03-01T10:00:00Z,completed,catgt,"));
    }

    #[test]
    fn test_entries_read_back() {
        let dir = TempDir::new().unwrap();
        let ledger = ProvenanceLedger::open(dir.path().join("log.csv")).unwrap();
        let written = entry("sess1_g0-2_imec0", &["catgt", "kilosort_helper"]);
        ledger.append(&written).unwrap();

        let entries = ledger.read_entries().unwrap();
        assert_eq!(entries, vec![written]);
    }

    #[test]
    fn test_empty_stage_list_is_an_empty_field() {
        let dir = TempDir::new().unwrap();
        let ledger = ProvenanceLedger::open(dir.path().join("log.csv")).unwrap();
        let mut missing = entry("sess1_g0_imec3", &[]);
        missing.outcome = "missing_data".to_string();
        ledger.append(&missing).unwrap();

        let text = fs::read_to_string(ledger.path()).unwrap();
        assert!(text.contains("sess1_g0_imec3,2025-03-01T10:00:00Z,missing_data,,,12.500"));
        assert!(ledger.read_entries().unwrap()[0].executed_stages.is_empty());
    }
}
