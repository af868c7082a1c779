// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use crate::errors::PipelineError;
use crate::layout;
use crate::stages::tool_logs::CATGT_LOG;
use crate::stages::PipelineStage;
use crate::traits::{StageExit, StageInvocation, StageRunner};

/// A scripted stage runner for exercising the engine without external tools.
///
/// Records every invocation, exits with a configured code per (stage, key)
/// and, on success, materialises what the real tool would leave on disk. The
/// CatGT stand-in writes first-gate names, just like CatGT does, and appends
/// to `CatGT.log` in the extraction directory (the default working directory)
/// a gfix rate of `0.05 * n` for the n-th probe.
#[derive(Default)]
pub struct StubStageRunner {
    failures: HashMap<(PipelineStage, Option<String>), i32>,
    invocations: Mutex<Vec<StageInvocation>>,
}

impl StubStageRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `stage` exit with `code`, for one key or for every key.
    pub fn failing(mut self, stage: PipelineStage, key: Option<&str>, code: i32) -> Self {
        self.failures
            .insert((stage, key.map(|k| k.to_string())), code);
        self
    }

    pub fn invocations(&self) -> Vec<StageInvocation> {
        self.invocations
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// `(stage, key)` of every invocation, in call order.
    pub fn calls(&self) -> Vec<(PipelineStage, String)> {
        self.invocations()
            .into_iter()
            .map(|i| (i.stage, i.key))
            .collect()
    }

    fn exit_code(&self, invocation: &StageInvocation) -> i32 {
        self.failures
            .get(&(invocation.stage, Some(invocation.key.clone())))
            .or_else(|| self.failures.get(&(invocation.stage, None)))
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl StageRunner for StubStageRunner {
    async fn run(&self, invocation: &StageInvocation) -> Result<StageExit, PipelineError> {
        if let Ok(mut calls) = self.invocations.lock() {
            calls.push(invocation.clone());
        }

        let code = self.exit_code(invocation);
        if code == 0 {
            materialise(invocation)?;
        }
        Ok(StageExit {
            code: Some(code),
            duration: Duration::from_millis(1),
        })
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

fn materialise(invocation: &StageInvocation) -> Result<(), PipelineError> {
    match invocation.stage {
        PipelineStage::CatGt => write_catgt_output(&invocation.input_json),
        PipelineStage::TPrime => Ok(()),
        _ => {
            let out = &invocation.declared_output;
            if out.extension().is_some() {
                create_file(out, b"cluster_id\n")
            } else {
                fs::create_dir_all(out).map_err(|e| PipelineError::io(out, e))
            }
        }
    }
}

/// Reads the persisted CatGT configuration the way CatGT's helper would and
/// writes `catgt_<run>_g<first>/<run>_g<first>_imec<p>/..._tcat...` per probe.
fn write_catgt_output(input_json: &Path) -> Result<(), PipelineError> {
    let raw = fs::read(input_json).map_err(|e| PipelineError::io(input_json, e))?;
    let params: serde_json::Value = serde_json::from_slice(&raw)?;
    let field = |name: &str| params[name].as_str().unwrap_or_default().to_string();

    let run = field("catGT_run_name");
    let first_gate = field("gate_string")
        .split(',')
        .next()
        .unwrap_or_default()
        .to_string();
    let dest = PathBuf::from(field("extracted_data_directory"));

    let mut log = format!(
        "Cmdline: CatGT -dir={} -run={} -g={} -prb={}\n",
        field("npx_directory"),
        run,
        field("gate_string"),
        field("probe_string"),
    );
    for (n, probe) in field("probe_string")
        .split(',')
        .filter(|p| !p.is_empty())
        .enumerate()
    {
        let tcat = layout::tcat_ap_file(&dest, &run, &first_gate, probe);
        create_file(&tcat, b"")?;
        let meta = tcat.with_extension("meta");
        create_file(&meta, b"")?;
        log.push_str(&format!(
            "Gfix prb {} edits/sec {:.4}\n",
            probe,
            0.05 * (n + 1) as f64
        ));
    }
    append_file(&dest.join(CATGT_LOG), log.as_bytes())
}

fn append_file(path: &Path, content: &[u8]) -> Result<(), PipelineError> {
    use std::io::Write;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| PipelineError::io(path, e))?;
    file.write_all(content)
        .map_err(|e| PipelineError::io(path, e))
}

fn create_file(path: &Path, content: &[u8]) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }
    fs::write(path, content).map_err(|e| PipelineError::io(path, e))
}
