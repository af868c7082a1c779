// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Turns a compact [`RunSpec`] into the enumerated list of [`ProbeTask`]s.
//!
//! Resolution order matters: probes are parsed first (pure), then gates (may
//! list the raw root), then triggers (may list the first probe's folder of the
//! first gate). Resolving the same spec against the same tree always yields the
//! same tasks and therefore the same downstream paths.

use std::fs;
use std::path::PathBuf;

use super::gates::{GateBound, GateList, GateRange};
use super::probes::parse_probe_list;
use super::task::{session_id, ProbeTask, ResolvedRun, RunSpec};
use super::triggers::resolve_triggers;
use crate::errors::PipelineError;
use crate::layout;
use crate::observability::messages::resolver::RunSpecResolved;
use crate::observability::messages::StructuredLog;

pub struct RunSpecResolver {
    raw_root: PathBuf,
}

impl RunSpecResolver {
    pub fn new(raw_root: impl Into<PathBuf>) -> Self {
        Self {
            raw_root: raw_root.into(),
        }
    }

    pub fn resolve(&self, spec: &RunSpec) -> Result<ResolvedRun, PipelineError> {
        let probes = self.resolve_probes(spec)?;
        let gates = self.resolve_gates(spec)?;

        let first_probe_dir =
            layout::raw_probe_dir(&self.raw_root, &spec.run_name, gates.first(), &probes[0]);
        let triggers = resolve_triggers(&spec.run_name, &spec.triggers, &first_probe_dir)?;

        let tasks: Vec<ProbeTask> = probes
            .iter()
            .zip(spec.regions.iter())
            .map(|(probe, region)| {
                ProbeTask::new(&spec.run_name, gates.clone(), triggers, probe, region)
            })
            .collect();

        let resolved = ResolvedRun {
            run_name: spec.run_name.clone(),
            gates,
            triggers,
            tasks,
        };

        RunSpecResolved {
            run_name: &resolved.run_name,
            gate_signature: &resolved.gates.signature(),
            first_trigger: resolved.triggers.first,
            last_trigger: resolved.triggers.last,
            task_count: resolved.tasks.len(),
        }
        .log();

        Ok(resolved)
    }

    /// Ordered, distinct probe ids; region tags must pair one-to-one.
    pub fn resolve_probes(&self, spec: &RunSpec) -> Result<Vec<String>, PipelineError> {
        if spec.run_name.trim().is_empty() {
            return Err(PipelineError::malformed(&spec.run_name, "run name is empty"));
        }
        let probes = parse_probe_list(&spec.probes)
            .map_err(|reason| PipelineError::malformed(&spec.run_name, reason))?;
        if probes.len() != spec.regions.len() {
            return Err(PipelineError::malformed(
                &spec.run_name,
                format!(
                    "{} probes selected but {} region tags given",
                    probes.len(),
                    spec.regions.len()
                ),
            ));
        }
        Ok(probes)
    }

    /// Resolves the gate range; spans keep only gate folders present on disk.
    pub fn resolve_gates(&self, spec: &RunSpec) -> Result<GateList, PipelineError> {
        let resolved = match &spec.gates {
            GateRange::Single(GateBound::Index(gate)) => GateList::new([*gate]),
            GateRange::List(gates) => GateList::new(gates.iter().copied()),
            GateRange::Single(bound) => {
                let present = self.list_gate_folders(&spec.run_name)?;
                let gate = pick_gate(*bound, &present);
                GateList::new(gate)
            }
            GateRange::Span(first, last) => {
                let present = self.list_gate_folders(&spec.run_name)?;
                match (pick_gate(*first, &present), pick_gate(*last, &present)) {
                    (Some(lo), Some(hi)) if lo > hi => {
                        return Err(PipelineError::malformed(
                            &spec.run_name,
                            format!("gate range {} is reversed", spec.gates),
                        ))
                    }
                    (Some(lo), Some(hi)) => {
                        GateList::new(present.iter().copied().filter(|g| (lo..=hi).contains(g)))
                    }
                    _ => None,
                }
            }
        };

        resolved.ok_or_else(|| {
            PipelineError::missing(
                &self.raw_root,
                format!("no gate folders for {} match gate range {}", spec.run_name, spec.gates),
            )
        })
    }

    /// Session ids derivable without touching the disk, used to keep an audit
    /// row for runs whose resolution failed on missing data.
    pub fn fallback_session_ids(&self, spec: &RunSpec) -> Vec<String> {
        let probes = match parse_probe_list(&spec.probes) {
            Ok(probes) => probes,
            Err(_) => return Vec::new(),
        };
        match spec.gates.declared_gates() {
            Some(gates) => probes
                .iter()
                .map(|p| session_id(&spec.run_name, &gates, p))
                .collect(),
            None => probes
                .iter()
                .map(|p| format!("{}_{}", spec.run_name, layout::probe_folder(p)))
                .collect(),
        }
    }

    /// Gate indices of every `<run>_g<N>` folder under the raw root.
    fn list_gate_folders(&self, run_name: &str) -> Result<Vec<u32>, PipelineError> {
        if !self.raw_root.is_dir() {
            return Err(PipelineError::missing(&self.raw_root, "raw data root does not exist"));
        }
        let prefix = format!("{}_g", run_name);
        let entries = fs::read_dir(&self.raw_root).map_err(|e| PipelineError::io(&self.raw_root, e))?;
        let mut gates = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| PipelineError::io(&self.raw_root, e))?;
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name();
            let gate = name
                .to_str()
                .and_then(|n| n.strip_prefix(&prefix))
                .and_then(|g| g.parse::<u32>().ok());
            if let Some(gate) = gate {
                gates.push(gate);
            }
        }
        gates.sort_unstable();
        Ok(gates)
    }
}

fn pick_gate(bound: GateBound, present: &[u32]) -> Option<u32> {
    match bound {
        GateBound::Index(i) => Some(i),
        GateBound::Start => present.first().copied(),
        GateBound::Last => present.last().copied(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run_spec::triggers::TriggerPair;
    use std::fs;
    use tempfile::TempDir;

    fn spec(gates: &str, triggers: &str, probes: &str, regions: &[&str]) -> RunSpec {
        RunSpec {
            run_name: "sess1".to_string(),
            gates: gates.parse().unwrap(),
            triggers: triggers.parse().unwrap(),
            probes: probes.to_string(),
            regions: regions.iter().map(|r| r.to_string()).collect(),
        }
    }

    fn raw_tree(gates: &[u32], probes: &[&str], triggers: std::ops::RangeInclusive<u32>) -> TempDir {
        let root = TempDir::new().unwrap();
        for &g in gates {
            for p in probes {
                let dir = layout::raw_probe_dir(root.path(), "sess1", g, p);
                fs::create_dir_all(&dir).unwrap();
                for t in triggers.clone() {
                    fs::write(layout::raw_ap_file(root.path(), "sess1", g, t, p), b"").unwrap();
                }
            }
        }
        root
    }

    #[test]
    fn test_multi_gate_symbolic_trigger_scenario() {
        let root = raw_tree(&[0, 1, 2], &["0"], 0..=5);
        let resolver = RunSpecResolver::new(root.path());
        let run = resolver
            .resolve(&spec("0,2", "start,end", "0,1", &["cortex", "cortex"]))
            .unwrap();

        assert_eq!(run.triggers, TriggerPair { first: 0, last: 5 });
        assert_eq!(run.gates.signature(), "0-2");
        let ids: Vec<&str> = run.tasks.iter().map(|t| t.session_id()).collect();
        assert_eq!(ids, vec!["sess1_g0-2_imec0", "sess1_g0-2_imec1"]);
        assert_eq!(run.run_key(), "sess1_g0-2");
    }

    #[test]
    fn test_explicit_gate_list_scenario() {
        let root = raw_tree(&[0], &["0"], 0..=5);
        let resolver = RunSpecResolver::new(root.path());
        let mut s = spec("0", "start,end", "0,1", &["cortex", "cortex"]);
        s.gates = serde_yaml::from_str("[0, 1, 2]").unwrap();
        let run = resolver.resolve(&s).unwrap();
        assert_eq!(run.tasks[1].session_id(), "sess1_g0-2_imec1");
    }

    #[test]
    fn test_gate_span_is_gap_tolerant() {
        let root = raw_tree(&[0, 1, 3], &["0"], 0..=0);
        let resolver = RunSpecResolver::new(root.path());
        let gates = resolver.resolve_gates(&spec("0,3", "0,0", "0", &["cortex"])).unwrap();
        assert_eq!(gates.indices(), &[0, 1, 3]);
        assert_eq!(gates.signature(), "0-1-3");
    }

    #[test]
    fn test_symbolic_gate_span() {
        let root = raw_tree(&[2, 4], &["0"], 0..=0);
        let resolver = RunSpecResolver::new(root.path());
        let gates = resolver
            .resolve_gates(&spec("start,last", "0,0", "0", &["cortex"]))
            .unwrap();
        assert_eq!(gates.indices(), &[2, 4]);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let root = raw_tree(&[0, 1], &["0", "1"], 0..=3);
        let resolver = RunSpecResolver::new(root.path());
        let s = spec("0,1", "start,end", "0:1", &["cortex", "medulla"]);
        assert_eq!(resolver.resolve(&s).unwrap(), resolver.resolve(&s).unwrap());
    }

    #[test]
    fn test_region_count_mismatch_is_malformed() {
        let root = raw_tree(&[0], &["0"], 0..=0);
        let resolver = RunSpecResolver::new(root.path());
        let err = resolver
            .resolve(&spec("0", "0,0", "0,1", &["cortex"]))
            .unwrap_err();
        assert_eq!(err.kind(), "malformed_spec");
    }

    #[test]
    fn test_duplicate_probe_is_malformed() {
        let resolver = RunSpecResolver::new("/unused");
        let err = resolver
            .resolve(&spec("0", "0,0", "0,0", &["cortex", "cortex"]))
            .unwrap_err();
        assert_eq!(err.kind(), "malformed_spec");
    }

    #[test]
    fn test_symbolic_triggers_without_probe_folder_is_missing_data() {
        let root = raw_tree(&[0], &["1"], 0..=0);
        let resolver = RunSpecResolver::new(root.path());
        let err = resolver
            .resolve(&spec("0", "start,end", "0", &["cortex"]))
            .unwrap_err();
        assert_eq!(err.kind(), "missing_data");
    }

    #[test]
    fn test_span_without_gate_folders_is_missing_data() {
        let root = TempDir::new().unwrap();
        let resolver = RunSpecResolver::new(root.path());
        let err = resolver
            .resolve_gates(&spec("0,2", "0,0", "0", &["cortex"]))
            .unwrap_err();
        assert_eq!(err.kind(), "missing_data");
    }

    #[test]
    fn test_fallback_session_ids() {
        let resolver = RunSpecResolver::new("/unused");
        let mut listed = spec("0", "start,end", "0:1", &["a", "b"]);
        listed.gates = serde_yaml::from_str("[0, 2]").unwrap();
        let ids = resolver.fallback_session_ids(&listed);
        assert_eq!(ids, vec!["sess1_g0-2_imec0", "sess1_g0-2_imec1"]);

        let ids = resolver.fallback_session_ids(&spec("0,4000000000", "start,end", "0", &["a"]));
        assert_eq!(ids, vec!["sess1_imec0"]);

        let ids = resolver.fallback_session_ids(&spec("start,last", "0,0", "3", &["a"]));
        assert_eq!(ids, vec!["sess1_imec3"]);
    }
}
