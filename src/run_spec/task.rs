// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};

use super::gates::{GateList, GateRange};
use super::triggers::{TriggerPair, TriggerRange};
use crate::layout;

/// Compact description of one recording run to process.
///
/// # Example
/// ```yaml
/// run_name: 20201224_C25R1_Day21
/// gates: "0,3"
/// triggers: "start,end"
/// probes: "0:1"
/// regions: [cortex, cortex]
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RunSpec {
    pub run_name: String,
    pub gates: GateRange,
    pub triggers: TriggerRange,
    pub probes: String,
    #[serde(default)]
    pub regions: Vec<String>,
}

/// Work item for one probe of a resolved run. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeTask {
    run_name: String,
    gates: GateList,
    triggers: TriggerPair,
    probe: String,
    region: String,
    session_id: String,
}

impl ProbeTask {
    pub fn new(
        run_name: &str,
        gates: GateList,
        triggers: TriggerPair,
        probe: &str,
        region: &str,
    ) -> Self {
        let session_id = session_id(run_name, &gates, probe);
        Self {
            run_name: run_name.to_string(),
            gates,
            triggers,
            probe: probe.to_string(),
            region: region.to_string(),
            session_id,
        }
    }

    pub fn run_name(&self) -> &str {
        &self.run_name
    }

    pub fn gates(&self) -> &GateList {
        &self.gates
    }

    pub fn triggers(&self) -> TriggerPair {
        self.triggers
    }

    pub fn probe(&self) -> &str {
        &self.probe
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// `<run>_g<signature>_imec<probe>`, the key of every per-probe artifact.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

/// Session id for a probe of a run with the given gates.
pub fn session_id(run_name: &str, gates: &GateList, probe: &str) -> String {
    format!(
        "{}_{}",
        layout::run_gate_name(run_name, &gates.signature()),
        layout::probe_folder(probe)
    )
}

/// A run spec with every symbolic part resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRun {
    pub run_name: String,
    pub gates: GateList,
    pub triggers: TriggerPair,
    pub tasks: Vec<ProbeTask>,
}

impl ResolvedRun {
    /// `<run>_g<signature>`, the key of run-level artifacts.
    pub fn run_key(&self) -> String {
        layout::run_gate_name(&self.run_name, &self.gates.signature())
    }

    pub fn probes(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.probe()).collect()
    }

    /// Comma-separated probe ids of the tasks, handed to run-level tools.
    pub fn probe_string(&self) -> String {
        self.probes().join(",")
    }

    /// The same run restricted to the tasks `keep` accepts.
    pub fn retain_tasks<F>(&self, keep: F) -> ResolvedRun
    where
        F: Fn(&ProbeTask) -> bool,
    {
        ResolvedRun {
            run_name: self.run_name.clone(),
            gates: self.gates.clone(),
            triggers: self.triggers,
            tasks: self.tasks.iter().filter(|t| keep(t)).cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_uses_gate_signature() {
        let gates = GateList::new([0, 1, 2]).unwrap();
        let task = ProbeTask::new(
            "sess1",
            gates,
            TriggerPair { first: 0, last: 5 },
            "1",
            "cortex",
        );
        assert_eq!(task.session_id(), "sess1_g0-2_imec1");
        assert_eq!(task.region(), "cortex");
    }

    #[test]
    fn test_run_spec_rejects_unknown_fields() {
        let yaml = r#"
run_name: sess1
gates: "0"
triggers: "0,0"
probes: "0"
regions: [cortex]
probe_count: 1
"#;
        assert!(serde_yaml::from_str::<RunSpec>(yaml).is_err());
    }
}
