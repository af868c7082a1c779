// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Run specifications and their resolution into per-probe tasks.

mod gates;
mod probes;
mod resolver;
mod task;
mod triggers;

pub use gates::{GateBound, GateList, GateRange};
pub use probes::parse_probe_list;
pub use resolver::RunSpecResolver;
pub use task::{session_id, ProbeTask, ResolvedRun, RunSpec};
pub use triggers::{list_trigger_indices, resolve_triggers, TriggerBound, TriggerPair, TriggerRange};
