// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod backends;   // stage runners
pub mod config;     // config + runtime wiring
pub mod engine;     // batch orchestration
pub mod errors;     // error handling
pub mod layout;     // on-disk naming
pub mod ledger;     // provenance CSV
pub mod metrics;    // cluster metrics merge
pub mod observability;
pub mod reconcile;  // gate signature renames
pub mod run_spec;   // run specs -> probe tasks
pub mod stages;     // catalog + parameter synthesis
pub mod traits;     // unified abstractions
pub mod utils;
