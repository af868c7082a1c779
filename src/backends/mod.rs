// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Stage runner backends.
//!
//! ## Process Backend
//! Launches each stage module as an isolated child process and waits for it
//! to exit. This is the only production backend.
//!
//! ## Stub Backend (Test-Only)
//! A scripted runner that records invocations, fails on demand and fakes the
//! on-disk output of every stage, including CatGT's first-gate naming.
//! NOT available in production builds.
//!
//! # Examples
//!
//! ```rust
//! use sglx_pipeline::backends::process::ProcessStageRunner;
//! use sglx_pipeline::config::RunnerConfig;
//! use sglx_pipeline::traits::StageRunner;
//!
//! let runner = ProcessStageRunner::from_config(&RunnerConfig::default());
//! assert_eq!(runner.name(), "process");
//! ```

pub mod process;
#[cfg(test)]
pub mod stub;
