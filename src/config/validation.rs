// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structural validation of a loaded pipeline configuration.
//!
//! Checks run independently and every failure is accumulated, so a user sees
//! all problems with a configuration at once rather than fixing them one by
//! one:
//!
//! 1. **Stage selection**: no stage is selected twice
//! 2. **Run specs**: at least one, each with a non-empty run name
//! 3. **Numeric bounds**: concurrency, thresholds, radii and periods
//! 4. **Region table**: every declared region overrides something
//!
//! Region tags used by run specs but missing from the region table are NOT
//! errors here. They must fail the affected probe task only, so
//! [`warn_unknown_regions`] merely reports them.

use std::collections::HashSet;

use crate::config::consts::MAX_CONCURRENCY;
use crate::config::{Config, RegionOverrides};
use crate::errors::ValidationError;
use crate::observability::messages::validation::UnknownRegionTag;
use crate::observability::messages::StructuredLog;

/// Validates a configuration, returning every error found.
///
/// # Examples
///
/// ```rust
/// use sglx_pipeline::config::{validate_config, Config};
///
/// let config: Config = serde_yaml::from_str(r#"
/// raw_root: /data/raw
/// destination: /data/sorted
/// stages: [catgt]
/// run_specs: []
/// "#).unwrap();
///
/// let errors = validate_config(&config).unwrap_err();
/// assert_eq!(errors.len(), 1);
/// ```
pub fn validate_config(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    errors.extend(validate_stage_selection(config));
    errors.extend(validate_run_specs(config));
    errors.extend(validate_bounds(config));
    errors.extend(validate_region_table(config));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Logs a warning for every region tag no region table entry covers.
pub fn warn_unknown_regions(config: &Config) {
    for spec in &config.run_specs {
        for region in &spec.regions {
            if !config.regions.contains_key(region) {
                UnknownRegionTag {
                    run_name: &spec.run_name,
                    region,
                }
                .log();
            }
        }
    }
}

fn validate_stage_selection(config: &Config) -> Vec<ValidationError> {
    let mut seen = HashSet::new();
    config
        .stages
        .iter()
        .filter(|stage| !seen.insert(**stage))
        .map(|stage| ValidationError::DuplicateStage {
            stage: stage.to_string(),
        })
        .collect()
}

fn validate_run_specs(config: &Config) -> Vec<ValidationError> {
    if config.run_specs.is_empty() {
        return vec![ValidationError::NoRunSpecs];
    }
    config
        .run_specs
        .iter()
        .enumerate()
        .filter(|(_, spec)| spec.run_name.trim().is_empty())
        .map(|(index, _)| ValidationError::EmptyRunName { index })
        .collect()
}

fn validate_bounds(config: &Config) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut check = |ok: bool, parameter: &str, expected: &str| {
        if !ok {
            errors.push(ValidationError::OutOfBounds {
                parameter: parameter.to_string(),
                expected: expected.to_string(),
            });
        }
    };

    let concurrency = config.executor_options.max_concurrency();
    check(
        (1..=MAX_CONCURRENCY).contains(&concurrency),
        "executor_options.max_concurrency",
        &format!("1..={}", MAX_CONCURRENCY),
    );
    check(
        config.catgt.loccar_inner_um < config.catgt.loccar_outer_um,
        "catgt.loccar_inner_um",
        "smaller than catgt.loccar_outer_um",
    );
    check(config.tprime.sync_period > 0.0, "tprime.sync_period", "> 0");
    check(
        config.mean_waveforms.c_waves_snr_um > 0,
        "mean_waveforms.c_waves_snr_um",
        "> 0",
    );

    let mut layers: Vec<(String, &RegionOverrides)> = vec![("defaults".to_string(), &config.defaults)];
    layers.extend(
        config
            .regions
            .iter()
            .map(|(tag, overrides)| (format!("regions.{}", tag), overrides)),
    );
    for (prefix, overrides) in layers {
        if let Some(threshold) = overrides.ks_threshold {
            check(
                threshold.iter().all(|t| *t > 0),
                &format!("{}.ks_threshold", prefix),
                "two positive thresholds",
            );
        }
        if let Some(ms) = overrides.refractory_period_ms {
            check(ms > 0.0, &format!("{}.refractory_period_ms", prefix), "> 0");
        }
        if let Some(rate) = overrides.minfr_goodchannels {
            check(rate >= 0.0, &format!("{}.minfr_goodchannels", prefix), ">= 0");
        }
    }

    errors
}

fn validate_region_table(config: &Config) -> Vec<ValidationError> {
    config
        .regions
        .iter()
        .filter(|(_, overrides)| overrides.is_empty())
        .map(|(region, _)| ValidationError::EmptyRegionOverride {
            region: region.clone(),
        })
        .collect()
}
