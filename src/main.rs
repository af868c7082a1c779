// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use sglx_pipeline::config::{load_and_validate_config, RuntimeBuilder};
use sglx_pipeline::engine::BatchReport;
use sglx_pipeline::metrics::merge_cluster_metrics;
use sglx_pipeline::reconcile::DirectoryReconciler;
use sglx_pipeline::run_spec::{GateList, RunSpecResolver};

#[derive(Parser)]
#[command(name = "sglx-pipeline", version, about = "SpikeGLX batch preprocessing and sorting pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process every run spec of a configuration.
    Run {
        config: PathBuf,
        /// Print the batch report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Resolve run specs into probe tasks without launching anything.
    Resolve { config: PathBuf },
    /// Rename first-gate CatGT output below `root` to the gate signature.
    Reconcile {
        #[arg(long)]
        root: PathBuf,
        /// Comma-separated gate indices, e.g. 0,1,2
        #[arg(long, value_delimiter = ',', required = true)]
        gates: Vec<u32>,
    },
    /// Join cluster quality metrics with waveform metrics.
    MergeMetrics {
        #[arg(long)]
        quality: PathBuf,
        #[arg(long)]
        waveform: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let code = match dispatch(cli.command).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            1
        }
    };
    process::exit(code);
}

async fn dispatch(command: Commands) -> Result<i32> {
    match command {
        Commands::Run { config, json } => run(config, json).await,
        Commands::Resolve { config } => resolve(config),
        Commands::Reconcile { root, gates } => reconcile(root, gates),
        Commands::MergeMetrics {
            quality,
            waveform,
            output,
        } => {
            let summary = merge_cluster_metrics(&quality, &waveform, &output)?;
            println!(
                "{} {} rows x {} columns -> {}",
                if summary.merged { "merged" } else { "copied" },
                summary.rows,
                summary.columns,
                output.display()
            );
            Ok(0)
        }
    }
}

async fn run(config: PathBuf, json: bool) -> Result<i32> {
    let config = load_and_validate_config(&config)
        .with_context(|| format!("loading {}", config.display()))?;
    let orchestrator = RuntimeBuilder::from_config(Arc::new(config));
    let report = orchestrator.run_batch().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(if report.is_success() { 0 } else { 2 })
}

fn print_report(report: &BatchReport) {
    for run in &report.runs {
        let key = run.run_key.as_deref().unwrap_or(&run.run_name);
        match &run.error {
            Some(error) => println!("{}: failed: {}", key, error),
            None => println!("{}", key),
        }
        for task in &run.tasks {
            println!(
                "  {:<40} {:<36} {:>8.1}s",
                task.session_id,
                task.outcome.label(),
                task.execution_time_s
            );
        }
        if let Some(alignment) = &run.alignment {
            println!("  alignment: {}", alignment.label());
        }
        for edit in &run.gfix_edits {
            if let Some(rate) = edit.edits_per_sec {
                println!("  imec{} gfix edits/sec: {:.4}", edit.probe, rate);
            }
        }
    }
    println!(
        "{} runs, {} failed, {} incomplete tasks in {:.1}s",
        report.runs.len(),
        report.failed_runs(),
        report.incomplete_tasks(),
        report.execution_time_s
    );
}

fn resolve(config: PathBuf) -> Result<i32> {
    let config = load_and_validate_config(&config)
        .with_context(|| format!("loading {}", config.display()))?;
    let resolver = RunSpecResolver::new(config.raw_root.clone());

    let mut failures = 0;
    for spec in &config.run_specs {
        match resolver.resolve(spec) {
            Ok(run) => {
                println!(
                    "{} (triggers {}..{})",
                    run.run_key(),
                    run.triggers.first,
                    run.triggers.last
                );
                for task in &run.tasks {
                    println!("  {} region={}", task.session_id(), task.region());
                }
            }
            Err(e) => {
                failures += 1;
                println!("{}: {}", spec.run_name, e);
            }
        }
    }
    Ok(if failures == 0 { 0 } else { 2 })
}

fn reconcile(root: PathBuf, gates: Vec<u32>) -> Result<i32> {
    let gates = GateList::new(gates).ok_or_else(|| anyhow!("no gates given"))?;
    let Some(reconciler) = DirectoryReconciler::for_gates(&gates) else {
        println!("single gate {}: nothing to rename", gates.first());
        return Ok(0);
    };

    let summary = reconciler.reconcile_tree(&root)?;
    println!(
        "renamed {} directories and {} files",
        summary.directories_renamed, summary.files_renamed
    );

    let leftovers = reconciler.find_unreconciled(&root);
    for path in &leftovers {
        println!("  not reconciled: {}", path.display());
    }
    Ok(if leftovers.is_empty() { 0 } else { 2 })
}
