// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Post-concatenation directory reconciliation.
//!
//! CatGT names everything it writes after the FIRST gate of a concatenation
//! (`catgt_sess1_g0/sess1_g0_imec0/...`) while every downstream stage expects
//! the gate-list signature (`catgt_sess1_g0-2/...`). The [`DirectoryReconciler`]
//! walks the tree depth-first and renames each matching component, children
//! before parents, so no rename ever invalidates a path still to be visited.
//!
//! A rename whose target already exists is never forced: the walk stops with
//! `ReconciliationConflict` and the source stays where it is.

mod segment;

#[cfg(test)]
mod integration_tests;

pub use segment::GateRewrite;

use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::errors::PipelineError;
use crate::observability::messages::reconcile::{
    EntryRenamed, ReconcileCompleted, ReconcileConflict, ReconcileStarted,
};
use crate::observability::messages::StructuredLog;
use crate::run_spec::GateList;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub directories_renamed: usize,
    pub files_renamed: usize,
}

impl ReconcileSummary {
    pub fn total(&self) -> usize {
        self.directories_renamed + self.files_renamed
    }

    fn absorb(&mut self, other: ReconcileSummary) {
        self.directories_renamed += other.directories_renamed;
        self.files_renamed += other.files_renamed;
    }
}

pub struct DirectoryReconciler {
    rewrite: GateRewrite,
}

impl DirectoryReconciler {
    pub fn new(rewrite: GateRewrite) -> Self {
        Self { rewrite }
    }

    /// `None` for a single gate, where there is nothing to reconcile.
    pub fn for_gates(gates: &GateList) -> Option<Self> {
        GateRewrite::new(gates.first(), &gates.signature()).map(Self::new)
    }

    pub fn rewrite(&self) -> &GateRewrite {
        &self.rewrite
    }

    /// Reconciles every descendant of `root`; `root` itself keeps its name.
    pub fn reconcile_tree(&self, root: &Path) -> Result<ReconcileSummary, PipelineError> {
        ReconcileStarted {
            root,
            first_gate: self.rewrite.first_gate(),
            signature: self.rewrite.signature(),
        }
        .log();

        let summary = self.reconcile_children(root)?;

        ReconcileCompleted {
            root,
            directories_renamed: summary.directories_renamed,
            files_renamed: summary.files_renamed,
        }
        .log();
        Ok(summary)
    }

    /// Reconciles `path` itself and, for a directory, its contents first.
    ///
    /// Returns where the entry lives afterwards.
    pub fn reconcile_entry(
        &self,
        path: &Path,
    ) -> Result<(PathBuf, ReconcileSummary), PipelineError> {
        let meta = fs::symlink_metadata(path).map_err(|e| PipelineError::io(path, e))?;
        let mut summary = ReconcileSummary::default();
        let is_dir = meta.is_dir();
        if is_dir {
            summary.absorb(self.reconcile_children(path)?);
        }

        let Some(target) = self.target_of(path) else {
            return Ok((path.to_path_buf(), summary));
        };
        rename_exclusive(path, &target)?;
        if is_dir {
            summary.directories_renamed += 1;
        } else {
            summary.files_renamed += 1;
        }
        Ok((target, summary))
    }

    /// Every path under `root` (inclusive) whose name still carries the
    /// first-gate token. Empty on a fully reconciled tree.
    pub fn find_unreconciled(&self, root: &Path) -> Vec<PathBuf> {
        WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| self.rewrite.matches(name))
            })
            .map(|entry| entry.into_path())
            .collect()
    }

    fn reconcile_children(&self, dir: &Path) -> Result<ReconcileSummary, PipelineError> {
        let mut dirs = Vec::new();
        let mut files = Vec::new();
        for entry in fs::read_dir(dir).map_err(|e| PipelineError::io(dir, e))? {
            let entry = entry.map_err(|e| PipelineError::io(dir, e))?;
            let file_type = entry.file_type().map_err(|e| PipelineError::io(entry.path(), e))?;
            if file_type.is_dir() {
                dirs.push(entry.path());
            } else {
                files.push(entry.path());
            }
        }
        dirs.sort();
        files.sort();

        let mut summary = ReconcileSummary::default();
        for path in dirs.iter().chain(files.iter()) {
            let (_, child) = self.reconcile_entry(path)?;
            summary.absorb(child);
        }
        Ok(summary)
    }

    fn target_of(&self, path: &Path) -> Option<PathBuf> {
        let name = path.file_name()?.to_str()?;
        let renamed = self.rewrite.rewrite(name)?;
        Some(path.with_file_name(renamed))
    }
}

fn rename_exclusive(from: &Path, to: &Path) -> Result<(), PipelineError> {
    if fs::symlink_metadata(to).is_ok() {
        ReconcileConflict { from, to }.log();
        return Err(PipelineError::ReconciliationConflict {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
        });
    }
    fs::rename(from, to).map_err(|e| PipelineError::io(from, e))?;
    EntryRenamed { from, to }.log();
    Ok(())
}
