// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use super::*;
use std::collections::BTreeMap;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Relative path -> content of every file below `root`.
fn snapshot(root: &Path) -> BTreeMap<String, String> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap().to_string_lossy().to_string();
            (rel, fs::read_to_string(e.path()).unwrap())
        })
        .collect()
}

fn reconciler() -> DirectoryReconciler {
    DirectoryReconciler::for_gates(&GateList::new([0, 1, 2]).unwrap()).unwrap()
}

fn catgt_tree(dest: &Path) {
    write(dest, "catgt_sess1_g0/sess1_g0_imec0/sess1_g0_tcat.imec0.ap.bin", "ap0");
    write(dest, "catgt_sess1_g0/sess1_g0_imec0/sess1_g0_tcat.imec0.ap.meta", "meta0");
    write(dest, "catgt_sess1_g0/sess1_g0_imec1/sess1_g0_tcat.imec1.ap.bin", "ap1");
    write(dest, "catgt_sess1_g0/sess1_g0_tcat.nidq.bin", "ni");
    write(dest, "catgt_sess1_g0/sess1_g0_imec0/imec0_ks2/params.py", "ks");
}

#[test]
fn test_reconcile_entry_renames_children_before_parents() {
    let dest = TempDir::new().unwrap();
    catgt_tree(dest.path());

    let (renamed, summary) = reconciler()
        .reconcile_entry(&dest.path().join("catgt_sess1_g0"))
        .unwrap();

    assert_eq!(renamed, dest.path().join("catgt_sess1_g0-2"));
    assert!(dest
        .path()
        .join("catgt_sess1_g0-2/sess1_g0-2_imec0/sess1_g0-2_tcat.imec0.ap.bin")
        .is_file());
    assert!(!dest.path().join("catgt_sess1_g0").exists());
    assert_eq!(summary.directories_renamed, 3);
    assert_eq!(summary.files_renamed, 4);
}

#[test]
fn test_reconcile_preserves_leaf_files_and_content() {
    let dest = TempDir::new().unwrap();
    catgt_tree(dest.path());
    let before = snapshot(dest.path());

    reconciler().reconcile_tree(dest.path()).unwrap();
    let after = snapshot(dest.path());

    assert_eq!(before.len(), after.len());
    let rewrite = reconciler();
    for (rel, content) in before {
        let expected: String = rel
            .split('/')
            .map(|part| rewrite.rewrite().rewrite(part).unwrap_or_else(|| part.to_string()))
            .collect::<Vec<_>>()
            .join("/");
        assert_eq!(after.get(&expected), Some(&content), "{}", expected);
    }
}

#[test]
fn test_reconcile_is_idempotent() {
    let dest = TempDir::new().unwrap();
    catgt_tree(dest.path());

    let first = reconciler().reconcile_tree(dest.path()).unwrap();
    assert!(first.total() > 0);
    let second = reconciler().reconcile_tree(dest.path()).unwrap();
    assert_eq!(second, ReconcileSummary::default());
    assert!(reconciler().find_unreconciled(dest.path()).is_empty());
}

#[test]
fn test_existing_target_is_a_conflict() {
    let dest = TempDir::new().unwrap();
    write(dest.path(), "catgt_sess1_g0/sess1_g0_imec0/sess1_g0_tcat.imec0.ap.bin", "new");
    write(dest.path(), "catgt_sess1_g0/sess1_g0_imec0/sess1_g0-2_tcat.imec0.ap.bin", "old");

    let err = reconciler().reconcile_tree(dest.path()).unwrap_err();
    match err {
        PipelineError::ReconciliationConflict { from, to } => {
            assert!(from.ends_with("sess1_g0_tcat.imec0.ap.bin"));
            assert!(to.ends_with("sess1_g0-2_tcat.imec0.ap.bin"));
        }
        other => panic!("unexpected error: {other}"),
    }

    let source = dest
        .path()
        .join("catgt_sess1_g0/sess1_g0_imec0/sess1_g0_tcat.imec0.ap.bin");
    assert_eq!(fs::read_to_string(source).unwrap(), "new");
    assert!(!reconciler().find_unreconciled(dest.path()).is_empty());
}

#[test]
fn test_single_gate_needs_no_reconciler() {
    assert!(DirectoryReconciler::for_gates(&GateList::new([4]).unwrap()).is_none());
}

#[test]
fn test_find_unreconciled_reports_partial_state() {
    let dest = TempDir::new().unwrap();
    write(dest.path(), "catgt_sess1_g0-2/sess1_g0-2_imec0/sess1_g0_tcat.imec0.ap.bin", "x");

    let leftovers = reconciler().find_unreconciled(dest.path());
    assert_eq!(leftovers.len(), 1);
    assert!(leftovers[0].ends_with("sess1_g0_tcat.imec0.ap.bin"));
}
