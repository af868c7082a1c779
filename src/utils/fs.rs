// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::errors::PipelineError;

/// Writes `bytes` to `path` so readers never observe a partial file.
///
/// The content goes to a hidden sibling first, is synced, then renamed over
/// the target; the parent directory is synced afterwards.
pub fn atomic_write_bytes(path: &Path, bytes: &[u8]) -> Result<(), PipelineError> {
    let tmp = write_temp_sibling(path, bytes)?;
    fs::rename(&tmp, path).map_err(|e| PipelineError::io(path, e))?;
    sync_parent(path);
    Ok(())
}

/// Like [`atomic_write_bytes`], but never replaces an existing file.
///
/// Returns `Ok(false)` and leaves `path` untouched when it already exists.
pub fn atomic_create_bytes(path: &Path, bytes: &[u8]) -> Result<bool, PipelineError> {
    let tmp = write_temp_sibling(path, bytes)?;
    // link(2) refuses an existing target, unlike rename(2)
    let created = match fs::hard_link(&tmp, path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(PipelineError::io(path, e)),
    };
    let _ = fs::remove_file(&tmp);
    if let Ok(true) = created {
        sync_parent(path);
    }
    created
}

fn write_temp_sibling(path: &Path, bytes: &[u8]) -> Result<PathBuf, PipelineError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }
    let name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("tmpfile");
    let tmp = path.with_file_name(format!(
        ".{}.tmp.{}.{}",
        name,
        std::process::id(),
        Utc::now().timestamp_micros()
    ));

    let mut file = fs::File::create(&tmp).map_err(|e| PipelineError::io(&tmp, e))?;
    file.write_all(bytes).map_err(|e| PipelineError::io(&tmp, e))?;
    file.sync_all().map_err(|e| PipelineError::io(&tmp, e))?;
    Ok(tmp)
}

fn sync_parent(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Ok(dir) = fs::File::open(parent) {
            let _ = dir.sync_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_creates_parents_and_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("json").join("a-input.json");
        atomic_write_bytes(&path, b"{}").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"{}");

        let names: Vec<String> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a-input.json"]);
    }

    #[test]
    fn test_atomic_write_overwrites_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cfg.json");
        atomic_write_bytes(&path, b"{\"a\": 1}").unwrap();
        atomic_write_bytes(&path, b"{\"a\": 2}").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"{\"a\": 2}");
    }

    #[test]
    fn test_atomic_create_never_replaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("json").join("a-input.json");
        assert!(atomic_create_bytes(&path, b"first").unwrap());
        assert!(!atomic_create_bytes(&path, b"second").unwrap());
        assert_eq!(fs::read(&path).unwrap(), b"first");

        let names: Vec<String> = fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a-input.json"]);
    }
}
