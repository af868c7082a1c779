// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::errors::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerBound {
    Index(u32),
    Start,
    End,
}

impl FromStr for TriggerBound {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "start" => Ok(TriggerBound::Start),
            "end" | "last" => Ok(TriggerBound::End),
            other => other
                .parse::<u32>()
                .map(TriggerBound::Index)
                .map_err(|_| format!("invalid trigger bound '{}'", other)),
        }
    }
}

impl fmt::Display for TriggerBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerBound::Index(i) => write!(f, "{}", i),
            TriggerBound::Start => write!(f, "start"),
            TriggerBound::End => write!(f, "end"),
        }
    }
}

/// Trigger range of a run spec, e.g. `"0,400"`, `"0,0"` or `"start,end"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct TriggerRange {
    pub first: TriggerBound,
    pub last: TriggerBound,
}

impl TriggerRange {
    pub fn is_symbolic(&self) -> bool {
        !matches!(
            (self.first, self.last),
            (TriggerBound::Index(_), TriggerBound::Index(_))
        )
    }
}

impl FromStr for TriggerRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split(',').collect::<Vec<_>>().as_slice() {
            [first, last] => Ok(TriggerRange {
                first: first.parse()?,
                last: last.parse()?,
            }),
            _ => Err(format!("trigger range '{}' must have the form 'first,last'", s)),
        }
    }
}

impl TryFrom<String> for TriggerRange {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TriggerRange> for String {
    fn from(range: TriggerRange) -> Self {
        format!("{},{}", range.first, range.last)
    }
}

/// Concrete first and last trigger indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TriggerPair {
    pub first: u32,
    pub last: u32,
}

impl TriggerPair {
    /// `first,last`, the form CatGT expects.
    pub fn to_catgt_string(&self) -> String {
        format!("{},{}", self.first, self.last)
    }
}

/// Resolves symbolic endpoints against the trigger files of `probe_dir`.
///
/// Numeric ranges never touch the disk.
pub fn resolve_triggers(
    run_name: &str,
    range: &TriggerRange,
    probe_dir: &Path,
) -> Result<TriggerPair, PipelineError> {
    let pair = if range.is_symbolic() {
        let present = list_trigger_indices(probe_dir)?;
        let (lowest, highest) = match (present.first(), present.last()) {
            (Some(lo), Some(hi)) => (*lo, *hi),
            _ => {
                return Err(PipelineError::missing(
                    probe_dir,
                    "no trigger files found to resolve symbolic trigger range",
                ))
            }
        };
        TriggerPair {
            first: pick(range.first, lowest, highest),
            last: pick(range.last, lowest, highest),
        }
    } else {
        TriggerPair {
            first: pick(range.first, 0, 0),
            last: pick(range.last, 0, 0),
        }
    };

    if pair.first > pair.last {
        return Err(PipelineError::malformed(
            run_name,
            format!("trigger range {} resolves to {},{}", String::from(*range), pair.first, pair.last),
        ));
    }
    Ok(pair)
}

fn pick(bound: TriggerBound, lowest: u32, highest: u32) -> u32 {
    match bound {
        TriggerBound::Index(i) => i,
        TriggerBound::Start => lowest,
        TriggerBound::End => highest,
    }
}

/// Sorted trigger indices found in entry names of `dir` (`..._t<N>.<rest>` or `t<N>`).
pub fn list_trigger_indices(dir: &Path) -> Result<Vec<u32>, PipelineError> {
    if !dir.is_dir() {
        return Err(PipelineError::missing(dir, "raw probe folder does not exist"));
    }
    let entries = fs::read_dir(dir).map_err(|e| PipelineError::io(dir, e))?;
    let mut found = BTreeSet::new();
    for entry in entries {
        let entry = entry.map_err(|e| PipelineError::io(dir, e))?;
        if let Some(index) = entry.file_name().to_str().and_then(trigger_index) {
            found.insert(index);
        }
    }
    Ok(found.into_iter().collect())
}

/// Extracts the trigger index from a raw recording entry name.
fn trigger_index(name: &str) -> Option<u32> {
    let stem = name.split('.').next()?;
    let tail = match stem.rfind("_t") {
        Some(pos) => &stem[pos + 2..],
        None => stem.strip_prefix('t')?,
    };
    if tail.is_empty() || !tail.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    tail.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_trigger_index_parsing() {
        assert_eq!(trigger_index("sess1_g0_t12.imec0.ap.bin"), Some(12));
        assert_eq!(trigger_index("sess1_g0_t0.imec0.ap.meta"), Some(0));
        assert_eq!(trigger_index("t5"), Some(5));
        assert_eq!(trigger_index("sess1_g0_tcat.imec0.ap.bin"), None);
        assert_eq!(trigger_index("notes.txt"), None);
    }

    #[test]
    fn test_numeric_range_does_not_touch_disk() {
        let range: TriggerRange = "0,400".parse().unwrap();
        let pair = resolve_triggers("sess1", &range, Path::new("/does/not/exist")).unwrap();
        assert_eq!(pair, TriggerPair { first: 0, last: 400 });
    }

    #[test]
    fn test_symbolic_range_uses_lowest_and_highest() {
        let dir = TempDir::new().unwrap();
        for t in [2, 7, 3] {
            std::fs::write(dir.path().join(format!("sess1_g0_t{}.imec0.ap.bin", t)), b"").unwrap();
        }
        let range: TriggerRange = "start,end".parse().unwrap();
        let pair = resolve_triggers("sess1", &range, dir.path()).unwrap();
        assert_eq!(pair, TriggerPair { first: 2, last: 7 });

        let range: TriggerRange = "3,last".parse().unwrap();
        let pair = resolve_triggers("sess1", &range, dir.path()).unwrap();
        assert_eq!(pair, TriggerPair { first: 3, last: 7 });
    }

    #[test]
    fn test_symbolic_range_without_folder_is_missing_data() {
        let dir = TempDir::new().unwrap();
        let range: TriggerRange = "start,end".parse().unwrap();
        let err = resolve_triggers("sess1", &range, &dir.path().join("absent")).unwrap_err();
        assert_eq!(err.kind(), "missing_data");
    }

    #[test]
    fn test_symbolic_range_in_empty_folder_is_missing_data() {
        let dir = TempDir::new().unwrap();
        let range: TriggerRange = "start,end".parse().unwrap();
        let err = resolve_triggers("sess1", &range, dir.path()).unwrap_err();
        assert_eq!(err.kind(), "missing_data");
    }

    #[test]
    fn test_reversed_range_is_malformed() {
        let range: TriggerRange = "5,1".parse().unwrap();
        let err = resolve_triggers("sess1", &range, Path::new("/unused")).unwrap_err();
        assert_eq!(err.kind(), "malformed_spec");
    }

    #[test]
    fn test_trigger_range_parse_errors() {
        assert!("0".parse::<TriggerRange>().is_err());
        assert!("0,x".parse::<TriggerRange>().is_err());
        assert!(serde_yaml::from_str::<TriggerRange>("\"start,end\"").is_ok());
    }
}
