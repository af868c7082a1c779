// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Gate ranges as written in a run spec, and the resolved, signed gate list.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// One end of a gate span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateBound {
    Index(u32),
    /// Lowest gate folder present on disk.
    Start,
    /// Highest gate folder present on disk.
    Last,
}

impl FromStr for GateBound {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "start" => Ok(GateBound::Start),
            "last" | "end" => Ok(GateBound::Last),
            other => other
                .parse::<u32>()
                .map(GateBound::Index)
                .map_err(|_| format!("invalid gate bound '{}'", other)),
        }
    }
}

impl fmt::Display for GateBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateBound::Index(i) => write!(f, "{}", i),
            GateBound::Start => write!(f, "start"),
            GateBound::Last => write!(f, "last"),
        }
    }
}

/// Gate selection of a run spec.
///
/// Accepted YAML forms:
/// ```yaml
/// gates: "0"          # single gate
/// gates: "0,3"        # closed span, gates missing on disk are skipped
/// gates: "start,last" # span resolved against the raw root
/// gates: [0, 1, 2]    # explicit list
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "GateRangeRepr", into = "GateRangeRepr")]
pub enum GateRange {
    Single(GateBound),
    Span(GateBound, GateBound),
    List(Vec<u32>),
}

impl GateRange {
    /// Gate indices known without touching the disk, if any.
    ///
    /// Spans are gap-tolerant, so their gates depend on the folders present
    /// and are never declared.
    pub fn declared_gates(&self) -> Option<GateList> {
        match self {
            GateRange::Single(GateBound::Index(i)) => GateList::new([*i]),
            GateRange::List(gates) => GateList::new(gates.iter().copied()),
            _ => None,
        }
    }
}

impl FromStr for GateRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        match parts.as_slice() {
            [single] if !single.is_empty() => Ok(GateRange::Single(single.parse()?)),
            [first, last] => Ok(GateRange::Span(first.parse()?, last.parse()?)),
            _ => Err(format!("invalid gate range '{}'", s)),
        }
    }
}

impl fmt::Display for GateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateRange::Single(bound) => write!(f, "{}", bound),
            GateRange::Span(first, last) => write!(f, "{},{}", first, last),
            GateRange::List(gates) => {
                let parts: Vec<String> = gates.iter().map(|g| g.to_string()).collect();
                write!(f, "[{}]", parts.join(","))
            }
        }
    }
}

#[derive(Deserialize, Serialize)]
#[serde(untagged)]
enum GateRangeRepr {
    Index(u32),
    Text(String),
    List(Vec<u32>),
}

impl TryFrom<GateRangeRepr> for GateRange {
    type Error = String;

    fn try_from(repr: GateRangeRepr) -> Result<Self, Self::Error> {
        match repr {
            GateRangeRepr::Index(i) => Ok(GateRange::Single(GateBound::Index(i))),
            GateRangeRepr::Text(text) => text.parse(),
            GateRangeRepr::List(gates) if gates.is_empty() => {
                Err("gate list must not be empty".to_string())
            }
            GateRangeRepr::List(gates) => Ok(GateRange::List(gates)),
        }
    }
}

impl From<GateRange> for GateRangeRepr {
    fn from(range: GateRange) -> Self {
        match range {
            GateRange::List(gates) => GateRangeRepr::List(gates),
            other => GateRangeRepr::Text(other.to_string()),
        }
    }
}

/// Non-empty, ascending, de-duplicated set of gate indices.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GateList(Vec<u32>);

impl GateList {
    /// Builds a gate list from indices in any order; `None` when empty.
    ///
    /// ```
    /// use sglx_pipeline::run_spec::GateList;
    ///
    /// let gates = GateList::new([2, 0, 1, 1]).unwrap();
    /// assert_eq!(gates.indices(), &[0, 1, 2]);
    /// assert_eq!(gates.signature(), "0-2");
    /// ```
    pub fn new(gates: impl IntoIterator<Item = u32>) -> Option<Self> {
        let set: BTreeSet<u32> = gates.into_iter().collect();
        if set.is_empty() {
            None
        } else {
            Some(Self(set.into_iter().collect()))
        }
    }

    pub fn indices(&self) -> &[u32] {
        &self.0
    }

    pub fn first(&self) -> u32 {
        self.0[0]
    }

    pub fn last(&self) -> u32 {
        self.0[self.0.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when more than one gate is concatenated.
    pub fn is_concatenated(&self) -> bool {
        self.0.len() > 1
    }

    /// Token naming every concatenated artifact.
    ///
    /// Each maximal run of consecutive gates renders as `a` or `a-b`, runs are
    /// joined with `-`.
    pub fn signature(&self) -> String {
        let mut runs: Vec<String> = Vec::new();
        let mut start = self.0[0];
        let mut prev = start;
        for &gate in &self.0[1..] {
            if gate == prev + 1 {
                prev = gate;
                continue;
            }
            runs.push(render_run(start, prev));
            start = gate;
            prev = gate;
        }
        runs.push(render_run(start, prev));
        runs.join("-")
    }

    /// The original comma form handed to CatGT, e.g. `0,2`.
    pub fn span_string(&self) -> String {
        if self.0.len() == 1 {
            self.first().to_string()
        } else {
            format!("{},{}", self.first(), self.last())
        }
    }
}

fn render_run(start: u32, end: u32) -> String {
    if start == end {
        start.to_string()
    } else {
        format!("{}-{}", start, end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_of_contiguous_gates() {
        let gates = GateList::new([0, 1, 2]).unwrap();
        assert_eq!(gates.signature(), "0-2");
    }

    #[test]
    fn test_signature_of_single_gate() {
        let gates = GateList::new([3]).unwrap();
        assert_eq!(gates.signature(), "3");
        assert!(!gates.is_concatenated());
    }

    #[test]
    fn test_signature_with_gaps() {
        let gates = GateList::new([0, 1, 4, 6, 7, 8]).unwrap();
        assert_eq!(gates.signature(), "0-1-4-6-8");
    }

    #[test]
    fn test_signature_ignores_input_order_and_duplicates() {
        let orders: [&[u32]; 4] = [&[0, 1, 2, 5], &[5, 2, 1, 0], &[2, 0, 5, 1, 1], &[1, 5, 0, 2]];
        let signatures: Vec<String> = orders
            .iter()
            .map(|o| GateList::new(o.iter().copied()).unwrap().signature())
            .collect();
        assert!(signatures.iter().all(|s| s == "0-2-5"));
    }

    #[test]
    fn test_empty_gate_list_is_rejected() {
        assert!(GateList::new(Vec::<u32>::new()).is_none());
    }

    #[test]
    fn test_parse_gate_range_forms() {
        assert_eq!(
            "0".parse::<GateRange>().unwrap(),
            GateRange::Single(GateBound::Index(0))
        );
        assert_eq!(
            "0,3".parse::<GateRange>().unwrap(),
            GateRange::Span(GateBound::Index(0), GateBound::Index(3))
        );
        assert_eq!(
            "start, last".parse::<GateRange>().unwrap(),
            GateRange::Span(GateBound::Start, GateBound::Last)
        );
        assert!("".parse::<GateRange>().is_err());
        assert!("0,1,2".parse::<GateRange>().is_err());
        assert!("x".parse::<GateRange>().is_err());
    }

    #[test]
    fn test_gate_range_from_yaml() {
        let range: GateRange = serde_yaml::from_str("\"0,2\"").unwrap();
        assert_eq!(range, GateRange::Span(GateBound::Index(0), GateBound::Index(2)));

        let range: GateRange = serde_yaml::from_str("[2, 0, 1]").unwrap();
        assert_eq!(range.declared_gates().unwrap().indices(), &[0, 1, 2]);

        let range: GateRange = serde_yaml::from_str("4").unwrap();
        assert_eq!(range, GateRange::Single(GateBound::Index(4)));

        assert!(serde_yaml::from_str::<GateRange>("[]").is_err());
    }

    #[test]
    fn test_declared_gates() {
        let single: GateRange = "2".parse().unwrap();
        assert_eq!(single.declared_gates().unwrap().indices(), &[2]);

        let symbolic: GateRange = "start,last".parse().unwrap();
        assert!(symbolic.declared_gates().is_none());
    }

    #[test]
    fn test_numeric_span_is_not_declared() {
        let span: GateRange = "1,3".parse().unwrap();
        assert!(span.declared_gates().is_none());

        let typo: GateRange = "0,4000000000".parse().unwrap();
        assert!(typo.declared_gates().is_none());
    }

    #[test]
    fn test_span_string() {
        assert_eq!(GateList::new([0, 1, 3]).unwrap().span_string(), "0,3");
        assert_eq!(GateList::new([7]).unwrap().span_string(), "7");
    }
}
