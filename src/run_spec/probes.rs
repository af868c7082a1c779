// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashSet;

/// Expands a probe string such as `"0"`, `"0,3"`, `"0:3"` or `"0,2:3"`.
///
/// Ranges are inclusive. The result keeps the written order and must be
/// non-empty with no repeated probe.
pub fn parse_probe_list(probes: &str) -> Result<Vec<String>, String> {
    let mut result = Vec::new();
    for item in probes.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match item.split_once(':') {
            Some((start, end)) => {
                let start: u32 = start
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid probe range '{}'", item))?;
                let end: u32 = end
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid probe range '{}'", item))?;
                if start > end {
                    return Err(format!("probe range '{}' is reversed", item));
                }
                result.extend((start..=end).map(|p| p.to_string()));
            }
            None => {
                let probe: u32 = item
                    .parse()
                    .map_err(|_| format!("invalid probe id '{}'", item))?;
                result.push(probe.to_string());
            }
        }
    }

    if result.is_empty() {
        return Err(format!("probe string '{}' selects no probes", probes));
    }

    let mut seen = HashSet::new();
    if let Some(duplicate) = result.iter().find(|p| !seen.insert(p.as_str())) {
        return Err(format!("probe {} is listed more than once", duplicate));
    }
    Ok(result)
}
