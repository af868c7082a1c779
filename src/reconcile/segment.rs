// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Rewrites the first-gate token `_g<first>` of a single path component to
/// the gate-list signature `_g<signature>`.
///
/// A component matches only where the token is followed by end of name, `_`
/// or `.`, so `_g0` never matches inside `_g0-2` or `_g01`. That makes the
/// rewrite idempotent. The last matching occurrence is the one replaced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateRewrite {
    first_gate: u32,
    signature: String,
    from: String,
    to: String,
}

impl GateRewrite {
    /// `None` when the signature equals the first gate, i.e. a single gate.
    pub fn new(first_gate: u32, signature: &str) -> Option<Self> {
        if signature == first_gate.to_string() {
            return None;
        }
        Some(Self {
            first_gate,
            signature: signature.to_string(),
            from: format!("_g{}", first_gate),
            to: format!("_g{}", signature),
        })
    }

    pub fn first_gate(&self) -> u32 {
        self.first_gate
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    fn last_match(&self, name: &str) -> Option<usize> {
        name.match_indices(&self.from)
            .map(|(at, _)| at)
            .filter(|&at| {
                matches!(
                    name[at + self.from.len()..].chars().next(),
                    None | Some('_') | Some('.')
                )
            })
            .last()
    }

    pub fn matches(&self, name: &str) -> bool {
        self.last_match(name).is_some()
    }

    /// The rewritten component, or `None` when it carries no first-gate token.
    ///
    /// ```
    /// use sglx_pipeline::reconcile::GateRewrite;
    ///
    /// let rewrite = GateRewrite::new(0, "0-2").unwrap();
    /// assert_eq!(
    ///     rewrite.rewrite("sess1_g0_tcat.imec0.ap.bin").as_deref(),
    ///     Some("sess1_g0-2_tcat.imec0.ap.bin")
    /// );
    /// assert_eq!(rewrite.rewrite("sess1_g0-2_imec0"), None);
    /// ```
    pub fn rewrite(&self, name: &str) -> Option<String> {
        let at = self.last_match(name)?;
        let mut out = String::with_capacity(name.len() + self.to.len());
        out.push_str(&name[..at]);
        out.push_str(&self.to);
        out.push_str(&name[at + self.from.len()..]);
        Some(out)
    }
}
