use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::security::DEFAULT_MAX_ENTRIES;

/// How `check` reports a request that is only partly granted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PartialGrantPolicy {
    /// Report the granted subset of the request.
    #[default]
    Intersect,
    /// Report nothing unless every requested bit is granted.
    AllOrNothing,
}

/// Process-wide settings applied to every checker unless overridden.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GlobalAccessConfig {
    pub partial_grant: PartialGrantPolicy,
    /// Descriptors with more DACL entries than this are rejected as malformed.
    pub max_entries: usize,
    /// Emit an info event per decision on `sdaccess::check`.
    pub log_decisions: bool,
}

impl Default for GlobalAccessConfig {
    fn default() -> Self {
        Self {
            partial_grant: PartialGrantPolicy::Intersect,
            max_entries: DEFAULT_MAX_ENTRIES,
            log_decisions: true,
        }
    }
}

impl GlobalAccessConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).context("parse access config")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read access config: {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("in {}", path.display()))
    }
}

/// Per resource class overrides. Unspecified values inherit from global.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct CheckerOverrides {
    pub partial_grant: Option<PartialGrantPolicy>,
    pub max_entries: Option<usize>,
    pub log_decisions: Option<bool>,
}

/// Fully resolved settings a checker runs with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EffectiveConfig {
    pub partial_grant: PartialGrantPolicy,
    pub max_entries: usize,
    pub log_decisions: bool,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self::from_layers(&GlobalAccessConfig::default(), None)
    }
}

impl EffectiveConfig {
    pub fn from_layers(global: &GlobalAccessConfig, overrides: Option<&CheckerOverrides>) -> Self {
        let mut out = Self {
            partial_grant: global.partial_grant,
            max_entries: global.max_entries,
            log_decisions: global.log_decisions,
        };
        if let Some(ov) = overrides {
            if let Some(p) = ov.partial_grant { out.partial_grant = p; }
            if let Some(n) = ov.max_entries { out.max_entries = n; }
            if let Some(l) = ov.log_decisions { out.log_decisions = l; }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let eff = EffectiveConfig::default();
        assert_eq!(eff.partial_grant, PartialGrantPolicy::Intersect);
        assert_eq!(eff.max_entries, 1024);
        assert!(eff.log_decisions);
    }

    #[test]
    fn overrides_take_precedence() {
        let global = GlobalAccessConfig { max_entries: 64, ..Default::default() };
        let ov = CheckerOverrides { partial_grant: Some(PartialGrantPolicy::AllOrNothing), ..Default::default() };
        let eff = EffectiveConfig::from_layers(&global, Some(&ov));
        assert_eq!(eff.partial_grant, PartialGrantPolicy::AllOrNothing);
        assert_eq!(eff.max_entries, 64);
        assert!(eff.log_decisions);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let g = GlobalAccessConfig::from_json_str(r#"{"partial_grant": "all_or_nothing"}"#).unwrap();
        assert_eq!(g.partial_grant, PartialGrantPolicy::AllOrNothing);
        assert_eq!(g.max_entries, DEFAULT_MAX_ENTRIES);
        assert!(GlobalAccessConfig::from_json_str(r#"{"partial_grant": "sometimes"}"#).is_err());
    }
}
