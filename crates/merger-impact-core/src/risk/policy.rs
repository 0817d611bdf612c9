//! Regulatory policy thresholds.
//!
//! A `PolicyTable` is an immutable lookup from regime id to thresholds. It is
//! passed explicitly to the classifier; callers can build their own table to
//! add or override regimes. Unknown regimes fall back to the table's default
//! and the fallback is reported in the `AppliedPolicy`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::MergerImpactError;
use crate::MergerImpactResult;

pub const EU: &str = "EU";
pub const SA: &str = "SA";

/// Concentration thresholds of one regime, on the HHI scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolicyThresholds {
    #[serde(alias = "deltaHigh")]
    pub delta_high: f64,
    #[serde(alias = "postHigh")]
    pub post_high: f64,
    #[serde(alias = "deltaMed")]
    pub delta_medium: f64,
    #[serde(alias = "postMed")]
    pub post_medium: f64,
}

impl PolicyThresholds {
    pub const EU: PolicyThresholds = PolicyThresholds {
        delta_high: 150.0,
        post_high: 2500.0,
        delta_medium: 100.0,
        post_medium: 2000.0,
    };

    pub const SA: PolicyThresholds = PolicyThresholds {
        delta_high: 100.0,
        post_high: 2000.0,
        delta_medium: 50.0,
        post_medium: 1500.0,
    };

    fn validate(&self, regime: &str) -> MergerImpactResult<()> {
        let fields = [
            ("delta_high", self.delta_high),
            ("post_high", self.post_high),
            ("delta_medium", self.delta_medium),
            ("post_medium", self.post_medium),
        ];
        for (name, value) in fields {
            if !(value.is_finite() && value > 0.0) {
                return Err(MergerImpactError::InvalidInput {
                    field: format!("regimes.{regime}.{name}"),
                    reason: "Threshold must be a positive number".into(),
                });
            }
        }
        Ok(())
    }
}

/// The thresholds actually used for a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedPolicy {
    pub requested: String,
    pub applied: String,
    /// `true` when `requested` was unknown and the default regime was used.
    pub fallback: bool,
    pub thresholds: PolicyThresholds,
}

/// Immutable regime lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyTable {
    default_regime: String,
    regimes: BTreeMap<String, PolicyThresholds>,
    /// Alternate names (matched case-insensitively) for regime ids.
    #[serde(default)]
    aliases: BTreeMap<String, String>,
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PolicyTable {
    /// Build a table; the default regime must be one of `regimes`.
    pub fn new(
        default_regime: impl Into<String>,
        regimes: BTreeMap<String, PolicyThresholds>,
    ) -> MergerImpactResult<Self> {
        let table = Self {
            default_regime: default_regime.into(),
            regimes,
            aliases: BTreeMap::new(),
        };
        table.validate()?;
        Ok(table)
    }

    /// EU and SA thresholds, EU as default.
    pub fn builtin() -> Self {
        let mut regimes = BTreeMap::new();
        regimes.insert(EU.to_string(), PolicyThresholds::EU);
        regimes.insert(SA.to_string(), PolicyThresholds::SA);
        let mut aliases = BTreeMap::new();
        aliases.insert("SOUTH AFRICA".to_string(), SA.to_string());
        aliases.insert("EUROPEAN UNION".to_string(), EU.to_string());
        Self {
            default_regime: EU.to_string(),
            regimes,
            aliases,
        }
    }

    /// Copy of the table with `id` added or replaced.
    pub fn with_regime(mut self, id: impl Into<String>, thresholds: PolicyThresholds) -> Self {
        self.regimes.insert(id.into(), thresholds);
        self
    }

    pub fn with_alias(mut self, alias: &str, id: impl Into<String>) -> Self {
        self.aliases.insert(alias.to_uppercase(), id.into());
        self
    }

    /// Check a table built by hand or deserialized from a file.
    pub fn validate(&self) -> MergerImpactResult<()> {
        if !self.regimes.contains_key(&self.default_regime) {
            return Err(MergerImpactError::InvalidInput {
                field: "default_regime".into(),
                reason: format!("'{}' is not a configured regime", self.default_regime),
            });
        }
        for (id, thresholds) in &self.regimes {
            thresholds.validate(id)?;
        }
        for (alias, id) in &self.aliases {
            if !self.regimes.contains_key(id) {
                return Err(MergerImpactError::InvalidInput {
                    field: format!("aliases.{alias}"),
                    reason: format!("points at unknown regime '{id}'"),
                });
            }
        }
        Ok(())
    }

    pub fn default_regime(&self) -> &str {
        &self.default_regime
    }

    pub fn regimes(&self) -> impl Iterator<Item = (&str, &PolicyThresholds)> {
        self.regimes.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get(&self, id: &str) -> Option<&PolicyThresholds> {
        self.lookup_id(id).and_then(|k| self.regimes.get(k))
    }

    fn lookup_id(&self, requested: &str) -> Option<&str> {
        let trimmed = requested.trim();
        if let Some((k, _)) = self.regimes.get_key_value(trimmed) {
            return Some(k.as_str());
        }
        let upper = trimmed.to_uppercase();
        if let Some(k) = self.regimes.keys().find(|k| k.to_uppercase() == upper) {
            return Some(k.as_str());
        }
        self.aliases
            .iter()
            .find(|(alias, _)| alias.to_uppercase() == upper)
            .map(|(_, id)| id.as_str())
            .filter(|id| self.regimes.contains_key(*id))
    }

    /// Resolve a requested regime, falling back to the default.
    pub fn resolve(&self, requested: &str) -> AppliedPolicy {
        match self.lookup_id(requested) {
            Some(id) => AppliedPolicy {
                requested: requested.to_string(),
                applied: id.to_string(),
                fallback: false,
                thresholds: self.regimes[id],
            },
            None => {
                warn!(
                    requested,
                    applied = %self.default_regime,
                    "unknown policy regime; using default thresholds"
                );
                AppliedPolicy {
                    requested: requested.to_string(),
                    applied: self.default_regime.clone(),
                    fallback: true,
                    thresholds: self.default_thresholds(),
                }
            }
        }
    }

    fn default_thresholds(&self) -> PolicyThresholds {
        self.regimes
            .get(&self.default_regime)
            .copied()
            .unwrap_or(PolicyThresholds::EU)
    }
}
