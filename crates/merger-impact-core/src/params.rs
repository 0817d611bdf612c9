//! Behavioral parameters shared by every scoring formula.

use serde::{Deserialize, Serialize};

use tracing::warn;

use crate::types::clamp_range;

/// Upper bound of the nominal innovation range. 1.0 is neutral.
pub const INNOVATION_MAX: f64 = 2.0;

/// Behavioral and structural knobs of a merger scenario.
///
/// `conduct`, `demand_flex` and `entry_barriers` are nominally in `[0, 1]`;
/// `innovation_mult` is nominally in `[0, 2]`. Values outside are accepted
/// and clamped wherever a formula assumes the nominal range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BehavioralParams {
    /// 0 = competitive, 1 = fully collusive.
    pub conduct: f64,
    /// Market breadth / demand substitutability.
    #[serde(alias = "flex")]
    pub demand_flex: f64,
    #[serde(alias = "entry")]
    pub entry_barriers: f64,
    #[serde(alias = "innov")]
    pub innovation_mult: f64,
}

impl Default for BehavioralParams {
    fn default() -> Self {
        Self {
            conduct: 0.35,
            demand_flex: 0.45,
            entry_barriers: 0.40,
            innovation_mult: 1.0,
        }
    }
}

impl BehavioralParams {
    /// Copy with every field clamped into its nominal range.
    pub fn clamped(&self) -> Self {
        Self {
            conduct: clamp_range(self.conduct, 0.0, 1.0),
            demand_flex: clamp_range(self.demand_flex, 0.0, 1.0),
            entry_barriers: clamp_range(self.entry_barriers, 0.0, 1.0),
            innovation_mult: clamp_range(self.innovation_mult, 0.0, INNOVATION_MAX),
        }
    }

    /// Names of the fields that arrived outside their nominal range.
    pub fn out_of_range(&self) -> Vec<&'static str> {
        let c = self.clamped();
        let mut names = Vec::new();
        if c.conduct != self.conduct {
            names.push("conduct");
        }
        if c.demand_flex != self.demand_flex {
            names.push("demand_flex");
        }
        if c.entry_barriers != self.entry_barriers {
            names.push("entry_barriers");
        }
        if c.innovation_mult != self.innovation_mult {
            names.push("innovation_mult");
        }
        names
    }

    /// Copy with every non-finite field replaced by 0.
    pub fn finite_or_zero(&self) -> Self {
        let f = |v: f64| if v.is_finite() { v } else { 0.0 };
        Self {
            conduct: f(self.conduct),
            demand_flex: f(self.demand_flex),
            entry_barriers: f(self.entry_barriers),
            innovation_mult: f(self.innovation_mult),
        }
    }

    fn fields(&self) -> [(&'static str, f64); 4] {
        [
            ("conduct", self.conduct),
            ("demand_flex", self.demand_flex),
            ("entry_barriers", self.entry_barriers),
            ("innovation_mult", self.innovation_mult),
        ]
    }
}

/// Replace non-finite parameters with 0 and note every field outside its
/// nominal range. The returned copy is not clamped; formulas clamp at use.
pub fn review_params(params: &BehavioralParams, warnings: &mut Vec<String>) -> BehavioralParams {
    for (name, value) in params.fields() {
        if !value.is_finite() {
            warn!(field = name, "non-finite parameter treated as 0");
            warnings.push(format!("{name} is not a finite number; treated as 0"));
        }
    }
    let finite = params.finite_or_zero();
    for name in finite.out_of_range() {
        warn!(field = name, "parameter outside nominal range");
        warnings.push(format!(
            "{name} is outside its nominal range; clamped where used"
        ));
    }
    finite
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamped_bounds() {
        let p = BehavioralParams {
            conduct: 1.4,
            demand_flex: -0.2,
            entry_barriers: 0.5,
            innovation_mult: 3.0,
        };
        let c = p.clamped();
        assert_eq!(c.conduct, 1.0);
        assert_eq!(c.demand_flex, 0.0);
        assert_eq!(c.entry_barriers, 0.5);
        assert_eq!(c.innovation_mult, INNOVATION_MAX);
        assert_eq!(
            p.out_of_range(),
            vec!["conduct", "demand_flex", "innovation_mult"]
        );
    }

    #[test]
    fn test_nan_maps_to_lower_bound() {
        let p = BehavioralParams {
            conduct: f64::NAN,
            ..Default::default()
        };
        assert_eq!(p.clamped().conduct, 0.0);
        assert_eq!(p.out_of_range(), vec!["conduct"]);
    }

    #[test]
    fn test_review_params_warnings() {
        let p = BehavioralParams {
            conduct: f64::INFINITY,
            demand_flex: 1.2,
            ..Default::default()
        };
        let mut warnings = Vec::new();
        let reviewed = review_params(&p, &mut warnings);
        assert_eq!(reviewed.conduct, 0.0);
        assert_eq!(reviewed.demand_flex, 1.2);
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].starts_with("conduct"));
        assert!(warnings[1].starts_with("demand_flex"));
    }

    #[test]
    fn test_review_params_clean() {
        let mut warnings = Vec::new();
        let reviewed = review_params(&BehavioralParams::default(), &mut warnings);
        assert_eq!(reviewed, BehavioralParams::default());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_short_field_aliases() {
        let p: BehavioralParams = serde_json::from_str(
            r#"{"conduct":0.35,"flex":0.40,"entry":0.60,"innov":1.00}"#,
        )
        .unwrap();
        assert_eq!(p.demand_flex, 0.40);
        assert_eq!(p.entry_barriers, 0.60);
        assert_eq!(p.innovation_mult, 1.0);
    }
}
