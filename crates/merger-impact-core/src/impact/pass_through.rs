//! Pass-through and basis-point price impact.
//!
//! Closed-form monotone mappings: impact rises with the concentration change,
//! conduct and entry barriers and falls with innovation.

use serde::{Deserialize, Serialize};

use crate::params::BehavioralParams;
use crate::types::{clamp_range, Bps, Hhi};

pub const PASS_THROUGH_MIN: f64 = 0.05;
pub const PASS_THROUGH_MAX: f64 = 0.95;

/// Pass-through multiplier and price effect for a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceImpact {
    pub pass_through: f64,
    pub bps_impact: Bps,
}

/// How readily customers substitute away, bucketed from `demand_flex`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubstitutionLevel {
    Low,
    Medium,
    High,
}

/// `clamp(0.3 + 0.4*conduct + 0.2*entry - 0.1*flex, 0.05, 0.95)`
pub fn pass_through(params: &BehavioralParams) -> f64 {
    let p = params.clamped();
    clamp_range(
        0.3 + 0.4 * p.conduct + 0.2 * p.entry_barriers - 0.1 * p.demand_flex,
        PASS_THROUGH_MIN,
        PASS_THROUGH_MAX,
    )
}

/// `(2 + 0.02*ΔHHI) * (1 + 0.5*conduct) * (1 + 0.3*entry) * (1 - 0.2*innov)`
pub fn price_impact_bps(delta_hhi: Hhi, params: &BehavioralParams) -> Bps {
    let p = params.clamped();
    (2.0 + 0.02 * f64::from(delta_hhi))
        * (1.0 + 0.5 * p.conduct)
        * (1.0 + 0.3 * p.entry_barriers)
        * (1.0 - 0.2 * p.innovation_mult)
}

pub fn estimate_price_impact(delta_hhi: Hhi, params: &BehavioralParams) -> PriceImpact {
    PriceImpact {
        pass_through: pass_through(params),
        bps_impact: price_impact_bps(delta_hhi, params),
    }
}

pub fn base_substitution_label(demand_flex: f64) -> SubstitutionLevel {
    if demand_flex < 0.33 {
        SubstitutionLevel::Low
    } else if demand_flex < 0.66 {
        SubstitutionLevel::Medium
    } else {
        SubstitutionLevel::High
    }
}
