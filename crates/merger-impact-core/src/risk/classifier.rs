//! Low / Medium / High merger risk verdicts.
//!
//! Two strategies sit behind `RiskClassifier`:
//!
//! 1. **Threshold** -- raw ΔHHI and post-merger HHI against the regime's
//!    high and medium thresholds.
//! 2. **Contestability** -- structural severity amplified by pass-through and
//!    mitigated by market breadth, low entry barriers and innovation.
//!
//! Both are pure functions of their inputs and the thresholds.

use serde::{Deserialize, Serialize};

use crate::params::BehavioralParams;
use crate::risk::policy::{AppliedPolicy, PolicyTable, PolicyThresholds};
use crate::types::{clamp_range, Hhi};

pub const HIGH_INDEX: f64 = 1.0;
pub const MEDIUM_INDEX: f64 = 0.6;
pub const MAX_MITIGATION: f64 = 0.75;
pub const MAX_PASS_THROUGH: f64 = 1.5;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskVerdict {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RiskVerdict::Low => "Low",
            RiskVerdict::Medium => "Medium",
            RiskVerdict::High => "High",
        };
        f.write_str(s)
    }
}

/// Which classifier strategy to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RiskModel {
    Threshold,
    #[default]
    Contestability,
}

impl RiskModel {
    pub fn classifier(&self) -> &'static dyn RiskClassifier {
        match self {
            RiskModel::Threshold => &ThresholdClassifier,
            RiskModel::Contestability => &ContestabilityClassifier,
        }
    }
}

/// Everything a classifier may look at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskInputs {
    pub hhi_pre: Hhi,
    pub hhi_post: Hhi,
    pub pass_through: f64,
    pub params: BehavioralParams,
}

impl RiskInputs {
    /// `post - pre`, floored at zero.
    pub fn delta(&self) -> Hhi {
        self.hhi_post.saturating_sub(self.hhi_pre)
    }
}

/// Output of one classifier run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskScore {
    pub verdict: RiskVerdict,
    /// Composite index, for strategies that compute one.
    pub index: Option<f64>,
}

/// Verdict plus the policy and strategy that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub verdict: RiskVerdict,
    pub index: Option<f64>,
    pub model: RiskModel,
    pub policy: AppliedPolicy,
}

pub trait RiskClassifier: Sync {
    fn model(&self) -> RiskModel;
    fn score(&self, inputs: &RiskInputs, thresholds: &PolicyThresholds) -> RiskScore;
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// Pure threshold rule on ΔHHI and post-merger HHI.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdClassifier;

impl RiskClassifier for ThresholdClassifier {
    fn model(&self) -> RiskModel {
        RiskModel::Threshold
    }

    fn score(&self, inputs: &RiskInputs, th: &PolicyThresholds) -> RiskScore {
        let delta = f64::from(inputs.delta());
        let post = f64::from(inputs.hhi_post);
        let verdict = if delta >= th.delta_high || post >= th.post_high {
            RiskVerdict::High
        } else if delta >= th.delta_medium || post >= th.post_medium {
            RiskVerdict::Medium
        } else {
            RiskVerdict::Low
        };
        RiskScore {
            verdict,
            index: None,
        }
    }
}

/// Structural severity x pass-through amplification x (1 - contestability).
#[derive(Debug, Clone, Copy, Default)]
pub struct ContestabilityClassifier;

impl RiskClassifier for ContestabilityClassifier {
    fn model(&self) -> RiskModel {
        RiskModel::Contestability
    }

    fn score(&self, inputs: &RiskInputs, th: &PolicyThresholds) -> RiskScore {
        let index = contestability_index(inputs, th);
        let verdict = if index >= HIGH_INDEX {
            RiskVerdict::High
        } else if index >= MEDIUM_INDEX {
            RiskVerdict::Medium
        } else {
            RiskVerdict::Low
        };
        RiskScore {
            verdict,
            index: Some(index),
        }
    }
}

/// `0.6 * ΔHHI / delta_high + 0.4 * HHI_post / post_high`
pub fn structural_severity(inputs: &RiskInputs, th: &PolicyThresholds) -> f64 {
    0.6 * (f64::from(inputs.delta()) / th.delta_high)
        + 0.4 * (f64::from(inputs.hhi_post) / th.post_high)
}

/// `0.7 + 0.6 * clamp(pass_through, 0, 1.5)`
pub fn pass_through_amplification(pass_through: f64) -> f64 {
    0.7 + 0.6 * clamp_range(pass_through, 0.0, MAX_PASS_THROUGH)
}

/// Share of structural risk offset by contestability, capped at 0.75.
pub fn contestability_mitigation(params: &BehavioralParams) -> f64 {
    let flex = clamp_range(params.demand_flex, 0.0, 1.0);
    let open_entry = clamp_range(1.0 - params.entry_barriers, 0.0, 1.0);
    let innovation = clamp_range((params.innovation_mult - 1.0) / 0.5, 0.0, 1.0);
    clamp_range(
        0.5 * flex + 0.3 * open_entry + 0.2 * innovation,
        0.0,
        MAX_MITIGATION,
    )
}

pub fn contestability_index(inputs: &RiskInputs, th: &PolicyThresholds) -> f64 {
    structural_severity(inputs, th)
        * pass_through_amplification(inputs.pass_through)
        * (1.0 - contestability_mitigation(&inputs.params))
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Resolve `regime` in `policies` and score `inputs` with `model`.
pub fn assess_risk(
    model: RiskModel,
    inputs: &RiskInputs,
    policies: &PolicyTable,
    regime: &str,
) -> RiskAssessment {
    let policy = policies.resolve(regime);
    let score = model.classifier().score(inputs, &policy.thresholds);
    RiskAssessment {
        verdict: score.verdict,
        index: score.index,
        model,
        policy,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
