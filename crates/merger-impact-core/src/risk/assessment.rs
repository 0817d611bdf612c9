use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::warn;

use crate::impact::pass_through::pass_through;
use crate::market_structure::concentration::HHI_MAX;
use crate::params::{review_params, BehavioralParams};
use crate::risk::classifier::{assess_risk, RiskAssessment, RiskInputs, RiskModel};
use crate::risk::policy::{PolicyTable, EU};
use crate::types::*;
use crate::MergerImpactResult;

fn default_regime() -> String {
    EU.to_string()
}

/// Standalone risk scoring from known concentration figures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskInput {
    pub hhi_pre: Hhi,
    pub hhi_post: Hhi,
    /// Derived from `params` when absent.
    #[serde(default)]
    pub pass_through: Option<f64>,
    #[serde(default)]
    pub params: BehavioralParams,
    #[serde(default = "default_regime")]
    pub policy: String,
    #[serde(default)]
    pub model: RiskModel,
}

/// Score a merger from pre/post HHI against the regime's thresholds.
pub fn assess_merger_risk(
    input: &RiskInput,
    policies: &PolicyTable,
) -> MergerImpactResult<ComputationOutput<RiskAssessment>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    policies.validate()?;
    let params = review_params(&input.params, &mut warnings);

    for (field, value) in [("hhi_pre", input.hhi_pre), ("hhi_post", input.hhi_post)] {
        if value > HHI_MAX {
            warn!(field, value, "HHI outside 0..=10000");
            warnings.push(format!("{field} {value} exceeds the HHI maximum of {HHI_MAX}"));
        }
    }

    if input.hhi_post < input.hhi_pre {
        warn!(
            pre = input.hhi_pre,
            post = input.hhi_post,
            "post-merger HHI below pre-merger; change clamped to zero"
        );
        warnings.push(format!(
            "Post-merger HHI {} is below pre-merger HHI {}; change clamped to 0",
            input.hhi_post, input.hhi_pre
        ));
    }

    let pt = match input.pass_through {
        Some(v) if v.is_finite() => v,
        Some(_) => {
            warnings.push("pass_through is not a finite number; derived from params".into());
            pass_through(&params)
        }
        None => pass_through(&params),
    };

    let inputs = RiskInputs {
        hhi_pre: input.hhi_pre,
        hhi_post: input.hhi_post,
        pass_through: pt,
        params,
    };
    let assessment = assess_risk(input.model, &inputs, policies, &input.policy);
    if assessment.policy.fallback {
        warnings.push(format!(
            "Unknown policy regime '{}'; applied '{}'",
            assessment.policy.requested, assessment.policy.applied
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        match input.model {
            RiskModel::Threshold => "Threshold screen on HHI change and post-merger HHI",
            RiskModel::Contestability => {
                "Structural severity x pass-through amplification x contestability mitigation"
            }
        },
        &serde_json::json!({
            "regime": assessment.policy.applied,
            "thresholds": assessment.policy.thresholds,
            "pass_through": pt,
        }),
        warnings,
        elapsed,
        assessment,
    ))
}
