//! End-to-end scenario evaluation.
//!
//! Scenario -> share structure -> HHI -> counterfactual price path ->
//! pass-through and price impact -> welfare -> risk verdict, composed into a
//! single `ScenarioResult`. Every stage is a pure function of the scenario,
//! so equal inputs (seed included) replay bit for bit.

use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

use crate::counterfactual::forecast::{run_forecast, SeriesOutput};
use crate::counterfactual::series::PriceData;
use crate::counterfactual::vmm::FitDiagnostics;
use crate::impact::pass_through::{base_substitution_label, estimate_price_impact, SubstitutionLevel};
use crate::impact::welfare::{decompose_welfare, WelfareDecomposition};
use crate::market_structure::analysis::{build_structure, Firm, StructureReport};
use crate::market_structure::concentration::ConcentrationIndices;
use crate::params::{review_params, BehavioralParams};
use crate::risk::classifier::{assess_risk, RiskInputs, RiskModel, RiskVerdict};
use crate::risk::policy::{AppliedPolicy, PolicyTable, EU};
use crate::scenario::settings::EngineSettings;
use crate::types::*;
use crate::MergerImpactResult;

fn default_policy() -> String {
    EU.to_string()
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One merger scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioInput {
    pub firms: Vec<Firm>,
    #[serde(default)]
    pub params: BehavioralParams,
    /// Policy regime id, e.g. "EU" or "SA".
    #[serde(default = "default_policy")]
    pub policy: String,
    #[serde(default)]
    pub seed: u32,
    pub price_data: PriceData,
    #[serde(default)]
    pub settings: EngineSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub hhi: ConcentrationIndices,
    pub bps_impact: Bps,
    pub pass_through: f64,
    pub welfare: WelfareDecomposition,
    pub risk: RiskVerdict,
    pub risk_model: RiskModel,
    /// Composite index; contestability model only.
    pub risk_index: Option<f64>,
    pub policy: AppliedPolicy,
    pub substitution: SubstitutionLevel,
    pub series: SeriesOutput,
    pub fit_diagnostics: FitDiagnostics,
    pub structure: StructureReport,
    pub seed: u32,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Evaluate a scenario against the built-in EU/SA policy table.
pub fn evaluate_scenario(
    input: &ScenarioInput,
) -> MergerImpactResult<ComputationOutput<ScenarioResult>> {
    evaluate_scenario_with_policies(input, &PolicyTable::builtin())
}

/// Evaluate a scenario against a caller-supplied policy table.
pub fn evaluate_scenario_with_policies(
    input: &ScenarioInput,
    policies: &PolicyTable,
) -> MergerImpactResult<ComputationOutput<ScenarioResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    policies.validate()?;
    let settings = &input.settings;
    let params = review_params(&input.params, &mut warnings);

    // ------------------------------------------------------------------
    // 1. Market structure and concentration
    // ------------------------------------------------------------------
    let (structure, hhi) = build_structure(
        &input.firms,
        &params,
        &settings.fringe_floor,
        settings.breadth_adjusted_hhi,
        &mut warnings,
    )?;

    // ------------------------------------------------------------------
    // 2. Counterfactual price path
    // ------------------------------------------------------------------
    let (series, prediction) =
        run_forecast(&input.price_data, input.seed, &settings.forecast, &mut warnings)?;

    // ------------------------------------------------------------------
    // 3. Price impact and welfare
    // ------------------------------------------------------------------
    let impact = estimate_price_impact(hhi.delta, &params);
    let welfare = decompose_welfare(impact.bps_impact, impact.pass_through, &params)?;

    // ------------------------------------------------------------------
    // 4. Risk
    // ------------------------------------------------------------------
    let risk_inputs = RiskInputs {
        hhi_pre: hhi.pre,
        hhi_post: hhi.post,
        pass_through: impact.pass_through,
        params,
    };
    let assessment = assess_risk(settings.risk_model, &risk_inputs, policies, &input.policy);
    if assessment.policy.fallback {
        warnings.push(format!(
            "Unknown policy regime '{}'; applied '{}'",
            assessment.policy.requested, assessment.policy.applied
        ));
    }

    info!(
        seed = input.seed,
        firms = input.firms.len(),
        hhi_pre = hhi.pre,
        hhi_post = hhi.post,
        bps = impact.bps_impact,
        verdict = %assessment.verdict,
        regime = %assessment.policy.applied,
        "scenario evaluated"
    );

    let result = ScenarioResult {
        hhi,
        bps_impact: impact.bps_impact,
        pass_through: impact.pass_through,
        welfare,
        risk: assessment.verdict,
        risk_model: assessment.model,
        risk_index: assessment.index,
        policy: assessment.policy,
        substitution: base_substitution_label(params.demand_flex),
        series,
        fit_diagnostics: prediction.diagnostics,
        structure,
        seed: input.seed,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Merger impact: fringe-floor HHI, smoothed counterfactual with residual bootstrap, \
         pass-through welfare split and policy risk screen",
        &serde_json::json!({
            "fringe_floor_policy": settings.fringe_floor,
            "risk_model": settings.risk_model,
            "breadth_adjusted_hhi": settings.breadth_adjusted_hhi,
            "forecast": settings.forecast,
            "regime": result.policy.applied,
            "thresholds": result.policy.thresholds,
        }),
        warnings,
        elapsed,
        result,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counterfactual::series::SeriesShape;
    use crate::error::MergerImpactError;
    use crate::market_structure::fringe::FringeFloorPolicy;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn firm(name: &str, share: f64, merging: bool) -> Firm {
        Firm {
            name: name.into(),
            share,
            merging,
        }
    }

    fn baseline() -> ScenarioInput {
        ScenarioInput {
            firms: vec![
                firm("Alpha", 0.32, true),
                firm("Beta", 0.23, true),
                firm("Gamma", 0.25, false),
                firm("Delta", 0.20, false),
            ],
            params: BehavioralParams {
                conduct: 0.35,
                demand_flex: 0.40,
                entry_barriers: 0.60,
                innovation_mult: 1.00,
            },
            policy: "EU".into(),
            seed: 42,
            price_data: PriceData::Synthetic {
                merger_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
                shape: SeriesShape::Monthly,
            },
            settings: EngineSettings {
                fringe_floor: FringeFloorPolicy::Static { floor: 0.20 },
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_baseline_figures() {
        let out = evaluate_scenario(&baseline()).unwrap();
        let r = &out.result;
        assert_eq!(r.hhi.pre, 2050);
        assert_eq!(r.hhi.post, 2992);
        assert_eq!(r.hhi.delta, 942);
        assert!((r.pass_through - 0.52).abs() < 1e-12);
        assert!((r.bps_impact - 23.115728).abs() < 1e-9);
        assert_eq!(r.welfare.consumer, dec!(-0.801));
        assert_eq!(r.welfare.merged, dec!(0.579));
        assert_eq!(r.welfare.rivals, dec!(0.154));
        assert_eq!(r.welfare.deadweight, dec!(-0.368));
        assert_eq!(r.welfare.net, dec!(-0.436));
        assert_eq!(r.substitution, SubstitutionLevel::Medium);
        assert_eq!(r.risk_model, RiskModel::Contestability);
        assert!(r.risk_index.is_some());
        assert!(!r.policy.fallback);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_series_aligned() {
        let out = evaluate_scenario(&baseline()).unwrap();
        let s = &out.result.series;
        let n = s.dates.len();
        assert_eq!(n, 25);
        for len in [s.labels.len(), s.observed.len(), s.predicted.len(), s.ci_low.len(), s.ci_high.len()] {
            assert_eq!(len, n);
        }
    }

    #[test]
    fn test_replay_is_identical() {
        let a = evaluate_scenario(&baseline()).unwrap();
        let b = evaluate_scenario(&baseline()).unwrap();
        assert_eq!(a.result, b.result);
    }

    #[test]
    fn test_seed_changes_series_only() {
        let a = evaluate_scenario(&baseline()).unwrap();
        let mut other = baseline();
        other.seed = 43;
        let b = evaluate_scenario(&other).unwrap();
        assert_ne!(a.result.series.observed, b.result.series.observed);
        assert_eq!(a.result.hhi, b.result.hhi);
        assert_eq!(a.result.welfare, b.result.welfare);
        assert_eq!(a.result.risk, b.result.risk);
    }

    #[test]
    fn test_empty_firms_fail() {
        let mut input = baseline();
        input.firms.clear();
        assert!(matches!(
            evaluate_scenario(&input),
            Err(MergerImpactError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_unknown_regime_falls_back() {
        let mut input = baseline();
        input.policy = "Narnia".into();
        let out = evaluate_scenario(&input).unwrap();
        assert!(out.result.policy.fallback);
        assert_eq!(out.result.policy.requested, "Narnia");
        assert_eq!(out.result.policy.applied, "EU");
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_out_of_range_params_warn_once_each() {
        let mut input = baseline();
        input.params.conduct = 1.5;
        input.params.innovation_mult = 2.5;
        let out = evaluate_scenario(&input).unwrap();
        assert_eq!(out.warnings.len(), 2);
    }

    #[test]
    fn test_threshold_model_has_no_index() {
        let mut input = baseline();
        input.settings.risk_model = RiskModel::Threshold;
        let out = evaluate_scenario(&input).unwrap();
        assert_eq!(out.result.risk, RiskVerdict::High);
        assert_eq!(out.result.risk_index, None);
    }
}
