use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::warn;

use crate::error::MergerImpactError;
use crate::market_structure::breadth::{apply_market_breadth, BreadthAdjusted};
use crate::market_structure::concentration::{concentration_indices, ConcentrationIndices};
use crate::market_structure::fringe::{count_sanitized, normalize_shares, FringeFloorPolicy};
use crate::params::{review_params, BehavioralParams};
use crate::types::*;
use crate::MergerImpactResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A named firm with its raw (unnormalized) share.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Firm {
    pub name: String,
    pub share: f64,
    /// Part of the merging group.
    #[serde(default, alias = "selected")]
    pub merging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketStructureInput {
    pub firms: Vec<Firm>,
    #[serde(default)]
    pub params: BehavioralParams,
    #[serde(default)]
    pub fringe_floor: FringeFloorPolicy,
    /// Compute HHI on the breadth-adjusted shares instead of the normalized ones.
    #[serde(default)]
    pub breadth_adjusted_hhi: bool,
}

/// Canonical share structure as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureReport {
    pub firms: Vec<String>,
    pub inside: Vec<Share>,
    pub fringe: Share,
    pub fringe_floor: Share,
    pub breadth_adjusted: BreadthAdjusted,
    /// `sum(inside) + fringe` of the normalized structure.
    pub shares_sum: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketStructureOutput {
    pub structure: StructureReport,
    pub hhi: ConcentrationIndices,
    pub merging_firms: Vec<String>,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Normalize, breadth-adjust and measure concentration for a set of firms.
///
/// `params` must already be reviewed; recoverable share problems are pushed
/// onto `warnings`.
pub(crate) fn build_structure(
    firms: &[Firm],
    params: &BehavioralParams,
    floor_policy: &FringeFloorPolicy,
    breadth_adjusted_hhi: bool,
    warnings: &mut Vec<String>,
) -> MergerImpactResult<(StructureReport, ConcentrationIndices)> {
    if firms.is_empty() {
        return Err(MergerImpactError::InvalidInput {
            field: "firms".into(),
            reason: "At least one firm is required".into(),
        });
    }

    let raw: Vec<f64> = firms.iter().map(|f| f.share).collect();
    let sanitized = count_sanitized(&raw);
    if sanitized > 0 {
        warn!(sanitized, "negative or non-finite shares clamped to zero");
        warnings.push(format!(
            "{sanitized} share(s) were negative or not finite and were treated as 0"
        ));
    }
    if raw.iter().all(|&s| !(s.is_finite() && s > 0.0)) {
        warn!("no positive share mass; splitting evenly");
        warnings.push("All shares are zero; inside capacity split evenly".into());
    }

    let merging: Vec<bool> = firms.iter().map(|f| f.merging).collect();
    let merging_count = merging.iter().filter(|&&m| m).count();
    if merging_count < 2 {
        warnings.push(format!(
            "Only {merging_count} firm(s) flagged as merging; post-merger HHI equals pre-merger"
        ));
    }

    let floor = floor_policy.resolve(params);
    let normalized = normalize_shares(&raw, floor);
    let adjusted = apply_market_breadth(&normalized, params.demand_flex);

    let hhi = if breadth_adjusted_hhi {
        concentration_indices(&adjusted.inside, adjusted.fringe, &merging)
    } else {
        concentration_indices(&normalized.inside, normalized.fringe, &merging)
    };
    if hhi.delta_raw < 0 {
        warn!(delta_raw = hhi.delta_raw, "negative raw HHI change clamped to zero");
        warnings.push(format!(
            "Raw HHI change was {}; clamped to 0",
            hhi.delta_raw
        ));
    }

    let report = StructureReport {
        firms: firms.iter().map(|f| f.name.clone()).collect(),
        shares_sum: normalized.total(),
        inside: normalized.inside,
        fringe: normalized.fringe,
        fringe_floor: normalized.fringe_floor,
        breadth_adjusted: adjusted,
    };
    Ok((report, hhi))
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Share structure and HHI for a set of firms, without the price pipeline.
pub fn analyze_market_structure(
    input: &MarketStructureInput,
) -> MergerImpactResult<ComputationOutput<MarketStructureOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let params = review_params(&input.params, &mut warnings);
    let (structure, hhi) = build_structure(
        &input.firms,
        &params,
        &input.fringe_floor,
        input.breadth_adjusted_hhi,
        &mut warnings,
    )?;

    let output = MarketStructureOutput {
        structure,
        hhi,
        merging_firms: input
            .firms
            .iter()
            .filter(|f| f.merging)
            .map(|f| f.name.clone())
            .collect(),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Fringe-floor share normalization with HHI concentration",
        &serde_json::json!({
            "fringe_floor_policy": input.fringe_floor,
            "fringe_floor": output.structure.fringe_floor,
            "breadth_adjusted_hhi": input.breadth_adjusted_hhi,
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn firm(name: &str, share: f64, merging: bool) -> Firm {
        Firm {
            name: name.into(),
            share,
            merging,
        }
    }

    fn big_four() -> Vec<Firm> {
        vec![
            firm("A", 0.32, true),
            firm("B", 0.23, true),
            firm("C", 0.25, false),
            firm("D", 0.20, false),
        ]
    }

    fn input(firms: Vec<Firm>) -> MarketStructureInput {
        MarketStructureInput {
            firms,
            params: BehavioralParams::default(),
            fringe_floor: FringeFloorPolicy::Static { floor: 0.20 },
            breadth_adjusted_hhi: false,
        }
    }

    #[test]
    fn test_baseline_structure() {
        let out = analyze_market_structure(&input(big_four())).unwrap();
        let r = &out.result;
        assert_eq!(r.hhi.pre, 2050);
        assert_eq!(r.hhi.post, 2992);
        assert_eq!(r.hhi.delta, 942);
        assert!((r.structure.fringe - 0.2).abs() < 1e-9);
        assert!((r.structure.shares_sum - 1.0).abs() < 1e-9);
        assert_eq!(r.merging_firms, vec!["A".to_string(), "B".to_string()]);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_empty_firms_rejected() {
        let err = analyze_market_structure(&input(vec![])).unwrap_err();
        assert!(matches!(err, MergerImpactError::InvalidInput { ref field, .. } if field == "firms"));
    }

    #[test]
    fn test_bad_shares_warn() {
        let firms = vec![firm("A", -0.4, true), firm("B", f64::NAN, true)];
        let out = analyze_market_structure(&input(firms)).unwrap();
        assert_eq!(out.warnings.len(), 2);
        let r = &out.result.structure;
        assert!((r.inside[0] - 0.4).abs() < 1e-9);
        assert!((r.inside[1] - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_single_merging_firm_warns() {
        let firms = vec![firm("A", 0.5, true), firm("B", 0.5, false)];
        let out = analyze_market_structure(&input(firms)).unwrap();
        assert_eq!(out.result.hhi.delta, 0);
        assert!(out.warnings.iter().any(|w| w.contains("flagged as merging")));
    }

    #[test]
    fn test_breadth_adjusted_hhi_lower() {
        let plain = analyze_market_structure(&input(big_four())).unwrap();
        let mut adj = input(big_four());
        adj.breadth_adjusted_hhi = true;
        let adjusted = analyze_market_structure(&adj).unwrap();
        assert!(adjusted.result.hhi.post < plain.result.hhi.post);
        assert_eq!(plain.result.structure, adjusted.result.structure);
    }
}
