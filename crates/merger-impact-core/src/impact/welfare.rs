//! Welfare decomposition.
//!
//! Allocates a basis-point price effect across consumers, the merged entity,
//! non-merging rivals and deadweight loss. Units are illustrative money
//! (R bn) at a fixed `bps -> money` scale. Negative means a welfare loss.
//!
//! All arithmetic uses `rust_decimal::Decimal` so the components add up to
//! the reported net exactly.

use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::MergerImpactError;
use crate::params::BehavioralParams;
use crate::types::{Bps, Money};
use crate::MergerImpactResult;

/// Decimal places each component is rounded to.
pub const WELFARE_DP: u32 = 3;

/// 15 bps of impact correspond to one unit of money.
fn bps_to_money() -> Decimal {
    Decimal::ONE / dec!(15)
}

// Efficiency weights
const INNOVATION_WEIGHT: Decimal = dec!(0.70);
const ENTRY_WEIGHT: Decimal = dec!(0.40);
const CONDUCT_WEIGHT: Decimal = dec!(0.30);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelfareDecomposition {
    pub consumer: Money,
    pub merged: Money,
    pub rivals: Money,
    pub deadweight: Money,
    /// Exact sum of the four rounded components.
    pub net: Money,
    /// Efficiency credit folded into the merged-entity surplus.
    pub efficiency: Decimal,
}

fn to_decimal(value: f64, field: &str) -> MergerImpactResult<Decimal> {
    Decimal::from_f64(value).ok_or_else(|| MergerImpactError::InvalidInput {
        field: field.into(),
        reason: format!("{value} is not representable as a decimal"),
    })
}

/// `max(0, 0.70*(innov - 1) + 0.40*entry - 0.30*conduct)`
pub fn efficiency_credit(params: &BehavioralParams) -> MergerImpactResult<Decimal> {
    let p = params.clamped();
    let innov = to_decimal(p.innovation_mult, "innovation_mult")?;
    let entry = to_decimal(p.entry_barriers, "entry_barriers")?;
    let conduct = to_decimal(p.conduct, "conduct")?;
    let raw = INNOVATION_WEIGHT * (innov - Decimal::ONE) + ENTRY_WEIGHT * entry
        - CONDUCT_WEIGHT * conduct;
    Ok(raw.max(Decimal::ZERO))
}

/// Split `bps` of price impact into stakeholder welfare deltas.
pub fn decompose_welfare(
    bps: Bps,
    pass_through: f64,
    params: &BehavioralParams,
) -> MergerImpactResult<WelfareDecomposition> {
    let bps = to_decimal(bps, "bps_impact")?;
    let pt = to_decimal(pass_through, "pass_through")?;
    let k = bps_to_money();
    let efficiency = efficiency_credit(params)?;

    // Consumers bear only the passed-through share.
    let consumer = -pt * bps * k;

    let merged = (Decimal::ONE - pt) * bps * k * dec!(0.6) + efficiency;

    // Rivals ride a high pass-through, lose share under a low one.
    let rival_rate = if pt >= dec!(0.5) { dec!(0.10) } else { dec!(-0.05) };
    let rivals = rival_rate * bps * k;

    let dwl_base = dec!(0.5) * pt * bps * k;
    let dampening = Decimal::ONE - dec!(0.6) * efficiency.min(Decimal::ONE);
    let deadweight = -(dwl_base * dampening).max(Decimal::ZERO);

    let consumer = consumer.round_dp(WELFARE_DP);
    let merged = merged.round_dp(WELFARE_DP);
    let rivals = rivals.round_dp(WELFARE_DP);
    let deadweight = deadweight.round_dp(WELFARE_DP);

    Ok(WelfareDecomposition {
        net: consumer + merged + rivals + deadweight,
        consumer,
        merged,
        rivals,
        deadweight,
        efficiency,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
