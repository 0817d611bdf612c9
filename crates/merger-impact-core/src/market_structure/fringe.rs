//! Fringe floor and share normalization.
//!
//! Raw per-firm shares arrive from sliders or payloads and need not sum to 1.
//! The normalizer turns them into a probability simplex of named ("inside")
//! firms plus a competitive fringe that never drops below a floor.
//!
//! Two floor strategies exist: a dynamic floor driven by the behavioral
//! parameters and a static caller-supplied floor. Both are clamped to
//! `[FRINGE_FLOOR_MIN, FRINGE_FLOOR_MAX]`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::params::BehavioralParams;
use crate::types::{clamp_range, Share};

pub const FRINGE_FLOOR_MIN: f64 = 0.10;
pub const FRINGE_FLOOR_MAX: f64 = 0.50;
pub const DEFAULT_STATIC_FLOOR: f64 = 0.20;

/// Tolerance for the simplex invariant.
pub const SIMPLEX_TOLERANCE: f64 = 1e-9;

/// Below this total raw mass the shares are treated as all-zero.
const ZERO_MASS: f64 = 1e-12;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Which fringe floor the normalizer honors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type")]
pub enum FringeFloorPolicy {
    /// Floor derived from breadth, entry barriers and innovation.
    #[default]
    Dynamic,
    /// Fixed floor regardless of the behavioral parameters.
    Static { floor: f64 },
}

impl FringeFloorPolicy {
    /// Resolve the floor for a parameter set.
    pub fn resolve(&self, params: &BehavioralParams) -> Share {
        match self {
            FringeFloorPolicy::Dynamic => dynamic_fringe_floor(params),
            FringeFloorPolicy::Static { floor } => {
                clamp_range(*floor, FRINGE_FLOOR_MIN, FRINGE_FLOOR_MAX)
            }
        }
    }
}

/// Inside shares (one per named firm) plus the fringe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareStructure {
    pub inside: Vec<Share>,
    pub fringe: Share,
    pub fringe_floor: Share,
}

impl ShareStructure {
    pub fn total(&self) -> f64 {
        self.inside.iter().sum::<f64>() + self.fringe
    }

    /// Every component as a separate entity: inside firms, then the fringe.
    pub fn components(&self) -> Vec<Share> {
        let mut v = self.inside.clone();
        v.push(self.fringe);
        v
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Fringe floor as a function of the behavioral parameters.
///
/// 20% baseline, up to +15% for a broad market, up to -10% for high entry
/// barriers and ±5% per unit of innovation away from neutral, clamped to
/// `[0.10, 0.50]`.
pub fn dynamic_fringe_floor(params: &BehavioralParams) -> Share {
    let p = params.clamped();
    let base = 0.20;
    let breadth = 0.15 * p.demand_flex;
    let barriers = -0.10 * p.entry_barriers;
    let innovation = 0.05 * (p.innovation_mult - 1.0);
    clamp_range(
        base + breadth + barriers + innovation,
        FRINGE_FLOOR_MIN,
        FRINGE_FLOOR_MAX,
    )
}

/// Normalize raw inside shares against a fringe floor.
///
/// Negative and non-finite raw values count as zero. All-zero (or empty)
/// input splits the non-fringe capacity evenly. The result always satisfies
/// `|sum(inside) + fringe - 1| <= 1e-9` and `fringe >= floor - 1e-9`.
pub fn normalize_shares(raw_inside: &[f64], fringe_floor: Share) -> ShareStructure {
    let floor = clamp_range(fringe_floor, FRINGE_FLOOR_MIN, FRINGE_FLOOR_MAX);
    let capacity = 1.0 - floor;

    let mut sanitized: Vec<f64> = raw_inside.iter().map(|&x| sanitize(x)).collect();
    let mut raw_total: f64 = sanitized.iter().sum();
    if !raw_total.is_finite() {
        // Finite inputs whose sum overflows; proportions survive dividing by the max.
        let max = sanitized.iter().cloned().fold(0.0, f64::max);
        for x in sanitized.iter_mut() {
            *x /= max;
        }
        raw_total = sanitized.iter().sum();
    }

    let (mut inside, mut fringe) = if sanitized.is_empty() {
        (Vec::new(), 1.0)
    } else if raw_total <= ZERO_MASS {
        let even = capacity / sanitized.len() as f64;
        let inside = vec![even; sanitized.len()];
        let fringe = 1.0 - inside.iter().sum::<f64>();
        (inside, fringe)
    } else {
        let scale = capacity / raw_total;
        let inside: Vec<f64> = sanitized.iter().map(|x| x * scale).collect();
        let fringe = 1.0 - inside.iter().sum::<f64>();
        (inside, fringe)
    };

    // Floating error can leave the fringe a hair under the floor.
    if fringe < floor {
        let deficit = floor - fringe;
        let inside_total: f64 = inside.iter().sum();
        if inside_total > 0.0 {
            for s in inside.iter_mut() {
                *s = (*s - deficit * (*s / inside_total)).max(0.0);
            }
        }
        fringe = 1.0 - inside.iter().sum::<f64>();
    }

    let total = inside.iter().sum::<f64>() + fringe;
    if (total - 1.0).abs() > SIMPLEX_TOLERANCE {
        fringe += 1.0 - total;
    }

    debug!(
        fringe_floor = floor,
        fringe,
        total = inside.iter().sum::<f64>() + fringe,
        firms = inside.len(),
        "normalized share structure"
    );

    ShareStructure {
        inside,
        fringe,
        fringe_floor: floor,
    }
}

/// Number of raw shares that had to be sanitized (negative or non-finite).
pub fn count_sanitized(raw_inside: &[f64]) -> usize {
    raw_inside
        .iter()
        .filter(|&&x| !x.is_finite() || x < 0.0)
        .count()
}

fn sanitize(x: f64) -> f64 {
    if x.is_finite() {
        x.max(0.0)
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
