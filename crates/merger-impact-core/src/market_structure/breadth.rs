//! Market-breadth adjustment.
//!
//! A broader, more substitutable market erodes measured concentration among
//! the named firms: a fraction `BREADTH_ALPHA * demand_flex` of the inside
//! mass moves to the fringe.

use serde::{Deserialize, Serialize};

use crate::market_structure::fringe::ShareStructure;
use crate::types::{clamp_range, Share};

/// Share of inside mass reassigned at full demand flexibility.
pub const BREADTH_ALPHA: f64 = 0.30;

/// Share structure after the breadth adjustment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreadthAdjusted {
    pub inside: Vec<Share>,
    pub fringe: Share,
    /// Multiplier applied to every inside share before renormalizing.
    pub scale: f64,
}

impl BreadthAdjusted {
    pub fn total(&self) -> f64 {
        self.inside.iter().sum::<f64>() + self.fringe
    }
}

/// Move mass from the inside firms to the fringe in proportion to
/// `demand_flex`, then renormalize to a total of exactly 1.
///
/// With no inside mass the shares are returned unchanged and `scale` is 1.
pub fn apply_market_breadth(structure: &ShareStructure, demand_flex: f64) -> BreadthAdjusted {
    let flex = clamp_range(demand_flex, 0.0, 1.0);
    let inside_sum: f64 = structure.inside.iter().sum();

    if inside_sum <= 0.0 {
        return BreadthAdjusted {
            inside: structure.inside.clone(),
            fringe: structure.fringe,
            scale: 1.0,
        };
    }

    let reassign = BREADTH_ALPHA * flex * inside_sum;
    let scale = (inside_sum - reassign) / inside_sum;
    let inside_adj: Vec<f64> = structure.inside.iter().map(|s| s * scale).collect();
    let fringe_adj = clamp_range(structure.fringe + reassign, 0.0, 1.0);

    let total = inside_adj.iter().sum::<f64>() + fringe_adj;
    let norm = if total > 0.0 { 1.0 / total } else { 1.0 };

    BreadthAdjusted {
        inside: inside_adj.iter().map(|s| s * norm).collect(),
        fringe: fringe_adj * norm,
        scale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn structure() -> ShareStructure {
        ShareStructure {
            inside: vec![0.256, 0.184, 0.2, 0.16],
            fringe: 0.2,
            fringe_floor: 0.2,
        }
    }

    #[test]
    fn test_zero_flex_is_identity() {
        let s = structure();
        let adj = apply_market_breadth(&s, 0.0);
        assert_eq!(adj.scale, 1.0);
        for (a, b) in adj.inside.iter().zip(&s.inside) {
            assert!((a - b).abs() < 1e-12);
        }
        assert!((adj.fringe - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_flex_moves_mass_to_fringe() {
        let adj = apply_market_breadth(&structure(), 0.4);
        assert!((adj.scale - 0.88).abs() < 1e-12);
        assert!((adj.fringe - 0.296).abs() < 1e-12);
        assert!((adj.inside[0] - 0.22528).abs() < 1e-12);
        assert!((adj.total() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_flex_is_clamped() {
        let a = apply_market_breadth(&structure(), 1.0);
        let b = apply_market_breadth(&structure(), 7.0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_inside_unchanged() {
        let s = ShareStructure {
            inside: vec![0.0, 0.0],
            fringe: 1.0,
            fringe_floor: 0.1,
        };
        let adj = apply_market_breadth(&s, 0.8);
        assert_eq!(adj.scale, 1.0);
        assert_eq!(adj.inside, vec![0.0, 0.0]);
        assert_eq!(adj.fringe, 1.0);
    }

    #[test]
    fn test_order_preserved() {
        let adj = apply_market_breadth(&structure(), 0.9);
        assert!(adj.inside[0] > adj.inside[2]);
        assert!(adj.inside[2] > adj.inside[1]);
    }
}
