//! Herfindahl-Hirschman concentration indices.
//!
//! `HHI = round(sum((share * 100)^2))` on the 0..=10000 scale. Pre-merger
//! every named firm and the fringe count separately; post-merger the merging
//! firms count as one entity holding the sum of their shares.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{Hhi, Share};

pub const HHI_MAX: Hhi = 10_000;

/// Pre/post concentration with the change used for scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcentrationIndices {
    pub pre: Hhi,
    pub post: Hhi,
    /// `post - pre`, floored at zero.
    pub delta: Hhi,
    /// Signed `post - pre` before flooring.
    pub delta_raw: i64,
}

/// HHI of a set of separate entities. Negative or NaN shares count as zero.
pub fn hhi(shares: &[Share]) -> Hhi {
    let total: f64 = shares
        .iter()
        .map(|&s| {
            let pct = s.max(0.0) * 100.0;
            pct * pct
        })
        .sum();
    total.round().clamp(0.0, f64::from(u32::MAX)) as Hhi
}

/// Post-merger entity list: the merged firm first, then rivals, then the fringe.
///
/// Firms beyond the end of `merging` count as non-merging.
pub fn post_merger_components(inside: &[Share], fringe: Share, merging: &[bool]) -> Vec<Share> {
    let mut merged = 0.0;
    let mut rivals = Vec::with_capacity(inside.len());
    for (i, &share) in inside.iter().enumerate() {
        if merging.get(i).copied().unwrap_or(false) {
            merged += share;
        } else {
            rivals.push(share);
        }
    }
    let mut components = Vec::with_capacity(rivals.len() + 2);
    components.push(merged);
    components.extend(rivals);
    components.push(fringe);
    components
}

pub fn hhi_pre_merger(inside: &[Share], fringe: Share) -> Hhi {
    let mut components = inside.to_vec();
    components.push(fringe);
    hhi(&components)
}

pub fn hhi_post_merger(inside: &[Share], fringe: Share, merging: &[bool]) -> Hhi {
    hhi(&post_merger_components(inside, fringe, merging))
}

/// Pre, post and change in HHI for a merger among the flagged firms.
pub fn concentration_indices(
    inside: &[Share],
    fringe: Share,
    merging: &[bool],
) -> ConcentrationIndices {
    let pre = hhi_pre_merger(inside, fringe);
    let post = hhi_post_merger(inside, fringe, merging);
    let delta_raw = i64::from(post) - i64::from(pre);
    debug!(pre, post, delta_raw, "concentration indices");
    ConcentrationIndices {
        pre,
        post,
        delta: post.saturating_sub(pre),
        delta_raw,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
