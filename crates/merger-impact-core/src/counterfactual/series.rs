//! Price series around a merger date.
//!
//! A series is an ordered run of dated points. Points dated strictly before
//! the merger date may carry an observed value; everything from the merger
//! date onward is treated as unobserved so the counterfactual has to be
//! predicted rather than read off the data.

use chrono::{Duration, Months, NaiveDate};
use rand::Rng;
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;

use crate::error::MergerImpactError;
use crate::random::Mulberry32;
use crate::MergerImpactResult;

/// Months either side of the merger in the monthly synthetic series.
pub const MONTHLY_WINDOW: u32 = 12;
/// Level around which the monthly synthetic spreads fluctuate (bps).
pub const MONTHLY_BASE_LEVEL: f64 = 150.0;
/// Peak-to-peak width of the monthly uniform noise (bps).
pub const MONTHLY_NOISE_WIDTH: f64 = 10.0;
/// Starting level of the daily synthetic CDS random walk (bps).
pub const DAILY_BASE_LEVEL: f64 = 130.0;
/// Scale of the daily random walk after normalizing by sqrt(n).
pub const DAILY_WALK_SCALE: f64 = 5.0;
/// Upper bound on `days_pre + days_post` for a daily synthetic series.
pub const MAX_SYNTHETIC_DAYS: usize = 10_000;

fn default_days() -> u32 {
    365
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One dated observation. `value` is `None` where nothing was observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    #[serde(default)]
    pub value: Option<f64>,
}

/// Layout of a synthetic series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type")]
pub enum SeriesShape {
    /// 25 month-spaced points, 12 observed months before the merger.
    #[default]
    Monthly,
    /// Daily CDS random walk.
    Daily {
        #[serde(default = "default_days")]
        days_pre: u32,
        #[serde(default = "default_days")]
        days_post: u32,
    },
}

/// Where the scenario's price series comes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum PriceData {
    Historical {
        merger_date: NaiveDate,
        points: Vec<PricePoint>,
    },
    Synthetic {
        merger_date: NaiveDate,
        #[serde(default)]
        shape: SeriesShape,
    },
}

impl PriceData {
    pub fn merger_date(&self) -> NaiveDate {
        match self {
            PriceData::Historical { merger_date, .. } => *merger_date,
            PriceData::Synthetic { merger_date, .. } => *merger_date,
        }
    }

    /// Materialize the series, synthesizing it from `seed` if requested.
    pub fn resolve(&self, seed: u32) -> MergerImpactResult<PriceSeries> {
        match self {
            PriceData::Historical {
                merger_date,
                points,
            } => PriceSeries::new(*merger_date, points.clone()),
            PriceData::Synthetic { merger_date, shape } => {
                let mut rng = Mulberry32::new(seed);
                match shape {
                    SeriesShape::Monthly => synthesize_monthly(*merger_date, &mut rng),
                    SeriesShape::Daily {
                        days_pre,
                        days_post,
                    } => synthesize_daily(*merger_date, *days_pre, *days_post, &mut rng),
                }
            }
        }
    }
}

/// The pre-merger observations a predictor may be fitted on.
#[derive(Debug, Clone, PartialEq)]
pub struct FitSegment {
    /// Every finite value dated before the merger, in date order.
    pub values: Vec<f64>,
    /// Series index of each entry in `values`.
    pub positions: Vec<usize>,
    /// First pre-merger date without a usable value.
    pub gap_at: Option<NaiveDate>,
    /// Pre-merger dates without a usable value.
    pub gaps: usize,
    /// Values present on or after the merger date (ignored).
    pub hidden_post: usize,
}

impl FitSegment {
    /// Lay a path computed over `values` followed by the post-merger points
    /// back onto the `len` series dates. Pre-merger gaps stay `None`.
    pub fn align(&self, path: &[Option<f64>], len: usize, merger_index: usize) -> Vec<Option<f64>> {
        let mut out = vec![None; len];
        for (k, &pos) in self.positions.iter().enumerate() {
            out[pos] = path.get(k).copied().flatten();
        }
        let offset = self.positions.len();
        for (j, slot) in out.iter_mut().enumerate().skip(merger_index) {
            *slot = path.get(offset + j - merger_index).copied().flatten();
        }
        out
    }
}

/// A validated, strictly increasing series split by a merger date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    pub merger_date: NaiveDate,
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(merger_date: NaiveDate, points: Vec<PricePoint>) -> MergerImpactResult<Self> {
        if points.is_empty() {
            return Err(MergerImpactError::InsufficientData(
                "Price series must contain at least one point".into(),
            ));
        }
        for pair in points.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(MergerImpactError::InvalidInput {
                    field: "points".into(),
                    reason: format!(
                        "Dates must be strictly increasing ({} follows {})",
                        pair[1].date, pair[0].date
                    ),
                });
            }
        }
        Ok(Self {
            merger_date,
            points,
        })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    /// Observed values, with everything from the merger date onward hidden.
    pub fn observed(&self) -> Vec<Option<f64>> {
        self.points
            .iter()
            .map(|p| if p.date < self.merger_date { p.value } else { None })
            .collect()
    }

    /// Index of the first point dated on or after the merger.
    pub fn merger_index(&self) -> usize {
        self.points
            .iter()
            .position(|p| p.date >= self.merger_date)
            .unwrap_or(self.points.len())
    }

    /// Period offsets relative to the merger index: "-2", "-1", "M", "+1".
    pub fn offset_labels(&self) -> Vec<String> {
        let m = self.merger_index() as i64;
        (0..self.points.len() as i64)
            .map(|i| match i - m {
                0 => "M".to_string(),
                d if d > 0 => format!("+{d}"),
                d => d.to_string(),
            })
            .collect()
    }

    pub fn fit_segment(&self) -> FitSegment {
        let mut values = Vec::new();
        let mut positions = Vec::new();
        let mut gap_at = None;
        let mut gaps = 0;
        for (i, p) in self.points.iter().enumerate() {
            if p.date >= self.merger_date {
                break;
            }
            match p.value {
                Some(v) if v.is_finite() => {
                    values.push(v);
                    positions.push(i);
                }
                _ => {
                    gaps += 1;
                    gap_at.get_or_insert(p.date);
                }
            }
        }
        let hidden_post = self
            .points
            .iter()
            .filter(|p| p.date >= self.merger_date && p.value.is_some())
            .count();
        FitSegment {
            values,
            positions,
            gap_at,
            gaps,
            hidden_post,
        }
    }
}

// ---------------------------------------------------------------------------
// Synthesis
// ---------------------------------------------------------------------------

/// 25 monthly points at offsets -12..=+12 around the merger date. The twelve
/// pre-merger months carry `150 + (u - 0.5) * 10`.
pub fn synthesize_monthly(
    merger_date: NaiveDate,
    rng: &mut Mulberry32,
) -> MergerImpactResult<PriceSeries> {
    let window = i64::from(MONTHLY_WINDOW);
    let mut points = Vec::with_capacity(2 * MONTHLY_WINDOW as usize + 1);
    for offset in -window..=window {
        let date = shift_months(merger_date, offset)?;
        let value = if offset < 0 {
            Some(MONTHLY_BASE_LEVEL + (rng.next_unit() - 0.5) * MONTHLY_NOISE_WIDTH)
        } else {
            None
        };
        points.push(PricePoint { date, value });
    }
    PriceSeries::new(merger_date, points)
}

/// Daily CDS level `130 + 5 * cumsum(z) / sqrt(n)` with standard-normal
/// innovations; `days_pre` observed days before the merger and `days_post`
/// unobserved days from the merger date onward.
pub fn synthesize_daily(
    merger_date: NaiveDate,
    days_pre: u32,
    days_post: u32,
    rng: &mut Mulberry32,
) -> MergerImpactResult<PriceSeries> {
    let n = days_pre as usize + days_post as usize;
    if n == 0 {
        return Err(MergerImpactError::InvalidInput {
            field: "shape".into(),
            reason: "Daily series needs days_pre + days_post > 0".into(),
        });
    }
    if n > MAX_SYNTHETIC_DAYS {
        return Err(MergerImpactError::InvalidInput {
            field: "shape".into(),
            reason: format!("Daily series is limited to {MAX_SYNTHETIC_DAYS} days, got {n}"),
        });
    }
    let normal = Normal::new(0.0, 1.0).map_err(|e| MergerImpactError::InvalidInput {
        field: "distribution".into(),
        reason: format!("Invalid Normal parameters: {e}"),
    })?;
    let start = merger_date
        .checked_sub_signed(Duration::days(i64::from(days_pre)))
        .ok_or_else(|| MergerImpactError::DateError(format!("{merger_date} minus {days_pre} days")))?;

    let norm = (n as f64).sqrt();
    let mut walk = 0.0;
    let mut points = Vec::with_capacity(n);
    for i in 0..n {
        let date = start
            .checked_add_signed(Duration::days(i as i64))
            .ok_or_else(|| MergerImpactError::DateError(format!("{start} plus {i} days")))?;
        let value = if i < days_pre as usize {
            walk += rng.sample(normal);
            Some(DAILY_BASE_LEVEL + DAILY_WALK_SCALE * walk / norm)
        } else {
            None
        };
        points.push(PricePoint { date, value });
    }
    PriceSeries::new(merger_date, points)
}

fn shift_months(date: NaiveDate, offset: i64) -> MergerImpactResult<NaiveDate> {
    let months = Months::new(offset.unsigned_abs() as u32);
    let shifted = if offset < 0 {
        date.checked_sub_months(months)
    } else {
        date.checked_add_months(months)
    };
    shifted.ok_or_else(|| MergerImpactError::DateError(format!("{date} shifted by {offset} months")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn point(date: NaiveDate, value: Option<f64>) -> PricePoint {
        PricePoint { date, value }
    }

    #[test]
    fn test_monthly_layout() {
        let mut rng = Mulberry32::new(123_456);
        let s = synthesize_monthly(d(2024, 7, 1), &mut rng).unwrap();
        assert_eq!(s.len(), 25);
        assert_eq!(s.points[0].date, d(2023, 7, 1));
        assert_eq!(s.points[12].date, d(2024, 7, 1));
        assert_eq!(s.points[24].date, d(2025, 7, 1));
        assert_eq!(s.merger_index(), 12);
        let observed = s.observed();
        assert!(observed[..12].iter().all(|v| v.is_some()));
        assert!(observed[12..].iter().all(|v| v.is_none()));
        for v in observed[..12].iter().flatten() {
            assert!((145.0..155.0).contains(v));
        }
    }

    #[test]
    fn test_monthly_golden_first_value() {
        let mut rng = Mulberry32::new(123_456);
        let s = synthesize_monthly(d(2024, 7, 1), &mut rng).unwrap();
        let u = 1_642_107_918.0 / 4_294_967_296.0;
        assert_eq!(s.points[0].value, Some(150.0 + (u - 0.5) * 10.0));
    }

    #[test]
    fn test_monthly_labels() {
        let mut rng = Mulberry32::new(1);
        let s = synthesize_monthly(d(2024, 7, 1), &mut rng).unwrap();
        let labels = s.offset_labels();
        assert_eq!(labels[0], "-12");
        assert_eq!(labels[11], "-1");
        assert_eq!(labels[12], "M");
        assert_eq!(labels[13], "+1");
        assert_eq!(labels[24], "+12");
    }

    #[test]
    fn test_month_end_clamps() {
        let mut rng = Mulberry32::new(1);
        let s = synthesize_monthly(d(2024, 3, 31), &mut rng).unwrap();
        assert_eq!(s.points[11].date, d(2024, 2, 29));
    }

    #[test]
    fn test_daily_layout() {
        let mut rng = Mulberry32::new(7);
        let s = synthesize_daily(d(2024, 7, 1), 30, 10, &mut rng).unwrap();
        assert_eq!(s.len(), 40);
        assert_eq!(s.merger_index(), 30);
        assert_eq!(s.points[30].date, d(2024, 7, 1));
        assert_eq!(s.fit_segment().values.len(), 30);
        assert!(s.observed()[30..].iter().all(|v| v.is_none()));
    }

    #[test]
    fn test_daily_deterministic() {
        let a = synthesize_daily(d(2024, 7, 1), 50, 5, &mut Mulberry32::new(9)).unwrap();
        let b = synthesize_daily(d(2024, 7, 1), 50, 5, &mut Mulberry32::new(9)).unwrap();
        assert_eq!(a, b);
        let c = synthesize_daily(d(2024, 7, 1), 50, 5, &mut Mulberry32::new(10)).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_daily_rejects_empty() {
        let err = synthesize_daily(d(2024, 7, 1), 0, 0, &mut Mulberry32::new(1));
        assert!(err.is_err());
    }

    #[test]
    fn test_rejects_unordered() {
        let pts = vec![point(d(2024, 2, 1), Some(1.0)), point(d(2024, 1, 1), Some(2.0))];
        assert!(PriceSeries::new(d(2024, 3, 1), pts).is_err());
    }

    #[test]
    fn test_rejects_empty() {
        assert!(PriceSeries::new(d(2024, 3, 1), vec![]).is_err());
    }

    #[test]
    fn test_fit_segment_hides_post() {
        let pts = vec![
            point(d(2024, 1, 1), Some(100.0)),
            point(d(2024, 2, 1), Some(101.0)),
            point(d(2024, 3, 1), Some(150.0)),
            point(d(2024, 4, 1), Some(160.0)),
        ];
        let s = PriceSeries::new(d(2024, 3, 1), pts).unwrap();
        let seg = s.fit_segment();
        assert_eq!(seg.values, vec![100.0, 101.0]);
        assert_eq!(seg.hidden_post, 2);
        assert_eq!(seg.gap_at, None);
        assert_eq!(s.observed(), vec![Some(100.0), Some(101.0), None, None]);
    }

    #[test]
    fn test_fit_segment_skips_gaps() {
        let pts = vec![
            point(d(2024, 1, 1), Some(100.0)),
            point(d(2024, 2, 1), None),
            point(d(2024, 3, 1), Some(102.0)),
            point(d(2024, 4, 1), Some(f64::NAN)),
            point(d(2024, 5, 1), None),
        ];
        let s = PriceSeries::new(d(2024, 5, 1), pts).unwrap();
        let seg = s.fit_segment();
        assert_eq!(seg.values, vec![100.0, 102.0]);
        assert_eq!(seg.positions, vec![0, 2]);
        assert_eq!(seg.gap_at, Some(d(2024, 2, 1)));
        assert_eq!(seg.gaps, 2);
    }

    #[test]
    fn test_fit_segment_leading_gap_keeps_history() {
        let mut pts = vec![point(d(2023, 1, 1), None)];
        pts.extend((2..=12).map(|m| point(d(2023, m, 1), Some(140.0 + m as f64))));
        pts.extend((1..=6).map(|m| point(d(2024, m, 1), None)));
        let s = PriceSeries::new(d(2024, 1, 1), pts).unwrap();
        let seg = s.fit_segment();
        assert_eq!(seg.values.len(), 11);
        assert_eq!(seg.positions, (1..=11).collect::<Vec<_>>());
        assert_eq!(seg.gap_at, Some(d(2023, 1, 1)));
    }

    #[test]
    fn test_align_spreads_path() {
        let pts = vec![
            point(d(2024, 1, 1), None),
            point(d(2024, 2, 1), Some(10.0)),
            point(d(2024, 3, 1), Some(11.0)),
            point(d(2024, 4, 1), None),
            point(d(2024, 5, 1), None),
        ];
        let s = PriceSeries::new(d(2024, 4, 1), pts).unwrap();
        let seg = s.fit_segment();
        let path = vec![Some(1.0), Some(2.0), Some(3.0), Some(4.0)];
        assert_eq!(
            seg.align(&path, s.len(), s.merger_index()),
            vec![None, Some(1.0), Some(2.0), Some(3.0), Some(4.0)]
        );
    }

    #[test]
    fn test_daily_rejects_oversized() {
        let err = synthesize_daily(
            d(2024, 7, 1),
            4_000_000_000,
            1,
            &mut Mulberry32::new(1),
        )
        .unwrap_err();
        assert!(matches!(err, MergerImpactError::InvalidInput { .. }));
        let at_limit = MAX_SYNTHETIC_DAYS as u32;
        assert!(synthesize_daily(d(2024, 7, 1), at_limit - 1, 1, &mut Mulberry32::new(1)).is_ok());
        assert!(synthesize_daily(d(2024, 7, 1), at_limit, 1, &mut Mulberry32::new(1)).is_err());
    }

    #[test]
    fn test_price_data_serde() {
        let json = r#"{"source":"synthetic","merger_date":"2024-07-01","shape":{"type":"Daily","days_pre":20}}"#;
        let data: PriceData = serde_json::from_str(json).unwrap();
        assert_eq!(
            data,
            PriceData::Synthetic {
                merger_date: d(2024, 7, 1),
                shape: SeriesShape::Daily {
                    days_pre: 20,
                    days_post: 365
                },
            }
        );
        let series = data.resolve(3).unwrap();
        assert_eq!(series.len(), 385);
    }

    #[test]
    fn test_historical_resolve_validates() {
        let data = PriceData::Historical {
            merger_date: d(2024, 7, 1),
            points: vec![],
        };
        assert!(data.resolve(1).is_err());
    }
}
