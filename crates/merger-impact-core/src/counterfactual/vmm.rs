//! Counterfactual ("no-merger") predictor.
//!
//! Fit phase: exponential smoothing over the pre-merger observations.
//! Extrapolation: the smoothed path continues as a walk with fixed drift
//! equal to the mean step of the fitted path. Uncertainty: residual bootstrap
//! around the extrapolated path, percentiles taken pointwise.
//!
//! This is deliberately a simple deterministic smoother, not a moment-matching
//! estimator. Given the same inputs and seed it reproduces bit for bit.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::MergerImpactError;
use crate::random::Mulberry32;
use crate::MergerImpactResult;

pub const DEFAULT_SMOOTHING_ALPHA: f64 = 0.2;
pub const DEFAULT_BOOTSTRAP_RESAMPLES: u32 = 400;
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;
/// The band buffer holds `horizon * resamples` values.
pub const MAX_BOOTSTRAP_RESAMPLES: u32 = 10_000;

/// Floor on the denominator of percentage errors.
pub const MAPE_EPSILON: f64 = 1e-6;
/// Observed variance at or below this is treated as zero.
pub const ZERO_VARIANCE: f64 = 1e-12;
/// Xor-ed into the scenario seed so bootstrap draws never replay the
/// stream that synthesized the series.
pub const BOOTSTRAP_STREAM_SALT: u32 = 0x9E37_79B9;

fn default_alpha() -> f64 {
    DEFAULT_SMOOTHING_ALPHA
}

fn default_resamples() -> u32 {
    DEFAULT_BOOTSTRAP_RESAMPLES
}

fn default_confidence() -> f64 {
    DEFAULT_CONFIDENCE_LEVEL
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Tunables of the predictor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastSettings {
    /// Exponential smoothing constant in `(0, 1]`.
    #[serde(default = "default_alpha")]
    pub smoothing_alpha: f64,
    /// Number of bootstrap resamples, `1..=MAX_BOOTSTRAP_RESAMPLES`.
    #[serde(default = "default_resamples")]
    pub bootstrap_resamples: u32,
    /// Two-sided interval coverage in `(0, 1)`.
    #[serde(default = "default_confidence")]
    pub confidence_level: f64,
}

impl Default for ForecastSettings {
    fn default() -> Self {
        Self {
            smoothing_alpha: DEFAULT_SMOOTHING_ALPHA,
            bootstrap_resamples: DEFAULT_BOOTSTRAP_RESAMPLES,
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
        }
    }
}

impl ForecastSettings {
    pub fn validate(&self) -> MergerImpactResult<()> {
        if !(self.smoothing_alpha > 0.0 && self.smoothing_alpha <= 1.0) {
            return Err(MergerImpactError::InvalidInput {
                field: "smoothing_alpha".into(),
                reason: "Must be in (0, 1]".into(),
            });
        }
        if self.bootstrap_resamples == 0 {
            return Err(MergerImpactError::InvalidInput {
                field: "bootstrap_resamples".into(),
                reason: "Must be at least 1".into(),
            });
        }
        if self.bootstrap_resamples > MAX_BOOTSTRAP_RESAMPLES {
            return Err(MergerImpactError::InvalidInput {
                field: "bootstrap_resamples".into(),
                reason: format!("Must be at most {MAX_BOOTSTRAP_RESAMPLES}"),
            });
        }
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(MergerImpactError::InvalidInput {
                field: "confidence_level".into(),
                reason: "Must be in (0, 1)".into(),
            });
        }
        Ok(())
    }
}

/// Smoothed pre-merger path and its residuals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreMergerFit {
    pub observed: Vec<f64>,
    pub smoothed: Vec<f64>,
    pub residuals: Vec<f64>,
}

/// How far the fit diagnostics can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FitStatus {
    Reliable,
    /// Observed series is flat, so R² is undefined.
    ZeroVariance,
    /// Fewer than two pre-merger observations.
    InsufficientData,
}

/// Goodness of fit over the pre-merger segment. `None` where undefined.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitDiagnostics {
    pub status: FitStatus,
    pub observations: usize,
    pub r2: Option<f64>,
    /// Mean absolute percentage error, in percent.
    pub mape: Option<f64>,
    pub mean_residual: Option<f64>,
}

/// Pointwise bootstrap percentiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBand {
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

/// Counterfactual path over the whole horizon with its interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterfactualPrediction {
    pub predicted: Vec<Option<f64>>,
    pub ci_low: Vec<Option<f64>>,
    pub ci_high: Vec<Option<f64>>,
    /// Fixed per-period drift used after the fit segment.
    pub drift: Option<f64>,
    pub diagnostics: FitDiagnostics,
}

impl CounterfactualPrediction {
    pub fn is_reliable(&self) -> bool {
        self.diagnostics.status == FitStatus::Reliable
    }
}

// ---------------------------------------------------------------------------
// Fit / extrapolate
// ---------------------------------------------------------------------------

/// Exponential smoothing: `yhat[0] = y[0]`,
/// `yhat[i] = alpha * y[i] + (1 - alpha) * yhat[i - 1]`.
pub fn fit_pre_merger(observed: &[f64], alpha: f64) -> PreMergerFit {
    let mut smoothed = Vec::with_capacity(observed.len());
    for (i, &y) in observed.iter().enumerate() {
        let yhat = if i == 0 {
            y
        } else {
            alpha * y + (1.0 - alpha) * smoothed[i - 1]
        };
        smoothed.push(yhat);
    }
    let residuals = observed
        .iter()
        .zip(&smoothed)
        .map(|(y, yhat)| y - yhat)
        .collect();
    PreMergerFit {
        observed: observed.to_vec(),
        smoothed,
        residuals,
    }
}

/// Mean first difference of the smoothed path; zero with fewer than two points.
pub fn mean_step(smoothed: &[f64]) -> f64 {
    if smoothed.len() < 2 {
        return 0.0;
    }
    let steps = smoothed.len() - 1;
    smoothed.windows(2).map(|w| w[1] - w[0]).sum::<f64>() / steps as f64
}

/// Smoothed path followed by `prev + drift` until `horizon` points.
pub fn extrapolate(smoothed: &[f64], drift: f64, horizon: usize) -> Vec<f64> {
    let mut path = Vec::with_capacity(horizon.max(smoothed.len()));
    path.extend_from_slice(&smoothed[..smoothed.len().min(horizon)]);
    while path.len() < horizon {
        let prev = path.last().copied().unwrap_or(0.0);
        path.push(prev + drift);
    }
    path
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

/// Residual bootstrap band around `trajectory`.
///
/// Each resample draws `trajectory.len()` residuals with replacement and adds
/// them to the trajectory. The band is the `(1-c)/2` and `1-(1-c)/2`
/// percentiles across resamples at every point.
pub fn bootstrap_band(
    trajectory: &[f64],
    residuals: &[f64],
    resamples: u32,
    confidence: f64,
    rng: &mut Mulberry32,
) -> ConfidenceBand {
    if residuals.is_empty() || resamples == 0 {
        return ConfidenceBand {
            lower: trajectory.to_vec(),
            upper: trajectory.to_vec(),
        };
    }

    let n = trajectory.len();
    let mut columns: Vec<Vec<f64>> = vec![Vec::with_capacity(resamples as usize); n];
    for _ in 0..resamples {
        for (i, column) in columns.iter_mut().enumerate() {
            let r = residuals[rng.next_index(residuals.len())];
            column.push(trajectory[i] + r);
        }
    }

    let tail = (1.0 - confidence) / 2.0 * 100.0;
    let mut lower = Vec::with_capacity(n);
    let mut upper = Vec::with_capacity(n);
    for column in columns.iter_mut() {
        column.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        lower.push(percentile_sorted(column, tail));
        upper.push(percentile_sorted(column, 100.0 - tail));
    }
    ConfidenceBand { lower, upper }
}

/// Percentile of a **sorted**, non-empty slice using linear interpolation.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = rank - lower as f64;
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance.
fn variance(values: &[f64]) -> f64 {
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// R², MAPE and mean residual over the fitted segment.
pub fn fit_diagnostics(fit: &PreMergerFit) -> FitDiagnostics {
    let n = fit.observed.len();
    if n == 0 {
        return FitDiagnostics {
            status: FitStatus::InsufficientData,
            observations: 0,
            r2: None,
            mape: None,
            mean_residual: None,
        };
    }

    let mape = fit
        .residuals
        .iter()
        .zip(&fit.observed)
        .map(|(r, y)| r.abs() / y.max(MAPE_EPSILON))
        .sum::<f64>()
        / n as f64
        * 100.0;
    let mean_residual = mean(&fit.residuals);

    let observed_var = variance(&fit.observed);
    let (status, r2) = if n < 2 {
        (FitStatus::InsufficientData, None)
    } else if observed_var <= ZERO_VARIANCE {
        (FitStatus::ZeroVariance, None)
    } else {
        (
            FitStatus::Reliable,
            Some(1.0 - variance(&fit.residuals) / observed_var),
        )
    };

    FitDiagnostics {
        status,
        observations: n,
        r2,
        mape: Some(mape),
        mean_residual: Some(mean_residual),
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Fit on `pre_merger`, extrapolate to `horizon` points and bootstrap a band.
///
/// With no pre-merger observations every output point is `None`. With one
/// observation the path is flat and flagged `InsufficientData`.
pub fn predict_counterfactual(
    pre_merger: &[f64],
    horizon: usize,
    settings: &ForecastSettings,
    seed: u32,
) -> MergerImpactResult<CounterfactualPrediction> {
    settings.validate()?;

    let fit = fit_pre_merger(pre_merger, settings.smoothing_alpha);
    let diagnostics = fit_diagnostics(&fit);

    if fit.smoothed.is_empty() {
        warn!(horizon, "no pre-merger observations; counterfactual undefined");
        return Ok(CounterfactualPrediction {
            predicted: vec![None; horizon],
            ci_low: vec![None; horizon],
            ci_high: vec![None; horizon],
            drift: None,
            diagnostics,
        });
    }
    if diagnostics.status == FitStatus::InsufficientData {
        warn!(
            observations = diagnostics.observations,
            "fewer than two pre-merger observations; counterfactual unreliable"
        );
    }

    let drift = mean_step(&fit.smoothed);
    let path = extrapolate(&fit.smoothed, drift, horizon);

    let mut rng = Mulberry32::new(seed ^ BOOTSTRAP_STREAM_SALT);
    let band = bootstrap_band(
        &path,
        &fit.residuals,
        settings.bootstrap_resamples,
        settings.confidence_level,
        &mut rng,
    );

    debug!(
        observations = diagnostics.observations,
        horizon,
        drift,
        status = ?diagnostics.status,
        "counterfactual fitted"
    );

    Ok(CounterfactualPrediction {
        predicted: path.into_iter().map(Some).collect(),
        ci_low: band.lower.into_iter().map(Some).collect(),
        ci_high: band.upper.into_iter().map(Some).collect(),
        drift: Some(drift),
        diagnostics,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn trending() -> Vec<f64> {
        (0..12).map(|i| 140.0 + i as f64 + if i % 2 == 0 { 0.8 } else { -0.8 }).collect()
    }

    #[test]
    fn test_smoothing_recursion() {
        let fit = fit_pre_merger(&[100.0, 110.0, 90.0], 0.2);
        assert_eq!(fit.smoothed[0], 100.0);
        assert!((fit.smoothed[1] - 102.0).abs() < 1e-12);
        assert!((fit.smoothed[2] - 99.6).abs() < 1e-12);
        assert_eq!(fit.residuals[0], 0.0);
        assert!((fit.residuals[1] - 8.0).abs() < 1e-12);
    }

    #[test]
    fn test_alpha_one_tracks_observed() {
        let y = trending();
        let fit = fit_pre_merger(&y, 1.0);
        assert_eq!(fit.smoothed, y);
        assert!(fit.residuals.iter().all(|r| *r == 0.0));
    }

    #[test]
    fn test_mean_step() {
        assert!((mean_step(&[100.0, 102.0, 99.6]) - (-0.2)).abs() < 1e-12);
        assert_eq!(mean_step(&[5.0]), 0.0);
        assert_eq!(mean_step(&[]), 0.0);
    }

    #[test]
    fn test_extrapolate_fixed_drift() {
        let path = extrapolate(&[1.0, 2.0], 0.5, 5);
        assert_eq!(path, vec![1.0, 2.0, 2.5, 3.0, 3.5]);
    }

    #[test]
    fn test_extrapolate_truncates() {
        assert_eq!(extrapolate(&[1.0, 2.0, 3.0], 1.0, 2), vec![1.0, 2.0]);
    }

    #[test]
    fn test_percentile_interpolates() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile_sorted(&v, 50.0), 3.0);
        assert!((percentile_sorted(&v, 2.5) - 1.1).abs() < 1e-12);
        assert!((percentile_sorted(&v, 97.5) - 4.9).abs() < 1e-12);
        assert_eq!(percentile_sorted(&[7.0], 10.0), 7.0);
    }

    #[test]
    fn test_band_brackets_trajectory() {
        let y = trending();
        let fit = fit_pre_merger(&y, 0.2);
        let path = extrapolate(&fit.smoothed, mean_step(&fit.smoothed), 25);
        let band = bootstrap_band(&path, &fit.residuals, 400, 0.95, &mut Mulberry32::new(3));
        assert_eq!(band.lower.len(), 25);
        for i in 0..25 {
            assert!(band.lower[i] <= band.upper[i]);
            let min_r = fit.residuals.iter().cloned().fold(f64::INFINITY, f64::min);
            let max_r = fit.residuals.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            assert!(band.lower[i] >= path[i] + min_r - 1e-9);
            assert!(band.upper[i] <= path[i] + max_r + 1e-9);
        }
    }

    #[test]
    fn test_band_deterministic() {
        let y = trending();
        let fit = fit_pre_merger(&y, 0.2);
        let path = extrapolate(&fit.smoothed, 0.1, 25);
        let a = bootstrap_band(&path, &fit.residuals, 200, 0.9, &mut Mulberry32::new(17));
        let b = bootstrap_band(&path, &fit.residuals, 200, 0.9, &mut Mulberry32::new(17));
        assert_eq!(a, b);
    }

    #[test]
    fn test_wider_confidence_wider_band() {
        let y = trending();
        let fit = fit_pre_merger(&y, 0.2);
        let path = extrapolate(&fit.smoothed, 0.0, 25);
        let narrow = bootstrap_band(&path, &fit.residuals, 400, 0.5, &mut Mulberry32::new(1));
        let wide = bootstrap_band(&path, &fit.residuals, 400, 0.95, &mut Mulberry32::new(1));
        for i in 0..25 {
            assert!(wide.upper[i] - wide.lower[i] >= narrow.upper[i] - narrow.lower[i] - 1e-12);
        }
    }

    #[test]
    fn test_constant_series_zero_variance() {
        let y = vec![150.0; 12];
        let pred = predict_counterfactual(&y, 25, &ForecastSettings::default(), 42).unwrap();
        assert_eq!(pred.diagnostics.status, FitStatus::ZeroVariance);
        assert_eq!(pred.diagnostics.r2, None);
        assert!(pred.diagnostics.mape.unwrap().abs() < 1e-9);
        assert!(pred.diagnostics.mean_residual.unwrap().abs() < 1e-9);
        for i in 0..25 {
            assert!((pred.predicted[i].unwrap() - 150.0).abs() < 1e-9);
            assert!((pred.ci_low[i].unwrap() - 150.0).abs() < 1e-9);
            assert!((pred.ci_high[i].unwrap() - 150.0).abs() < 1e-9);
        }
        assert!(!pred.is_reliable());
    }

    #[test]
    fn test_single_observation_flat() {
        let pred = predict_counterfactual(&[120.0], 5, &ForecastSettings::default(), 1).unwrap();
        assert_eq!(pred.diagnostics.status, FitStatus::InsufficientData);
        assert_eq!(pred.drift, Some(0.0));
        assert!(pred.predicted.iter().all(|p| *p == Some(120.0)));
        for (lo, hi) in pred.ci_low.iter().zip(&pred.ci_high) {
            assert!((lo.unwrap() - 120.0).abs() < 1e-9);
            assert!((hi.unwrap() - 120.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_no_observations() {
        let pred = predict_counterfactual(&[], 4, &ForecastSettings::default(), 1).unwrap();
        assert_eq!(pred.diagnostics.status, FitStatus::InsufficientData);
        assert_eq!(pred.diagnostics.observations, 0);
        assert_eq!(pred.predicted, vec![None; 4]);
        assert_eq!(pred.drift, None);
    }

    #[test]
    fn test_reliable_fit_diagnostics() {
        let y = trending();
        let pred = predict_counterfactual(&y, 25, &ForecastSettings::default(), 5).unwrap();
        assert_eq!(pred.diagnostics.status, FitStatus::Reliable);
        let r2 = pred.diagnostics.r2.unwrap();
        assert!(r2 < 1.0);
        assert!(pred.diagnostics.mape.unwrap() > 0.0);
        // Smoother lags an upward trend, so residuals are positive on average.
        assert!(pred.diagnostics.mean_residual.unwrap() > 0.0);
        assert!(pred.drift.unwrap() > 0.0);
        assert!(pred.is_reliable());
    }

    #[test]
    fn test_post_merger_points_follow_drift() {
        let y = trending();
        let pred = predict_counterfactual(&y, 25, &ForecastSettings::default(), 5).unwrap();
        let drift = pred.drift.unwrap();
        for i in 12..25 {
            let step = pred.predicted[i].unwrap() - pred.predicted[i - 1].unwrap();
            assert!((step - drift).abs() < 1e-9);
        }
    }

    #[test]
    fn test_seed_changes_band_not_path() {
        // Interquartile band: the 95% tails saturate at the extreme residuals
        // for any seed once each residual is drawn dozens of times.
        let y = trending();
        let s = ForecastSettings {
            confidence_level: 0.5,
            bootstrap_resamples: 7,
            ..Default::default()
        };
        let a = predict_counterfactual(&y, 25, &s, 1).unwrap();
        let b = predict_counterfactual(&y, 25, &s, 2).unwrap();
        assert_eq!(a.predicted, b.predicted);
        assert_eq!(a.diagnostics, b.diagnostics);
        assert!(a.ci_low != b.ci_low || a.ci_high != b.ci_high);
    }

    #[test]
    fn test_settings_validation() {
        let mut s = ForecastSettings::default();
        assert!(s.validate().is_ok());
        s.smoothing_alpha = 0.0;
        assert!(s.validate().is_err());
        s = ForecastSettings {
            bootstrap_resamples: 0,
            ..Default::default()
        };
        assert!(s.validate().is_err());
        s = ForecastSettings {
            bootstrap_resamples: MAX_BOOTSTRAP_RESAMPLES + 1,
            ..Default::default()
        };
        assert!(s.validate().is_err());
        s.bootstrap_resamples = MAX_BOOTSTRAP_RESAMPLES;
        assert!(s.validate().is_ok());
        s = ForecastSettings {
            confidence_level: 1.0,
            ..Default::default()
        };
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_settings_serde_defaults() {
        let s: ForecastSettings = serde_json::from_str(r#"{"bootstrap_resamples":500}"#).unwrap();
        assert_eq!(s.bootstrap_resamples, 500);
        assert_eq!(s.smoothing_alpha, DEFAULT_SMOOTHING_ALPHA);
        assert_eq!(s.confidence_level, DEFAULT_CONFIDENCE_LEVEL);
    }
}
