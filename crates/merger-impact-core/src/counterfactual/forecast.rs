use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::warn;

use crate::counterfactual::series::PriceData;
use crate::counterfactual::vmm::{
    predict_counterfactual, CounterfactualPrediction, FitDiagnostics, FitStatus, ForecastSettings,
};
use crate::types::*;
use crate::MergerImpactResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastInput {
    pub price_data: PriceData,
    #[serde(default)]
    pub seed: u32,
    #[serde(default)]
    pub settings: ForecastSettings,
}

/// Observed and counterfactual values aligned on the series dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesOutput {
    pub dates: Vec<NaiveDate>,
    /// Offset from the merger point: "-12", "M", "+3".
    pub labels: Vec<String>,
    pub observed: Vec<Option<f64>>,
    pub predicted: Vec<Option<f64>>,
    pub ci_low: Vec<Option<f64>>,
    pub ci_high: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastOutput {
    pub merger_date: NaiveDate,
    pub series: SeriesOutput,
    pub fit_diagnostics: FitDiagnostics,
    pub drift: Option<f64>,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Resolve the price data and predict its no-merger path.
pub(crate) fn run_forecast(
    price_data: &PriceData,
    seed: u32,
    settings: &ForecastSettings,
    warnings: &mut Vec<String>,
) -> MergerImpactResult<(SeriesOutput, CounterfactualPrediction)> {
    settings.validate()?;
    let series = price_data.resolve(seed)?;

    let segment = series.fit_segment();
    if segment.hidden_post > 0 {
        warn!(
            hidden = segment.hidden_post,
            "values on or after the merger date ignored"
        );
        warnings.push(format!(
            "{} value(s) dated on or after the merger date were ignored",
            segment.hidden_post
        ));
    }
    if let Some(gap) = segment.gap_at {
        warn!(%gap, gaps = segment.gaps, "pre-merger values missing");
        warnings.push(format!(
            "{} pre-merger date(s) without a value, first at {gap}; fit uses the {} observed point(s)",
            segment.gaps,
            segment.values.len()
        ));
    }

    // The predictor sees the observed pre-merger values followed by the
    // post-merger horizon; the result is laid back onto the series dates.
    let merger_index = series.merger_index();
    let horizon = segment.values.len() + (series.len() - merger_index);
    let prediction = predict_counterfactual(&segment.values, horizon, settings, seed)?;
    match prediction.diagnostics.status {
        FitStatus::Reliable => {}
        FitStatus::ZeroVariance => warnings.push(
            "Pre-merger series has zero variance; R² undefined".into(),
        ),
        FitStatus::InsufficientData => warnings.push(format!(
            "Only {} pre-merger observation(s); counterfactual unreliable",
            prediction.diagnostics.observations
        )),
    }

    let output = SeriesOutput {
        dates: series.dates(),
        labels: series.offset_labels(),
        observed: series.observed(),
        predicted: segment.align(&prediction.predicted, series.len(), merger_index),
        ci_low: segment.align(&prediction.ci_low, series.len(), merger_index),
        ci_high: segment.align(&prediction.ci_high, series.len(), merger_index),
    };
    Ok((output, prediction))
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Counterfactual price path with bootstrap band, without the scoring pipeline.
pub fn forecast_counterfactual(
    input: &ForecastInput,
) -> MergerImpactResult<ComputationOutput<ForecastOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let (series, prediction) =
        run_forecast(&input.price_data, input.seed, &input.settings, &mut warnings)?;

    let output = ForecastOutput {
        merger_date: input.price_data.merger_date(),
        series,
        fit_diagnostics: prediction.diagnostics,
        drift: prediction.drift,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Exponential smoothing with fixed-drift extrapolation and residual bootstrap",
        &serde_json::json!({
            "smoothing_alpha": input.settings.smoothing_alpha,
            "bootstrap_resamples": input.settings.bootstrap_resamples,
            "confidence_level": input.settings.confidence_level,
            "seed": input.seed,
        }),
        warnings,
        elapsed,
        output,
    ))
}
