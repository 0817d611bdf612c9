use chrono::NaiveDate;
use clap::Args;
use serde_json::Value;

use merger_impact_core::counterfactual::forecast::ForecastInput;
use merger_impact_core::counterfactual::series::{PriceData, SeriesShape};
use merger_impact_core::counterfactual::vmm::ForecastSettings;
use merger_impact_core::forecast_counterfactual;

use crate::commands::read_document;

/// Arguments for the counterfactual price path
#[derive(Args)]
pub struct ForecastArgs {
    /// Path to JSON or YAML input file with historical points
    #[arg(long)]
    pub input: Option<String>,

    /// Merger date (YYYY-MM-DD) for a synthetic series
    #[arg(long)]
    pub merger_date: Option<NaiveDate>,

    /// Seed for synthesis and bootstrap
    #[arg(long, default_value_t = 0)]
    pub seed: u32,

    /// Synthesize a daily series with this many pre-merger days
    #[arg(long)]
    pub daily: Option<u32>,

    /// Post-merger days of the daily series
    #[arg(long, default_value_t = 365)]
    pub days_post: u32,

    /// Bootstrap resamples
    #[arg(long)]
    pub resamples: Option<u32>,

    /// Confidence level of the band
    #[arg(long)]
    pub confidence: Option<f64>,
}

pub fn run_forecast(args: ForecastArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut forecast_input: ForecastInput =
        if let Some(doc) = read_document(args.input.as_deref())? {
            serde_json::from_value(doc)?
        } else {
            let merger_date = args
                .merger_date
                .ok_or("--merger-date is required (or provide --input)")?;
            let shape = match args.daily {
                Some(days_pre) => SeriesShape::Daily {
                    days_pre,
                    days_post: args.days_post,
                },
                None => SeriesShape::Monthly,
            };
            ForecastInput {
                price_data: PriceData::Synthetic { merger_date, shape },
                seed: args.seed,
                settings: ForecastSettings::default(),
            }
        };

    if let Some(n) = args.resamples {
        forecast_input.settings.bootstrap_resamples = n;
    }
    if let Some(c) = args.confidence {
        forecast_input.settings.confidence_level = c;
    }

    let result = forecast_counterfactual(&forecast_input)?;
    Ok(serde_json::to_value(result)?)
}
