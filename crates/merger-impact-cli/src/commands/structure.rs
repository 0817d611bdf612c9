use clap::Args;
use serde_json::Value;

use merger_impact_core::analyze_market_structure;
use merger_impact_core::market_structure::analysis::{Firm, MarketStructureInput};
use merger_impact_core::market_structure::fringe::FringeFloorPolicy;
use merger_impact_core::params::BehavioralParams;

use crate::commands::{read_document, ParamArgs};

/// Arguments for share normalization and HHI
#[derive(Args)]
pub struct StructureArgs {
    /// Path to JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Raw firm shares, comma separated
    #[arg(long, value_delimiter = ',')]
    pub shares: Option<Vec<f64>>,

    /// Zero-based indices of the merging firms, comma separated
    #[arg(long, value_delimiter = ',')]
    pub merging: Option<Vec<usize>>,

    /// Fixed fringe floor instead of the dynamic one
    #[arg(long)]
    pub floor: Option<f64>,

    /// Measure HHI on breadth-adjusted shares
    #[arg(long)]
    pub breadth_adjusted: bool,

    #[command(flatten)]
    pub params: ParamArgs,
}

pub fn run_structure(args: StructureArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let structure_input: MarketStructureInput =
        if let Some(doc) = read_document(args.input.as_deref())? {
            let mut parsed: MarketStructureInput = serde_json::from_value(doc)?;
            parsed.params = args.params.apply(parsed.params);
            parsed
        } else {
            let shares = args
                .shares
                .ok_or("--shares is required (or provide --input)")?;
            let merging = args.merging.unwrap_or_default();
            if let Some(bad) = merging.iter().find(|&&i| i >= shares.len()) {
                return Err(format!("--merging index {} is out of range", bad).into());
            }
            MarketStructureInput {
                firms: shares
                    .iter()
                    .enumerate()
                    .map(|(i, &share)| Firm {
                        name: format!("Firm {}", i + 1),
                        share,
                        merging: merging.contains(&i),
                    })
                    .collect(),
                params: args.params.apply(BehavioralParams::default()),
                fringe_floor: args
                    .floor
                    .map(|floor| FringeFloorPolicy::Static { floor })
                    .unwrap_or_default(),
                breadth_adjusted_hhi: args.breadth_adjusted,
            }
        };

    let result = analyze_market_structure(&structure_input)?;
    Ok(serde_json::to_value(result)?)
}
