use clap::Args;
use serde_json::Value;

use merger_impact_core::assess_merger_risk;
use merger_impact_core::params::BehavioralParams;
use merger_impact_core::risk::assessment::RiskInput;
use merger_impact_core::risk::classifier::RiskModel;

use crate::commands::{load_policies, read_document, ParamArgs};
use crate::RiskModelArg;

/// Arguments for standalone risk scoring
#[derive(Args)]
pub struct RiskArgs {
    /// Path to JSON or YAML input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Pre-merger HHI
    #[arg(long)]
    pub hhi_pre: Option<u32>,

    /// Post-merger HHI
    #[arg(long)]
    pub hhi_post: Option<u32>,

    /// Pass-through (derived from the parameters if omitted)
    #[arg(long)]
    pub pass_through: Option<f64>,

    /// Policy regime
    #[arg(long, default_value = "EU")]
    pub policy: String,

    /// Risk classifier
    #[arg(long, value_enum, default_value = "contestability")]
    pub model: RiskModelArg,

    /// Policy table file replacing the built-in EU/SA thresholds
    #[arg(long)]
    pub policies: Option<String>,

    #[command(flatten)]
    pub params: ParamArgs,
}

pub fn run_risk(args: RiskArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let risk_input: RiskInput = if let Some(doc) = read_document(args.input.as_deref())? {
        serde_json::from_value(doc)?
    } else {
        RiskInput {
            hhi_pre: args
                .hhi_pre
                .ok_or("--hhi-pre is required (or provide --input)")?,
            hhi_post: args
                .hhi_post
                .ok_or("--hhi-post is required (or provide --input)")?,
            pass_through: args.pass_through,
            params: args.params.apply(BehavioralParams::default()),
            policy: args.policy,
            model: RiskModel::from(args.model),
        }
    };

    let policies = load_policies(args.policies.as_deref())?;
    let result = assess_merger_risk(&risk_input, &policies)?;
    Ok(serde_json::to_value(result)?)
}
