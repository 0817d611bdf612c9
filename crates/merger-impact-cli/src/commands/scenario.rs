use clap::Args;
use serde_json::Value;

use merger_impact_core::risk::classifier::RiskModel;
use merger_impact_core::scenario::evaluate::ScenarioInput;
use merger_impact_core::evaluate_scenario_with_policies;

use crate::commands::{load_policies, read_document, ParamArgs};
use crate::RiskModelArg;

/// Arguments for a full scenario evaluation
#[derive(Args)]
pub struct EvaluateArgs {
    /// Path to JSON or YAML scenario file (or pipe it on stdin)
    #[arg(long)]
    pub input: Option<String>,

    /// Policy table file replacing the built-in EU/SA thresholds
    #[arg(long)]
    pub policies: Option<String>,

    /// Override the scenario's policy regime
    #[arg(long)]
    pub policy: Option<String>,

    /// Override the scenario's seed
    #[arg(long)]
    pub seed: Option<u32>,

    /// Override the risk classifier
    #[arg(long)]
    pub model: Option<RiskModelArg>,

    #[command(flatten)]
    pub params: ParamArgs,
}

pub fn run_evaluate(args: EvaluateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let doc = read_document(args.input.as_deref())?
        .ok_or("--input scenario file is required (or pipe one on stdin)")?;
    let mut scenario: ScenarioInput = serde_json::from_value(doc)?;

    scenario.params = args.params.apply(scenario.params);
    if let Some(policy) = args.policy {
        scenario.policy = policy;
    }
    if let Some(seed) = args.seed {
        scenario.seed = seed;
    }
    if let Some(model) = args.model {
        scenario.settings.risk_model = RiskModel::from(model);
    }

    let policies = load_policies(args.policies.as_deref())?;
    let result = evaluate_scenario_with_policies(&scenario, &policies)?;
    Ok(serde_json::to_value(result)?)
}
