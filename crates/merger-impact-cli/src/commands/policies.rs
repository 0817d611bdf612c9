use clap::Args;
use serde_json::{json, Value};

use crate::commands::load_policies;

/// Arguments for listing policy regimes
#[derive(Args)]
pub struct PoliciesArgs {
    /// Policy table file replacing the built-in EU/SA thresholds
    #[arg(long)]
    pub policies: Option<String>,
}

pub fn run_policies(args: PoliciesArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let table = load_policies(args.policies.as_deref())?;
    let rows: Vec<Value> = table
        .regimes()
        .map(|(id, t)| {
            json!({
                "regime": id,
                "default": id == table.default_regime(),
                "delta_high": t.delta_high,
                "post_high": t.post_high,
                "delta_medium": t.delta_medium,
                "post_medium": t.post_medium,
            })
        })
        .collect();
    Ok(Value::Array(rows))
}
