pub mod forecast;
pub mod policies;
pub mod risk;
pub mod scenario;
pub mod structure;

use clap::Args;
use serde_json::Value;
use tracing::debug;

use merger_impact_core::params::BehavioralParams;
use merger_impact_core::risk::policy::PolicyTable;

use crate::input;

/// Behavioral parameter overrides shared by several commands.
#[derive(Args, Debug, Clone, Default)]
pub struct ParamArgs {
    /// Conduct (0 competitive, 1 collusive)
    #[arg(long)]
    pub conduct: Option<f64>,

    /// Demand flexibility / market breadth
    #[arg(long, alias = "demand-flex")]
    pub flex: Option<f64>,

    /// Entry barriers
    #[arg(long, alias = "entry-barriers")]
    pub entry: Option<f64>,

    /// Innovation multiplier (1.0 neutral)
    #[arg(long, alias = "innovation-mult")]
    pub innov: Option<f64>,
}

impl ParamArgs {
    /// Apply the flags on top of `base`.
    pub fn apply(&self, base: BehavioralParams) -> BehavioralParams {
        BehavioralParams {
            conduct: self.conduct.unwrap_or(base.conduct),
            demand_flex: self.flex.unwrap_or(base.demand_flex),
            entry_barriers: self.entry.unwrap_or(base.entry_barriers),
            innovation_mult: self.innov.unwrap_or(base.innovation_mult),
        }
    }
}

/// Built-in EU/SA table, or the table in `path` (JSON or YAML).
pub fn load_policies(path: Option<&str>) -> Result<PolicyTable, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(PolicyTable::builtin());
    };
    let table: PolicyTable = input::file::read_input(path)?;
    table.validate()?;
    debug!(
        path,
        default = table.default_regime(),
        regimes = table.regimes().count(),
        "policy table loaded"
    );
    Ok(table)
}

/// Input from `--input`, else piped stdin, else `None`.
pub fn read_document(path: Option<&str>) -> Result<Option<Value>, Box<dyn std::error::Error>> {
    match path {
        Some(p) => Ok(Some(input::file::read_value(p)?)),
        None => input::stdin::read_stdin(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_flags_override_only_given_fields() {
        let flags = ParamArgs {
            flex: Some(0.9),
            innov: Some(1.3),
            ..Default::default()
        };
        let p = flags.apply(BehavioralParams::default());
        assert_eq!(p.demand_flex, 0.9);
        assert_eq!(p.innovation_mult, 1.3);
        assert_eq!(p.conduct, BehavioralParams::default().conduct);
        assert_eq!(p.entry_barriers, BehavioralParams::default().entry_barriers);
    }

    #[test]
    fn test_no_policy_file_is_builtin() {
        let table = load_policies(None).unwrap();
        assert_eq!(table.default_regime(), "EU");
        assert!(table.get("SA").is_some());
    }
}
