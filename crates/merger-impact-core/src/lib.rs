pub mod error;
pub mod params;
pub mod types;

pub mod counterfactual;
pub mod impact;
pub mod market_structure;
pub mod random;
pub mod risk;
pub mod scenario;

pub use counterfactual::forecast::forecast_counterfactual;
pub use error::MergerImpactError;
pub use market_structure::analysis::analyze_market_structure;
pub use risk::assessment::assess_merger_risk;
pub use scenario::evaluate::{evaluate_scenario, evaluate_scenario_with_policies};
pub use types::*;

/// Standard result type for all merger-impact operations
pub type MergerImpactResult<T> = Result<T, MergerImpactError>;
