//! Engine configuration carried with each scenario.

use serde::{Deserialize, Serialize};

use crate::counterfactual::vmm::ForecastSettings;
use crate::market_structure::fringe::FringeFloorPolicy;
use crate::risk::classifier::RiskModel;

/// Strategy switches and predictor tunables. Every field has a default, so
/// `{}` is a valid configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct EngineSettings {
    #[serde(default)]
    pub fringe_floor: FringeFloorPolicy,
    #[serde(default)]
    pub risk_model: RiskModel,
    /// Measure HHI on the breadth-adjusted shares.
    #[serde(default)]
    pub breadth_adjusted_hhi: bool,
    #[serde(default)]
    pub forecast: ForecastSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_is_default() {
        let s: EngineSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(s, EngineSettings::default());
        assert_eq!(s.risk_model, RiskModel::Contestability);
        assert_eq!(s.fringe_floor, FringeFloorPolicy::Dynamic);
        assert_eq!(s.forecast.bootstrap_resamples, 400);
    }

    #[test]
    fn test_partial_override() {
        let s: EngineSettings = serde_json::from_str(
            r#"{"risk_model":"threshold","fringe_floor":{"type":"Static","floor":0.3},"forecast":{"smoothing_alpha":0.5}}"#,
        )
        .unwrap();
        assert_eq!(s.risk_model, RiskModel::Threshold);
        assert_eq!(s.fringe_floor, FringeFloorPolicy::Static { floor: 0.3 });
        assert_eq!(s.forecast.smoothing_alpha, 0.5);
        assert_eq!(s.forecast.confidence_level, 0.95);
        assert!(!s.breadth_adjusted_hhi);
    }
}
