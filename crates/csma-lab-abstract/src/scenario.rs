use crate::backoff::StrategyConfig;
use crate::params::SimulationParameters;
use serde::Deserialize;

/// A reproducible run description loaded from a TOML file, with optional
/// assertions checked against the aggregate once the run finishes.
#[derive(Deserialize, Debug, Clone)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub params: ParameterOverride,
    #[serde(default)]
    pub strategy: StrategyConfig,
    pub seed: Option<u64>,
    #[serde(default)]
    pub assertions: Vec<ScenarioAssertion>,
}

/// Overrides applied on top of the stock parameters, so scenarios only
/// spell out what they care about.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ParameterOverride {
    pub node_count: Option<u32>,
    pub min_packet_size: Option<u32>,
    pub max_packet_size: Option<u32>,
    pub step_count: Option<u32>,
    pub trial_count: Option<u32>,
}

impl ParameterOverride {
    pub fn apply_to(&self, params: &mut SimulationParameters) {
        if let Some(v) = self.node_count {
            params.node_count = v;
        }
        if let Some(v) = self.min_packet_size {
            params.min_packet_size = v;
        }
        if let Some(v) = self.max_packet_size {
            params.max_packet_size = v;
        }
        if let Some(v) = self.step_count {
            params.step_count = v;
        }
        if let Some(v) = self.trial_count {
            params.trial_count = v;
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScenarioAssertion {
    /// Assert that the mean collision count over all trials is within bounds.
    MeanCollisions { min: Option<f64>, max: Option<f64> },
    /// Assert that the total number of successful transmissions is within range.
    TotalSuccessful { min: u64, max: Option<u64> },
    /// Assert that no single trial exceeded the given collision count.
    MaxCollisionsPerTrial { max: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backoff::StrategyKind;

    #[test]
    fn parses_full_scenario() {
        let text = r#"
            name = "two nodes always collide"
            description = "both nodes are ready at the only step"
            seed = 7

            [params]
            node_count = 2
            step_count = 1
            trial_count = 10

            [strategy]
            kind = "beb"
            cw_min = 16

            [[assertions]]
            type = "mean_collisions"
            min = 1.0
            max = 1.0

            [[assertions]]
            type = "total_successful"
            min = 0
            max = 0
        "#;

        let scenario: Scenario = toml::from_str(text).unwrap();
        assert_eq!(scenario.strategy.kind, StrategyKind::Beb);
        assert_eq!(scenario.seed, Some(7));
        assert_eq!(scenario.assertions.len(), 2);

        let mut params = SimulationParameters::default();
        scenario.params.apply_to(&mut params);
        assert_eq!(params.node_count, 2);
        assert_eq!(params.step_count, 1);
        assert_eq!(params.trial_count, 10);
        // Untouched fields keep their stock values.
        assert_eq!(params.min_packet_size, 64);
    }

    #[test]
    fn rejects_unknown_strategy_kind() {
        let text = r#"
            name = "bad"

            [strategy]
            kind = "slotted-aloha"
        "#;
        assert!(toml::from_str::<Scenario>(text).is_err());
    }
}
