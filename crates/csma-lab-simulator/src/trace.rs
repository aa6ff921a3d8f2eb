use csma_lab_abstract::SimulationParameters;
use serde::Serialize;

use crate::runner::{AggregateResult, TrialPoint};

/// Serializable snapshot of a finished run, written by the CLI as JSON
/// for charting or grading outside the simulator.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub params: SimulationParameters,
    pub strategy: String,
    pub seed: u64,
    pub mean_collisions: f64,
    pub total_successful: u64,
    pub total_collisions: u64,
    pub series: Vec<TrialPoint>,
}

impl SimulationReport {
    pub fn new(
        params: &SimulationParameters,
        strategy: &str,
        seed: u64,
        result: &AggregateResult,
    ) -> Self {
        Self {
            params: params.clone(),
            strategy: strategy.to_string(),
            seed,
            mean_collisions: result.mean_collisions,
            total_successful: result.total_successful,
            total_collisions: result.total_collisions,
            series: result.series.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_serializes_to_json() {
        let result = AggregateResult {
            mean_collisions: 1.5,
            total_successful: 3,
            total_collisions: 3,
            series: vec![
                TrialPoint {
                    trial_index: 0,
                    collisions: 1,
                },
                TrialPoint {
                    trial_index: 1,
                    collisions: 2,
                },
            ],
        };
        let report =
            SimulationReport::new(&SimulationParameters::default(), "beb", 42, &result);

        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["strategy"], "beb");
        assert_eq!(value["params"]["node_count"], 100);
        assert_eq!(value["series"][1]["collisions"], 2);
    }
}
