use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Flat parameter set for one run. Immutable once a run starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationParameters {
    /// Number of contending nodes on the shared medium.
    pub node_count: u32,
    /// Smallest packet size a node may draw, in bytes.
    pub min_packet_size: u32,
    /// Largest packet size a node may draw, in bytes.
    pub max_packet_size: u32,
    /// Discrete time steps per trial ("simulation time").
    pub step_count: u32,
    /// Independent trials per run.
    pub trial_count: u32,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            node_count: 100,
            min_packet_size: 64,
            max_packet_size: 1500,
            step_count: 100,
            trial_count: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterError {
    #[error("node count must be positive")]
    NodeCount,
    #[error("packet sizes must be positive")]
    PacketSize,
    #[error("packet size range is inverted: min {min} > max {max}")]
    PacketSizeRange { min: u32, max: u32 },
    #[error("step count must be positive")]
    StepCount,
    #[error("trial count must be positive")]
    TrialCount,
}

impl SimulationParameters {
    /// Checked before any trial executes; a failure aborts the whole run.
    pub fn validate(&self) -> Result<(), ParameterError> {
        if self.node_count == 0 {
            return Err(ParameterError::NodeCount);
        }
        if self.min_packet_size == 0 {
            return Err(ParameterError::PacketSize);
        }
        if self.min_packet_size > self.max_packet_size {
            return Err(ParameterError::PacketSizeRange {
                min: self.min_packet_size,
                max: self.max_packet_size,
            });
        }
        if self.step_count == 0 {
            return Err(ParameterError::StepCount);
        }
        if self.trial_count == 0 {
            return Err(ParameterError::TrialCount);
        }
        Ok(())
    }
}
