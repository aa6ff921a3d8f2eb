pub mod backoff;
pub mod params;
pub mod scenario;

pub use backoff::{
    AdaptiveRate, BackoffStrategy, BinaryExponential, Exponential, StrategyConfig, StrategyKind,
    UnknownStrategy,
};
pub use params::{ParameterError, SimulationParameters};
pub use scenario::{ParameterOverride, Scenario, ScenarioAssertion};
