pub mod engine;
pub mod node;
pub mod runner;
pub mod trace;

pub use engine::{Transmissions, run_trial};
pub use node::Node;
pub use runner::{
    AggregateResult, CancelToken, ChannelObserver, NullObserver, RunError, RunObserver, RunUpdate,
    TrialPoint, TrialRunner,
};
pub use trace::SimulationReport;
