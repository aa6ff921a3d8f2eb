use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;

use csma_lab_abstract::{BackoffStrategy, ParameterError, SimulationParameters};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::engine::run_trial;

/// One entry of the reported collision time series, in trial order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrialPoint {
    pub trial_index: u32,
    pub collisions: u32,
}

/// Final aggregate of a full run. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateResult {
    pub mean_collisions: f64,
    pub total_successful: u64,
    pub total_collisions: u64,
    pub series: Vec<TrialPoint>,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("invalid simulation parameters: {0}")]
    InvalidParameters(#[from] ParameterError),
    #[error("run cancelled")]
    Cancelled,
}

/// Consumer of run updates. Default methods are no-ops so callers only
/// override what they need. Implementations must not block: the runner
/// calls them from inside the trial loop.
pub trait RunObserver {
    /// Percentage in [0, 100], non-decreasing, ending at exactly 100.
    fn on_progress(&mut self, _percent: u8) {}

    /// The final aggregate, delivered once after the last trial.
    fn on_result(&mut self, _result: &AggregateResult) {}
}

/// Observer that ignores everything.
pub struct NullObserver;

impl RunObserver for NullObserver {}

/// Update stream for callers consuming progress on another thread.
#[derive(Debug, Clone, PartialEq)]
pub enum RunUpdate {
    Progress(u8),
    Finished(AggregateResult),
}

/// Adapter pushing updates into an unbounded channel. Sends never block,
/// and a disconnected receiver is ignored rather than failing the run.
pub struct ChannelObserver {
    tx: Sender<RunUpdate>,
}

impl ChannelObserver {
    pub fn new(tx: Sender<RunUpdate>) -> Self {
        Self { tx }
    }
}

impl RunObserver for ChannelObserver {
    fn on_progress(&mut self, percent: u8) {
        let _ = self.tx.send(RunUpdate::Progress(percent));
    }

    fn on_result(&mut self, result: &AggregateResult) {
        let _ = self.tx.send(RunUpdate::Finished(result.clone()));
    }
}

/// Cooperative cancellation flag, checked once per trial boundary.
/// Cancelling aborts the run with [`RunError::Cancelled`]; no partial
/// aggregate is reported.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Runs the configured number of trials and aggregates their outcomes.
///
/// The strategy is taken once per run and reused across every trial, so
/// AdaptiveRate's contention window carries over from trial to trial.
/// Exponential and BEB are stateless, so only AdaptiveRate makes this
/// observable; resetting it per trial would silently change the
/// trial-to-trial correlation the lab is meant to exhibit.
pub struct TrialRunner {
    params: SimulationParameters,
    strategy: Box<dyn BackoffStrategy>,
    seed: u64,
    cancel: CancelToken,
}

impl TrialRunner {
    pub fn new(
        params: SimulationParameters,
        strategy: Box<dyn BackoffStrategy>,
        seed: u64,
    ) -> Self {
        Self {
            params,
            strategy,
            seed,
            cancel: CancelToken::new(),
        }
    }

    /// Handle for cancelling this run from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn params(&self) -> &SimulationParameters {
        &self.params
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Execute the full run. Parameters are validated before the first
    /// trial; an invalid set aborts with no partial results.
    pub fn run(&mut self, observer: &mut dyn RunObserver) -> Result<AggregateResult, RunError> {
        self.params.validate()?;

        info!(
            "starting run: {} trials of {} steps, {} nodes, {} backoff",
            self.params.trial_count,
            self.params.step_count,
            self.params.node_count,
            self.strategy.name()
        );

        let mut series = Vec::with_capacity(self.params.trial_count as usize);
        let mut total_successful = 0u64;
        let mut total_collisions = 0u64;

        for trial_index in 0..self.params.trial_count {
            if self.cancel.is_cancelled() {
                info!("run cancelled after {} trials", trial_index);
                return Err(RunError::Cancelled);
            }

            // Each trial gets its own generator derived from the run seed,
            // keeping trials independently reproducible.
            let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(u64::from(trial_index)));
            let outcome = run_trial(&self.params, self.strategy.as_mut(), &mut rng);
            debug!(
                "trial {}: {} successful, {} collisions",
                trial_index, outcome.successful, outcome.collisions
            );

            total_successful += u64::from(outcome.successful);
            total_collisions += u64::from(outcome.collisions);
            series.push(TrialPoint {
                trial_index,
                collisions: outcome.collisions,
            });

            let percent = (f64::from(trial_index + 1) * 100.0
                / f64::from(self.params.trial_count))
            .round() as u8;
            observer.on_progress(percent);
        }

        let result = AggregateResult {
            mean_collisions: total_collisions as f64 / f64::from(self.params.trial_count),
            total_successful,
            total_collisions,
            series,
        };
        info!(
            "run finished: mean {:.2} collisions over {} trials",
            result.mean_collisions, self.params.trial_count
        );
        observer.on_result(&result);
        Ok(result)
    }
}
