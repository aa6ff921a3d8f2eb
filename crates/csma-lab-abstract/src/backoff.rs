use rand::{Rng, RngCore};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A backoff policy applied to every node caught in a collision.
///
/// The RNG is threaded in explicitly so trials stay independently seedable;
/// no strategy may reach for a process-wide generator. The counters are the
/// trial's *cumulative* collision/success totals, not per-node retry counts:
/// every colliding node in a step sees the same global feedback.
pub trait BackoffStrategy {
    /// Number of steps the node must stay silent before re-arming.
    fn backoff_time(
        &mut self,
        rng: &mut dyn RngCore,
        collision_count: u32,
        successful_count: u32,
    ) -> u32;

    /// Policy name as it appears in reports and logs.
    fn name(&self) -> &'static str;
}

/// Plain exponential backoff: window = min(1024, 2^collisions).
///
/// Ignores the success counter. That asymmetry is intentional and shared
/// with [`BinaryExponential`]; only [`AdaptiveRate`] reacts to successes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Exponential;

impl BackoffStrategy for Exponential {
    fn backoff_time(
        &mut self,
        rng: &mut dyn RngCore,
        collision_count: u32,
        _successful_count: u32,
    ) -> u32 {
        let window = if collision_count >= 10 {
            1024
        } else {
            1u32 << collision_count
        };
        rng.random_range(0..window)
    }

    fn name(&self) -> &'static str {
        "exponential"
    }
}

/// 802.11-style binary exponential backoff (BEB).
///
/// The contention window doubles from CWmin after every collision and
/// saturates at CWmax. CWmin is floored to 2 at construction so there is
/// always a real range to draw from.
#[derive(Debug, Clone, Copy)]
pub struct BinaryExponential {
    cw_min: u32,
    cw_max: u32,
}

impl BinaryExponential {
    pub fn new(cw_min: u32, cw_max: u32) -> Self {
        Self {
            cw_min: cw_min.max(2),
            cw_max,
        }
    }
}

impl Default for BinaryExponential {
    fn default() -> Self {
        Self::new(16, 1024)
    }
}

impl BackoffStrategy for BinaryExponential {
    fn backoff_time(
        &mut self,
        rng: &mut dyn RngCore,
        collision_count: u32,
        _successful_count: u32,
    ) -> u32 {
        // Widen before shifting; CWmin << collisions overflows u32 quickly.
        let doubled = u64::from(self.cw_min) << collision_count.min(32);
        let window = doubled.min(u64::from(self.cw_max)) as u32;
        rng.random_range(0..window.max(1))
    }

    fn name(&self) -> &'static str {
        "beb"
    }
}

/// Backoff with a contention window that tracks global medium conditions.
///
/// Collisions grow the window by `alpha`, successes shrink it by `beta`,
/// clamped to [CWmin, CWmax]. Unlike the other two policies the window is
/// state owned by the strategy, so sharing one instance across nodes (and
/// across trials, when the caller reuses it) makes the adjustments visible
/// to every contender.
#[derive(Debug, Clone, Copy)]
pub struct AdaptiveRate {
    cw_min: u32,
    cw_max: u32,
    alpha: f64,
    beta: f64,
    current_window: u32,
}

impl AdaptiveRate {
    pub fn new(cw_min: u32, cw_max: u32, alpha: f64, beta: f64) -> Self {
        Self {
            cw_min,
            cw_max,
            alpha,
            beta,
            current_window: cw_min,
        }
    }

    /// Current contention window, for diagnostics and tests.
    pub fn current_window(&self) -> u32 {
        self.current_window
    }
}

impl Default for AdaptiveRate {
    fn default() -> Self {
        Self::new(16, 1024, 2.0, 0.5)
    }
}

impl BackoffStrategy for AdaptiveRate {
    fn backoff_time(
        &mut self,
        rng: &mut dyn RngCore,
        collision_count: u32,
        successful_count: u32,
    ) -> u32 {
        // Truncating casts, like the integer arithmetic this models.
        if collision_count > 0 {
            self.current_window =
                ((f64::from(self.current_window) * self.alpha) as u32).min(self.cw_max);
        } else if successful_count > 0 {
            self.current_window =
                ((f64::from(self.current_window) * self.beta) as u32).max(self.cw_min);
        }
        rng.random_range(0..self.current_window.max(1))
    }

    fn name(&self) -> &'static str {
        "adaptive-rate"
    }
}

#[derive(Debug, Clone, Error)]
#[error("unknown backoff strategy {0:?} (expected exponential, beb or adaptive-rate)")]
pub struct UnknownStrategy(pub String);

/// Closed set of selectable policies. Unknown names are rejected at the
/// edge (CLI flag parsing, scenario deserialization) and never reach the
/// simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    Exponential,
    Beb,
    AdaptiveRate,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrategyKind::Exponential => "exponential",
            StrategyKind::Beb => "beb",
            StrategyKind::AdaptiveRate => "adaptive-rate",
        };
        f.write_str(name)
    }
}

impl FromStr for StrategyKind {
    type Err = UnknownStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "exponential" => Ok(StrategyKind::Exponential),
            "beb" => Ok(StrategyKind::Beb),
            "adaptive-rate" => Ok(StrategyKind::AdaptiveRate),
            _ => Err(UnknownStrategy(s.to_string())),
        }
    }
}

/// Strategy selection plus tuning knobs, shared by the CLI flags and the
/// scenario schema. The knobs that a given policy ignores are simply unused.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    pub kind: StrategyKind,
    pub cw_min: u32,
    pub cw_max: u32,
    pub alpha: f64,
    pub beta: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            kind: StrategyKind::Exponential,
            cw_min: 16,
            cw_max: 1024,
            alpha: 2.0,
            beta: 0.5,
        }
    }
}

impl StrategyConfig {
    pub fn build(&self) -> Box<dyn BackoffStrategy> {
        match self.kind {
            StrategyKind::Exponential => Box::new(Exponential),
            StrategyKind::Beb => Box::new(BinaryExponential::new(self.cw_min, self.cw_max)),
            StrategyKind::AdaptiveRate => Box::new(AdaptiveRate::new(
                self.cw_min,
                self.cw_max,
                self.alpha,
                self.beta,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn exponential_with_no_collisions_always_draws_zero() {
        let mut strategy = Exponential;
        let mut rng = rng();
        for _ in 0..100 {
            assert_eq!(strategy.backoff_time(&mut rng, 0, 0), 0);
        }
    }

    #[test]
    fn exponential_window_caps_at_1024() {
        let mut strategy = Exponential;
        let mut rng = rng();
        for collisions in [10, 11, 31, 1000] {
            for _ in 0..200 {
                assert!(strategy.backoff_time(&mut rng, collisions, 0) < 1024);
            }
        }
    }

    #[test]
    fn beb_draws_within_initial_window() {
        let mut strategy = BinaryExponential::new(16, 1024);
        let mut rng = rng();
        for _ in 0..200 {
            assert!(strategy.backoff_time(&mut rng, 0, 0) <= 15);
        }
    }

    #[test]
    fn beb_saturates_at_cw_max() {
        // With CWmin=16 the window hits CWmax=1024 at six collisions and
        // stays there for any higher count.
        let mut strategy = BinaryExponential::new(16, 1024);
        let mut rng = rng();
        let mut seen_high = false;
        for collisions in [6, 7, 40] {
            for _ in 0..500 {
                let backoff = strategy.backoff_time(&mut rng, collisions, 0);
                assert!(backoff < 1024);
                if backoff >= 512 {
                    seen_high = true;
                }
            }
        }
        assert!(seen_high, "draws never reached the upper half of CWmax");
    }

    #[test]
    fn beb_floors_cw_min_to_two() {
        let mut strategy = BinaryExponential::new(0, 1024);
        let mut rng = rng();
        for _ in 0..100 {
            assert!(strategy.backoff_time(&mut rng, 0, 0) <= 1);
        }
    }

    #[test]
    fn adaptive_grows_on_collision_and_shrinks_on_success() {
        let mut strategy = AdaptiveRate::new(16, 1024, 2.0, 0.5);
        let mut rng = rng();
        assert_eq!(strategy.current_window(), 16);

        strategy.backoff_time(&mut rng, 1, 0);
        assert_eq!(strategy.current_window(), 32);

        // Shrink is clamped at CWmin.
        strategy.backoff_time(&mut rng, 0, 1);
        assert_eq!(strategy.current_window(), 16);
        strategy.backoff_time(&mut rng, 0, 5);
        assert_eq!(strategy.current_window(), 16);
    }

    #[test]
    fn adaptive_growth_clamps_at_cw_max() {
        let mut strategy = AdaptiveRate::new(16, 1024, 2.0, 0.5);
        let mut rng = rng();
        for _ in 0..20 {
            strategy.backoff_time(&mut rng, 3, 0);
        }
        assert_eq!(strategy.current_window(), 1024);
        for _ in 0..100 {
            assert!(strategy.backoff_time(&mut rng, 3, 0) < 1024);
        }
    }

    #[test]
    fn adaptive_idle_calls_leave_window_untouched() {
        let mut strategy = AdaptiveRate::default();
        let mut rng = rng();
        strategy.backoff_time(&mut rng, 0, 0);
        assert_eq!(strategy.current_window(), 16);
    }

    #[test]
    fn strategy_kind_parses_known_names_only() {
        assert_eq!("beb".parse::<StrategyKind>().unwrap(), StrategyKind::Beb);
        assert_eq!(
            "Adaptive-Rate".parse::<StrategyKind>().unwrap(),
            StrategyKind::AdaptiveRate
        );
        assert!("slotted-aloha".parse::<StrategyKind>().is_err());
    }

    #[test]
    fn config_builds_the_selected_variant() {
        let config = StrategyConfig {
            kind: StrategyKind::AdaptiveRate,
            ..Default::default()
        };
        assert_eq!(config.build().name(), "adaptive-rate");
        assert_eq!(StrategyConfig::default().build().name(), "exponential");
    }
}
