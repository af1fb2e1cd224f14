use serde::{Deserialize, Serialize};

use crate::*;

/// Coefficient set the online-learning rule can nudge.
///
/// Both directions must clamp into the set's fixed bounds, so repeated
/// application can never leave them.
pub trait Tunable: Copy + core::fmt::Debug {
    /// Applied when recent accuracy is poor.
    fn shrink(self) -> Self;
    /// Applied when recent accuracy is high.
    fn grow(self) -> Self;
}

fn scale_within(value: f64, factor: f64, (min, max): (f64, f64)) -> f64 {
    (value * factor).clamp(min, max)
}

pub const ADJACENCY_WEIGHT_BOUNDS: (f64, f64) = (0.05, 0.25);
pub const BASE_CONFIDENCE_BOUNDS: (f64, f64) = (0.5, 0.85);

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileCoefficients {
    pub adjacency_weight: f64,
    pub base_confidence: f64,
}

impl Default for TileCoefficients {
    fn default() -> Self {
        Self {
            adjacency_weight: 0.15,
            base_confidence: 0.7,
        }
    }
}

impl Tunable for TileCoefficients {
    fn shrink(self) -> Self {
        Self {
            adjacency_weight: scale_within(self.adjacency_weight, 0.95, ADJACENCY_WEIGHT_BOUNDS),
            base_confidence: scale_within(self.base_confidence, 0.98, BASE_CONFIDENCE_BOUNDS),
        }
    }

    fn grow(self) -> Self {
        Self {
            adjacency_weight: scale_within(self.adjacency_weight, 1.02, ADJACENCY_WEIGHT_BOUNDS),
            base_confidence: scale_within(self.base_confidence, 1.01, BASE_CONFIDENCE_BOUNDS),
        }
    }
}

pub const HISTORY_WEIGHT_BOUNDS: (f64, f64) = (0.2, 0.6);
pub const VOLATILITY_WEIGHT_BOUNDS: (f64, f64) = (0.1, 0.4);
pub const STREAK_WEIGHT_BOUNDS: (f64, f64) = (0.1, 0.3);
pub const PATTERN_WEIGHT_BOUNDS: (f64, f64) = (0.05, 0.25);

/// Signal weights of the sequence engine. Each weight acts as a gain relative
/// to its default, so the defaults reproduce the unweighted model.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SequenceCoefficients {
    pub history_weight: f64,
    pub volatility_weight: f64,
    pub streak_weight: f64,
    pub pattern_weight: f64,
}

impl SequenceCoefficients {
    pub const DEFAULT: Self = Self {
        history_weight: 0.4,
        volatility_weight: 0.25,
        streak_weight: 0.2,
        pattern_weight: 0.15,
    };

    pub fn history_gain(&self) -> f64 {
        self.history_weight / Self::DEFAULT.history_weight
    }

    pub fn volatility_gain(&self) -> f64 {
        self.volatility_weight / Self::DEFAULT.volatility_weight
    }

    pub fn streak_gain(&self) -> f64 {
        self.streak_weight / Self::DEFAULT.streak_weight
    }

    pub fn pattern_gain(&self) -> f64 {
        self.pattern_weight / Self::DEFAULT.pattern_weight
    }

    fn scaled(self, factor: f64) -> Self {
        Self {
            history_weight: scale_within(self.history_weight, factor, HISTORY_WEIGHT_BOUNDS),
            volatility_weight: scale_within(
                self.volatility_weight,
                factor,
                VOLATILITY_WEIGHT_BOUNDS,
            ),
            streak_weight: scale_within(self.streak_weight, factor, STREAK_WEIGHT_BOUNDS),
            pattern_weight: scale_within(self.pattern_weight, factor, PATTERN_WEIGHT_BOUNDS),
        }
    }
}

impl Default for SequenceCoefficients {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl Tunable for SequenceCoefficients {
    fn shrink(self) -> Self {
        self.scaled(0.95)
    }

    fn grow(self) -> Self {
        self.scaled(1.02)
    }
}

/// One scored prediction checked against what actually happened.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub correct: bool,
    pub predicted_probability: f64,
}

impl Observation {
    pub const fn new(correct: bool, predicted_probability: f64) -> Self {
        Self {
            correct,
            predicted_probability,
        }
    }
}

/// Owns one coefficient set and the observations that steer it.
///
/// Once the window is full every new observation re-evaluates accuracy over
/// the most recent `window` entries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveWeightStore<C> {
    coefficients: C,
    observations: OutcomeLog<Observation>,
    config: AdaptationConfig,
}

impl<C: Tunable> AdaptiveWeightStore<C> {
    pub fn new(coefficients: C, config: AdaptationConfig, capacity: usize) -> Self {
        let capacity = capacity.max(config.window);
        Self {
            coefficients,
            observations: OutcomeLog::with_capacity(capacity),
            config,
        }
    }

    /// Snapshot to pass into a prediction call.
    pub fn coefficients(&self) -> C {
        self.coefficients
    }

    pub fn observation_count(&self) -> usize {
        self.observations.len()
    }

    /// Accuracy over the trailing window, `None` until the window is full.
    pub fn window_accuracy(&self) -> Option<f64> {
        let window = self.config.window;
        if self.observations.len() < window {
            return None;
        }
        let correct = self
            .observations
            .trailing(window)
            .filter(|obs| obs.correct)
            .count();
        Some(correct as f64 / window as f64)
    }

    /// Records `observation` and returns the possibly adjusted coefficients.
    pub fn observe(&mut self, observation: Observation) -> C {
        self.observations.push(observation);

        if let Some(accuracy) = self.window_accuracy() {
            let before = self.coefficients;
            if accuracy < self.config.low_accuracy {
                self.coefficients = before.shrink();
            } else if accuracy > self.config.high_accuracy {
                self.coefficients = before.grow();
            }
            log::debug!(
                "window accuracy {:.2}: {:?} -> {:?}",
                accuracy,
                before,
                self.coefficients
            );
        }

        self.coefficients
    }
}

impl<C: Tunable + Default> Default for AdaptiveWeightStore<C> {
    fn default() -> Self {
        Self::new(C::default(), AdaptationConfig::default(), HISTORY_CAPACITY)
    }
}
