use core::fmt;

use rand::prelude::*;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::*;

/// Streak length after which momentum starts to bias the prediction.
const STREAK_TRIGGER: u32 = 2;
/// Streak length at which the momentum bias stops growing.
const STREAK_SATURATION: u32 = 5;
const FAVORABLE_STREAK_UPLIFT: f64 = 0.10;
const UNFAVORABLE_STREAK_CUT: f64 = 0.15;
/// Relative spread above which rounds count as volatile.
const HIGH_VOLATILITY: f64 = 1.0;
const VOLATILITY_UPLIFT: f64 = 0.2;
/// Spread assumed when only one round has been logged.
const SINGLE_SAMPLE_STD_DEV: f64 = 0.5;
/// A prediction within this fraction of the actual stop is a close call.
const CLOSE_CALL_RATIO: f64 = 0.2;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameKind {
    Limbo,
    Crash,
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Limbo => "limbo",
            Self::Crash => "crash",
        })
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoundId(pub u64);

impl fmt::Display for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "round-{}", self.0)
    }
}

/// A drawn round. The crash point is fixed at creation.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Round {
    pub round_id: RoundId,
    pub crash_point: f64,
    pub started_at: OffsetDateTime,
    pub game_kind: GameKind,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoggedRound {
    pub crash_point: f64,
    pub user_exit: Option<f64>,
    pub user_won: Option<bool>,
    pub logged_at: OffsetDateTime,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundPrediction {
    pub predicted_stop: f64,
    pub confidence: f64,
    pub recommended_exit: f64,
    pub reasoning: Vec<String>,
}

impl RoundPrediction {
    /// Fixed answer before any round has been logged.
    pub fn cold_start() -> Self {
        Self {
            predicted_stop: 3.0,
            confidence: 0.3,
            recommended_exit: 2.0,
            reasoning: vec![
                "No historical data yet".to_string(),
                "Recommended: start with a conservative 2x exit".to_string(),
                "Log results to build data for better predictions".to_string(),
            ],
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
    Neutral,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VolatilitySummary {
    pub volatility: f64,
    pub average: f64,
    pub std_dev: f64,
    pub trend: Trend,
    pub sample_size: usize,
}

/// Predicts where a multiplier-growth round stops, from the trailing
/// history, its relative spread and the current win/loss streak.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SequencePredictor {
    config: SequenceConfig,
    history: OutcomeLog<LoggedRound>,
    streak: StreakState,
    accuracy: AccuracyTally,
    rounds_created: u64,
}

impl Default for SequencePredictor {
    fn default() -> Self {
        Self::build(SequenceConfig::default(), HISTORY_CAPACITY)
    }
}

impl SequencePredictor {
    pub fn new(config: SequenceConfig, history_capacity: usize) -> Result<Self> {
        config.validate(history_capacity)?;
        Ok(Self::build(config, history_capacity))
    }

    fn build(config: SequenceConfig, history_capacity: usize) -> Self {
        Self {
            config,
            history: OutcomeLog::with_capacity(history_capacity),
            streak: StreakState::default(),
            accuracy: AccuracyTally::default(),
            rounds_created: 0,
        }
    }

    pub fn config(&self) -> &SequenceConfig {
        &self.config
    }

    pub fn history(&self) -> &OutcomeLog<LoggedRound> {
        &self.history
    }

    pub fn streak(&self) -> StreakState {
        self.streak
    }

    pub fn accuracy(&self) -> AccuracyTally {
        self.accuracy
    }

    fn trailing_crash_points(&self, n: usize) -> Vec<f64> {
        self.history
            .trailing(n)
            .map(|round| round.crash_point)
            .collect()
    }

    /// Draws a new round around the recent mean, or from the cold-start band.
    pub fn create_round<R: Rng>(&mut self, rng: &mut R, at: OffsetDateTime) -> Round {
        let SequenceConfig {
            min_multiplier,
            max_multiplier,
            cold_start_band: (low, high),
            jitter_ratio,
            draw_window,
            game_kind,
            ..
        } = self.config;

        let recent = self.trailing_crash_points(draw_window);
        let drawn = match stats::mean(&recent) {
            Some(mean) => {
                let jitter = stats::standard_normal(rng) * jitter_ratio * mean;
                (mean + jitter).max(min_multiplier)
            }
            None => rng.random_range(low..high),
        };
        let crash_point = stats::round_to(drawn.min(max_multiplier), 2)
            .clamp(min_multiplier, max_multiplier);

        self.rounds_created += 1;
        let round = Round {
            round_id: RoundId(self.rounds_created),
            crash_point,
            started_at: at,
            game_kind,
        };
        log::debug!(
            "Created {} {} at {:.2}x from {} logged rounds",
            game_kind,
            round.round_id,
            crash_point,
            recent.len()
        );
        round
    }

    pub fn predict(&self, coefficients: SequenceCoefficients) -> RoundPrediction {
        let recent = self.trailing_crash_points(self.config.predict_window);
        let Some(mean) = stats::mean(&recent) else {
            return RoundPrediction::cold_start();
        };
        let std_dev = stats::sample_std_dev(&recent).unwrap_or(SINGLE_SAMPLE_STD_DEV);
        let volatility = stats::relative_spread(std_dev, mean);

        let predicted_stop = self.adjust(mean, volatility, coefficients);

        let history_boost = (recent.len() as f64 / 100.0).min(0.3) * coefficients.history_gain();
        let accuracy_boost = self.accuracy.rate() * 0.2 * coefficients.pattern_gain();
        let confidence =
            stats::clamp_unit(0.6 * (1.0 - volatility) + history_boost + accuracy_boost);

        let recommended_exit =
            (predicted_stop * self.config.exit_margin).max(self.config.min_multiplier);

        let reasoning = self.reasoning(mean, recent.len(), volatility, predicted_stop, confidence);
        log::trace!(
            "Predicted {:.2}x (exit {:.2}x, confidence {:.3}) from {} rounds",
            predicted_stop,
            recommended_exit,
            confidence,
            recent.len()
        );

        RoundPrediction {
            predicted_stop,
            confidence,
            recommended_exit,
            reasoning,
        }
    }

    fn adjust(&self, mean: f64, volatility: f64, coefficients: SequenceCoefficients) -> f64 {
        let mut prediction = mean;

        let saturation = f64::from(STREAK_SATURATION);
        match self.streak.current() {
            Streak::Favorable(run) if run > STREAK_TRIGGER => {
                let run = f64::from(run.min(STREAK_SATURATION));
                prediction *=
                    1.0 + FAVORABLE_STREAK_UPLIFT * coefficients.streak_gain() * run / saturation;
            }
            Streak::Unfavorable(run) if run > STREAK_TRIGGER => {
                let run = f64::from(run.min(STREAK_SATURATION));
                prediction *=
                    1.0 - UNFAVORABLE_STREAK_CUT * coefficients.streak_gain() * run / saturation;
            }
            _ => {}
        }

        if volatility > HIGH_VOLATILITY {
            // wide swings leave more room in the upper tail
            prediction *= 1.0 + volatility * VOLATILITY_UPLIFT * coefficients.volatility_gain();
        }

        prediction.clamp(self.config.min_multiplier, self.config.max_multiplier)
    }

    fn reasoning(
        &self,
        mean: f64,
        sample_size: usize,
        volatility: f64,
        predicted: f64,
        confidence: f64,
    ) -> Vec<String> {
        let mut reasons = Vec::with_capacity(3);
        reasons.push(format!(
            "Historical average: {mean:.2}x (from {sample_size} rounds)"
        ));

        if volatility > HIGH_VOLATILITY {
            reasons.push(format!(
                "High volatility: ±{volatility:.1}x swings expected"
            ));
        } else {
            reasons.push(format!(
                "Stable pattern: consistent stops around {mean:.2}x"
            ));
        }

        match self.streak.current() {
            Streak::Favorable(run) if run > STREAK_TRIGGER => {
                reasons.push(format!("Hot streak: {run} wins, extended runs likely"));
            }
            Streak::Unfavorable(run) if run > STREAK_TRIGGER => {
                reasons.push(format!("Cold streak: {run} losses, shorter runs expected"));
            }
            _ => {
                reasons.push(format!(
                    "Confidence: {:.0}% in {predicted:.2}x prediction",
                    confidence * 100.0
                ));
            }
        }

        reasons
    }

    /// Appends an observed round and updates streak and tally.
    ///
    /// Every logged round counts toward `total_predictions`. When `prior` is
    /// the prediction issued before this round, it is also scored and the
    /// resulting observation is returned.
    pub fn log_result(
        &mut self,
        crash_point: f64,
        user_exit: Option<f64>,
        user_won: Option<bool>,
        at: OffsetDateTime,
        prior: Option<&RoundPrediction>,
    ) -> Option<Observation> {
        if !crash_point.is_finite() {
            log::warn!("Ignoring non-finite crash point {crash_point}");
            return None;
        }
        let crash_point = crash_point.max(1.0);

        self.history.push(LoggedRound {
            crash_point,
            user_exit,
            user_won,
            logged_at: at,
        });
        // no answer counts as a loss
        self.streak = self
            .streak
            .apply(Outcome::from_favorable(user_won == Some(true)));
        self.accuracy.count_logged();

        let prior = prior?;
        let correct = prior.recommended_exit <= crash_point;
        let close = (prior.predicted_stop - crash_point).abs() <= CLOSE_CALL_RATIO * crash_point;
        self.accuracy.count_verdict(correct, close);
        Some(Observation::new(correct, prior.confidence))
    }

    pub fn volatility_summary(&self) -> VolatilitySummary {
        let recent = self.trailing_crash_points(self.config.summary_window);
        let Some(average) = stats::mean(&recent) else {
            return VolatilitySummary {
                volatility: 0.0,
                average: 0.0,
                std_dev: 0.0,
                trend: Trend::Neutral,
                sample_size: 0,
            };
        };
        let std_dev = stats::sample_std_dev(&recent).unwrap_or(0.0);

        let trend_window = self.config.trend_window;
        let trend = if recent.len() >= trend_window {
            let tail = stats::mean(&recent[recent.len() - trend_window..]).unwrap_or(average);
            match tail.total_cmp(&average) {
                core::cmp::Ordering::Greater => Trend::Increasing,
                core::cmp::Ordering::Less => Trend::Decreasing,
                core::cmp::Ordering::Equal => Trend::Stable,
            }
        } else {
            Trend::Neutral
        };

        VolatilitySummary {
            volatility: stats::relative_spread(std_dev, average),
            average,
            std_dev,
            trend,
            sample_size: recent.len(),
        }
    }
}
