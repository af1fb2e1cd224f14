use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Favorable,
    Unfavorable,
}

impl Outcome {
    pub const fn from_favorable(favorable: bool) -> Self {
        if favorable {
            Self::Favorable
        } else {
            Self::Unfavorable
        }
    }

    pub const fn is_favorable(self) -> bool {
        matches!(self, Self::Favorable)
    }
}

/// The run the latest outcomes belong to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Streak {
    None,
    Favorable(u32),
    Unfavorable(u32),
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakState {
    pub consecutive_favorable: u32,
    pub consecutive_unfavorable: u32,
    pub max_favorable_streak: u32,
    pub max_unfavorable_streak: u32,
}

impl StreakState {
    /// Folds one outcome into the state. The opposite run resets to zero.
    #[must_use]
    pub fn apply(self, outcome: Outcome) -> Self {
        match outcome {
            Outcome::Favorable => {
                let run = self.consecutive_favorable.saturating_add(1);
                Self {
                    consecutive_favorable: run,
                    consecutive_unfavorable: 0,
                    max_favorable_streak: self.max_favorable_streak.max(run),
                    ..self
                }
            }
            Outcome::Unfavorable => {
                let run = self.consecutive_unfavorable.saturating_add(1);
                Self {
                    consecutive_favorable: 0,
                    consecutive_unfavorable: run,
                    max_unfavorable_streak: self.max_unfavorable_streak.max(run),
                    ..self
                }
            }
        }
    }

    pub fn current(&self) -> Streak {
        if self.consecutive_favorable > 0 {
            Streak::Favorable(self.consecutive_favorable)
        } else if self.consecutive_unfavorable > 0 {
            Streak::Unfavorable(self.consecutive_unfavorable)
        } else {
            Streak::None
        }
    }
}

impl FromIterator<Outcome> for StreakState {
    fn from_iter<I: IntoIterator<Item = Outcome>>(outcomes: I) -> Self {
        outcomes
            .into_iter()
            .fold(Self::default(), |state, outcome| state.apply(outcome))
    }
}

/// Running prediction tally. Counters only ever grow.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccuracyTally {
    pub correct_direction: u64,
    pub total_predictions: u64,
    pub close_calls: u64,
}

impl AccuracyTally {
    /// Counts a logged round, whether or not a prediction preceded it.
    pub fn count_logged(&mut self) {
        self.total_predictions = self.total_predictions.saturating_add(1);
    }

    pub fn count_verdict(&mut self, correct: bool, close: bool) {
        if correct {
            self.correct_direction = self.correct_direction.saturating_add(1);
        }
        if close {
            self.close_calls = self.close_calls.saturating_add(1);
        }
    }

    /// `correct_direction / total_predictions`, zero before anything is logged.
    pub fn rate(&self) -> f64 {
        if self.total_predictions == 0 {
            0.0
        } else {
            self.correct_direction as f64 / self.total_predictions as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Outcome::*;

    #[test]
    fn runs_reset_on_break() {
        let state: StreakState = [Favorable, Favorable, Favorable, Unfavorable]
            .into_iter()
            .collect();

        assert_eq!(state.consecutive_favorable, 0);
        assert_eq!(state.consecutive_unfavorable, 1);
        assert_eq!(state.max_favorable_streak, 3);
        assert_eq!(state.max_unfavorable_streak, 1);
        assert_eq!(state.current(), Streak::Unfavorable(1));
    }

    #[test]
    fn max_streak_survives_later_shorter_runs() {
        let state: StreakState = [Unfavorable, Unfavorable, Favorable, Unfavorable]
            .into_iter()
            .collect();

        assert_eq!(state.max_unfavorable_streak, 2);
        assert_eq!(state.consecutive_unfavorable, 1);
    }

    #[test]
    fn fresh_state_has_no_streak() {
        assert_eq!(StreakState::default().current(), Streak::None);
    }

    #[test]
    fn tally_rate_is_zero_until_logged() {
        let mut tally = AccuracyTally::default();
        assert_eq!(tally.rate(), 0.0);

        tally.count_logged();
        tally.count_logged();
        tally.count_verdict(true, false);
        assert_eq!(tally.rate(), 0.5);
        assert_eq!(tally.close_calls, 0);
    }
}
