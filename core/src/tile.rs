use core::cmp::Ordering;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::*;

/// Extra confidence granted per unit of adjacency bonus.
const ADJACENCY_CONFIDENCE_GAIN: f64 = 0.2;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Recommendation {
    Safe,
    Neutral,
    Risky,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellPrediction {
    pub x: Coord,
    pub y: Coord,
    pub safe_probability: f64,
    pub confidence: f64,
    pub adjacent_safe_count: u8,
    pub recommendation: Recommendation,
}

impl CellPrediction {
    pub const fn coords(&self) -> Coord2 {
        (self.x, self.y)
    }

    /// Highest safety first, then row-major position.
    fn rank(&self, other: &Self) -> Ordering {
        other
            .safe_probability
            .total_cmp(&self.safe_probability)
            .then_with(|| row_major(self.coords()).cmp(&row_major(other.coords())))
    }
}

/// Scores unrevealed cells from the remaining-hazard base rate plus an
/// adjacency bonus for revealed safe neighbors.
#[derive(Clone, Debug, PartialEq)]
pub struct TilePredictor {
    config: TileConfig,
}

impl Default for TilePredictor {
    fn default() -> Self {
        Self {
            config: TileConfig::default(),
        }
    }
}

impl TilePredictor {
    pub fn new(config: TileConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TileConfig {
        &self.config
    }

    pub fn create(&self, size: Coord, bomb_count: Option<CellCount>) -> Result<Grid> {
        let grid = Grid::new(size, bomb_count, &self.config)?;
        log::debug!(
            "Created {}x{} grid with {} hazards",
            grid.size(),
            grid.size(),
            grid.bomb_count()
        );
        Ok(grid)
    }

    /// Pool-without-replacement chance that an unrevealed cell is safe.
    pub fn base_safe_probability(&self, state: &GridState) -> f64 {
        let unrevealed = state.unrevealed_count();
        if unrevealed == 0 {
            return self.config.neutral_probability;
        }
        let remaining_hazards = state.remaining_hazards().min(unrevealed);
        f64::from(unrevealed - remaining_hazards) / f64::from(unrevealed)
    }

    pub fn recommend(&self, safe_probability: f64) -> Recommendation {
        if safe_probability > self.config.safe_threshold {
            Recommendation::Safe
        } else if safe_probability < self.config.risky_threshold {
            Recommendation::Risky
        } else {
            Recommendation::Neutral
        }
    }

    /// Scores every unrevealed cell, safest first.
    pub fn predict(
        &self,
        state: &GridState,
        coefficients: TileCoefficients,
    ) -> Vec<CellPrediction> {
        let base = self.base_safe_probability(state);
        let mut predictions: Vec<_> = state
            .unrevealed()
            .map(|coords| self.score(state, coords, base, coefficients))
            .collect();
        predictions.sort_by(CellPrediction::rank);

        log::trace!(
            "Scored {} cells, base safety {:.3}",
            predictions.len(),
            base
        );
        predictions
    }

    /// Scores a single unrevealed cell.
    pub fn predict_cell(
        &self,
        state: &GridState,
        coords: Coord2,
        coefficients: TileCoefficients,
    ) -> Result<CellPrediction> {
        let coords = state.grid().validate_coords(coords)?;
        if state.is_revealed(coords) {
            return Err(EngineError::AlreadyRevealed);
        }
        let base = self.base_safe_probability(state);
        Ok(self.score(state, coords, base, coefficients))
    }

    fn score(
        &self,
        state: &GridState,
        coords: Coord2,
        base: f64,
        coefficients: TileCoefficients,
    ) -> CellPrediction {
        let (favorable, total) = state.favorable_neighbors(coords);
        let adjacency_bonus = if total > 0 {
            f64::from(favorable) / f64::from(total) * coefficients.adjacency_weight
        } else {
            0.0
        };

        let safe_probability = (base + adjacency_bonus)
            .clamp(self.config.probability_floor, self.config.probability_ceiling);
        let confidence = stats::clamp_unit(
            coefficients.base_confidence + adjacency_bonus * ADJACENCY_CONFIDENCE_GAIN,
        );

        CellPrediction {
            x: coords.0,
            y: coords.1,
            safe_probability,
            confidence,
            adjacent_safe_count: favorable,
            recommendation: self.recommend(safe_probability),
        }
    }

    /// Scores the cell with the current coefficients, then records the reveal.
    /// The returned observation says whether the score pointed the right way.
    pub fn record_outcome(
        &self,
        state: &mut GridState,
        coords: Coord2,
        was_hazard: bool,
        at: OffsetDateTime,
        coefficients: TileCoefficients,
    ) -> Result<Observation> {
        let prediction = self.predict_cell(state, coords, coefficients)?;
        state.record(coords, was_hazard, at)?;

        let predicted_safe = prediction.safe_probability >= 0.5;
        let observation =
            Observation::new(predicted_safe != was_hazard, prediction.safe_probability);
        log::trace!(
            "({}, {}) hazard={} scored {:.3}, correct={}",
            coords.0,
            coords.1,
            was_hazard,
            prediction.safe_probability,
            observation.correct
        );
        Ok(observation)
    }

    /// Up to three human-readable notes on what drives the current scores.
    pub fn reasoning(&self, state: &GridState, streak: &StreakState) -> Vec<String> {
        let mut reasons = Vec::with_capacity(3);

        let safe = state.safe_revealed();
        if safe > 0 {
            reasons.push(format!("Adjacency evidence: {safe} safe cells revealed so far"));
        }

        match streak.current() {
            Streak::Favorable(run) => {
                reasons.push(format!("Hot streak: {run} consecutive safe reveals"));
            }
            Streak::Unfavorable(run) => {
                reasons.push(format!("Cold streak: {run} hazards in a row, caution recommended"));
            }
            Streak::None => {}
        }

        let grid = state.grid();
        let hazard_share = f64::from(grid.bomb_count()) / f64::from(grid.total_cells());
        reasons.push(format!(
            "Hazard frequency: ~{:.0}% hazards ({:.0}% safe)",
            hazard_share * 100.0,
            (1.0 - hazard_share) * 100.0
        ));

        reasons.truncate(3);
        reasons
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: OffsetDateTime = OffsetDateTime::UNIX_EPOCH;

    fn state(size: Coord, bombs: CellCount) -> GridState {
        let grid = TilePredictor::default().create(size, Some(bombs)).unwrap();
        GridState::new(grid)
    }

    fn by_coords(predictions: &[CellPrediction], coords: Coord2) -> CellPrediction {
        *predictions.iter().find(|p| p.coords() == coords).unwrap()
    }

    #[test]
    fn fresh_grid_scores_exact_base_rate() {
        let predictor = TilePredictor::default();
        let predictions = predictor.predict(&state(5, 3), TileCoefficients::default());

        assert_eq!(predictions.len(), 25);
        for p in &predictions {
            assert_eq!(p.safe_probability, 22.0 / 25.0);
            assert_eq!(p.confidence, 0.7);
            assert_eq!(p.adjacent_safe_count, 0);
            assert_eq!(p.recommendation, Recommendation::Safe);
        }
    }

    #[test]
    fn ties_break_row_major() {
        let predictions =
            TilePredictor::default().predict(&state(5, 3), TileCoefficients::default());
        let order: Vec<_> = predictions.iter().take(6).map(|p| p.coords()).collect();
        assert_eq!(order, vec![(0, 0), (1, 0), (2, 0), (3, 0), (4, 0), (0, 1)]);
    }

    #[test]
    fn revealed_cells_are_never_scored() {
        let predictor = TilePredictor::default();
        let mut state = state(6, 5);
        state.record((0, 0), false, T0).unwrap();
        state.record((3, 3), true, T0).unwrap();

        let predictions = predictor.predict(&state, TileCoefficients::default());
        assert_eq!(predictions.len(), 34);
        assert!(predictions.iter().all(|p| !state.is_revealed(p.coords())));
    }

    #[test]
    fn safe_neighbor_adds_adjacency_bonus() {
        let predictor = TilePredictor::default();
        let coeffs = TileCoefficients::default();
        let mut state = state(5, 3);
        state.record((2, 2), false, T0).unwrap();

        let predictions = predictor.predict(&state, coeffs);
        let base = 21.0 / 24.0;
        let neighbor = by_coords(&predictions, (1, 1));
        let far = by_coords(&predictions, (4, 4));

        assert_eq!(far.safe_probability, base);
        assert_eq!(neighbor.adjacent_safe_count, 1);
        assert!((neighbor.safe_probability - (base + 0.15 / 8.0)).abs() < 1e-12);
        assert!(neighbor.confidence > far.confidence);
        assert_eq!(predictions[0].coords(), (1, 1));
    }

    #[test]
    fn probabilities_stay_inside_clamp() {
        let predictor = TilePredictor::default();
        let coeffs = TileCoefficients {
            adjacency_weight: 0.25,
            base_confidence: 0.85,
        };
        let mut state = state(5, 1);
        for coords in [(0, 0), (1, 0), (0, 1)] {
            state.record(coords, false, T0).unwrap();
        }

        for p in predictor.predict(&state, coeffs) {
            assert!((0.05..=0.95).contains(&p.safe_probability));
            assert!((0.0..=1.0).contains(&p.confidence));
        }
        assert_eq!(by_coords(&predictor.predict(&state, coeffs), (1, 1)).safe_probability, 0.95);
    }

    #[test]
    fn hazard_heavy_grid_is_risky() {
        let predictor = TilePredictor::default();
        let mut state = state(5, 10);
        for x in 0..5 {
            state.record((x, 0), false, T0).unwrap();
        }
        // 10 hazards in 20 cells
        let far = by_coords(&predictor.predict(&state, TileCoefficients::default()), (4, 4));
        assert_eq!(far.safe_probability, 0.5);
        assert_eq!(far.recommendation, Recommendation::Neutral);

        for x in 0..5 {
            state.record((x, 1), false, T0).unwrap();
        }
        let far = by_coords(&predictor.predict(&state, TileCoefficients::default()), (4, 4));
        assert_eq!(far.safe_probability, 1.0 / 3.0);
        assert_eq!(far.recommendation, Recommendation::Risky);
    }

    #[test]
    fn repeated_predictions_are_identical() {
        let predictor = TilePredictor::default();
        let mut state = state(8, 8);
        state.record((3, 4), false, T0).unwrap();
        state.record((5, 1), true, T0).unwrap();

        let coeffs = TileCoefficients::default();
        assert_eq!(predictor.predict(&state, coeffs), predictor.predict(&state, coeffs));
    }

    #[test]
    fn fully_revealed_grid_has_neutral_base() {
        let predictor = TilePredictor::default();
        let mut state = state(5, 1);
        for coords in cells(5) {
            state.record(coords, coords == (0, 0), T0).unwrap();
        }
        assert_eq!(predictor.base_safe_probability(&state), 0.5);
        assert!(predictor.predict(&state, TileCoefficients::default()).is_empty());
    }

    #[test]
    fn record_outcome_scores_before_revealing() {
        let predictor = TilePredictor::default();
        let coeffs = TileCoefficients::default();
        let mut state = state(5, 3);

        let safe = predictor.record_outcome(&mut state, (0, 0), false, T0, coeffs).unwrap();
        assert!(safe.correct);
        assert_eq!(safe.predicted_probability, 0.88);

        let hazard = predictor.record_outcome(&mut state, (4, 4), true, T0, coeffs).unwrap();
        assert!(!hazard.correct);

        assert_eq!(
            predictor.record_outcome(&mut state, (0, 0), false, T0, coeffs),
            Err(EngineError::AlreadyRevealed)
        );
        assert_eq!(state.revealed().len(), 2);
    }

    #[test]
    fn reasoning_lists_streak_and_frequency() {
        let predictor = TilePredictor::default();
        let mut state = state(5, 5);
        let fresh = predictor.reasoning(&state, &StreakState::default());
        assert_eq!(fresh, vec!["Hazard frequency: ~20% hazards (80% safe)".to_string()]);

        state.record((0, 0), false, T0).unwrap();
        let streak = StreakState::default().apply(Outcome::Favorable);
        let reasons = predictor.reasoning(&state, &streak);
        assert_eq!(reasons.len(), 3);
        assert!(reasons[0].starts_with("Adjacency evidence: 1"));
        assert!(reasons[1].starts_with("Hot streak: 1"));
    }

    #[test]
    fn unchecked_config_is_rejected() {
        let no_presets = TileConfig {
            presets: Vec::new(),
            ..TileConfig::default()
        };
        assert!(TilePredictor::new(no_presets).unwrap_err().is_invalid_configuration());

        let inverted = TileConfig {
            probability_floor: 0.9,
            probability_ceiling: 0.1,
            ..TileConfig::default()
        };
        assert!(TilePredictor::new(inverted).is_err());
        assert_eq!(
            TilePredictor::new(TileConfig::default()),
            Ok(TilePredictor::default())
        );
    }
}
