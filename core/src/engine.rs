use hashbrown::HashMap;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::*;

/// An outcome reported by something other than the player, for example a
/// periodic result fetcher.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ObservedOutcome {
    Tile {
        grid_id: GridId,
        x: Coord,
        y: Coord,
        was_hazard: bool,
    },
    Round {
        crash_point: f64,
        user_exit: Option<f64>,
        user_won: Option<bool>,
    },
}

#[derive(Clone, Debug)]
struct TileGame {
    state: GridState,
    layout: HazardLayout,
}

/// Entry point for the service layer.
///
/// Owns every open grid, the round history and both coefficient stores.
/// Calls take `&mut self`; callers sharing one engine across threads wrap it
/// in a mutex so that each outcome's read-then-update of the coefficients is
/// serialized.
#[derive(Clone, Debug)]
pub struct PredictionEngine {
    rng: SmallRng,
    tiles: TilePredictor,
    tile_weights: AdaptiveWeightStore<TileCoefficients>,
    tile_streak: StreakState,
    tile_history: OutcomeLog<RevealedCell>,
    games: HashMap<GridId, TileGame>,
    grids_created: u64,
    sequence: SequencePredictor,
    sequence_weights: AdaptiveWeightStore<SequenceCoefficients>,
    pending_round: Option<RoundPrediction>,
}

impl PredictionEngine {
    pub fn new(config: EngineConfig, seed: u64) -> Result<Self> {
        config.validate()?;
        let EngineConfig {
            tile,
            sequence,
            adaptation,
            history_capacity,
        } = config;

        let tiles = TilePredictor::new(tile)?;
        let sequence = SequencePredictor::new(sequence, history_capacity)?;
        Ok(Self::build(tiles, sequence, adaptation, history_capacity, seed))
    }

    /// Engine with the default configuration.
    pub fn with_seed(seed: u64) -> Self {
        Self::build(
            TilePredictor::default(),
            SequencePredictor::default(),
            AdaptationConfig::default(),
            HISTORY_CAPACITY,
            seed,
        )
    }

    fn build(
        tiles: TilePredictor,
        sequence: SequencePredictor,
        adaptation: AdaptationConfig,
        history_capacity: usize,
        seed: u64,
    ) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
            tiles,
            tile_weights: AdaptiveWeightStore::new(
                TileCoefficients::default(),
                adaptation.clone(),
                history_capacity,
            ),
            tile_streak: StreakState::default(),
            tile_history: OutcomeLog::with_capacity(history_capacity),
            games: HashMap::new(),
            grids_created: 0,
            sequence,
            sequence_weights: AdaptiveWeightStore::new(
                SequenceCoefficients::default(),
                adaptation,
                history_capacity,
            ),
            pending_round: None,
        }
    }

    pub fn tile_coefficients(&self) -> TileCoefficients {
        self.tile_weights.coefficients()
    }

    pub fn sequence_coefficients(&self) -> SequenceCoefficients {
        self.sequence_weights.coefficients()
    }

    pub fn tile_streak(&self) -> StreakState {
        self.tile_streak
    }

    /// Most recent reveals across every grid, oldest first.
    pub fn recent_tile_outcomes(&self) -> impl Iterator<Item = &RevealedCell> {
        self.tile_history.iter()
    }

    pub fn sequence(&self) -> &SequencePredictor {
        &self.sequence
    }

    /// Validates the request and places hazards for a fresh grid.
    pub fn create_grid(
        &mut self,
        size: Coord,
        bomb_count: Option<CellCount>,
    ) -> Result<(GridId, Grid)> {
        let grid = self.tiles.create(size, bomb_count)?;
        let layout = HazardLayout::generate(&grid, &mut self.rng);

        self.grids_created += 1;
        let id = GridId(self.grids_created);
        self.games.insert(
            id,
            TileGame {
                state: GridState::new(grid),
                layout,
            },
        );
        log::debug!("Opened {id}");
        Ok((id, grid))
    }

    fn game(&self, id: GridId) -> Result<&TileGame> {
        self.games.get(&id).ok_or(EngineError::UnknownGrid(id))
    }

    pub fn grid_state(&self, id: GridId) -> Result<&GridState> {
        Ok(&self.game(id)?.state)
    }

    pub fn grid_stats(&self, id: GridId) -> Result<GridStats> {
        Ok(self.game(id)?.state.stats())
    }

    pub fn predict_tiles(&self, id: GridId) -> Result<Vec<CellPrediction>> {
        let state = &self.game(id)?.state;
        Ok(self.tiles.predict(state, self.tile_coefficients()))
    }

    pub fn tile_reasoning(&self, id: GridId) -> Result<Vec<String>> {
        let state = &self.game(id)?.state;
        Ok(self.tiles.reasoning(state, &self.tile_streak))
    }

    /// Records an externally observed reveal and feeds the tile weight store.
    pub fn record_tile_outcome(
        &mut self,
        id: GridId,
        x: Coord,
        y: Coord,
        was_hazard: bool,
    ) -> Result<TileCoefficients> {
        let coefficients = self.tile_weights.coefficients();
        let game = self
            .games
            .get_mut(&id)
            .ok_or(EngineError::UnknownGrid(id))?;

        let observation = self.tiles.record_outcome(
            &mut game.state,
            (x, y),
            was_hazard,
            OffsetDateTime::now_utc(),
            coefficients,
        )?;
        if let Some(cell) = game.state.revealed().last() {
            self.tile_history.push(*cell);
        }

        self.tile_streak = self.tile_streak.apply(Outcome::from_favorable(!was_hazard));
        Ok(self.tile_weights.observe(observation))
    }

    /// Reveals a cell against the grid's own hazard layout.
    pub fn reveal_tile(&mut self, id: GridId, x: Coord, y: Coord) -> Result<bool> {
        let game = self.game(id)?;
        let coords = game.state.grid().validate_coords((x, y))?;
        let was_hazard = game.layout.contains_hazard(coords);
        self.record_tile_outcome(id, x, y, was_hazard)?;
        Ok(was_hazard)
    }

    /// Drops a finished grid, handing back its final state.
    pub fn close_grid(&mut self, id: GridId) -> Result<GridState> {
        let game = self.games.remove(&id).ok_or(EngineError::UnknownGrid(id))?;
        log::debug!("Closed {id} after {} reveals", game.state.revealed().len());
        Ok(game.state)
    }

    pub fn create_round(&mut self) -> Round {
        self.sequence
            .create_round(&mut self.rng, OffsetDateTime::now_utc())
    }

    /// Predicts the next round. The prediction is kept so the next logged
    /// outcome can be scored against it.
    pub fn predict_round(&mut self) -> RoundPrediction {
        let prediction = self.sequence.predict(self.sequence_coefficients());
        self.pending_round = Some(prediction.clone());
        prediction
    }

    pub fn record_round_outcome(
        &mut self,
        crash_point: f64,
        user_exit: Option<f64>,
        user_won: Option<bool>,
    ) -> SequenceCoefficients {
        if !crash_point.is_finite() {
            log::warn!("Ignoring non-finite crash point {crash_point}, prediction kept");
            return self.sequence_weights.coefficients();
        }
        let prior = self.pending_round.take();
        let observation = self.sequence.log_result(
            crash_point,
            user_exit,
            user_won,
            OffsetDateTime::now_utc(),
            prior.as_ref(),
        );
        match observation {
            Some(observation) => self.sequence_weights.observe(observation),
            None => self.sequence_weights.coefficients(),
        }
    }

    pub fn volatility_summary(&self) -> VolatilitySummary {
        self.sequence.volatility_summary()
    }

    /// Routes a fed outcome through the same paths a player's outcome takes.
    pub fn ingest(&mut self, outcome: ObservedOutcome) -> Result<()> {
        match outcome {
            ObservedOutcome::Tile {
                grid_id,
                x,
                y,
                was_hazard,
            } => {
                self.record_tile_outcome(grid_id, x, y, was_hazard)?;
            }
            ObservedOutcome::Round {
                crash_point,
                user_exit,
                user_won,
            } => {
                self.record_round_outcome(crash_point, user_exit, user_won);
            }
        }
        Ok(())
    }
}
