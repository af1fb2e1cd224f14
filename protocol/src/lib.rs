//! Request, response and feed messages exchanged with the prediction service.
//!
//! Core values are rounded here and nowhere else.

use augur_core::stats::round_to;
use augur_core::{
    CellCount, CellPrediction, Coord, Grid, GridId, GridPreset, ObservedOutcome, Recommendation,
    Round, RoundPrediction, Trend, VolatilitySummary,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::format_description::well_known::Rfc3339;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid game identifier {0:?}")]
    InvalidIdentifier(String),
    #[error("Could not format timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
}

pub type Result<T> = core::result::Result<T, ProtocolError>;

fn parse_grid_id(identifier: &str) -> Result<GridId> {
    identifier
        .parse()
        .map_err(|_| ProtocolError::InvalidIdentifier(identifier.to_string()))
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreateGridRequest {
    pub grid_size: Coord,
    #[serde(default)]
    pub num_bombs: Option<CellCount>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridCreated {
    pub game_id: String,
    pub grid_size: Coord,
    pub num_bombs: CellCount,
    pub total_tiles: CellCount,
    pub num_safe: CellCount,
    pub min_bombs: CellCount,
    pub max_bombs: CellCount,
}

impl GridCreated {
    pub fn new(id: GridId, grid: &Grid, preset: &GridPreset) -> Self {
        let (min_bombs, max_bombs) = preset.bomb_range();
        Self {
            game_id: id.to_string(),
            grid_size: grid.size(),
            num_bombs: grid.bomb_count(),
            total_tiles: grid.total_cells(),
            num_safe: grid.safe_cells(),
            min_bombs,
            max_bombs,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TilePrediction {
    pub x: Coord,
    pub y: Coord,
    pub safe_probability: f64,
    pub confidence: f64,
    pub adjacent_safe_count: u8,
    pub recommendation: Recommendation,
}

impl From<&CellPrediction> for TilePrediction {
    fn from(p: &CellPrediction) -> Self {
        Self {
            x: p.x,
            y: p.y,
            safe_probability: round_to(p.safe_probability, 3),
            confidence: round_to(p.confidence, 2),
            adjacent_safe_count: p.adjacent_safe_count,
            recommendation: p.recommendation,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TilePredictions {
    pub game_id: String,
    pub predictions: Vec<TilePrediction>,
    pub reasoning: Vec<String>,
}

impl TilePredictions {
    pub fn new(id: GridId, predictions: &[CellPrediction], reasoning: Vec<String>) -> Self {
        Self {
            game_id: id.to_string(),
            predictions: predictions.iter().map(TilePrediction::from).collect(),
            reasoning,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileOutcomeReport {
    pub game_id: String,
    pub x: Coord,
    pub y: Coord,
    pub is_bomb: bool,
}

impl TryFrom<TileOutcomeReport> for ObservedOutcome {
    type Error = ProtocolError;

    fn try_from(report: TileOutcomeReport) -> Result<Self> {
        Ok(ObservedOutcome::Tile {
            grid_id: parse_grid_id(&report.game_id)?,
            x: report.x,
            y: report.y,
            was_hazard: report.is_bomb,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundStarted {
    pub game_id: String,
    pub crash_point: f64,
    pub started_at: String,
    pub game_type: String,
}

impl TryFrom<&Round> for RoundStarted {
    type Error = ProtocolError;

    fn try_from(round: &Round) -> Result<Self> {
        Ok(Self {
            game_id: format!("{}-{}", round.game_kind, round.round_id.0),
            crash_point: round.crash_point,
            started_at: round.started_at.format(&Rfc3339)?,
            game_type: round.game_kind.to_string(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CrashPrediction {
    pub predicted_crash: f64,
    pub confidence: f64,
    pub recommended_exit: f64,
    pub reasoning: Vec<String>,
}

impl From<&RoundPrediction> for CrashPrediction {
    fn from(p: &RoundPrediction) -> Self {
        Self {
            predicted_crash: round_to(p.predicted_stop, 2),
            confidence: round_to(p.confidence, 3),
            recommended_exit: round_to(p.recommended_exit, 2),
            reasoning: p.reasoning.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundOutcomeReport {
    pub crash_point: f64,
    #[serde(default)]
    pub user_exit: Option<f64>,
    #[serde(default)]
    pub user_won: Option<bool>,
}

impl From<RoundOutcomeReport> for ObservedOutcome {
    fn from(report: RoundOutcomeReport) -> Self {
        ObservedOutcome::Round {
            crash_point: report.crash_point,
            user_exit: report.user_exit,
            user_won: report.user_won,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VolatilityAnalysis {
    pub volatility: f64,
    pub average_crash: f64,
    pub std_dev: f64,
    pub trend: Trend,
    pub games_analyzed: usize,
}

impl From<VolatilitySummary> for VolatilityAnalysis {
    fn from(summary: VolatilitySummary) -> Self {
        Self {
            volatility: round_to(summary.volatility, 3),
            average_crash: round_to(summary.average, 2),
            std_dev: round_to(summary.std_dev, 2),
            trend: summary.trend,
            games_analyzed: summary.sample_size,
        }
    }
}

/// Outcome pushed by a periodic fetcher, keyed by the game it belongs to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub identifier: String,
    pub outcome: FeedOutcome,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedOutcome {
    Tile { x: Coord, y: Coord, is_bomb: bool },
    Round {
        crash_point: f64,
        #[serde(default)]
        user_exit: Option<f64>,
        #[serde(default)]
        user_won: Option<bool>,
    },
}

impl TryFrom<FeedItem> for ObservedOutcome {
    type Error = ProtocolError;

    fn try_from(item: FeedItem) -> Result<Self> {
        Ok(match item.outcome {
            FeedOutcome::Tile { x, y, is_bomb } => ObservedOutcome::Tile {
                grid_id: parse_grid_id(&item.identifier)?,
                x,
                y,
                was_hazard: is_bomb,
            },
            // round identifiers are informational only
            FeedOutcome::Round {
                crash_point,
                user_exit,
                user_won,
            } => ObservedOutcome::Round {
                crash_point,
                user_exit,
                user_won,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use augur_core::{PredictionEngine, TileConfig};
    use serde_json::json;

    #[test]
    fn create_request_defaults_bombs() {
        let req: CreateGridRequest = serde_json::from_value(json!({ "grid_size": 5 })).unwrap();
        assert_eq!(req.num_bombs, None);
    }

    #[test]
    fn grid_created_reports_preset_bounds() {
        let mut engine = PredictionEngine::with_seed(1);
        let (id, grid) = engine.create_grid(6, None).unwrap();
        let config = TileConfig::default();
        let created = GridCreated::new(id, &grid, config.preset(6).unwrap());

        assert_eq!(created.game_id, "grid-1");
        assert_eq!((created.min_bombs, created.max_bombs), (2, 14));
        assert_eq!(created.num_safe, 31);
    }

    #[test]
    fn tile_predictions_are_rounded_on_the_wire() {
        let mut engine = PredictionEngine::with_seed(1);
        let (id, _) = engine.create_grid(6, None).unwrap();
        let predictions = engine.predict_tiles(id).unwrap();
        let response = TilePredictions::new(id, &predictions, vec![]);

        let value = serde_json::to_value(&response.predictions[0]).unwrap();
        assert_eq!(value["safe_probability"], json!(0.861));
        assert_eq!(value["confidence"], json!(0.7));
        assert_eq!(value["recommendation"], json!("SAFE"));
    }

    #[test]
    fn tile_report_needs_grid_identifier() {
        let report = TileOutcomeReport {
            game_id: "grid-3".to_string(),
            x: 1,
            y: 2,
            is_bomb: true,
        };
        assert_eq!(
            ObservedOutcome::try_from(report).unwrap(),
            ObservedOutcome::Tile {
                grid_id: GridId(3),
                x: 1,
                y: 2,
                was_hazard: true
            }
        );

        let bad = TileOutcomeReport {
            game_id: "mines_5_abc".to_string(),
            x: 0,
            y: 0,
            is_bomb: false,
        };
        assert!(matches!(
            ObservedOutcome::try_from(bad),
            Err(ProtocolError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn feed_items_parse_from_json() {
        let item: FeedItem = serde_json::from_value(json!({
            "identifier": "round-7",
            "outcome": { "kind": "round", "crash_point": 2.4, "user_won": true }
        }))
        .unwrap();

        let mut engine = PredictionEngine::with_seed(1);
        engine.ingest(item.try_into().unwrap()).unwrap();
        assert_eq!(engine.sequence().streak().consecutive_favorable, 1);
    }

    #[test]
    fn cold_start_prediction_on_the_wire() {
        let mut engine = PredictionEngine::with_seed(1);
        let wire = CrashPrediction::from(&engine.predict_round());
        assert_eq!(
            (wire.predicted_crash, wire.confidence, wire.recommended_exit),
            (3.0, 0.3, 2.0)
        );
    }

    #[test]
    fn volatility_analysis_rounds_fields() {
        let mut engine = PredictionEngine::with_seed(1);
        for point in [2.0, 2.0, 4.0] {
            engine.record_round_outcome(point, None, None);
        }
        let wire = VolatilityAnalysis::from(engine.volatility_summary());
        assert_eq!(wire.average_crash, 2.67);
        assert_eq!(wire.std_dev, 1.15);
        assert_eq!(wire.volatility, 0.433);
        assert_eq!(wire.games_analyzed, 3);

        let value = serde_json::to_value(&wire).unwrap();
        assert_eq!(value["trend"], json!("stable"));
    }

    #[test]
    fn round_started_formats_timestamp() {
        let mut engine = PredictionEngine::with_seed(1);
        let round = engine.create_round();
        let wire = RoundStarted::try_from(&round).unwrap();
        assert_eq!(wire.game_id, "crash-1");
        assert_eq!(wire.game_type, "crash");
        assert!(wire.started_at.contains('T'));
    }
}
