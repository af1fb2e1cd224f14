//! Adaptive safety scoring for tile-reveal and multiplier-growth games.
//!
//! [`TilePredictor`] scores unrevealed grid cells, [`SequencePredictor`]
//! estimates where a growth round stops, and [`AdaptiveWeightStore`] nudges
//! the coefficients both use as outcomes come in. [`PredictionEngine`] ties
//! them together for a service layer.

pub use config::*;
pub use engine::*;
pub use error::*;
pub use grid::*;
pub use history::*;
pub use sequence::*;
pub use streak::*;
pub use tile::*;
pub use types::*;
pub use weights::*;

pub mod stats;

mod config;
mod engine;
mod error;
mod grid;
mod history;
mod sequence;
mod streak;
mod tile;
mod types;
mod weights;
