use thiserror::Error;

use crate::{CellCount, Coord, GridId};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unsupported grid size {size}")]
    UnsupportedGridSize { size: Coord },
    #[error("Bombs must be between {min} and {max}, got {bombs}")]
    BombCountOutOfRange {
        bombs: CellCount,
        min: CellCount,
        max: CellCount,
    },
    #[error("Malformed configuration: {0}")]
    Malformed(String),
    #[error("Inconsistent configuration: {0}")]
    Inconsistent(&'static str),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),
    #[error("Invalid coordinates")]
    InvalidCoords,
    #[error("Cell was already revealed")]
    AlreadyRevealed,
    #[error("Unknown grid {0}")]
    UnknownGrid(GridId),
}

impl EngineError {
    pub const fn is_invalid_configuration(&self) -> bool {
        matches!(self, Self::InvalidConfiguration(_))
    }
}

pub type Result<T> = core::result::Result<T, EngineError>;
