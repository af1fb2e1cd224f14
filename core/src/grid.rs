use core::fmt;
use core::str::FromStr;

use ndarray::Array2;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridId(pub u64);

impl fmt::Display for GridId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "grid-{}", self.0)
    }
}

impl FromStr for GridId {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        s.strip_prefix("grid-")
            .unwrap_or(s)
            .parse()
            .map(GridId)
            .map_err(|_| ConfigError::Malformed(format!("not a grid id: {s:?}")).into())
    }
}

/// Square grid dimensions and hazard count. Immutable once created.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "GridRecord")]
pub struct Grid {
    size: Coord,
    bomb_count: CellCount,
}

/// Stored form of a [`Grid`], checked before it becomes one.
#[derive(Deserialize)]
struct GridRecord {
    size: Coord,
    bomb_count: CellCount,
}

impl TryFrom<GridRecord> for Grid {
    type Error = ConfigError;

    fn try_from(record: GridRecord) -> core::result::Result<Self, ConfigError> {
        let GridRecord { size, bomb_count } = record;
        if size < 2 {
            return Err(ConfigError::UnsupportedGridSize { size });
        }
        let max = square(size) - 1;
        if !(1..=max).contains(&bomb_count) {
            return Err(ConfigError::BombCountOutOfRange {
                bombs: bomb_count,
                min: 1,
                max,
            });
        }
        Ok(Self { size, bomb_count })
    }
}

impl Grid {
    /// Validates `size` against the configured presets. An omitted bomb
    /// count falls back to the preset's default.
    pub fn new(size: Coord, bomb_count: Option<CellCount>, config: &TileConfig) -> Result<Self> {
        let preset = config.preset(size)?;
        let bomb_count = preset.check_bombs(bomb_count.unwrap_or(preset.default_bombs))?;
        Ok(Self { size, bomb_count })
    }

    pub const fn size(&self) -> Coord {
        self.size
    }

    pub const fn bomb_count(&self) -> CellCount {
        self.bomb_count
    }

    pub const fn total_cells(&self) -> CellCount {
        square(self.size)
    }

    pub const fn safe_cells(&self) -> CellCount {
        self.total_cells().saturating_sub(self.bomb_count)
    }

    pub fn validate_coords(&self, coords: Coord2) -> Result<Coord2> {
        if coords.0 < self.size && coords.1 < self.size {
            Ok(coords)
        } else {
            Err(EngineError::InvalidCoords)
        }
    }
}

/// Hidden hazard positions of one grid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HazardLayout {
    mask: Array2<bool>,
    count: CellCount,
}

impl HazardLayout {
    /// Places `grid.bomb_count()` hazards uniformly without replacement.
    pub fn generate<R: Rng>(grid: &Grid, rng: &mut R) -> Self {
        let side = usize::from(grid.size());
        let mut mask: Array2<bool> = Array2::default([side, side]);
        let mut free_cells = grid.total_cells();
        let mut placed: CellCount = 0;

        while placed < grid.bomb_count() && free_cells > 0 {
            // index among the cells that are still free
            let mut place = rng.random_range(0..free_cells);
            for cell in mask.iter_mut().filter(|cell| !**cell) {
                if place == 0 {
                    *cell = true;
                    break;
                }
                place -= 1;
            }
            placed += 1;
            free_cells -= 1;
        }

        let count = Self::count_hazards(&mask);
        if count != grid.bomb_count() {
            log::warn!(
                "Hazard placement mismatch, actual: {}, requested: {}",
                count,
                grid.bomb_count()
            );
        }
        Self { mask, count }
    }

    pub fn from_coords(grid: &Grid, hazards: &[Coord2]) -> Result<Self> {
        let side = usize::from(grid.size());
        let mut mask: Array2<bool> = Array2::default([side, side]);
        for &coords in hazards {
            mask[grid.validate_coords(coords)?.to_nd_index()] = true;
        }
        let count = Self::count_hazards(&mask);
        Ok(Self { mask, count })
    }

    fn count_hazards(mask: &Array2<bool>) -> CellCount {
        let count = mask.iter().filter(|&&hazard| hazard).count();
        CellCount::try_from(count).unwrap_or(CellCount::MAX)
    }

    pub fn hazard_count(&self) -> CellCount {
        self.count
    }

    pub fn contains_hazard(&self, coords: Coord2) -> bool {
        self.mask
            .get(coords.to_nd_index())
            .copied()
            .unwrap_or(false)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RevealedCell {
    pub x: Coord,
    pub y: Coord,
    pub is_hazard: bool,
    pub revealed_at: OffsetDateTime,
}

impl RevealedCell {
    pub const fn coords(&self) -> Coord2 {
        (self.x, self.y)
    }
}

/// One grid plus everything revealed on it so far.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridState {
    grid: Grid,
    revealed: Vec<RevealedCell>,
    board: Array2<Option<bool>>,
}

impl GridState {
    pub fn new(grid: Grid) -> Self {
        let side = usize::from(grid.size());
        Self {
            grid,
            revealed: Vec::new(),
            board: Array2::default([side, side]),
        }
    }

    /// Rebuilds state from stored reveal rows, rejecting duplicates.
    pub fn from_revealed(grid: Grid, revealed: &[RevealedCell]) -> Result<Self> {
        let mut state = Self::new(grid);
        for cell in revealed {
            state.record(cell.coords(), cell.is_hazard, cell.revealed_at)?;
        }
        Ok(state)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Reveals in the order they happened.
    pub fn revealed(&self) -> &[RevealedCell] {
        &self.revealed
    }

    pub fn is_revealed(&self, coords: Coord2) -> bool {
        self.hazard_at(coords).is_some()
    }

    /// `Some(is_hazard)` for revealed cells.
    pub fn hazard_at(&self, coords: Coord2) -> Option<bool> {
        self.board.get(coords.to_nd_index()).copied().flatten()
    }

    pub fn record(
        &mut self,
        coords: Coord2,
        is_hazard: bool,
        at: OffsetDateTime,
    ) -> Result<RevealedCell> {
        let coords = self.grid.validate_coords(coords)?;
        if self.is_revealed(coords) {
            return Err(EngineError::AlreadyRevealed);
        }

        self.board[coords.to_nd_index()] = Some(is_hazard);
        let cell = RevealedCell {
            x: coords.0,
            y: coords.1,
            is_hazard,
            revealed_at: at,
        };
        self.revealed.push(cell);
        Ok(cell)
    }

    pub fn hazards_revealed(&self) -> CellCount {
        self.count_revealed(true)
    }

    pub fn safe_revealed(&self) -> CellCount {
        self.count_revealed(false)
    }

    fn count_revealed(&self, is_hazard: bool) -> CellCount {
        let count = self
            .revealed
            .iter()
            .filter(|cell| cell.is_hazard == is_hazard)
            .count();
        CellCount::try_from(count).unwrap_or(CellCount::MAX)
    }

    pub fn unrevealed_count(&self) -> CellCount {
        let revealed = CellCount::try_from(self.revealed.len()).unwrap_or(CellCount::MAX);
        self.grid.total_cells().saturating_sub(revealed)
    }

    pub fn remaining_hazards(&self) -> CellCount {
        self.grid.bomb_count().saturating_sub(self.hazards_revealed())
    }

    /// `(revealed-and-safe neighbors, all in-bounds neighbors)`.
    pub fn favorable_neighbors(&self, coords: Coord2) -> (u8, u8) {
        let mut favorable = 0;
        let mut total = 0;
        for (_, outcome) in self.board.neighbor_cells(coords) {
            total += 1;
            if outcome == Some(false) {
                favorable += 1;
            }
        }
        (favorable, total)
    }

    pub fn unrevealed(&self) -> impl Iterator<Item = Coord2> + '_ {
        cells(self.grid.size()).filter(|&coords| !self.is_revealed(coords))
    }

    pub fn stats(&self) -> GridStats {
        let total_clicks = CellCount::try_from(self.revealed.len()).unwrap_or(CellCount::MAX);
        let safe_clicks = self.safe_revealed();
        let hazards_hit = self.hazards_revealed();
        let win_percentage = if total_clicks == 0 {
            0.0
        } else {
            f64::from(safe_clicks) / f64::from(total_clicks) * 100.0
        };
        GridStats {
            total_clicks,
            safe_clicks,
            hazards_hit,
            win_percentage,
            streak: safe_clicks,
            hazards_remaining: self.remaining_hazards(),
            remaining_safe: self.grid.safe_cells().saturating_sub(safe_clicks),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridStats {
    pub total_clicks: CellCount,
    pub safe_clicks: CellCount,
    pub hazards_hit: CellCount,
    pub win_percentage: f64,
    /// Safe reveals so far, hazards do not reset it.
    pub streak: CellCount,
    pub hazards_remaining: CellCount,
    pub remaining_safe: CellCount,
}
