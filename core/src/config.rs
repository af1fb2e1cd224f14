use serde::{Deserialize, Serialize};

use crate::ConfigError::Inconsistent;
use crate::*;

/// Supported grid dimension with its hazard-count range.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridPreset {
    pub size: Coord,
    pub default_bombs: CellCount,
    pub min_bombs: CellCount,
    pub max_bombs: CellCount,
}

impl GridPreset {
    pub const fn new(
        size: Coord,
        default_bombs: CellCount,
        min_bombs: CellCount,
        max_bombs: CellCount,
    ) -> Self {
        Self {
            size,
            default_bombs,
            min_bombs,
            max_bombs,
        }
    }

    pub const fn total_cells(&self) -> CellCount {
        square(self.size)
    }

    /// Effective inclusive range: at least one hazard, at least one safe cell.
    pub fn bomb_range(&self) -> (CellCount, CellCount) {
        let min = self.min_bombs.max(1);
        let max = self.max_bombs.min(self.total_cells().saturating_sub(1));
        (min, max)
    }

    pub fn check_bombs(&self, bombs: CellCount) -> core::result::Result<CellCount, ConfigError> {
        let (min, max) = self.bomb_range();
        if (min..=max).contains(&bombs) {
            Ok(bombs)
        } else {
            Err(ConfigError::BombCountOutOfRange { bombs, min, max })
        }
    }
}

pub const DEFAULT_PRESETS: [GridPreset; 4] = [
    GridPreset::new(5, 3, 1, 10),
    GridPreset::new(6, 5, 2, 14),
    GridPreset::new(8, 8, 4, 26),
    GridPreset::new(10, 15, 6, 40),
];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileConfig {
    pub presets: Vec<GridPreset>,
    /// Base safety used when no unrevealed cell is left.
    pub neutral_probability: f64,
    pub probability_floor: f64,
    pub probability_ceiling: f64,
    pub safe_threshold: f64,
    pub risky_threshold: f64,
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            presets: DEFAULT_PRESETS.to_vec(),
            neutral_probability: 0.5,
            probability_floor: 0.05,
            probability_ceiling: 0.95,
            safe_threshold: 0.7,
            risky_threshold: 0.4,
        }
    }
}

impl TileConfig {
    pub fn validate(&self) -> Result<()> {
        if self.presets.is_empty() {
            return Err(Inconsistent("no grid presets").into());
        }
        for preset in &self.presets {
            let (min, max) = preset.bomb_range();
            if preset.size < 2 || min > max {
                return Err(ConfigError::UnsupportedGridSize { size: preset.size }.into());
            }
            preset.check_bombs(preset.default_bombs)?;
        }
        if !(0.0..=1.0).contains(&self.neutral_probability)
            || !(0.0 <= self.probability_floor
                && self.probability_floor < self.probability_ceiling
                && self.probability_ceiling <= 1.0)
        {
            return Err(Inconsistent("tile probability bounds").into());
        }
        if self.risky_threshold > self.safe_threshold {
            return Err(Inconsistent("risky threshold above safe threshold").into());
        }
        Ok(())
    }

    pub fn preset(&self, size: Coord) -> core::result::Result<&GridPreset, ConfigError> {
        self.presets
            .iter()
            .find(|preset| preset.size == size)
            .ok_or(ConfigError::UnsupportedGridSize { size })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    pub game_kind: GameKind,
    pub min_multiplier: f64,
    pub max_multiplier: f64,
    /// Uniform band drawn from before any round is logged.
    pub cold_start_band: (f64, f64),
    /// Gaussian jitter of a drawn crash point, as a fraction of the trailing mean.
    pub jitter_ratio: f64,
    pub draw_window: usize,
    pub predict_window: usize,
    pub summary_window: usize,
    pub trend_window: usize,
    /// Recommended exit as a fraction of the predicted stop.
    pub exit_margin: f64,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            game_kind: GameKind::Crash,
            min_multiplier: 1.01,
            max_multiplier: 100.0,
            cold_start_band: (1.5, 5.0),
            jitter_ratio: 0.3,
            draw_window: 20,
            predict_window: 50,
            summary_window: 20,
            trend_window: 3,
            exit_margin: 0.85,
        }
    }
}

impl SequenceConfig {
    /// Checks the bounds and that every window fits `history_capacity`.
    pub fn validate(&self, history_capacity: usize) -> Result<()> {
        if !(1.0 <= self.min_multiplier && self.min_multiplier < self.max_multiplier) {
            return Err(Inconsistent("multiplier bounds").into());
        }
        let (low, high) = self.cold_start_band;
        if !(self.min_multiplier <= low && low < high && high <= self.max_multiplier) {
            return Err(Inconsistent("cold start band outside multiplier bounds").into());
        }
        if !(0.0 < self.exit_margin && self.exit_margin <= 1.0) || self.jitter_ratio < 0.0 {
            return Err(Inconsistent("exit margin or jitter ratio").into());
        }
        let windows = [
            self.draw_window,
            self.predict_window,
            self.summary_window,
            self.trend_window,
        ];
        if windows.iter().any(|&w| w == 0 || w > history_capacity) {
            return Err(Inconsistent("history windows must fit the history capacity").into());
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptationConfig {
    /// Number of most recent observations each re-evaluation looks at.
    pub window: usize,
    pub low_accuracy: f64,
    pub high_accuracy: f64,
}

impl Default for AdaptationConfig {
    fn default() -> Self {
        Self {
            window: 20,
            low_accuracy: 0.6,
            high_accuracy: 0.8,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub tile: TileConfig,
    pub sequence: SequenceConfig,
    pub adaptation: AdaptationConfig,
    pub history_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tile: TileConfig::default(),
            sequence: SequenceConfig::default(),
            adaptation: AdaptationConfig::default(),
            history_capacity: HISTORY_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Parses a JSON document, filling omitted fields with defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|err| ConfigError::Malformed(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.tile.validate()?;
        self.sequence.validate(self.history_capacity)?;

        let adapt = &self.adaptation;
        if adapt.window == 0 || adapt.window > self.history_capacity {
            return Err(Inconsistent("adaptation window must fit the history capacity").into());
        }
        if !(0.0..=1.0).contains(&adapt.low_accuracy) || adapt.low_accuracy > adapt.high_accuracy {
            return Err(Inconsistent("adaptation accuracy thresholds").into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(EngineConfig::default().validate(), Ok(()));
    }

    #[test]
    fn bomb_range_is_clamped_to_leave_a_safe_cell() {
        let preset = GridPreset::new(2, 1, 0, 10);
        assert_eq!(preset.bomb_range(), (1, 3));
        assert_eq!(
            preset.check_bombs(4),
            Err(ConfigError::BombCountOutOfRange {
                bombs: 4,
                min: 1,
                max: 3
            })
        );
    }

    #[test]
    fn unknown_size_is_unsupported() {
        let tile = TileConfig::default();
        assert_eq!(tile.preset(8).map(|p| p.default_bombs), Ok(8));
        assert_eq!(
            tile.preset(7),
            Err(ConfigError::UnsupportedGridSize { size: 7 })
        );
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{ "sequence": { "max_multiplier": 50.0 } }"#)
            .unwrap();
        assert_eq!(config.sequence.max_multiplier, 50.0);
        assert_eq!(config.sequence.min_multiplier, 1.01);
        assert_eq!(config.tile.presets.len(), 4);
    }

    #[test]
    fn malformed_json_is_invalid_configuration() {
        let err = EngineConfig::from_json("{ not json").unwrap_err();
        assert!(err.is_invalid_configuration());
    }

    #[test]
    fn inverted_thresholds_are_rejected() {
        let mut config = EngineConfig::default();
        config.adaptation.low_accuracy = 0.9;
        assert!(config.validate().unwrap_err().is_invalid_configuration());
    }

    #[test]
    fn multiplier_floor_above_ceiling_is_rejected() {
        let config = SequenceConfig {
            min_multiplier: 200.0,
            ..SequenceConfig::default()
        };
        assert_eq!(
            config.validate(HISTORY_CAPACITY),
            Err(EngineError::InvalidConfiguration(Inconsistent(
                "multiplier bounds"
            )))
        );
    }
}
