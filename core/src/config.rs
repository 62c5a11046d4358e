use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::address::{GridBounds, TileLayout};
use crate::camera::{CameraSettings, DEFAULT_TILE_SIZE, DEFAULT_ZOOM_LEVELS, DEFAULT_ZOOM_SPEED};
use crate::error::ViewerError;
use crate::load_queue::{DEFAULT_FLOOR_WEIGHT, MAX_FLOOR_WEIGHT};

pub const DEFAULT_CENTER_TILE: (i32, i32) = (49, 53);

/// Most addresses (tiles per floor times floors) a session will queue.
pub const MAX_ADDRESSES: u64 = 1 << 24;

/// Everything the viewer can be told from a JSON file or the command line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub tile_dir: PathBuf,
    pub layout: TileLayout,
    pub tile_size: u32,

    /// Explicit grid bounds; discovered from file names when absent.
    pub grid_bounds: Option<GridBounds>,
    pub floor_min: i32,
    pub floor_max: i32,

    /// Tile to centre on at startup; the middle of the bounds when absent.
    pub initial_center: Option<(i32, i32)>,
    pub initial_floor: i32,

    pub window_width: u32,
    pub window_height: u32,

    /// Discrete wheel zoom levels. Normalised to largest first.
    pub zoom_levels: Vec<f64>,
    pub zoom_speed: f64,
    pub floor_weight: i64,

    pub loader_threads: usize,
    pub fallback_color: [u8; 3],
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            tile_dir: PathBuf::from("tiles"),
            layout: TileLayout::default(),
            tile_size: DEFAULT_TILE_SIZE,

            grid_bounds: None,
            floor_min: 0,
            floor_max: 3,

            initial_center: Some(DEFAULT_CENTER_TILE),
            initial_floor: 0,

            window_width: 1280,
            window_height: 720,

            zoom_levels: DEFAULT_ZOOM_LEVELS.to_vec(),
            zoom_speed: DEFAULT_ZOOM_SPEED,
            floor_weight: DEFAULT_FLOOR_WEIGHT,

            loader_threads: 1,
            fallback_color: [0, 0, 0],
        }
    }
}

impl ViewerConfig {
    /// Read a JSON config file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self, ViewerError> {
        let bytes = fs::read(path)
            .map_err(|e| ViewerError::Config(format!("failed to read {}: {e}", path.display())))?;
        serde_json::from_slice::<ViewerConfig>(&bytes)
            .map_err(|e| ViewerError::Config(format!("failed to parse {}: {e}", path.display())))
    }

    pub fn to_json(&self) -> Result<String, ViewerError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ViewerError::Config(format!("failed to serialize config: {e}")))
    }

    /// Check the values and normalise the ones that have an obvious fix.
    ///
    /// Zoom levels are filtered to positive finite values, de-duplicated and
    /// sorted largest first; the initial floor is clamped into range.
    pub fn validate(mut self) -> Result<Self, ViewerError> {
        if self.tile_size == 0 {
            return Err(ViewerError::Config("tile_size must be positive".into()));
        }
        if self.loader_threads == 0 {
            return Err(ViewerError::Config("loader_threads must be at least 1".into()));
        }
        if self.floor_min > self.floor_max {
            return Err(ViewerError::Config(format!(
                "floor range {}..={} is empty",
                self.floor_min, self.floor_max
            )));
        }
        if let Some(bounds) = self.grid_bounds {
            if !bounds.is_valid() {
                return Err(ViewerError::Config(format!("grid bounds {bounds:?} are inverted")));
            }
        }
        // Discovered bounds are checked again once the scan is done.
        self.address_count(self.grid_bounds.unwrap_or(GridBounds::from_point(0, 0)))?;
        if !(self.zoom_speed.is_finite() && self.zoom_speed > 0.0) {
            return Err(ViewerError::Config(format!(
                "zoom_speed must be positive, got {}",
                self.zoom_speed
            )));
        }
        if !(0..=MAX_FLOOR_WEIGHT).contains(&self.floor_weight) {
            return Err(ViewerError::Config(format!(
                "floor_weight must be between 0 and {MAX_FLOOR_WEIGHT}, got {}",
                self.floor_weight
            )));
        }

        self.zoom_levels.retain(|z| z.is_finite() && *z > 0.0);
        self.zoom_levels.sort_by(|a, b| b.total_cmp(a));
        self.zoom_levels.dedup();
        if self.zoom_levels.is_empty() {
            return Err(ViewerError::Config("zoom_levels must contain a positive value".into()));
        }

        self.initial_floor = self.initial_floor.clamp(self.floor_min, self.floor_max);
        Ok(self)
    }

    /// Number of addresses over `grid` and every floor.
    ///
    /// # Returns
    ///
    /// * `Err(ViewerError::Config)` above [`MAX_ADDRESSES`].
    pub fn address_count(&self, grid: GridBounds) -> Result<usize, ViewerError> {
        let floors = (i64::from(self.floor_max) - i64::from(self.floor_min) + 1).max(0) as u64;
        let count = grid.area().saturating_mul(floors);
        if count > MAX_ADDRESSES {
            return Err(ViewerError::Config(format!(
                "{grid} over {floors} floor(s) is {count} tiles, more than the {MAX_ADDRESSES} a session can queue"
            )));
        }
        usize::try_from(count)
            .map_err(|_| ViewerError::Config(format!("{count} tiles do not fit in memory")))
    }

    /// Camera parameters for a session over `grid`.
    pub fn camera_settings(&self, grid: GridBounds) -> CameraSettings {
        CameraSettings {
            tile_size: self.tile_size,
            grid,
            floor_min: self.floor_min,
            floor_max: self.floor_max,
            zoom_levels: self.zoom_levels.clone(),
            zoom_speed: self.zoom_speed,
        }
    }

    /// Initial zoom: 1.0 when it is a listed level, otherwise the closest one.
    pub fn initial_zoom(&self) -> f64 {
        self.zoom_levels
            .iter()
            .copied()
            .min_by(|a, b| (a - 1.0).abs().total_cmp(&(b - 1.0).abs()))
            .unwrap_or(1.0)
    }
}
