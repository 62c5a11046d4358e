//! Viewport camera: pan offset, animated zoom and the active floor.
//!
//! Screen position of a tile's top-left corner:
//!
//! ```text
//! screen_x = (tile_x - grid.min_x) * tile_size * zoom + offset.x
//! screen_y = (grid.max_y - tile_y) * tile_size * zoom + offset.y
//! ```
//!
//! `y` is flipped because a larger tile `y` is further north.

use crate::address::GridBounds;

pub const DEFAULT_TILE_SIZE: u32 = 256;
pub const DEFAULT_ZOOM_LEVELS: [f64; 6] = [4.0, 2.0, 1.0, 0.5, 0.25, 0.125];
/// Per-frame zoom change while animating.
pub const DEFAULT_ZOOM_SPEED: f64 = 0.02;

/// Axis-aligned rectangle in screen pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ScreenRect {
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Half-open containment, `[x, right) x [y, bottom)`.
    pub fn contains(&self, px: f64, py: f64) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }

    /// Whether the rectangle overlaps the viewport `[0, width) x [0, height)`.
    pub fn intersects_viewport(&self, viewport: (f64, f64)) -> bool {
        self.x < viewport.0 && self.right() > 0.0 && self.y < viewport.1 && self.bottom() > 0.0
    }
}

/// Column and row of `tile` counted from the grid's north-west corner.
fn grid_cell(grid: &GridBounds, tile: (i32, i32)) -> (f64, f64) {
    (
        (i64::from(tile.0) - i64::from(grid.min_x)) as f64,
        (i64::from(grid.max_y) - i64::from(tile.1)) as f64,
    )
}

fn clamp_to_i32(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Fixed parameters of a camera, taken from the viewer configuration.
#[derive(Clone, Debug)]
pub struct CameraSettings {
    pub tile_size: u32,
    pub grid: GridBounds,
    pub floor_min: i32,
    pub floor_max: i32,
    /// Discrete zoom levels, largest first.
    pub zoom_levels: Vec<f64>,
    pub zoom_speed: f64,
}

impl CameraSettings {
    pub fn new(grid: GridBounds) -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            grid,
            floor_min: 0,
            floor_max: 3,
            zoom_levels: DEFAULT_ZOOM_LEVELS.to_vec(),
            zoom_speed: DEFAULT_ZOOM_SPEED,
        }
    }
}

/// Owned by the render thread only; loader threads never see it.
#[derive(Clone, Debug)]
pub struct Camera {
    /// World-to-screen translation in pixels.
    pub offset: (f64, f64),
    pub zoom: f64,
    pub zoom_target: f64,
    pub floor: i32,
    pub dragging: bool,
    pub drag_anchor: (f64, f64),
    settings: CameraSettings,
}

impl Camera {
    pub fn new(settings: CameraSettings, floor: i32) -> Self {
        let floor = floor.clamp(settings.floor_min, settings.floor_max);
        Self {
            offset: (0.0, 0.0),
            zoom: 1.0,
            zoom_target: 1.0,
            floor,
            dragging: false,
            drag_anchor: (0.0, 0.0),
            settings,
        }
    }

    pub fn grid(&self) -> GridBounds {
        self.settings.grid
    }

    /// Edge length of one tile on screen at the current zoom.
    pub fn tile_size_screen(&self) -> f64 {
        f64::from(self.settings.tile_size) * self.zoom
    }

    /// Top-left corner of tile `(x, y)` in screen pixels.
    pub fn tile_to_screen(&self, x: i32, y: i32) -> (f64, f64) {
        let size = self.tile_size_screen();
        let grid = &self.settings.grid;
        let (col, row) = grid_cell(grid, (x, y));
        (col * size + self.offset.0, row * size + self.offset.1)
    }

    pub fn tile_screen_rect(&self, x: i32, y: i32) -> ScreenRect {
        let (sx, sy) = self.tile_to_screen(x, y);
        let size = self.tile_size_screen();
        ScreenRect {
            x: sx,
            y: sy,
            width: size,
            height: size,
        }
    }

    pub fn is_tile_visible(&self, x: i32, y: i32, viewport: (f64, f64)) -> bool {
        self.tile_screen_rect(x, y).intersects_viewport(viewport)
    }

    /// Tile whose screen rectangle contains the screen point.
    pub fn screen_to_tile(&self, sx: f64, sy: f64) -> (i32, i32) {
        let size = self.tile_size_screen();
        let grid = &self.settings.grid;
        let col = ((sx - self.offset.0) / size).floor() as i64;
        let row = ((sy - self.offset.1) / size).floor() as i64;
        (
            clamp_to_i32(i64::from(grid.min_x).saturating_add(col)),
            clamp_to_i32(i64::from(grid.max_y).saturating_sub(row)),
        )
    }

    /// Screen point to unzoomed world pixels (origin at the grid's north-west corner).
    pub fn screen_to_world(&self, sx: f64, sy: f64) -> (f64, f64) {
        (
            (sx - self.offset.0) / self.zoom,
            (sy - self.offset.1) / self.zoom,
        )
    }

    /// Tile under the middle of the viewport.
    pub fn center_tile(&self, viewport: (f64, f64)) -> (i32, i32) {
        self.screen_to_tile(viewport.0 / 2.0, viewport.1 / 2.0)
    }

    /// Pan so that the middle of `tile` sits in the middle of the viewport.
    pub fn center_on(&mut self, tile: (i32, i32), viewport: (f64, f64)) {
        let size = self.tile_size_screen();
        let (col, row) = grid_cell(&self.settings.grid, tile);
        self.offset = (
            viewport.0 / 2.0 - (col + 0.5) * size,
            viewport.1 / 2.0 - (row + 0.5) * size,
        );
    }

    pub fn is_zoom_animating(&self) -> bool {
        self.zoom != self.zoom_target
    }

    /// Advance the zoom animation by one frame, keeping the world point under
    /// `pointer` fixed on screen.
    ///
    /// `zoom` moves towards `zoom_target` by at most the configured speed and
    /// never overshoots. The offset is rescaled per axis with
    /// `offset' = pointer - (pointer - offset) * (zoom' / zoom)`.
    ///
    /// # Returns
    ///
    /// * `true` if the zoom changed.
    pub fn step_zoom(&mut self, pointer: (f64, f64)) -> bool {
        if !self.is_zoom_animating() {
            return false;
        }

        let old = self.zoom;
        let speed = self.settings.zoom_speed;
        let new = if old < self.zoom_target {
            (old + speed).min(self.zoom_target)
        } else {
            (old - speed).max(self.zoom_target)
        };

        let ratio = new / old;
        self.offset = (
            pointer.0 - (pointer.0 - self.offset.0) * ratio,
            pointer.1 - (pointer.1 - self.offset.1) * ratio,
        );
        self.zoom = new;
        true
    }

    /// Index of the zoom level closest to the live zoom.
    ///
    /// An exact match wins. Otherwise the nearest level is used and an exact
    /// tie goes to the entry listed first, i.e. the larger zoom.
    pub fn nearest_zoom_index(&self) -> usize {
        let levels = &self.settings.zoom_levels;
        if let Some(idx) = levels.iter().position(|l| *l == self.zoom) {
            return idx;
        }

        let mut best = 0;
        for (idx, level) in levels.iter().enumerate() {
            if (level - self.zoom).abs() < (levels[best] - self.zoom).abs() {
                best = idx;
            }
        }
        best
    }

    /// Move the zoom target one level per wheel event.
    ///
    /// Positive `direction` zooms in (towards the larger levels), negative
    /// zooms out; the magnitude is ignored. Stops at either end of the list.
    pub fn scroll_zoom(&mut self, direction: f64) {
        let levels = &self.settings.zoom_levels;
        if levels.is_empty() || direction == 0.0 {
            return;
        }

        let idx = self.nearest_zoom_index();
        let next = if direction > 0.0 {
            idx.saturating_sub(1)
        } else {
            (idx + 1).min(levels.len() - 1)
        };
        self.zoom_target = levels[next];
    }

    /// Screen-space pan, independent of zoom.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.offset.0 += dx;
        self.offset.1 += dy;
    }

    pub fn begin_drag(&mut self, pos: (f64, f64)) {
        self.dragging = true;
        self.drag_anchor = pos;
    }

    /// Pan by the pointer movement since the last anchor.
    pub fn drag_to(&mut self, pos: (f64, f64)) {
        if !self.dragging {
            return;
        }
        self.pan_by(pos.0 - self.drag_anchor.0, pos.1 - self.drag_anchor.1);
        self.drag_anchor = pos;
    }

    pub fn end_drag(&mut self) {
        self.dragging = false;
    }

    /// Clamp to the configured floor range. Zoom and offset are untouched.
    ///
    /// # Returns
    ///
    /// * `true` if the floor changed.
    pub fn set_floor(&mut self, floor: i32) -> bool {
        let floor = floor.clamp(self.settings.floor_min, self.settings.floor_max);
        let changed = floor != self.floor;
        self.floor = floor;
        changed
    }

    pub fn change_floor(&mut self, delta: i32) -> bool {
        self.set_floor(self.floor.saturating_add(delta))
    }

    /// Zoom as a whole percentage, truncated.
    pub fn zoom_percent(&self) -> i32 {
        (self.zoom * 100.0) as i32
    }
}
