//! Per-frame draw list.
//!
//! The window layer paints whatever [`FramePlan`] says; all culling and
//! overlay text lives here so it can be tested without a display.

use std::sync::Arc;

use crate::address::{GridBounds, TileAddress};
use crate::camera::{Camera, ScreenRect};
use crate::tile::Tile;
use crate::tile_store::TileStore;

#[derive(Clone, Debug)]
pub struct TileDraw {
    pub address: TileAddress,
    pub rect: ScreenRect,
    pub tile: Arc<Tile>,
}

/// One grid line segment in screen pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridEdge {
    pub from: (f64, f64),
    pub to: (f64, f64),
    /// 255 for a full line, 128 for the half-strength inner edge.
    pub alpha: u8,
}

const FULL_EDGE: u8 = 255;
const HALF_EDGE: u8 = 128;

impl TileDraw {
    /// Grid lines for this tile.
    ///
    /// Even columns draw a full left edge and a half right edge, odd columns
    /// a full right edge only. Odd rows draw a full top edge and a half bottom
    /// edge, even rows a full bottom edge only. Neighbouring tiles therefore
    /// alternate strong and faint lines.
    pub fn grid_edges(&self) -> Vec<GridEdge> {
        let r = &self.rect;
        let (left, top, right, bottom) = (r.x, r.y, r.right(), r.bottom());
        let mut edges = Vec::with_capacity(4);

        if self.address.x.rem_euclid(2) == 0 {
            edges.push(GridEdge { from: (left, top), to: (left, bottom), alpha: FULL_EDGE });
            edges.push(GridEdge {
                from: (right - 1.0, top),
                to: (right - 1.0, bottom),
                alpha: HALF_EDGE,
            });
        } else {
            edges.push(GridEdge { from: (right, top), to: (right, bottom), alpha: FULL_EDGE });
        }

        if self.address.y.rem_euclid(2) == 1 {
            edges.push(GridEdge { from: (left, top), to: (right, top), alpha: FULL_EDGE });
            edges.push(GridEdge {
                from: (left, bottom - 1.0),
                to: (right, bottom - 1.0),
                alpha: HALF_EDGE,
            });
        } else {
            edges.push(GridEdge { from: (left, bottom), to: (right, bottom), alpha: FULL_EDGE });
        }

        edges
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadingProgress {
    /// Addresses with a finished load attempt.
    pub settled: usize,
    /// Addresses in the grid over all floors.
    pub total: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct OverlayInfo {
    pub floor: i32,
    pub zoom_percent: i32,
    pub bounds: GridBounds,
    /// Present while the loader still has work.
    pub loading: Option<LoadingProgress>,
}

impl OverlayInfo {
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Floor: {}    Zoom: {}%", self.floor, self.zoom_percent),
            self.bounds.to_string(),
        ];
        if let Some(progress) = self.loading {
            lines.push(format!(
                "Loading... {}/{}",
                progress.settled, progress.total
            ));
        }
        lines
    }
}

#[derive(Clone, Debug)]
pub struct FramePlan {
    pub viewport: (f64, f64),
    pub tiles: Vec<TileDraw>,
    pub overlay: OverlayInfo,
}

/// Tiles of the camera's floor whose screen rectangle overlaps the viewport.
///
/// Takes one snapshot of the store; tiles that land after it simply show up
/// next frame.
pub fn visible_tiles(store: &TileStore, camera: &Camera, viewport: (f64, f64)) -> Vec<TileDraw> {
    let mut tiles: Vec<TileDraw> = store
        .snapshot_for_floor(camera.floor)
        .into_iter()
        .filter(|(_, tile)| tile.is_settled())
        .filter_map(|(address, tile)| {
            let rect = camera.tile_screen_rect(address.x, address.y);
            rect.intersects_viewport(viewport)
                .then_some(TileDraw { address, rect, tile })
        })
        .collect();

    // Row-major paint order, south to north.
    tiles.sort_by_key(|draw| (draw.address.y, draw.address.x));
    tiles
}
