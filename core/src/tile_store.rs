//! Shared map of decoded tiles.
//!
//! Loader threads write, the render thread reads once per frame. Tiles are
//! stored behind `Arc` so an insert is a single pointer swap under the write
//! lock and a snapshot is a list of pointer copies; no decoding or pixel copy
//! ever happens while the lock is held.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::address::TileAddress;
use crate::tile::{Tile, TileStatus};

#[derive(Default)]
pub struct TileStore {
    tiles: RwLock<HashMap<TileAddress, Arc<Tile>>>,
}

/// Per-status counts, used by the overlay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub loaded: usize,
    pub missing: usize,
    pub failed: usize,
}

impl StoreStats {
    pub fn settled(&self) -> usize {
        self.loaded + self.missing + self.failed
    }
}

impl TileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `tile` for `address`.
    ///
    /// First writer wins: once an address holds a settled tile, later puts are
    /// ignored so a stale re-request can never overwrite it. A `Pending` entry
    /// may be replaced by any tile.
    ///
    /// # Returns
    ///
    /// * `true` if the tile was stored.
    pub fn put(&self, address: TileAddress, tile: Tile) -> bool {
        let tile = Arc::new(tile);
        let mut tiles = self.tiles.write().unwrap_or_else(PoisonError::into_inner);
        match tiles.get(&address) {
            Some(existing) if existing.is_settled() => false,
            _ => {
                tiles.insert(address, tile);
                true
            }
        }
    }

    pub fn get(&self, address: TileAddress) -> Option<Arc<Tile>> {
        self.tiles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&address)
            .cloned()
    }

    /// Whether a load attempt for `address` has completed.
    pub fn is_settled(&self, address: TileAddress) -> bool {
        self.get(address).is_some_and(|t| t.is_settled())
    }

    /// All tiles of `floor`, copied out so the caller iterates without the lock.
    pub fn snapshot_for_floor(&self, floor: i32) -> Vec<(TileAddress, Arc<Tile>)> {
        let tiles = self.tiles.read().unwrap_or_else(PoisonError::into_inner);
        tiles
            .iter()
            .filter(|(address, _)| address.floor == floor)
            .map(|(address, tile)| (*address, Arc::clone(tile)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tiles.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> StoreStats {
        let tiles = self.tiles.read().unwrap_or_else(PoisonError::into_inner);
        let mut stats = StoreStats::default();
        for tile in tiles.values() {
            match tile.status() {
                TileStatus::Loaded => stats.loaded += 1,
                TileStatus::MissingOnDisk => stats.missing += 1,
                TileStatus::DecodeFailed => stats.failed += 1,
                TileStatus::Pending => {}
            }
        }
        stats
    }
}
