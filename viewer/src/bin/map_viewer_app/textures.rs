use std::collections::HashMap;

use eframe::egui;
use tilemap_core::frame::TileDraw;
use tilemap_core::tile::Tile;
use tilemap_core::TileAddress;

/// Upload this many decoded tiles per frame at most, so a burst of finished
/// loads never stalls a frame.
pub(crate) const UPLOADS_PER_FRAME: usize = 10;

/// GPU textures for decoded tiles, keyed by address.
///
/// Placeholder tiles are painted as flat rectangles and never get a texture.
pub(crate) struct TileTextureCache {
    textures: HashMap<TileAddress, egui::TextureHandle>,
    uploads_this_frame: usize,
    budget: usize,
}

impl Default for TileTextureCache {
    fn default() -> Self {
        Self::new(UPLOADS_PER_FRAME)
    }
}

impl TileTextureCache {
    pub(crate) fn new(budget: usize) -> Self {
        Self {
            textures: HashMap::new(),
            uploads_this_frame: 0,
            budget: budget.max(1),
        }
    }

    pub(crate) fn begin_frame(&mut self) {
        self.uploads_this_frame = 0;
    }

    /// Whether some visible tile was left for a later frame.
    pub(crate) fn budget_exhausted(&self) -> bool {
        self.uploads_this_frame >= self.budget
    }

    pub(crate) fn clear(&mut self) {
        self.textures.clear();
    }

    /// Drop the textures of every other floor.
    pub(crate) fn retain_floor(&mut self, floor: i32) {
        self.textures.retain(|address, _| address.floor == floor);
    }

    pub(crate) fn len(&self) -> usize {
        self.textures.len()
    }

    /// Texture for a drawn tile, uploading it if the frame budget allows.
    ///
    /// # Returns
    ///
    /// * `None` for placeholders, or when the upload has to wait a frame.
    pub(crate) fn texture_for(
        &mut self,
        ctx: &egui::Context,
        draw: &TileDraw,
    ) -> Option<&egui::TextureHandle> {
        let Tile::Loaded(pixels) = draw.tile.as_ref() else {
            return None;
        };

        if !self.textures.contains_key(&draw.address) {
            if self.budget_exhausted() {
                return None;
            }
            self.uploads_this_frame += 1;

            let color = egui::ColorImage::from_rgba_unmultiplied(
                [pixels.width() as usize, pixels.height() as usize],
                pixels.as_raw(),
            );
            let texture = ctx.load_texture(
                format!("tile:{}", draw.address),
                color,
                egui::TextureOptions::LINEAR,
            );
            self.textures.insert(draw.address, texture);
        }

        self.textures.get(&draw.address)
    }
}
