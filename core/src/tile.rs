use std::sync::Arc;

use image::{Rgba, RgbaImage};

/// Decoded RGBA pixels, shared between the store, the renderer and the GPU
/// upload path without copying.
pub type TileImage = Arc<RgbaImage>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TileStatus {
    Pending,
    Loaded,
    MissingOnDisk,
    DecodeFailed,
}

/// Outcome of a load attempt.
///
/// Every settled variant carries something drawable: failed and missing tiles
/// hold a uniform placeholder so the renderer never has to special-case an
/// absent bitmap.
#[derive(Clone, Debug)]
pub enum Tile {
    Pending,
    Loaded(TileImage),
    MissingOnDisk(TileImage),
    DecodeFailed(TileImage),
}

impl Tile {
    pub fn status(&self) -> TileStatus {
        match self {
            Tile::Pending => TileStatus::Pending,
            Tile::Loaded(_) => TileStatus::Loaded,
            Tile::MissingOnDisk(_) => TileStatus::MissingOnDisk,
            Tile::DecodeFailed(_) => TileStatus::DecodeFailed,
        }
    }

    /// `true` once a load attempt has finished, whatever its outcome.
    pub fn is_settled(&self) -> bool {
        !matches!(self, Tile::Pending)
    }

    pub fn image(&self) -> Option<&TileImage> {
        match self {
            Tile::Pending => None,
            Tile::Loaded(img) | Tile::MissingOnDisk(img) | Tile::DecodeFailed(img) => Some(img),
        }
    }

    /// Fill colour for placeholder tiles, `None` for real pixels.
    pub fn placeholder_color(&self) -> Option<[u8; 4]> {
        match self {
            // Placeholders are uniform, the first pixel is the whole story.
            Tile::MissingOnDisk(img) | Tile::DecodeFailed(img) => {
                img.get_pixel_checked(0, 0).map(|p| p.0)
            }
            Tile::Pending | Tile::Loaded(_) => None,
        }
    }
}

/// Square image of a single colour.
pub fn placeholder_image(size: u32, rgb: [u8; 3]) -> TileImage {
    let size = size.max(1);
    Arc::new(RgbaImage::from_pixel(
        size,
        size,
        Rgba([rgb[0], rgb[1], rgb[2], 255]),
    ))
}

/// Returns the colour if every pixel of `img` is identical.
pub fn uniform_color(img: &RgbaImage) -> Option<[u8; 4]> {
    let first = img.pixels().next()?;
    if img.pixels().all(|p| p == first) {
        Some(first.0)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_uniform_and_opaque() {
        let img = placeholder_image(16, [10, 20, 30]);
        assert_eq!(img.dimensions(), (16, 16));
        assert_eq!(uniform_color(&img), Some([10, 20, 30, 255]));
    }

    #[test]
    fn placeholder_size_is_at_least_one() {
        assert_eq!(placeholder_image(0, [0, 0, 0]).dimensions(), (1, 1));
    }

    #[test]
    fn uniform_color_rejects_mixed_pixels() {
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([1, 1, 1, 255]));
        img.put_pixel(3, 3, Rgba([2, 1, 1, 255]));
        assert_eq!(uniform_color(&img), None);
    }

    #[test]
    fn status_matches_variant() {
        let fill = placeholder_image(2, [0, 0, 0]);
        assert_eq!(Tile::Pending.status(), TileStatus::Pending);
        assert!(!Tile::Pending.is_settled());
        assert!(Tile::Pending.image().is_none());

        let missing = Tile::MissingOnDisk(fill.clone());
        assert_eq!(missing.status(), TileStatus::MissingOnDisk);
        assert!(missing.is_settled());
        assert_eq!(missing.placeholder_color(), Some([0, 0, 0, 255]));

        let loaded = Tile::Loaded(fill);
        assert_eq!(loaded.status(), TileStatus::Loaded);
        assert_eq!(loaded.placeholder_color(), None);
    }
}
