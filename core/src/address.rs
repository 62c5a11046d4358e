//! Tile addressing.
//!
//! A tile is identified by `(floor, x, y)`. Increasing `y` points north, so the
//! camera flips it when projecting to screen space. This module also owns the
//! on-disk naming conventions the ripped tile sets use.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Key of a single tile in the floor-indexed grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileAddress {
    pub floor: i32,
    pub x: i32,
    pub y: i32,
}

impl TileAddress {
    pub const fn new(floor: i32, x: i32, y: i32) -> Self {
        Self { floor, x, y }
    }
}

impl fmt::Display for TileAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.floor, self.x, self.y)
    }
}

/// Inclusive rectangle of grid coordinates shared by every floor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridBounds {
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
}

impl GridBounds {
    pub const fn new(min_x: i32, max_x: i32, min_y: i32, max_y: i32) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    /// Degenerate bounds covering exactly one tile.
    pub const fn from_point(x: i32, y: i32) -> Self {
        Self::new(x, x, y, y)
    }

    /// Grow the bounds so that `(x, y)` is inside.
    pub fn include(&mut self, x: i32, y: i32) {
        self.min_x = self.min_x.min(x);
        self.max_x = self.max_x.max(x);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        (self.min_x..=self.max_x).contains(&x) && (self.min_y..=self.max_y).contains(&y)
    }

    pub fn is_valid(&self) -> bool {
        self.min_x <= self.max_x && self.min_y <= self.max_y
    }

    pub fn width(&self) -> i64 {
        i64::from(self.max_x) - i64::from(self.min_x) + 1
    }

    pub fn height(&self) -> i64 {
        i64::from(self.max_y) - i64::from(self.min_y) + 1
    }

    /// Number of tiles per floor, saturating at `u64::MAX`.
    pub fn area(&self) -> u64 {
        if !self.is_valid() {
            return 0;
        }
        (self.width() as u64).saturating_mul(self.height() as u64)
    }

    /// Middle tile, rounded towards negative infinity.
    pub fn center(&self) -> (i32, i32) {
        let mid = |lo: i32, hi: i32| (i64::from(lo) + i64::from(hi)).div_euclid(2) as i32;
        (mid(self.min_x, self.max_x), mid(self.min_y, self.max_y))
    }
}

impl fmt::Display for GridBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "X: {} - {}    Y: {} - {}",
            self.min_x, self.max_x, self.min_y, self.max_y
        )
    }
}

/// Parses `MIN_X,MAX_X,MIN_Y,MAX_Y`.
impl FromStr for GridBounds {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<i32> = s
            .split(',')
            .map(|p| p.trim().parse::<i32>())
            .collect::<Result<_, _>>()
            .map_err(|e| format!("invalid bounds {s:?}: {e}"))?;

        let [min_x, max_x, min_y, max_y] = parts[..] else {
            return Err(format!(
                "invalid bounds {s:?}: expected MIN_X,MAX_X,MIN_Y,MAX_Y"
            ));
        };

        let bounds = GridBounds::new(min_x, max_x, min_y, max_y);
        if !bounds.is_valid() {
            return Err(format!("invalid bounds {s:?}: min exceeds max"));
        }
        Ok(bounds)
    }
}

/// Directory convention of a tile set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileLayout {
    /// `{root}/{floor}/{floor}_{x}_{y}.png`
    #[default]
    FloorDirPrefixed,
    /// `{root}/{floor}/{x}_{y}.png`
    FloorDir,
    /// `{root}/{floor}_{x}_{y}.png`
    Flat,
}

fn tile_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(-?\d+)_(-?\d+)(?:_(-?\d+))?").expect("tile name regex is valid")
    })
}

impl TileLayout {
    pub fn uses_floor_dirs(&self) -> bool {
        !matches!(self, TileLayout::Flat)
    }

    /// Path of the file backing `address`.
    pub fn path_for(&self, root: &Path, address: TileAddress) -> PathBuf {
        let TileAddress { floor, x, y } = address;
        match self {
            TileLayout::FloorDirPrefixed => root
                .join(floor.to_string())
                .join(format!("{floor}_{x}_{y}.png")),
            TileLayout::FloorDir => root.join(floor.to_string()).join(format!("{x}_{y}.png")),
            TileLayout::Flat => root.join(format!("{floor}_{x}_{y}.png")),
        }
    }

    /// Recover the address from a file name found while scanning.
    ///
    /// `dir_floor` is the floor of the directory being scanned and is
    /// authoritative for the floor-directory layouts. Anything that is not a
    /// `.png` or does not start with the expected numeric parts yields `None`.
    /// Text between the numbers and the extension is tolerated.
    pub fn parse_file_name(&self, name: &str, dir_floor: Option<i32>) -> Option<TileAddress> {
        if !name.to_ascii_lowercase().ends_with(".png") {
            return None;
        }

        let caps = tile_name_regex().captures(name)?;
        let first: i32 = caps.get(1)?.as_str().parse().ok()?;
        let second: i32 = caps.get(2)?.as_str().parse().ok()?;
        let third: Option<i32> = match caps.get(3) {
            Some(m) => Some(m.as_str().parse().ok()?),
            None => None,
        };

        match self {
            TileLayout::FloorDirPrefixed => {
                let y = third?;
                Some(TileAddress::new(dir_floor.unwrap_or(first), second, y))
            }
            TileLayout::FloorDir => Some(TileAddress::new(dir_floor?, first, second)),
            TileLayout::Flat => Some(TileAddress::new(first, second, third?)),
        }
    }
}

impl FromStr for TileLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "floor_dir_prefixed" | "prefixed" => Ok(TileLayout::FloorDirPrefixed),
            "floor_dir" | "nested" => Ok(TileLayout::FloorDir),
            "flat" => Ok(TileLayout::Flat),
            other => Err(format!(
                "unknown tile layout {other:?} (expected floor-dir-prefixed, floor-dir or flat)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_for_each_layout() {
        let root = Path::new("/tiles");
        let a = TileAddress::new(2, 20, 30);
        assert_eq!(
            TileLayout::FloorDirPrefixed.path_for(root, a),
            PathBuf::from("/tiles/2/2_20_30.png")
        );
        assert_eq!(
            TileLayout::FloorDir.path_for(root, a),
            PathBuf::from("/tiles/2/20_30.png")
        );
        assert_eq!(
            TileLayout::Flat.path_for(root, a),
            PathBuf::from("/tiles/2_20_30.png")
        );
    }

    #[test]
    fn parse_accepts_trailing_text_and_upper_case_extension() {
        let layout = TileLayout::FloorDirPrefixed;
        assert_eq!(
            layout.parse_file_name("1_20_30_copy.PNG", Some(1)),
            Some(TileAddress::new(1, 20, 30))
        );
    }

    #[test]
    fn parse_ignores_non_png_and_garbage() {
        let layout = TileLayout::Flat;
        assert_eq!(layout.parse_file_name("0_1_2.txt", None), None);
        assert_eq!(layout.parse_file_name("thumbs.db", None), None);
        assert_eq!(layout.parse_file_name("readme.png", None), None);
        // Flat needs all three numbers.
        assert_eq!(layout.parse_file_name("1_2.png", None), None);
    }

    #[test]
    fn floor_dir_takes_floor_from_directory() {
        assert_eq!(
            TileLayout::FloorDir.parse_file_name("20_30.png", Some(3)),
            Some(TileAddress::new(3, 20, 30))
        );
        assert_eq!(TileLayout::FloorDir.parse_file_name("20_30.png", None), None);
    }

    #[test]
    fn path_and_parse_agree() {
        let root = Path::new("root");
        for layout in [
            TileLayout::FloorDirPrefixed,
            TileLayout::FloorDir,
            TileLayout::Flat,
        ] {
            let a = TileAddress::new(1, 49, 53);
            let path = layout.path_for(root, a);
            let name = path.file_name().and_then(|n| n.to_str()).unwrap();
            let dir_floor = layout.uses_floor_dirs().then_some(a.floor);
            assert_eq!(layout.parse_file_name(name, dir_floor), Some(a), "{layout:?}");
        }
    }

    #[test]
    fn bounds_contains_is_inclusive() {
        let b = GridBounds::new(16, 65, 19, 196);
        assert!(b.contains(16, 19));
        assert!(b.contains(65, 196));
        assert!(!b.contains(15, 19));
        assert!(!b.contains(9999, 9999));
        assert_eq!(b.width(), 50);
        assert_eq!(b.height(), 178);
        assert_eq!(b.area(), 50 * 178);
    }

    #[test]
    fn bounds_include_grows() {
        let mut b = GridBounds::from_point(5, 5);
        b.include(2, 9);
        assert_eq!(b, GridBounds::new(2, 5, 5, 9));
        assert_eq!(b.center(), (3, 7));
    }

    #[test]
    fn bounds_at_the_edges_of_i32() {
        let b = GridBounds::new(i32::MIN, i32::MAX, i32::MAX - 1, i32::MAX);
        assert_eq!(b.width(), 1 << 32);
        assert_eq!(b.height(), 2);
        assert_eq!(b.area(), 1 << 33);
        assert_eq!(b.center(), (-1, i32::MAX - 1));
        assert_eq!(GridBounds::new(1, 0, 0, 0).area(), 0);
    }

    #[test]
    fn bounds_from_str() {
        assert_eq!(
            "16, 65,19,196".parse::<GridBounds>(),
            Ok(GridBounds::new(16, 65, 19, 196))
        );
        assert!("1,2,3".parse::<GridBounds>().is_err());
        assert!("5,1,0,0".parse::<GridBounds>().is_err());
        assert!("a,b,c,d".parse::<GridBounds>().is_err());
    }

    #[test]
    fn layout_from_str() {
        assert_eq!("flat".parse(), Ok(TileLayout::Flat));
        assert_eq!("floor-dir".parse(), Ok(TileLayout::FloorDir));
        assert_eq!(
            "Floor-Dir-Prefixed".parse(),
            Ok(TileLayout::FloorDirPrefixed)
        );
        assert!("zip".parse::<TileLayout>().is_err());
    }
}
