//! Grid-bounds discovery by scanning tile file names.

use std::collections::BTreeMap;
use std::fs;
use std::ops::RangeInclusive;
use std::path::Path;

use crate::address::{GridBounds, TileAddress, TileLayout};
use crate::error::ViewerError;

/// Result of one scan over a tile directory.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BoundsReport {
    /// Union of x/y over every floor, `None` if no tile was recognised.
    pub bounds: Option<GridBounds>,
    pub tiles_per_floor: BTreeMap<i32, usize>,
    /// `.png` files whose name could not be parsed, or outside the floor range.
    pub skipped: usize,
    /// Floors in range that have no directory (floor-directory layouts only).
    pub missing_floor_dirs: Vec<i32>,
}

impl BoundsReport {
    pub fn total_tiles(&self) -> usize {
        self.tiles_per_floor.values().sum()
    }

    fn record(&mut self, address: TileAddress) {
        match self.bounds.as_mut() {
            Some(bounds) => bounds.include(address.x, address.y),
            None => self.bounds = Some(GridBounds::from_point(address.x, address.y)),
        }
        *self.tiles_per_floor.entry(address.floor).or_default() += 1;
    }
}

/// Scan `root` for tiles on `floors` and compute their bounds.
///
/// Non-PNG files are ignored silently; PNGs with unrecognised names are
/// counted in [`BoundsReport::skipped`].
///
/// # Returns
///
/// * The report (possibly without bounds if the directory holds no tiles).
/// * `Err(ViewerError::DirectoryScan)` if `root` is not a readable directory.
pub fn scan_bounds(
    root: &Path,
    layout: TileLayout,
    floors: RangeInclusive<i32>,
) -> Result<BoundsReport, ViewerError> {
    if !root.is_dir() {
        return Err(ViewerError::DirectoryScan {
            path: root.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }

    let mut report = BoundsReport::default();

    if layout.uses_floor_dirs() {
        for floor in floors {
            let dir = root.join(floor.to_string());
            if !dir.is_dir() {
                log::warn!("Missing floor directory: {}", dir.display());
                report.missing_floor_dirs.push(floor);
                continue;
            }
            match fs::read_dir(&dir) {
                Ok(entries) => scan_entries(entries, layout, Some(floor), None, &mut report),
                Err(e) => log::warn!("Failed to read floor directory {}: {e}", dir.display()),
            }
        }
    } else {
        let entries = fs::read_dir(root).map_err(|e| ViewerError::DirectoryScan {
            path: root.to_path_buf(),
            reason: e.to_string(),
        })?;
        scan_entries(entries, layout, None, Some(&floors), &mut report);
    }

    log::debug!(
        "Scanned {}: {} tiles, {} skipped, bounds {:?}",
        root.display(),
        report.total_tiles(),
        report.skipped,
        report.bounds
    );

    Ok(report)
}

fn scan_entries(
    entries: fs::ReadDir,
    layout: TileLayout,
    dir_floor: Option<i32>,
    floors: Option<&RangeInclusive<i32>>,
    report: &mut BoundsReport,
) {
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !name.to_ascii_lowercase().ends_with(".png") {
            continue;
        }

        match layout.parse_file_name(name, dir_floor) {
            Some(address) if floors.is_none_or(|f| f.contains(&address.floor)) => {
                report.record(address);
            }
            _ => {
                log::debug!("Skipping unrecognized filename: {name}");
                report.skipped += 1;
            }
        }
    }
}
