use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use log::LevelFilter;
use tilemap_core::bounds::{scan_bounds, BoundsReport};
use tilemap_core::TileLayout;

#[derive(Parser, Debug)]
#[command(name = "tile-bounds")]
#[command(about = "Print the grid bounds and per-floor tile counts of a tile directory")]
struct Cli {
    /// Tile directory root.
    dir: PathBuf,

    /// floor-dir-prefixed, floor-dir or flat.
    #[arg(long, default_value = "floor-dir-prefixed")]
    layout: TileLayout,

    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    floor_min: i32,

    #[arg(long, default_value_t = 3, allow_hyphen_values = true)]
    floor_max: i32,

    /// -v to list skipped file names.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn render_report(report: &BoundsReport) -> String {
    let Some(bounds) = report.bounds else {
        return "No valid tile files found.\n".to_string();
    };

    let mut out = String::from("--- Map Bounds ---\n");
    out.push_str(&format!("Total tiles scanned: {}\n", report.total_tiles()));
    out.push_str(&format!("X: {} - {}\n", bounds.min_x, bounds.max_x));
    out.push_str(&format!("Y: {} - {}\n", bounds.min_y, bounds.max_y));
    for (floor, count) in &report.tiles_per_floor {
        out.push_str(&format!("Floor {floor}: {count} tiles\n"));
    }
    if report.skipped > 0 {
        out.push_str(&format!("Skipped: {} files\n", report.skipped));
    }
    if !report.missing_floor_dirs.is_empty() {
        out.push_str(&format!(
            "Missing floor directories: {:?}\n",
            report.missing_floor_dirs
        ));
    }
    out
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose > 0 {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    tilemap_core::initialize_logger(level, None)?;

    anyhow::ensure!(
        cli.floor_min <= cli.floor_max,
        "floor range {}..={} is empty",
        cli.floor_min,
        cli.floor_max
    );

    let report = scan_bounds(&cli.dir, cli.layout, cli.floor_min..=cli.floor_max)
        .with_context(|| format!("cannot scan {}", cli.dir.display()))?;
    print!("{}", render_report(&report));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tilemap_core::GridBounds;

    #[test]
    fn report_lists_bounds_and_floors() {
        let report = BoundsReport {
            bounds: Some(GridBounds::new(16, 65, 19, 196)),
            tiles_per_floor: BTreeMap::from([(0, 10), (2, 3)]),
            skipped: 1,
            missing_floor_dirs: vec![3],
        };
        let text = render_report(&report);
        assert!(text.starts_with("--- Map Bounds ---\nTotal tiles scanned: 13\n"));
        assert!(text.contains("X: 16 - 65\nY: 19 - 196\n"));
        assert!(text.contains("Floor 2: 3 tiles\n"));
        assert!(text.contains("Skipped: 1 files\n"));
        assert!(text.contains("Missing floor directories: [3]\n"));
    }

    #[test]
    fn empty_report() {
        assert_eq!(
            render_report(&BoundsReport::default()),
            "No valid tile files found.\n"
        );
    }
}
