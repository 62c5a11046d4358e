mod map_viewer_app;

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use eframe::egui;
use log::LevelFilter;
use tilemap_core::{GridBounds, TileLayout, ViewerConfig, ViewerError, ViewerSession};

use map_viewer_app::MapViewerApp;

#[derive(Parser, Debug)]
#[command(name = "map-viewer")]
#[command(about = "Pan, zoom and switch floors over a directory of floor/x/y PNG tiles")]
struct Cli {
    /// Tile directory (same as --tile-dir).
    dir: Option<PathBuf>,

    /// Tile directory root.
    #[arg(long, conflicts_with = "dir")]
    tile_dir: Option<PathBuf>,

    /// JSON settings file; command-line flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Grid bounds as MIN_X,MAX_X,MIN_Y,MAX_Y. Discovered from file names when omitted.
    #[arg(long, allow_hyphen_values = true)]
    bounds: Option<GridBounds>,

    /// Tile to centre on at startup, as X,Y.
    #[arg(long, value_parser = parse_center, allow_hyphen_values = true)]
    center: Option<(i32, i32)>,

    #[arg(long)]
    floor: Option<i32>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Zoom change per frame while animating.
    #[arg(long)]
    zoom_speed: Option<f64>,

    /// Load-priority cost of one floor of distance.
    #[arg(long)]
    floor_weight: Option<i64>,

    /// Number of loader threads.
    #[arg(long)]
    threads: Option<usize>,

    /// floor-dir-prefixed, floor-dir or flat.
    #[arg(long)]
    layout: Option<TileLayout>,

    /// Also write every log record to this file.
    #[arg(long)]
    log_file: Option<String>,

    /// -v for debug, -vv for trace.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_center(s: &str) -> Result<(i32, i32), String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("invalid centre {s:?}: expected X,Y"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<i32>()
            .map_err(|e| format!("invalid centre {s:?}: {e}"))
    };
    Ok((parse(x)?, parse(y)?))
}

impl Cli {
    fn log_level(&self) -> LevelFilter {
        match self.verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    /// Settings file (or defaults) with the flags applied on top.
    fn resolve_config(&self) -> Result<ViewerConfig, ViewerError> {
        let mut config = match self.config.as_deref() {
            Some(path) => ViewerConfig::load(path)?,
            None => ViewerConfig::default(),
        };

        if let Some(dir) = self.tile_dir.clone().or_else(|| self.dir.clone()) {
            config.tile_dir = dir;
        }
        if let Some(bounds) = self.bounds {
            config.grid_bounds = Some(bounds);
        }
        if let Some(center) = self.center {
            config.initial_center = Some(center);
        }
        if let Some(floor) = self.floor {
            config.initial_floor = floor;
        }
        if let Some(width) = self.width {
            config.window_width = width;
        }
        if let Some(height) = self.height {
            config.window_height = height;
        }
        if let Some(speed) = self.zoom_speed {
            config.zoom_speed = speed;
        }
        if let Some(weight) = self.floor_weight {
            config.floor_weight = weight;
        }
        if let Some(threads) = self.threads {
            config.loader_threads = threads;
        }
        if let Some(layout) = self.layout {
            config.layout = layout;
        }

        config.validate()
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tilemap_core::initialize_logger(cli.log_level(), cli.log_file.as_deref())?;

    if let Err(e) = run(&cli) {
        log::error!("{e:#}");
        return Err(e);
    }
    Ok(())
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = cli.resolve_config().context("invalid viewer settings")?;
    let size = [config.window_width as f32, config.window_height as f32];

    let session = ViewerSession::start(
        config.clone(),
        (f64::from(size[0]), f64::from(size[1])),
    )
    .with_context(|| format!("cannot view tiles in {}", config.tile_dir.display()))?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(size)
            .with_title("Map Viewer"),
        ..Default::default()
    };

    eframe::run_native(
        "Map Viewer",
        options,
        Box::new(move |_cc| Ok(Box::new(MapViewerApp::new(config, session)))),
    )
    .map_err(|e| ViewerError::RenderSurface(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::parse_from([
            "map-viewer",
            "/maps/rip",
            "--bounds",
            "16,65,19,196",
            "--center",
            "20,-3",
            "--floor",
            "9",
            "--layout",
            "flat",
            "--threads",
            "4",
        ]);
        let config = cli.resolve_config().unwrap();
        assert_eq!(config.tile_dir, PathBuf::from("/maps/rip"));
        assert_eq!(config.grid_bounds, Some(GridBounds::new(16, 65, 19, 196)));
        assert_eq!(config.initial_center, Some((20, -3)));
        // Clamped into the default floor range.
        assert_eq!(config.initial_floor, 3);
        assert_eq!(config.layout, TileLayout::Flat);
        assert_eq!(config.loader_threads, 4);
        assert_eq!(config.zoom_speed, 0.02);
    }

    #[test]
    fn invalid_flag_values_are_config_errors() {
        let cli = Cli::parse_from(["map-viewer", "--threads", "0"]);
        assert!(matches!(cli.resolve_config(), Err(ViewerError::Config(_))));
    }

    #[test]
    fn center_parser() {
        assert_eq!(parse_center("49, 53"), Ok((49, 53)));
        assert!(parse_center("49").is_err());
        assert!(parse_center("a,b").is_err());
    }

    #[test]
    fn verbosity_maps_to_level() {
        assert_eq!(Cli::parse_from(["map-viewer"]).log_level(), LevelFilter::Info);
        assert_eq!(Cli::parse_from(["map-viewer", "-vv"]).log_level(), LevelFilter::Trace);
    }
}
