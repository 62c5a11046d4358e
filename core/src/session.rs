//! Top-level viewer state, independent of any windowing toolkit.
//!
//! A [`ViewerSession`] owns the camera, the input controller, the tile store,
//! the load queue and the loader threads. The window layer feeds it events
//! and the viewport size, calls [`ViewerSession::advance_frame`] once per
//! frame and paints [`ViewerSession::plan_frame`].
//!
//! Load priorities are computed when an address is queued and only re-ranked
//! when the floor or the tile under the viewport centre changes. That keeps
//! the per-frame cost at zero while the view is still, and one pass over the
//! pending set when it moves to a new tile.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::address::{GridBounds, TileAddress};
use crate::bounds::scan_bounds;
use crate::camera::Camera;
use crate::config::ViewerConfig;
use crate::error::ViewerError;
use crate::frame::{FramePlan, LoadingProgress, OverlayInfo, visible_tiles};
use crate::input::{InputController, InputEvent, InputOutcome, InputState};
use crate::load_queue::{LoadQueue, load_priority};
use crate::loader::{TileLoader, TileSource};
use crate::tile_store::TileStore;

/// Floor and centre tile the pending priorities were computed for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Focus {
    floor: i32,
    center: (i32, i32),
}

pub struct ViewerSession {
    config: ViewerConfig,
    grid: GridBounds,
    start_center: (i32, i32),
    viewport: (f64, f64),

    camera: Camera,
    input: InputController,
    store: Arc<TileStore>,
    queue: Arc<LoadQueue>,
    loader: TileLoader,

    focus: Focus,
    total_addresses: usize,
    started_at: Instant,
    reported_done: bool,
}

impl ViewerSession {
    /// Validate `config`, resolve the grid bounds, queue every address and
    /// start the loader threads.
    ///
    /// # Returns
    ///
    /// * The running session.
    /// * `Err(ViewerError::Config)` for invalid settings, or a grid with more
    ///   addresses than [`MAX_ADDRESSES`](crate::config::MAX_ADDRESSES).
    /// * `Err(ViewerError::DirectoryScan)` if the tile directory is missing,
    ///   or holds no tiles while no explicit bounds were given.
    /// * `Err(ViewerError::LoaderSpawn)` if the worker threads can't start.
    pub fn start(config: ViewerConfig, viewport: (f64, f64)) -> Result<Self, ViewerError> {
        let config = config.validate()?;
        let grid = resolve_bounds(&config)?;
        let total_addresses = config.address_count(grid)?;
        let start_center = config.initial_center.unwrap_or_else(|| grid.center());

        let mut camera = Camera::new(config.camera_settings(grid), config.initial_floor);
        camera.zoom = config.initial_zoom();
        camera.zoom_target = camera.zoom;
        camera.center_on(start_center, viewport);

        let store = Arc::new(TileStore::new());
        let queue = Arc::new(LoadQueue::new());
        let focus = Focus {
            floor: camera.floor,
            center: camera.center_tile(viewport),
        };

        let source = TileSource::new(
            &config.tile_dir,
            config.layout,
            config.tile_size,
            config.fallback_color,
        );

        // Queue before spawning so the first dequeue already sees the full set.
        let seeded = seed_queue(&queue, &store, &config, grid, focus);
        let loader = TileLoader::spawn(
            config.loader_threads,
            Arc::clone(&store),
            Arc::clone(&queue),
            source,
        )
        .map_err(ViewerError::LoaderSpawn)?;

        log::info!(
            "Viewer session started: dir {}, {grid}, floors {}..={}, {seeded} tiles queued, {} loader thread(s)",
            config.tile_dir.display(),
            config.floor_min,
            config.floor_max,
            loader.worker_count()
        );

        Ok(Self {
            config,
            grid,
            start_center,
            viewport,
            camera,
            input: InputController::new(),
            store,
            queue,
            loader,
            focus,
            total_addresses,
            started_at: Instant::now(),
            reported_done: false,
        })
    }

    pub fn grid(&self) -> GridBounds {
        self.grid
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn store(&self) -> &TileStore {
        &self.store
    }

    pub fn queue(&self) -> &LoadQueue {
        &self.queue
    }

    pub fn viewport(&self) -> (f64, f64) {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: (f64, f64)) {
        self.viewport = viewport;
    }

    pub fn is_quit(&self) -> bool {
        self.input.state() == InputState::Quit
    }

    /// Apply one input event. A quit event also stops the loader.
    pub fn handle_event(&mut self, event: InputEvent) -> InputOutcome {
        let outcome = self.input.handle(event, &mut self.camera);
        if outcome.floor_changed {
            log::debug!("Floor changed to {}", self.camera.floor);
            self.refresh_viewport();
        }
        if outcome.quit {
            self.shutdown();
        }
        outcome
    }

    /// Per-frame update: advance the zoom animation around `pointer` (the
    /// viewport centre when the pointer is outside the window) and re-rank the
    /// load queue if the view moved to another tile.
    ///
    /// # Returns
    ///
    /// * `true` while another frame is needed for the animation.
    pub fn advance_frame(&mut self, pointer: Option<(f64, f64)>) -> bool {
        let pointer = pointer.unwrap_or((self.viewport.0 / 2.0, self.viewport.1 / 2.0));
        self.camera.step_zoom(pointer);

        let focus = Focus {
            floor: self.camera.floor,
            center: self.camera.center_tile(self.viewport),
        };
        if focus != self.focus {
            self.refresh_viewport();
        }

        if !self.reported_done && self.loader.is_idle() {
            self.reported_done = true;
            let stats = self.store.stats();
            log::info!(
                "All tiles attempted in {:.2?}: {} loaded, {} missing, {} failed",
                self.started_at.elapsed(),
                stats.loaded,
                stats.missing,
                stats.failed
            );
        }

        self.camera.is_zoom_animating()
    }

    /// Re-rank pending loads around the current floor and centre tile, and
    /// queue any visible address that has neither been attempted nor queued.
    pub fn refresh_viewport(&mut self) {
        let focus = Focus {
            floor: self.camera.floor,
            center: self.camera.center_tile(self.viewport),
        };
        self.focus = focus;

        let weight = self.config.floor_weight;
        self.queue
            .reprioritize(|address| load_priority(address, focus.floor, focus.center, weight));

        let mut requeued = 0;
        for address in self.visible_addresses() {
            if !self.store.is_settled(address)
                && self
                    .queue
                    .enqueue(address, load_priority(address, focus.floor, focus.center, weight))
            {
                requeued += 1;
            }
        }

        log::debug!(
            "Re-prioritised {} pending tiles around floor {} tile {:?} ({requeued} re-queued)",
            self.queue.len(),
            focus.floor,
            focus.center
        );
    }

    /// Grid addresses on the current floor that intersect the viewport.
    fn visible_addresses(&self) -> Vec<TileAddress> {
        let (w, h) = self.viewport;
        let (x0, y0) = self.camera.screen_to_tile(0.0, 0.0);
        let (x1, y1) = self.camera.screen_to_tile(w, h);

        let min_x = x0.max(self.grid.min_x);
        let max_x = x1.min(self.grid.max_x);
        // Screen y grows southwards, tile y northwards.
        let min_y = y1.max(self.grid.min_y);
        let max_y = y0.min(self.grid.max_y);

        let floor = self.camera.floor;
        let mut addresses = Vec::new();
        for x in min_x..=max_x {
            for y in min_y..=max_y {
                addresses.push(TileAddress::new(floor, x, y));
            }
        }
        addresses
    }

    /// Re-centre on the startup tile.
    pub fn reset_view(&mut self) {
        self.camera.center_on(self.start_center, self.viewport);
        self.refresh_viewport();
    }

    pub fn is_loading(&self) -> bool {
        !self.loader.is_idle()
    }

    pub fn loading_progress(&self) -> Option<LoadingProgress> {
        self.is_loading().then(|| LoadingProgress {
            settled: self.store.stats().settled(),
            total: self.total_addresses,
        })
    }

    pub fn plan_frame(&self) -> FramePlan {
        FramePlan {
            viewport: self.viewport,
            tiles: visible_tiles(&self.store, &self.camera, self.viewport),
            overlay: OverlayInfo {
                floor: self.camera.floor,
                zoom_percent: self.camera.zoom_percent(),
                bounds: self.grid,
                loading: self.loading_progress(),
            },
        }
    }

    /// Block until the loader drained the queue or `timeout` elapsed.
    pub fn wait_until_idle(&self, timeout: Duration) -> bool {
        self.loader.wait_idle(timeout)
    }

    /// Stop the loader threads. In-flight tiles finish; nothing new is read.
    pub fn shutdown(&mut self) {
        self.loader.shutdown();
    }
}

fn resolve_bounds(config: &ViewerConfig) -> Result<GridBounds, ViewerError> {
    if !config.tile_dir.is_dir() {
        return Err(ViewerError::DirectoryScan {
            path: config.tile_dir.clone(),
            reason: "not a directory".to_string(),
        });
    }

    if let Some(bounds) = config.grid_bounds {
        return Ok(bounds);
    }

    let report = scan_bounds(
        &config.tile_dir,
        config.layout,
        config.floor_min..=config.floor_max,
    )?;
    log::info!(
        "Discovered {} tiles ({} skipped) in {}",
        report.total_tiles(),
        report.skipped,
        config.tile_dir.display()
    );

    report.bounds.ok_or_else(|| ViewerError::DirectoryScan {
        path: config.tile_dir.clone(),
        reason: "no tile files found".to_string(),
    })
}

/// Queue every in-bounds address that has not been attempted yet.
fn seed_queue(
    queue: &LoadQueue,
    store: &TileStore,
    config: &ViewerConfig,
    grid: GridBounds,
    focus: Focus,
) -> usize {
    let mut seeded = 0;
    for floor in config.floor_min..=config.floor_max {
        for x in grid.min_x..=grid.max_x {
            for y in grid.min_y..=grid.max_y {
                let address = TileAddress::new(floor, x, y);
                if store.is_settled(address) {
                    continue;
                }
                let priority =
                    load_priority(address, focus.floor, focus.center, config.floor_weight);
                if queue.enqueue(address, priority) {
                    seeded += 1;
                }
            }
        }
    }
    seeded
}
