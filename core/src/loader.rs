//! Background tile loading.
//!
//! One or more worker threads pull addresses from the shared [`LoadQueue`],
//! read and decode the PNG behind each address, and publish the result into
//! the shared [`TileStore`]. The render thread never touches the disk.
//!
//! # Failure handling
//!
//! | Outcome                    | Stored as             | Logged at |
//! |----------------------------|-----------------------|-----------|
//! | decoded                    | `Tile::Loaded`        | trace     |
//! | file absent (sparse grid)  | `Tile::MissingOnDisk` | trace     |
//! | empty, corrupt, unreadable | `Tile::DecodeFailed`  | warn      |
//!
//! # Shutdown
//!
//! Cooperative: [`TileLoader::shutdown`] raises a stop flag and wakes idle
//! workers. A worker that is in the middle of a tile finishes it, then exits
//! without dequeuing anything else.
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use image::RgbaImage;

use crate::address::{TileAddress, TileLayout};
use crate::error::ViewerError;
use crate::load_queue::LoadQueue;
use crate::tile::{Tile, TileImage, placeholder_image};
use crate::tile_store::TileStore;

/// How long an idle worker blocks on the queue before re-checking the stop flag.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Pause between two tiles so a single-core machine keeps the UI responsive.
pub const YIELD_BETWEEN_TILES: Duration = Duration::from_millis(1);

/// Where tiles live on disk and what to show when one can't be used.
#[derive(Clone, Debug)]
pub struct TileSource {
    root: PathBuf,
    layout: TileLayout,
    placeholder: TileImage,
}

impl TileSource {
    pub fn new(root: impl Into<PathBuf>, layout: TileLayout, tile_size: u32, fallback: [u8; 3]) -> Self {
        Self {
            root: root.into(),
            layout,
            // Shared by every failed tile, so a sparse grid costs one bitmap.
            placeholder: placeholder_image(tile_size, fallback),
        }
    }

    pub fn path_for(&self, address: TileAddress) -> PathBuf {
        self.layout.path_for(&self.root, address)
    }

    /// Read and decode the tile at `address`.
    ///
    /// # Returns
    ///
    /// * The decoded RGBA pixels.
    /// * `Err(ViewerError::TileMissing)` if there is no file.
    /// * `Err(ViewerError::TileDecode)` for unreadable, empty or corrupt files.
    pub fn read(&self, address: TileAddress) -> Result<RgbaImage, ViewerError> {
        let path = self.path_for(address);

        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ViewerError::TileMissing { path });
            }
            Err(e) => {
                return Err(ViewerError::TileDecode {
                    path,
                    reason: e.to_string(),
                });
            }
        };

        if bytes.is_empty() {
            return Err(ViewerError::TileDecode {
                path,
                reason: "file is empty".to_string(),
            });
        }

        let decoded = image::load_from_memory(&bytes).map_err(|e| ViewerError::TileDecode {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        Ok(decoded.to_rgba8())
    }

    /// Like [`read`](Self::read) but always yields a settled [`Tile`].
    pub fn load(&self, address: TileAddress) -> Tile {
        match self.read(address) {
            Ok(pixels) => {
                log::trace!(
                    "Loaded tile {address} ({}x{})",
                    pixels.width(),
                    pixels.height()
                );
                Tile::Loaded(Arc::new(pixels))
            }
            Err(e @ ViewerError::TileMissing { .. }) => {
                log::trace!("Tile {address} not on disk: {e}");
                Tile::MissingOnDisk(Arc::clone(&self.placeholder))
            }
            Err(e) => {
                log::warn!("Tile {address} replaced by placeholder: {e}");
                Tile::DecodeFailed(Arc::clone(&self.placeholder))
            }
        }
    }
}

struct LoaderShared {
    store: Arc<TileStore>,
    queue: Arc<LoadQueue>,
    source: TileSource,
    stop: AtomicBool,
}

/// Handle for the loader worker threads.
///
/// Dropping the handle shuts the workers down and joins them.
pub struct TileLoader {
    shared: Arc<LoaderShared>,
    handles: Vec<JoinHandle<()>>,
}

impl TileLoader {
    /// Start `workers` loader threads (at least one).
    ///
    /// # Returns
    ///
    /// * The running loader.
    /// * `Err` if the OS refuses to spawn a thread; workers that did start are
    ///   stopped again before returning.
    pub fn spawn(
        workers: usize,
        store: Arc<TileStore>,
        queue: Arc<LoadQueue>,
        source: TileSource,
    ) -> io::Result<Self> {
        let shared = Arc::new(LoaderShared {
            store,
            queue,
            source,
            stop: AtomicBool::new(false),
        });

        let mut loader = TileLoader {
            shared,
            handles: Vec::new(),
        };

        for id in 0..workers.max(1) {
            let shared = Arc::clone(&loader.shared);
            let handle = thread::Builder::new()
                .name(format!("tile-loader-{id}"))
                .spawn(move || worker_main(id, shared))?;
            loader.handles.push(handle);
        }

        Ok(loader)
    }

    pub fn worker_count(&self) -> usize {
        self.handles.len()
    }

    /// Nothing queued and nothing being decoded.
    pub fn is_idle(&self) -> bool {
        self.shared.queue.is_drained()
    }

    /// Poll until the loader is idle or `timeout` elapses.
    ///
    /// # Returns
    ///
    /// * `true` if the loader drained in time.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.is_idle() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        self.is_idle()
    }

    /// Raise the stop flag without waiting for the workers.
    pub fn request_stop(&self) {
        self.shared.stop.store(true, Ordering::Release);
        self.shared.queue.wake_all();
    }

    /// Stop the workers and block until all of them exited.
    ///
    /// Safe to call more than once.
    pub fn shutdown(&mut self) {
        self.request_stop();
        for handle in self.handles.drain(..) {
            if let Err(e) = handle.join() {
                log::error!("Tile loader thread panicked: {e:?}");
            }
        }
    }
}

impl Drop for TileLoader {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_main(id: usize, shared: Arc<LoaderShared>) {
    log::info!("Tile loader {id} started.");
    let mut loaded = 0usize;

    while !shared.stop.load(Ordering::Acquire) {
        let Some(address) = shared.queue.wait_dequeue(POLL_INTERVAL) else {
            continue;
        };

        if shared.stop.load(Ordering::Acquire) {
            shared.queue.release();
            break;
        }

        // Enqueue can race with an earlier completion of the same address.
        if !shared.store.is_settled(address) {
            let tile = shared.source.load(address);
            shared.store.put(address, tile);
            loaded += 1;
        }
        shared.queue.release();

        thread::sleep(YIELD_BETWEEN_TILES);
    }

    log::info!("Tile loader {id} exiting after {loaded} tiles.");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::{TileStatus, uniform_color};
    use image::Rgba;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn unique_temp_dir(prefix: &str) -> PathBuf {
        let pid = std::process::id();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        std::env::temp_dir().join(format!("{prefix}_{pid}_{nanos}"))
    }

    fn write_png(source: &TileSource, address: TileAddress, rgb: [u8; 3]) {
        let path = source.path_for(address);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        RgbaImage::from_pixel(8, 8, Rgba([rgb[0], rgb[1], rgb[2], 255]))
            .save(&path)
            .unwrap();
    }

    #[test]
    fn read_decodes_png() {
        let dir = unique_temp_dir("loader_read");
        let source = TileSource::new(&dir, TileLayout::FloorDirPrefixed, 8, [0, 0, 0]);
        let a = TileAddress::new(0, 1, 2);
        write_png(&source, a, [200, 100, 50]);

        let pixels = source.read(a).unwrap();
        assert_eq!(pixels.dimensions(), (8, 8));
        assert_eq!(pixels.get_pixel(3, 3).0, [200, 100, 50, 255]);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_file_becomes_missing_on_disk_placeholder() {
        let dir = unique_temp_dir("loader_missing");
        let source = TileSource::new(&dir, TileLayout::FloorDir, 4, [7, 7, 7]);
        let a = TileAddress::new(0, 9, 9);

        assert!(matches!(source.read(a), Err(ViewerError::TileMissing { .. })));
        let tile = source.load(a);
        assert_eq!(tile.status(), TileStatus::MissingOnDisk);
        assert_eq!(uniform_color(tile.image().unwrap()), Some([7, 7, 7, 255]));
    }

    #[test]
    fn zero_byte_file_becomes_decode_failed() {
        let dir = unique_temp_dir("loader_empty");
        let source = TileSource::new(&dir, TileLayout::FloorDirPrefixed, 4, [0, 0, 0]);
        let a = TileAddress::new(0, 5, 5);
        let path = source.path_for(a);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"").unwrap();

        assert!(matches!(source.read(a), Err(ViewerError::TileDecode { .. })));
        let tile = source.load(a);
        assert_eq!(tile.status(), TileStatus::DecodeFailed);
        assert_eq!(tile.placeholder_color(), Some([0, 0, 0, 255]));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn garbage_bytes_become_decode_failed() {
        let dir = unique_temp_dir("loader_garbage");
        let source = TileSource::new(&dir, TileLayout::Flat, 4, [0, 0, 0]);
        let a = TileAddress::new(1, 2, 3);
        fs::create_dir_all(&dir).unwrap();
        fs::write(source.path_for(a), b"definitely not a png").unwrap();

        assert_eq!(source.load(a).status(), TileStatus::DecodeFailed);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn workers_drain_queue_into_store() {
        let dir = unique_temp_dir("loader_drain");
        let source = TileSource::new(&dir, TileLayout::FloorDirPrefixed, 8, [0, 0, 0]);
        let present = TileAddress::new(0, 1, 1);
        let absent = TileAddress::new(0, 2, 2);
        write_png(&source, present, [1, 2, 3]);

        let store = Arc::new(TileStore::new());
        let queue = Arc::new(LoadQueue::new());
        queue.enqueue(present, 0);
        queue.enqueue(absent, 1);

        let mut loader =
            TileLoader::spawn(2, Arc::clone(&store), Arc::clone(&queue), source).unwrap();
        assert_eq!(loader.worker_count(), 2);
        assert!(loader.wait_idle(Duration::from_secs(5)));

        assert_eq!(store.get(present).unwrap().status(), TileStatus::Loaded);
        assert_eq!(store.get(absent).unwrap().status(), TileStatus::MissingOnDisk);

        loader.shutdown();
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn settled_addresses_are_not_reloaded() {
        let dir = unique_temp_dir("loader_skip");
        let source = TileSource::new(&dir, TileLayout::FloorDirPrefixed, 8, [0, 0, 0]);
        let a = TileAddress::new(0, 1, 1);
        write_png(&source, a, [9, 9, 9]);

        let store = Arc::new(TileStore::new());
        let marker = placeholder_image(1, [42, 42, 42]);
        store.put(a, Tile::DecodeFailed(marker));

        let queue = Arc::new(LoadQueue::new());
        queue.enqueue(a, 0);
        let loader = TileLoader::spawn(1, Arc::clone(&store), Arc::clone(&queue), source).unwrap();
        assert!(loader.wait_idle(Duration::from_secs(5)));
        drop(loader);

        let tile = store.get(a).unwrap();
        assert_eq!(tile.status(), TileStatus::DecodeFailed);
        assert_eq!(tile.placeholder_color(), Some([42, 42, 42, 255]));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn shutdown_is_prompt_and_repeatable() {
        let store = Arc::new(TileStore::new());
        let queue = Arc::new(LoadQueue::new());
        let source = TileSource::new(unique_temp_dir("loader_stop"), TileLayout::Flat, 4, [0, 0, 0]);
        let mut loader = TileLoader::spawn(3, store, queue, source).unwrap();

        let start = Instant::now();
        loader.shutdown();
        loader.shutdown();
        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(loader.worker_count(), 0);
    }

    #[test]
    fn stopped_loader_leaves_queue_untouched() {
        let store = Arc::new(TileStore::new());
        let queue = Arc::new(LoadQueue::new());
        let source = TileSource::new(unique_temp_dir("loader_stopped"), TileLayout::Flat, 4, [0, 0, 0]);
        let mut loader =
            TileLoader::spawn(1, Arc::clone(&store), Arc::clone(&queue), source).unwrap();
        loader.shutdown();

        queue.enqueue(TileAddress::new(0, 0, 0), 0);
        thread::sleep(Duration::from_millis(50));
        assert_eq!(queue.len(), 1);
        assert!(store.is_empty());
    }
}
