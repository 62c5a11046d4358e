use std::path::PathBuf;

use thiserror::Error;

/// Failures the viewer distinguishes.
///
/// Only the per-tile variants are recoverable: the loader turns them into
/// placeholder tiles. Everything else stops the session before it starts.
#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("tile file {path:?} does not exist")]
    TileMissing { path: PathBuf },

    #[error("failed to decode tile {path:?}: {reason}")]
    TileDecode { path: PathBuf, reason: String },

    #[error("failed to scan tile directory {path:?}: {reason}")]
    DirectoryScan { path: PathBuf, reason: String },

    #[error("failed to initialise the render surface: {0}")]
    RenderSurface(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to start tile loader threads: {0}")]
    LoaderSpawn(#[source] std::io::Error),
}

impl ViewerError {
    /// Whether the session can keep running after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ViewerError::TileMissing { .. } | ViewerError::TileDecode { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_tile_errors_are_recoverable() {
        assert!(ViewerError::TileMissing { path: "a.png".into() }.is_recoverable());
        assert!(
            ViewerError::TileDecode {
                path: "a.png".into(),
                reason: "bad".into()
            }
            .is_recoverable()
        );
        assert!(
            !ViewerError::DirectoryScan {
                path: "x".into(),
                reason: "gone".into()
            }
            .is_recoverable()
        );
        assert!(!ViewerError::RenderSurface("no display".into()).is_recoverable());
        assert!(!ViewerError::Config("zoom".into()).is_recoverable());
    }

    #[test]
    fn messages_name_the_path() {
        let e = ViewerError::TileDecode {
            path: "0/0_5_5.png".into(),
            reason: "empty file".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("0_5_5.png"));
        assert!(msg.contains("empty file"));
    }
}
