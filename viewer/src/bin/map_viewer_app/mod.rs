pub(crate) mod app;
pub(crate) mod renderer;
pub(crate) mod textures;

pub(crate) use app::MapViewerApp;
