use std::path::PathBuf;
use std::time::Duration;

use eframe::egui;
use egui::{Pos2, Rect};
use tilemap_core::camera::Camera;
use tilemap_core::input::{InputEvent, PointerButton};
use tilemap_core::{ViewerConfig, ViewerSession};

use super::renderer::paint_frame;
use super::textures::TileTextureCache;

/// How often to repaint while the loader is still publishing tiles.
const LOADING_REPAINT_INTERVAL: Duration = Duration::from_millis(50);

pub(crate) struct MapViewerApp {
    /// Settings the current session was started from; reused when another
    /// tile directory is opened.
    config: ViewerConfig,
    session: ViewerSession,
    textures: TileTextureCache,

    status: Option<String>,
    // Canvas of the previous frame, used to make pointer positions relative.
    canvas: Option<Rect>,
    view_initialized: bool,
}

impl MapViewerApp {
    pub(crate) fn new(config: ViewerConfig, session: ViewerSession) -> Self {
        Self {
            config,
            session,
            textures: TileTextureCache::default(),
            status: None,
            canvas: None,
            view_initialized: false,
        }
    }

    /// Replace the session with one over `dir`. Bounds and centre are
    /// discovered again; the current session keeps running if that fails.
    fn open_tile_dir(&mut self, dir: PathBuf) {
        let config = ViewerConfig {
            tile_dir: dir,
            grid_bounds: None,
            initial_center: None,
            initial_floor: self.session.camera().floor,
            ..self.config.clone()
        };

        match ViewerSession::start(config.clone(), self.session.viewport()) {
            Ok(session) => {
                log::info!("Opened tile directory {}", config.tile_dir.display());
                self.status = Some(format!("Opened {}", config.tile_dir.display()));
                self.session.shutdown();
                self.session = session;
                self.config = config;
                self.textures.clear();
            }
            Err(e) => {
                log::error!("Failed to open tile directory: {e}");
                self.status = Some(format!("Open failed: {e}"));
            }
        }
    }

    fn relative(&self, pos: Pos2) -> (f64, f64) {
        let origin = self.canvas.map_or(Pos2::ZERO, |c| c.min);
        (f64::from(pos.x - origin.x), f64::from(pos.y - origin.y))
    }

    fn over_canvas(&self, pos: Pos2) -> bool {
        self.canvas.is_some_and(|c| c.contains(pos))
    }

    /// Translate this frame's egui input into session events.
    fn forward_input(&mut self, ctx: &egui::Context) {
        let (events, hover, floor_up, floor_down, close) = ctx.input(|i| {
            (
                i.events.clone(),
                i.pointer.hover_pos(),
                i.key_pressed(egui::Key::ArrowUp),
                i.key_pressed(egui::Key::ArrowDown),
                i.viewport().close_requested(),
            )
        });

        for event in &events {
            let translated = match event {
                &egui::Event::PointerButton {
                    pos,
                    button,
                    pressed,
                    ..
                } => {
                    let Some(button) = map_button(button) else {
                        continue;
                    };
                    let pos_rel = self.relative(pos);
                    if pressed {
                        // Presses on the menu bar must not start a drag.
                        if !self.over_canvas(pos) {
                            continue;
                        }
                        InputEvent::PointerDown {
                            button,
                            pos: pos_rel,
                        }
                    } else {
                        InputEvent::PointerUp {
                            button,
                            pos: pos_rel,
                        }
                    }
                }
                &egui::Event::PointerMoved(pos) => InputEvent::PointerMove {
                    pos: self.relative(pos),
                },
                _ => continue,
            };
            self.session.handle_event(translated);
        }

        if hover.is_some_and(|p| self.over_canvas(p)) {
            for delta in wheel_notches(&events) {
                self.session.handle_event(InputEvent::Wheel { delta });
            }
        }

        if floor_up {
            self.on_floor_event(InputEvent::FloorUp);
        }
        if floor_down {
            self.on_floor_event(InputEvent::FloorDown);
        }

        if close {
            self.session.handle_event(InputEvent::Quit);
        }
    }

    fn on_floor_event(&mut self, event: InputEvent) {
        if self.session.handle_event(event).floor_changed {
            let floor = self.session.camera().floor;
            self.textures.retain_floor(floor);
        }
    }

    fn ui_top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open tile directory...").clicked() {
                        ui.close_menu();
                        let mut dialog = rfd::FileDialog::new();
                        if self.config.tile_dir.is_dir() {
                            dialog = dialog.set_directory(&self.config.tile_dir);
                        }
                        if let Some(dir) = dialog.pick_folder() {
                            self.open_tile_dir(dir);
                        }
                    }

                    ui.separator();

                    if ui.button("Quit").clicked() {
                        ui.close_menu();
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });

                ui.separator();

                if ui.button("Reset view").clicked() {
                    self.session.reset_view();
                }

                ui.separator();

                let stats = self.session.store().stats();
                ui.label(format!(
                    "{} loaded, {} missing, {} failed, {} textures",
                    stats.loaded,
                    stats.missing,
                    stats.failed,
                    self.textures.len()
                ));

                if let Some(status) = self.status.as_ref() {
                    ui.separator();
                    let color = if status.starts_with("Open failed") {
                        egui::Color32::LIGHT_RED
                    } else {
                        egui::Color32::LIGHT_GREEN
                    };
                    ui.colored_label(color, status);
                }
            });
        });
    }
}

fn map_button(button: egui::PointerButton) -> Option<PointerButton> {
    match button {
        egui::PointerButton::Primary => Some(PointerButton::Primary),
        egui::PointerButton::Secondary => Some(PointerButton::Secondary),
        egui::PointerButton::Middle => Some(PointerButton::Middle),
        _ => None,
    }
}

/// One wheel step per vertical scroll event, so fast scrolling still moves
/// one zoom level per notch.
fn wheel_notches(events: &[egui::Event]) -> Vec<f64> {
    events
        .iter()
        .filter_map(|event| match event {
            egui::Event::MouseWheel { delta, .. } if delta.y != 0.0 => Some(f64::from(delta.y)),
            _ => None,
        })
        .collect()
}

fn canvas_cursor(camera: &Camera) -> egui::CursorIcon {
    if camera.dragging {
        egui::CursorIcon::Grabbing
    } else {
        egui::CursorIcon::Default
    }
}

impl eframe::App for MapViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.ui_top_bar(ctx);
        self.forward_input(ctx);

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                let (canvas, response) =
                    ui.allocate_exact_size(ui.available_size(), egui::Sense::click_and_drag());
                if response.hovered() || self.session.camera().dragging {
                    ctx.set_cursor_icon(canvas_cursor(self.session.camera()));
                }
                self.canvas = Some(canvas);
                self.session
                    .set_viewport((f64::from(canvas.width()), f64::from(canvas.height())));

                // The session was centred for the full window; redo it for the real canvas.
                if !self.view_initialized {
                    self.view_initialized = true;
                    self.session.reset_view();
                }

                let pointer = ctx
                    .pointer_latest_pos()
                    .filter(|p| canvas.contains(*p))
                    .map(|p| self.relative(p));
                let animating = self.session.advance_frame(pointer);

                self.textures.begin_frame();
                let plan = self.session.plan_frame();
                let painter = ui.painter_at(canvas);
                let deferred = paint_frame(&painter, ctx, canvas, &plan, &mut self.textures);

                if animating || deferred || self.session.camera().dragging {
                    ctx.request_repaint();
                } else if self.session.is_loading() {
                    ctx.request_repaint_after(LOADING_REPAINT_INTERVAL);
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilemap_core::camera::CameraSettings;
    use tilemap_core::GridBounds;

    fn wheel(y: f32) -> egui::Event {
        egui::Event::MouseWheel {
            unit: egui::MouseWheelUnit::Line,
            delta: egui::vec2(0.0, y),
            modifiers: egui::Modifiers::NONE,
        }
    }

    #[test]
    fn every_wheel_event_is_one_notch() {
        let events = vec![
            wheel(1.0),
            egui::Event::PointerMoved(Pos2::new(3.0, 4.0)),
            wheel(1.0),
            wheel(0.0),
            wheel(-2.0),
        ];
        assert_eq!(wheel_notches(&events), vec![1.0, 1.0, -2.0]);
        assert!(wheel_notches(&[]).is_empty());
    }

    #[test]
    fn dragging_shows_grabbing_cursor() {
        let mut camera = Camera::new(CameraSettings::new(GridBounds::new(0, 9, 0, 9)), 0);
        assert_eq!(canvas_cursor(&camera), egui::CursorIcon::Default);

        camera.begin_drag((1.0, 1.0));
        assert_eq!(canvas_cursor(&camera), egui::CursorIcon::Grabbing);

        camera.end_drag();
        assert_eq!(canvas_cursor(&camera), egui::CursorIcon::Default);
    }
}
