use eframe::egui;
use egui::{Color32, Pos2, Rect, Stroke, Vec2};
use tilemap_core::camera::ScreenRect;
use tilemap_core::frame::{FramePlan, OverlayInfo};

use super::textures::TileTextureCache;

const BACKGROUND: Color32 = Color32::from_rgb(20, 22, 26);
const OVERLAY_PADDING: Vec2 = Vec2::new(32.0, 16.0);
const OVERLAY_LINE_GAP: f32 = 4.0;

fn to_egui_rect(canvas: Rect, rect: &ScreenRect) -> Rect {
    Rect::from_min_size(
        canvas.min + Vec2::new(rect.x as f32, rect.y as f32),
        Vec2::new(rect.width as f32, rect.height as f32),
    )
}

/// Paint one frame into `canvas`.
///
/// # Returns
///
/// * `true` if some visible tile is still waiting for its texture upload.
pub(crate) fn paint_frame(
    painter: &egui::Painter,
    ctx: &egui::Context,
    canvas: Rect,
    plan: &FramePlan,
    textures: &mut TileTextureCache,
) -> bool {
    painter.rect_filled(canvas, 0.0, BACKGROUND);

    let mut deferred = false;
    for draw in &plan.tiles {
        let dst = to_egui_rect(canvas, &draw.rect);

        if let Some([r, g, b, a]) = draw.tile.placeholder_color() {
            painter.rect_filled(dst, 0.0, Color32::from_rgba_unmultiplied(r, g, b, a));
        } else if let Some(texture) = textures.texture_for(ctx, draw) {
            painter.image(
                texture.id(),
                dst,
                Rect::from_min_max(Pos2::new(0.0, 0.0), Pos2::new(1.0, 1.0)),
                Color32::WHITE,
            );
        } else {
            deferred = true;
        }

        for edge in draw.grid_edges() {
            let from = canvas.min + Vec2::new(edge.from.0 as f32, edge.from.1 as f32);
            let to = canvas.min + Vec2::new(edge.to.0 as f32, edge.to.1 as f32);
            painter.line_segment(
                [from, to],
                Stroke::new(1.0, Color32::from_white_alpha(edge.alpha)),
            );
        }
    }

    paint_overlay(painter, canvas, &plan.overlay);
    deferred
}

/// Status box in the top-right corner.
fn paint_overlay(painter: &egui::Painter, canvas: Rect, overlay: &OverlayInfo) {
    let font = egui::FontId::monospace(14.0);
    let galleys: Vec<_> = overlay
        .lines()
        .into_iter()
        .map(|line| painter.layout_no_wrap(line, font.clone(), Color32::WHITE))
        .collect();

    let text_width = galleys
        .iter()
        .map(|g| g.size().x)
        .fold(0.0_f32, f32::max);
    let text_height = galleys.iter().map(|g| g.size().y).sum::<f32>()
        + OVERLAY_LINE_GAP * galleys.len().saturating_sub(1) as f32;

    let size = Vec2::new(text_width, text_height) + OVERLAY_PADDING;
    let box_rect = Rect::from_min_size(
        Pos2::new(canvas.max.x - size.x - 10.0, canvas.min.y + 10.0),
        size,
    );
    painter.rect_filled(box_rect, 0.0, Color32::from_black_alpha(128));

    let mut cursor = box_rect.min + OVERLAY_PADDING / 2.0;
    for galley in galleys {
        let height = galley.size().y;
        painter.galley(cursor, galley, Color32::WHITE);
        cursor.y += height + OVERLAY_LINE_GAP;
    }
}
