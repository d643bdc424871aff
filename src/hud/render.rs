//! tiny-skia rendering for the HUD

use tiny_skia::Pixmap;

use super::font::GlyphFont;
use super::glyph::GlyphCell;
use super::state::{DaemonState, Geometry};
use super::GRID_DIM;

pub struct Renderer {
    font: GlyphFont,
    base_size: f32,
}

impl Renderer {
    pub fn new(font: GlyphFont, base_size: f32) -> Self {
        Self { font, base_size }
    }

    /// Paint the background and all nine cells
    pub fn render(&self, pixmap: &mut Pixmap, state: &DaemonState) {
        // Replace, don't blend: the buffer carries the overlay's own alpha
        pixmap.fill(state.colors().background);

        for (index, cell) in state.cells().iter().enumerate() {
            let GlyphCell::Glyph {
                tier,
                style,
                foreground,
                ..
            } = cell
            else {
                continue;
            };
            let Some(ch) = cell.character() else {
                continue;
            };

            let (cx, cy) = cell_center(index, state.geometry());
            let shift = style.map(|s| s.vertical_shift()).unwrap_or(0.0);

            if let Err(e) = self.font.draw(
                pixmap,
                ch,
                tier.pixel_size(self.base_size),
                (cx, cy + shift),
                *foreground,
            ) {
                log::error!("Failed to draw cell {}: {}", index, e);
            }
        }
    }
}

/// Center of grid cell `index` in window coordinates.
///
/// The grid is homogeneous and inset by the margin on every side.
pub fn cell_center(index: usize, geometry: &Geometry) -> (f32, f32) {
    let inner = geometry.window_size as f32 - 2.0 * geometry.margin;
    let cell = inner / GRID_DIM as f32;
    let col = (index % GRID_DIM) as f32;
    let row = (index / GRID_DIM) as f32;

    (
        geometry.margin + (col + 0.5) * cell,
        geometry.margin + (row + 0.5) * cell,
    )
}
