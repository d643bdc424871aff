//! HUD overlay
//!
//! The 3x3 glyph grid, its visibility state machine and the Wayland
//! layer-shell window that puts it on screen.

mod font;
pub mod glyph;
mod render;
pub mod state;
mod wayland;

pub use font::GlyphFont;
pub use glyph::parse_code;
pub use render::Renderer;
pub use state::{AmbientColors, DaemonState, Geometry};
pub use wayland::HudApp;

/// Grid columns (and rows)
pub const GRID_DIM: usize = 3;

/// Number of glyph cells, row-major
pub const GRID_CELLS: usize = GRID_DIM * GRID_DIM;

/// Source of the primary display width, queried on every reposition
pub trait PrimaryDisplay {
    /// Usable width of the primary display in logical px, if known
    fn primary_width(&self) -> Option<i32>;
}
