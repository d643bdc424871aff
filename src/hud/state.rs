//! Overlay state machine
//!
//! `DaemonState` is built once at startup and owned by the event loop.
//! Every mutation goes through [`DaemonState::show`] or [`DaemonState::hide`].

use tiny_skia::Color;

use super::glyph::GlyphCell;
use super::GRID_CELLS;

/// Visibility of the overlay window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Hidden,
    Visible,
}

/// Fixed window geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    /// Width and height of the square window
    pub window_size: u32,
    /// Distance from the top and right screen edges
    pub padding: i32,
    /// Inset of the glyph grid inside the window
    pub margin: f32,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            window_size: 180,
            padding: 35,
            margin: 10.0,
        }
    }
}

/// Theme colors captured when the window is created
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientColors {
    pub foreground: Color,
    /// Background with the overlay opacity already applied
    pub background: Color,
}

/// Top-left corner of the window in screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    /// Flush to the top-right corner of a display `primary_width` wide.
    /// Displays narrower than the window pin it to the left edge.
    pub fn top_right(primary_width: i32, geometry: &Geometry) -> Self {
        let size = i32::try_from(geometry.window_size).unwrap_or(i32::MAX);
        Self {
            x: primary_width
                .saturating_sub(size)
                .saturating_sub(geometry.padding)
                .max(0),
            y: geometry.padding,
        }
    }
}

pub struct DaemonState {
    visibility: Visibility,
    cells: [GlyphCell; GRID_CELLS],
    geometry: Geometry,
    colors: AmbientColors,
    position: Option<Position>,
}

impl DaemonState {
    pub fn new(geometry: Geometry, colors: AmbientColors) -> Self {
        Self {
            visibility: Visibility::Hidden,
            cells: [GlyphCell::Blank; GRID_CELLS],
            geometry,
            colors,
            position: None,
        }
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn is_visible(&self) -> bool {
        self.visibility == Visibility::Visible
    }

    pub fn cells(&self) -> &[GlyphCell; GRID_CELLS] {
        &self.cells
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn colors(&self) -> &AmbientColors {
        &self.colors
    }

    /// Last computed position, `None` while the primary width is unknown
    pub fn position(&self) -> Option<Position> {
        self.position
    }

    /// Recompute the window position from the current primary display width
    pub fn reposition(&mut self, primary_width: Option<i32>) -> Option<Position> {
        self.position = primary_width.map(|width| Position::top_right(width, &self.geometry));
        self.position
    }

    /// Hide the overlay. Returns whether the visibility changed.
    pub fn hide(&mut self) -> bool {
        let changed = self.is_visible();
        self.visibility = Visibility::Hidden;
        changed
    }

    /// Reposition, replace all nine cells and become visible.
    ///
    /// The position comes from [`Position::top_right`], which clamps `x` at 0
    /// on displays narrower than the window plus padding. Codes are already
    /// validated, so this cannot fail part way through.
    pub fn show(&mut self, codes: [u16; GRID_CELLS], primary_width: Option<i32>) {
        self.reposition(primary_width);
        let foreground = self.colors.foreground;
        self.cells = codes.map(|code| GlyphCell::from_code(code, foreground));
        self.visibility = Visibility::Visible;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hud::glyph::{SizeTier, StyleOverride};

    fn new_state() -> DaemonState {
        DaemonState::new(
            Geometry::default(),
            AmbientColors {
                foreground: Color::WHITE,
                background: Color::from_rgba8(53, 53, 53, 168),
            },
        )
    }

    const EXAMPLE: [u16; GRID_CELLS] = [0x0041, 0, 0x27D0, 0xF000, 0xF001, 0, 0, 0, 0];

    #[test]
    fn test_starts_hidden_and_blank() {
        let state = new_state();
        assert_eq!(state.visibility(), Visibility::Hidden);
        assert!(state.cells().iter().all(GlyphCell::is_blank));
        assert_eq!(state.position(), None);
    }

    #[test]
    fn test_show_example_grid() {
        let mut state = new_state();
        state.show(EXAMPLE, Some(1920));

        assert_eq!(state.visibility(), Visibility::Visible);
        let cells = state.cells();

        assert!(matches!(
            cells[0],
            GlyphCell::Glyph { code: 0x41, tier: SizeTier::Enlarged, style: None, .. }
        ));
        assert!(cells[1].is_blank());
        assert!(matches!(
            cells[2],
            GlyphCell::Glyph {
                code: 0x27D0,
                tier: SizeTier::Enlarged,
                style: Some(StyleOverride { .. }),
                ..
            }
        ));
        assert!(matches!(
            cells[3],
            GlyphCell::Glyph { tier: SizeTier::Base, style: None, .. }
        ));
        assert!(matches!(
            cells[4],
            GlyphCell::Glyph { tier: SizeTier::Base, style: None, .. }
        ));
        assert!(cells[5..].iter().all(GlyphCell::is_blank));
    }

    #[test]
    fn test_hide_is_idempotent() {
        let mut state = new_state();
        assert!(!state.hide());
        assert_eq!(state.visibility(), Visibility::Hidden);

        state.show(EXAMPLE, Some(1920));
        assert!(state.hide());
        assert!(!state.hide());
        assert_eq!(state.visibility(), Visibility::Hidden);
    }

    #[test]
    fn test_show_hide_show_matches_single_show() {
        let mut once = new_state();
        once.show(EXAMPLE, Some(1920));

        let mut twice = new_state();
        twice.show(EXAMPLE, Some(1920));
        twice.hide();
        twice.show(EXAMPLE, Some(1920));

        assert_eq!(once.cells(), twice.cells());
        assert_eq!(once.visibility(), twice.visibility());
        assert_eq!(once.position(), twice.position());
    }

    #[test]
    fn test_override_does_not_linger() {
        let mut state = new_state();
        state.show([0x27D0; GRID_CELLS], Some(1920));
        assert!(state.cells().iter().all(|c| c.style().is_some()));

        state.show([0x0041, 0, 0, 0, 0, 0, 0, 0, 0], Some(1920));
        assert_eq!(state.cells()[0].style(), None);
        assert!(state.cells()[1..].iter().all(GlyphCell::is_blank));
    }

    #[test]
    fn test_position_top_right() {
        let geometry = Geometry::default();
        assert_eq!(
            Position::top_right(1920, &geometry),
            Position { x: 1705, y: 35 }
        );
        assert_eq!(
            Position::top_right(2560, &geometry),
            Position { x: 2345, y: 35 }
        );
        assert_eq!(Position::top_right(100, &geometry), Position { x: 0, y: 35 });
    }

    #[test]
    fn test_show_follows_display_changes() {
        let mut state = new_state();
        state.show(EXAMPLE, Some(1920));
        assert_eq!(state.position(), Some(Position { x: 1705, y: 35 }));

        state.show(EXAMPLE, Some(1280));
        assert_eq!(state.position(), Some(Position { x: 1065, y: 35 }));

        state.show(EXAMPLE, None);
        assert_eq!(state.position(), None);
        assert!(state.is_visible());
    }
}
