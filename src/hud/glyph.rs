//! Glyph cell model
//!
//! Turns the hex codes received over the control surface into the
//! presentation of a single grid cell.

use thiserror::Error;
use tiny_skia::Color;

/// Codes below this value come from the icon range with smaller natural
/// metrics and are drawn one tier larger.
pub const ENLARGE_BELOW: u16 = 0xF000;

/// Scale applied to the enlarged tier.
pub const ENLARGED_SCALE: f32 = 1.25;

/// Code point whose outline sits too high in the em box.
pub const BASELINE_FIX_CODE: u16 = 0x27D0;

/// Bottom margin applied to [`BASELINE_FIX_CODE`].
pub const BASELINE_FIX_MARGIN: f32 = -12.5;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("'{value}' is not a 16-bit hex code")]
pub struct CodeError {
    pub value: String,
}

/// Parse one case-insensitive hex code.
///
/// Only plain hex digits are accepted: no sign, no `0x` prefix, no whitespace.
pub fn parse_code(value: &str) -> Result<u16, CodeError> {
    let err = || CodeError {
        value: value.to_string(),
    };

    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(err());
    }

    u16::from_str_radix(value, 16).map_err(|_| err())
}

/// Size class of a rendered glyph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeTier {
    Base,
    Enlarged,
}

impl SizeTier {
    pub fn for_code(code: u16) -> Self {
        if code < ENLARGE_BELOW {
            SizeTier::Enlarged
        } else {
            SizeTier::Base
        }
    }

    pub fn scale(&self) -> f32 {
        match self {
            SizeTier::Base => 1.0,
            SizeTier::Enlarged => ENLARGED_SCALE,
        }
    }

    /// Pixel size for this tier given the base glyph size
    pub fn pixel_size(&self, base: f32) -> f32 {
        base * self.scale()
    }
}

/// Per-cell style correction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyleOverride {
    pub margin_bottom: f32,
}

impl StyleOverride {
    pub fn for_code(code: u16) -> Option<Self> {
        (code == BASELINE_FIX_CODE).then_some(StyleOverride {
            margin_bottom: BASELINE_FIX_MARGIN,
        })
    }

    /// Vertical shift of the glyph center, in px (positive is down).
    ///
    /// A negative bottom margin grows the centered allocation downwards,
    /// so the glyph moves by half of it.
    pub fn vertical_shift(&self) -> f32 {
        -self.margin_bottom / 2.0
    }
}

/// One of the nine grid positions
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum GlyphCell {
    #[default]
    Blank,
    Glyph {
        code: u16,
        tier: SizeTier,
        style: Option<StyleOverride>,
        foreground: Color,
    },
}

impl GlyphCell {
    /// Build the cell for `code`. Every attribute is derived from the code
    /// alone, so nothing carries over from the cell's previous contents.
    pub fn from_code(code: u16, foreground: Color) -> Self {
        if code == 0 {
            return GlyphCell::Blank;
        }

        GlyphCell::Glyph {
            code,
            tier: SizeTier::for_code(code),
            style: StyleOverride::for_code(code),
            foreground,
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, GlyphCell::Blank)
    }

    /// Character to draw. Surrogate codes have no scalar value and show as U+FFFD.
    pub fn character(&self) -> Option<char> {
        match self {
            GlyphCell::Blank => None,
            GlyphCell::Glyph { code, .. } => {
                Some(char::from_u32(u32::from(*code)).unwrap_or(char::REPLACEMENT_CHARACTER))
            }
        }
    }

    pub fn style(&self) -> Option<StyleOverride> {
        match self {
            GlyphCell::Blank => None,
            GlyphCell::Glyph { style, .. } => *style,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fg() -> Color {
        Color::from_rgba8(238, 238, 236, 255)
    }

    #[test]
    fn test_parse_code_is_case_insensitive() {
        assert_eq!(parse_code("27d0"), Ok(0x27D0));
        assert_eq!(parse_code("27D0"), Ok(0x27D0));
        assert_eq!(parse_code("ffff"), Ok(0xFFFF));
        assert_eq!(parse_code("0"), Ok(0));
    }

    #[test]
    fn test_parse_code_rejects_non_hex() {
        for bad in ["zzzz", "", " 41", "+41", "0x41", "-1", "12 3"] {
            assert!(parse_code(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_parse_code_rejects_overflow() {
        assert!(parse_code("10000").is_err());
        assert_eq!(parse_code("00041"), Ok(0x41));
    }

    #[test]
    fn test_zero_is_blank() {
        let cell = GlyphCell::from_code(0, fg());
        assert!(cell.is_blank());
        assert_eq!(cell.style(), None);
        assert_eq!(cell.character(), None);
    }

    #[test]
    fn test_size_tiers_split_at_threshold() {
        assert_eq!(SizeTier::for_code(0x0041), SizeTier::Enlarged);
        assert_eq!(SizeTier::for_code(0xEFFF), SizeTier::Enlarged);
        assert_eq!(SizeTier::for_code(0xF000), SizeTier::Base);
        assert_eq!(SizeTier::for_code(0xF041), SizeTier::Base);
        assert_eq!(SizeTier::Enlarged.pixel_size(32.0), 40.0);
        assert_eq!(SizeTier::Base.pixel_size(32.0), 32.0);
    }

    #[test]
    fn test_only_sentinel_gets_override() {
        let fixed = GlyphCell::from_code(0x27D0, fg());
        assert_eq!(
            fixed.style(),
            Some(StyleOverride {
                margin_bottom: -12.5
            })
        );
        assert_eq!(GlyphCell::from_code(0x27D1, fg()).style(), None);
        assert_eq!(GlyphCell::from_code(0xF000, fg()).style(), None);
    }

    #[test]
    fn test_override_shifts_glyph_down() {
        let style = StyleOverride::for_code(BASELINE_FIX_CODE).unwrap();
        assert_eq!(style.vertical_shift(), 6.25);
    }

    #[test]
    fn test_surrogate_renders_replacement_char() {
        let cell = GlyphCell::from_code(0xD800, fg());
        assert_eq!(cell.character(), Some(char::REPLACEMENT_CHARACTER));
        assert_eq!(GlyphCell::from_code(0x41, fg()).character(), Some('A'));
    }

    #[test]
    fn test_glyph_copies_foreground() {
        match GlyphCell::from_code(0xF001, fg()) {
            GlyphCell::Glyph { foreground, .. } => assert_eq!(foreground, fg()),
            GlyphCell::Blank => panic!("expected glyph"),
        }
    }
}
