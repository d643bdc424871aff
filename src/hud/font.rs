//! Glyph outlines for the single HUD typeface

use fontdb::{Database, Family, Query};
use thiserror::Error;
use tiny_skia::{Color, FillRule, Paint, PathBuilder, Pixmap, Transform};
use ttf_parser::{Face, FaceParsingError, OutlineBuilder};

#[derive(Error, Debug)]
pub enum FontError {
    #[error("No usable font found (wanted '{0}')")]
    NotFound(String),
    #[error("Failed to parse font face: {0}")]
    Parse(#[from] FaceParsingError),
}

/// The typeface every cell is drawn with
pub struct GlyphFont {
    family: String,
    data: Vec<u8>,
    index: u32,
}

impl GlyphFont {
    /// Look up `family` among the system fonts, falling back to the
    /// generic sans-serif face.
    pub fn load(family: &str) -> Result<Self, FontError> {
        let mut db = Database::new();
        db.load_system_fonts();

        let id = db
            .query(&Query {
                families: &[Family::Name(family)],
                ..Query::default()
            })
            .or_else(|| {
                log::warn!("Font '{}' not installed, falling back to sans-serif", family);
                db.query(&Query {
                    families: &[Family::SansSerif],
                    ..Query::default()
                })
            })
            .ok_or_else(|| FontError::NotFound(family.to_string()))?;

        let (data, index) = db
            .with_face_data(id, |data, index| (data.to_vec(), index))
            .ok_or_else(|| FontError::NotFound(family.to_string()))?;

        let resolved = db
            .face(id)
            .and_then(|info| info.families.first().map(|(name, _)| name.clone()))
            .unwrap_or_else(|| family.to_string());

        // Fail at startup rather than on the first draw
        Face::parse(&data, index)?;

        Ok(Self {
            family: resolved,
            data,
            index,
        })
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    /// Draw `ch` at `size` px, centered on `center`.
    ///
    /// Characters missing from the face are skipped.
    pub fn draw(
        &self,
        pixmap: &mut Pixmap,
        ch: char,
        size: f32,
        center: (f32, f32),
        color: Color,
    ) -> Result<(), FontError> {
        let face = Face::parse(&self.data, self.index)?;

        let Some(glyph) = face.glyph_index(ch) else {
            log::debug!("'{}' has no glyph for U+{:04X}", self.family, ch as u32);
            return Ok(());
        };

        let scale = size / f32::from(face.units_per_em());
        let metrics = LineMetrics {
            advance: f32::from(face.glyph_hor_advance(glyph).unwrap_or(0)) * scale,
            ascender: f32::from(face.ascender()) * scale,
            descender: f32::from(face.descender()) * scale,
        };

        let mut sink = PathSink(PathBuilder::new());
        if face.outline_glyph(glyph, &mut sink).is_none() {
            return Ok(());
        }
        let Some(path) = sink.0.finish() else {
            return Ok(());
        };

        let (x, baseline) = metrics.origin(center);
        // Font units are y-up
        let transform = Transform::from_row(scale, 0.0, 0.0, -scale, x, baseline);

        let mut paint = Paint::default();
        paint.set_color(color);
        paint.anti_alias = true;

        pixmap.fill_path(&path, &paint, FillRule::Winding, transform, None);
        Ok(())
    }
}

/// Glyph metrics scaled to px
#[derive(Debug, Clone, Copy)]
struct LineMetrics {
    advance: f32,
    ascender: f32,
    descender: f32,
}

impl LineMetrics {
    /// Pen position and baseline that center the logical box on `center`
    fn origin(&self, center: (f32, f32)) -> (f32, f32) {
        let (cx, cy) = center;
        let line_height = self.ascender - self.descender;
        let top = cy - line_height / 2.0;
        (cx - self.advance / 2.0, top + self.ascender)
    }
}

struct PathSink(PathBuilder);

impl OutlineBuilder for PathSink {
    fn move_to(&mut self, x: f32, y: f32) {
        self.0.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.0.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.0.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.0.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.0.close();
    }
}
