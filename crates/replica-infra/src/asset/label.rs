//! Text labels for placeholder images.
//!
//! Faces are discovered with `fontdb`, outlined with `ttf-parser` and filled
//! into a `tiny-skia` pixmap.

use std::fmt;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use tiny_skia::{FillRule, Paint, PathBuilder, Pixmap, Transform};
use ttf_parser::{Face, GlyphId};

/// One loaded font face, shared between renderer clones.
#[derive(Clone)]
pub struct LabelFont {
    family: String,
    data: Arc<Vec<u8>>,
    index: u32,
}

impl fmt::Debug for LabelFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LabelFont")
            .field("family", &self.family)
            .field("bytes", &self.data.len())
            .field("index", &self.index)
            .finish()
    }
}

impl LabelFont {
    /// Font from `path` when given and loadable, else the system sans-serif.
    pub fn load(path: Option<&Path>) -> Option<Self> {
        if let Some(path) = path {
            let mut db = fontdb::Database::new();
            match db.load_font_file(path) {
                Ok(()) => {
                    if let Some(font) = db.faces().next().and_then(|face| Self::from_db(&db, face.id)) {
                        return Some(font);
                    }
                    tracing::warn!(path = %path.display(), "placeholder font has no usable face");
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "cannot load placeholder font");
                }
            }
        }
        Self::system()
    }

    /// The system sans-serif face, or any installed face. Discovered once.
    pub fn system() -> Option<Self> {
        static SYSTEM: OnceLock<Option<LabelFont>> = OnceLock::new();
        SYSTEM
            .get_or_init(|| {
                let mut db = fontdb::Database::new();
                db.load_system_fonts();
                let query = fontdb::Query {
                    families: &[fontdb::Family::SansSerif],
                    ..Default::default()
                };
                let font = db
                    .query(&query)
                    .or_else(|| db.faces().next().map(|face| face.id))
                    .and_then(|id| Self::from_db(&db, id));
                match &font {
                    Some(font) => tracing::debug!(family = %font.family, "placeholder font selected"),
                    None => tracing::warn!("no system font found, placeholders will be unlabelled"),
                }
                font
            })
            .clone()
    }

    fn from_db(db: &fontdb::Database, id: fontdb::ID) -> Option<Self> {
        let family = db
            .face(id)
            .and_then(|face| face.families.first())
            .map(|(name, _)| name.clone())
            .unwrap_or_default();
        let (data, index) = db.with_face_data(id, |data, index| (data.to_vec(), index))?;
        Face::parse(&data, index).ok()?;
        Some(Self {
            family,
            data: Arc::new(data),
            index,
        })
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    fn face(&self) -> Option<Face<'_>> {
        Face::parse(&self.data, self.index).ok()
    }

    /// Advance width of `text` at `size` pixels per em.
    pub fn measure(&self, text: &str, size: f32) -> f32 {
        let Some(face) = self.face() else {
            return 0.0;
        };
        let scale = size / f32::from(face.units_per_em());
        text.chars()
            .map(|c| advance(&face, glyph(&face, c)) * scale)
            .sum()
    }

    /// Ascent and descent in pixels at `size`, both positive.
    pub fn vertical_metrics(&self, size: f32) -> (f32, f32) {
        let Some(face) = self.face() else {
            return (size, 0.0);
        };
        let scale = size / f32::from(face.units_per_em());
        (
            f32::from(face.ascender()) * scale,
            f32::from(face.descender()).abs() * scale,
        )
    }

    /// Fill `text` into `pixmap`, pen starting at `x` on the `baseline`.
    pub fn draw(&self, pixmap: &mut Pixmap, text: &str, size: f32, x: f32, baseline: f32, paint: &Paint) {
        let Some(face) = self.face() else {
            return;
        };
        let scale = size / f32::from(face.units_per_em());
        let mut builder = PathBuilder::new();
        let mut pen_x = x;
        for c in text.chars() {
            let id = glyph(&face, c);
            let mut outline = GlyphOutline {
                builder: &mut builder,
                scale,
                x: pen_x,
                baseline,
            };
            face.outline_glyph(id, &mut outline);
            pen_x += advance(&face, id) * scale;
        }
        if let Some(path) = builder.finish() {
            pixmap.fill_path(&path, paint, FillRule::Winding, Transform::identity(), None);
        }
    }
}

fn glyph(face: &Face<'_>, c: char) -> GlyphId {
    face.glyph_index(c).unwrap_or(GlyphId(0))
}

fn advance(face: &Face<'_>, id: GlyphId) -> f32 {
    face.glyph_hor_advance(id).map_or(0.0, f32::from)
}

/// Font units to pixmap coordinates: scaled, shifted, y flipped.
struct GlyphOutline<'a> {
    builder: &'a mut PathBuilder,
    scale: f32,
    x: f32,
    baseline: f32,
}

impl GlyphOutline<'_> {
    fn px(&self, x: f32) -> f32 {
        self.x + x * self.scale
    }

    fn py(&self, y: f32) -> f32 {
        self.baseline - y * self.scale
    }
}

impl ttf_parser::OutlineBuilder for GlyphOutline<'_> {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = (self.px(x), self.py(y));
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = (self.px(x), self.py(y));
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1, x, y) = (self.px(x1), self.py(y1), self.px(x), self.py(y));
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = (self.px(x1), self.py(y1));
        let (x2, y2) = (self.px(x2), self.py(y2));
        let (x, y) = (self.px(x), self.py(y));
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn unreadable_font_file_falls_back_to_system() {
        let tmp = TempDir::new().unwrap();
        let bogus = tmp.path().join("not-a-font.ttf");
        std::fs::write(&bogus, b"definitely not a font").unwrap();

        let loaded = LabelFont::load(Some(bogus.as_path())).map(|f| f.family().to_string());
        let system = LabelFont::system().map(|f| f.family().to_string());
        assert_eq!(loaded, system);
    }

    #[test]
    fn width_scales_with_size() {
        let Some(font) = LabelFont::system() else {
            return;
        };
        let small = font.measure("PLACEHOLDER FOR", 10.0);
        let large = font.measure("PLACEHOLDER FOR", 40.0);
        assert!(small > 0.0);
        assert!((large / small - 4.0).abs() < 0.01);
        assert_eq!(font.measure("", 40.0), 0.0);
    }

    #[test]
    fn drawing_marks_pixels() {
        let Some(font) = LabelFont::system() else {
            return;
        };
        let mut pixmap = Pixmap::new(200, 60).unwrap();
        let mut paint = Paint::default();
        paint.set_color_rgba8(255, 255, 255, 255);

        let (ascent, _) = font.vertical_metrics(32.0);
        font.draw(&mut pixmap, "HI", 32.0, 10.0, ascent + 4.0, &paint);

        assert!(pixmap.data().chunks_exact(4).any(|p| p[3] > 0));
    }
}
