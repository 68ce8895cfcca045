//! Placeholder images for assets that could not be downloaded.
//!
//! A flat grey canvas labelled "PLACEHOLDER FOR" and the asset's file name,
//! encoded in whatever format the file extension promises so browsers
//! render it.

use std::io::Cursor;
use std::path::Path;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tiny_skia::{Color, Paint, Pixmap};

use replica_core::asset::PlaceholderRenderer;
use replica_types::config::AssetConfig;

use super::label::LabelFont;

const BACKGROUND: Rgb<u8> = Rgb([204, 204, 204]);
const FOREGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const HEADING: &str = "PLACEHOLDER FOR";
const FONT_SIZE: f32 = 40.0;
const MARGIN: f32 = 10.0;

/// `image`-crate implementation of [`PlaceholderRenderer`].
#[derive(Debug, Clone)]
pub struct ImagePlaceholderRenderer {
    width: u32,
    height: u32,
    font: Option<LabelFont>,
}

impl ImagePlaceholderRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            font: LabelFont::system(),
        }
    }

    pub fn from_config(config: &AssetConfig) -> Self {
        Self {
            font: LabelFont::load(config.placeholder_font.as_deref().map(Path::new)),
            ..Self::new(config.placeholder_width, config.placeholder_height)
        }
    }

    pub fn has_label_font(&self) -> bool {
        self.font.is_some()
    }

    fn canvas(&self, filename: &str) -> RgbImage {
        let Some(mut pixmap) = Pixmap::new(self.width, self.height) else {
            return RgbImage::from_pixel(self.width, self.height, BACKGROUND);
        };
        let [r, g, b] = BACKGROUND.0;
        pixmap.fill(Color::from_rgba8(r, g, b, 255));

        if let Some(font) = &self.font {
            self.draw_label(&mut pixmap, font, filename);
        }

        // Opaque background, so premultiplied RGBA is plain RGBA.
        let rgb: Vec<u8> = pixmap
            .data()
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect();
        RgbImage::from_raw(self.width, self.height, rgb)
            .unwrap_or_else(|| RgbImage::from_pixel(self.width, self.height, BACKGROUND))
    }

    fn draw_label(&self, pixmap: &mut Pixmap, font: &LabelFont, filename: &str) {
        let (width, height) = (self.width as f32, self.height as f32);

        let widest = font.measure(HEADING, 1.0).max(font.measure(filename, 1.0));
        let available = (width - 2.0 * MARGIN).max(1.0);
        let size = if widest > 0.0 {
            (available / widest).min(FONT_SIZE)
        } else {
            FONT_SIZE
        };

        let (ascent, descent) = font.vertical_metrics(size);
        let line_height = (ascent + descent) * 1.2;
        let block_height = line_height + ascent + descent;
        let top = ((height - block_height) / 2.0).max(0.0);

        let mut paint = Paint::default();
        let [r, g, b] = FOREGROUND.0;
        paint.set_color_rgba8(r, g, b, 255);
        paint.anti_alias = true;

        for (index, line) in [HEADING, filename].into_iter().enumerate() {
            let left = ((width - font.measure(line, size)) / 2.0).max(0.0);
            let baseline = top + index as f32 * line_height + ascent;
            font.draw(pixmap, line, size, left, baseline, &paint);
        }
    }

    fn svg(&self, filename: &str) -> Vec<u8> {
        let label = escape_xml(filename);
        format!(
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}"><rect width="100%" height="100%" fill="#cccccc"/><text x="50%" y="45%" fill="#ffffff" font-family="monospace" font-size="28" text-anchor="middle">{HEADING}</text><text x="50%" y="58%" fill="#ffffff" font-family="monospace" font-size="28" text-anchor="middle">{label}</text></svg>"##,
            w = self.width,
            h = self.height,
        )
        .into_bytes()
    }
}

impl Default for ImagePlaceholderRenderer {
    fn default() -> Self {
        Self::from_config(&AssetConfig::default())
    }
}

impl PlaceholderRenderer for ImagePlaceholderRenderer {
    fn render(&self, filename: &str) -> Vec<u8> {
        let extension = filename
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        if extension == "svg" {
            return self.svg(filename);
        }

        let format = match extension.as_str() {
            "jpg" | "jpeg" => ImageFormat::Jpeg,
            "gif" => ImageFormat::Gif,
            "bmp" => ImageFormat::Bmp,
            _ => ImageFormat::Png,
        };

        let image = DynamicImage::ImageRgb8(self.canvas(filename));
        match encode(&image, format) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(filename, ?format, error = %e, "placeholder encode failed, falling back to PNG");
                encode(&image, ImageFormat::Png).unwrap_or_default()
            }
        }
    }
}

fn encode(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, image::ImageError> {
    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), format)?;
    Ok(bytes)
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
