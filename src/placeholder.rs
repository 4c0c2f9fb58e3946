//! # Placeholder Images
//!
//! The stand-in raster used whenever a card's real image cannot be
//! obtained: a flat neutral canvas with the card's term centered on it.
//!
//! Producing a placeholder never fails. Without a TrueType face to draw the
//! label with, the canvas comes back blank and [`Placeholder::labelled`] is
//! false so the card renderer can print the term over it instead.

use image::{Rgb, RgbImage};
use rusttype::{point, Font, Scale};
use serde::{Deserialize, Serialize};

use crate::font::FontContext;

/// Appearance of the generated placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaceholderStyle {
    /// Canvas size in pixels.
    pub width: u32,
    pub height: u32,
    pub background: [u8; 3],
    pub label_color: [u8; 3],
    /// Label size in pixels before shrink-to-fit.
    pub label_size: f32,
}

impl Default for PlaceholderStyle {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            background: [240, 240, 240],
            label_color: [80, 80, 80],
            label_size: 36.0,
        }
    }
}

/// A generated placeholder canvas.
#[derive(Debug, Clone)]
pub struct Placeholder {
    pub image: RgbImage,
    /// Whether the label was rasterized onto the canvas.
    pub labelled: bool,
}

pub struct PlaceholderGenerator {
    style: PlaceholderStyle,
    font: Option<Font<'static>>,
}

impl PlaceholderGenerator {
    /// Use the context's TrueType face for labels, if it has one.
    pub fn new(style: PlaceholderStyle, fonts: &FontContext) -> Self {
        let font = fonts
            .truetype_data()
            .and_then(|data| Font::try_from_vec(Vec::clone(&data)));
        if font.is_none() {
            log::debug!("Placeholder labels disabled: no TrueType face available");
        }
        Self { style, font }
    }

    /// A generator that only ever produces blank canvases.
    pub fn without_font(style: PlaceholderStyle) -> Self {
        Self { style, font: None }
    }

    pub fn style(&self) -> &PlaceholderStyle {
        &self.style
    }

    pub fn make(&self, label: &str) -> Placeholder {
        let width = self.style.width.max(1);
        let height = self.style.height.max(1);
        let mut image = RgbImage::from_pixel(width, height, Rgb(self.style.background));

        let labelled = match &self.font {
            Some(font) if !label.trim().is_empty() => {
                draw_label_centered(&mut image, font, &self.style, label.trim())
            }
            _ => false,
        };

        Placeholder { image, labelled }
    }
}

/// Advance width of `text` at `scale`, in pixels.
fn label_width(font: &Font<'static>, scale: Scale, text: &str) -> f32 {
    font.layout(text, scale, point(0.0, 0.0))
        .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
        .fold(0.0, f32::max)
}

/// Draw `text` centered on the canvas, shrinking it to 90% of the canvas
/// width if needed. Returns false when nothing could be drawn.
fn draw_label_centered(
    img: &mut RgbImage,
    font: &Font<'static>,
    style: &PlaceholderStyle,
    text: &str,
) -> bool {
    let max_width = img.width() as f32 * 0.9;
    let mut px = style.label_size.max(1.0);
    let mut width = label_width(font, Scale::uniform(px), text);
    if width > max_width && width > 0.0 {
        px = (px * max_width / width).max(1.0);
        width = label_width(font, Scale::uniform(px), text);
    }
    if width <= 0.0 {
        return false;
    }

    let scale = Scale::uniform(px);
    let vm = font.v_metrics(scale);
    let text_height = (vm.ascent - vm.descent).max(1.0);
    let x = (img.width() as f32 - width) / 2.0;
    let baseline = (img.height() as f32 - text_height) / 2.0 + vm.ascent;

    let color = style.label_color;
    let mut drawn = false;
    for glyph in font.layout(text, scale, point(x, baseline)) {
        let Some(bb) = glyph.pixel_bounding_box() else {
            continue;
        };
        glyph.draw(|gx, gy, v| {
            let tx = gx as i32 + bb.min.x;
            let ty = gy as i32 + bb.min.y;
            if tx < 0 || ty < 0 {
                return;
            }
            let (tx, ty) = (tx as u32, ty as u32);
            if tx >= img.width() || ty >= img.height() || v <= 0.0 {
                return;
            }
            let dst = img.get_pixel_mut(tx, ty);
            let inv = 1.0 - v;
            for c in 0..3 {
                dst.0[c] = (color[c] as f32 * v + dst.0[c] as f32 * inv) as u8;
            }
            drawn = true;
        });
    }
    drawn
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_placeholder_has_fixed_size_and_background() {
        let generator = PlaceholderGenerator::without_font(PlaceholderStyle::default());
        let placeholder = generator.make("perro");
        assert_eq!(placeholder.image.dimensions(), (800, 600));
        assert!(!placeholder.labelled);
        assert!(placeholder
            .image
            .pixels()
            .all(|p| p.0 == [240, 240, 240]));
    }

    #[test]
    fn test_zero_sized_style_still_produces_canvas() {
        let style = PlaceholderStyle {
            width: 0,
            height: 0,
            ..Default::default()
        };
        let placeholder = PlaceholderGenerator::without_font(style).make("x");
        assert_eq!(placeholder.image.dimensions(), (1, 1));
    }

    #[test]
    fn test_standard_fonts_disable_labels() {
        let generator =
            PlaceholderGenerator::new(PlaceholderStyle::default(), &FontContext::standard());
        assert!(!generator.make("gato").labelled);
    }

    #[test]
    fn test_label_drawn_with_system_font_when_available() {
        let path = std::path::Path::new("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf");
        let Ok(data) = std::fs::read(path) else {
            return;
        };
        let fonts = FontContext::from_ttf("DejaVuSans", data, None).unwrap();
        let generator = PlaceholderGenerator::new(PlaceholderStyle::default(), &fonts);

        let placeholder = generator.make("źrebię");
        assert!(placeholder.labelled);
        assert!(placeholder.image.pixels().any(|p| p.0 != [240, 240, 240]));

        let blank = generator.make("   ");
        assert!(!blank.labelled);
    }
}
