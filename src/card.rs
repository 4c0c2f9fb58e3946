//! # Card Renderer
//!
//! Draws one flashcard into its slot rectangle:
//!
//! ```text
//! ┌──────────────────────────┐
//! │           TERM           │  bold, anchored to the top
//! │     primary sentence     │
//! │   ┌──────────────────┐   │
//! │   │      image       │   │  band = 52% of interior height,
//! │   └──────────────────┘   │  at most 90% of interior width
//! │    secondary sentence    │
//! │       translation        │  regular, anchored to the bottom
//! └──────────────────────────┘
//! ```
//!
//! Image problems never escape a card: a locator that cannot be loaded
//! becomes a placeholder inside the resolver, and an image that cannot be
//! fitted is replaced by a placeholder here. Only a placeholder that itself
//! cannot be fitted is reported, because then no card can show an image.

use serde::{Deserialize, Serialize};

use crate::canvas::{DrawCommand, PageCanvas};
use crate::error::{CardgridError, Result};
use crate::font::{FontContext, FontRole};
use crate::image_fit::{fit, ResolvedImage};
use crate::image_loader::{ImageOrigin, ImageResolver, LoadedImage};
use crate::model::{mm, Color, FlashcardRecord, Rect};

/// Fixed visual policy of a card. Sizes are in points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CardStyle {
    /// Inset between the border and the content.
    pub padding: f64,
    pub border_color: Color,
    pub border_width: f64,
    pub text_color: Color,
    pub term_size: f64,
    pub translation_size: f64,
    pub sentence_size: f64,
    /// Extra distance between a headline baseline and its sentence.
    pub sentence_spacing: f64,
    /// Distance of the headline text from the top/bottom interior edge.
    pub edge_spacing: f64,
    /// Lower bound when shrinking text to the interior width.
    pub min_font_size: f64,
    /// Fraction of the interior height reserved for the image.
    pub image_height_ratio: f64,
    /// Fraction of the interior width the image may use.
    pub image_max_width_ratio: f64,
    /// Vertical slack kept inside the image band.
    pub image_band_slack: f64,
}

impl Default for CardStyle {
    fn default() -> Self {
        Self {
            padding: mm(6.0),
            border_color: Color::GRAY,
            border_width: 0.5,
            text_color: Color::BLACK,
            term_size: 20.0,
            translation_size: 20.0,
            sentence_size: 10.0,
            sentence_spacing: 10.0,
            edge_spacing: 2.0,
            min_font_size: 6.0,
            image_height_ratio: 0.52,
            image_max_width_ratio: 0.9,
            image_band_slack: 4.0,
        }
    }
}

/// The box an image is fitted into, and centered within.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageBand {
    /// The full reserved band, centered vertically in the interior.
    pub area: Rect,
    pub max_width: f64,
    pub max_height: f64,
}

impl ImageBand {
    /// Rectangle for an image of the given display size, centered in the band.
    pub fn place(&self, display_width: f64, display_height: f64) -> Rect {
        Rect {
            x: self.area.x + (self.area.width - display_width) / 2.0,
            y: self.area.y + (self.area.height - display_height) / 2.0,
            width: display_width,
            height: display_height,
        }
    }
}

pub struct CardRenderer<'a> {
    style: &'a CardStyle,
    fonts: &'a FontContext,
    resolver: &'a ImageResolver,
    raster_scale: f64,
}

impl<'a> CardRenderer<'a> {
    pub fn new(
        style: &'a CardStyle,
        fonts: &'a FontContext,
        resolver: &'a ImageResolver,
        raster_scale: f64,
    ) -> Self {
        Self {
            style,
            fonts,
            resolver,
            raster_scale,
        }
    }

    /// Resolve the record's image and draw the card.
    pub fn render(&self, canvas: &mut PageCanvas, rect: Rect, record: &FlashcardRecord) -> Result<()> {
        let image = self.resolver.resolve(&record.image_locator, &record.term);
        self.render_with_image(canvas, rect, record, image)
    }

    /// Draw the card with an image that was already resolved for `record`.
    pub fn render_with_image(
        &self,
        canvas: &mut PageCanvas,
        rect: Rect,
        record: &FlashcardRecord,
        image: LoadedImage,
    ) -> Result<()> {
        let style = self.style;
        let inner = rect.inset(style.padding);
        let center_x = rect.center_x();

        canvas.push(DrawCommand::StrokeRect {
            rect,
            color: style.border_color,
            line_width: style.border_width,
        });

        let term_y = inner.top() - style.term_size - style.edge_spacing;
        self.centered_text(canvas, &record.term, FontRole::Bold, style.term_size, center_x, term_y, inner.width);

        if let Some(sentence) = non_empty(&record.example_primary) {
            let y = term_y - style.sentence_size - style.sentence_spacing;
            self.centered_text(canvas, sentence, FontRole::Regular, style.sentence_size, center_x, y, inner.width);
        }

        let band = self.image_band(inner);
        if band.max_width >= 1.0 && band.max_height >= 1.0 {
            let fitted = self.fit_or_placeholder(image, &band, record)?;
            let image_rect = band.place(fitted.display_width, fitted.display_height);
            let overlay = match &fitted.origin {
                ImageOrigin::Placeholder { label, labelled: false } => Some(label.clone()),
                _ => None,
            };
            canvas.push(DrawCommand::Image {
                rect: image_rect,
                image: Box::new(fitted),
            });
            if let Some(label) = overlay {
                self.placeholder_label(canvas, &label, &image_rect);
            }
        } else {
            log::debug!(
                "Row {}: no room for an image in a {:.1}×{:.1} pt card",
                record.source_row,
                rect.width,
                rect.height
            );
        }

        let translation_y = inner.y + style.translation_size + style.edge_spacing;
        self.centered_text(
            canvas,
            &record.translation,
            FontRole::Regular,
            style.translation_size,
            center_x,
            translation_y,
            inner.width,
        );

        if let Some(sentence) = non_empty(&record.example_secondary) {
            let y = translation_y + style.sentence_size + style.sentence_spacing;
            self.centered_text(canvas, sentence, FontRole::Regular, style.sentence_size, center_x, y, inner.width);
        }

        Ok(())
    }

    /// The image band for a card interior.
    pub fn image_band(&self, inner: Rect) -> ImageBand {
        let height = inner.height * self.style.image_height_ratio;
        ImageBand {
            area: Rect {
                x: inner.x,
                y: inner.y + (inner.height - height) / 2.0,
                width: inner.width,
                height,
            },
            max_width: inner.width * self.style.image_max_width_ratio,
            max_height: height - self.style.image_band_slack,
        }
    }

    fn fit_or_placeholder(
        &self,
        image: LoadedImage,
        band: &ImageBand,
        record: &FlashcardRecord,
    ) -> Result<ResolvedImage> {
        match fit(image, band.max_width, band.max_height, self.raster_scale) {
            Ok(fitted) => Ok(fitted),
            Err(e) => {
                log::warn!(
                    "Row {}: image could not be fitted ({}), using placeholder",
                    record.source_row,
                    e
                );
                let placeholder = self.resolver.placeholder(&record.term);
                fit(placeholder, band.max_width, band.max_height, self.raster_scale)
                    .map_err(|e| CardgridError::Placeholder(e.to_string()))
            }
        }
    }

    /// Print the placeholder's label over a blank placeholder raster.
    fn placeholder_label(&self, canvas: &mut PageCanvas, label: &str, image_rect: &Rect) {
        let size = self.style.term_size.min(image_rect.height * 0.5);
        let baseline = image_rect.y + (image_rect.height - size * 0.7) / 2.0;
        self.centered_text(
            canvas,
            label,
            FontRole::Regular,
            size,
            image_rect.center_x(),
            baseline,
            image_rect.width * 0.9,
        );
    }

    /// Draw `text` centered on `center_x`, shrunk to `max_width` if needed.
    #[allow(clippy::too_many_arguments)]
    fn centered_text(
        &self,
        canvas: &mut PageCanvas,
        text: &str,
        role: FontRole,
        size: f64,
        center_x: f64,
        baseline: f64,
        max_width: f64,
    ) {
        if text.is_empty() {
            return;
        }
        let size = self.fit_font_size(text, role, size, max_width);
        let width = self.fonts.measure_string(text, role, size);
        canvas.push(DrawCommand::Text {
            x: center_x - width / 2.0,
            y: baseline,
            text: text.to_string(),
            role,
            size,
            color: self.style.text_color,
        });
    }

    /// Largest size up to `size` at which `text` fits `max_width`, but not
    /// below the style's minimum.
    pub fn fit_font_size(&self, text: &str, role: FontRole, size: f64, max_width: f64) -> f64 {
        let width = self.fonts.measure_string(text, role, size);
        if width <= max_width || width <= 0.0 {
            return size;
        }
        (size * max_width / width).max(self.style.min_font_size.min(size))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}
