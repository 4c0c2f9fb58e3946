//! # Card Model
//!
//! The plain values that flow through the pipeline: one `FlashcardRecord`
//! per usable input row, plus the small geometric and color types shared by
//! layout, rendering and PDF serialization.
//!
//! All coordinates are PDF points (1/72 inch) with the origin at the
//! bottom-left corner of the page.

use serde::{Deserialize, Serialize};

/// Points per millimetre.
pub const MM: f64 = 72.0 / 25.4;

/// Convert millimetres to points.
pub fn mm(value: f64) -> f64 {
    value * MM
}

/// One flashcard, as read from a row of the vocabulary table.
///
/// Built once by the input reader and only ever read afterwards. `term` and
/// `translation` may be empty; a row with term, translation and image all
/// blank never becomes a record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlashcardRecord {
    pub term: String,
    pub translation: String,
    /// Local path, `file://` path, `data:` URI or HTTP(S) URL. May be empty.
    pub image_locator: String,
    /// Example sentence printed under the term.
    pub example_primary: Option<String>,
    /// Example sentence printed above the translation.
    pub example_secondary: Option<String>,
    /// 1-based data row in the source table, for diagnostics.
    pub source_row: usize,
}

impl FlashcardRecord {
    pub fn new(term: impl Into<String>, translation: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            translation: translation.into(),
            ..Default::default()
        }
    }

    pub fn with_image(mut self, locator: impl Into<String>) -> Self {
        self.image_locator = locator.into();
        self
    }

    pub fn with_examples(mut self, primary: Option<&str>, secondary: Option<&str>) -> Self {
        self.example_primary = primary.map(str::to_string);
        self.example_secondary = secondary.map(str::to_string);
        self
    }
}

/// An axis-aligned rectangle in page coordinates. `(x, y)` is the
/// bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn top(&self) -> f64 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    /// Shrink by `pad` on every side.
    pub fn inset(&self, pad: f64) -> Rect {
        Rect {
            x: self.x + pad,
            y: self.y + pad,
            width: self.width - 2.0 * pad,
            height: self.height - 2.0 * pad,
        }
    }

    /// True when the interiors of the two rectangles intersect. Shared edges
    /// do not count as overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        const EPS: f64 = 1e-9;
        self.x < other.right() - EPS
            && other.x < self.right() - EPS
            && self.y < other.top() - EPS
            && other.y < self.top() - EPS
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// An RGB color with components in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Color {
    pub const BLACK: Color = Color { r: 0.0, g: 0.0, b: 0.0 };
    pub const GRAY: Color = Color { r: 0.5, g: 0.5, b: 0.5 };
}

/// Standard page sizes in points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    A4,
    A5,
    Letter,
    Custom {
        width: f64,
        height: f64,
    },
}

impl PageSize {
    /// Returns (width, height) in points, portrait.
    pub fn dimensions(&self) -> (f64, f64) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::A5 => (419.53, 595.28),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Custom { width, height } => (*width, *height),
        }
    }
}

/// Document metadata embedded in the PDF Info dictionary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub title: Option<String>,
    pub author: Option<String>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            title: Some("Flashcards".to_string()),
            author: None,
        }
    }
}
