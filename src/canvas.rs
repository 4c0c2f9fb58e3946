//! # Page Canvas
//!
//! The drawing surface the card renderer writes to. A canvas is an
//! append-only list of positioned draw commands for one page, in PDF
//! coordinates; the PDF writer serializes it once the page is complete.

use crate::font::FontRole;
use crate::image_fit::ResolvedImage;
use crate::model::{Color, Rect};

/// What to draw on the page.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    /// Stroke the outline of a rectangle.
    StrokeRect {
        rect: Rect,
        color: Color,
        line_width: f64,
    },
    /// One line of text. `(x, y)` is the left end of the baseline.
    Text {
        x: f64,
        y: f64,
        text: String,
        role: FontRole,
        size: f64,
        color: Color,
    },
    /// A raster image scaled into `rect`.
    Image {
        rect: Rect,
        image: Box<ResolvedImage>,
    },
}

/// One page worth of draw commands.
#[derive(Debug, Clone, PartialEq)]
pub struct PageCanvas {
    pub width: f64,
    pub height: f64,
    commands: Vec<DrawCommand>,
}

impl PageCanvas {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
        }
    }

    pub fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Every text string on the page, in drawing order.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|cmd| match cmd {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }

    /// Every placed image with its rectangle.
    pub fn images(&self) -> impl Iterator<Item = (&Rect, &ResolvedImage)> {
        self.commands.iter().filter_map(|cmd| match cmd {
            DrawCommand::Image { rect, image } => Some((rect, image.as_ref())),
            _ => None,
        })
    }

    /// Number of card borders on the page, i.e. the number of cards.
    pub fn card_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|cmd| matches!(cmd, DrawCommand::StrokeRect { .. }))
            .count()
    }
}
