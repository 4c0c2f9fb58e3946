//! # cardgrid
//!
//! Turns a vocabulary table into printable flashcard sheets.
//!
//! Each row of the table (term, translation, image, up to two example
//! sentences) becomes one card. Cards are placed on fixed A4 pages in a
//! 3×3 grid, in reading order, and the result is written as a PDF that can
//! be printed and cut along the card borders.
//!
//! The pipeline never stops for a bad image. A missing file, a dead URL or
//! an undecodable download turns into a placeholder that carries the card's
//! term, and the run goes on.
//!
//! ## Architecture
//!
//! ```text
//! CSV table
//!       ↓
//!   [input]  header aliasing, blank-row filtering → FlashcardRecord
//!       ↓
//!   [layout]  page geometry → one CardSlot per record
//!       ↓
//!   [image_loader / placeholder / image_fit]
//!                   locator → raster (or placeholder) → fitted image
//!       ↓
//!   [card]  border, text and image draw commands on a PageCanvas
//!       ↓
//!   [pdf]  serialize canvases to PDF bytes
//! ```
//!
//! [`document::generate`] runs all of it for a file on disk.

pub mod canvas;
pub mod card;
pub mod config;
pub mod document;
pub mod error;
pub mod font;
pub mod image_fit;
pub mod image_loader;
pub mod input;
pub mod layout;
pub mod model;
pub mod pdf;
pub mod placeholder;

pub use config::GeneratorConfig;
pub use document::{generate, Summary};
pub use error::{CardgridError, Result};
pub use model::FlashcardRecord;

use font::FontContext;
use image_loader::ImageResolver;

/// Render records to PDF bytes with the given configuration.
///
/// Fonts are loaded from `config.font` and images resolved as configured.
/// Unlike [`generate`], an empty record list is accepted and yields one
/// blank page.
pub fn render(records: &[FlashcardRecord], config: &GeneratorConfig) -> Result<Vec<u8>> {
    let fonts = FontContext::load(&config.font);
    let resolver = ImageResolver::new(&config.image, &fonts);
    let (bytes, _) = document::render_pdf(records, config, &fonts, &resolver)?;
    Ok(bytes)
}
