//! # Document Assembly
//!
//! Drives the pipeline from records to PDF bytes:
//!
//! ```text
//! records ──► GridPlanner::plan ──► slots grouped by page
//!                                        │
//!             per page: prefetch images (rayon pool, input order kept)
//!                                        │
//!             CardRenderer, one card at a time ──► PageCanvas
//!                                        │
//!                           PdfWriter::write ──► bytes
//! ```
//!
//! Rendering is sequential and in input order. Only image resolution for
//! the cards of one page runs concurrently, and results are collected back
//! into slot order, so card N always shows record N's image.

use std::path::Path;

use rayon::prelude::*;
use rayon::ThreadPool;

use crate::canvas::PageCanvas;
use crate::card::CardRenderer;
use crate::config::GeneratorConfig;
use crate::error::{CardgridError, Result};
use crate::font::FontContext;
use crate::image_loader::{ImageResolver, LoadedImage};
use crate::input;
use crate::layout::GridPlanner;
use crate::model::FlashcardRecord;
use crate::pdf::PdfWriter;

/// What a run produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub cards: usize,
    pub pages: usize,
}

/// Lay out and render every record, one canvas per page.
///
/// An empty record list yields a single blank page.
pub fn assemble(
    records: &[FlashcardRecord],
    config: &GeneratorConfig,
    fonts: &FontContext,
    resolver: &ImageResolver,
) -> Result<Vec<PageCanvas>> {
    let planner = GridPlanner::new(config.page)?;
    let slots = planner.plan(records.len());
    let geometry = planner.geometry();
    let renderer = CardRenderer::new(&config.card, fonts, resolver, config.image.raster_scale);
    let pool = prefetch_pool(config.image.prefetch_workers);

    let mut pages = Vec::with_capacity(planner.page_count(records.len()));
    let mut start = 0;
    for page_slots in slots.chunk_by(|a, b| a.page == b.page) {
        let page_records = &records[start..start + page_slots.len()];
        start += page_slots.len();

        let images = prefetch(pool.as_ref(), resolver, page_records);
        let mut canvas = PageCanvas::new(geometry.page_width, geometry.page_height);
        for ((slot, record), image) in page_slots.iter().zip(page_records).zip(images) {
            log::debug!(
                "Row {}: page {} row {} column {}",
                record.source_row,
                slot.page + 1,
                slot.row,
                slot.column
            );
            renderer.render_with_image(&mut canvas, slot.rect, record, image)?;
        }
        pages.push(canvas);
    }

    if pages.is_empty() {
        pages.push(PageCanvas::new(geometry.page_width, geometry.page_height));
    }
    debug_assert_eq!(pages.len(), planner.page_count(records.len()));
    Ok(pages)
}

/// Assemble and serialize in memory.
pub fn render_pdf(
    records: &[FlashcardRecord],
    config: &GeneratorConfig,
    fonts: &FontContext,
    resolver: &ImageResolver,
) -> Result<(Vec<u8>, Summary)> {
    let pages = assemble(records, config, fonts, resolver)?;
    let bytes = PdfWriter::new().write(&pages, &config.metadata, fonts)?;
    let summary = Summary {
        cards: records.len(),
        pages: pages.len(),
    };
    Ok((bytes, summary))
}

/// Read `input`, render every card and write the PDF to `output`.
///
/// Fails before touching `output` when the input is missing, has no usable
/// rows, or the configuration is invalid.
pub fn generate(input: &Path, output: &Path, config: &GeneratorConfig) -> Result<Summary> {
    if !input.exists() {
        return Err(CardgridError::InputNotFound(input.to_path_buf()));
    }
    let records = input::read_records(input)?;
    if records.is_empty() {
        return Err(CardgridError::NoRecords(input.to_path_buf()));
    }
    config.validate()?;

    let fonts = FontContext::load(&config.font);
    let resolver = ImageResolver::new(&config.image, &fonts);
    let (bytes, summary) = render_pdf(&records, config, &fonts, &resolver)?;

    std::fs::write(output, bytes)?;
    log::info!(
        "Saved {} ({} cards, {} pages)",
        output.display(),
        summary.cards,
        summary.pages
    );
    Ok(summary)
}

fn prefetch_pool(workers: usize) -> Option<ThreadPool> {
    if workers <= 1 {
        return None;
    }
    match rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .thread_name(|i| format!("cardgrid-prefetch-{}", i))
        .build()
    {
        Ok(pool) => Some(pool),
        Err(e) => {
            log::warn!("Image prefetch disabled: {}", e);
            None
        }
    }
}

/// Resolve the images of one page, in record order.
fn prefetch(
    pool: Option<&ThreadPool>,
    resolver: &ImageResolver,
    records: &[FlashcardRecord],
) -> Vec<LoadedImage> {
    let resolve = |record: &FlashcardRecord| resolver.resolve(&record.image_locator, &record.term);
    match pool {
        Some(pool) => pool.install(|| records.par_iter().map(resolve).collect()),
        None => records.iter().map(resolve).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::DrawCommand;
    use crate::image_loader::ImageConfig;
    use crate::layout::PageGeometry;

    fn records(n: usize) -> Vec<FlashcardRecord> {
        (1..=n)
            .map(|i| {
                let mut r = FlashcardRecord::new(format!("term{}", i), format!("translation{}", i));
                r.source_row = i;
                r
            })
            .collect()
    }

    fn setup(workers: usize) -> (GeneratorConfig, FontContext, ImageResolver) {
        let config = GeneratorConfig {
            image: ImageConfig {
                prefetch_workers: workers,
                ..Default::default()
            },
            ..Default::default()
        };
        let fonts = FontContext::standard();
        let resolver = ImageResolver::new(&config.image, &fonts);
        (config, fonts, resolver)
    }

    #[test]
    fn test_ten_records_fill_two_pages() {
        let (config, fonts, resolver) = setup(4);
        let pages = assemble(&records(10), &config, &fonts, &resolver).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].card_count(), 9);
        assert_eq!(pages[1].card_count(), 1);
        assert_eq!(pages[0].images().count(), 9);
    }

    #[test]
    fn test_zero_records_one_blank_page() {
        let (config, fonts, resolver) = setup(1);
        let pages = assemble(&[], &config, &fonts, &resolver).unwrap();
        assert_eq!(pages.len(), 1);
        assert!(pages[0].is_empty());
    }

    #[test]
    fn test_cards_follow_input_order() {
        let (config, fonts, resolver) = setup(4);
        let pages = assemble(&records(9), &config, &fonts, &resolver).unwrap();
        let terms: Vec<&str> = pages[0]
            .commands()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, role: crate::font::FontRole::Bold, .. } => {
                    Some(text.as_str())
                }
                _ => None,
            })
            .collect();
        let expected: Vec<String> = (1..=9).map(|i| format!("term{}", i)).collect();
        assert_eq!(terms, expected);

        // term1 is top-left, term9 bottom-right
        let borders: Vec<_> = pages[0]
            .commands()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::StrokeRect { rect, .. } => Some(*rect),
                _ => None,
            })
            .collect();
        assert!(borders[0].y > borders[8].y);
        assert!(borders[0].x < borders[8].x);
    }

    #[test]
    fn test_prefetch_does_not_change_output() {
        let input = records(11);
        let (config, fonts, resolver) = setup(1);
        let sequential = assemble(&input, &config, &fonts, &resolver).unwrap();
        let (config, fonts, resolver) = setup(4);
        let parallel = assemble(&input, &config, &fonts, &resolver).unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_invalid_geometry_rejected_before_rendering() {
        let (mut config, fonts, resolver) = setup(1);
        config.page = PageGeometry {
            margin: 400.0,
            ..Default::default()
        };
        let err = assemble(&records(1), &config, &fonts, &resolver).unwrap_err();
        assert!(matches!(err, CardgridError::InvalidGeometry(_)));
    }

    #[test]
    fn test_render_pdf_summary() {
        let (config, fonts, resolver) = setup(2);
        let (bytes, summary) = render_pdf(&records(10), &config, &fonts, &resolver).unwrap();
        assert_eq!(summary, Summary { cards: 10, pages: 2 });
        assert!(bytes.starts_with(b"%PDF-1.7"));
        assert!(bytes.windows(8).any(|w| w == b"/Count 2"));
    }

    #[test]
    fn test_generate_rejects_missing_and_empty_input() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.pdf");
        let config = GeneratorConfig::default();

        let missing = dir.path().join("missing.csv");
        assert!(matches!(
            generate(&missing, &output, &config),
            Err(CardgridError::InputNotFound(_))
        ));

        let empty = dir.path().join("empty.csv");
        std::fs::write(&empty, "TERM,TRANSLATION\n,\n").unwrap();
        assert!(matches!(
            generate(&empty, &output, &config),
            Err(CardgridError::NoRecords(_))
        ));
        assert!(!output.exists());
    }

    #[test]
    fn test_generate_rejects_zero_timeout_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("words.csv");
        let output = dir.path().join("out.pdf");
        std::fs::write(&input, "TERM,TRANSLATION\ngato,cat\n").unwrap();

        let mut config = GeneratorConfig::default();
        config.image.request_timeout_secs = 0;
        assert!(matches!(
            generate(&input, &output, &config),
            Err(CardgridError::InvalidConfig(_))
        ));
        assert!(!output.exists());
    }
}
