//! # Vocabulary Input
//!
//! Reads the delimited vocabulary table into [`FlashcardRecord`]s.
//!
//! The first row is a header. Columns are matched by name, case-insensitive,
//! against a fixed list of aliases per field, so both the Polish column
//! names of existing vocabulary sheets and plain English names work. Unknown
//! columns are ignored and a missing column reads as blank.
//!
//! The delimiter is taken from the header line: whichever of `,` `;` and
//! tab occurs most often, comma on a tie.

use std::path::Path;

use crate::error::{CardgridError, Result};
use crate::model::FlashcardRecord;

const TERM_ALIASES: &[&str] = &["TEKST", "WORD", "TERM"];
const TRANSLATION_ALIASES: &[&str] = &["TŁUMACZENIE", "TLUMACZENIE", "TŁUM", "TRANSLATION"];
const IMAGE_ALIASES: &[&str] = &[
    "LINK DO OBRAZKA",
    "LINK_DO_OBRAZKA",
    "LINK_DO_OBRAZU",
    "LINK",
    "IMAGE",
    "IMAGE_URL",
];
const PRIMARY_SENTENCE_ALIASES: &[&str] = &["ZDANIE_EN", "ZDANIE EN", "EN_SENTENCE", "SENTENCE"];
const SECONDARY_SENTENCE_ALIASES: &[&str] =
    &["ZDANIE_ES", "ZDANIE ES", "ES_SENTENCE", "SENTENCE_2"];

/// Column index of each field in the header, if present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnMap {
    pub term: Option<usize>,
    pub translation: Option<usize>,
    pub image: Option<usize>,
    pub example_primary: Option<usize>,
    pub example_secondary: Option<usize>,
}

impl ColumnMap {
    /// Match header names against the aliases. The first header that
    /// matches a field wins.
    pub fn from_headers<'h>(headers: impl IntoIterator<Item = &'h str>) -> Self {
        let normalized: Vec<String> = headers
            .into_iter()
            .map(|h| h.trim().to_uppercase())
            .collect();
        let find = |aliases: &[&str]| {
            normalized
                .iter()
                .position(|h| aliases.iter().any(|alias| h == alias))
        };
        Self {
            term: find(TERM_ALIASES),
            translation: find(TRANSLATION_ALIASES),
            image: find(IMAGE_ALIASES),
            example_primary: find(PRIMARY_SENTENCE_ALIASES),
            example_secondary: find(SECONDARY_SENTENCE_ALIASES),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Read every usable row of the file at `path`.
pub fn read_records(path: &Path) -> Result<Vec<FlashcardRecord>> {
    if !path.exists() {
        return Err(CardgridError::InputNotFound(path.to_path_buf()));
    }
    let bytes = std::fs::read(path)?;
    let text =
        String::from_utf8(bytes).map_err(|e| CardgridError::Encoding(path.to_path_buf(), e))?;
    parse_records(&text)
}

/// Parse table text into records, dropping rows whose term, translation and
/// image are all blank. Row order is preserved.
pub fn parse_records(text: &str) -> Result<Vec<FlashcardRecord>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let delimiter = sniff_delimiter(text);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let columns = ColumnMap::from_headers(reader.headers()?.iter());
    if columns.is_empty() {
        log::warn!("No recognized column names in the header row");
    } else if columns.term.is_none() || columns.translation.is_none() {
        log::debug!("Header is missing term or translation column: {:?}", columns);
    }

    let mut records = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = row?;
        let source_row = index + 1;
        let field = |column: Option<usize>| -> String {
            column
                .and_then(|i| row.get(i))
                .map(|value| value.trim().to_string())
                .unwrap_or_default()
        };

        let record = FlashcardRecord {
            term: field(columns.term),
            translation: field(columns.translation),
            image_locator: field(columns.image),
            example_primary: Some(field(columns.example_primary)).filter(|s| !s.is_empty()),
            example_secondary: Some(field(columns.example_secondary)).filter(|s| !s.is_empty()),
            source_row,
        };

        if record.term.is_empty() && record.translation.is_empty() && record.image_locator.is_empty()
        {
            log::debug!("Row {}: blank, skipped", source_row);
            continue;
        }
        records.push(record);
    }

    log::debug!("Read {} records", records.len());
    Ok(records)
}

/// Pick the delimiter from the header line.
fn sniff_delimiter(text: &str) -> u8 {
    let header = text.lines().next().unwrap_or("");
    let mut best = (b',', header.matches(',').count());
    for candidate in [b';', b'\t'] {
        let count = header.matches(candidate as char).count();
        if count > best.1 {
            best = (candidate, count);
        }
    }
    best.0
}
