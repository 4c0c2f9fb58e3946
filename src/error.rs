//! Structured error types for the cardgrid pipeline.
//!
//! Only failures that end a run live here. Image problems for a single card
//! are absorbed inside the card renderer and never show up as a
//! `CardgridError`, with the one exception of the placeholder itself being
//! unusable.

use std::path::PathBuf;

use thiserror::Error;

/// The unified error type returned by the public cardgrid API.
#[derive(Debug, Error)]
pub enum CardgridError {
    /// The vocabulary file does not exist.
    #[error("Input file does not exist: {}", .0.display())]
    InputNotFound(PathBuf),

    /// The vocabulary file parsed, but no row carried a term, translation or image.
    #[error("No rows to process in {}", .0.display())]
    NoRecords(PathBuf),

    /// The vocabulary file is not UTF-8.
    #[error("{path} is not valid UTF-8: {err}", path = .0.display(), err = .1)]
    Encoding(PathBuf, std::string::FromUtf8Error),

    /// A setting outside its allowed range.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// The tabular input could not be parsed.
    #[error("Failed to read table: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Page geometry that cannot produce a positive card size.
    #[error("Invalid page geometry: {0}")]
    InvalidGeometry(String),

    /// A configuration override failed to parse.
    #[error("Failed to parse config: {0}")]
    Config(#[from] serde_json::Error),

    /// A font could not be parsed or embedded.
    #[error("Font error: {0}")]
    Font(String),

    /// The placeholder image could not be produced or fitted. This breaks the
    /// "every card shows an image" guarantee and is fatal.
    #[error("Placeholder image failed: {0}")]
    Placeholder(String),
}

pub type Result<T, E = CardgridError> = std::result::Result<T, E>;
