//! # Font Management
//!
//! Fonts are registered once at startup and handed around as an immutable
//! [`FontContext`]. The context holds either a TrueType face loaded from disk
//! (embedded into the PDF, full Unicode coverage) or the standard Helvetica
//! pair, which needs no embedding but only covers WinAnsi.
//!
//! Failing to load the TrueType file is not an error: the context quietly
//! falls back to Helvetica and logs which one it picked.

pub mod metrics;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{CardgridError, Result};
pub use metrics::StandardFontMetrics;

/// Which of the two card text styles a run of text uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FontRole {
    Regular,
    Bold,
}

impl FontRole {
    pub const ALL: [FontRole; 2] = [FontRole::Regular, FontRole::Bold];
}

/// Where to look for the TrueType faces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FontConfig {
    /// Regular face. Relative paths resolve against the working directory.
    pub path: PathBuf,
    /// Bold face. When unset, `<stem>-Bold.<ext>` next to `path` is tried,
    /// then the regular face is reused.
    pub bold_path: Option<PathBuf>,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("DejaVuSans.ttf"),
            bold_path: None,
        }
    }
}

impl FontConfig {
    fn bold_candidate(&self) -> Option<PathBuf> {
        if let Some(ref bold) = self.bold_path {
            return Some(bold.clone());
        }
        let stem = self.path.file_stem()?.to_string_lossy();
        let file_name = match self.path.extension() {
            Some(ext) => format!("{}-Bold.{}", stem, ext.to_string_lossy()),
            None => format!("{}-Bold", stem),
        };
        Some(self.path.with_file_name(file_name))
    }
}

/// The standard PDF fonts used as fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
}

impl StandardFont {
    /// The PDF name for this font.
    pub fn pdf_name(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
        }
    }

    pub fn metrics(&self) -> StandardFontMetrics {
        match self {
            Self::Helvetica => StandardFontMetrics::HELVETICA,
            Self::HelveticaBold => StandardFontMetrics::HELVETICA_BOLD,
        }
    }
}

/// Parsed metrics from a TrueType/OpenType font via ttf-parser.
#[derive(Debug, Clone)]
pub struct CustomFontMetrics {
    pub units_per_em: u16,
    pub advance_widths: HashMap<char, u16>,
    pub default_advance: u16,
    pub ascender: i16,
    pub descender: i16,
    /// Maps characters to their glyph IDs in the font.
    pub glyph_ids: HashMap<char, u16>,
}

impl CustomFontMetrics {
    /// Get the advance width of a character in points.
    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        let w = self
            .advance_widths
            .get(&ch)
            .copied()
            .unwrap_or(self.default_advance);
        (w as f64 / self.units_per_em as f64) * font_size
    }

    /// Parse metrics from font data using ttf-parser.
    pub fn from_font_data(data: &[u8]) -> Option<Self> {
        let face = ttf_parser::Face::parse(data, 0).ok()?;
        let units_per_em = face.units_per_em();

        let mut advance_widths = HashMap::new();
        let mut glyph_ids = HashMap::new();
        let mut default_advance = 0u16;

        // Basic Multilingual Plane is plenty for vocabulary cards
        for code in 32u32..=0xFFFF {
            let Some(ch) = char::from_u32(code) else {
                continue;
            };
            if let Some(glyph_id) = face.glyph_index(ch) {
                let advance = face.glyph_hor_advance(glyph_id).unwrap_or(0);
                advance_widths.insert(ch, advance);
                glyph_ids.insert(ch, glyph_id.0);
                if ch == ' ' {
                    default_advance = advance;
                }
            }
        }

        if default_advance == 0 {
            default_advance = units_per_em / 2;
        }

        Some(CustomFontMetrics {
            units_per_em,
            advance_widths,
            default_advance,
            ascender: face.ascender(),
            descender: face.descender(),
            glyph_ids,
        })
    }
}

/// A TrueType face that gets embedded into the PDF.
#[derive(Debug, Clone)]
pub struct EmbeddedFont {
    /// Family name used for the PDF /BaseFont entry.
    pub family: String,
    pub data: Arc<Vec<u8>>,
    pub metrics: Arc<CustomFontMetrics>,
}

impl EmbeddedFont {
    pub fn parse(family: &str, data: Vec<u8>) -> Result<Self> {
        let metrics = CustomFontMetrics::from_font_data(&data).ok_or_else(|| {
            CardgridError::Font(format!("'{}' is not a usable TrueType font", family))
        })?;
        Ok(Self {
            family: family.to_string(),
            data: Arc::new(data),
            metrics: Arc::new(metrics),
        })
    }
}

#[derive(Debug, Clone)]
pub enum FontFace {
    /// One of the standard PDF fonts. No embedding needed.
    Standard(StandardFont),
    /// A TrueType font that needs to be embedded.
    Embedded(EmbeddedFont),
}

impl FontFace {
    pub fn measure_string(&self, text: &str, font_size: f64) -> f64 {
        match self {
            FontFace::Standard(std_font) => std_font.metrics().measure_string(text, font_size),
            FontFace::Embedded(font) => text
                .chars()
                .map(|ch| font.metrics.char_width(ch, font_size))
                .sum(),
        }
    }
}

/// Process-wide font selection, built once and shared read-only by the card
/// renderer, the placeholder generator and the PDF writer.
#[derive(Debug, Clone)]
pub struct FontContext {
    regular: FontFace,
    bold: FontFace,
}

impl Default for FontContext {
    fn default() -> Self {
        Self::standard()
    }
}

impl FontContext {
    /// Helvetica / Helvetica-Bold.
    pub fn standard() -> Self {
        Self {
            regular: FontFace::Standard(StandardFont::Helvetica),
            bold: FontFace::Standard(StandardFont::HelveticaBold),
        }
    }

    /// Build a context from raw TrueType bytes. A missing bold face reuses
    /// the regular one.
    pub fn from_ttf(family: &str, regular: Vec<u8>, bold: Option<Vec<u8>>) -> Result<Self> {
        let regular = EmbeddedFont::parse(family, regular)?;
        let bold = match bold {
            Some(data) => EmbeddedFont::parse(&format!("{}-Bold", family), data)?,
            None => regular.clone(),
        };
        Ok(Self {
            regular: FontFace::Embedded(regular),
            bold: FontFace::Embedded(bold),
        })
    }

    /// Load the configured TrueType faces, falling back to the standard
    /// fonts when the regular face is missing or unparsable.
    pub fn load(config: &FontConfig) -> Self {
        let regular = match std::fs::read(&config.path) {
            Ok(data) => data,
            Err(e) => {
                log::info!(
                    "Font {} not available ({}), using Helvetica",
                    config.path.display(),
                    e
                );
                return Self::standard();
            }
        };

        let bold = config
            .bold_candidate()
            .and_then(|path| read_optional(&path));
        let family = family_name(&config.path);

        match Self::from_ttf(&family, regular, bold) {
            Ok(ctx) => {
                log::info!("Using embedded font {}", config.path.display());
                ctx
            }
            Err(e) => {
                log::warn!("{}; falling back to Helvetica", e);
                Self::standard()
            }
        }
    }

    pub fn face(&self, role: FontRole) -> &FontFace {
        match role {
            FontRole::Regular => &self.regular,
            FontRole::Bold => &self.bold,
        }
    }

    /// Measure the width of a string in points.
    pub fn measure_string(&self, text: &str, role: FontRole, font_size: f64) -> f64 {
        self.face(role).measure_string(text, font_size)
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self.regular, FontFace::Embedded(_))
    }

    /// Raw TrueType bytes of the regular face, if one was loaded.
    pub fn truetype_data(&self) -> Option<Arc<Vec<u8>>> {
        match &self.regular {
            FontFace::Embedded(font) => Some(Arc::clone(&font.data)),
            FontFace::Standard(_) => None,
        }
    }
}

fn read_optional(path: &Path) -> Option<Vec<u8>> {
    match std::fs::read(path) {
        Ok(data) => Some(data),
        Err(_) => {
            log::debug!("No bold face at {}", path.display());
            None
        }
    }
}

fn family_name(path: &Path) -> String {
    let name: String = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if name.is_empty() {
        "CustomFont".to_string()
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_font_falls_back_to_helvetica() {
        let ctx = FontContext::load(&FontConfig {
            path: PathBuf::from("/definitely/not/here/DejaVuSans.ttf"),
            bold_path: None,
        });
        assert!(!ctx.is_embedded());
        assert!(ctx.truetype_data().is_none());
        assert!(matches!(
            ctx.face(FontRole::Bold),
            FontFace::Standard(StandardFont::HelveticaBold)
        ));
    }

    #[test]
    fn test_garbage_font_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ttf");
        std::fs::write(&path, b"not a font at all").unwrap();
        let ctx = FontContext::load(&FontConfig { path, bold_path: None });
        assert!(!ctx.is_embedded());
    }

    #[test]
    fn test_from_ttf_rejects_garbage() {
        let result = FontContext::from_ttf("Broken", vec![0, 1, 2, 3], None);
        assert!(matches!(result, Err(CardgridError::Font(_))));
    }

    #[test]
    fn test_measure_with_standard_font() {
        let ctx = FontContext::standard();
        let regular = ctx.measure_string("Hello", FontRole::Regular, 20.0);
        let bold = ctx.measure_string("Hello", FontRole::Bold, 20.0);
        assert!(regular > 0.0);
        assert!(bold > regular);
        assert_eq!(ctx.measure_string("", FontRole::Regular, 20.0), 0.0);
    }

    #[test]
    fn test_bold_candidate_is_sibling() {
        let config = FontConfig {
            path: PathBuf::from("fonts/DejaVuSans.ttf"),
            bold_path: None,
        };
        assert_eq!(
            config.bold_candidate(),
            Some(PathBuf::from("fonts/DejaVuSans-Bold.ttf"))
        );
    }

    #[test]
    fn test_family_name_sanitized() {
        assert_eq!(family_name(Path::new("My Font (1).ttf")), "MyFont1");
        assert_eq!(family_name(Path::new("DejaVuSans.ttf")), "DejaVuSans");
    }

    #[test]
    fn test_system_truetype_font_when_available() {
        let path = PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf");
        if !path.exists() {
            return;
        }
        let ctx = FontContext::load(&FontConfig { path, bold_path: None });
        assert!(ctx.is_embedded());
        assert!(ctx.measure_string("źdźbło", FontRole::Regular, 12.0) > 0.0);
    }
}
