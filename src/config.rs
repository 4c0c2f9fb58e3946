//! Generator configuration.
//!
//! Every field has a default, so an override file only lists what it
//! changes:
//!
//! ```json
//! { "page": { "columns": 2, "rows": 4 }, "image": { "requestTimeoutSecs": 3 } }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::card::CardStyle;
use crate::error::{CardgridError, Result};
use crate::font::FontConfig;
use crate::image_loader::ImageConfig;
use crate::layout::PageGeometry;
use crate::model::Metadata;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratorConfig {
    pub page: PageGeometry,
    pub card: CardStyle,
    pub image: ImageConfig,
    pub font: FontConfig,
    pub metadata: Metadata,
}

impl GeneratorConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Reject settings no run can work with.
    pub fn validate(&self) -> Result<()> {
        self.page.validate()?;
        if self.image.request_timeout_secs == 0 {
            return Err(CardgridError::InvalidConfig(
                "requestTimeoutSecs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CardgridError;
    use crate::model::mm;

    #[test]
    fn test_defaults() {
        let config = GeneratorConfig::default();
        assert_eq!(config.page.columns, 3);
        assert_eq!(config.page.rows, 3);
        assert!((config.page.margin - mm(12.0)).abs() < 1e-9);
        assert!((config.card.padding - mm(6.0)).abs() < 1e-9);
        assert_eq!(config.image.request_timeout_secs, 8);
        assert_eq!(config.image.placeholder.width, 800);
        assert_eq!(config.metadata.title.as_deref(), Some("Flashcards"));
    }

    #[test]
    fn test_partial_override() {
        let config = GeneratorConfig::from_json(
            r#"{
                "page": { "columns": 2, "gap": 6.0 },
                "card": { "termSize": 16 },
                "image": { "prefetchWorkers": 1, "placeholder": { "width": 400 } },
                "font": { "path": "fonts/Noto.ttf" }
            }"#,
        )
        .unwrap();
        assert_eq!(config.page.columns, 2);
        assert_eq!(config.page.rows, 3);
        assert_eq!(config.page.gap, 6.0);
        assert_eq!(config.card.term_size, 16.0);
        assert_eq!(config.card.translation_size, 20.0);
        assert_eq!(config.image.prefetch_workers, 1);
        assert_eq!(config.image.placeholder.width, 400);
        assert_eq!(config.image.placeholder.height, 600);
        assert_eq!(config.font.path, Path::new("fonts/Noto.ttf"));
    }

    #[test]
    fn test_empty_object_is_default() {
        let config = GeneratorConfig::from_json("{}").unwrap();
        assert_eq!(config.page, PageGeometry::default());
        assert_eq!(config.card, CardStyle::default());
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            GeneratorConfig::from_json("{ page: }"),
            Err(CardgridError::Config(_))
        ));
    }

    #[test]
    fn test_zero_request_timeout_rejected() {
        let err = GeneratorConfig::from_json(r#"{"image": {"requestTimeoutSecs": 0}}"#).unwrap_err();
        assert!(matches!(err, CardgridError::InvalidConfig(_)));

        let mut config = GeneratorConfig::default();
        config.image.request_timeout_secs = 0;
        assert!(config.validate().is_err());
        config.image.request_timeout_secs = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cards.json");
        std::fs::write(&path, r#"{ "metadata": { "title": "Animals" } }"#).unwrap();
        let config = GeneratorConfig::from_json_file(&path).unwrap();
        assert_eq!(config.metadata.title.as_deref(), Some("Animals"));
    }
}
