//! # Image Resolution
//!
//! Turns a card's image locator into a decoded raster. Supported locators:
//! - empty / whitespace: no image, go straight to the placeholder
//! - local path (plain or `file://`) that exists on disk
//! - `http://` / `https://` URL, fetched once with a bounded timeout
//! - `data:image/...;base64,...` URI
//! - anything else is tried as a path, which is expected to fail quietly
//!
//! [`ImageResolver::resolve`] always returns an image. Every failure on the
//! way (missing file, HTTP error, timeout, undecodable bytes) is logged and
//! replaced by a placeholder carrying the card's term.

use std::io::Cursor;
use std::path::PathBuf;
use std::time::Duration;

use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::font::FontContext;
use crate::placeholder::{PlaceholderGenerator, PlaceholderStyle};

/// Image-related settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageConfig {
    /// Per-request timeout for HTTP(S) locators, in seconds.
    pub request_timeout_secs: u64,
    /// Raster pixels per point of display size. Never exceeds the source
    /// resolution.
    pub raster_scale: f64,
    /// Worker threads resolving one page's images ahead of rendering.
    /// 1 resolves sequentially.
    pub prefetch_workers: usize,
    pub placeholder: PlaceholderStyle,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 8,
            raster_scale: 2.0,
            prefetch_workers: 4,
            placeholder: PlaceholderStyle::default(),
        }
    }
}

/// Why an image could not be loaded. Never leaves the resolver.
#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("empty image locator")]
    Empty,
    #[error("failed to read '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("no HTTP client available")]
    NoHttpClient,
    #[error("request to '{url}' failed: {source}")]
    Http { url: String, source: reqwest::Error },
    #[error("invalid data URI: {0}")]
    DataUri(String),
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// How a locator string will be interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Empty,
    LocalFile(PathBuf),
    Http(String),
    DataUri(String),
    /// Not recognized; opened as a path anyway.
    Other(PathBuf),
}

impl Locator {
    /// Classify a locator, first match wins.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return Locator::Empty;
        }

        let path_part = raw.strip_prefix("file://").unwrap_or(raw);
        let path = PathBuf::from(path_part);
        if path.exists() {
            return Locator::LocalFile(path);
        }

        let lower = raw.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Locator::Http(raw.to_string());
        }
        if lower.starts_with("data:image/") {
            return Locator::DataUri(raw.to_string());
        }
        Locator::Other(path)
    }
}

/// Where a card's raster came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOrigin {
    Loaded,
    Placeholder {
        label: String,
        /// Whether the label is already part of the raster.
        labelled: bool,
    },
}

impl ImageOrigin {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, ImageOrigin::Placeholder { .. })
    }
}

/// A decoded raster plus the EXIF orientation it was stored with.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub image: DynamicImage,
    pub orientation: Orientation,
    pub origin: ImageOrigin,
}

/// Resolves locators to rasters; shared read-only across prefetch workers.
pub struct ImageResolver {
    client: Option<reqwest::blocking::Client>,
    placeholder: PlaceholderGenerator,
}

impl ImageResolver {
    pub fn new(config: &ImageConfig, fonts: &FontContext) -> Self {
        let timeout = Duration::from_secs(config.request_timeout_secs);
        let client = match reqwest::blocking::Client::builder().timeout(timeout).build() {
            Ok(client) => Some(client),
            Err(e) => {
                log::warn!("HTTP client unavailable, URL images will use placeholders: {}", e);
                None
            }
        };
        Self {
            client,
            placeholder: PlaceholderGenerator::new(config.placeholder.clone(), fonts),
        }
    }

    /// Resolve a locator to a raster. Never fails: any problem produces a
    /// placeholder labelled with `label`.
    pub fn resolve(&self, locator: &str, label: &str) -> LoadedImage {
        match self.load(locator) {
            Ok(image) => image,
            Err(ImageLoadError::Empty) => self.placeholder(label),
            Err(e) => {
                log::warn!("Image '{}' unavailable, using placeholder: {}", locator, e);
                self.placeholder(label)
            }
        }
    }

    /// A placeholder raster carrying `label`.
    pub fn placeholder(&self, label: &str) -> LoadedImage {
        let generated = self.placeholder.make(label);
        LoadedImage {
            image: DynamicImage::ImageRgb8(generated.image),
            orientation: Orientation::NoTransforms,
            origin: ImageOrigin::Placeholder {
                label: label.to_string(),
                labelled: generated.labelled,
            },
        }
    }

    /// Load and decode a locator, reporting why it failed.
    pub fn load(&self, locator: &str) -> Result<LoadedImage, ImageLoadError> {
        let bytes = match Locator::parse(locator) {
            Locator::Empty => return Err(ImageLoadError::Empty),
            Locator::LocalFile(path) | Locator::Other(path) => read_file(&path)?,
            Locator::Http(url) => self.fetch(&url)?,
            Locator::DataUri(uri) => decode_data_uri(&uri)?,
        };
        let (image, orientation) = decode_image_bytes(&bytes)?;
        Ok(LoadedImage {
            image,
            orientation,
            origin: ImageOrigin::Loaded,
        })
    }

    /// One GET, no retries. Non-2xx statuses and timeouts are errors.
    fn fetch(&self, url: &str) -> Result<Vec<u8>, ImageLoadError> {
        let client = self.client.as_ref().ok_or(ImageLoadError::NoHttpClient)?;
        let http_err = |source| ImageLoadError::Http {
            url: url.to_string(),
            source,
        };
        let response = client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(http_err)?;
        let body = response.bytes().map_err(http_err)?;
        Ok(body.to_vec())
    }
}

fn read_file(path: &std::path::Path) -> Result<Vec<u8>, ImageLoadError> {
    std::fs::read(path).map_err(|source| ImageLoadError::Read {
        path: path.display().to_string(),
        source,
    })
}

/// Decode the payload of a `data:image/...;base64,...` URI.
fn decode_data_uri(uri: &str) -> Result<Vec<u8>, ImageLoadError> {
    use base64::Engine;

    let comma_pos = uri
        .find(',')
        .ok_or_else(|| ImageLoadError::DataUri("missing comma".to_string()))?;
    if !uri[..comma_pos].ends_with(";base64") {
        return Err(ImageLoadError::DataUri(
            "only base64 payloads are supported".to_string(),
        ));
    }
    base64::engine::general_purpose::STANDARD
        .decode(uri[comma_pos + 1..].trim())
        .map_err(|e| ImageLoadError::DataUri(e.to_string()))
}

/// Detect the format from content and decode, keeping the EXIF orientation.
pub fn decode_image_bytes(data: &[u8]) -> Result<(DynamicImage, Orientation), ImageLoadError> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(image::ImageError::IoError)?;
    let mut decoder = reader.into_decoder()?;
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let image = DynamicImage::from_decoder(decoder)?;
    Ok((image, orientation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([10, 200, 30]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    /// JPEG with an EXIF APP1 segment carrying only the orientation tag.
    fn jpeg_with_orientation(width: u32, height: u32, orientation: u8) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40]));
        let mut jpeg = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut jpeg), image::ImageFormat::Jpeg)
            .unwrap();

        let mut exif = b"Exif\0\0".to_vec();
        // Big-endian TIFF header, first IFD at offset 8
        exif.extend_from_slice(b"MM\0\x2A\0\0\0\x08");
        exif.extend_from_slice(&[0, 1]);
        // 0x0112 Orientation, SHORT, count 1
        exif.extend_from_slice(&[0x01, 0x12, 0, 3, 0, 0, 0, 1, 0, orientation, 0, 0]);
        exif.extend_from_slice(&[0, 0, 0, 0]);

        let len = (exif.len() + 2) as u16;
        let mut app1 = vec![0xFF, 0xE1];
        app1.extend_from_slice(&len.to_be_bytes());
        app1.extend_from_slice(&exif);
        jpeg.splice(2..2, app1);
        jpeg
    }

    fn resolver() -> ImageResolver {
        let config = ImageConfig {
            request_timeout_secs: 2,
            ..Default::default()
        };
        ImageResolver::new(&config, &FontContext::standard())
    }

    /// Serve one HTTP response on a local port and return its URL.
    fn serve_once(status: &str, body: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let status = status.to_string();
        std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut buf = [0u8; 2048];
                let _ = stream.read(&mut buf);
                let head = format!(
                    "HTTP/1.1 {}\r\nContent-Type: image/png\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    status,
                    body.len()
                );
                let _ = stream.write_all(head.as_bytes());
                let _ = stream.write_all(&body);
            }
        });
        format!("http://{}/image.png", addr)
    }

    fn assert_placeholder(image: &LoadedImage, label: &str) {
        match &image.origin {
            ImageOrigin::Placeholder { label: l, .. } => assert_eq!(l, label),
            other => panic!("expected placeholder, got {:?}", other),
        }
        assert_eq!((image.image.width(), image.image.height()), (800, 600));
    }

    #[test]
    fn test_locator_classification() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cat.png");
        std::fs::write(&path, png_bytes(2, 2)).unwrap();
        let path_str = path.to_string_lossy().to_string();

        assert_eq!(Locator::parse("   "), Locator::Empty);
        assert_eq!(Locator::parse(&path_str), Locator::LocalFile(path.clone()));
        assert_eq!(
            Locator::parse(&format!("file://{}", path_str)),
            Locator::LocalFile(path)
        );
        assert_eq!(
            Locator::parse("HTTPS://example.com/a.png"),
            Locator::Http("HTTPS://example.com/a.png".to_string())
        );
        assert!(matches!(
            Locator::parse("data:image/png;base64,AAAA"),
            Locator::DataUri(_)
        ));
        assert!(matches!(Locator::parse("ftp://x/y.png"), Locator::Other(_)));
    }

    #[test]
    fn test_empty_locator_gives_placeholder() {
        let image = resolver().resolve("", "perro");
        assert_placeholder(&image, "perro");
    }

    #[test]
    fn test_missing_file_gives_placeholder() {
        let image = resolver().resolve("/no/such/dir/dog.png", "perro");
        assert_placeholder(&image, "perro");
    }

    #[test]
    fn test_malformed_url_gives_placeholder() {
        let image = resolver().resolve("http://", "gato");
        assert_placeholder(&image, "gato");
        let image = resolver().resolve("https://exa mple.invalid/%%%", "gato");
        assert_placeholder(&image, "gato");
    }

    #[test]
    fn test_unreachable_url_gives_placeholder() {
        // Bind then drop to get a port nothing listens on.
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let image = resolver().resolve(&format!("http://127.0.0.1:{}/x.png", port), "casa");
        assert_placeholder(&image, "casa");
    }

    #[test]
    fn test_reachable_url_is_decoded() {
        let url = serve_once("200 OK", png_bytes(40, 20));
        let image = resolver().resolve(&url, "sol");
        assert_eq!(image.origin, ImageOrigin::Loaded);
        assert_eq!((image.image.width(), image.image.height()), (40, 20));
    }

    #[test]
    fn test_http_error_status_gives_placeholder() {
        let url = serve_once("404 Not Found", b"nope".to_vec());
        let image = resolver().resolve(&url, "luna");
        assert_placeholder(&image, "luna");
    }

    #[test]
    fn test_local_file_is_decoded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.png");
        std::fs::write(&path, png_bytes(12, 7)).unwrap();

        let image = resolver().resolve(&path.to_string_lossy(), "árbol");
        assert_eq!(image.origin, ImageOrigin::Loaded);
        assert_eq!(image.image.width(), 12);
        assert_eq!(image.orientation, Orientation::NoTransforms);
    }

    #[test]
    fn test_corrupt_file_gives_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"\x89PNG but not really").unwrap();
        let resolver = resolver();

        assert!(matches!(
            resolver.load(&path.to_string_lossy()),
            Err(ImageLoadError::Decode(_))
        ));
        assert_placeholder(&resolver.resolve(&path.to_string_lossy(), "x"), "x");
    }

    #[test]
    fn test_data_uri() {
        use base64::Engine;
        let b64 = base64::engine::general_purpose::STANDARD.encode(png_bytes(3, 5));
        let image = resolver().resolve(&format!("data:image/png;base64,{}", b64), "t");
        assert_eq!(image.origin, ImageOrigin::Loaded);
        assert_eq!((image.image.width(), image.image.height()), (3, 5));

        assert!(matches!(
            decode_data_uri("data:image/png;base64"),
            Err(ImageLoadError::DataUri(_))
        ));
    }

    #[test]
    fn test_empty_locator_reports_empty() {
        assert!(matches!(resolver().load("  "), Err(ImageLoadError::Empty)));
    }

    #[test]
    fn test_exif_orientation_read_from_jpeg() {
        let (image, orientation) = decode_image_bytes(&jpeg_with_orientation(8, 4, 6)).unwrap();
        assert_eq!(orientation, Orientation::Rotate90);
        // Pixels stay as stored; rotation is left to the fitter.
        assert_eq!((image.width(), image.height()), (8, 4));

        let (_, orientation) = decode_image_bytes(&jpeg_with_orientation(8, 4, 1)).unwrap();
        assert_eq!(orientation, Orientation::NoTransforms);
    }

    #[test]
    fn test_exif_orientation_carried_through_resolve() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rotated.jpg");
        std::fs::write(&path, jpeg_with_orientation(8, 4, 3)).unwrap();

        let image = resolver().resolve(&path.to_string_lossy(), "ojo");
        assert_eq!(image.origin, ImageOrigin::Loaded);
        assert_eq!(image.orientation, Orientation::Rotate180);
    }
}
