//! # Image Fitting
//!
//! Scales a resolved raster into a card's image band. The EXIF orientation
//! is applied first, then the image is shrunk (never enlarged) so both
//! display dimensions stay within the band while the aspect ratio is kept.
//!
//! Display size is measured treating one source pixel as one point. The
//! embedded raster is resampled with Lanczos3 to `raster_scale` pixels per
//! point, capped at the source resolution.

use image::imageops::FilterType;
use thiserror::Error;

use crate::image_loader::{ImageOrigin, LoadedImage};

#[derive(Debug, Error, PartialEq)]
pub enum FitError {
    #[error("image has no pixels")]
    EmptyImage,
    #[error("invalid fit bounds {0}×{1}")]
    InvalidBounds(f64, f64),
}

/// A fitted image ready to be placed on a card and embedded in the PDF.
///
/// Pixels are stored the way the PDF serializer consumes them: packed RGB
/// plus a separate alpha plane that is `None` when fully opaque.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedImage {
    pub width_px: u32,
    pub height_px: u32,
    /// width * height * 3 bytes
    pub rgb: Vec<u8>,
    /// width * height bytes
    pub alpha: Option<Vec<u8>>,
    /// Size on the page, in points.
    pub display_width: f64,
    pub display_height: f64,
    pub origin: ImageOrigin,
}

/// Largest size of a `width × height` image that fits inside
/// `max_width × max_height` without enlarging it.
pub fn display_size(width: u32, height: u32, max_width: f64, max_height: f64) -> (f64, f64) {
    let (w, h) = (width as f64, height as f64);
    let scale = (max_width / w).min(max_height / h).min(1.0);
    (w * scale, h * scale)
}

/// Orient, shrink and flatten `loaded` to fit the given bounds (points).
pub fn fit(
    loaded: LoadedImage,
    max_width: f64,
    max_height: f64,
    raster_scale: f64,
) -> Result<ResolvedImage, FitError> {
    if !(max_width.is_finite() && max_height.is_finite()) || max_width <= 0.0 || max_height <= 0.0
    {
        return Err(FitError::InvalidBounds(max_width, max_height));
    }

    let LoadedImage {
        mut image,
        orientation,
        origin,
    } = loaded;
    image.apply_orientation(orientation);

    let (src_w, src_h) = (image.width(), image.height());
    if src_w == 0 || src_h == 0 {
        return Err(FitError::EmptyImage);
    }

    let (display_width, display_height) = display_size(src_w, src_h, max_width, max_height);

    let scale = if raster_scale.is_finite() && raster_scale > 0.0 {
        raster_scale
    } else {
        1.0
    };
    let target_w = ((display_width * scale).round() as u32).clamp(1, src_w);
    let target_h = ((display_height * scale).round() as u32).clamp(1, src_h);
    if (target_w, target_h) != (src_w, src_h) {
        image = image.resize_exact(target_w, target_h, FilterType::Lanczos3);
    }

    let rgba = image.to_rgba8();
    let (width_px, height_px) = rgba.dimensions();
    let pixel_count = (width_px * height_px) as usize;
    let mut rgb = Vec::with_capacity(pixel_count * 3);
    let mut alpha = Vec::with_capacity(pixel_count);
    let mut has_transparency = false;

    for pixel in rgba.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel[3]);
        if pixel[3] != 255 {
            has_transparency = true;
        }
    }

    Ok(ResolvedImage {
        width_px,
        height_px,
        rgb,
        alpha: has_transparency.then_some(alpha),
        display_width,
        display_height,
        origin,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::metadata::Orientation;
    use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};

    fn loaded(width: u32, height: u32) -> LoadedImage {
        LoadedImage {
            image: DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([1, 2, 3]))),
            orientation: Orientation::NoTransforms,
            origin: ImageOrigin::Loaded,
        }
    }

    #[test]
    fn test_display_size_shrinks_preserving_aspect() {
        let (w, h) = display_size(800, 600, 150.0, 100.0);
        assert!((w - 133.333).abs() < 0.01);
        assert!((h - 100.0).abs() < 1e-9);
        assert!((w / h - 800.0 / 600.0).abs() < 1e-9);
    }

    #[test]
    fn test_display_size_never_enlarges() {
        assert_eq!(display_size(40, 30, 500.0, 500.0), (40.0, 30.0));
    }

    #[test]
    fn test_fit_within_bounds_and_source() {
        let fitted = fit(loaded(1000, 250), 120.0, 90.0, 2.0).unwrap();
        assert!(fitted.display_width <= 120.0 + 1e-9);
        assert!(fitted.display_height <= 90.0 + 1e-9);
        assert!(fitted.width_px <= 1000 && fitted.height_px <= 250);
        assert_eq!((fitted.width_px, fitted.height_px), (240, 60));
        assert_eq!(fitted.rgb.len(), 240 * 60 * 3);
        assert!(fitted.alpha.is_none());
    }

    #[test]
    fn test_small_image_keeps_its_pixels() {
        let fitted = fit(loaded(20, 10), 200.0, 200.0, 2.0).unwrap();
        assert_eq!((fitted.width_px, fitted.height_px), (20, 10));
        assert_eq!((fitted.display_width, fitted.display_height), (20.0, 10.0));
    }

    #[test]
    fn test_orientation_applied_before_scaling() {
        let mut img = loaded(200, 100);
        img.orientation = Orientation::Rotate90;
        let fitted = fit(img, 1000.0, 1000.0, 1.0).unwrap();
        assert_eq!((fitted.width_px, fitted.height_px), (100, 200));
        assert_eq!((fitted.display_width, fitted.display_height), (100.0, 200.0));
    }

    #[test]
    fn test_alpha_kept_when_transparent() {
        let image = RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 100]));
        let fitted = fit(
            LoadedImage {
                image: DynamicImage::ImageRgba8(image),
                orientation: Orientation::NoTransforms,
                origin: ImageOrigin::Loaded,
            },
            10.0,
            10.0,
            1.0,
        )
        .unwrap();
        assert_eq!(fitted.alpha.as_deref(), Some(&[100u8, 100, 100, 100][..]));
        assert_eq!(&fitted.rgb[..3], &[255, 0, 0]);
    }

    #[test]
    fn test_deterministic() {
        let a = fit(loaded(640, 480), 150.0, 110.0, 2.0).unwrap();
        let b = fit(loaded(640, 480), 150.0, 110.0, 2.0).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_bounds_rejected() {
        assert!(matches!(
            fit(loaded(10, 10), f64::NAN, 10.0, 2.0),
            Err(FitError::InvalidBounds(..))
        ));
        assert!(matches!(
            fit(loaded(10, 10), 10.0, 0.0, 2.0),
            Err(FitError::InvalidBounds(..))
        ));
    }

    #[test]
    fn test_empty_image_rejected() {
        assert_eq!(fit(loaded(0, 0), 10.0, 10.0, 1.0), Err(FitError::EmptyImage));
    }
}
