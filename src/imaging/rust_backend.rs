//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP) | `image::ImageReader` |
//! | Identify | `image::image_dimensions` (header only) |
//! | Thumbnail | `image::DynamicImage::resize_exact` with `Lanczos3` |
//! | Crop | `resize_exact` to the fill size, then `crop_imm` |
//! | Encode | JPEG with quality; PNG, TIFF, lossless WebP by extension |
//! | Write | `tempfile::NamedTempFile` in the output directory, then `persist` |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::params::{CropParams, ThumbnailParams};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::{BufWriter, Seek, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Pure Rust backend using the `image` crate.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

/// Save a DynamicImage to the given path, inferring format from extension.
///
/// Encodes into a temporary file next to `path` and renames it into place
/// only once encoding succeeded, so a failed or interrupted write never
/// leaves a partial file at the derivative path.
fn save_image(img: &DynamicImage, path: &Path, quality: u32) -> Result<(), BackendError> {
    let format = ImageFormat::from_path(path)
        .ok()
        .filter(|f| {
            matches!(
                f,
                ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::Tiff | ImageFormat::WebP
            )
        })
        .ok_or_else(|| {
            BackendError::ProcessingFailed(format!("Unsupported output format: {}", path.display()))
        })?;

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let tmp = NamedTempFile::new_in(dir)?;
    // Temp files start owner-only; derivatives are served by other users.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))?;
    }
    {
        let mut writer = BufWriter::new(tmp.as_file());
        encode(img, format, quality, &mut writer)?;
        writer.flush()?;
    }
    tmp.persist(path).map_err(|e| BackendError::Io(e.error))?;
    Ok(())
}

/// Encode `img` as `format`. JPEG has no alpha channel, so the image is
/// flattened to RGB first.
fn encode<W: Write + Seek>(
    img: &DynamicImage,
    format: ImageFormat,
    quality: u32,
    writer: &mut W,
) -> Result<(), BackendError> {
    match format {
        ImageFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(writer, quality.clamp(1, 100) as u8);
            DynamicImage::ImageRgb8(img.to_rgb8())
                .write_with_encoder(encoder)
                .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {}", e)))
        }
        _ => img
            .write_to(writer, format)
            .map_err(|e| BackendError::ProcessingFailed(format!("Encode failed: {}", e))),
    }
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = image::image_dimensions(path).map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to read dimensions: {}", e))
        })?;
        Ok(Dimensions { width, height })
    }

    fn thumbnail(&self, params: &ThumbnailParams) -> Result<(), BackendError> {
        let img = load_image(&params.source)?;
        let resized = img.resize_exact(params.width, params.height, FilterType::Lanczos3);
        save_image(&resized, &params.output, params.quality.value())
    }

    fn crop(&self, params: &CropParams) -> Result<(), BackendError> {
        let img = load_image(&params.source)?;
        let filled = img.resize_exact(params.fill_width, params.fill_height, FilterType::Lanczos3);
        let cropped = filled.crop_imm(params.x, params.y, params.width, params.height);
        save_image(&cropped, &params.output, params.quality.value())
    }
}
