//! High-level image operations.
//!
//! These functions map a [`RenditionOp`] onto backend calls: they read the
//! source size, compute the output geometry, and hand the backend a fully
//! resolved parameter struct.

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::{
    calculate_crop_offset, calculate_fill_dimensions, calculate_fit_dimensions,
};
use super::params::{CropParams, Quality, ThumbnailParams};
use crate::registry::RenditionOp;
use crate::types::Ppoi;
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &impl ImageBackend, path: &Path) -> Result<(u32, u32)> {
    let dims = backend.identify(path)?;
    Ok((dims.width, dims.height))
}

/// Plan a thumbnail without executing it.
pub fn plan_thumbnail(
    source: &Path,
    output: &Path,
    source_dims: (u32, u32),
    bounds: (u32, u32),
    quality: Quality,
) -> ThumbnailParams {
    let (width, height) = calculate_fit_dimensions(source_dims, bounds);
    ThumbnailParams {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        width,
        height,
        quality,
    }
}

/// Plan a point-of-interest crop without executing it.
pub fn plan_crop(
    source: &Path,
    output: &Path,
    source_dims: (u32, u32),
    target: (u32, u32),
    ppoi: Ppoi,
    quality: Quality,
) -> CropParams {
    let (fill_width, fill_height) = calculate_fill_dimensions(source_dims, target);
    let (x, y) = calculate_crop_offset((fill_width, fill_height), target, ppoi);
    CropParams {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        fill_width,
        fill_height,
        x,
        y,
        width: target.0,
        height: target.1,
        quality,
    }
}

/// Render one derivative of `source` into `output`.
///
/// Creates the output's parent directory. Returns the pixel size written.
pub fn create_derivative(
    backend: &impl ImageBackend,
    source: &Path,
    output: &Path,
    op: RenditionOp,
    ppoi: Ppoi,
    quality: Quality,
) -> Result<Dimensions> {
    let Some(target) = op.target() else {
        return Err(BackendError::ProcessingFailed(format!(
            "'{op}' has no derivative to render"
        )));
    };

    let source_dims = get_dimensions(backend, source)?;
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }

    match op {
        RenditionOp::Crop { .. } => {
            let params = plan_crop(source, output, source_dims, target, ppoi, quality);
            backend.crop(&params)?;
            Ok(Dimensions {
                width: params.width,
                height: params.height,
            })
        }
        _ => {
            let params = plan_thumbnail(source, output, source_dims, target, quality);
            backend.thumbnail(&params)?;
            Ok(Dimensions {
                width: params.width,
                height: params.height,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use tempfile::TempDir;

    #[test]
    fn get_dimensions_calls_backend() {
        let backend = MockBackend::with_dimensions(vec![Dimensions {
            width: 1920,
            height: 1080,
        }]);

        let dims = get_dimensions(&backend, Path::new("/test.jpg")).unwrap();
        assert_eq!(dims, (1920, 1080));
    }

    #[test]
    fn plan_thumbnail_fits_inside_box() {
        let params = plan_thumbnail(
            Path::new("/source.jpg"),
            Path::new("/out.jpg"),
            (2000, 1000),
            (640, 480),
            Quality::default(),
        );
        assert_eq!((params.width, params.height), (640, 320));
    }

    #[test]
    fn plan_crop_square_from_landscape() {
        let params = plan_crop(
            Path::new("/source.jpg"),
            Path::new("/out.jpg"),
            (1200, 800),
            (150, 150),
            Ppoi::default(),
            Quality::new(70),
        );
        assert_eq!((params.fill_width, params.fill_height), (225, 150));
        assert_eq!((params.x, params.y), (38, 0));
        assert_eq!((params.width, params.height), (150, 150));
        assert_eq!(params.quality.value(), 70);
    }

    #[test]
    fn create_derivative_thumbnail_uses_backend() {
        let tmp = TempDir::new().unwrap();
        let backend = MockBackend::with_dimensions(vec![Dimensions {
            width: 1600,
            height: 1200,
        }]);
        let output = tmp.path().join("__sized__/a/b-thumbnail-640x480.jpg");

        let dims = create_derivative(
            &backend,
            Path::new("/source.jpg"),
            &output,
            RenditionOp::Thumbnail {
                width: 640,
                height: 480,
            },
            Ppoi::default(),
            Quality::default(),
        )
        .unwrap();

        assert_eq!(
            dims,
            Dimensions {
                width: 640,
                height: 480
            }
        );
        assert!(output.parent().unwrap().is_dir());
        let ops = backend.get_operations();
        assert_eq!(ops.len(), 2);
        assert!(matches!(&ops[0], RecordedOp::Identify(_)));
        assert!(matches!(
            &ops[1],
            RecordedOp::Thumbnail {
                width: 640,
                height: 480,
                ..
            }
        ));
    }

    #[test]
    fn create_derivative_crop_uses_ppoi() {
        let tmp = TempDir::new().unwrap();
        let backend = MockBackend::with_dimensions(vec![Dimensions {
            width: 1200,
            height: 800,
        }]);

        create_derivative(
            &backend,
            Path::new("/source.jpg"),
            &tmp.path().join("crop.jpg"),
            RenditionOp::Crop {
                width: 150,
                height: 150,
            },
            Ppoi::new(1.0, 0.5),
            Quality::default(),
        )
        .unwrap();

        let ops = backend.get_operations();
        assert!(matches!(
            &ops[1],
            RecordedOp::Crop {
                window: (75, 0, 150, 150),
                ..
            }
        ));
    }

    #[test]
    fn create_derivative_identity_is_error() {
        let backend = MockBackend::new();
        let result = create_derivative(
            &backend,
            Path::new("/source.jpg"),
            Path::new("/out.jpg"),
            RenditionOp::Identity,
            Ppoi::default(),
            Quality::default(),
        );
        assert!(result.is_err());
        assert!(backend.get_operations().is_empty());
    }
}
