//! Image processing in pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **Thumbnail** | fit inside box, Lanczos3 |
//! | **Crop** | fill box, crop around the point of interest |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{calculate_crop_offset, calculate_fill_dimensions, calculate_fit_dimensions};
pub use operations::{create_derivative, get_dimensions};
pub use params::{CropParams, Quality, ThumbnailParams};
pub use rust_backend::RustBackend;
