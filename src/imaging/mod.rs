//! Image manager: decode, resize by policy, compress, encode.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::load_from_memory_with_format` |
//! | **EXIF orientation / keep metadata** | custom APP1 segment reader ([`exif`]) |
//! | **Resize** | Lanczos3, policy from [`ResizeType`] |
//! | **Encode** | JPEG / PNG / WebP (lossless) / AVIF (rav1e) / BMP |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: [`ImageInfo`] and the value types it is built from
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: the filter → resize → rotate → compress pipeline

pub mod backend;
pub mod calculations;
pub mod exif;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend, ImageData};
pub use operations::{OperationError, apply_rotation, process_image, transform_image};
pub use params::{ImageFormat, ImageInfo, LimitsPolicy, ParamParseError, Quality, ResizeType};
pub use rust_backend::{RustBackend, supported_input_extensions};
