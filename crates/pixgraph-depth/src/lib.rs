//! # pixgraph-depth
//!
//! Conversion between sample types, bit depths and numeric ranges.
//!
//! Each plane is converted independently by a filter chosen by
//! [`DepthConversion`]:
//!
//! | Case | Filter |
//! |------|--------|
//! | equivalent formats | `copy` |
//! | integer promotion, same range | `left_shift` |
//! | anything else | `convert_scalar` / `convert_wide` |
//!
//! The general path maps codes through `y = x * scale + offset` in `f32`.
//! Integer outputs are clamped to `[0, 2^depth - 1]` and rounded half to
//! even. Float luma is normalized to `[0, 1]`, float chroma to
//! `[-0.5, 0.5]`. Both implementations produce identical samples.
//!
//! # Example
//!
//! ```rust
//! use pixgraph_core::{ImageFrame, ImageGeometry, PixelFormat, PixelType};
//! use pixgraph_depth::DepthConversion;
//!
//! let filter = DepthConversion::new(4, 1)
//!     .set_pixel_in(PixelFormat::new(PixelType::Byte))
//!     .set_pixel_out(PixelFormat::new(PixelType::Float))
//!     .create()
//!     .unwrap();
//!
//! let mut src = ImageFrame::new(ImageGeometry::new(4, 1, PixelType::Byte)).unwrap();
//! src.row_mut::<u8>(0, 0).copy_from_slice(&[16, 235, 16, 235]);
//! let mut dst = ImageFrame::new(ImageGeometry::new(4, 1, PixelType::Float)).unwrap();
//! filter.process(&[src.as_read_plane(0)], &dst.as_write_buffer()[0], 0, 0, 4);
//! assert!((dst.row::<f32>(0, 0)[1] - 1.0).abs() < 1e-6);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod conversion;
mod convert;
mod left_shift;
mod sample;
mod simd;

pub use conversion::DepthConversion;
