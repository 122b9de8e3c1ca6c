//! # pixgraph-resize
//!
//! Separable resampling filters.
//!
//! - [`kernel`] - interpolation kernels (point, bilinear, bicubic, splines,
//!   Lanczos)
//! - [`context`] - per-output tap windows and quantized weights
//! - [`ResizeImplBuilder`] - one-axis resize filter with CPU dispatch
//! - [`ResizeConversion`] - two-axis resize as up to two filters
//!
//! Word samples use 14-bit fixed-point weights and are bit-exact across
//! implementations. Float samples accumulate in `f32`. Half samples need an
//! accelerated implementation.
//!
//! # Example
//!
//! ```rust
//! use pixgraph_core::{ImageFrame, ImageGeometry, PixelType};
//! use pixgraph_graph::GraphBuilder;
//! use pixgraph_resize::ResizeConversion;
//! use pixgraph_resize::kernel::BilinearKernel;
//!
//! let src_geom = ImageGeometry::new(32, 16, PixelType::Float);
//! let filters = ResizeConversion::new(32, 16, PixelType::Float)
//!     .set_filter(&BilinearKernel)
//!     .set_dst_width(64)
//!     .set_dst_height(8)
//!     .create()
//!     .unwrap();
//!
//! let mut builder = GraphBuilder::new(src_geom).unwrap();
//! for f in filters.into_vec() {
//!     builder.attach_filter(f).unwrap();
//! }
//! let graph = builder.complete().unwrap();
//! assert_eq!((graph.output_width(), graph.output_height()), (64, 8));
//!
//! let src = ImageFrame::new(src_geom).unwrap();
//! let mut dst = ImageFrame::new(ImageGeometry::new(64, 8, PixelType::Float)).unwrap();
//! let mut tmp = vec![0u8; graph.tmp_size()];
//! graph.process(&src.as_read_buffer(), &dst.as_write_buffer(), &mut tmp, None, None).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod builder;
pub mod context;
pub mod conversion;
pub mod kernel;
mod scalar;
mod simd;

pub use builder::ResizeImplBuilder;
pub use context::{FilterContext, compute_filter};
pub use conversion::{ResizeConversion, ResizeFilters};
pub use kernel::{Kernel, KernelKind};
