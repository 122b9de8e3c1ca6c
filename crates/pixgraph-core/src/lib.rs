//! # pixgraph-core
//!
//! Core types for the pixgraph image transformation engine.
//!
//! - [`PixelType`], [`PixelFormat`] - sample storage and numeric interpretation
//! - [`ImageGeometry`] - dimensions, planes and chroma subsampling
//! - [`BufferDescriptor`], [`ImageBuffer`] - pointer/stride/mask plane views
//! - [`ImageFrame`] - owning aligned planar image
//! - [`LineBuffer`] - circular row storage shared with row callbacks
//! - [`cpu`] - instruction set detection and implementation class selection
//! - [`Error`] - error type shared by every pixgraph crate
//!
//! ## Crate Structure
//!
//! ```text
//! pixgraph-core (this crate)
//!    ^
//!    |
//!    +-- pixgraph-graph (filter contract, graph engine, basic filters)
//!           ^
//!           +-- pixgraph-resize (resampling filters)
//!           +-- pixgraph-depth (depth/range conversion filters)
//!           +-- pixgraph-cli
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod align;
pub mod buffer;
pub mod cpu;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod line_buffer;
pub mod pixel;

pub use align::{ALIGNMENT, AlignedVec, align};
pub use buffer::{BUFFER_MAX, BufferDescriptor, ImageBuffer, PLANE_MAX, mask_rows, select_buffer_mask};
pub use cpu::{CpuCapabilities, CpuClass};
pub use error::{Error, Result};
pub use frame::ImageFrame;
pub use geometry::{ALPHA_PLANE, ImageGeometry, SUBSAMPLE_MAX};
pub use line_buffer::LineBuffer;
pub use pixel::{PixelFormat, PixelType, Sample, default_pixel_format};

/// Prelude module for convenient imports.
///
/// ```
/// use pixgraph_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::buffer::{BUFFER_MAX, BufferDescriptor, ImageBuffer};
    pub use crate::cpu::CpuClass;
    pub use crate::error::{Error, Result};
    pub use crate::frame::ImageFrame;
    pub use crate::geometry::ImageGeometry;
    pub use crate::pixel::{PixelFormat, PixelType, Sample};
}
