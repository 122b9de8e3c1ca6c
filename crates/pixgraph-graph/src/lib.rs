//! # pixgraph-graph
//!
//! Filter contract and tiled filter graph engine.
//!
//! - [`Filter`] - elementary row/column-addressed transformation
//! - [`basic`] - fill, copy and alpha (un)premultiply filters
//! - [`GraphBuilder`] / [`FilterGraph`] - per-plane filter chains, compiled
//!   into a fixed buffer plan and executed tile by tile
//! - `validation` (feature) - randomized harness checking tiling
//!   invariance, output hashes and SNR against a reference filter
//!
//! # Example
//!
//! ```rust
//! use pixgraph_core::{ImageFrame, ImageGeometry, PixelType};
//! use pixgraph_graph::{FillValue, GraphBuilder, ValueInitializeFilter};
//!
//! let geom = ImageGeometry::new(64, 4, PixelType::Byte);
//! let mut builder = GraphBuilder::new(geom).unwrap();
//! builder
//!     .attach_filter(Box::new(
//!         ValueInitializeFilter::new(64, 4, PixelType::Byte, FillValue::Byte(200)).unwrap(),
//!     ))
//!     .unwrap();
//! let graph = builder.complete().unwrap();
//!
//! let src = ImageFrame::new(geom).unwrap();
//! let mut dst = ImageFrame::new(geom).unwrap();
//! let mut tmp = vec![0u8; graph.tmp_size()];
//! graph
//!     .process(&src.as_read_buffer(), &dst.as_write_buffer(), &mut tmp, None, None)
//!     .unwrap();
//! assert!(dst.row::<u8>(0, 3).iter().all(|&v| v == 200));
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod basic;
pub mod filter;
pub mod graph;
#[cfg(feature = "validation")]
pub mod validation;

pub use basic::{CopyFilter, FillValue, PremultiplyFilter, UnpremultiplyFilter, ValueInitializeFilter};
pub use filter::{Filter, FilterDescriptor, FilterFlags, FilterFormat};
pub use graph::{FilterGraph, GraphBuilder, NODE_MAX, RowCallback};
