//! Single-axis resize filter construction and implementation dispatch.
//!
//! [`ResizeImplBuilder`] computes the weight table for one axis, then walks
//! a static list of implementation factories and builds the first one that
//! accepts the pixel type on the resolved [`CpuClass`]. The accelerated
//! `wide` implementation comes first; the scalar baseline is last.
//!
//! ```rust
//! use pixgraph_core::{CpuClass, PixelType};
//! use pixgraph_resize::ResizeImplBuilder;
//! use pixgraph_resize::kernel::BilinearKernel;
//!
//! let filter = ResizeImplBuilder::new(640, 480, PixelType::Word)
//!     .set_horizontal(true)
//!     .set_dst_dim(960)
//!     .set_depth(10)
//!     .set_filter(&BilinearKernel)
//!     .set_cpu(CpuClass::None)
//!     .create()
//!     .unwrap();
//!
//! assert_eq!(filter.descriptor().format.width, 960);
//! assert_eq!(filter.descriptor().format.height, 480);
//! assert_eq!(filter.name(), "resize_h_scalar");
//! ```

use pixgraph_core::{CpuClass, Error, PixelFormat, PixelType, Result};
use pixgraph_graph::{Filter, FilterDescriptor};
use tracing::debug;

use crate::context::{FilterContext, compute_filter};
use crate::kernel::Kernel;
use crate::{scalar, simd};

/// Everything an implementation needs to build a resize filter.
#[derive(Debug, Clone)]
pub(crate) struct ResizeParams {
    pub context: FilterContext,
    pub horizontal: bool,
    pub pixel_type: PixelType,
    pub pixel_max: i32,
    /// Output width.
    pub width: u32,
    /// Output height.
    pub height: u32,
}

impl ResizeParams {
    pub fn descriptor(&self) -> FilterDescriptor {
        FilterDescriptor::new(self.width, self.height, self.pixel_type.size() as u32)
    }
}

/// One entry of the implementation list.
pub(crate) struct ResizeImplFactory {
    pub name: &'static str,
    pub accepts: fn(PixelType, CpuClass) -> bool,
    pub build: fn(ResizeParams) -> Box<dyn Filter>,
}

/// Implementations in order of preference.
const FACTORIES: &[ResizeImplFactory] = &[simd::FACTORY, scalar::FACTORY];

/// Builder for a horizontal or vertical resize filter.
#[derive(Debug, Clone, Copy)]
pub struct ResizeImplBuilder<'k> {
    src_width: u32,
    src_height: u32,
    pixel_type: PixelType,
    horizontal: bool,
    dst_dim: Option<u32>,
    depth: Option<u32>,
    filter: Option<&'k dyn Kernel>,
    shift: f64,
    subwidth: Option<f64>,
    cpu: CpuClass,
}

impl<'k> ResizeImplBuilder<'k> {
    /// Starts a vertical identity resize of a `src_width` x `src_height` plane.
    pub fn new(src_width: u32, src_height: u32, pixel_type: PixelType) -> Self {
        Self {
            src_width,
            src_height,
            pixel_type,
            horizontal: false,
            dst_dim: None,
            depth: None,
            filter: None,
            shift: 0.0,
            subwidth: None,
            cpu: CpuClass::Auto,
        }
    }

    /// Resize along rows (`true`) or columns.
    pub fn set_horizontal(mut self, horizontal: bool) -> Self {
        self.horizontal = horizontal;
        self
    }

    /// Output size along the resized axis. Defaults to the input size.
    pub fn set_dst_dim(mut self, dst_dim: u32) -> Self {
        self.dst_dim = Some(dst_dim);
        self
    }

    /// Significant bits of integer samples. Defaults to the native depth.
    pub fn set_depth(mut self, depth: u32) -> Self {
        self.depth = Some(depth);
        self
    }

    /// Resampling kernel.
    pub fn set_filter(mut self, filter: &'k dyn Kernel) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Offset of the input window, in input samples.
    pub fn set_shift(mut self, shift: f64) -> Self {
        self.shift = shift;
        self
    }

    /// Extent of the input window. Defaults to the input size.
    pub fn set_subwidth(mut self, subwidth: f64) -> Self {
        self.subwidth = Some(subwidth);
        self
    }

    /// Instruction set class.
    pub fn set_cpu(mut self, cpu: CpuClass) -> Self {
        self.cpu = cpu;
        self
    }

    /// Builds the filter.
    pub fn create(&self) -> Result<Box<dyn Filter>> {
        let kernel = self
            .filter
            .ok_or_else(|| Error::invalid_parameter("filter", "no resampling kernel set"))?;

        if self.src_width == 0 || self.src_height == 0 {
            return Err(Error::invalid_dimensions(self.src_width, self.src_height, "empty resize input"));
        }
        if self.pixel_type == PixelType::Byte {
            return Err(Error::unsupported("byte samples cannot be resized, convert to word first"));
        }

        let depth = self.depth.unwrap_or(self.pixel_type.native_depth());
        let format = PixelFormat::new(self.pixel_type).with_depth(depth);
        format.validate()?;

        let src_dim = if self.horizontal { self.src_width } else { self.src_height };
        let dst_dim = self.dst_dim.unwrap_or(src_dim);
        let subwidth = self.subwidth.unwrap_or(src_dim as f64);
        let context = compute_filter(kernel, src_dim, dst_dim, self.shift, subwidth)?;

        let (width, height) = if self.horizontal {
            (dst_dim, self.src_height)
        } else {
            (self.src_width, dst_dim)
        };

        let class = self.cpu.resolve();
        let factory = FACTORIES
            .iter()
            .find(|f| (f.accepts)(self.pixel_type, class))
            .ok_or_else(|| {
                Error::unsupported(format!("{} resize with cpu class {class}", self.pixel_type))
            })?;

        debug!(
            implementation = factory.name,
            horizontal = self.horizontal,
            src_dim,
            dst_dim,
            taps = context.filter_width,
            %class,
            "created resize filter"
        );

        Ok((factory.build)(ResizeParams {
            context,
            horizontal: self.horizontal,
            pixel_type: self.pixel_type,
            pixel_max: format.max_value() as i32,
            width,
            height,
        }))
    }
}
