//! Two-axis resize.
//!
//! [`ResizeConversion`] splits a 2D resize into a horizontal and a vertical
//! pass. Axes that are identities are skipped, and the remaining passes are
//! ordered to minimize the estimated tap work.

use pixgraph_core::{CpuClass, Error, PixelType, Result};
use pixgraph_graph::Filter;
use tracing::debug;

use crate::builder::ResizeImplBuilder;
use crate::kernel::Kernel;

/// The filters of a two-axis resize, in execution order.
#[derive(Debug, Default)]
pub struct ResizeFilters {
    /// Pass applied to the input.
    pub first: Option<Box<dyn Filter>>,
    /// Pass applied to the output of `first`.
    pub second: Option<Box<dyn Filter>>,
}

impl ResizeFilters {
    /// No pass is needed.
    pub fn is_identity(&self) -> bool {
        self.first.is_none() && self.second.is_none()
    }

    /// Present passes in execution order.
    pub fn into_vec(self) -> Vec<Box<dyn Filter>> {
        self.first.into_iter().chain(self.second).collect()
    }
}

/// Whether the horizontal pass should run first.
///
/// Cost counts output samples times taps, taking a horizontal tap as twice
/// as expensive as a vertical one.
fn resize_h_first(xscale: f64, yscale: f64) -> bool {
    let h_first = xscale.max(1.0) * 2.0 + xscale * yscale.max(1.0);
    let v_first = yscale.max(1.0) + yscale * xscale.max(1.0) * 2.0;
    h_first < v_first
}

/// Builder for a two-axis resize.
///
/// ```rust
/// use pixgraph_core::PixelType;
/// use pixgraph_resize::ResizeConversion;
/// use pixgraph_resize::kernel::Spline36Kernel;
///
/// let filters = ResizeConversion::new(1920, 1080, PixelType::Float)
///     .set_filter(&Spline36Kernel)
///     .set_dst_width(1280)
///     .set_dst_height(720)
///     .create()
///     .unwrap();
/// assert!(filters.first.is_some() && filters.second.is_some());
///
/// let same = ResizeConversion::new(64, 64, PixelType::Float)
///     .set_filter(&Spline36Kernel)
///     .create()
///     .unwrap();
/// assert!(same.is_identity());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ResizeConversion<'k> {
    src_width: u32,
    src_height: u32,
    pixel_type: PixelType,
    depth: Option<u32>,
    filter: Option<&'k dyn Kernel>,
    dst_width: Option<u32>,
    dst_height: Option<u32>,
    shift_w: f64,
    shift_h: f64,
    subwidth: Option<f64>,
    subheight: Option<f64>,
    cpu: CpuClass,
}

impl<'k> ResizeConversion<'k> {
    /// Starts an identity resize of a `src_width` x `src_height` plane.
    pub fn new(src_width: u32, src_height: u32, pixel_type: PixelType) -> Self {
        Self {
            src_width,
            src_height,
            pixel_type,
            depth: None,
            filter: None,
            dst_width: None,
            dst_height: None,
            shift_w: 0.0,
            shift_h: 0.0,
            subwidth: None,
            subheight: None,
            cpu: CpuClass::Auto,
        }
    }

    /// Significant bits of integer samples.
    pub fn set_depth(mut self, depth: u32) -> Self {
        self.depth = Some(depth);
        self
    }

    /// Resampling kernel for both axes.
    pub fn set_filter(mut self, filter: &'k dyn Kernel) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Output width.
    pub fn set_dst_width(mut self, width: u32) -> Self {
        self.dst_width = Some(width);
        self
    }

    /// Output height.
    pub fn set_dst_height(mut self, height: u32) -> Self {
        self.dst_height = Some(height);
        self
    }

    /// Horizontal offset of the input window.
    pub fn set_shift_w(mut self, shift: f64) -> Self {
        self.shift_w = shift;
        self
    }

    /// Vertical offset of the input window.
    pub fn set_shift_h(mut self, shift: f64) -> Self {
        self.shift_h = shift;
        self
    }

    /// Width of the input window.
    pub fn set_subwidth(mut self, subwidth: f64) -> Self {
        self.subwidth = Some(subwidth);
        self
    }

    /// Height of the input window.
    pub fn set_subheight(mut self, subheight: f64) -> Self {
        self.subheight = Some(subheight);
        self
    }

    /// Instruction set class.
    pub fn set_cpu(mut self, cpu: CpuClass) -> Self {
        self.cpu = cpu;
        self
    }

    /// Builds the passes.
    pub fn create(&self) -> Result<ResizeFilters> {
        let dst_width = self.dst_width.unwrap_or(self.src_width);
        let dst_height = self.dst_height.unwrap_or(self.src_height);
        let subwidth = self.subwidth.unwrap_or(self.src_width as f64);
        let subheight = self.subheight.unwrap_or(self.src_height as f64);
        if dst_width == 0 || dst_height == 0 {
            return Err(Error::invalid_dimensions(dst_width, dst_height, "empty resize output"));
        }

        let skip_h = dst_width == self.src_width && self.shift_w == 0.0 && subwidth == self.src_width as f64;
        let skip_v = dst_height == self.src_height && self.shift_h == 0.0 && subheight == self.src_height as f64;

        let h_first = resize_h_first(dst_width as f64 / subwidth, dst_height as f64 / subheight);

        let axis = |width: u32, height: u32| {
            let mut b = ResizeImplBuilder::new(width, height, self.pixel_type).set_cpu(self.cpu);
            if let Some(filter) = self.filter {
                b = b.set_filter(filter);
            }
            if let Some(depth) = self.depth {
                b = b.set_depth(depth);
            }
            b
        };
        let horizontal = |height: u32| {
            axis(self.src_width, height)
                .set_horizontal(true)
                .set_dst_dim(dst_width)
                .set_shift(self.shift_w)
                .set_subwidth(subwidth)
        };
        let vertical = |width: u32| {
            axis(width, self.src_height)
                .set_dst_dim(dst_height)
                .set_shift(self.shift_h)
                .set_subwidth(subheight)
        };

        let mut filters = ResizeFilters::default();
        match (skip_h, skip_v) {
            (true, true) => {}
            (false, true) => filters.first = Some(horizontal(self.src_height).create()?),
            (true, false) => filters.first = Some(vertical(self.src_width).create()?),
            (false, false) if h_first => {
                filters.first = Some(horizontal(self.src_height).create()?);
                filters.second = Some(vertical(dst_width).create()?);
            }
            (false, false) => {
                filters.first = Some(vertical(self.src_width).create()?);
                filters.second = Some(horizontal(dst_height).create()?);
            }
        }

        debug!(
            src_width = self.src_width,
            src_height = self.src_height,
            dst_width,
            dst_height,
            skip_h,
            skip_v,
            h_first,
            "planned resize"
        );
        Ok(filters)
    }
}
