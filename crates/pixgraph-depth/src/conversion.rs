//! Depth conversion planning.
//!
//! [`DepthConversion`] picks the cheapest filter that maps one
//! [`PixelFormat`] to another:
//!
//! 1. a plain copy when the formats are equivalent,
//! 2. a left shift for integer depth promotion that keeps the range,
//! 3. the general affine conversion otherwise.

use pixgraph_core::{CpuClass, Error, PixelFormat, Result};
use pixgraph_graph::{CopyFilter, Filter};
use tracing::debug;

use crate::convert::{ConvertFilter, scalar_line};
use crate::left_shift::LeftShiftFilter;
use crate::simd::simd_line;

/// Float formats carry no depth or range flag of their own.
fn equivalent(a: &PixelFormat, b: &PixelFormat) -> bool {
    if a.pixel_type.is_float() || b.pixel_type.is_float() {
        a.pixel_type == b.pixel_type && a.chroma == b.chroma
    } else {
        a == b
    }
}

/// Integer promotion expressible as a left shift.
///
/// Full-range codes do not scale by powers of two (255 maps to 1023, not
/// 1020), so only limited range or equal depth qualifies.
fn is_left_shift(a: &PixelFormat, b: &PixelFormat) -> bool {
    !a.pixel_type.is_float()
        && !b.pixel_type.is_float()
        && a.chroma == b.chroma
        && a.fullrange == b.fullrange
        && (a.depth == b.depth || (!a.fullrange && b.depth > a.depth))
}

/// Builder for a single-plane depth conversion.
///
/// ```rust
/// use pixgraph_core::{PixelFormat, PixelType};
/// use pixgraph_depth::DepthConversion;
///
/// let f = DepthConversion::new(64, 64)
///     .set_pixel_in(PixelFormat::new(PixelType::Byte))
///     .set_pixel_out(PixelFormat::new(PixelType::Word).with_depth(10))
///     .create()
///     .unwrap();
/// assert_eq!(f.name(), "left_shift");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct DepthConversion {
    width: u32,
    height: u32,
    pixel_in: Option<PixelFormat>,
    pixel_out: Option<PixelFormat>,
    cpu: CpuClass,
}

impl DepthConversion {
    /// Starts a conversion of a `width` x `height` plane.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixel_in: None,
            pixel_out: None,
            cpu: CpuClass::Auto,
        }
    }

    /// Input format.
    pub fn set_pixel_in(mut self, format: PixelFormat) -> Self {
        self.pixel_in = Some(format);
        self
    }

    /// Output format.
    pub fn set_pixel_out(mut self, format: PixelFormat) -> Self {
        self.pixel_out = Some(format);
        self
    }

    /// Instruction set class.
    pub fn set_cpu(mut self, cpu: CpuClass) -> Self {
        self.cpu = cpu;
        self
    }

    /// Builds the filter.
    pub fn create(&self) -> Result<Box<dyn Filter>> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::invalid_dimensions(self.width, self.height, "empty depth conversion"));
        }
        let pixel_in = self
            .pixel_in
            .ok_or_else(|| Error::invalid_parameter("pixel_in", "input format not set"))?;
        let pixel_out = self
            .pixel_out
            .ok_or_else(|| Error::invalid_parameter("pixel_out", "output format not set"))?;
        pixel_in.validate()?;
        pixel_out.validate()?;

        let (w, h) = (self.width, self.height);
        let filter: Box<dyn Filter> = if equivalent(&pixel_in, &pixel_out) {
            Box::new(CopyFilter::new(w, h, pixel_out.pixel_type.size() as u32))
        } else if is_left_shift(&pixel_in, &pixel_out) {
            let shift = pixel_out.depth - pixel_in.depth;
            let f = LeftShiftFilter::new(w, h, pixel_in.pixel_type, pixel_out.pixel_type, shift)
                .ok_or_else(|| Error::unsupported("left shift of float samples"))?;
            Box::new(f)
        } else if self.cpu.resolve().is_accelerated() {
            let line = simd_line(pixel_in.pixel_type, pixel_out.pixel_type);
            Box::new(ConvertFilter::new(w, h, &pixel_in, &pixel_out, line, "convert_wide"))
        } else {
            let line = scalar_line(pixel_in.pixel_type, pixel_out.pixel_type);
            Box::new(ConvertFilter::new(w, h, &pixel_in, &pixel_out, line, "convert_scalar"))
        };

        debug!(
            width = w,
            height = h,
            pixel_in = %pixel_in.pixel_type,
            depth_in = pixel_in.depth,
            pixel_out = %pixel_out.pixel_type,
            depth_out = pixel_out.depth,
            filter = filter.name(),
            "planned depth conversion"
        );
        Ok(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixgraph_core::PixelType;

    fn plan(a: PixelFormat, b: PixelFormat) -> &'static str {
        DepthConversion::new(8, 8)
            .set_pixel_in(a)
            .set_pixel_out(b)
            .set_cpu(CpuClass::None)
            .create()
            .unwrap()
            .name()
    }

    #[test]
    fn test_selection() {
        let byte = PixelFormat::new(PixelType::Byte);
        let w10 = PixelFormat::new(PixelType::Word).with_depth(10);
        let float = PixelFormat::new(PixelType::Float);

        assert_eq!(plan(byte, byte), "copy");
        assert_eq!(plan(float, float.with_fullrange(true)), "copy");
        assert_eq!(plan(byte, w10), "left_shift");
        assert_eq!(plan(w10.with_fullrange(true), w10.with_fullrange(true).with_depth(10)), "copy");
        assert_eq!(plan(byte.with_fullrange(true), w10.with_fullrange(true)), "convert_scalar");
        assert_eq!(plan(w10, byte), "convert_scalar");
        assert_eq!(plan(byte, w10.with_chroma(true)), "convert_scalar");
        assert_eq!(plan(byte, float), "convert_scalar");
    }

    #[test]
    fn test_rejects() {
        let byte = PixelFormat::new(PixelType::Byte);
        assert!(DepthConversion::new(8, 8).set_pixel_in(byte).create().is_err());
        assert!(DepthConversion::new(0, 8).set_pixel_in(byte).set_pixel_out(byte).create().is_err());
        let bad = PixelFormat::new(PixelType::Byte).with_depth(9);
        let err = DepthConversion::new(8, 8).set_pixel_in(bad).set_pixel_out(byte).create().unwrap_err();
        assert!(err.is_config());
    }
}
