//! Elementary filters: constant fill, plane copy and alpha (un)premultiply.
//!
//! # Example
//!
//! ```rust
//! use pixgraph_core::{BUFFER_MAX, BufferDescriptor, PixelType};
//! use pixgraph_graph::{Filter, FillValue, ValueInitializeFilter};
//!
//! let fill = ValueInitializeFilter::new(100, 1, PixelType::Byte, FillValue::Byte(37)).unwrap();
//!
//! let mut row = vec![0u8; 100];
//! let out = BufferDescriptor::from_slice_mut(&mut row, 100, BUFFER_MAX);
//! fill.process(&[], &out, 0, 0, 50);
//! fill.process(&[], &out, 0, 50, 100);
//! assert!(row.iter().all(|&b| b == 37));
//! ```

use half::f16;
use pixgraph_core::{BufferDescriptor, Error, PixelType, Result, Sample};

use crate::filter::{Filter, FilterDescriptor};

/// Constant written by [`ValueInitializeFilter`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FillValue {
    /// 8-bit value.
    Byte(u8),
    /// 16-bit value.
    Word(u16),
    /// Half-precision value.
    Half(f16),
    /// Single-precision value.
    Float(f32),
}

impl FillValue {
    /// Pixel type the value is stored as.
    pub fn pixel_type(&self) -> PixelType {
        match self {
            Self::Byte(_) => PixelType::Byte,
            Self::Word(_) => PixelType::Word,
            Self::Half(_) => PixelType::Half,
            Self::Float(_) => PixelType::Float,
        }
    }
}

/// Fills its output with a constant. Has no inputs.
#[derive(Debug)]
pub struct ValueInitializeFilter {
    desc: FilterDescriptor,
    value: FillValue,
}

impl ValueInitializeFilter {
    /// Creates a fill filter. The value must match `pixel_type`.
    pub fn new(width: u32, height: u32, pixel_type: PixelType, value: FillValue) -> Result<Self> {
        if value.pixel_type() != pixel_type {
            return Err(Error::invalid_parameter(
                "value",
                format!("{} value for {pixel_type} plane", value.pixel_type()),
            ));
        }
        Ok(Self {
            desc: FilterDescriptor::new(width, height, pixel_type.size() as u32).with_deps(0),
            value,
        })
    }

    fn fill<T: Sample>(output: &BufferDescriptor<'_>, i: u32, left: u32, right: u32, value: T) {
        // SAFETY: the graph hands out exclusive access to row `i` of the output.
        unsafe { output.row_mut::<T>(i, left as usize, right as usize) }.fill(value);
    }
}

impl Filter for ValueInitializeFilter {
    fn descriptor(&self) -> &FilterDescriptor {
        &self.desc
    }

    fn row_deps(&self, _i: u32) -> (u32, u32) {
        (0, 0)
    }

    fn col_deps(&self, _left: u32, _right: u32) -> (u32, u32) {
        (0, 0)
    }

    fn process(&self, _inputs: &[BufferDescriptor<'_>], output: &BufferDescriptor<'_>, i: u32, left: u32, right: u32) {
        match self.value {
            FillValue::Byte(v) => Self::fill(output, i, left, right, v),
            FillValue::Word(v) => Self::fill(output, i, left, right, v),
            FillValue::Half(v) => Self::fill(output, i, left, right, v),
            FillValue::Float(v) => Self::fill(output, i, left, right, v),
        }
    }

    fn name(&self) -> &'static str {
        "value_init"
    }
}

/// Copies its input plane unchanged.
#[derive(Debug)]
pub struct CopyFilter {
    desc: FilterDescriptor,
}

impl CopyFilter {
    /// Creates a copy filter for `bytes_per_sample`-wide samples.
    pub fn new(width: u32, height: u32, bytes_per_sample: u32) -> Self {
        Self {
            desc: FilterDescriptor::new(width, height, bytes_per_sample),
        }
    }
}

impl Filter for CopyFilter {
    fn descriptor(&self) -> &FilterDescriptor {
        &self.desc
    }

    fn process(&self, inputs: &[BufferDescriptor<'_>], output: &BufferDescriptor<'_>, i: u32, left: u32, right: u32) {
        let bps = self.desc.format.bytes_per_sample as usize;
        let (l, r) = (left as usize * bps, right as usize * bps);

        // SAFETY: input and output are distinct buffers; row `i` is resident.
        unsafe {
            let src = inputs[0].row::<u8>(i, l, r);
            output.row_mut::<u8>(i, l, r).copy_from_slice(src);
        }
    }

    fn name(&self) -> &'static str {
        "copy"
    }
}

/// Alpha clamped to `[0, 1]`, with NaN treated as 0.
#[inline]
fn clamp_alpha(a: f32) -> f32 {
    if a > 0.0 { a.min(1.0) } else { 0.0 }
}

/// Multiplies a float color plane by a float alpha plane.
///
/// Inputs are `[color, alpha]`. The output may alias the color input.
/// The product itself is not clamped.
#[derive(Debug)]
pub struct PremultiplyFilter {
    desc: FilterDescriptor,
}

impl PremultiplyFilter {
    /// Creates a premultiply filter for float planes.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            desc: FilterDescriptor::new(width, height, PixelType::Float.size() as u32)
                .with_deps(2)
                .with_in_place(),
        }
    }
}

impl Filter for PremultiplyFilter {
    fn descriptor(&self) -> &FilterDescriptor {
        &self.desc
    }

    fn process(&self, inputs: &[BufferDescriptor<'_>], output: &BufferDescriptor<'_>, i: u32, left: u32, right: u32) {
        let color = inputs[0].row_ptr::<f32>(i, left as usize);
        let alpha = inputs[1].row_ptr::<f32>(i, left as usize);
        let dst = output.row_ptr::<f32>(i, left as usize);

        // Raw pointers: `dst` may equal `color`.
        for j in 0..(right - left) as usize {
            unsafe {
                let a = clamp_alpha(*alpha.add(j));
                *dst.add(j) = *color.add(j) * a;
            }
        }
    }

    fn name(&self) -> &'static str {
        "premultiply"
    }
}

/// Divides a premultiplied float color plane by a float alpha plane.
///
/// Inputs are `[color, alpha]`. Samples with zero (or negative, or NaN)
/// alpha become exactly 0.
#[derive(Debug)]
pub struct UnpremultiplyFilter {
    desc: FilterDescriptor,
}

impl UnpremultiplyFilter {
    /// Creates an unpremultiply filter for float planes.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            desc: FilterDescriptor::new(width, height, PixelType::Float.size() as u32)
                .with_deps(2)
                .with_in_place(),
        }
    }
}

impl Filter for UnpremultiplyFilter {
    fn descriptor(&self) -> &FilterDescriptor {
        &self.desc
    }

    fn process(&self, inputs: &[BufferDescriptor<'_>], output: &BufferDescriptor<'_>, i: u32, left: u32, right: u32) {
        let color = inputs[0].row_ptr::<f32>(i, left as usize);
        let alpha = inputs[1].row_ptr::<f32>(i, left as usize);
        let dst = output.row_ptr::<f32>(i, left as usize);

        for j in 0..(right - left) as usize {
            unsafe {
                let a = clamp_alpha(*alpha.add(j));
                *dst.add(j) = if a == 0.0 { 0.0 } else { *color.add(j) / a };
            }
        }
    }

    fn name(&self) -> &'static str {
        "unpremultiply"
    }
}
