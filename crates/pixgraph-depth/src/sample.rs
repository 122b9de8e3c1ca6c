//! Per-type sample load and store for conversion kernels.

use half::f16;
use pixgraph_core::{PixelType, Sample};

/// A sample that converts to and from `f32`.
pub(crate) trait ConvertSample: Sample + Copy {
    /// Widens to `f32`.
    fn load(self) -> f32;

    /// Narrows from `f32`. Integer types clamp to `[0, max]` and round
    /// half to even; float types ignore `max`.
    fn store(v: f32, max: f32) -> Self;
}

impl ConvertSample for u8 {
    #[inline]
    fn load(self) -> f32 {
        self as f32
    }

    #[inline]
    fn store(v: f32, max: f32) -> Self {
        v.max(0.0).min(max).round_ties_even() as u8
    }
}

impl ConvertSample for u16 {
    #[inline]
    fn load(self) -> f32 {
        self as f32
    }

    #[inline]
    fn store(v: f32, max: f32) -> Self {
        v.max(0.0).min(max).round_ties_even() as u16
    }
}

impl ConvertSample for f16 {
    #[inline]
    fn load(self) -> f32 {
        self.to_f32()
    }

    #[inline]
    fn store(v: f32, _max: f32) -> Self {
        f16::from_f32(v)
    }
}

impl ConvertSample for f32 {
    #[inline]
    fn load(self) -> f32 {
        self
    }

    #[inline]
    fn store(v: f32, _max: f32) -> Self {
        v
    }
}

/// Integer samples that can be shifted into another integer type.
pub(crate) trait IntSample: Sample + Copy {
    fn widen(self) -> u32;
    fn narrow(v: u32) -> Self;
}

impl IntSample for u8 {
    #[inline]
    fn widen(self) -> u32 {
        self as u32
    }

    #[inline]
    fn narrow(v: u32) -> Self {
        v as u8
    }
}

impl IntSample for u16 {
    #[inline]
    fn widen(self) -> u32 {
        self as u32
    }

    #[inline]
    fn narrow(v: u32) -> Self {
        v as u16
    }
}

/// Row conversion over raw pointers so that input and output may alias.
pub(crate) type LineFn<P> = unsafe fn(src: *const u8, dst: *mut u8, n: usize, params: &P);

/// Picks the monomorphized line function for a pair of pixel types.
macro_rules! select_line_fn {
    ($func:ident, $in:expr, $out:expr) => {{
        use half::f16;
        use pixgraph_core::PixelType as T;
        match ($in, $out) {
            (T::Byte, T::Byte) => $func::<u8, u8>,
            (T::Byte, T::Word) => $func::<u8, u16>,
            (T::Byte, T::Half) => $func::<u8, f16>,
            (T::Byte, T::Float) => $func::<u8, f32>,
            (T::Word, T::Byte) => $func::<u16, u8>,
            (T::Word, T::Word) => $func::<u16, u16>,
            (T::Word, T::Half) => $func::<u16, f16>,
            (T::Word, T::Float) => $func::<u16, f32>,
            (T::Half, T::Byte) => $func::<f16, u8>,
            (T::Half, T::Word) => $func::<f16, u16>,
            (T::Half, T::Half) => $func::<f16, f16>,
            (T::Half, T::Float) => $func::<f16, f32>,
            (T::Float, T::Byte) => $func::<f32, u8>,
            (T::Float, T::Word) => $func::<f32, u16>,
            (T::Float, T::Half) => $func::<f32, f16>,
            (T::Float, T::Float) => $func::<f32, f32>,
        }
    }};
}

pub(crate) use select_line_fn;

/// Whether in-place processing is possible between two types.
pub(crate) fn same_size(a: PixelType, b: PixelType) -> bool {
    a.size() == b.size()
}
