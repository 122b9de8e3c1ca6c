//! Accelerated conversion using `wide` 8-lane vectors.
//!
//! The affine map runs on `f32x8`. Each lane is then stored through the
//! same narrowing as the baseline, so both produce identical samples.

use std::array;

use pixgraph_core::PixelType;
use wide::f32x8;

use crate::convert::ConvertParams;
use crate::sample::{ConvertSample, LineFn};

const LANES: usize = 8;

/// Vector line kernel.
///
/// # Safety
///
/// Same contract as [`crate::convert::convert_line`]. Each chunk is fully
/// loaded before any of it is stored, so aliasing of equal-size types is
/// allowed.
pub(crate) unsafe fn convert_line_x8<I: ConvertSample, O: ConvertSample>(
    src: *const u8,
    dst: *mut u8,
    n: usize,
    params: &ConvertParams,
) {
    let (src, dst) = (src.cast::<I>(), dst.cast::<O>());
    let scale = f32x8::splat(params.scale);
    let offset = f32x8::splat(params.offset);

    let full = n - n % LANES;
    let mut j = 0;
    while j < full {
        let x: [f32; LANES] = array::from_fn(|k| unsafe { src.add(j + k).read().load() });
        let y = f32x8::from(x) * scale + offset;
        for (k, v) in y.to_array().into_iter().enumerate() {
            unsafe { dst.add(j + k).write(O::store(v, params.max)) };
        }
        j += LANES;
    }

    for j in full..n {
        unsafe {
            let x = src.add(j).read().load();
            dst.add(j).write(O::store(x * params.scale + params.offset, params.max));
        }
    }
}

/// Picks the vector line kernel.
pub(crate) fn simd_line(pixel_in: PixelType, pixel_out: PixelType) -> LineFn<ConvertParams> {
    crate::sample::select_line_fn!(convert_line_x8, pixel_in, pixel_out)
}
