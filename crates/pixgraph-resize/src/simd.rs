//! Accelerated resize using `wide` 8-lane vectors.
//!
//! Lanes map to eight adjacent output samples. Taps are accumulated in the
//! same order as the scalar baseline and without fused multiply-add, so
//! word and float outputs match it exactly. Half samples are widened to
//! `f32` on load and narrowed on store.

use std::array;

use half::f16;
use pixgraph_core::{BufferDescriptor, CpuClass, PixelType, Sample};
use pixgraph_graph::{Filter, FilterDescriptor};
use wide::{f32x8, i32x8};

use crate::builder::{ResizeImplFactory, ResizeParams};
use crate::context::{FilterContext, WEIGHT_SHIFT};
use crate::scalar::{pack_i30, unpack_u16};

pub(crate) const FACTORY: ResizeImplFactory = ResizeImplFactory {
    name: "wide",
    accepts,
    build,
};

const LANES: usize = 8;

fn accepts(pixel_type: PixelType, class: CpuClass) -> bool {
    class.is_accelerated() && pixel_type != PixelType::Byte
}

fn build(params: ResizeParams) -> Box<dyn Filter> {
    let desc = params.descriptor();
    if params.horizontal {
        Box::new(ResizeH { desc, params })
    } else {
        Box::new(ResizeV { desc, params })
    }
}

#[inline]
fn pack_x8(acc: i32x8, pixel_max: i32) -> [u16; LANES] {
    let x = ((acc + i32x8::splat(1 << (WEIGHT_SHIFT - 1))) >> WEIGHT_SHIFT as i32) + i32x8::splat(32768);
    let x = x.max(i32x8::splat(0)).min(i32x8::splat(pixel_max));
    x.to_array().map(|v| v as u16)
}

/// Sample types read and written as `f32` lanes.
trait FloatLane: Copy {
    fn load(self) -> f32;
    fn store(v: f32) -> Self;
}

impl FloatLane for f32 {
    #[inline]
    fn load(self) -> f32 {
        self
    }

    #[inline]
    fn store(v: f32) -> Self {
        v
    }
}

impl FloatLane for f16 {
    #[inline]
    fn load(self) -> f32 {
        self.to_f32()
    }

    #[inline]
    fn store(v: f32) -> Self {
        f16::from_f32(v)
    }
}

fn resize_line_h_u16(ctx: &FilterContext, src: &[u16], src_left: u32, dst: &mut [u16], left: u32, pixel_max: i32) {
    let taps = ctx.filter_width as usize;
    let mut chunks = dst.chunks_exact_mut(LANES);
    let mut j = left as usize;

    for chunk in &mut chunks {
        let tops: [usize; LANES] = array::from_fn(|n| (ctx.left[j + n] - src_left) as usize);
        let mut acc = i32x8::splat(0);
        for k in 0..taps {
            let c: [i32; LANES] = array::from_fn(|n| ctx.data_i16[(j + n) * ctx.stride_i16 + k] as i32);
            let x: [i32; LANES] = array::from_fn(|n| unpack_u16(src[tops[n] + k]));
            acc = acc + i32x8::from(c) * i32x8::from(x);
        }
        chunk.copy_from_slice(&pack_x8(acc, pixel_max));
        j += LANES;
    }

    for out in chunks.into_remainder() {
        let top = (ctx.left[j] - src_left) as usize;
        let mut acc = 0i32;
        for (&c, &x) in ctx.weights_i16(j as u32).iter().zip(&src[top..top + taps]) {
            acc = acc.wrapping_add((c as i32).wrapping_mul(unpack_u16(x)));
        }
        *out = pack_i30(acc, pixel_max);
        j += 1;
    }
}

fn resize_line_h_float<T: FloatLane>(ctx: &FilterContext, src: &[T], src_left: u32, dst: &mut [T], left: u32) {
    let taps = ctx.filter_width as usize;
    let mut chunks = dst.chunks_exact_mut(LANES);
    let mut j = left as usize;

    for chunk in &mut chunks {
        let tops: [usize; LANES] = array::from_fn(|n| (ctx.left[j + n] - src_left) as usize);
        let mut acc = f32x8::splat(0.0);
        for k in 0..taps {
            let c: [f32; LANES] = array::from_fn(|n| ctx.data[(j + n) * ctx.stride + k]);
            let x: [f32; LANES] = array::from_fn(|n| src[tops[n] + k].load());
            acc = acc + f32x8::from(c) * f32x8::from(x);
        }
        for (out, v) in chunk.iter_mut().zip(acc.to_array()) {
            *out = T::store(v);
        }
        j += LANES;
    }

    for out in chunks.into_remainder() {
        let top = (ctx.left[j] - src_left) as usize;
        let mut acc = 0.0f32;
        for (&c, x) in ctx.weights(j as u32).iter().zip(&src[top..top + taps]) {
            acc += c * x.load();
        }
        *out = T::store(acc);
        j += 1;
    }
}

#[derive(Debug)]
struct ResizeH {
    desc: FilterDescriptor,
    params: ResizeParams,
}

impl Filter for ResizeH {
    fn descriptor(&self) -> &FilterDescriptor {
        &self.desc
    }

    fn col_deps(&self, left: u32, right: u32) -> (u32, u32) {
        self.params.context.input_range(left, right)
    }

    fn process(&self, inputs: &[BufferDescriptor<'_>], output: &BufferDescriptor<'_>, i: u32, left: u32, right: u32) {
        let ctx = &self.params.context;
        let (first, last) = ctx.input_range(left, right);
        let (f, l) = (first as usize, last as usize);
        let (dl, dr) = (left as usize, right as usize);

        // SAFETY: the graph keeps input row `i` resident over `col_deps`,
        // and the output row is a distinct buffer.
        unsafe {
            match self.params.pixel_type {
                PixelType::Word => resize_line_h_u16(
                    ctx,
                    inputs[0].row::<u16>(i, f, l),
                    first,
                    output.row_mut::<u16>(i, dl, dr),
                    left,
                    self.params.pixel_max,
                ),
                PixelType::Half => resize_line_h_float(
                    ctx,
                    inputs[0].row::<f16>(i, f, l),
                    first,
                    output.row_mut::<f16>(i, dl, dr),
                    left,
                ),
                PixelType::Float => resize_line_h_float(
                    ctx,
                    inputs[0].row::<f32>(i, f, l),
                    first,
                    output.row_mut::<f32>(i, dl, dr),
                    left,
                ),
                PixelType::Byte => unreachable!("rejected by the factory"),
            }
        }
    }

    fn name(&self) -> &'static str {
        "resize_h_wide"
    }
}

#[derive(Debug)]
struct ResizeV {
    desc: FilterDescriptor,
    params: ResizeParams,
}

impl ResizeV {
    fn process_u16(&self, input: &BufferDescriptor<'_>, output: &BufferDescriptor<'_>, i: u32, left: usize, right: usize) {
        let ctx = &self.params.context;
        let top = ctx.left[i as usize];
        let weights = ctx.weights_i16(i);
        let pixel_max = self.params.pixel_max;

        // SAFETY: exclusive access to output row `i`.
        let dst = unsafe { output.row_mut::<u16>(i, left, right) };
        let mut j = left;
        let mut chunks = dst.chunks_exact_mut(LANES);
        for chunk in &mut chunks {
            let mut acc = i32x8::splat(0);
            for (row, &c) in (top..).zip(weights) {
                // SAFETY: rows `row_deps(i)` are resident.
                let src = unsafe { input.row::<u16>(row, j, j + LANES) };
                let x: [i32; LANES] = array::from_fn(|n| unpack_u16(src[n]));
                acc = acc + i32x8::splat(c as i32) * i32x8::from(x);
            }
            chunk.copy_from_slice(&pack_x8(acc, pixel_max));
            j += LANES;
        }

        for out in chunks.into_remainder() {
            let mut acc = 0i32;
            for (row, &c) in (top..).zip(weights) {
                // SAFETY: as above.
                let x = unsafe { input.row::<u16>(row, j, j + 1) }[0];
                acc = acc.wrapping_add((c as i32).wrapping_mul(unpack_u16(x)));
            }
            *out = pack_i30(acc, pixel_max);
            j += 1;
        }
    }

    fn process_float<T: FloatLane + Sample>(
        &self,
        input: &BufferDescriptor<'_>,
        output: &BufferDescriptor<'_>,
        i: u32,
        left: usize,
        right: usize,
    ) {
        let ctx = &self.params.context;
        let top = ctx.left[i as usize];
        let weights = ctx.weights(i);

        // SAFETY: exclusive access to output row `i`.
        let dst = unsafe { output.row_mut::<T>(i, left, right) };
        let mut j = left;
        let mut chunks = dst.chunks_exact_mut(LANES);
        for chunk in &mut chunks {
            let mut acc = f32x8::splat(0.0);
            for (row, &c) in (top..).zip(weights) {
                // SAFETY: rows `row_deps(i)` are resident.
                let src = unsafe { input.row::<T>(row, j, j + LANES) };
                let x: [f32; LANES] = array::from_fn(|n| src[n].load());
                acc = acc + f32x8::splat(c) * f32x8::from(x);
            }
            for (out, v) in chunk.iter_mut().zip(acc.to_array()) {
                *out = T::store(v);
            }
            j += LANES;
        }

        for out in chunks.into_remainder() {
            let mut acc = 0.0f32;
            for (row, &c) in (top..).zip(weights) {
                // SAFETY: as above.
                let x = unsafe { input.row::<T>(row, j, j + 1) }[0];
                acc += c * x.load();
            }
            *out = T::store(acc);
            j += 1;
        }
    }
}

impl Filter for ResizeV {
    fn descriptor(&self) -> &FilterDescriptor {
        &self.desc
    }

    fn row_deps(&self, i: u32) -> (u32, u32) {
        let top = self.params.context.left[i as usize];
        (top, top + self.params.context.filter_width)
    }

    fn process(&self, inputs: &[BufferDescriptor<'_>], output: &BufferDescriptor<'_>, i: u32, left: u32, right: u32) {
        let (l, r) = (left as usize, right as usize);
        match self.params.pixel_type {
            PixelType::Word => self.process_u16(&inputs[0], output, i, l, r),
            PixelType::Half => self.process_float::<f16>(&inputs[0], output, i, l, r),
            PixelType::Float => self.process_float::<f32>(&inputs[0], output, i, l, r),
            PixelType::Byte => unreachable!("rejected by the factory"),
        }
    }

    fn name(&self) -> &'static str {
        "resize_v_wide"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::compute_filter;
    use crate::kernel::{LanczosKernel, Spline36Kernel};
    use crate::scalar;

    #[test]
    fn test_pack_matches_scalar() {
        let accs = [0, -(1 << 30), 1 << 29, 12345, -8192, 8191, 8192, (1 << 14) * 500];
        let packed = pack_x8(i32x8::from(accs), 1023);
        for (a, p) in accs.iter().zip(packed) {
            assert_eq!(p, pack_i30(*a, 1023));
        }
    }

    #[test]
    fn test_line_h_u16_matches_scalar() {
        let ctx = compute_filter(&LanczosKernel::new(3).unwrap(), 50, 37, 0.25, 49.5).unwrap();
        let src: Vec<u16> = (0..50).map(|x| ((x * 7919) % 1024) as u16).collect();

        let mut a = vec![0u16; 37];
        let mut b = vec![0u16; 37];
        scalar::resize_line_h_u16(&ctx, &src, 0, &mut a, 0, 1023);
        resize_line_h_u16(&ctx, &src, 0, &mut b, 0, 1023);
        assert_eq!(a, b);
    }

    #[test]
    fn test_line_h_f32_matches_scalar() {
        let ctx = compute_filter(&Spline36Kernel, 20, 45, 0.0, 20.0).unwrap();
        let src: Vec<f32> = (0..20).map(|x| (x as f32 * 0.37).sin()).collect();

        let mut a = vec![0.0f32; 30];
        let mut b = vec![0.0f32; 30];
        let (first, last) = ctx.input_range(11, 41);
        let window = &src[first as usize..last as usize];
        scalar::resize_line_h_f32(&ctx, window, first, &mut a, 11);
        resize_line_h_float(&ctx, window, first, &mut b, 11);
        assert_eq!(a, b);
    }
}
