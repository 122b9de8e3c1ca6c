//! Portable baseline resize. Handles word and float samples.

use pixgraph_core::{BufferDescriptor, CpuClass, PixelType};
use pixgraph_graph::{Filter, FilterDescriptor};

use crate::builder::{ResizeImplFactory, ResizeParams};
use crate::context::{FilterContext, WEIGHT_SHIFT};

pub(crate) const FACTORY: ResizeImplFactory = ResizeImplFactory {
    name: "scalar",
    accepts,
    build,
};

/// Columns accumulated per vertical pass.
const BLOCK: usize = 64;

fn accepts(pixel_type: PixelType, _class: CpuClass) -> bool {
    matches!(pixel_type, PixelType::Word | PixelType::Float)
}

fn build(params: ResizeParams) -> Box<dyn Filter> {
    let desc = params.descriptor();
    if params.horizontal {
        Box::new(ResizeH { desc, params })
    } else {
        Box::new(ResizeV { desc, params })
    }
}

/// Maps an unsigned sample onto the signed 16-bit range.
#[inline]
pub(crate) fn unpack_u16(x: u16) -> i32 {
    x as i32 - 32768
}

/// Rounds a 14-bit fixed-point accumulator back to an unsigned sample.
#[inline]
pub(crate) fn pack_i30(acc: i32, pixel_max: i32) -> u16 {
    let x = (acc.wrapping_add(1 << (WEIGHT_SHIFT - 1)) >> WEIGHT_SHIFT) + 32768;
    x.clamp(0, pixel_max) as u16
}

/// Output samples `[left, left + dst.len())` of one row. `src` starts at
/// input column `src_left`.
pub(crate) fn resize_line_h_u16(
    ctx: &FilterContext,
    src: &[u16],
    src_left: u32,
    dst: &mut [u16],
    left: u32,
    pixel_max: i32,
) {
    let taps = ctx.filter_width as usize;
    for (j, out) in (left..).zip(dst.iter_mut()) {
        let top = (ctx.left[j as usize] - src_left) as usize;
        let mut acc = 0i32;
        for (&c, &x) in ctx.weights_i16(j).iter().zip(&src[top..top + taps]) {
            acc = acc.wrapping_add((c as i32).wrapping_mul(unpack_u16(x)));
        }
        *out = pack_i30(acc, pixel_max);
    }
}

/// Float counterpart of [`resize_line_h_u16`].
pub(crate) fn resize_line_h_f32(ctx: &FilterContext, src: &[f32], src_left: u32, dst: &mut [f32], left: u32) {
    let taps = ctx.filter_width as usize;
    for (j, out) in (left..).zip(dst.iter_mut()) {
        let top = (ctx.left[j as usize] - src_left) as usize;
        let mut acc = 0.0f32;
        for (&c, &x) in ctx.weights(j).iter().zip(&src[top..top + taps]) {
            acc += c * x;
        }
        *out = acc;
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
        let (l, r) = (left as usize, right as usize);

        // SAFETY: the graph keeps input row `i` resident over `col_deps`,
        // and the output row is a distinct buffer.
        unsafe {
            match self.params.pixel_type {
                PixelType::Word => {
                    let src = inputs[0].row::<u16>(i, first as usize, last as usize);
                    let dst = output.row_mut::<u16>(i, l, r);
                    resize_line_h_u16(ctx, src, first, dst, left, self.params.pixel_max);
                }
                PixelType::Float => {
                    let src = inputs[0].row::<f32>(i, first as usize, last as usize);
                    let dst = output.row_mut::<f32>(i, l, r);
                    resize_line_h_f32(ctx, src, first, dst, left);
                }
                PixelType::Byte | PixelType::Half => unreachable!("rejected by the factory"),
            }
        }
    }

    fn name(&self) -> &'static str {
        "resize_h_scalar"
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

        let mut start = left;
        while start < right {
            let end = (start + BLOCK).min(right);
            let mut acc = [0i32; BLOCK];
            for (row, &c) in (top..).zip(weights) {
                // SAFETY: rows `row_deps(i)` are resident.
                let src = unsafe { input.row::<u16>(row, start, end) };
                for (a, &x) in acc.iter_mut().zip(src) {
                    *a = a.wrapping_add((c as i32).wrapping_mul(unpack_u16(x)));
                }
            }
            // SAFETY: exclusive access to output row `i`.
            let dst = unsafe { output.row_mut::<u16>(i, start, end) };
            for (o, &a) in dst.iter_mut().zip(&acc) {
                *o = pack_i30(a, self.params.pixel_max);
            }
            start = end;
        }
    }

    fn process_f32(&self, input: &BufferDescriptor<'_>, output: &BufferDescriptor<'_>, i: u32, left: usize, right: usize) {
        let ctx = &self.params.context;
        let top = ctx.left[i as usize];
        let weights = ctx.weights(i);

        let mut start = left;
        while start < right {
            let end = (start + BLOCK).min(right);
            let mut acc = [0.0f32; BLOCK];
            for (row, &c) in (top..).zip(weights) {
                // SAFETY: rows `row_deps(i)` are resident.
                let src = unsafe { input.row::<f32>(row, start, end) };
                for (a, &x) in acc.iter_mut().zip(src) {
                    *a += c * x;
                }
            }
            // SAFETY: exclusive access to output row `i`.
            let dst = unsafe { output.row_mut::<f32>(i, start, end) };
            dst.copy_from_slice(&acc[..end - start]);
            start = end;
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
            PixelType::Float => self.process_f32(&inputs[0], output, i, l, r),
            PixelType::Byte | PixelType::Half => unreachable!("rejected by the factory"),
        }
    }

    fn name(&self) -> &'static str {
        "resize_v_scalar"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::compute_filter;
    use crate::kernel::BilinearKernel;

    #[test]
    fn test_pack_rounding() {
        assert_eq!(pack_i30(0, 65535), 32768);
        assert_eq!(pack_i30(unpack_u16(1000) << 14, 1023), 1000);
        assert_eq!(pack_i30(unpack_u16(2000) << 14, 1023), 1023);
        assert_eq!(pack_i30(-(1 << 30), 1023), 0);
        // Half a code value rounds up.
        assert_eq!(pack_i30((unpack_u16(10) << 14) + (1 << 13), 1023), 11);
    }

    #[test]
    fn test_line_h_u16_upscale() {
        let ctx = compute_filter(&BilinearKernel, 2, 4, 0.0, 2.0).unwrap();
        let src = [100u16, 200];
        let mut dst = [0u16; 4];
        resize_line_h_u16(&ctx, &src, 0, &mut dst, 0, 1023);
        assert_eq!(dst, [100, 125, 175, 200]);
    }

    #[test]
    fn test_line_h_f32_partial() {
        let ctx = compute_filter(&BilinearKernel, 2, 4, 0.0, 2.0).unwrap();
        let src = [0.0f32, 1.0];
        let mut dst = [0.0f32; 2];
        resize_line_h_f32(&ctx, &src, 0, &mut dst, 1);
        assert_eq!(dst, [0.25, 0.75]);
    }
}
