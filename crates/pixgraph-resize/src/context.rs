//! Tap weight computation.
//!
//! [`compute_filter`] turns a kernel and a scale into a [`FilterContext`]:
//! for each output sample, a window of `filter_width` input samples starting
//! at `left[i]` and the weights to apply to them. Positions falling outside
//! the input are mirrored back in.
//!
//! Weights are stored twice: as `f32`, and as `i16` at 14-bit fixed point.
//! Quantization error is carried from tap to tap, and the `i16` row is
//! corrected so that it sums to exactly `1 << 14`.

use pixgraph_core::{Error, Result, align};

use crate::kernel::Kernel;

/// Fixed-point scale of `i16` weights.
pub const WEIGHT_SHIFT: u32 = 14;

/// Weight table of one resize axis.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterContext {
    /// Taps per output sample.
    pub filter_width: u32,
    /// Number of output samples.
    pub filter_rows: u32,
    /// Number of input samples.
    pub input_width: u32,
    /// Row stride of `data`, in elements.
    pub stride: usize,
    /// Row stride of `data_i16`, in elements.
    pub stride_i16: usize,
    /// Float weights.
    pub data: Vec<f32>,
    /// Fixed-point weights.
    pub data_i16: Vec<i16>,
    /// First input sample of each output sample's window.
    pub left: Vec<u32>,
}

impl FilterContext {
    /// Float weights of output sample `i`.
    #[inline]
    pub fn weights(&self, i: u32) -> &[f32] {
        let start = i as usize * self.stride;
        &self.data[start..start + self.filter_width as usize]
    }

    /// Fixed-point weights of output sample `i`.
    #[inline]
    pub fn weights_i16(&self, i: u32) -> &[i16] {
        let start = i as usize * self.stride_i16;
        &self.data_i16[start..start + self.filter_width as usize]
    }

    /// Input samples `[first, last)` read by output samples `[left, right)`.
    pub fn input_range(&self, left: u32, right: u32) -> (u32, u32) {
        if left >= right {
            return (0, 0);
        }
        (self.left[left as usize], self.left[right as usize - 1] + self.filter_width)
    }
}

/// Sparse weight row before quantization.
struct WeightRow {
    left: usize,
    weights: Vec<f64>,
}

impl WeightRow {
    fn right(&self) -> usize {
        self.left + self.weights.len()
    }
}

/// Builds the weight table for resizing `src_dim` samples to `dst_dim`.
///
/// The output covers the input window `[shift, shift + width)`. `width`
/// may be fractional and the window may extend past the input edges.
pub fn compute_filter(
    kernel: &dyn Kernel,
    src_dim: u32,
    dst_dim: u32,
    shift: f64,
    width: f64,
) -> Result<FilterContext> {
    if src_dim == 0 || dst_dim == 0 {
        return Err(Error::invalid_dimensions(src_dim, dst_dim, "empty resize axis"));
    }
    if !width.is_finite() || width <= 0.0 {
        return Err(Error::invalid_parameter("subwidth", format!("{width} is not a positive window")));
    }
    if !shift.is_finite() {
        return Err(Error::invalid_parameter("shift", format!("{shift} is not finite")));
    }

    let scale = dst_dim as f64 / width;
    let step = scale.min(1.0);
    let support = kernel.support() as f64 / step;
    let taps = ((support.ceil() as u64) * 2).max(1);
    if taps > u32::MAX as u64 / 2 {
        return Err(Error::invalid_parameter("subwidth", format!("filter of {taps} taps is too wide")));
    }
    let taps = taps as u32;
    let src = src_dim as f64;

    let mut rows = Vec::with_capacity(dst_dim as usize);
    let mut positions = Vec::with_capacity(taps as usize);
    for i in 0..dst_dim {
        let pos = (i as f64 + 0.5) / scale + shift;
        let begin = (pos - taps as f64 / 2.0 + 0.5).floor() + 0.5;

        let mut total = 0.0;
        positions.clear();
        for j in 0..taps {
            let xpos = begin + j as f64;
            let w = kernel.evaluate((xpos - pos) * step);
            total += w;

            let real = if xpos < 0.0 {
                -xpos
            } else if xpos >= src {
                (2.0 * src - xpos).min(src - 0.5)
            } else {
                xpos
            };
            // Mirroring more than one image width away still lands outside.
            let idx = real.floor().clamp(0.0, src - 1.0) as usize;
            positions.push((idx, w));
        }

        let lo = positions.iter().map(|p| p.0).min().unwrap_or(0);
        let hi = positions.iter().map(|p| p.0).max().unwrap_or(0);
        let mut weights = vec![0.0; hi - lo + 1];
        for &(idx, w) in &positions {
            weights[idx - lo] += w / total;
        }
        rows.push(WeightRow { left: lo, weights });
    }

    Ok(quantize(&rows, src_dim))
}

/// Packs weight rows into a fixed-width table with `f32` and `i16` copies.
///
/// Anchors are made non-decreasing, widening the window where a mirrored
/// row starts to the right of its successor.
fn quantize(rows: &[WeightRow], src_dim: u32) -> FilterContext {
    let mut anchors: Vec<usize> = rows.iter().map(|r| r.left).collect();
    for i in (1..anchors.len()).rev() {
        anchors[i - 1] = anchors[i - 1].min(anchors[i]);
    }
    let filter_width = rows
        .iter()
        .zip(&anchors)
        .map(|(r, &a)| r.right() - a)
        .max()
        .unwrap_or(1)
        .min(src_dim as usize);
    let stride = align(filter_width, 8);
    let stride_i16 = align(filter_width, 16);

    let mut ctx = FilterContext {
        filter_width: filter_width as u32,
        filter_rows: rows.len() as u32,
        input_width: src_dim,
        stride,
        stride_i16,
        data: vec![0.0; stride * rows.len()],
        data_i16: vec![0; stride_i16 * rows.len()],
        left: Vec::with_capacity(rows.len()),
    };

    let one = (1i32 << WEIGHT_SHIFT) as f64;
    for (i, row) in rows.iter().enumerate() {
        let left = anchors[i].min(src_dim as usize - filter_width);
        debug_assert!(left <= row.left && row.right() <= left + filter_width);
        debug_assert!(ctx.left.last().is_none_or(|&prev| prev as usize <= left));

        let mut err_f32 = 0.0f64;
        let mut err_i16 = 0.0f64;
        let mut sum_i16 = 0i32;
        let mut greatest = (0i32, 0usize);

        for j in 0..filter_width {
            let col = left + j;
            let coeff = if col >= row.left && col < row.right() { row.weights[col - row.left] } else { 0.0 };

            let want_f32 = coeff - err_f32;
            let want_i16 = coeff * one - err_i16;
            let q_f32 = want_f32 as f32;
            let q_i16 = want_i16.round_ties_even() as i16;
            err_f32 = q_f32 as f64 - want_f32;
            err_i16 = q_i16 as f64 - want_i16;

            if (q_i16 as i32).abs() > greatest.0 {
                greatest = ((q_i16 as i32).abs(), j);
            }
            sum_i16 += q_i16 as i32;
            ctx.data[i * stride + j] = q_f32;
            ctx.data_i16[i * stride_i16 + j] = q_i16;
        }

        let fix = &mut ctx.data_i16[i * stride_i16 + greatest.1];
        *fix = (*fix as i32 + (1 << WEIGHT_SHIFT) - sum_i16) as i16;
        ctx.left.push(left as u32);
    }

    ctx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{BilinearKernel, LanczosKernel, PointKernel, Spline36Kernel};
    use approx::assert_abs_diff_eq;

    fn assert_normalized(ctx: &FilterContext) {
        for i in 0..ctx.filter_rows {
            let sum: i32 = ctx.weights_i16(i).iter().map(|&w| w as i32).sum();
            assert_eq!(sum, 1 << WEIGHT_SHIFT, "row {i}");
            let sum_f: f32 = ctx.weights(i).iter().sum();
            assert_abs_diff_eq!(sum_f, 1.0, epsilon = 1e-5);
            assert!(ctx.left[i as usize] + ctx.filter_width <= ctx.input_width);
        }
    }

    #[test]
    fn test_identity_bilinear() {
        let ctx = compute_filter(&BilinearKernel, 16, 16, 0.0, 16.0).unwrap();
        assert_eq!(ctx.filter_width, 2);
        for i in 0..16u32 {
            let w = ctx.weights(i);
            let tap = (i - ctx.left[i as usize]) as usize;
            assert_eq!(w[tap], 1.0);
            assert_eq!(ctx.weights_i16(i)[tap], 1 << WEIGHT_SHIFT);
        }
        assert_normalized(&ctx);
    }

    #[test]
    fn test_upscale_bilinear_weights() {
        // 2x upsampling: output centers sit a quarter sample off input centers.
        let ctx = compute_filter(&BilinearKernel, 8, 16, 0.0, 8.0).unwrap();
        let w = ctx.weights(5);
        let mut nonzero: Vec<f32> = w.iter().copied().filter(|&v| v != 0.0).collect();
        nonzero.sort_by(f32::total_cmp);
        assert_eq!(nonzero, vec![0.25, 0.75]);
        assert_normalized(&ctx);
    }

    #[test]
    fn test_downscale_widens() {
        let ctx = compute_filter(&Spline36Kernel, 100, 25, 0.0, 100.0).unwrap();
        assert_eq!(ctx.filter_width, 24);
        assert_normalized(&ctx);
    }

    #[test]
    fn test_window_clamped_to_source() {
        let ctx = compute_filter(&LanczosKernel::new(4).unwrap(), 3, 6, 0.0, 3.0).unwrap();
        assert_eq!(ctx.filter_width, 3);
        assert!(ctx.left.iter().all(|&l| l == 0));
        assert_normalized(&ctx);
    }

    #[test]
    fn test_point_is_nearest() {
        let ctx = compute_filter(&PointKernel, 4, 8, 0.0, 4.0).unwrap();
        assert_eq!(ctx.filter_width, 1);
        assert_eq!(ctx.left, vec![0, 0, 1, 1, 2, 2, 3, 3]);
    }

    #[test]
    fn test_shift_moves_window() {
        let a = compute_filter(&BilinearKernel, 32, 32, 0.0, 32.0).unwrap();
        let b = compute_filter(&BilinearKernel, 32, 32, 4.0, 32.0).unwrap();
        assert_eq!(b.left[8], a.left[12]);
    }

    #[test]
    fn test_input_range() {
        let ctx = compute_filter(&BilinearKernel, 64, 32, 0.0, 64.0).unwrap();
        let (first, last) = ctx.input_range(4, 10);
        assert_eq!(first, ctx.left[4]);
        assert_eq!(last, ctx.left[9] + ctx.filter_width);
        assert_eq!(ctx.input_range(3, 3), (0, 0));
    }

    #[test]
    fn test_mirrored_anchors_are_monotonic() {
        let cases: [(&dyn Kernel, u32, u32); 3] =
            [(&PointKernel, 16, 16), (&BilinearKernel, 16, 16), (&BilinearKernel, 33, 300)];
        for (kernel, src, dst) in cases {
            for shift in [-1.75, 1.75] {
                let ctx = compute_filter(kernel, src, dst, shift, src as f64).unwrap();
                assert!(ctx.left.windows(2).all(|w| w[0] <= w[1]), "shift {shift}: {:?}", ctx.left);
                assert_normalized(&ctx);
            }
        }
        // Point at -1.75: the first sample mirrors to column 1, the second reads column 0.
        let ctx = compute_filter(&PointKernel, 16, 16, -1.75, 16.0).unwrap();
        assert_eq!(ctx.filter_width, 2);
        assert_eq!(ctx.left[..2], [0, 0]);
        assert_eq!(ctx.weights(0), [0.0, 1.0]);
        assert_eq!(ctx.input_range(0, 2), (0, 2));
    }

    #[test]
    fn test_rejects_bad_params() {
        assert!(compute_filter(&BilinearKernel, 0, 4, 0.0, 4.0).is_err());
        assert!(compute_filter(&BilinearKernel, 4, 4, 0.0, 0.0).is_err());
        assert!(compute_filter(&BilinearKernel, 4, 4, f64::NAN, 4.0).is_err());
    }
}
