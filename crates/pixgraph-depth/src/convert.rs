//! Affine sample conversion: `y = x * scale + offset` in `f32`.

use pixgraph_core::{BufferDescriptor, PixelFormat, PixelType};
use pixgraph_graph::{Filter, FilterDescriptor};

use crate::sample::{ConvertSample, LineFn, same_size};

/// Scale and offset taking input codes to output codes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ConvertParams {
    pub scale: f32,
    pub offset: f32,
    /// Largest output code of an integer output.
    pub max: f32,
}

/// Offset and extent of a format's nominal range. Float luma spans
/// `[0, 1]` and float chroma `[-0.5, 0.5]`, both with unit extent.
fn range_of(format: &PixelFormat) -> (f64, f64) {
    if format.pixel_type.is_float() {
        (0.0, 1.0)
    } else {
        let (offset, range) = format.integer_range();
        (offset as f64, range as f64)
    }
}

impl ConvertParams {
    pub fn new(pixel_in: &PixelFormat, pixel_out: &PixelFormat) -> Self {
        let (off_in, range_in) = range_of(pixel_in);
        let (off_out, range_out) = range_of(pixel_out);
        let scale = range_out / range_in;
        Self {
            scale: scale as f32,
            offset: (off_out - off_in * scale) as f32,
            max: pixel_out.max_value() as f32,
        }
    }
}

/// Baseline line kernel.
///
/// # Safety
///
/// `src` and `dst` must address `n` samples of `I` and `O`. They may be
/// equal when `I` and `O` have the same size.
pub(crate) unsafe fn convert_line<I: ConvertSample, O: ConvertSample>(
    src: *const u8,
    dst: *mut u8,
    n: usize,
    params: &ConvertParams,
) {
    let (src, dst) = (src.cast::<I>(), dst.cast::<O>());
    for j in 0..n {
        unsafe {
            let x = src.add(j).read().load();
            dst.add(j).write(O::store(x * params.scale + params.offset, params.max));
        }
    }
}

/// Converts between any two pixel formats through an affine map.
pub(crate) struct ConvertFilter {
    desc: FilterDescriptor,
    params: ConvertParams,
    in_size: usize,
    out_size: usize,
    line: LineFn<ConvertParams>,
    name: &'static str,
}

impl ConvertFilter {
    pub fn new(
        width: u32,
        height: u32,
        pixel_in: &PixelFormat,
        pixel_out: &PixelFormat,
        line: LineFn<ConvertParams>,
        name: &'static str,
    ) -> Self {
        let mut desc = FilterDescriptor::new(width, height, pixel_out.pixel_type.size() as u32);
        if same_size(pixel_in.pixel_type, pixel_out.pixel_type) {
            desc = desc.with_in_place();
        }
        Self {
            desc,
            params: ConvertParams::new(pixel_in, pixel_out),
            in_size: pixel_in.pixel_type.size(),
            out_size: pixel_out.pixel_type.size(),
            line,
            name,
        }
    }
}

impl std::fmt::Debug for ConvertFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConvertFilter")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}

impl Filter for ConvertFilter {
    fn descriptor(&self) -> &FilterDescriptor {
        &self.desc
    }

    fn process(&self, inputs: &[BufferDescriptor<'_>], output: &BufferDescriptor<'_>, i: u32, left: u32, right: u32) {
        let src = inputs[0].row_ptr::<u8>(i, left as usize * self.in_size);
        let dst = output.row_ptr::<u8>(i, left as usize * self.out_size);
        // SAFETY: columns `[left, right)` of row `i` are resident in both
        // buffers; aliasing is only allowed for same-size types.
        unsafe { (self.line)(src, dst, (right - left) as usize, &self.params) };
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Picks the baseline line kernel.
pub(crate) fn scalar_line(pixel_in: PixelType, pixel_out: PixelType) -> LineFn<ConvertParams> {
    crate::sample::select_line_fn!(convert_line, pixel_in, pixel_out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_params_limited_to_float() {
        let p = ConvertParams::new(&PixelFormat::new(PixelType::Byte), &PixelFormat::new(PixelType::Float));
        assert_abs_diff_eq!(16.0 * p.scale + p.offset, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(235.0 * p.scale + p.offset, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_params_chroma() {
        let chroma8 = PixelFormat::new(PixelType::Byte).with_chroma(true);
        let chroma_f = PixelFormat::new(PixelType::Float).with_chroma(true);
        let p = ConvertParams::new(&chroma8, &chroma_f);
        assert_abs_diff_eq!(128.0 * p.scale + p.offset, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(240.0 * p.scale + p.offset, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_line_in_place() {
        let p = ConvertParams::new(
            &PixelFormat::new(PixelType::Word).with_depth(10),
            &PixelFormat::new(PixelType::Word).with_depth(10).with_fullrange(true),
        );
        let mut row = [64u16, 940, 500];
        let ptr = row.as_mut_ptr().cast::<u8>();
        unsafe { convert_line::<u16, u16>(ptr, ptr, 3, &p) };
        assert_eq!(row, [0, 1023, 509]);
    }
}
