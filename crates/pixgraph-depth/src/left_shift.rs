//! Integer depth promotion by left shift.

use pixgraph_core::{BufferDescriptor, PixelType};
use pixgraph_graph::{Filter, FilterDescriptor};

use crate::sample::{IntSample, LineFn, same_size};

unsafe fn left_shift_line<I: IntSample, O: IntSample>(src: *const u8, dst: *mut u8, n: usize, shift: &u32) {
    let (src, dst) = (src.cast::<I>(), dst.cast::<O>());
    for j in 0..n {
        unsafe { dst.add(j).write(O::narrow(src.add(j).read().widen() << *shift)) };
    }
}

fn select(pixel_in: PixelType, pixel_out: PixelType) -> Option<LineFn<u32>> {
    match (pixel_in, pixel_out) {
        (PixelType::Byte, PixelType::Byte) => Some(left_shift_line::<u8, u8> as LineFn<u32>),
        (PixelType::Byte, PixelType::Word) => Some(left_shift_line::<u8, u16> as LineFn<u32>),
        (PixelType::Word, PixelType::Byte) => Some(left_shift_line::<u16, u8> as LineFn<u32>),
        (PixelType::Word, PixelType::Word) => Some(left_shift_line::<u16, u16> as LineFn<u32>),
        _ => None,
    }
}

/// Shifts integer samples left by `depth_out - depth_in` bits.
pub(crate) struct LeftShiftFilter {
    desc: FilterDescriptor,
    shift: u32,
    in_size: usize,
    out_size: usize,
    line: LineFn<u32>,
}

impl LeftShiftFilter {
    /// `None` unless both types are integer.
    pub fn new(width: u32, height: u32, pixel_in: PixelType, pixel_out: PixelType, shift: u32) -> Option<Self> {
        let line = select(pixel_in, pixel_out)?;
        let mut desc = FilterDescriptor::new(width, height, pixel_out.size() as u32);
        if same_size(pixel_in, pixel_out) {
            desc = desc.with_in_place();
        }
        Some(Self {
            desc,
            shift,
            in_size: pixel_in.size(),
            out_size: pixel_out.size(),
            line,
        })
    }
}

impl std::fmt::Debug for LeftShiftFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeftShiftFilter").field("shift", &self.shift).finish()
    }
}

impl Filter for LeftShiftFilter {
    fn descriptor(&self) -> &FilterDescriptor {
        &self.desc
    }

    fn process(&self, inputs: &[BufferDescriptor<'_>], output: &BufferDescriptor<'_>, i: u32, left: u32, right: u32) {
        let src = inputs[0].row_ptr::<u8>(i, left as usize * self.in_size);
        let dst = output.row_ptr::<u8>(i, left as usize * self.out_size);
        // SAFETY: columns `[left, right)` of row `i` are resident in both
        // buffers.
        unsafe { (self.line)(src, dst, (right - left) as usize, &self.shift) };
    }

    fn name(&self) -> &'static str {
        "left_shift"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shift_line() {
        let src = [16u8, 128, 235];
        let mut dst = [0u16; 3];
        unsafe { left_shift_line::<u8, u16>(src.as_ptr(), dst.as_mut_ptr().cast(), 3, &2) };
        assert_eq!(dst, [64, 512, 940]);
    }

    #[test]
    fn test_float_rejected() {
        assert!(LeftShiftFilter::new(4, 4, PixelType::Word, PixelType::Float, 0).is_none());
        let f = LeftShiftFilter::new(4, 4, PixelType::Word, PixelType::Word, 2).unwrap();
        assert!(f.descriptor().flags.in_place);
    }
}
