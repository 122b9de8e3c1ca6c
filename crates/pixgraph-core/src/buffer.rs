//! Buffer descriptors.
//!
//! A [`BufferDescriptor`] addresses the rows of one plane through a base
//! pointer, a byte stride and a row mask:
//!
//! ```text
//! address(row) = data + (row & mask) * stride
//! ```
//!
//! | mask              | addressing                                   |
//! |-------------------|----------------------------------------------|
//! | [`BUFFER_MAX`]    | linear, one physical row per logical row     |
//! | `0`               | every logical row maps to the same row       |
//! | `2^k - 1`         | circular over `2^k` physical rows            |
//!
//! Descriptors are views: they borrow the memory for `'a` but carry no
//! ownership, are `Copy`, and may alias each other (an in-place filter
//! reads and writes through two descriptors of the same rows). All row
//! accessors that produce references are therefore `unsafe`. Descriptors
//! built from slices remember the slice length so that debug builds can
//! assert every access stays in bounds.
//!
//! ```rust
//! use pixgraph_core::{BufferDescriptor, select_buffer_mask};
//!
//! let mut storage = vec![0u8; 4 * 16];
//! let mask = select_buffer_mask(3); // 4 rows
//! assert_eq!(mask, 3);
//!
//! let buf = BufferDescriptor::from_slice_mut(&mut storage, 16, mask);
//! // Logical rows 1 and 5 share physical row 1.
//! assert_eq!(buf.line_ptr(1), buf.line_ptr(5));
//! ```

use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

use crate::pixel::Sample;

/// Mask value selecting linear addressing.
pub const BUFFER_MAX: u32 = u32::MAX;

/// Maximum number of planes in an [`ImageBuffer`]: three color planes plus alpha.
pub const PLANE_MAX: usize = 4;

/// Smallest mask whose circular window holds `count` rows.
///
/// Counts above `2^31` select linear addressing.
pub fn select_buffer_mask(count: u32) -> u32 {
    if count > BUFFER_MAX >> 1 {
        BUFFER_MAX
    } else {
        count.max(1).next_power_of_two() - 1
    }
}

/// Number of physical rows a mask addresses, saturating at `u32::MAX`.
#[inline]
pub const fn mask_rows(mask: u32) -> u32 {
    mask.saturating_add(1)
}

/// Pointer, stride and row mask describing one plane.
#[derive(Clone, Copy)]
pub struct BufferDescriptor<'a> {
    data: *mut u8,
    stride: isize,
    mask: u32,
    len: usize,
    writable: bool,
    _marker: PhantomData<&'a [u8]>,
}

impl<'a> BufferDescriptor<'a> {
    /// Descriptor that addresses nothing.
    pub const fn null() -> Self {
        Self {
            data: std::ptr::null_mut(),
            stride: 0,
            mask: 0,
            len: 0,
            writable: false,
            _marker: PhantomData,
        }
    }

    /// Wraps a raw pointer.
    ///
    /// # Safety
    ///
    /// For every row the graph touches, `data + (row & mask) * stride` must
    /// point to memory valid for reads and writes of a full row for `'a`.
    /// No bounds information is recorded.
    pub unsafe fn from_raw_parts(data: *mut u8, stride: isize, mask: u32) -> Self {
        Self {
            data,
            stride,
            mask,
            len: usize::MAX,
            writable: true,
            _marker: PhantomData,
        }
    }

    /// Read-only view of a slice.
    ///
    /// Writing through the returned descriptor is a contract violation.
    pub fn from_slice(data: &'a [u8], stride: usize, mask: u32) -> Self {
        Self {
            data: data.as_ptr().cast_mut(),
            stride: stride as isize,
            mask,
            len: data.len(),
            writable: false,
            _marker: PhantomData,
        }
    }

    /// Read-write view of a slice.
    pub fn from_slice_mut(data: &'a mut [u8], stride: usize, mask: u32) -> Self {
        Self {
            data: data.as_mut_ptr(),
            stride: stride as isize,
            mask,
            len: data.len(),
            writable: true,
            _marker: PhantomData,
        }
    }

    /// Whether the descriptor addresses nothing.
    #[inline]
    pub fn is_null(&self) -> bool {
        self.data.is_null()
    }

    /// Row stride in bytes.
    #[inline]
    pub fn stride(&self) -> isize {
        self.stride
    }

    /// Row mask.
    #[inline]
    pub fn mask(&self) -> u32 {
        self.mask
    }

    /// Whether the descriptor may be written through.
    #[inline]
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Physical rows addressed before wrapping.
    #[inline]
    pub fn buffered_rows(&self) -> u32 {
        mask_rows(self.mask)
    }

    /// Returns a copy with a different mask.
    pub fn with_mask(mut self, mask: u32) -> Self {
        self.mask = mask;
        self
    }

    /// Byte offset of a row from the base pointer.
    #[inline]
    fn row_offset(&self, row: u32) -> isize {
        (row & self.mask) as isize * self.stride
    }

    /// Pointer to the first byte of a row. Never dereferenced here.
    #[inline]
    pub fn line_ptr(&self, row: u32) -> *mut u8 {
        self.data.wrapping_offset(self.row_offset(row))
    }

    #[inline]
    fn debug_check<T: Sample>(&self, row: u32, left: usize, right: usize) {
        debug_assert!(!self.is_null(), "access through a null descriptor");
        debug_assert!(left <= right, "inverted column range {left}..{right}");
        debug_assert_eq!(
            self.line_ptr(row) as usize % std::mem::align_of::<T>(),
            0,
            "misaligned row"
        );
        if self.len != usize::MAX && self.stride >= 0 {
            let end = self.row_offset(row) as usize + right * std::mem::size_of::<T>();
            debug_assert!(end <= self.len, "row {row} columns ..{right} exceed buffer of {} bytes", self.len);
        }
    }

    /// Typed read view of columns `[left, right)` of a row.
    ///
    /// # Safety
    ///
    /// The columns must be initialized and resident, and no mutable
    /// reference to them may be live.
    #[inline]
    pub unsafe fn row<T: Sample>(&self, row: u32, left: usize, right: usize) -> &[T] {
        self.debug_check::<T>(row, left, right);
        unsafe {
            let base = self.line_ptr(row).cast::<T>().add(left);
            std::slice::from_raw_parts(base, right - left)
        }
    }

    /// Typed write view of columns `[left, right)` of a row.
    ///
    /// # Safety
    ///
    /// The descriptor must address writable memory and no other reference
    /// to these columns may be live.
    #[allow(clippy::mut_from_ref)]
    #[inline]
    pub unsafe fn row_mut<T: Sample>(&self, row: u32, left: usize, right: usize) -> &mut [T] {
        self.debug_check::<T>(row, left, right);
        debug_assert!(self.writable, "write through a read-only descriptor");
        unsafe {
            let base = self.line_ptr(row).cast::<T>().add(left);
            std::slice::from_raw_parts_mut(base, right - left)
        }
    }

    /// Typed raw pointer to column `left` of a row, for filters that may
    /// read and write the same row.
    #[inline]
    pub fn row_ptr<T: Sample>(&self, row: u32, left: usize) -> *mut T {
        debug_assert!(!self.is_null(), "access through a null descriptor");
        self.line_ptr(row).cast::<T>().wrapping_add(left)
    }
}

impl Default for BufferDescriptor<'_> {
    fn default() -> Self {
        Self::null()
    }
}

impl std::fmt::Debug for BufferDescriptor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferDescriptor")
            .field("data", &self.data)
            .field("stride", &self.stride)
            .field("mask", &format_args!("{:#x}", self.mask))
            .finish()
    }
}

/// One descriptor per plane.
///
/// Plane 0 is luma (or the only plane), 1 and 2 are chroma, 3 is alpha.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageBuffer<'a> {
    planes: [BufferDescriptor<'a>; PLANE_MAX],
}

impl<'a> ImageBuffer<'a> {
    /// All planes null.
    pub const fn new() -> Self {
        Self {
            planes: [BufferDescriptor::null(); PLANE_MAX],
        }
    }

    /// Returns a copy with one plane replaced.
    pub fn with_plane(mut self, plane: usize, desc: BufferDescriptor<'a>) -> Self {
        self.planes[plane] = desc;
        self
    }

    /// Descriptor of a plane.
    #[inline]
    pub fn plane(&self, plane: usize) -> &BufferDescriptor<'a> {
        &self.planes[plane]
    }

    /// All plane descriptors.
    pub fn planes(&self) -> &[BufferDescriptor<'a>; PLANE_MAX] {
        &self.planes
    }
}

impl<'a> Index<usize> for ImageBuffer<'a> {
    type Output = BufferDescriptor<'a>;

    fn index(&self, plane: usize) -> &Self::Output {
        &self.planes[plane]
    }
}

impl IndexMut<usize> for ImageBuffer<'_> {
    fn index_mut(&mut self, plane: usize) -> &mut Self::Output {
        &mut self.planes[plane]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_mask() {
        assert_eq!(select_buffer_mask(0), 0);
        assert_eq!(select_buffer_mask(1), 0);
        assert_eq!(select_buffer_mask(2), 1);
        assert_eq!(select_buffer_mask(3), 3);
        assert_eq!(select_buffer_mask(8), 7);
        assert_eq!(select_buffer_mask(9), 15);
        assert_eq!(select_buffer_mask(u32::MAX), BUFFER_MAX);
    }

    #[test]
    fn test_linear_addressing() {
        let mut storage = vec![0u8; 8 * 4];
        let buf = BufferDescriptor::from_slice_mut(&mut storage, 8, BUFFER_MAX);
        let base = buf.line_ptr(0) as usize;
        assert_eq!(buf.line_ptr(3) as usize - base, 24);
        assert_eq!(buf.buffered_rows(), u32::MAX);
    }

    #[test]
    fn test_circular_addressing() {
        let mut storage = vec![0u8; 2 * 4];
        let buf = BufferDescriptor::from_slice_mut(&mut storage, 4, 1);
        assert_eq!(buf.line_ptr(0), buf.line_ptr(2));
        assert_eq!(buf.line_ptr(1), buf.line_ptr(7));
        assert_ne!(buf.line_ptr(0), buf.line_ptr(1));
        assert_eq!(buf.buffered_rows(), 2);
    }

    #[test]
    fn test_single_row_mask() {
        let mut storage = vec![0u8; 16];
        let buf = BufferDescriptor::from_slice_mut(&mut storage, 16, 0);
        assert_eq!(buf.line_ptr(0), buf.line_ptr(1000));
    }

    #[test]
    fn test_typed_rows() {
        let mut storage = vec![0u16; 3 * 4];
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut storage);
        let buf = BufferDescriptor::from_slice_mut(bytes, 8, BUFFER_MAX);

        unsafe {
            buf.row_mut::<u16>(1, 1, 3).copy_from_slice(&[5, 6]);
            assert_eq!(buf.row::<u16>(1, 0, 4), &[0, 5, 6, 0]);
        }
        assert_eq!(storage[5], 5);
        assert_eq!(storage[6], 6);
    }

    #[test]
    fn test_image_buffer_planes() {
        let storage = [0u8; 4];
        let desc = BufferDescriptor::from_slice(&storage, 4, 0);
        let img = ImageBuffer::new().with_plane(2, desc);
        assert!(img[0].is_null());
        assert!(!img[2].is_null());
        assert!(!img.plane(2).is_writable());
    }
}
