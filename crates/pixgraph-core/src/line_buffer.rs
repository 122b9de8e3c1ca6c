//! Circular row storage for callback-fed graph endpoints.
//!
//! A [`LineBuffer`] owns `mask + 1` rows per plane. The graph reads (or
//! writes) it through the descriptors returned by
//! [`LineBuffer::as_image_buffer`], while an unpack or pack callback fills
//! (or drains) the same rows through [`LineBuffer::row_mut`] /
//! [`LineBuffer::row`]. Both sides run on the same thread and never touch
//! the same row at the same time, which the graph guarantees by invoking
//! callbacks between filter invocations.

use std::marker::PhantomData;

use crate::align::{ALIGNMENT, AlignedVec, align};
use crate::buffer::{BufferDescriptor, ImageBuffer, PLANE_MAX, mask_rows};
use crate::error::{Error, Result};
use crate::geometry::ImageGeometry;
use crate::pixel::Sample;

struct LinePlane {
    base: *mut u8,
    stride: usize,
    width: u32,
    // Keeps the allocation behind `base` alive.
    _storage: AlignedVec,
}

/// Owned circular buffer of rows for every plane of a geometry.
pub struct LineBuffer {
    geometry: ImageGeometry,
    mask: u32,
    planes: [Option<LinePlane>; PLANE_MAX],
    _not_sync: PhantomData<*mut u8>,
}

impl LineBuffer {
    /// Allocates `mask + 1` rows for every present plane.
    ///
    /// `mask` must be `0` or `2^k - 1`.
    pub fn new(geometry: ImageGeometry, mask: u32) -> Result<Self> {
        geometry.validate()?;
        if mask != 0 && !mask_rows(mask).is_power_of_two() {
            return Err(Error::invalid_parameter("mask", format!("{mask:#x} is not 2^k - 1")));
        }

        let rows = mask_rows(mask) as usize;
        let mut planes: [Option<LinePlane>; PLANE_MAX] = Default::default();
        for p in geometry.planes() {
            let stride = align(geometry.row_size(p), ALIGNMENT);
            let mut storage = AlignedVec::zeroed(stride * rows);
            planes[p] = Some(LinePlane {
                base: storage.as_mut_ptr(),
                stride,
                width: geometry.plane_width(p),
                _storage: storage,
            });
        }

        Ok(Self {
            geometry,
            mask,
            planes,
            _not_sync: PhantomData,
        })
    }

    /// Geometry the buffer was built for.
    pub fn geometry(&self) -> &ImageGeometry {
        &self.geometry
    }

    /// Row mask shared by all planes.
    pub fn mask(&self) -> u32 {
        self.mask
    }

    fn plane(&self, plane: usize) -> &LinePlane {
        self.planes[plane]
            .as_ref()
            .unwrap_or_else(|| panic!("plane {plane} not present in line buffer"))
    }

    /// Writable descriptors over the stored rows.
    pub fn as_image_buffer(&self) -> ImageBuffer<'_> {
        let mut buf = ImageBuffer::new();
        for (p, plane) in self.planes.iter().enumerate() {
            if let Some(plane) = plane {
                // SAFETY: `base` addresses `mask + 1` rows of `stride` bytes
                // owned by `self`.
                buf[p] = unsafe { BufferDescriptor::from_raw_parts(plane.base, plane.stride as isize, self.mask) };
            }
        }
        buf
    }

    /// Typed samples of a row.
    ///
    /// # Safety
    ///
    /// No mutable view of the same row may be live.
    pub unsafe fn row<T: Sample>(&self, plane: usize, row: u32) -> &[T] {
        let p = self.plane(plane);
        let offset = (row & self.mask) as usize * p.stride;
        debug_assert_eq!(T::TYPE, self.geometry.pixel_type);
        unsafe { std::slice::from_raw_parts(p.base.add(offset).cast::<T>(), p.width as usize) }
    }

    /// Mutable typed samples of a row.
    ///
    /// # Safety
    ///
    /// No other view of the same row may be live.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn row_mut<T: Sample>(&self, plane: usize, row: u32) -> &mut [T] {
        let p = self.plane(plane);
        let offset = (row & self.mask) as usize * p.stride;
        debug_assert_eq!(T::TYPE, self.geometry.pixel_type);
        unsafe { std::slice::from_raw_parts_mut(p.base.add(offset).cast::<T>(), p.width as usize) }
    }
}

impl std::fmt::Debug for LineBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineBuffer")
            .field("geometry", &self.geometry)
            .field("mask", &self.mask)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::PixelType;

    #[test]
    fn test_line_buffer_shared_rows() {
        let geom = ImageGeometry::new(6, 4, PixelType::Word).with_color(1, 0);
        let line = LineBuffer::new(geom, 1).unwrap();

        unsafe {
            line.row_mut::<u16>(1, 3).copy_from_slice(&[1, 2, 3]);
        }
        let buf = line.as_image_buffer();
        assert_eq!(buf[1].mask(), 1);
        let seen = unsafe { buf[1].row::<u16>(1, 0, 3).to_vec() };
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn test_line_buffer_rejects_mask() {
        let geom = ImageGeometry::new(4, 4, PixelType::Byte);
        assert!(LineBuffer::new(geom, 5).is_err());
        assert!(LineBuffer::new(geom, 0).is_ok());
    }
}
