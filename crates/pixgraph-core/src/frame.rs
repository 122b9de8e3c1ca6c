//! Owning planar frames.
//!
//! [`ImageFrame`] allocates one aligned buffer per present plane, with the
//! row stride rounded up to [`ALIGNMENT`]. It hands out [`ImageBuffer`]
//! views with linear addressing for use as graph sources and sinks, and
//! typed row slices for direct access.
//!
//! ```rust
//! use pixgraph_core::{ImageFrame, ImageGeometry, PixelType};
//!
//! let mut frame = ImageFrame::new(ImageGeometry::new(10, 2, PixelType::Word)).unwrap();
//! frame.row_mut::<u16>(0, 1)[3] = 1023;
//! assert_eq!(frame.stride(0), 64);
//! assert_eq!(frame.row::<u16>(0, 1)[3], 1023);
//! ```

use crate::align::{ALIGNMENT, AlignedVec, align};
use crate::buffer::{BUFFER_MAX, BufferDescriptor, ImageBuffer, PLANE_MAX};
use crate::error::Result;
use crate::geometry::ImageGeometry;
use crate::pixel::Sample;

#[derive(Debug, Clone)]
struct FramePlane {
    stride: usize,
    data: AlignedVec,
}

/// Heap image with one contiguous aligned buffer per plane.
#[derive(Debug, Clone)]
pub struct ImageFrame {
    geometry: ImageGeometry,
    planes: [Option<FramePlane>; PLANE_MAX],
}

impl ImageFrame {
    /// Allocates a zeroed frame.
    pub fn new(geometry: ImageGeometry) -> Result<Self> {
        geometry.validate()?;

        let mut planes: [Option<FramePlane>; PLANE_MAX] = Default::default();
        for p in geometry.planes() {
            let stride = align(geometry.row_size(p), ALIGNMENT);
            let size = stride * geometry.plane_height(p) as usize;
            planes[p] = Some(FramePlane {
                stride,
                data: AlignedVec::zeroed(size),
            });
        }

        Ok(Self { geometry, planes })
    }

    /// Frame geometry.
    #[inline]
    pub fn geometry(&self) -> &ImageGeometry {
        &self.geometry
    }

    /// Width of a plane.
    #[inline]
    pub fn width(&self, plane: usize) -> u32 {
        self.geometry.plane_width(plane)
    }

    /// Height of a plane.
    #[inline]
    pub fn height(&self, plane: usize) -> u32 {
        self.geometry.plane_height(plane)
    }

    fn plane_ref(&self, plane: usize) -> &FramePlane {
        self.planes[plane]
            .as_ref()
            .unwrap_or_else(|| panic!("plane {plane} not present in frame"))
    }

    fn plane_mut(&mut self, plane: usize) -> &mut FramePlane {
        self.planes[plane]
            .as_mut()
            .unwrap_or_else(|| panic!("plane {plane} not present in frame"))
    }

    /// Row stride of a plane in bytes.
    #[inline]
    pub fn stride(&self, plane: usize) -> usize {
        self.plane_ref(plane).stride
    }

    /// Whole plane as bytes, including row padding.
    pub fn plane_data(&self, plane: usize) -> &[u8] {
        self.plane_ref(plane).data.as_slice()
    }

    /// Whole plane as mutable bytes, including row padding.
    pub fn plane_data_mut(&mut self, plane: usize) -> &mut [u8] {
        self.plane_mut(plane).data.as_mut_slice()
    }

    /// Typed samples of one row.
    pub fn row<T: Sample>(&self, plane: usize, y: u32) -> &[T] {
        debug_assert_eq!(T::TYPE, self.geometry.pixel_type);
        let width = self.width(plane) as usize;
        let stride = self.stride(plane);
        let start = y as usize * stride;
        let bytes = &self.plane_data(plane)[start..start + width * T::TYPE.size()];
        bytemuck::cast_slice(bytes)
    }

    /// Mutable typed samples of one row.
    pub fn row_mut<T: Sample>(&mut self, plane: usize, y: u32) -> &mut [T] {
        debug_assert_eq!(T::TYPE, self.geometry.pixel_type);
        let width = self.width(plane) as usize;
        let stride = self.stride(plane);
        let start = y as usize * stride;
        let bytes = &mut self.plane_data_mut(plane)[start..start + width * T::TYPE.size()];
        bytemuck::cast_slice_mut(bytes)
    }

    /// Read-only linear descriptor of one plane.
    pub fn as_read_plane(&self, plane: usize) -> BufferDescriptor<'_> {
        let p = self.plane_ref(plane);
        BufferDescriptor::from_slice(p.data.as_slice(), p.stride, BUFFER_MAX)
    }

    /// Read-only linear descriptors of all planes.
    pub fn as_read_buffer(&self) -> ImageBuffer<'_> {
        let mut buf = ImageBuffer::new();
        for p in self.geometry.planes() {
            buf[p] = self.as_read_plane(p);
        }
        buf
    }

    /// Writable linear descriptors of all planes.
    pub fn as_write_buffer(&mut self) -> ImageBuffer<'_> {
        let mut buf = ImageBuffer::new();
        for (p, plane) in self.planes.iter_mut().enumerate() {
            if let Some(plane) = plane {
                buf[p] = BufferDescriptor::from_slice_mut(plane.data.as_mut_slice(), plane.stride, BUFFER_MAX);
            }
        }
        buf
    }

    /// Writable linear descriptor of one plane, all other planes null.
    pub fn as_write_plane(&mut self, plane: usize) -> ImageBuffer<'_> {
        let p = self.plane_mut(plane);
        let stride = p.stride;
        ImageBuffer::new().with_plane(
            plane,
            BufferDescriptor::from_slice_mut(p.data.as_mut_slice(), stride, BUFFER_MAX),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::PixelType;

    #[test]
    fn test_frame_layout() {
        let geom = ImageGeometry::new(100, 4, PixelType::Float).with_color(1, 1);
        let frame = ImageFrame::new(geom).unwrap();

        assert_eq!(frame.stride(0), 448);
        assert_eq!(frame.stride(1), 256);
        assert_eq!(frame.plane_data(1).len(), 256 * 2);
        assert_eq!(frame.plane_data(0).as_ptr() as usize % ALIGNMENT, 0);
    }

    #[test]
    fn test_frame_rejects_bad_geometry() {
        let geom = ImageGeometry::new(3, 4, PixelType::Byte).with_color(1, 0);
        assert!(ImageFrame::new(geom).is_err());
    }

    #[test]
    fn test_frame_buffers() {
        let geom = ImageGeometry::new(8, 2, PixelType::Byte).with_alpha();
        let mut frame = ImageFrame::new(geom).unwrap();

        let wbuf = frame.as_write_buffer();
        assert!(!wbuf[0].is_null());
        assert!(wbuf[1].is_null());
        assert!(!wbuf[3].is_null());
        unsafe { wbuf[3].row_mut::<u8>(1, 0, 8).fill(9) };

        assert_eq!(frame.row::<u8>(3, 1), &[9; 8]);
        let rbuf = frame.as_read_buffer();
        assert_eq!(rbuf[3].mask(), BUFFER_MAX);
        assert!(!rbuf[3].is_writable());
    }
}
