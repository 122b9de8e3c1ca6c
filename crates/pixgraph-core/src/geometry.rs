//! Image geometry: dimensions, plane layout and chroma subsampling.

use crate::buffer::PLANE_MAX;
use crate::error::{Error, Result};
use crate::pixel::PixelType;

/// Largest supported subsampling shift.
pub const SUBSAMPLE_MAX: u32 = 2;

/// Plane index of the alpha plane.
pub const ALPHA_PLANE: usize = 3;

/// Dimensions and plane layout of an image.
///
/// Plane 0 always exists. With `color`, planes 1 and 2 exist and are
/// reduced by `subsample_w` / `subsample_h` (as right shifts). With
/// `alpha`, plane 3 exists at full resolution.
///
/// ```rust
/// use pixgraph_core::{ImageGeometry, PixelType};
///
/// let geom = ImageGeometry::new(640, 480, PixelType::Byte).with_color(1, 1);
/// assert!(geom.validate().is_ok());
/// assert_eq!(geom.plane_width(1), 320);
/// assert_eq!(geom.plane_height(2), 240);
/// assert_eq!(geom.num_planes(), 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageGeometry {
    /// Luma width.
    pub width: u32,
    /// Luma height.
    pub height: u32,
    /// Storage type of every plane.
    pub pixel_type: PixelType,
    /// Horizontal chroma shift.
    pub subsample_w: u32,
    /// Vertical chroma shift.
    pub subsample_h: u32,
    /// Planes 1 and 2 are present.
    pub color: bool,
    /// Plane 3 is present.
    pub alpha: bool,
}

impl ImageGeometry {
    /// Single-plane geometry.
    pub const fn new(width: u32, height: u32, pixel_type: PixelType) -> Self {
        Self {
            width,
            height,
            pixel_type,
            subsample_w: 0,
            subsample_h: 0,
            color: false,
            alpha: false,
        }
    }

    /// Adds chroma planes with the given subsampling.
    pub const fn with_color(mut self, subsample_w: u32, subsample_h: u32) -> Self {
        self.color = true;
        self.subsample_w = subsample_w;
        self.subsample_h = subsample_h;
        self
    }

    /// Adds an alpha plane.
    pub const fn with_alpha(mut self) -> Self {
        self.alpha = true;
        self
    }

    /// Returns a copy with different luma dimensions.
    pub const fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Returns a copy with a different storage type.
    pub const fn with_pixel_type(mut self, pixel_type: PixelType) -> Self {
        self.pixel_type = pixel_type;
        self
    }

    /// Number of present planes.
    pub fn num_planes(&self) -> usize {
        1 + if self.color { 2 } else { 0 } + usize::from(self.alpha)
    }

    /// Whether a plane index is present.
    #[inline]
    pub fn has_plane(&self, plane: usize) -> bool {
        match plane {
            0 => true,
            1 | 2 => self.color,
            ALPHA_PLANE => self.alpha,
            _ => false,
        }
    }

    /// Present plane indices in order.
    pub fn planes(&self) -> impl Iterator<Item = usize> + use<> {
        let geometry = *self;
        (0..PLANE_MAX).filter(move |&p| geometry.has_plane(p))
    }

    /// Width of a plane.
    #[inline]
    pub fn plane_width(&self, plane: usize) -> u32 {
        if plane == 1 || plane == 2 {
            self.width >> self.subsample_w
        } else {
            self.width
        }
    }

    /// Height of a plane.
    #[inline]
    pub fn plane_height(&self, plane: usize) -> u32 {
        if plane == 1 || plane == 2 {
            self.height >> self.subsample_h
        } else {
            self.height
        }
    }

    /// Bytes in one row of a plane, unpadded.
    #[inline]
    pub fn row_size(&self, plane: usize) -> usize {
        self.plane_width(plane) as usize * self.pixel_type.size()
    }

    /// Rejects empty images, oversize shifts and dimensions not divisible
    /// by the subsampling factor.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::invalid_dimensions(self.width, self.height, "empty image"));
        }
        if self.subsample_w > SUBSAMPLE_MAX || self.subsample_h > SUBSAMPLE_MAX {
            return Err(Error::invalid_parameter(
                "subsample",
                format!(
                    "shift {}x{} exceeds {SUBSAMPLE_MAX}",
                    self.subsample_w, self.subsample_h
                ),
            ));
        }
        if self.color {
            let mask_w = (1u32 << self.subsample_w) - 1;
            let mask_h = (1u32 << self.subsample_h) - 1;
            if self.width & mask_w != 0 || self.height & mask_h != 0 {
                return Err(Error::invalid_dimensions(
                    self.width,
                    self.height,
                    format!(
                        "not divisible by chroma subsampling {}x{}",
                        1u32 << self.subsample_w,
                        1u32 << self.subsample_h
                    ),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plane_dims() {
        let geom = ImageGeometry::new(64, 48, PixelType::Word).with_color(2, 0);
        assert_eq!(geom.plane_width(0), 64);
        assert_eq!(geom.plane_width(1), 16);
        assert_eq!(geom.plane_height(1), 48);
        assert_eq!(geom.row_size(2), 32);
    }

    #[test]
    fn test_planes_iter() {
        let grey = ImageGeometry::new(4, 4, PixelType::Byte);
        assert_eq!(grey.planes().collect::<Vec<_>>(), vec![0]);

        let rgba = grey.with_color(0, 0).with_alpha();
        assert_eq!(rgba.planes().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
        assert_eq!(rgba.num_planes(), 4);

        let grey_alpha = grey.with_alpha();
        assert_eq!(grey_alpha.planes().collect::<Vec<_>>(), vec![0, 3]);
    }

    #[test]
    fn test_validate_odd_subsampled() {
        let geom = ImageGeometry::new(641, 480, PixelType::Byte).with_color(1, 1);
        assert!(matches!(geom.validate(), Err(Error::InvalidDimensions { .. })));

        // Odd width is fine without horizontal subsampling.
        let geom = ImageGeometry::new(641, 480, PixelType::Byte).with_color(0, 1);
        assert!(geom.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects() {
        assert!(ImageGeometry::new(0, 4, PixelType::Byte).validate().is_err());
        assert!(ImageGeometry::new(16, 16, PixelType::Byte).with_color(3, 0).validate().is_err());
    }
}
