//! Pixel types and formats.
//!
//! # Types
//!
//! - [`PixelType`] - storage type of one sample (u8, u16, f16, f32)
//! - [`PixelFormat`] - storage type plus the numeric interpretation of the
//!   samples: significant bits, full/limited range and chroma centering
//! - [`Sample`] - trait tying a Rust scalar to its [`PixelType`]
//!
//! # Usage
//!
//! ```rust
//! use pixgraph_core::{PixelFormat, PixelType};
//!
//! // 10-bit limited range luma stored in u16
//! let fmt = PixelFormat::new(PixelType::Word).with_depth(10);
//! assert!(fmt.validate().is_ok());
//! assert_eq!(fmt.max_value(), 1023);
//!
//! let (offset, range) = fmt.integer_range();
//! assert_eq!((offset, range), (64.0, 876.0));
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Storage type of a single sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelType {
    /// 8-bit unsigned integer.
    Byte,
    /// 16-bit unsigned integer.
    Word,
    /// IEEE 754 binary16.
    Half,
    /// IEEE 754 binary32.
    Float,
}

impl PixelType {
    /// All pixel types, in size order.
    pub const ALL: [PixelType; 4] = [Self::Byte, Self::Word, Self::Half, Self::Float];

    /// Bytes per sample.
    #[inline]
    pub const fn size(self) -> usize {
        match self {
            Self::Byte => 1,
            Self::Word | Self::Half => 2,
            Self::Float => 4,
        }
    }

    /// Whether this is a floating-point type.
    #[inline]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Half | Self::Float)
    }

    /// Number of bits in the storage type.
    #[inline]
    pub const fn native_depth(self) -> u32 {
        (self.size() * 8) as u32
    }

    /// Short lowercase name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Byte => "byte",
            Self::Word => "word",
            Self::Half => "half",
            Self::Float => "float",
        }
    }
}

impl fmt::Display for PixelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PixelType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "byte" | "u8" => Ok(Self::Byte),
            "word" | "u16" => Ok(Self::Word),
            "half" | "f16" => Ok(Self::Half),
            "float" | "f32" => Ok(Self::Float),
            other => Err(Error::unsupported(format!("pixel type '{other}'"))),
        }
    }
}

/// Pixel storage type plus numeric interpretation.
///
/// `depth` counts the significant bits of an integer sample and must lie in
/// `1..=8` for [`PixelType::Byte`] and `1..=16` for [`PixelType::Word`].
/// Float types always carry their native width.
///
/// `chroma` is only meaningful for planes 1 and 2 of a YUV image: it
/// selects the centered chroma range instead of the luma range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelFormat {
    /// Storage type.
    pub pixel_type: PixelType,
    /// Significant bits.
    pub depth: u32,
    /// Full range (`true`) or limited (studio) range.
    pub fullrange: bool,
    /// Centered chroma encoding.
    pub chroma: bool,
}

impl PixelFormat {
    /// Native depth, limited range, luma.
    pub const fn new(pixel_type: PixelType) -> Self {
        Self {
            pixel_type,
            depth: pixel_type.native_depth(),
            fullrange: false,
            chroma: false,
        }
    }

    /// Returns a copy with a different depth.
    pub const fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    /// Returns a copy with a different range flag.
    pub const fn with_fullrange(mut self, fullrange: bool) -> Self {
        self.fullrange = fullrange;
        self
    }

    /// Returns a copy with a different chroma flag.
    pub const fn with_chroma(mut self, chroma: bool) -> Self {
        self.chroma = chroma;
        self
    }

    /// Checks the depth against the storage type.
    pub fn validate(&self) -> Result<()> {
        let native = self.pixel_type.native_depth();

        if self.pixel_type.is_float() {
            if self.depth != native {
                return Err(Error::invalid_format(format!(
                    "{} samples must have depth {native}, got {}",
                    self.pixel_type, self.depth
                )));
            }
        } else if self.depth == 0 || self.depth > native {
            return Err(Error::invalid_format(format!(
                "depth {} out of range 1..={native} for {}",
                self.depth, self.pixel_type
            )));
        }
        Ok(())
    }

    /// Largest code value of an integer format.
    ///
    /// Float formats return 0.
    #[inline]
    pub const fn max_value(&self) -> u32 {
        if self.pixel_type.is_float() {
            0
        } else {
            (1u32 << self.depth) - 1
        }
    }

    /// Offset and extent of the nominal signal range of an integer format.
    ///
    /// Luma maps `[offset, offset + range]` onto `[0, 1]`; chroma maps
    /// `offset` onto 0 and `range` onto a unit excursion.
    pub fn integer_range(&self) -> (f32, f32) {
        let depth = self.depth as i32;
        let full = ((1u64 << self.depth) - 1) as f32;

        let scaled = |v: u32| -> f32 {
            if depth >= 8 {
                (v << (depth - 8)) as f32
            } else {
                (v >> (8 - depth)) as f32
            }
        };

        match (self.fullrange, self.chroma) {
            (true, true) => ((1u32 << (depth - 1)) as f32, full),
            (true, false) => (0.0, full),
            (false, true) => (scaled(128), scaled(224)),
            (false, false) => (scaled(16), scaled(219)),
        }
    }
}

/// Default format for a pixel type: native depth, limited range, luma.
pub const fn default_pixel_format(pixel_type: PixelType) -> PixelFormat {
    PixelFormat::new(pixel_type)
}

/// A Rust scalar that can be stored in a plane.
pub trait Sample: bytemuck::Pod + Default + Send + Sync + 'static {
    /// Matching pixel type.
    const TYPE: PixelType;
}

impl Sample for u8 {
    const TYPE: PixelType = PixelType::Byte;
}

impl Sample for u16 {
    const TYPE: PixelType = PixelType::Word;
}

impl Sample for half::f16 {
    const TYPE: PixelType = PixelType::Half;
}

impl Sample for f32 {
    const TYPE: PixelType = PixelType::Float;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_type_size() {
        assert_eq!(PixelType::Byte.size(), 1);
        assert_eq!(PixelType::Word.size(), 2);
        assert_eq!(PixelType::Half.size(), 2);
        assert_eq!(PixelType::Float.size(), 4);
        assert!(PixelType::Half.is_float());
        assert!(!PixelType::Word.is_float());
    }

    #[test]
    fn test_pixel_type_parse() {
        assert_eq!("u16".parse::<PixelType>().unwrap(), PixelType::Word);
        assert_eq!("Float".parse::<PixelType>().unwrap(), PixelType::Float);
        assert!("u32".parse::<PixelType>().is_err());
    }

    #[test]
    fn test_validate() {
        assert!(PixelFormat::new(PixelType::Byte).validate().is_ok());
        assert!(PixelFormat::new(PixelType::Word).with_depth(10).validate().is_ok());
        assert!(PixelFormat::new(PixelType::Word).with_depth(17).validate().is_err());
        assert!(PixelFormat::new(PixelType::Byte).with_depth(0).validate().is_err());
        assert!(PixelFormat::new(PixelType::Float).with_depth(16).validate().is_err());
    }

    #[test]
    fn test_integer_range() {
        let luma8 = PixelFormat::new(PixelType::Byte);
        assert_eq!(luma8.integer_range(), (16.0, 219.0));

        let chroma10 = PixelFormat::new(PixelType::Word).with_depth(10).with_chroma(true);
        assert_eq!(chroma10.integer_range(), (512.0, 896.0));

        let full_chroma8 = luma8.with_fullrange(true).with_chroma(true);
        assert_eq!(full_chroma8.integer_range(), (128.0, 255.0));

        let full16 = PixelFormat::new(PixelType::Word).with_fullrange(true);
        assert_eq!(full16.integer_range(), (0.0, 65535.0));
    }

    #[test]
    fn test_default_format() {
        let fmt = default_pixel_format(PixelType::Half);
        assert_eq!(fmt.depth, 16);
        assert!(!fmt.fullrange);
        assert!(!fmt.chroma);
    }
}
