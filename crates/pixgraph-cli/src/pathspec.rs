//! `format@path` specifiers for raw image files.
//!
//! A specifier names a raw layout and a file. Without an `@` the caller's
//! assumed format applies:
//!
//! ```text
//! i420@in.yuv      8-bit 4:2:0, planes Y U V
//! yv12w@out.yuv    16-bit 4:2:0, planes Y V U
//! frame.raw        assumed format
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use pixgraph_core::{ImageGeometry, PixelType};

/// Byte layout of a frame in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Packing {
    /// Planes stored one after another.
    Planar,
    /// Interleaved 8-bit 4:2:2 as `Y0 U Y1 V`.
    Yuy2,
}

/// Raw layout named by a format token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileFormat {
    pub name: &'static str,
    pub pixel_type: PixelType,
    pub planes: u32,
    pub subsample_w: u32,
    pub subsample_h: u32,
    /// File plane holding each logical plane.
    pub plane_order: [usize; 3],
    pub yuv: bool,
    pub packing: Packing,
}

const NUL: [usize; 3] = [0, 0, 0];
const DEF: [usize; 3] = [0, 1, 2];
const YVU: [usize; 3] = [0, 2, 1];
const GBR: [usize; 3] = [1, 2, 0];

const fn fmt(
    name: &'static str,
    pixel_type: PixelType,
    planes: u32,
    subsample: (u32, u32),
    plane_order: [usize; 3],
    yuv: bool,
) -> FileFormat {
    FileFormat {
        name,
        pixel_type,
        planes,
        subsample_w: subsample.0,
        subsample_h: subsample.1,
        plane_order,
        yuv,
        packing: Packing::Planar,
    }
}

use PixelType::{Byte as B, Float as S, Half as H, Word as W};

static FORMATS: &[FileFormat] = &[
    fmt("grey", B, 1, (0, 0), NUL, true),
    FileFormat {
        packing: Packing::Yuy2,
        ..fmt("yuy2", B, 3, (1, 0), NUL, true)
    },
    fmt("yv12", B, 3, (1, 1), YVU, true),
    fmt("yv16", B, 3, (1, 0), YVU, true),
    fmt("yv24", B, 3, (0, 0), YVU, true),
    fmt("i420", B, 3, (1, 1), DEF, true),
    fmt("i422", B, 3, (1, 0), DEF, true),
    fmt("i444", B, 3, (0, 0), DEF, true),
    fmt("rgbp", B, 3, (0, 0), DEF, false),
    fmt("gbrp", B, 3, (0, 0), GBR, false),
    fmt("greyw", W, 1, (0, 0), NUL, false),
    fmt("yv12w", W, 3, (1, 1), YVU, true),
    fmt("yv16w", W, 3, (1, 0), YVU, true),
    fmt("yv24w", W, 3, (0, 0), YVU, true),
    fmt("i420w", W, 3, (1, 1), DEF, true),
    fmt("i422w", W, 3, (1, 0), DEF, true),
    fmt("i444w", W, 3, (0, 0), DEF, true),
    fmt("rgbpw", W, 3, (0, 0), DEF, false),
    fmt("gbrpw", W, 3, (0, 0), GBR, false),
    fmt("greyh", H, 1, (0, 0), NUL, false),
    fmt("i420h", H, 3, (1, 1), DEF, true),
    fmt("i422h", H, 3, (1, 0), DEF, true),
    fmt("i444h", H, 3, (0, 0), DEF, true),
    fmt("rgbph", H, 3, (0, 0), DEF, false),
    fmt("greys", S, 1, (0, 0), NUL, false),
    fmt("i420s", S, 3, (1, 1), DEF, true),
    fmt("i422s", S, 3, (1, 0), DEF, true),
    fmt("i444s", S, 3, (0, 0), DEF, true),
    fmt("rgbps", S, 3, (0, 0), DEF, false),
];

impl FileFormat {
    /// Looks up a format token.
    pub fn from_token(token: &str) -> Result<Self> {
        if token == "bmp" {
            bail!("bmp files are not supported");
        }
        match FORMATS.iter().find(|f| f.name == token) {
            Some(f) => Ok(*f),
            None => bail!("invalid pathspec format '{token}'"),
        }
    }

    /// Whether planes 1 and 2 exist.
    pub fn is_color(&self) -> bool {
        self.planes >= 3
    }

    /// Geometry of a `width` x `height` frame stored as `pixel_type`.
    pub fn geometry(&self, width: u32, height: u32, pixel_type: PixelType) -> ImageGeometry {
        let geom = ImageGeometry::new(width, height, pixel_type);
        if self.is_color() {
            geom.with_color(self.subsample_w, self.subsample_h)
        } else {
            geom
        }
    }

    /// Bytes per row and rows of each file plane, in logical plane order.
    pub fn plane_layout(&self, width: u32, height: u32) -> Vec<(usize, usize)> {
        let geom = self.geometry(width, height, self.pixel_type);
        geom.planes().map(|p| (geom.row_size(p), geom.plane_height(p) as usize)).collect()
    }

    /// Bytes in one frame.
    pub fn frame_size(&self, width: u32, height: u32) -> usize {
        match self.packing {
            Packing::Planar => self.plane_layout(width, height).iter().map(|(row, rows)| row * rows).sum(),
            Packing::Yuy2 => width as usize * 2 * height as usize,
        }
    }
}

/// A parsed `format@path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSpec {
    pub format: FileFormat,
    pub path: PathBuf,
}

impl PathSpec {
    /// Splits at the first `@`, falling back to `assumed` without one.
    pub fn parse(spec: &str, assumed: &str) -> Result<Self> {
        let (token, path) = spec.split_once('@').unwrap_or((assumed, spec));
        Ok(Self {
            format: FileFormat::from_token(token)?,
            path: PathBuf::from(path),
        })
    }

    /// Whether the path names the platform's null device.
    pub fn is_null_device(&self) -> bool {
        is_null_device(&self.path)
    }
}

#[cfg(windows)]
fn is_null_device(path: &Path) -> bool {
    path == Path::new("NUL")
}

#[cfg(not(windows))]
fn is_null_device(path: &Path) -> bool {
    path == Path::new("/dev/null")
}
