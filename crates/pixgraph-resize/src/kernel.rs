//! Resampling kernels.
//!
//! A [`Kernel`] is an even function with finite integer support. The
//! weights of a resize are samples of the kernel at the distances between
//! output and input sample centers.
//!
//! # Kernels
//!
//! - [`PointKernel`] - nearest neighbor
//! - [`BilinearKernel`] - triangle
//! - [`BicubicKernel`] - Mitchell-Netravali family with parameters `b`, `c`
//! - [`Spline16Kernel`], [`Spline36Kernel`], [`Spline64Kernel`] - cubic
//!   splines over 4, 6 and 8 taps
//! - [`LanczosKernel`] - windowed sinc
//!
//! ```rust
//! use pixgraph_resize::kernel::{Kernel, KernelKind};
//!
//! let kernel = KernelKind::Lanczos.create(3).unwrap();
//! assert_eq!(kernel.support(), 3);
//! assert_eq!(kernel.evaluate(0.0), 1.0);
//! assert!(kernel.evaluate(3.0).abs() < 1e-12);
//! ```

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use pixgraph_core::{Error, Result};

/// A resampling kernel.
pub trait Kernel: Send + Sync + fmt::Debug {
    /// Half-width of the non-zero region, in input samples.
    fn support(&self) -> u32;

    /// Kernel value at distance `x`.
    fn evaluate(&self, x: f64) -> f64;
}

#[inline]
fn poly3(x: f64, c0: f64, c1: f64, c2: f64, c3: f64) -> f64 {
    c0 + x * (c1 + x * (c2 + x * c3))
}

#[inline]
fn sinc(x: f64) -> f64 {
    if x == 0.0 { 1.0 } else { (PI * x).sin() / (PI * x) }
}

/// Nearest neighbor. Support 0: a single tap, weight 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct PointKernel;

impl Kernel for PointKernel {
    fn support(&self) -> u32 {
        0
    }

    fn evaluate(&self, _x: f64) -> f64 {
        1.0
    }
}

/// Linear interpolation.
#[derive(Debug, Clone, Copy, Default)]
pub struct BilinearKernel;

impl Kernel for BilinearKernel {
    fn support(&self) -> u32 {
        1
    }

    fn evaluate(&self, x: f64) -> f64 {
        (1.0 - x.abs()).max(0.0)
    }
}

/// Mitchell-Netravali cubic.
///
/// `(b, c) = (0, 0.5)` is Catmull-Rom, `(1/3, 1/3)` is Mitchell.
#[derive(Debug, Clone, Copy)]
pub struct BicubicKernel {
    p0: f64,
    p2: f64,
    p3: f64,
    q0: f64,
    q1: f64,
    q2: f64,
    q3: f64,
}

impl BicubicKernel {
    /// Default `b`.
    pub const DEFAULT_B: f64 = 0.0;
    /// Default `c`.
    pub const DEFAULT_C: f64 = 0.5;

    /// Creates a cubic with parameters `b` and `c`.
    pub fn new(b: f64, c: f64) -> Self {
        Self {
            p0: (6.0 - 2.0 * b) / 6.0,
            p2: (-18.0 + 12.0 * b + 6.0 * c) / 6.0,
            p3: (12.0 - 9.0 * b - 6.0 * c) / 6.0,
            q0: (8.0 * b + 24.0 * c) / 6.0,
            q1: (-12.0 * b - 48.0 * c) / 6.0,
            q2: (6.0 * b + 30.0 * c) / 6.0,
            q3: (-b - 6.0 * c) / 6.0,
        }
    }
}

impl Default for BicubicKernel {
    fn default() -> Self {
        Self::new(Self::DEFAULT_B, Self::DEFAULT_C)
    }
}

impl Kernel for BicubicKernel {
    fn support(&self) -> u32 {
        2
    }

    fn evaluate(&self, x: f64) -> f64 {
        let x = x.abs();
        if x < 1.0 {
            poly3(x, self.p0, 0.0, self.p2, self.p3)
        } else if x < 2.0 {
            poly3(x, self.q0, self.q1, self.q2, self.q3)
        } else {
            0.0
        }
    }
}

/// 4-tap cubic spline.
#[derive(Debug, Clone, Copy, Default)]
pub struct Spline16Kernel;

impl Kernel for Spline16Kernel {
    fn support(&self) -> u32 {
        2
    }

    fn evaluate(&self, x: f64) -> f64 {
        let x = x.abs();
        if x < 1.0 {
            poly3(x, 1.0, -1.0 / 5.0, -9.0 / 5.0, 1.0)
        } else if x < 2.0 {
            poly3(x - 1.0, 0.0, -7.0 / 15.0, 4.0 / 5.0, -1.0 / 3.0)
        } else {
            0.0
        }
    }
}

/// 6-tap cubic spline.
#[derive(Debug, Clone, Copy, Default)]
pub struct Spline36Kernel;

impl Kernel for Spline36Kernel {
    fn support(&self) -> u32 {
        3
    }

    fn evaluate(&self, x: f64) -> f64 {
        let x = x.abs();
        if x < 1.0 {
            poly3(x, 1.0, -3.0 / 209.0, -453.0 / 209.0, 13.0 / 11.0)
        } else if x < 2.0 {
            poly3(x - 1.0, 0.0, -156.0 / 209.0, 270.0 / 209.0, -6.0 / 11.0)
        } else if x < 3.0 {
            poly3(x - 2.0, 0.0, 26.0 / 209.0, -45.0 / 209.0, 1.0 / 11.0)
        } else {
            0.0
        }
    }
}

/// 8-tap cubic spline.
#[derive(Debug, Clone, Copy, Default)]
pub struct Spline64Kernel;

impl Kernel for Spline64Kernel {
    fn support(&self) -> u32 {
        4
    }

    fn evaluate(&self, x: f64) -> f64 {
        let x = x.abs();
        if x < 1.0 {
            poly3(x, 1.0, -3.0 / 2911.0, -6387.0 / 2911.0, 49.0 / 41.0)
        } else if x < 2.0 {
            poly3(x - 1.0, 0.0, -2328.0 / 2911.0, 4032.0 / 2911.0, -24.0 / 41.0)
        } else if x < 3.0 {
            poly3(x - 2.0, 0.0, 582.0 / 2911.0, -1008.0 / 2911.0, 6.0 / 41.0)
        } else if x < 4.0 {
            poly3(x - 3.0, 0.0, -97.0 / 2911.0, 168.0 / 2911.0, -1.0 / 41.0)
        } else {
            0.0
        }
    }
}

/// Lanczos windowed sinc with `taps` lobes per side.
#[derive(Debug, Clone, Copy)]
pub struct LanczosKernel {
    taps: u32,
}

impl LanczosKernel {
    /// Default lobe count.
    pub const DEFAULT_TAPS: u32 = 3;

    /// Creates a Lanczos kernel. `taps` must be at least 1.
    pub fn new(taps: u32) -> Result<Self> {
        if taps == 0 {
            return Err(Error::invalid_parameter("taps", "lanczos needs at least one tap"));
        }
        Ok(Self { taps })
    }
}

impl Kernel for LanczosKernel {
    fn support(&self) -> u32 {
        self.taps
    }

    fn evaluate(&self, x: f64) -> f64 {
        let x = x.abs();
        let a = self.taps as f64;
        if x < a { sinc(x) * sinc(x / a) } else { 0.0 }
    }
}

/// Kernel family selector, for configuration surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum KernelKind {
    /// [`PointKernel`].
    Point,
    /// [`BilinearKernel`].
    Bilinear,
    /// [`BicubicKernel`] with default parameters.
    #[default]
    Bicubic,
    /// [`Spline16Kernel`].
    Spline16,
    /// [`Spline36Kernel`].
    Spline36,
    /// [`Spline64Kernel`].
    Spline64,
    /// [`LanczosKernel`].
    Lanczos,
}

impl KernelKind {
    /// Every kind.
    pub const ALL: [KernelKind; 7] = [
        Self::Point,
        Self::Bilinear,
        Self::Bicubic,
        Self::Spline16,
        Self::Spline36,
        Self::Spline64,
        Self::Lanczos,
    ];

    /// Lowercase name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Point => "point",
            Self::Bilinear => "bilinear",
            Self::Bicubic => "bicubic",
            Self::Spline16 => "spline16",
            Self::Spline36 => "spline36",
            Self::Spline64 => "spline64",
            Self::Lanczos => "lanczos",
        }
    }

    /// Builds the kernel. `taps` is only read by Lanczos.
    pub fn create(self, taps: u32) -> Result<Box<dyn Kernel>> {
        Ok(match self {
            Self::Point => Box::new(PointKernel),
            Self::Bilinear => Box::new(BilinearKernel),
            Self::Bicubic => Box::new(BicubicKernel::default()),
            Self::Spline16 => Box::new(Spline16Kernel),
            Self::Spline36 => Box::new(Spline36Kernel),
            Self::Spline64 => Box::new(Spline64Kernel),
            Self::Lanczos => Box::new(LanczosKernel::new(taps)?),
        })
    }
}

impl fmt::Display for KernelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KernelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.name() == lower)
            .ok_or_else(|| Error::invalid_parameter("kernel", format!("unknown kernel '{s}'")))
    }
}
