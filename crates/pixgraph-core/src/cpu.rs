//! CPU capability detection and implementation class selection.
//!
//! Filter builders accept a [`CpuClass`] naming the instruction set they may
//! use. [`CpuClass::Auto`] resolves to the best class the running CPU
//! supports; [`CpuClass::None`] always selects the portable baseline.
//!
//! The concrete classes gate availability only. Every accelerated class
//! currently selects the same portable `wide` implementation, so `sse2`,
//! `avx2` and `neon` produce identical filters on a CPU that supports them.
//!
//! Detection runs once per process and is read-only afterwards:
//!
//! ```rust
//! use pixgraph_core::cpu::{CpuCapabilities, CpuClass};
//!
//! let caps = CpuCapabilities::get();
//! let class = CpuClass::Auto.resolve();
//! assert!(class == CpuClass::None || caps.supports(class));
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Instruction set family a filter implementation may target.
///
/// Any class other than [`CpuClass::None`] enables the shared accelerated
/// implementation once [`CpuClass::resolve`] confirms support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CpuClass {
    /// Portable baseline only.
    None,
    /// Best available on this machine.
    #[default]
    Auto,
    /// x86 with SSE2.
    X86Sse2,
    /// x86 with AVX2 and FMA.
    X86Avx2,
    /// AArch64 with NEON.
    ArmNeon,
}

impl CpuClass {
    /// Short lowercase name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Auto => "auto",
            Self::X86Sse2 => "sse2",
            Self::X86Avx2 => "avx2",
            Self::ArmNeon => "neon",
        }
    }

    /// Whether this class selects an accelerated implementation.
    pub const fn is_accelerated(self) -> bool {
        !matches!(self, Self::None)
    }

    /// Maps `Auto` to the best supported class and unsupported classes to
    /// [`CpuClass::None`].
    pub fn resolve(self) -> CpuClass {
        let caps = CpuCapabilities::get();
        match self {
            Self::Auto => select_best_class(),
            Self::None => Self::None,
            class if caps.supports(class) => class,
            class => {
                warn!(requested = class.name(), "CPU class not supported, using baseline");
                Self::None
            }
        }
    }
}

impl fmt::Display for CpuClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CpuClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "auto" => Ok(Self::Auto),
            "sse2" => Ok(Self::X86Sse2),
            "avx2" => Ok(Self::X86Avx2),
            "neon" => Ok(Self::ArmNeon),
            other => Err(Error::invalid_parameter("cpu", format!("unknown class '{other}'"))),
        }
    }
}

/// Instruction set extensions present on the running CPU.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuCapabilities {
    /// SSE2.
    pub sse2: bool,
    /// SSE4.1.
    pub sse41: bool,
    /// AVX2.
    pub avx2: bool,
    /// FMA3.
    pub fma: bool,
    /// AArch64 Advanced SIMD.
    pub neon: bool,
}

static CAPABILITIES: OnceLock<CpuCapabilities> = OnceLock::new();

impl CpuCapabilities {
    /// Detects CPU features.
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    pub fn detect() -> Self {
        Self {
            sse2: is_x86_feature_detected!("sse2"),
            sse41: is_x86_feature_detected!("sse4.1"),
            avx2: is_x86_feature_detected!("avx2"),
            fma: is_x86_feature_detected!("fma"),
            neon: false,
        }
    }

    /// Detects CPU features.
    #[cfg(target_arch = "aarch64")]
    pub fn detect() -> Self {
        Self {
            neon: std::arch::is_aarch64_feature_detected!("neon"),
            ..Self::default()
        }
    }

    /// Detects CPU features.
    #[cfg(not(any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")))]
    pub fn detect() -> Self {
        Self::default()
    }

    /// Cached detection result.
    pub fn get() -> &'static Self {
        CAPABILITIES.get_or_init(|| {
            let caps = Self::detect();
            debug!(?caps, "detected CPU capabilities");
            caps
        })
    }

    /// Whether a concrete class can run here. `None` and `Auto` always can.
    pub fn supports(&self, class: CpuClass) -> bool {
        match class {
            CpuClass::None | CpuClass::Auto => true,
            CpuClass::X86Sse2 => self.sse2,
            CpuClass::X86Avx2 => self.avx2 && self.fma,
            CpuClass::ArmNeon => self.neon,
        }
    }
}

/// Information about one CPU class.
#[derive(Debug, Clone)]
pub struct CpuClassInfo {
    /// Class.
    pub class: CpuClass,
    /// Whether the running CPU supports it.
    pub available: bool,
    /// Priority for auto-selection (higher = preferred).
    pub priority: u32,
    /// Description.
    pub description: &'static str,
}

/// Lists every concrete class, most preferred first.
pub fn detect_cpu_classes() -> Vec<CpuClassInfo> {
    let caps = CpuCapabilities::get();
    let mut classes = vec![
        CpuClassInfo {
            class: CpuClass::None,
            available: true,
            priority: 10,
            description: "portable scalar baseline",
        },
        CpuClassInfo {
            class: CpuClass::X86Sse2,
            available: caps.supports(CpuClass::X86Sse2),
            priority: 50,
            description: "x86 128-bit vectors",
        },
        CpuClassInfo {
            class: CpuClass::X86Avx2,
            available: caps.supports(CpuClass::X86Avx2),
            priority: 100,
            description: "x86 256-bit vectors with FMA",
        },
        CpuClassInfo {
            class: CpuClass::ArmNeon,
            available: caps.supports(CpuClass::ArmNeon),
            priority: 50,
            description: "AArch64 128-bit vectors",
        },
    ];

    classes.sort_by(|a, b| b.priority.cmp(&a.priority));
    classes
}

/// Best class the running CPU supports.
pub fn select_best_class() -> CpuClass {
    detect_cpu_classes()
        .into_iter()
        .filter(|c| c.available)
        .max_by_key(|c| c.priority)
        .map(|c| c.class)
        .unwrap_or(CpuClass::None)
}

/// Human-readable list of classes and their availability.
pub fn describe_cpu() -> String {
    let mut desc = String::new();
    for info in detect_cpu_classes() {
        let status = if info.available { "+" } else { "-" };
        let backend = if info.class.is_accelerated() { "wide" } else { "scalar" };
        desc.push_str(&format!("[{}] {}: {} ({})\n", status, info.class, info.description, backend));
    }
    desc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_class() {
        assert_eq!("AVX2".parse::<CpuClass>().unwrap(), CpuClass::X86Avx2);
        assert_eq!("none".parse::<CpuClass>().unwrap(), CpuClass::None);
        assert!("mmx".parse::<CpuClass>().is_err());
    }

    #[test]
    fn test_resolve() {
        assert_eq!(CpuClass::None.resolve(), CpuClass::None);
        let best = CpuClass::Auto.resolve();
        assert_ne!(best, CpuClass::Auto);
        assert!(CpuCapabilities::get().supports(best));
    }

    #[test]
    fn test_detection_is_cached() {
        let a = CpuCapabilities::get() as *const _;
        let b = CpuCapabilities::get() as *const _;
        assert_eq!(a, b);
    }

    #[test]
    fn test_describe() {
        let desc = describe_cpu();
        assert!(desc.contains("[+] none"));
        assert_eq!(desc.lines().count(), 4);
        assert!(desc.lines().next_back().is_some_and(|l| l.ends_with("(scalar)")));
        assert_eq!(desc.matches("(wide)").count(), 3);
    }
}
