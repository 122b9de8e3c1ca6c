//! Error types for pixgraph operations.
//!
//! Every fallible operation in the workspace reports through the single
//! [`Error`] enum defined here.
//!
//! # Categories
//!
//! - **Configuration errors** are raised while a graph or filter is being
//!   built, or on entry to a graph execution before any row is produced:
//!   [`InvalidPixelFormat`](Error::InvalidPixelFormat),
//!   [`UnsupportedFormat`](Error::UnsupportedFormat),
//!   [`InvalidDimensions`](Error::InvalidDimensions),
//!   [`InvalidParameter`](Error::InvalidParameter),
//!   [`IncompatibleFilter`](Error::IncompatibleFilter),
//!   [`TooManyNodes`](Error::TooManyNodes),
//!   [`InsufficientBuffering`](Error::InsufficientBuffering),
//!   [`ScratchTooSmall`](Error::ScratchTooSmall).
//! - **I/O errors** come from row callbacks ([`Callback`](Error::Callback))
//!   or from the file layer ([`Io`](Error::Io)). A callback failure aborts
//!   the execution in flight and leaves the destination unspecified.
//!
//! Violations of the filter contract (tile ranges outside the declared
//! support, rows that were never made resident) are programming errors and
//! are caught by `debug_assert!` only.
//!
//! # Usage
//!
//! ```rust
//! use pixgraph_core::{Error, Result};
//!
//! fn check_subsample(shift: u32) -> Result<()> {
//!     if shift > 2 {
//!         return Err(Error::invalid_parameter("subsample", format!("{shift} > 2")));
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_subsample(1).is_ok());
//! assert!(check_subsample(3).unwrap_err().is_config());
//! ```

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or running a filter graph.
#[derive(Debug, Error)]
pub enum Error {
    /// Pixel format fields are inconsistent (depth out of range for the type).
    #[error("invalid pixel format: {reason}")]
    InvalidPixelFormat {
        /// Why the format was rejected
        reason: String,
    },

    /// Pixel type or external format is not handled by this operation.
    ///
    /// Returned for example when a resize is requested on 8-bit samples,
    /// or when half precision is requested with no accelerated path.
    #[error("unsupported format: {format}")]
    UnsupportedFormat {
        /// Format name or description
        format: String,
    },

    /// Invalid image dimensions.
    ///
    /// Zero-sized planes, or dimensions not divisible by the chroma
    /// subsampling factor.
    #[error("invalid dimensions: {width}x{height} ({reason})")]
    InvalidDimensions {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
        /// Reason why dimensions are invalid
        reason: String,
    },

    /// A builder parameter is out of range.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// Reason why the value was rejected
        reason: String,
    },

    /// A filter does not fit the node it is attached to.
    ///
    /// Raised when the filter's dependencies reach outside its input, when
    /// plane counts disagree, or when the final output geometry of a chain
    /// is inconsistent with the rest of the image.
    #[error("incompatible filter: {reason}")]
    IncompatibleFilter {
        /// Description of the mismatch
        reason: String,
    },

    /// The graph already holds the maximum number of nodes.
    #[error("too many nodes in filter graph (limit {limit})")]
    TooManyNodes {
        /// Node limit
        limit: usize,
    },

    /// A caller buffer holds fewer rows than the graph needs.
    #[error("insufficient buffering on plane {plane}: {required} rows required, {provided} provided")]
    InsufficientBuffering {
        /// Plane index
        plane: usize,
        /// Rows the graph needs resident at once
        required: u32,
        /// Rows addressable through the descriptor mask
        provided: u32,
    },

    /// The scratch arena is smaller than the graph's `tmp_size()`.
    #[error("scratch buffer too small: {required} bytes required, {provided} provided")]
    ScratchTooSmall {
        /// Required size in bytes
        required: usize,
        /// Provided size in bytes
        provided: usize,
    },

    /// A row callback reported failure.
    #[error("{stage} callback failed at row {row}: {source}")]
    Callback {
        /// `"unpack"` or `"pack"`
        stage: &'static str,
        /// Luma row passed to the callback
        row: u32,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// I/O error from the file layer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Creates an [`Error::InvalidPixelFormat`].
    pub fn invalid_format(reason: impl Into<String>) -> Self {
        Self::InvalidPixelFormat { reason: reason.into() }
    }

    /// Creates an [`Error::UnsupportedFormat`].
    pub fn unsupported(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat { format: format.into() }
    }

    /// Creates an [`Error::InvalidDimensions`].
    pub fn invalid_dimensions(width: u32, height: u32, reason: impl Into<String>) -> Self {
        Self::InvalidDimensions {
            width,
            height,
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::InvalidParameter`].
    pub fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::IncompatibleFilter`].
    pub fn incompatible(reason: impl Into<String>) -> Self {
        Self::IncompatibleFilter { reason: reason.into() }
    }

    /// Returns `true` for errors raised during configuration.
    pub fn is_config(&self) -> bool {
        !self.is_io()
    }

    /// Returns `true` for callback and file failures.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Callback { .. } | Self::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InsufficientBuffering {
            plane: 1,
            required: 4,
            provided: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("plane 1"));
        assert!(msg.contains("4 rows"));
    }

    #[test]
    fn test_error_classification() {
        assert!(Error::unsupported("byte").is_config());
        assert!(Error::TooManyNodes { limit: 32 }.is_config());

        let cb = Error::Callback {
            stage: "unpack",
            row: 7,
            source: std::io::Error::other("eof"),
        };
        assert!(cb.is_io());
        assert!(cb.to_string().contains("row 7"));
    }

    #[test]
    fn test_io_from() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert!(matches!(err, Error::Io(_)));
    }
}
