//! Error types for OxiLZMA operations.
//!
//! The variants follow the encoder's failure classes: configuration errors
//! are raised eagerly at construction, `NoSpace` and `LimitReached` are
//! flow-control conditions the caller reacts to, and `SizeMismatch` marks a
//! stream that cannot be completed consistently. Internal invariant
//! violations are not represented here; they panic.

use std::io;
use thiserror::Error;

/// The main error type for OxiLZMA operations.
#[derive(Debug, Error)]
pub enum OxiLzmaError {
    /// I/O error from the underlying writer.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A configuration value is out of range.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the offending value.
        message: String,
    },

    /// The pending region cannot take more bytes.
    ///
    /// Raised by writes that exceed a declared uncompressed size; inside the
    /// encoder it only signals that a compression pass is needed.
    #[error("Insufficient space")]
    NoSpace,

    /// The output byte budget is exhausted.
    #[error("Output limit reached")]
    LimitReached,

    /// The number of bytes written differs from the size declared in the header.
    #[error("Size mismatch: header declares {declared} bytes, stream has {actual}")]
    SizeMismatch {
        /// Size declared in the header.
        declared: u64,
        /// Bytes actually written.
        actual: u64,
    },

    /// Invalid header format.
    #[error("Invalid header: {message}")]
    InvalidHeader {
        /// Description of the header error.
        message: String,
    },
}

/// Result type alias for OxiLZMA operations.
pub type Result<T> = std::result::Result<T, OxiLzmaError>;

impl OxiLzmaError {
    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an invalid header error.
    pub fn invalid_header(message: impl Into<String>) -> Self {
        Self::InvalidHeader {
            message: message.into(),
        }
    }

    /// Create a size mismatch error.
    pub fn size_mismatch(declared: u64, actual: u64) -> Self {
        Self::SizeMismatch { declared, actual }
    }

    /// Check whether this is the output-limit condition.
    pub fn is_limit(&self) -> bool {
        matches!(self, Self::LimitReached)
    }
}

impl From<OxiLzmaError> for io::Error {
    fn from(err: OxiLzmaError) -> Self {
        match err {
            OxiLzmaError::Io(e) => e,
            OxiLzmaError::NoSpace => io::Error::new(io::ErrorKind::WriteZero, err),
            OxiLzmaError::LimitReached => io::Error::new(io::ErrorKind::WriteZero, err),
            OxiLzmaError::InvalidConfig { .. } | OxiLzmaError::InvalidHeader { .. } => {
                io::Error::new(io::ErrorKind::InvalidInput, err)
            }
            OxiLzmaError::SizeMismatch { .. } => io::Error::new(io::ErrorKind::InvalidData, err),
        }
    }
}
