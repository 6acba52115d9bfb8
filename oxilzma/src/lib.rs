//! # OxiLZMA
//!
//! Streaming LZMA compression.
//!
//! LZMA is the compression method behind `.lzma` files, 7-Zip archives and
//! the XZ format. This crate implements the encoder side:
//!
//! - **Match finders**: a hash chain over 4-byte words and a binary search
//!   tree over 4-byte fingerprints
//! - **Range coder** with adaptive 11-bit probabilities
//! - **Greedy parsing** through the 12-state LZMA automaton
//! - **Bounded output**: compression stops cleanly at an operation boundary
//!   once an output byte budget is exhausted
//!
//! ## Usage
//!
//! ### One-shot
//!
//! ```
//! use oxilzma::{LzmaLevel, compress};
//!
//! let data = b"Hello, World! Hello, World!";
//! let lzma = compress(data, LzmaLevel::DEFAULT)?;
//! assert_eq!(&lzma[5..13], &(data.len() as u64).to_le_bytes());
//! # Ok::<(), oxilzma::OxiLzmaError>(())
//! ```
//!
//! ### Streaming
//!
//! ```
//! use oxilzma::{LzmaWriter, WriterConfig, MatchAlgorithm};
//! use std::io::Write;
//!
//! let config = WriterConfig::new()
//!     .with_dict_cap(1 << 20)
//!     .with_matcher(MatchAlgorithm::BinaryTree);
//! let mut writer = LzmaWriter::with_config(Vec::new(), config)?;
//! for _ in 0..100 {
//!     writer.write_all(b"streaming input ")?;
//! }
//! let lzma = writer.finish()?;
//! assert!(lzma.len() < 1600);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## LZMA Format
//!
//! An `.lzma` stream consists of:
//! 1. Properties byte (lc, lp, pb encoded)
//! 2. Dictionary size (4 bytes, little-endian)
//! 3. Uncompressed size (8 bytes, little-endian, 0xFFFFFFFFFFFFFFFF = unknown)
//! 4. Compressed data, ended by the end marker when the size is unknown

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod dict;
pub mod encoder;
pub mod header;
pub mod matcher;
pub mod model;
pub mod operation;
pub mod range_coder;
pub mod writer;

// Re-exports
pub use encoder::Encoder;
pub use header::{HEADER_LEN, Header};
pub use matcher::{BinaryTree, HashChain, MatchAlgorithm, MatchFinder};
pub use model::{LzmaModel, LzmaProperties, State};
pub use operation::Operation;
pub use oxilzma_core::error::{OxiLzmaError, Result};
pub use range_coder::RangeEncoder;
pub use writer::{LzmaWriter, WriterConfig};

use header::MIN_DICT_CAP;

/// LZMA compression level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LzmaLevel(u8);

impl LzmaLevel {
    /// Fastest compression (level 0).
    pub const FAST: Self = Self(0);
    /// Default compression (level 6).
    pub const DEFAULT: Self = Self(6);
    /// Best compression (level 9).
    pub const BEST: Self = Self(9);

    /// Create a new compression level.
    pub fn new(level: u8) -> Self {
        Self(level.min(9))
    }

    /// Get the level value.
    pub fn level(&self) -> u8 {
        self.0
    }

    /// Get the dictionary size for this level.
    pub fn dict_size(&self) -> u32 {
        match self.0 {
            0 => 1 << 16, // 64 KB
            1 => 1 << 18, // 256 KB
            2 => 1 << 19, // 512 KB
            3 => 1 << 20, // 1 MB
            4 => 1 << 21, // 2 MB
            5 => 1 << 22, // 4 MB
            6 => 1 << 23, // 8 MB
            7 => 1 << 24, // 16 MB
            8 => 1 << 25, // 32 MB
            _ => 1 << 26, // 64 MB
        }
    }

    /// Get the match finder for this level.
    ///
    /// Levels up to the default use the hash chain. The binary tree is kept
    /// for levels 7 and above; long runs of a single byte degrade it to a
    /// linear chain.
    pub fn matcher(&self) -> MatchAlgorithm {
        if self.0 <= Self::DEFAULT.0 {
            MatchAlgorithm::HashChain4
        } else {
            MatchAlgorithm::BinaryTree
        }
    }

    /// Writer configuration for this level.
    pub fn config(&self) -> WriterConfig {
        WriterConfig::new()
            .with_dict_cap(self.dict_size() as usize)
            .with_matcher(self.matcher())
    }
}

impl Default for LzmaLevel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Compress `data` into an `.lzma` stream with a declared size.
///
/// The dictionary never exceeds what `data` can use: it is capped at the
/// input length rounded up to a power of two.
pub fn compress(data: &[u8], level: LzmaLevel) -> Result<Vec<u8>> {
    let needed = data
        .len()
        .max(MIN_DICT_CAP as usize)
        .checked_next_power_of_two()
        .unwrap_or(usize::MAX);
    let mut config = level.config().with_size(data.len() as u64);
    config.dict_cap = config.dict_cap.min(needed);
    compress_with(data, config)
}

/// Compress `data` into an `.lzma` stream using `config`.
pub fn compress_with(data: &[u8], config: WriterConfig) -> Result<Vec<u8>> {
    let mut writer = LzmaWriter::with_config(Vec::with_capacity(data.len() / 2 + 64), config)?;
    let mut pos = 0;
    while pos < data.len() {
        pos += writer.write_data(&data[pos..])?;
    }
    writer.finish()
}

/// Compress data to a Vec using default settings.
///
/// This is a convenience wrapper around [`compress`] with default level.
pub fn compress_bytes(data: &[u8]) -> Result<Vec<u8>> {
    compress(data, LzmaLevel::DEFAULT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level() {
        assert_eq!(LzmaLevel::FAST.level(), 0);
        assert_eq!(LzmaLevel::DEFAULT.level(), 6);
        assert_eq!(LzmaLevel::BEST.level(), 9);
    }

    #[test]
    fn test_level_clamp() {
        assert_eq!(LzmaLevel::new(100).level(), 9);
    }

    #[test]
    fn test_dict_size() {
        assert_eq!(LzmaLevel::FAST.dict_size(), 1 << 16);
        assert_eq!(LzmaLevel::DEFAULT.dict_size(), 1 << 23);
        assert_eq!(LzmaLevel::BEST.dict_size(), 1 << 26);
    }

    #[test]
    fn test_level_matcher() {
        assert_eq!(LzmaLevel::FAST.matcher(), MatchAlgorithm::HashChain4);
        assert_eq!(LzmaLevel::DEFAULT.matcher(), MatchAlgorithm::HashChain4);
        assert_eq!(LzmaLevel::new(7).matcher(), MatchAlgorithm::BinaryTree);
        assert!(LzmaLevel::BEST.config().verify().is_ok());
    }

    #[test]
    fn test_compress_caps_dictionary() {
        let lzma = compress(b"tiny", LzmaLevel::BEST).unwrap();
        let header = Header::parse(&lzma).unwrap();
        assert_eq!(header.dict_cap, 4096);
        assert_eq!(header.size, Some(4));

        let data = vec![7u8; 5000];
        let header = Header::parse(&compress(&data, LzmaLevel::FAST).unwrap()).unwrap();
        assert_eq!(header.dict_cap, 8192);
    }

    #[test]
    fn test_default_level_handles_single_byte_runs() {
        let data = vec![0u8; 1 << 20];
        let start = std::time::Instant::now();
        let lzma = compress_bytes(&data).unwrap();
        let elapsed = start.elapsed();

        assert!(lzma.len() < 1024, "{} bytes", lzma.len());
        assert!(elapsed.as_secs() < 30, "took {elapsed:?}");
    }

    #[test]
    fn test_compress_empty() {
        let lzma = compress_bytes(b"").unwrap();
        assert_eq!(lzma.len(), HEADER_LEN + 5);
    }

    #[test]
    fn test_compress_with_marker() {
        let config = WriterConfig::new().with_dict_cap(4096);
        let lzma = compress_with(b"marker", config).unwrap();
        assert_eq!(Header::parse(&lzma).unwrap().size, None);
    }
}
