//! Match finders.
//!
//! A match finder indexes the bytes that leave the lookahead and, given the
//! current lookahead, proposes the next [`Operation`]. Two strategies are
//! available:
//!
//! - [`HashChain`]: hash of the next 4 bytes plus a bounded chain of
//!   earlier positions with the same hash. Fast, less thorough.
//! - [`BinaryTree`]: binary search tree over 4-byte fingerprints of every
//!   window position. Slower, finds longer matches.
//!
//! The strategy is picked once per stream through [`MatchAlgorithm`].

pub mod bintree;
pub mod hash_chain;

pub use bintree::BinaryTree;
pub use hash_chain::HashChain;

use crate::dict::Window;
use crate::operation::Operation;
use oxilzma_core::error::{OxiLzmaError, Result};
use std::fmt;
use std::str::FromStr;

/// Shared contract of the match finders.
pub trait MatchFinder {
    /// Index bytes that just moved from the lookahead into the history.
    fn write(&mut self, p: &[u8]);

    /// Propose the operation for the start of the lookahead.
    ///
    /// `rep` holds the four most recent distances, zero-based. The window
    /// must hold at least one pending byte.
    fn next_op(&mut self, window: &Window<'_>, rep: &[u32; 4]) -> Operation;
}

/// Match finding algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchAlgorithm {
    /// Hash chain over 4-byte words.
    #[default]
    HashChain4,
    /// Binary tree over 4-byte fingerprints.
    BinaryTree,
}

impl MatchAlgorithm {
    /// Short name used on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Self::HashChain4 => "hc4",
            Self::BinaryTree => "bt4",
        }
    }
}

impl fmt::Display for MatchAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MatchAlgorithm {
    type Err = OxiLzmaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hc4" | "hashchain" | "hash-chain" => Ok(Self::HashChain4),
            "bt4" | "bintree" | "binary-tree" => Ok(Self::BinaryTree),
            _ => Err(OxiLzmaError::invalid_config(format!(
                "unsupported match algorithm '{s}'"
            ))),
        }
    }
}

/// Best match found so far during a search.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Best {
    pub(crate) distance: usize,
    pub(crate) len: usize,
}

impl Best {
    /// Turn the search result into an operation, falling back to a literal.
    pub(crate) fn into_op(self, lookahead: &[u8]) -> Operation {
        if self.len == 0 {
            Operation::Literal(lookahead[0])
        } else {
            Operation::new_match(self.distance as u64, self.len)
        }
    }
}

/// Check whether a match of length `len` at `distance` may be proposed.
///
/// Single bytes are only worth a match when they repeat `rep0`.
#[inline]
pub(crate) fn acceptable(distance: usize, len: usize, rep0: u32) -> bool {
    match len {
        0 => false,
        1 => distance as u64 - 1 == rep0 as u64,
        _ => true,
    }
}
