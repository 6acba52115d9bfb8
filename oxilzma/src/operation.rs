//! Operations proposed by a match finder.

use crate::model::{MATCH_LEN_MAX, MATCH_LEN_MIN};
use std::fmt;

/// Smallest match distance.
pub const MIN_DISTANCE: u64 = 1;

/// Largest match distance; `MAX_DISTANCE - 1` still fits the 32-bit wire field.
pub const MAX_DISTANCE: u64 = 1 << 32;

/// The next thing to emit: a literal byte or a back-reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// A single byte coded as a literal.
    Literal(u8),
    /// Copy `len` bytes starting `distance` bytes back.
    Match {
        /// Distance back from the current position, at least 1.
        distance: u64,
        /// Number of bytes copied.
        len: usize,
    },
}

impl Operation {
    /// Create a match operation.
    pub fn new_match(distance: u64, len: usize) -> Self {
        Self::Match { distance, len }
    }

    /// Number of input bytes covered by the operation.
    pub fn len(&self) -> usize {
        match self {
            Self::Literal(_) => 1,
            Self::Match { len, .. } => *len,
        }
    }

    /// Always false; every operation covers at least one byte.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Check that a match is encodable given the current `rep0`.
///
/// Lengths run from 2 to 273; a length of 1 is only allowed as a short
/// repeat of `rep0`. `rep0` is stored zero-based like on the wire.
pub fn is_valid_match(distance: u64, len: usize, rep0: u32) -> bool {
    if !(MIN_DISTANCE..=MAX_DISTANCE).contains(&distance) {
        return false;
    }
    match len {
        1 => distance - MIN_DISTANCE == rep0 as u64,
        _ => (MATCH_LEN_MIN..=MATCH_LEN_MAX).contains(&len),
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(b) if b.is_ascii_graphic() => write!(f, "L{{'{}'}}", *b as char),
            Self::Literal(b) => write!(f, "L{{0x{b:02x}}}"),
            Self::Match { distance, len } => write!(f, "M{{{distance},{len}}}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_len() {
        assert_eq!(Operation::Literal(b'x').len(), 1);
        assert_eq!(Operation::new_match(3, 17).len(), 17);
    }

    #[test]
    fn test_match_validity() {
        assert!(is_valid_match(1, 2, 0));
        assert!(is_valid_match(MAX_DISTANCE, MATCH_LEN_MAX, 0));
        assert!(!is_valid_match(0, 2, 0));
        assert!(!is_valid_match(MAX_DISTANCE + 1, 2, 0));
        assert!(!is_valid_match(5, MATCH_LEN_MAX + 1, 0));
        assert!(!is_valid_match(5, 0, 0));

        // short repeat only at rep0
        assert!(is_valid_match(5, 1, 4));
        assert!(!is_valid_match(5, 1, 3));
    }

    #[test]
    fn test_display() {
        assert_eq!(Operation::Literal(b'A').to_string(), "L{'A'}");
        assert_eq!(Operation::Literal(0).to_string(), "L{0x00}");
        assert_eq!(Operation::new_match(2, 6).to_string(), "M{2,6}");
    }
}
