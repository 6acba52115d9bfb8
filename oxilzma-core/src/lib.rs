//! # OxiLZMA Core
//!
//! Core components shared by the OxiLZMA encoder and tools.
//!
//! - [`ringbuffer`]: Sliding window buffer holding lookahead and match history
//! - [`sink`]: Byte sink with an optional output budget
//! - [`hash`]: Rolling hash used by the hash-chain match finder
//! - [`error`]: Error types
//!
//! ## Example
//!
//! ```rust
//! use oxilzma_core::ringbuffer::RingBuffer;
//!
//! let mut window = RingBuffer::new(16);
//! window.write(b"ABABAB");
//!
//! let mut consumed = [0u8; 2];
//! window.read(&mut consumed);
//!
//! // "ABAB" is still pending and repeats the history at distance 2
//! let mut lookahead = [0u8; 4];
//! let n = window.peek(&mut lookahead);
//! assert_eq!(window.match_len(2, &lookahead[..n]), 4);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod hash;
pub mod ringbuffer;
pub mod sink;

// Re-exports for convenience
pub use error::{OxiLzmaError, Result};
pub use hash::CyclicPoly;
pub use ringbuffer::RingBuffer;
pub use sink::LimitedSink;
