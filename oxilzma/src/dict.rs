//! Encoder dictionary.
//!
//! The dictionary owns the sliding window and the match finder. Input
//! bytes are admitted as pending (lookahead) bytes; [`EncoderDict::discard`]
//! moves compressed bytes out of the pending region, where they remain in
//! the window as match history, and feeds exactly those bytes to the match
//! finder. The match finder never sees bytes by any other route.

use crate::matcher::MatchFinder;
use crate::model::MATCH_LEN_MAX;
use crate::operation::Operation;
use oxilzma_core::error::{OxiLzmaError, Result};
use oxilzma_core::ringbuffer::RingBuffer;

/// Read-only view of the window passed to a match finder.
#[derive(Debug, Clone, Copy)]
pub struct Window<'a> {
    buf: &'a RingBuffer,
    head: u64,
    dict_len: usize,
}

impl<'a> Window<'a> {
    /// Create a view over `buf`.
    pub fn new(buf: &'a RingBuffer, head: u64, dict_len: usize) -> Self {
        Self {
            buf,
            head,
            dict_len,
        }
    }

    /// Stream position of the first pending byte.
    pub fn head(&self) -> u64 {
        self.head
    }

    /// Largest usable match distance.
    pub fn dict_len(&self) -> usize {
        self.dict_len
    }

    /// Copy up to `out.len()` pending bytes into `out`.
    pub fn peek(&self, out: &mut [u8]) -> usize {
        self.buf.peek(out)
    }

    /// The `offset`-th byte of a match at `distance`.
    #[inline]
    pub fn byte_behind(&self, distance: usize, offset: usize) -> u8 {
        self.buf.byte_behind(distance, offset)
    }

    /// Length of the match of `p` at `distance`.
    #[inline]
    pub fn match_len(&self, distance: usize, p: &[u8]) -> usize {
        self.buf.match_len(distance, p)
    }
}

/// The encoder dictionary.
#[derive(Debug)]
pub struct EncoderDict<M: MatchFinder> {
    buf: RingBuffer,
    matcher: M,
    /// Total number of bytes discarded into the history so far.
    head: u64,
    capacity: usize,
    scratch: [u8; MATCH_LEN_MAX],
}

impl<M: MatchFinder> EncoderDict<M> {
    /// Create a dictionary with `dict_cap` bytes of history and `buf_size`
    /// bytes of lookahead.
    ///
    /// `buf_size` must hold at least one maximum-length match.
    pub fn new(dict_cap: usize, buf_size: usize, matcher: M) -> Result<Self> {
        if dict_cap == 0 || dict_cap as u64 > u32::MAX as u64 {
            return Err(OxiLzmaError::invalid_config(format!(
                "dictionary capacity {dict_cap} out of range"
            )));
        }
        if buf_size < MATCH_LEN_MAX {
            return Err(OxiLzmaError::invalid_config(format!(
                "buffer size {buf_size} smaller than maximum match length {MATCH_LEN_MAX}"
            )));
        }
        let size = dict_cap
            .checked_add(buf_size)
            .ok_or_else(|| OxiLzmaError::invalid_config("dictionary too large"))?;

        Ok(Self {
            buf: RingBuffer::new(size),
            matcher,
            head: 0,
            capacity: dict_cap,
            scratch: [0; MATCH_LEN_MAX],
        })
    }

    /// Admit bytes from `p` into the pending region.
    ///
    /// Returns the number of bytes admitted. A count below `p.len()` means
    /// the pending region is full; compress and retry with the rest.
    pub fn write(&mut self, p: &[u8]) -> usize {
        let m = self.available();
        self.buf.write(&p[..p.len().min(m)])
    }

    /// Move the `n` oldest pending bytes into the history.
    ///
    /// # Panics
    ///
    /// Panics if `n` exceeds the pending byte count or the maximum match
    /// length.
    pub fn discard(&mut self, n: usize) {
        let p = &mut self.scratch[..n];
        let k = self.buf.read(p);
        assert!(k == n, "can't discard {n} bytes, only {k} buffered");
        self.head += n as u64;
        self.matcher.write(p);
    }

    /// Ask the match finder for the next operation.
    pub fn next_op(&mut self, rep: &[u32; 4]) -> Operation {
        let window = Window::new(&self.buf, self.head, self.dict_len());
        self.matcher.next_op(&window, rep)
    }

    /// Number of history bytes physically present in the window.
    pub fn len(&self) -> usize {
        let n = self.buf.available();
        if n as u64 > self.head {
            self.head as usize
        } else {
            n
        }
    }

    /// Check whether no history exists yet.
    pub fn is_empty(&self) -> bool {
        self.head == 0
    }

    /// Number of history bytes usable as match source.
    pub fn dict_len(&self) -> usize {
        if self.head < self.capacity as u64 {
            self.head as usize
        } else {
            self.capacity
        }
    }

    /// Number of bytes that can still be admitted.
    pub fn available(&self) -> usize {
        self.buf.available() - self.dict_len()
    }

    /// Number of pending bytes.
    pub fn buffered(&self) -> usize {
        self.buf.buffered()
    }

    /// Stream position of the first pending byte.
    pub fn pos(&self) -> u64 {
        self.head
    }

    /// Configured history capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Byte `distance` positions back from the first pending byte.
    ///
    /// Returns 0 for a distance of 0 or beyond the available history.
    pub fn byte_at(&self, distance: usize) -> u8 {
        if distance == 0 || distance > self.len() {
            return 0;
        }
        self.buf.byte_behind(distance, 0)
    }

    /// Get a reference to the match finder.
    pub fn matcher(&self) -> &M {
        &self.matcher
    }
}
