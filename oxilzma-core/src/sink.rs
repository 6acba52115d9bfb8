//! Byte sink with an optional output budget.
//!
//! The range encoder emits its output one byte at a time. When the
//! destination is bounded, every byte is charged against a budget and the
//! sink refuses further bytes with [`OxiLzmaError::LimitReached`] once the
//! budget is spent. An I/O failure of the wrapped writer is reported as
//! [`OxiLzmaError::Io`] and never confused with the limit condition.

use crate::error::{OxiLzmaError, Result};
use std::io::Write;

/// Budget used when no output limit is configured.
pub const UNLIMITED: i64 = i64::MAX;

/// A writer wrapper that counts bytes against a budget.
#[derive(Debug)]
pub struct LimitedSink<W: Write> {
    inner: W,
    remaining: i64,
    written: u64,
}

impl<W: Write> LimitedSink<W> {
    /// Wrap `inner`, allowing at most `limit` bytes (unbounded for `None`).
    pub fn new(inner: W, limit: Option<u64>) -> Self {
        let remaining = match limit {
            Some(n) => i64::try_from(n).unwrap_or(UNLIMITED),
            None => UNLIMITED,
        };
        Self {
            inner,
            remaining,
            written: 0,
        }
    }

    /// Wrap `inner` without a budget.
    pub fn unlimited(inner: W) -> Self {
        Self::new(inner, None)
    }

    /// Bytes that may still be written.
    #[inline]
    pub fn remaining(&self) -> i64 {
        self.remaining
    }

    /// Bytes written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Write a single byte.
    #[inline]
    pub fn write_byte(&mut self, byte: u8) -> Result<()> {
        if self.remaining <= 0 {
            return Err(OxiLzmaError::LimitReached);
        }
        self.inner.write_all(&[byte])?;
        self.written += 1;
        if self.remaining != UNLIMITED {
            self.remaining -= 1;
        }
        Ok(())
    }

    /// Write all of `bytes` or nothing.
    ///
    /// If the budget cannot hold the whole slice, no byte is written and
    /// [`OxiLzmaError::LimitReached`] is returned.
    pub fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let len = i64::try_from(bytes.len()).unwrap_or(UNLIMITED);
        if len > self.remaining {
            return Err(OxiLzmaError::LimitReached);
        }
        self.inner.write_all(bytes)?;
        self.written += bytes.len() as u64;
        if self.remaining != UNLIMITED {
            self.remaining -= len;
        }
        Ok(())
    }

    /// Flush the wrapped writer.
    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }

    /// Get a reference to the wrapped writer.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Unwrap the sink, returning the wrapped writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}
