//! Range encoder for LZMA compression.
//!
//! The range coder is an entropy coding method similar to arithmetic coding.
//! LZMA uses a specific variant with:
//! - 32-bit range tracking
//! - Normalization when range drops below 2^24
//! - 11-bit probability model (2048 = 100%, 1024 = 50%)
//!
//! Output goes through a [`LimitedSink`], so a bounded destination makes the
//! encoder fail with [`OxiLzmaError::LimitReached`] instead of truncating
//! the stream.

use oxilzma_core::error::{OxiLzmaError, Result};
use oxilzma_core::sink::LimitedSink;
use std::io::Write;

/// Number of bits in probability model.
pub const PROB_BITS: u32 = 11;

/// Initial probability (50%).
pub const PROB_INIT: u16 = 1 << (PROB_BITS - 1);

/// Probability upper bound (exclusive).
pub const PROB_MAX: u16 = 1 << PROB_BITS;

/// Number of bits to shift for probability update.
pub const MOVE_BITS: u32 = 5;

/// Top value for range normalization.
const TOP_VALUE: u32 = 1 << 24;

/// Bytes still owed by a flush beyond the pending cache bytes.
const FLUSH_TAIL: i64 = 4;

/// Move `prob` toward the bit just observed.
///
/// A zero bit raises the probability toward [`PROB_MAX`], a one bit lowers
/// it toward zero. Each step covers 1/32 of the remaining distance, so the
/// value never leaves `(0, PROB_MAX)`.
#[inline]
pub fn update_prob(prob: &mut u16, bit: u32) {
    if bit == 0 {
        *prob += (PROB_MAX - *prob) >> MOVE_BITS;
    } else {
        *prob -= *prob >> MOVE_BITS;
    }
}

/// Range encoder for LZMA compression.
#[derive(Debug)]
pub struct RangeEncoder<W: Write> {
    /// Output sink.
    sink: LimitedSink<W>,
    /// Current range.
    range: u32,
    /// Low value; bit 32 holds a pending carry.
    low: u64,
    /// Cache byte.
    cache: u8,
    /// Number of pending bytes: the cache byte plus any 0xFF run behind it.
    cache_size: i64,
    /// Set by [`close`](Self::close); the flush may spend its reserve.
    flushing: bool,
}

impl<W: Write> RangeEncoder<W> {
    /// Create a new range encoder writing to `sink`.
    pub fn new(sink: LimitedSink<W>) -> Self {
        Self {
            sink,
            range: 0xFFFF_FFFF,
            low: 0,
            cache: 0,
            cache_size: 1,
            flushing: false,
        }
    }

    /// Bytes of budget left once all pending bytes and a flush are paid for.
    ///
    /// Negative when the budget cannot even cover the flush.
    #[inline]
    pub fn available(&self) -> i64 {
        self.sink.remaining() - (self.cache_size + FLUSH_TAIL)
    }

    /// Write one output byte, charging it against the budget.
    ///
    /// Payload bytes may not eat into the bytes reserved for the flush.
    #[inline]
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        if !self.flushing && self.available() < 1 {
            return Err(OxiLzmaError::LimitReached);
        }
        self.sink.write_byte(byte)
    }

    /// Shift low and write bytes.
    ///
    /// This uses the carry-handling cache mechanism from the LZMA SDK.
    /// The low value is a 64-bit accumulator where bit 32 represents overflow (carry).
    fn shift_low(&mut self) -> Result<()> {
        // Output is possible when no carry can reach the cache any more
        // (low < 0xFF000000) or a carry just happened (low > 0xFFFFFFFF).
        if self.low < 0xFF00_0000 || self.low > 0xFFFF_FFFF {
            let carry = (self.low >> 32) as u8;
            let mut tmp = self.cache;

            loop {
                self.write_byte(tmp.wrapping_add(carry))?;
                tmp = 0xFF; // Subsequent bytes are 0xFF (will become 0x00 if carry)
                self.cache_size -= 1;
                if self.cache_size == 0 {
                    break;
                }
            }

            // New cache is the top byte of the 32-bit low value
            self.cache = (self.low >> 24) as u8;
        }

        self.cache_size += 1;
        self.low = (self.low << 8) & 0xFFFF_FFFF;
        Ok(())
    }

    /// Normalize the range.
    #[inline]
    fn normalize(&mut self) -> Result<()> {
        if self.range < TOP_VALUE {
            self.range <<= 8;
            self.shift_low()?;
        }
        Ok(())
    }

    /// Encode a single bit with the given probability.
    pub fn encode_bit(&mut self, prob: &mut u16, bit: u32) -> Result<()> {
        let bound = (self.range >> PROB_BITS) * (*prob as u32);

        if bit == 0 {
            self.range = bound;
        } else {
            self.low += bound as u64;
            self.range -= bound;
        }
        update_prob(prob, bit);

        self.normalize()
    }

    /// Encode a bit with fixed 50% probability.
    pub fn encode_direct_bit(&mut self, bit: u32) -> Result<()> {
        self.range >>= 1;
        if bit != 0 {
            self.low += self.range as u64;
        }
        self.normalize()
    }

    /// Encode the `count` low bits of `value`, most significant first.
    pub fn encode_direct_bits(&mut self, value: u32, count: u32) -> Result<()> {
        for i in (0..count).rev() {
            self.encode_direct_bit((value >> i) & 1)?;
        }
        Ok(())
    }

    /// Encode a bit tree (normal order, most significant bit first).
    pub fn encode_bit_tree(&mut self, probs: &mut [u16], num_bits: u32, value: u32) -> Result<()> {
        let mut index = 1usize;

        for i in (0..num_bits).rev() {
            let bit = (value >> i) & 1;
            self.encode_bit(&mut probs[index], bit)?;
            index = (index << 1) | bit as usize;
        }
        Ok(())
    }

    /// Encode a bit tree (reverse order, least significant bit first).
    pub fn encode_bit_tree_reverse(
        &mut self,
        probs: &mut [u16],
        num_bits: u32,
        value: u32,
    ) -> Result<()> {
        let mut index = 1usize;

        for i in 0..num_bits {
            let bit = (value >> i) & 1;
            self.encode_bit(&mut probs[index], bit)?;
            index = (index << 1) | bit as usize;
        }
        Ok(())
    }

    /// Flush the pending state: exactly five shifts of `low`.
    pub fn close(&mut self) -> Result<()> {
        self.flushing = true;
        for _ in 0..5 {
            self.shift_low()?;
        }
        Ok(())
    }

    /// Get a reference to the output sink.
    pub fn sink(&self) -> &LimitedSink<W> {
        &self.sink
    }

    /// Get a mutable reference to the output sink.
    pub fn sink_mut(&mut self) -> &mut LimitedSink<W> {
        &mut self.sink
    }

    /// Unwrap the encoder, returning its sink.
    pub fn into_sink(self) -> LimitedSink<W> {
        self.sink
    }
}
