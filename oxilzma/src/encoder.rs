//! LZMA compression.
//!
//! The [`Encoder`] drives the pipeline: input is admitted into the
//! [`EncoderDict`], the match finder proposes one operation at a time, the
//! state machine turns each operation into range-coded decisions, and the
//! dictionary discards the bytes the operation covered.
//!
//! Compression is greedy: whatever the match finder proposes is emitted.
//! Unless the stream is being closed, at least `MATCH_LEN_MAX - 1` bytes stay
//! pending so the match finder always sees a full-length lookahead.

use crate::dict::EncoderDict;
use crate::matcher::MatchFinder;
use crate::model::{EOS_DIST, LzmaModel, LzmaProperties, MATCH_LEN_MAX, MATCH_LEN_MIN, State};
use crate::operation::{Operation, is_valid_match};
use crate::range_coder::RangeEncoder;
use oxilzma_core::error::{OxiLzmaError, Result};
use oxilzma_core::sink::LimitedSink;
use std::io::Write;

/// Output bytes that must remain available before an operation is coded.
///
/// No single operation produces more, so a bounded output fails at an
/// operation boundary and never in the middle of one.
pub const OP_LEN_MARGIN: i64 = 16;

/// Extra margin kept for the end-of-stream marker.
pub const EOS_MARGIN: i64 = 5;

/// LZMA stream encoder.
#[derive(Debug)]
pub struct Encoder<W: Write, M: MatchFinder> {
    dict: EncoderDict<M>,
    model: LzmaModel,
    state: State,
    /// Most recent distances, zero-based.
    rep: [u32; 4],
    rc: RangeEncoder<W>,
    /// Dictionary position when the encoder was created.
    start: u64,
    marker: bool,
    margin: i64,
}

impl<W: Write, M: MatchFinder> Encoder<W, M> {
    /// Create an encoder writing range-coded data to `sink`.
    ///
    /// With `eos_marker` set, closing the encoder appends the end-of-stream
    /// marker.
    pub fn new(
        sink: LimitedSink<W>,
        props: LzmaProperties,
        dict: EncoderDict<M>,
        eos_marker: bool,
    ) -> Result<Self> {
        props.verify()?;

        let margin = if eos_marker {
            OP_LEN_MARGIN + EOS_MARGIN
        } else {
            OP_LEN_MARGIN
        };
        Ok(Self {
            start: dict.pos(),
            dict,
            model: LzmaModel::new(props),
            state: State::new(),
            rep: [0; 4],
            rc: RangeEncoder::new(sink),
            marker: eos_marker,
            margin,
        })
    }

    /// Admit all of `p`, compressing whenever the lookahead fills up.
    ///
    /// If the output limit stops compression after some bytes of `p` were
    /// admitted, their count is returned and the next call reports
    /// [`OxiLzmaError::LimitReached`].
    pub fn write(&mut self, p: &[u8]) -> Result<usize> {
        let mut n = 0;
        loop {
            n += self.dict.write(&p[n..]);
            if n == p.len() {
                return Ok(n);
            }
            match self.compress(false) {
                Ok(()) => {}
                Err(e) if e.is_limit() && n > 0 => return Ok(n),
                Err(e) => return Err(e),
            }
        }
    }

    fn write_literal(&mut self, byte: u8) -> Result<()> {
        let props = self.model.props;
        let pos = self.dict.pos();
        let pos_state = props.pos_state(pos);
        let s = self.state.value();

        self.rc
            .encode_bit(&mut self.model.is_match[s][pos_state], 0)?;

        let lit_state = props.lit_state(pos, self.dict.byte_at(1));
        let match_byte = if self.state.is_literal() {
            None
        } else {
            Some(self.dict.byte_at(self.rep[0] as usize + 1))
        };
        self.model
            .literal
            .encode(&mut self.rc, byte, lit_state, match_byte)?;

        self.state.update_literal();
        Ok(())
    }

    /// Code a match, a repeated distance or a short repeat.
    ///
    /// # Panics
    ///
    /// Panics if the match cannot be encoded: distance outside
    /// `1..=2^32`, length outside `2..=273`, or a 1-byte match that does
    /// not repeat `rep[0]`.
    fn write_match(&mut self, distance: u64, len: usize) -> Result<()> {
        assert!(
            is_valid_match(distance, len, self.rep[0]),
            "invalid match: distance {distance} length {len} rep0 {}",
            self.rep[0]
        );
        let dist = (distance - 1) as u32;

        let pos_state = self.model.props.pos_state(self.dict.pos());
        let s = self.state.value();

        self.rc
            .encode_bit(&mut self.model.is_match[s][pos_state], 1)?;

        let g = self.rep.iter().position(|&r| r == dist);
        self.rc
            .encode_bit(&mut self.model.is_rep[s], u32::from(g.is_some()))?;

        let Some(g) = g else {
            // new distance
            self.rep = [dist, self.rep[0], self.rep[1], self.rep[2]];
            self.state.update_match();
            self.model
                .match_len
                .encode(&mut self.rc, len, pos_state)?;
            return self.model.distance.encode(&mut self.rc, dist, len);
        };

        self.rc
            .encode_bit(&mut self.model.is_rep0[s], u32::from(g != 0))?;
        if g == 0 {
            self.rc
                .encode_bit(&mut self.model.is_rep0_long[s][pos_state], u32::from(len != 1))?;
            if len == 1 {
                self.state.update_short_rep();
                return Ok(());
            }
        } else {
            self.rc
                .encode_bit(&mut self.model.is_rep1[s], u32::from(g != 1))?;
            if g != 1 {
                self.rc
                    .encode_bit(&mut self.model.is_rep2[s], u32::from(g != 2))?;
            }
            // move the used distance to the front
            self.rep[..=g].rotate_right(1);
        }

        self.state.update_long_rep();
        self.model.rep_len.encode(&mut self.rc, len, pos_state)
    }

    fn write_op(&mut self, op: Operation) -> Result<()> {
        if self.rc.available() < self.margin {
            return Err(OxiLzmaError::LimitReached);
        }
        match op {
            Operation::Literal(b) => self.write_literal(b),
            Operation::Match { distance, len } => self.write_match(distance, len),
        }
    }

    /// Encode pending bytes.
    ///
    /// Without `all`, `MATCH_LEN_MAX - 1` bytes stay pending.
    pub fn compress(&mut self, all: bool) -> Result<()> {
        let keep = if all { 0 } else { MATCH_LEN_MAX - 1 };
        while self.dict.buffered() > keep {
            let op = self.dict.next_op(&self.rep);
            self.write_op(op)?;
            self.dict.discard(op.len());
        }
        Ok(())
    }

    /// Encode everything pending, add the end marker if configured and
    /// flush the range encoder.
    ///
    /// If the output limit stops compression early, the marker and the
    /// flush are still attempted so the output ends cleanly where possible;
    /// the result is [`OxiLzmaError::LimitReached`] either way.
    pub fn close(&mut self) -> Result<()> {
        let mut limited = false;

        match self.compress(true) {
            Ok(()) => {}
            Err(e) if e.is_limit() => {
                log::warn!(
                    "output limit reached with {} bytes left uncompressed",
                    self.dict.buffered()
                );
                limited = true;
            }
            Err(e) => return Err(e),
        }

        if self.marker {
            match self.write_match(EOS_DIST as u64 + 1, MATCH_LEN_MIN) {
                Ok(()) => {}
                Err(e) if e.is_limit() => limited = true,
                Err(e) => return Err(e),
            }
        }

        match self.rc.close() {
            Ok(()) => {}
            Err(e) if e.is_limit() => limited = true,
            Err(e) => return Err(e),
        }

        if limited {
            Err(OxiLzmaError::LimitReached)
        } else {
            Ok(())
        }
    }

    /// Number of input bytes encoded so far.
    pub fn compressed(&self) -> u64 {
        self.dict.pos() - self.start
    }

    /// Number of input bytes admitted but not yet encoded.
    pub fn buffered(&self) -> usize {
        self.dict.buffered()
    }

    /// Whether the end marker is written on close.
    pub fn eos_marker(&self) -> bool {
        self.marker
    }

    /// Get a reference to the output sink.
    pub fn sink(&self) -> &LimitedSink<W> {
        self.rc.sink()
    }

    /// Get a mutable reference to the output sink.
    pub fn sink_mut(&mut self) -> &mut LimitedSink<W> {
        self.rc.sink_mut()
    }

    /// Unwrap the encoder, returning the output sink.
    pub fn into_sink(self) -> LimitedSink<W> {
        self.rc.into_sink()
    }
}
