//! LZMA probability models.
//!
//! LZMA uses context-dependent probability models for:
//! - Literal encoding (context = previous byte + position)
//! - Match length encoding
//! - Distance encoding
//! - State machine transitions
//!
//! The models here only hold probabilities and know how to turn a value
//! into a sequence of range-coded decisions; choosing what to encode is the
//! encoder's job.

use crate::range_coder::{PROB_INIT, RangeEncoder};
use oxilzma_core::error::{OxiLzmaError, Result};
use std::io::Write;

/// Number of literal context bits (default: 3).
pub const LC_DEFAULT: u32 = 3;

/// Number of literal position bits (default: 0).
pub const LP_DEFAULT: u32 = 0;

/// Number of position bits (default: 2).
pub const PB_DEFAULT: u32 = 2;

/// Largest valid `lc`.
pub const LC_MAX: u32 = 8;
/// Largest valid `lp`.
pub const LP_MAX: u32 = 4;
/// Largest valid `pb`.
pub const PB_MAX: u32 = 4;

/// Maximum number of position states.
pub const POS_STATES_MAX: usize = 1 << PB_MAX;

/// Number of states in the LZMA state machine.
pub const NUM_STATES: usize = 12;

/// Number of bits for low length coding.
pub const LEN_LOW_BITS: u32 = 3;
/// Number of bits for mid length coding.
pub const LEN_MID_BITS: u32 = 3;
/// Number of bits for high length coding.
pub const LEN_HIGH_BITS: u32 = 8;

/// Number of low length symbols.
pub const LEN_LOW_SYMBOLS: usize = 1 << LEN_LOW_BITS;
/// Number of mid length symbols.
pub const LEN_MID_SYMBOLS: usize = 1 << LEN_MID_BITS;
/// Number of high length symbols.
pub const LEN_HIGH_SYMBOLS: usize = 1 << LEN_HIGH_BITS;

/// Minimum match length.
pub const MATCH_LEN_MIN: usize = 2;

/// Maximum match length.
pub const MATCH_LEN_MAX: usize = MATCH_LEN_MIN + LEN_LOW_SYMBOLS + LEN_MID_SYMBOLS + LEN_HIGH_SYMBOLS - 1;

/// Number of length states used to select a distance slot table.
pub const LEN_STATES: usize = 4;

/// Number of bits of a distance slot.
pub const DIST_SLOT_BITS: u32 = 6;

/// Number of distance slots.
pub const DIST_SLOTS: usize = 1 << DIST_SLOT_BITS;

/// Number of alignment bits for distance encoding.
pub const DIST_ALIGN_BITS: u32 = 4;
/// Size of alignment table.
pub const DIST_ALIGN_SIZE: usize = 1 << DIST_ALIGN_BITS;

/// Number of full distance symbols.
pub const FULL_DISTANCES: usize = 128;

/// First slot whose footer bits are sent directly.
pub const END_POS_MODEL_INDEX: usize = 14;

/// Distance sent as `distance - 1` by the end-of-stream marker.
pub const EOS_DIST: u32 = 0xFFFF_FFFF;

/// LZMA state machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct State(u8);

impl State {
    /// Initial state.
    pub const fn new() -> Self {
        Self(0)
    }

    /// Get state value.
    pub fn value(self) -> usize {
        self.0 as usize
    }

    /// Check if the previous operation was a literal.
    ///
    /// After a match or repeat the next literal is coded against the byte
    /// at `rep[0]`.
    pub fn is_literal(self) -> bool {
        self.0 < 7
    }

    /// Update state after literal.
    pub fn update_literal(&mut self) {
        self.0 = match self.0 {
            0..=3 => 0,
            4..=9 => self.0 - 3,
            _ => self.0 - 6,
        };
    }

    /// Update state after match.
    pub fn update_match(&mut self) {
        self.0 = if self.0 < 7 { 7 } else { 10 };
    }

    /// Update state after short rep.
    pub fn update_short_rep(&mut self) {
        self.0 = if self.0 < 7 { 9 } else { 11 };
    }

    /// Update state after long rep.
    pub fn update_long_rep(&mut self) {
        self.0 = if self.0 < 7 { 8 } else { 11 };
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

/// LZMA properties (lc, lp, pb).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LzmaProperties {
    /// Literal context bits.
    pub lc: u32,
    /// Literal position bits.
    pub lp: u32,
    /// Position bits.
    pub pb: u32,
}

impl LzmaProperties {
    /// Create new properties.
    pub fn new(lc: u32, lp: u32, pb: u32) -> Self {
        Self { lc, lp, pb }
    }

    /// Check that every value is within its documented bound.
    pub fn verify(&self) -> Result<()> {
        if self.lc > LC_MAX {
            return Err(OxiLzmaError::invalid_config(format!(
                "lc {} out of range [0, {LC_MAX}]",
                self.lc
            )));
        }
        if self.lp > LP_MAX {
            return Err(OxiLzmaError::invalid_config(format!(
                "lp {} out of range [0, {LP_MAX}]",
                self.lp
            )));
        }
        if self.pb > PB_MAX {
            return Err(OxiLzmaError::invalid_config(format!(
                "pb {} out of range [0, {PB_MAX}]",
                self.pb
            )));
        }
        Ok(())
    }

    /// Parse from property byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        let pb = byte as u32 / 45;
        let remaining = byte as u32 - pb * 45;
        let lp = remaining / 9;
        let lc = remaining - lp * 9;

        if lc > LC_MAX || lp > LP_MAX || pb > PB_MAX {
            return None;
        }

        Some(Self { lc, lp, pb })
    }

    /// Encode to property byte.
    pub fn to_byte(&self) -> u8 {
        ((self.pb * 45) + (self.lp * 9) + self.lc) as u8
    }

    /// Get number of literal states.
    pub fn num_lit_states(&self) -> usize {
        1 << (self.lc + self.lp)
    }

    /// Get number of position states.
    pub fn num_pos_states(&self) -> usize {
        1 << self.pb
    }

    /// Position state of stream position `pos`.
    #[inline]
    pub fn pos_state(&self, pos: u64) -> usize {
        (pos & ((1u64 << self.pb) - 1)) as usize
    }

    /// Literal state from the stream position and the previous byte.
    #[inline]
    pub fn lit_state(&self, pos: u64, prev_byte: u8) -> usize {
        let lit_pos = (pos & ((1u64 << self.lp) - 1)) as usize;
        let prev_bits = (prev_byte as usize) >> (8 - self.lc);
        (lit_pos << self.lc) | prev_bits
    }
}

impl Default for LzmaProperties {
    fn default() -> Self {
        Self {
            lc: LC_DEFAULT,
            lp: LP_DEFAULT,
            pb: PB_DEFAULT,
        }
    }
}

/// Length encoder model.
#[derive(Debug, Clone)]
pub struct LengthModel {
    /// Choice bit (low vs mid+high).
    pub choice: u16,
    /// Choice2 bit (mid vs high).
    pub choice2: u16,
    /// Low length probabilities (per position state).
    pub low: Vec<[u16; LEN_LOW_SYMBOLS]>,
    /// Mid length probabilities (per position state).
    pub mid: Vec<[u16; LEN_MID_SYMBOLS]>,
    /// High length probabilities (shared).
    pub high: [u16; LEN_HIGH_SYMBOLS],
}

impl LengthModel {
    /// Create a new length model.
    pub fn new(num_pos_states: usize) -> Self {
        Self {
            choice: PROB_INIT,
            choice2: PROB_INIT,
            low: vec![[PROB_INIT; LEN_LOW_SYMBOLS]; num_pos_states],
            mid: vec![[PROB_INIT; LEN_MID_SYMBOLS]; num_pos_states],
            high: [PROB_INIT; LEN_HIGH_SYMBOLS],
        }
    }

    /// Reset the model.
    pub fn reset(&mut self) {
        self.choice = PROB_INIT;
        self.choice2 = PROB_INIT;
        for arr in &mut self.low {
            arr.fill(PROB_INIT);
        }
        for arr in &mut self.mid {
            arr.fill(PROB_INIT);
        }
        self.high.fill(PROB_INIT);
    }

    /// Encode a match length in `MATCH_LEN_MIN..=MATCH_LEN_MAX`.
    pub fn encode<W: Write>(
        &mut self,
        rc: &mut RangeEncoder<W>,
        len: usize,
        pos_state: usize,
    ) -> Result<()> {
        debug_assert!((MATCH_LEN_MIN..=MATCH_LEN_MAX).contains(&len));
        let len = (len - MATCH_LEN_MIN) as u32;

        if len < LEN_LOW_SYMBOLS as u32 {
            rc.encode_bit(&mut self.choice, 0)?;
            rc.encode_bit_tree(&mut self.low[pos_state], LEN_LOW_BITS, len)
        } else if len < (LEN_LOW_SYMBOLS + LEN_MID_SYMBOLS) as u32 {
            rc.encode_bit(&mut self.choice, 1)?;
            rc.encode_bit(&mut self.choice2, 0)?;
            rc.encode_bit_tree(
                &mut self.mid[pos_state],
                LEN_MID_BITS,
                len - LEN_LOW_SYMBOLS as u32,
            )
        } else {
            rc.encode_bit(&mut self.choice, 1)?;
            rc.encode_bit(&mut self.choice2, 1)?;
            rc.encode_bit_tree(
                &mut self.high,
                LEN_HIGH_BITS,
                len - (LEN_LOW_SYMBOLS + LEN_MID_SYMBOLS) as u32,
            )
        }
    }
}

/// Literal encoder model.
#[derive(Debug, Clone)]
pub struct LiteralModel {
    /// Probability table for each literal state.
    ///
    /// The first 0x100 entries form the plain bit tree; the remaining 0x200
    /// are used while coding against a match byte.
    pub probs: Vec<[u16; 0x300]>,
}

impl LiteralModel {
    /// Create a new literal model.
    pub fn new(num_lit_states: usize) -> Self {
        Self {
            probs: vec![[PROB_INIT; 0x300]; num_lit_states],
        }
    }

    /// Reset the model.
    pub fn reset(&mut self) {
        for state in &mut self.probs {
            state.fill(PROB_INIT);
        }
    }

    /// Encode `byte`.
    ///
    /// With `match_byte` set, bits are coded against the corresponding bits
    /// of the match byte until the first difference, then plainly.
    pub fn encode<W: Write>(
        &mut self,
        rc: &mut RangeEncoder<W>,
        byte: u8,
        lit_state: usize,
        match_byte: Option<u8>,
    ) -> Result<()> {
        let probs = &mut self.probs[lit_state];
        let mut symbol = (byte as usize) | 0x100;
        let mut context = 1usize;

        if let Some(match_byte) = match_byte {
            let mut match_symbol = (match_byte as usize) << 1;

            loop {
                let match_bit = (match_symbol >> 8) & 1;
                match_symbol <<= 1;

                let bit = (symbol >> 7) & 1;
                symbol <<= 1;

                let prob_idx = 0x100 + (match_bit << 8) + context;
                rc.encode_bit(&mut probs[prob_idx], bit as u32)?;
                context = (context << 1) | bit;

                if context >= 0x100 || bit != match_bit {
                    break;
                }
            }
        }

        while context < 0x100 {
            let bit = (symbol >> 7) & 1;
            symbol <<= 1;
            rc.encode_bit(&mut probs[context], bit as u32)?;
            context = (context << 1) | bit;
        }
        Ok(())
    }
}

/// Get distance slot of a zero-based distance.
pub fn dist_slot(dist: u32) -> u32 {
    if dist < 4 {
        return dist;
    }

    let bits = 32 - dist.leading_zeros();
    ((bits - 1) << 1) | ((dist >> (bits - 2)) & 1)
}

/// Distance model.
#[derive(Debug, Clone)]
pub struct DistanceModel {
    /// Distance slot probabilities (per length state).
    pub slot: [[u16; DIST_SLOTS]; LEN_STATES],
    /// Reverse bit trees for the footers of slots 4-13, packed back to back.
    pub special: [u16; FULL_DISTANCES - END_POS_MODEL_INDEX],
    /// Alignment probabilities.
    pub align: [u16; DIST_ALIGN_SIZE],
}

impl DistanceModel {
    /// Create a new distance model.
    pub fn new() -> Self {
        Self {
            slot: [[PROB_INIT; DIST_SLOTS]; LEN_STATES],
            special: [PROB_INIT; FULL_DISTANCES - END_POS_MODEL_INDEX],
            align: [PROB_INIT; DIST_ALIGN_SIZE],
        }
    }

    /// Reset the model.
    pub fn reset(&mut self) {
        for s in &mut self.slot {
            s.fill(PROB_INIT);
        }
        self.special.fill(PROB_INIT);
        self.align.fill(PROB_INIT);
    }

    /// Index in `special` of the root node of the reverse tree for `slot`.
    ///
    /// Node `m` (starting at 1) of slot `s` lives at `base(s) - s - 1 + m`,
    /// so the trees of consecutive slots are packed without overlap.
    #[inline]
    pub fn special_start(slot: u32) -> usize {
        let footer_bits = (slot >> 1) - 1;
        let base = (2 | (slot & 1)) << footer_bits;
        (base - slot) as usize
    }

    /// Encode a zero-based distance for a match of length `len`.
    pub fn encode<W: Write>(
        &mut self,
        rc: &mut RangeEncoder<W>,
        dist: u32,
        len: usize,
    ) -> Result<()> {
        let len_state = (len - MATCH_LEN_MIN).min(LEN_STATES - 1);
        let slot = dist_slot(dist);

        rc.encode_bit_tree(&mut self.slot[len_state], DIST_SLOT_BITS, slot)?;

        if slot < 4 {
            return Ok(());
        }

        let footer_bits = (slot >> 1) - 1;
        let base = (2 | (slot & 1)) << footer_bits;
        let reduced = dist - base;

        if slot < END_POS_MODEL_INDEX as u32 {
            // Reverse bit tree over the flat array
            let start = Self::special_start(slot);
            let mut m = 1usize;
            for i in 0..footer_bits {
                let bit = (reduced >> i) & 1;
                rc.encode_bit(&mut self.special[start + m - 1], bit)?;
                m = (m << 1) | bit as usize;
            }
            Ok(())
        } else {
            rc.encode_direct_bits(reduced >> DIST_ALIGN_BITS, footer_bits - DIST_ALIGN_BITS)?;
            rc.encode_bit_tree_reverse(
                &mut self.align,
                DIST_ALIGN_BITS,
                reduced & ((1 << DIST_ALIGN_BITS) - 1),
            )
        }
    }
}

impl Default for DistanceModel {
    fn default() -> Self {
        Self::new()
    }
}

/// Complete LZMA model containing all probability tables.
#[derive(Debug, Clone)]
pub struct LzmaModel {
    /// LZMA properties.
    pub props: LzmaProperties,

    /// Is-match probabilities.
    pub is_match: [[u16; POS_STATES_MAX]; NUM_STATES],
    /// Is-rep probabilities.
    pub is_rep: [u16; NUM_STATES],
    /// Is-rep0 probabilities.
    pub is_rep0: [u16; NUM_STATES],
    /// Is-rep1 probabilities.
    pub is_rep1: [u16; NUM_STATES],
    /// Is-rep2 probabilities.
    pub is_rep2: [u16; NUM_STATES],
    /// Is-rep0-long probabilities.
    pub is_rep0_long: [[u16; POS_STATES_MAX]; NUM_STATES],

    /// Match length model.
    pub match_len: LengthModel,
    /// Rep match length model.
    pub rep_len: LengthModel,

    /// Literal model.
    pub literal: LiteralModel,

    /// Distance model.
    pub distance: DistanceModel,
}

impl LzmaModel {
    /// Create a new LZMA model with the given properties.
    pub fn new(props: LzmaProperties) -> Self {
        let num_pos_states = props.num_pos_states();
        let num_lit_states = props.num_lit_states();

        Self {
            props,
            is_match: [[PROB_INIT; POS_STATES_MAX]; NUM_STATES],
            is_rep: [PROB_INIT; NUM_STATES],
            is_rep0: [PROB_INIT; NUM_STATES],
            is_rep1: [PROB_INIT; NUM_STATES],
            is_rep2: [PROB_INIT; NUM_STATES],
            is_rep0_long: [[PROB_INIT; POS_STATES_MAX]; NUM_STATES],
            match_len: LengthModel::new(num_pos_states),
            rep_len: LengthModel::new(num_pos_states),
            literal: LiteralModel::new(num_lit_states),
            distance: DistanceModel::new(),
        }
    }

    /// Reset all probabilities to initial values.
    pub fn reset(&mut self) {
        for state in &mut self.is_match {
            state.fill(PROB_INIT);
        }
        self.is_rep.fill(PROB_INIT);
        self.is_rep0.fill(PROB_INIT);
        self.is_rep1.fill(PROB_INIT);
        self.is_rep2.fill(PROB_INIT);
        for state in &mut self.is_rep0_long {
            state.fill(PROB_INIT);
        }
        self.match_len.reset();
        self.rep_len.reset();
        self.literal.reset();
        self.distance.reset();
    }
}
