//! Hash-chain match finder.
//!
//! A power-of-two table maps the rolling hash of a 4-byte word to the most
//! recent position where a word with that hash started. A parallel ring of
//! deltas links every position to the previous one in the same bucket, so
//! earlier occurrences can be reached by walking the chain. A delta of 0
//! ends the chain; it is stored whenever the previous position has already
//! left the window.

use super::{Best, MatchFinder, acceptable};
use crate::dict::Window;
use crate::model::MATCH_LEN_MAX;
use crate::operation::Operation;
use oxilzma_core::error::{OxiLzmaError, Result};
use oxilzma_core::hash::{CyclicPoly, MAX_WINDOW};

/// Maximum number of chain positions returned per lookup.
pub const MAX_MATCHES: usize = 16;

/// Distances always checked, whatever the hash table says.
const SHORT_DISTS: usize = 8;

const MIN_TABLE_EXPONENT: u32 = 9;
const MAX_TABLE_EXPONENT: u32 = 20;

/// Hash table exponent for a dictionary of `capacity` bytes.
pub fn table_exponent(capacity: u32) -> u32 {
    (30u32.saturating_sub(capacity.leading_zeros())).clamp(MIN_TABLE_EXPONENT, MAX_TABLE_EXPONENT)
}

/// Hash-chain match finder.
#[derive(Debug)]
pub struct HashChain {
    /// Bucket heads: most recent position plus one, 0 when empty.
    table: Vec<u64>,
    /// Delta to the previous position of the same bucket, indexed by
    /// position modulo capacity.
    deltas: Vec<u32>,
    mask: u64,
    /// Position of the word completed by the last byte written.
    hoff: i64,
    word_len: usize,
    /// Roller fed by written bytes.
    wr: CyclicPoly,
    /// Roller used to hash lookahead words.
    hr: CyclicPoly,
    positions: [u64; MAX_MATCHES],
    lookahead: [u8; MATCH_LEN_MAX],
}

impl HashChain {
    /// Create a hash chain for a dictionary of `capacity` bytes, hashing
    /// words of `word_len` bytes.
    pub fn new(capacity: usize, word_len: usize) -> Result<Self> {
        if capacity == 0 || capacity as u64 > u32::MAX as u64 {
            return Err(OxiLzmaError::invalid_config(format!(
                "hash chain capacity {capacity} out of range"
            )));
        }
        if !(1..=MAX_WINDOW).contains(&word_len) {
            return Err(OxiLzmaError::invalid_config(format!(
                "word length {word_len} out of range [1, {MAX_WINDOW}]"
            )));
        }

        let exp = table_exponent(capacity as u32);
        Ok(Self {
            table: vec![0; 1 << exp],
            deltas: vec![0; capacity],
            mask: (1u64 << exp) - 1,
            hoff: -(word_len as i64),
            word_len,
            wr: CyclicPoly::new(word_len),
            hr: CyclicPoly::new(word_len),
            positions: [0; MAX_MATCHES],
            lookahead: [0; MATCH_LEN_MAX],
        })
    }

    /// Number of table buckets.
    pub fn table_len(&self) -> usize {
        self.table.len()
    }

    /// Number of positions with a stored delta.
    fn buffered(&self) -> usize {
        let n = self.hoff + 1;
        if n <= 0 {
            0
        } else {
            (n as usize).min(self.deltas.len())
        }
    }

    fn put_entry(&mut self, h: u64, pos: i64) {
        if pos < 0 {
            return;
        }
        let pos = pos as u64;
        let i = (h & self.mask) as usize;
        let old = self.table[i];
        self.table[i] = pos + 1;

        let mut delta = 0;
        if old > 0 {
            let d = pos - (old - 1);
            if d <= u32::MAX as u64 && d <= self.buffered() as u64 {
                delta = d as u32;
            }
        }
        let cap = self.deltas.len() as u64;
        self.deltas[(pos % cap) as usize] = delta;
    }

    fn write_byte(&mut self, b: u8) {
        let h = self.wr.roll_byte(b);
        self.hoff += 1;
        self.put_entry(h, self.hoff);
    }

    /// Walk the chain of bucket `h`, filling `self.positions` from the most
    /// recent occurrence backwards. Returns the number of positions found.
    fn get_matches(&mut self, h: u64) -> usize {
        if self.hoff < 0 {
            return 0;
        }
        let buffered = self.buffered() as u64;
        let tail = (self.hoff + 1) as u64 - buffered;
        let cap = self.deltas.len() as u64;

        let head = self.table[(h & self.mask) as usize];
        if head == 0 || head - 1 < tail {
            return 0;
        }
        let mut pos = head - 1;
        let mut n = 0;
        loop {
            self.positions[n] = pos;
            n += 1;
            if n >= MAX_MATCHES {
                return n;
            }
            let delta = self.deltas[(pos % cap) as usize] as u64;
            if delta == 0 || pos - delta < tail {
                return n;
            }
            pos -= delta;
        }
    }

    /// Positions of earlier words hashing like `p`, most recent first.
    ///
    /// # Panics
    ///
    /// Panics if `p` is not exactly one word long.
    pub fn matches(&mut self, p: &[u8]) -> &[u64] {
        assert!(
            p.len() == self.word_len,
            "byte slice must have length {}",
            self.word_len
        );
        let h = self.hr.roll(p);
        let n = self.get_matches(h);
        &self.positions[..n]
    }
}

impl MatchFinder for HashChain {
    fn write(&mut self, p: &[u8]) {
        for &b in p {
            self.write_byte(b);
        }
    }

    fn next_op(&mut self, window: &Window<'_>, rep: &[u32; 4]) -> Operation {
        let n = window.peek(&mut self.lookahead);
        assert!(n > 0, "no data in buffer");

        let mut dists = [0usize; SHORT_DISTS + MAX_MATCHES];
        for (i, d) in dists.iter_mut().take(SHORT_DISTS).enumerate() {
            *d = i + 1;
        }
        let mut count = SHORT_DISTS;

        if n >= self.word_len {
            let word = {
                let mut w = [0u8; MAX_WINDOW];
                w[..self.word_len].copy_from_slice(&self.lookahead[..self.word_len]);
                w
            };
            let head = window.head();
            let word_len = self.word_len;
            for &pos in self.matches(&word[..word_len]) {
                let dist = (head - pos) as usize;
                if dist > SHORT_DISTS {
                    dists[count] = dist;
                    count += 1;
                }
            }
        }

        let data = &self.lookahead[..n];
        let mut best = Best::default();
        for &dist in &dists[..count] {
            if dist > window.dict_len() {
                continue;
            }
            if window.byte_behind(dist, best.len) != data[best.len] {
                continue;
            }
            let len = window.match_len(dist, data);
            if !acceptable(dist, len, rep[0]) {
                continue;
            }
            if len > best.len {
                best = Best {
                    distance: dist,
                    len,
                };
                if len == data.len() {
                    break;
                }
            }
        }

        best.into_op(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::tests::{expand, parse};

    fn lcg_bytes(seed: u64, len: usize, alphabet: u8) -> Vec<u8> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
                b'a' + ((state >> 33) % alphabet as u64) as u8
            })
            .collect()
    }

    #[test]
    fn test_table_exponent() {
        assert_eq!(table_exponent(512), 9);
        assert_eq!(table_exponent(4096), 11);
        assert_eq!(table_exponent(1 << 16), 15);
        assert_eq!(table_exponent(8 << 20), 20);
        assert_eq!(table_exponent(u32::MAX), 20);
        assert_eq!(table_exponent(1), 9);

        let hc = HashChain::new(1 << 16, 4).unwrap();
        assert_eq!(hc.table_len(), 1 << 15);
    }

    #[test]
    fn test_matches_walks_chain_most_recent_first() {
        let mut hc = HashChain::new(4096, 4).unwrap();
        // "WORD" starts at positions 0, 6 and 12
        hc.write(b"WORD..WORD..WORD");
        assert_eq!(hc.matches(b"WORD"), &[12, 6, 0]);
        assert!(hc.matches(b"NONE").is_empty());
    }

    #[test]
    fn test_matches_bounded() {
        let mut hc = HashChain::new(4096, 4).unwrap();
        hc.write(&[b'q'; 100]);
        let found = hc.matches(b"qqqq").to_vec();
        assert_eq!(found.len(), MAX_MATCHES);
        assert_eq!(found[0], 96);
        assert_eq!(found[15], 81);
    }

    #[test]
    fn test_stale_positions_end_chain() {
        let mut hc = HashChain::new(8, 4).unwrap();
        hc.write(b"ABCD");
        hc.write(b"0123456789");
        hc.write(b"ABCD");
        // the first occurrence is more than 8 positions back
        assert_eq!(hc.matches(b"ABCD"), &[14]);
    }

    #[test]
    fn test_parse_reproduces_input() {
        for (seed, alphabet) in [(1, 2), (2, 4), (3, 26)] {
            let input = lcg_bytes(seed, 20_000, alphabet);
            let ops = parse(HashChain::new(4096, 4).unwrap(), 4096, &input);
            assert_eq!(expand(&ops), input);
            for op in &ops {
                if let Operation::Match { distance, .. } = op {
                    assert!(*distance <= 4096);
                }
            }
        }
    }

    #[test]
    fn test_abababab() {
        let ops = parse(HashChain::new(4096, 4).unwrap(), 4096, b"ABABABAB");
        assert_eq!(
            ops,
            vec![
                Operation::Literal(b'A'),
                Operation::Literal(b'B'),
                Operation::new_match(2, 6),
            ]
        );
    }

    #[test]
    fn test_equal_lengths_keep_first_found() {
        // Both distance 5 ("abcdY") and 10 ("abcdX") give a 4-byte match
        // for "abcdZ". Only a strictly longer match replaces the first one
        // found, and the short distances are visited first.
        let ops = parse(HashChain::new(4096, 4).unwrap(), 4096, b"abcdXabcdYabcdZ");
        assert_eq!(ops[5], Operation::new_match(5, 4));
        assert_eq!(ops[7], Operation::new_match(5, 4));
        assert_eq!(ops.len(), 9);
    }

    #[test]
    fn test_short_rep_only_at_rep0() {
        // a 1-byte match at distance 2 is refused while rep0 is distance 1
        let ops = parse(HashChain::new(4096, 4).unwrap(), 4096, b"xyx");
        assert_eq!(
            ops,
            vec![
                Operation::Literal(b'x'),
                Operation::Literal(b'y'),
                Operation::Literal(b'x'),
            ]
        );

        // distance 1 is rep0 at stream start, so a short rep is allowed
        let ops = parse(HashChain::new(4096, 4).unwrap(), 4096, b"aa");
        assert_eq!(ops, vec![Operation::Literal(b'a'), Operation::new_match(1, 1)]);
    }

    #[test]
    fn test_invalid_params() {
        assert!(HashChain::new(0, 4).is_err());
        assert!(HashChain::new(4096, 0).is_err());
        assert!(HashChain::new(4096, 5).is_err());
    }
}
