//! Rolling hash over a short byte window.
//!
//! [`CyclicPoly`] is a cyclic polynomial ("buzhash") roller: every byte is
//! mapped to a random 64-bit word and the hash of a window is the XOR of
//! those words, each rotated by its distance from the newest byte. Adding a
//! byte and dropping the oldest one costs two rotations and two XORs, so a
//! match finder can keep a hash of the most recent bytes up to date one byte
//! at a time.

/// Largest supported window length.
pub const MAX_WINDOW: usize = 4;

/// SplitMix64 step, used to fill the substitution table at compile time.
const fn splitmix64(state: u64) -> (u64, u64) {
    let state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    (state, z ^ (z >> 31))
}

const fn build_table() -> [u64; 256] {
    let mut table = [0u64; 256];
    let mut state = 0x6C7A_6D61_u64;
    let mut i = 0;
    while i < 256 {
        let (next, value) = splitmix64(state);
        state = next;
        table[i] = value;
        i += 1;
    }
    table
}

/// Byte substitution table.
static TABLE: [u64; 256] = build_table();

/// Cyclic polynomial rolling hash over the last `n` bytes.
#[derive(Debug, Clone)]
pub struct CyclicPoly {
    /// Window bytes; `window[pos]` is the oldest.
    window: [u8; MAX_WINDOW],
    /// Window length.
    n: usize,
    /// Ring position of the oldest byte.
    pos: usize,
    /// Current hash value.
    h: u64,
}

impl CyclicPoly {
    /// Create a roller for windows of `n` bytes.
    ///
    /// The window starts out filled with zero bytes, so the hash always
    /// depends on exactly the last `n` bytes rolled in.
    ///
    /// # Panics
    ///
    /// Panics if `n` is not in `1..=4`.
    pub fn new(n: usize) -> Self {
        assert!(
            (1..=MAX_WINDOW).contains(&n),
            "window length {n} out of range"
        );
        let mut h = 0u64;
        for _ in 0..n {
            h = h.rotate_left(1) ^ TABLE[0];
        }
        Self {
            window: [0; MAX_WINDOW],
            n,
            pos: 0,
            h,
        }
    }

    /// Window length.
    pub fn len(&self) -> usize {
        self.n
    }

    /// Always false; a roller window holds at least one byte.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Current hash value.
    pub fn hash(&self) -> u64 {
        self.h
    }

    /// Shift `byte` into the window and return the new hash.
    #[inline]
    pub fn roll_byte(&mut self, byte: u8) -> u64 {
        let out = self.window[self.pos];
        self.window[self.pos] = byte;
        self.pos = if self.pos + 1 == self.n { 0 } else { self.pos + 1 };

        self.h = self.h.rotate_left(1)
            ^ TABLE[out as usize].rotate_left(self.n as u32)
            ^ TABLE[byte as usize];
        self.h
    }

    /// Roll every byte of `p` and return the final hash.
    pub fn roll(&mut self, p: &[u8]) -> u64 {
        for &b in p {
            self.roll_byte(b);
        }
        self.h
    }
}

/// Hash of the window `p` computed from scratch.
pub fn cyclic_poly_hash(p: &[u8]) -> u64 {
    p.iter()
        .fold(0u64, |h, &b| h.rotate_left(1) ^ TABLE[b as usize])
}
