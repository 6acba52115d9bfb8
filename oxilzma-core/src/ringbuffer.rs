//! Ring buffer (sliding window) for LZ77-style compression.
//!
//! The buffer holds two regions back to back: bytes that were written but
//! not yet read (the lookahead) and, behind the read cursor, bytes that were
//! already read. The latter stay physically present until new writes reuse
//! their slots, which is what lets an encoder dictionary use them as match
//! history.
//!
//! The backing array is one slot larger than the usable size so that
//! `front == rear` always means "empty" and never "full".

/// A circular byte buffer with separate write (`front`) and read (`rear`)
/// cursors.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    /// Backing storage, `capacity + 1` bytes.
    data: Vec<u8>,
    /// Write cursor: the next written byte lands here.
    front: usize,
    /// Read cursor: the oldest buffered byte.
    rear: usize,
}

impl RingBuffer {
    /// Create a new ring buffer that can buffer up to `size` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "Ring buffer size must be greater than 0");

        Self {
            data: vec![0; size + 1],
            front: 0,
            rear: 0,
        }
    }

    /// Get the number of bytes the buffer can hold.
    pub fn capacity(&self) -> usize {
        self.data.len() - 1
    }

    /// Number of bytes written but not yet read.
    pub fn buffered(&self) -> usize {
        if self.front >= self.rear {
            self.front - self.rear
        } else {
            self.front + self.data.len() - self.rear
        }
    }

    /// Number of bytes that can be written before the buffer is full.
    pub fn available(&self) -> usize {
        self.capacity() - self.buffered()
    }

    /// Check if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.front == self.rear
    }

    /// Advance index `i` by `n` positions, wrapping around the backing array.
    #[inline]
    fn add_index(&self, i: usize, n: usize) -> usize {
        let i = i + n;
        if i >= self.data.len() {
            i - self.data.len()
        } else {
            i
        }
    }

    /// Append bytes from `p`.
    ///
    /// Writes as many bytes as fit and returns that count. A return value
    /// smaller than `p.len()` means the buffer ran out of space; the caller
    /// has to read (consume) bytes before writing the rest.
    pub fn write(&mut self, p: &[u8]) -> usize {
        let n = p.len().min(self.available());
        let p = &p[..n];

        let first = (self.data.len() - self.front).min(n);
        self.data[self.front..self.front + first].copy_from_slice(&p[..first]);
        if first < n {
            self.data[..n - first].copy_from_slice(&p[first..]);
        }

        self.front = self.add_index(self.front, n);
        n
    }

    /// Copy the oldest buffered bytes into `p` without consuming them.
    ///
    /// Returns the number of bytes copied, which is `p.len()` or
    /// [`buffered`](Self::buffered), whichever is smaller.
    pub fn peek(&self, p: &mut [u8]) -> usize {
        let n = p.len().min(self.buffered());

        let first = (self.data.len() - self.rear).min(n);
        p[..first].copy_from_slice(&self.data[self.rear..self.rear + first]);
        if first < n {
            p[first..n].copy_from_slice(&self.data[..n - first]);
        }

        n
    }

    /// Copy the oldest buffered bytes into `p` and consume them.
    pub fn read(&mut self, p: &mut [u8]) -> usize {
        let n = self.peek(p);
        self.rear = self.add_index(self.rear, n);
        n
    }

    /// Index of the byte `distance` positions behind the read cursor.
    #[inline]
    fn index_behind(&self, distance: usize) -> usize {
        debug_assert!(distance <= self.capacity(), "distance {distance} too large");
        if distance <= self.rear {
            self.rear - distance
        } else {
            self.rear + self.data.len() - distance
        }
    }

    /// Byte located `distance` positions behind the read cursor, shifted
    /// forward by `offset`.
    ///
    /// `byte_behind(d, 0)` is the byte a match at distance `d` starts with;
    /// `byte_behind(d, k)` is the `k`-th byte of that match.
    #[inline]
    pub fn byte_behind(&self, distance: usize, offset: usize) -> u8 {
        let i = self.add_index(self.index_behind(distance), offset % self.data.len());
        self.data[i]
    }

    /// Length of the common prefix of `p` and the bytes starting `distance`
    /// positions behind the read cursor.
    ///
    /// The comparison runs across the circular boundary and may run into the
    /// buffered bytes themselves, so overlapping matches (length larger than
    /// distance) are measured correctly. No bytes are copied.
    pub fn match_len(&self, distance: usize, p: &[u8]) -> usize {
        let start = self.index_behind(distance);
        let (tail, head) = (&self.data[start..], &self.data[..start]);

        p.iter()
            .zip(tail.iter().chain(head.iter()))
            .take_while(|(a, b)| a == b)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Simple LCG so window tests are reproducible.
    fn lcg_bytes(seed: u64, len: usize, alphabet: u8) -> Vec<u8> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
                ((state >> 33) % alphabet as u64) as u8
            })
            .collect()
    }

    #[test]
    fn test_ringbuffer_basic() {
        let mut ring = RingBuffer::new(8);
        assert_eq!(ring.capacity(), 8);
        assert!(ring.is_empty());

        assert_eq!(ring.write(b"Hello"), 5);
        assert_eq!(ring.buffered(), 5);
        assert_eq!(ring.available(), 3);

        let mut out = [0u8; 3];
        assert_eq!(ring.peek(&mut out), 3);
        assert_eq!(&out, b"Hel");
        assert_eq!(ring.buffered(), 5);

        assert_eq!(ring.read(&mut out), 3);
        assert_eq!(&out, b"Hel");
        assert_eq!(ring.buffered(), 2);
    }

    #[test]
    fn test_partial_write_when_full() {
        let mut ring = RingBuffer::new(4);
        assert_eq!(ring.write(b"ABCDEF"), 4);
        assert_eq!(ring.available(), 0);
        assert_eq!(ring.write(b"G"), 0);

        let mut out = [0u8; 8];
        assert_eq!(ring.read(&mut out), 4);
        assert_eq!(&out[..4], b"ABCD");
    }

    #[test]
    fn test_wrapping_write_and_read() {
        let mut ring = RingBuffer::new(5);
        let mut out = [0u8; 5];

        ring.write(b"abcd");
        ring.read(&mut out[..3]);
        // front wraps around the backing array here
        assert_eq!(ring.write(b"efgh"), 4);
        assert_eq!(ring.buffered(), 5);

        assert_eq!(ring.read(&mut out), 5);
        assert_eq!(&out, b"defgh");
    }

    #[test]
    fn test_buffered_plus_available_is_capacity() {
        let mut ring = RingBuffer::new(37);
        let input = lcg_bytes(7, 2000, 255);
        let mut scratch = [0u8; 64];
        let mut pos = 0;
        let mut step = 1usize;

        while pos < input.len() {
            let chunk = step % 23;
            let end = (pos + chunk).min(input.len());
            pos += ring.write(&input[pos..end]);
            assert_eq!(ring.buffered() + ring.available(), ring.capacity());

            let take = (step * 7) % 19;
            ring.read(&mut scratch[..take]);
            assert_eq!(ring.buffered() + ring.available(), ring.capacity());
            step += 1;
        }
    }

    #[test]
    fn test_byte_behind() {
        let mut ring = RingBuffer::new(6);
        let mut out = [0u8; 6];
        ring.write(b"xyzUVW");
        ring.read(&mut out[..4]);
        // history: "xyzU", lookahead: "VW"
        assert_eq!(ring.byte_behind(1, 0), b'U');
        assert_eq!(ring.byte_behind(4, 0), b'x');
        assert_eq!(ring.byte_behind(4, 2), b'z');
        assert_eq!(ring.byte_behind(1, 1), b'V');
    }

    #[test]
    fn test_match_len_overlapping() {
        let mut ring = RingBuffer::new(16);
        let mut out = [0u8; 16];
        ring.write(b"ABABABAB");
        ring.read(&mut out[..2]);

        let mut look = [0u8; 16];
        let n = ring.peek(&mut look);
        assert_eq!(ring.match_len(2, &look[..n]), 6);
        assert_eq!(ring.match_len(1, &look[..n]), 0);
    }

    #[test]
    fn test_match_len_equals_naive_prefix() {
        // Sweep many cursor positions so both the history and the lookahead
        // straddle the wrap point of the backing array.
        let cap = 97;
        let mut ring = RingBuffer::new(cap);
        let input = lcg_bytes(42, 5000, 3);
        let mut history: Vec<u8> = Vec::new();
        let mut pos = 0;
        let mut scratch = [0u8; 32];
        let mut look = [0u8; 40];

        while pos + 40 < input.len() {
            let want = 40 - ring.buffered();
            pos += ring.write(&input[pos..pos + want]);
            let n = ring.peek(&mut look);
            assert_eq!(n, 40);
            let lookahead = &look[..n];

            // every slot not holding lookahead still holds history
            for distance in 1..=history.len().min(cap + 1 - n) {
                let start = history.len() - distance;
                let mut full = history[start..].to_vec();
                full.extend_from_slice(lookahead);
                let expected = lookahead
                    .iter()
                    .zip(full.iter())
                    .take_while(|(a, b)| a == b)
                    .count();
                assert_eq!(ring.match_len(distance, lookahead), expected);
            }

            let consumed = ring.read(&mut scratch[..5]);
            history.extend_from_slice(&scratch[..consumed]);
        }
    }
}
