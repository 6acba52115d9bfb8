//! `.lzma` stream writer.
//!
//! [`LzmaWriter`] writes the 13-byte header followed by the compressed
//! stream. It implements [`std::io::Write`]; call [`LzmaWriter::finish`] to
//! terminate the stream and get the inner writer back.

use crate::dict::EncoderDict;
use crate::encoder::Encoder;
use crate::header::{Header, MIN_DICT_CAP};
use crate::matcher::{BinaryTree, HashChain, MatchAlgorithm};
use crate::model::{LzmaProperties, MATCH_LEN_MAX};
use oxilzma_core::error::{OxiLzmaError, Result};
use oxilzma_core::sink::LimitedSink;
use std::fmt;
use std::io::{self, BufWriter, Write};

/// Default dictionary capacity (8 MiB).
pub const DEFAULT_DICT_CAP: usize = 8 << 20;

/// Default lookahead buffer size.
pub const DEFAULT_BUF_SIZE: usize = 4096;

/// Largest dictionary capacity.
pub const MAX_DICT_CAP: usize = u32::MAX as usize;

/// Word length hashed by the hash-chain match finder.
const HASH_WORD_LEN: usize = 4;

/// Writer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriterConfig {
    /// Literal and position properties.
    pub properties: LzmaProperties,
    /// Dictionary capacity in bytes.
    pub dict_cap: usize,
    /// Lookahead buffer size in bytes.
    pub buf_size: usize,
    /// Match finding algorithm.
    pub matcher: MatchAlgorithm,
    /// Uncompressed size to declare in the header.
    pub size: Option<u64>,
    /// Terminate the stream with the end marker.
    ///
    /// Forced on without a declared size and off with one.
    pub eos_marker: bool,
    /// Limit on the total output, header included.
    pub output_limit: Option<u64>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            properties: LzmaProperties::default(),
            dict_cap: DEFAULT_DICT_CAP,
            buf_size: DEFAULT_BUF_SIZE,
            matcher: MatchAlgorithm::default(),
            size: None,
            eos_marker: true,
            output_limit: None,
        }
    }
}

impl WriterConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set literal and position properties.
    pub fn with_properties(mut self, properties: LzmaProperties) -> Self {
        self.properties = properties;
        self
    }

    /// Set the dictionary capacity.
    pub fn with_dict_cap(mut self, dict_cap: usize) -> Self {
        self.dict_cap = dict_cap;
        self
    }

    /// Set the lookahead buffer size.
    pub fn with_buf_size(mut self, buf_size: usize) -> Self {
        self.buf_size = buf_size;
        self
    }

    /// Set the match finding algorithm.
    pub fn with_matcher(mut self, matcher: MatchAlgorithm) -> Self {
        self.matcher = matcher;
        self
    }

    /// Declare the uncompressed size in the header.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Request the end marker.
    pub fn with_eos_marker(mut self, eos_marker: bool) -> Self {
        self.eos_marker = eos_marker;
        self
    }

    /// Bound the total output.
    pub fn with_output_limit(mut self, limit: u64) -> Self {
        self.output_limit = Some(limit);
        self
    }

    /// Check every value against its bounds.
    pub fn verify(&self) -> Result<()> {
        self.properties.verify()?;
        if self.dict_cap < MIN_DICT_CAP as usize || self.dict_cap > MAX_DICT_CAP {
            return Err(OxiLzmaError::invalid_config(format!(
                "dictionary capacity {} out of range [{MIN_DICT_CAP}, {MAX_DICT_CAP}]",
                self.dict_cap
            )));
        }
        if self.buf_size < MATCH_LEN_MAX {
            return Err(OxiLzmaError::invalid_config(format!(
                "buffer size {} below {MATCH_LEN_MAX}",
                self.buf_size
            )));
        }
        if self.size == Some(u64::MAX) {
            return Err(OxiLzmaError::invalid_config(
                "declared size collides with the unknown-size marker",
            ));
        }
        Ok(())
    }

    /// Resolve the end marker from the size declaration.
    fn normalized(mut self) -> Self {
        let eos_marker = self.size.is_none();
        if eos_marker != self.eos_marker {
            log::debug!(
                "end marker {} because size is {}",
                if eos_marker { "enabled" } else { "disabled" },
                if eos_marker { "not declared" } else { "declared" }
            );
            self.eos_marker = eos_marker;
        }
        self
    }

    fn header(&self) -> Header {
        Header {
            properties: self.properties,
            dict_cap: self.dict_cap as u32,
            size: self.size,
        }
    }
}

/// The encoder with its match finder fixed at construction.
enum Engine<W: Write> {
    HashChain(Encoder<W, HashChain>),
    BinaryTree(Encoder<W, BinaryTree>),
}

impl<W: Write> Engine<W> {
    fn new(sink: LimitedSink<W>, config: &WriterConfig) -> Result<Self> {
        let props = config.properties;
        let marker = config.eos_marker;
        Ok(match config.matcher {
            MatchAlgorithm::HashChain4 => {
                let matcher = HashChain::new(config.dict_cap, HASH_WORD_LEN)?;
                let dict = EncoderDict::new(config.dict_cap, config.buf_size, matcher)?;
                Self::HashChain(Encoder::new(sink, props, dict, marker)?)
            }
            MatchAlgorithm::BinaryTree => {
                let matcher = BinaryTree::new(config.dict_cap)?;
                let dict = EncoderDict::new(config.dict_cap, config.buf_size, matcher)?;
                Self::BinaryTree(Encoder::new(sink, props, dict, marker)?)
            }
        })
    }

    fn write(&mut self, p: &[u8]) -> Result<usize> {
        match self {
            Self::HashChain(e) => e.write(p),
            Self::BinaryTree(e) => e.write(p),
        }
    }

    fn close(&mut self) -> Result<()> {
        match self {
            Self::HashChain(e) => e.close(),
            Self::BinaryTree(e) => e.close(),
        }
    }

    fn compressed(&self) -> u64 {
        match self {
            Self::HashChain(e) => e.compressed(),
            Self::BinaryTree(e) => e.compressed(),
        }
    }

    fn buffered(&self) -> usize {
        match self {
            Self::HashChain(e) => e.buffered(),
            Self::BinaryTree(e) => e.buffered(),
        }
    }

    fn sink(&self) -> &LimitedSink<W> {
        match self {
            Self::HashChain(e) => e.sink(),
            Self::BinaryTree(e) => e.sink(),
        }
    }

    fn sink_mut(&mut self) -> &mut LimitedSink<W> {
        match self {
            Self::HashChain(e) => e.sink_mut(),
            Self::BinaryTree(e) => e.sink_mut(),
        }
    }

    fn into_sink(self) -> LimitedSink<W> {
        match self {
            Self::HashChain(e) => e.into_sink(),
            Self::BinaryTree(e) => e.into_sink(),
        }
    }
}

/// Writer producing an `.lzma` stream.
///
/// # Example
///
/// ```
/// use oxilzma::{LzmaWriter, WriterConfig};
/// use std::io::Write;
///
/// let config = WriterConfig::new().with_dict_cap(1 << 16);
/// let mut writer = LzmaWriter::with_config(Vec::new(), config)?;
/// writer.write_all(b"hello hello hello")?;
/// let lzma = writer.finish()?;
/// assert_eq!(&lzma[..1], &[0x5D]);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct LzmaWriter<W: Write> {
    header: Header,
    engine: Engine<BufWriter<W>>,
}

impl<W: Write> LzmaWriter<W> {
    /// Create a writer with the default configuration.
    pub fn new(inner: W) -> Result<Self> {
        Self::with_config(inner, WriterConfig::default())
    }

    /// Create a writer and write the header.
    pub fn with_config(inner: W, config: WriterConfig) -> Result<Self> {
        let config = config.normalized();
        config.verify()?;

        let header = config.header();
        let bytes = header.to_bytes()?;

        let mut sink = LimitedSink::new(BufWriter::new(inner), config.output_limit);
        sink.write_all(&bytes)?;

        let engine = Engine::new(sink, &config)?;
        log::debug!(
            "lzma writer: lc={} lp={} pb={} dict={} matcher={} size={:?} eos={}",
            config.properties.lc,
            config.properties.lp,
            config.properties.pb,
            config.dict_cap,
            config.matcher,
            config.size,
            config.eos_marker
        );

        Ok(Self { header, engine })
    }

    /// Compress bytes from `p`.
    ///
    /// With a declared size, bytes beyond it are refused: the count covers
    /// the part that fit, and [`OxiLzmaError::NoSpace`] is returned once
    /// nothing fits.
    pub fn write_data(&mut self, p: &[u8]) -> Result<usize> {
        let mut p = p;
        if let Some(size) = self.header.size {
            let room = size.saturating_sub(self.compressed() + self.buffered() as u64);
            if room < p.len() as u64 {
                if room == 0 {
                    return Err(OxiLzmaError::NoSpace);
                }
                p = &p[..room as usize];
            }
        }
        self.engine.write(p)
    }

    /// Number of input bytes encoded so far.
    pub fn compressed(&self) -> u64 {
        self.engine.compressed()
    }

    /// Number of input bytes waiting to be encoded.
    pub fn buffered(&self) -> usize {
        self.engine.buffered()
    }

    /// The header written at the start of the stream.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Bytes of output produced so far, header included.
    pub fn output_len(&self) -> u64 {
        self.engine.sink().written()
    }

    /// Terminate the stream and return the inner writer.
    ///
    /// Fails with [`OxiLzmaError::SizeMismatch`] if a declared size was not
    /// written exactly. On [`OxiLzmaError::LimitReached`] the output
    /// produced so far is still flushed to the inner writer.
    pub fn finish(mut self) -> Result<W> {
        if let Some(size) = self.header.size {
            let n = self.compressed() + self.buffered() as u64;
            if n != size {
                return Err(OxiLzmaError::size_mismatch(size, n));
            }
        }

        let closed = self.engine.close();
        let input = self.engine.compressed();
        let mut sink = self.engine.into_sink();
        let flushed = sink.flush();
        closed?;
        flushed?;

        log::debug!(
            "lzma stream finished: {input} bytes in, {} bytes out",
            sink.written()
        );

        sink.into_inner()
            .into_inner()
            .map_err(|e| OxiLzmaError::Io(e.into_error()))
    }
}

impl<W: Write> Write for LzmaWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.write_data(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(self.engine.sink_mut().flush()?)
    }
}

impl<W: Write> fmt::Debug for LzmaWriter<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LzmaWriter")
            .field("header", &self.header)
            .field("compressed", &self.compressed())
            .field("buffered", &self.buffered())
            .finish_non_exhaustive()
    }
}
