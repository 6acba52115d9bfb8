//! Compress command implementation.

use crate::utils::{create_progress_bar, default_output_path, format_ratio};
use clap::Args;
use oxilzma::{LzmaLevel, LzmaProperties, LzmaWriter, MatchAlgorithm, OxiLzmaError};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;

/// Read size for streaming the input file.
const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Args)]
pub struct CompressArgs {
    /// File to compress
    pub input: PathBuf,

    /// Output file (defaults to INPUT.lzma)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Compression level (0-9)
    #[arg(short, long, default_value_t = 6, value_parser = clap::value_parser!(u8).range(0..=9))]
    pub level: u8,

    /// Match finder: hc4 or bt4 (defaults to the level's choice)
    #[arg(short, long)]
    pub matcher: Option<MatchAlgorithm>,

    /// Dictionary capacity in bytes (defaults to the level's choice)
    #[arg(short, long)]
    pub dict_size: Option<usize>,

    /// Literal context bits (0-8)
    #[arg(long, default_value_t = 3)]
    pub lc: u32,

    /// Literal position bits (0-4)
    #[arg(long, default_value_t = 0)]
    pub lp: u32,

    /// Position bits (0-4)
    #[arg(long, default_value_t = 2)]
    pub pb: u32,

    /// Leave the size out of the header and end the stream with a marker
    #[arg(long)]
    pub no_size: bool,

    /// Stop once the output reaches this many bytes
    #[arg(long)]
    pub limit: Option<u64>,

    /// Overwrite an existing output file
    #[arg(short, long)]
    pub force: bool,

    /// Show progress bar
    #[arg(short = 'P', long)]
    pub progress: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

pub fn cmd_compress(args: &CompressArgs) -> Result<(), Box<dyn std::error::Error>> {
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input));
    if output.exists() && !args.force {
        return Err(format!(
            "{} already exists (use --force to overwrite)",
            output.display()
        )
        .into());
    }

    let input_len = std::fs::metadata(&args.input)?.len();
    let level = LzmaLevel::new(args.level);

    let mut config = level
        .config()
        .with_properties(LzmaProperties::new(args.lc, args.lp, args.pb));
    if let Some(matcher) = args.matcher {
        config = config.with_matcher(matcher);
    }
    if let Some(dict_size) = args.dict_size {
        config = config.with_dict_cap(dict_size);
    }
    if !args.no_size {
        config = config.with_size(input_len);
    }
    if let Some(limit) = args.limit {
        config = config.with_output_limit(limit);
    }
    config.verify()?;

    if args.verbose {
        println!("Compressing: {}", args.input.display());
        println!("  Output: {}", output.display());
        println!(
            "  Level: {}  Matcher: {}  Dictionary: {} bytes",
            level.level(),
            config.matcher,
            config.dict_cap
        );
        println!(
            "  Properties: lc={} lp={} pb={}",
            config.properties.lc, config.properties.lp, config.properties.pb
        );
    }

    let mut reader = BufReader::new(File::open(&args.input)?);
    let mut writer = LzmaWriter::with_config(File::create(&output)?, config)?;

    let pb = create_progress_bar(input_len, args.progress);
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut limited = false;
    'read: loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        let mut pos = 0;
        while pos < n {
            match writer.write_data(&buf[pos..n]) {
                Ok(k) => pos += k,
                Err(e) if e.is_limit() => {
                    limited = true;
                    break 'read;
                }
                Err(e) => return Err(e.into()),
            }
        }
        pb.inc(n as u64);
    }

    let consumed = writer.compressed() + writer.buffered() as u64;
    match writer.finish() {
        Ok(_) => {}
        Err(e) if e.is_limit() => limited = true,
        // input left unread after the limit never reached the encoder
        Err(OxiLzmaError::SizeMismatch { .. }) if limited => {}
        Err(e) => return Err(e.into()),
    }
    pb.finish_and_clear();

    let output_len = std::fs::metadata(&output)?.len();
    if limited {
        eprintln!(
            "Warning: output limit reached, {} is truncated at {} bytes",
            output.display(),
            output_len
        );
        return Ok(());
    }

    println!(
        "{} -> {}: {} bytes to {} bytes ({})",
        args.input.display(),
        output.display(),
        consumed,
        output_len,
        format_ratio(consumed, output_len)
    );

    Ok(())
}
