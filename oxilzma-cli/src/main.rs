//! OxiLZMA CLI
//!
//! Compresses files into `.lzma` streams and inspects `.lzma` headers.

mod commands;
mod utils;

use clap::{Parser, Subcommand};
use commands::{CompressArgs, cmd_compress, cmd_info};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "oxilzma")]
#[command(author, version, about = "Pure Rust LZMA compressor")]
#[command(long_about = "
OxiLZMA compresses files into the .lzma format.

Examples:
  oxilzma compress data.bin
  oxilzma compress data.bin -o data.lzma --level 9
  oxilzma compress log.txt --matcher bt4 --dict-size 1048576
  oxilzma compress stream.raw --no-size --limit 65536
  oxilzma info data.bin.lzma
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file to .lzma
    #[command(alias = "c")]
    Compress(CompressArgs),

    /// Show the header of a .lzma file
    #[command(alias = "i")]
    Info {
        /// File to inspect
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Compress(args) => cmd_compress(&args),
        Commands::Info { file } => cmd_info(&file),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
