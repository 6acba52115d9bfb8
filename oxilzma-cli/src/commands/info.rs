//! Info command implementation.

use crate::utils::format_ratio;
use oxilzma::{HEADER_LEN, Header};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

pub fn cmd_info(file: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let mut bytes = [0u8; HEADER_LEN];
    File::open(file)?.read_exact(&mut bytes)?;
    let header = Header::parse(&bytes)?;
    let file_len = std::fs::metadata(file)?.len();
    let payload = file_len.saturating_sub(HEADER_LEN as u64);

    println!("LZMA Information");
    println!("================");
    println!("File: {}", file.display());
    println!("Size: {} bytes", file_len);
    println!();
    println!("Header:");
    println!(
        "  Properties: lc={} lp={} pb={} (0x{:02X})",
        header.properties.lc,
        header.properties.lp,
        header.properties.pb,
        bytes[0]
    );
    println!("  Dictionary: {} bytes", header.dict_cap);
    match header.size {
        Some(size) => {
            println!("  Uncompressed size: {} bytes", size);
            println!("  Compressed payload: {} bytes", payload);
            println!("  Compression ratio: {}", format_ratio(size, file_len));
        }
        None => {
            println!("  Uncompressed size: unknown (end marker)");
            println!("  Compressed payload: {} bytes", payload);
        }
    }

    Ok(())
}
