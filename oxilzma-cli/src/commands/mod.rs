//! Command implementations for OxiLZMA CLI.

pub mod compress;
pub mod info;

pub use compress::{CompressArgs, cmd_compress};
pub use info::cmd_info;
