//! The 13-byte `.lzma` header.
//!
//! ```text
//! +-------+-------------------+-------------------------------+
//! | props | dictionary (u32)  | uncompressed size (u64)       |
//! +-------+-------------------+-------------------------------+
//!    1            4 LE                      8 LE
//! ```
//!
//! The properties byte is `(pb * 5 + lp) * 9 + lc`. An unknown size is
//! stored as all ones, and the stream must then end with the end marker.

use crate::model::LzmaProperties;
use oxilzma_core::error::{OxiLzmaError, Result};

/// Length of the header in bytes.
pub const HEADER_LEN: usize = 13;

/// Smallest dictionary capacity accepted in a header.
pub const MIN_DICT_CAP: u32 = 4096;

/// Size field value for an unknown uncompressed size.
pub const UNKNOWN_SIZE: u64 = u64::MAX;

/// Parsed `.lzma` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Literal and position properties.
    pub properties: LzmaProperties,
    /// Dictionary capacity.
    pub dict_cap: u32,
    /// Uncompressed size, `None` when the stream is terminated by the end
    /// marker.
    pub size: Option<u64>,
}

impl Header {
    /// Serialize the header.
    pub fn to_bytes(&self) -> Result<[u8; HEADER_LEN]> {
        self.properties.verify()?;
        if self.dict_cap < MIN_DICT_CAP {
            return Err(OxiLzmaError::invalid_config(format!(
                "dictionary capacity {} below minimum {MIN_DICT_CAP}",
                self.dict_cap
            )));
        }
        if self.size == Some(UNKNOWN_SIZE) {
            return Err(OxiLzmaError::invalid_config(
                "uncompressed size collides with the unknown-size marker",
            ));
        }

        let mut out = [0u8; HEADER_LEN];
        out[0] = self.properties.to_byte();
        out[1..5].copy_from_slice(&self.dict_cap.to_le_bytes());
        out[5..].copy_from_slice(&self.size.unwrap_or(UNKNOWN_SIZE).to_le_bytes());
        Ok(out)
    }

    /// Parse a header from the first [`HEADER_LEN`] bytes of `data`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(OxiLzmaError::invalid_header(format!(
                "need {HEADER_LEN} bytes, got {}",
                data.len()
            )));
        }

        let properties = LzmaProperties::from_byte(data[0]).ok_or_else(|| {
            OxiLzmaError::invalid_header(format!("invalid properties byte {:#04x}", data[0]))
        })?;

        let mut dict = [0u8; 4];
        dict.copy_from_slice(&data[1..5]);
        let dict_cap = u32::from_le_bytes(dict);
        if dict_cap < MIN_DICT_CAP {
            return Err(OxiLzmaError::invalid_header(format!(
                "dictionary capacity {dict_cap} below minimum {MIN_DICT_CAP}"
            )));
        }

        let mut size = [0u8; 8];
        size.copy_from_slice(&data[5..HEADER_LEN]);
        let size = match u64::from_le_bytes(size) {
            UNKNOWN_SIZE => None,
            n => Some(n),
        };

        Ok(Self {
            properties,
            dict_cap,
            size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let header = Header {
            properties: LzmaProperties::default(),
            dict_cap: 8 << 20,
            size: None,
        };
        let bytes = header.to_bytes().unwrap();
        assert_eq!(
            bytes,
            [0x5D, 0x00, 0x00, 0x80, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]
        );
        assert_eq!(Header::parse(&bytes).unwrap(), header);
    }

    #[test]
    fn test_declared_size() {
        let header = Header {
            properties: LzmaProperties::new(0, 2, 0),
            dict_cap: 4096,
            size: Some(0x0102_0304),
        };
        let bytes = header.to_bytes().unwrap();
        assert_eq!(bytes[0], 18);
        assert_eq!(&bytes[5..], &[4, 3, 2, 1, 0, 0, 0, 0]);
        assert_eq!(Header::parse(&bytes).unwrap(), header);
    }

    #[test]
    fn test_zero_size_is_declared() {
        let header = Header {
            properties: LzmaProperties::default(),
            dict_cap: 4096,
            size: Some(0),
        };
        let parsed = Header::parse(&header.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed.size, Some(0));
    }

    #[test]
    fn test_rejects_bad_values() {
        let small = Header {
            properties: LzmaProperties::default(),
            dict_cap: 4095,
            size: None,
        };
        assert!(small.to_bytes().is_err());

        let bad_props = Header {
            properties: LzmaProperties::new(9, 0, 0),
            dict_cap: 4096,
            size: None,
        };
        assert!(bad_props.to_bytes().is_err());

        let reserved = Header {
            properties: LzmaProperties::default(),
            dict_cap: 4096,
            size: Some(u64::MAX),
        };
        assert!(reserved.to_bytes().is_err());
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            Header::parse(&[0x5D; 12]),
            Err(OxiLzmaError::InvalidHeader { .. })
        ));

        let mut bytes = [0u8; HEADER_LEN];
        bytes[0] = 225;
        assert!(Header::parse(&bytes).is_err());

        bytes[0] = 0x5D;
        bytes[1..5].copy_from_slice(&100u32.to_le_bytes());
        assert!(Header::parse(&bytes).is_err());
    }
}
