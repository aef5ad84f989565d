//! GUID decoding, formatting and parsing
//!
//! The first three groups (u32, u16, u16) honor the requested byte order; the
//! trailing eight bytes are always taken verbatim, matching how Windows lays
//! GUIDs out in memory.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, EncodeError};

use super::{Endianness, TypeTag};

pub const GUID_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.data4;
        write!(
            f,
            "{:08X}-{:04X}-{:04X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}",
            self.data1, self.data2, self.data3, d[0], d[1], d[2], d[3], d[4], d[5], d[6], d[7]
        )
    }
}

pub fn decode(bytes: &[u8], endian: Endianness) -> Result<Guid, DecodeError> {
    let slice = bytes.get(..GUID_LEN).ok_or(DecodeError::InsufficientBytes {
        tag: TypeTag::Guid,
        needed: GUID_LEN,
        available: bytes.len(),
    })?;
    let d1: [u8; 4] = slice[0..4].try_into().unwrap();
    let d2: [u8; 2] = slice[4..6].try_into().unwrap();
    let d3: [u8; 2] = slice[6..8].try_into().unwrap();
    let (data1, data2, data3) = match endian {
        Endianness::Little => (
            u32::from_le_bytes(d1),
            u16::from_le_bytes(d2),
            u16::from_le_bytes(d3),
        ),
        Endianness::Big => (
            u32::from_be_bytes(d1),
            u16::from_be_bytes(d2),
            u16::from_be_bytes(d3),
        ),
    };
    Ok(Guid {
        data1,
        data2,
        data3,
        data4: slice[8..16].try_into().unwrap(),
    })
}

pub fn encode(guid: &Guid, endian: Endianness) -> [u8; GUID_LEN] {
    let mut out = [0u8; GUID_LEN];
    match endian {
        Endianness::Little => {
            out[0..4].copy_from_slice(&guid.data1.to_le_bytes());
            out[4..6].copy_from_slice(&guid.data2.to_le_bytes());
            out[6..8].copy_from_slice(&guid.data3.to_le_bytes());
        }
        Endianness::Big => {
            out[0..4].copy_from_slice(&guid.data1.to_be_bytes());
            out[4..6].copy_from_slice(&guid.data2.to_be_bytes());
            out[6..8].copy_from_slice(&guid.data3.to_be_bytes());
        }
    }
    out[8..16].copy_from_slice(&guid.data4);
    out
}

/// Parses the canonical five-group form, with or without surrounding braces.
pub fn parse(text: &str) -> Result<Guid, EncodeError> {
    let bad = || EncodeError::InvalidFormat {
        tag: TypeTag::Guid,
        text: text.to_string(),
    };
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .unwrap_or(trimmed);
    let groups: Vec<&str> = body.split('-').collect();
    let &[g1, g2, g3, g4, g5] = groups.as_slice() else {
        return Err(bad());
    };
    if g1.len() != 8 || g2.len() != 4 || g3.len() != 4 || g4.len() != 4 || g5.len() != 12 {
        return Err(bad());
    }
    let data1 = u32::from_str_radix(g1, 16).map_err(|_| bad())?;
    let data2 = u16::from_str_radix(g2, 16).map_err(|_| bad())?;
    let data3 = u16::from_str_radix(g3, 16).map_err(|_| bad())?;
    let head = u16::from_str_radix(g4, 16).map_err(|_| bad())?;
    let tail = u64::from_str_radix(g5, 16).map_err(|_| bad())?;
    let mut data4 = [0u8; 8];
    data4[0..2].copy_from_slice(&head.to_be_bytes());
    data4[2..8].copy_from_slice(&tail.to_be_bytes()[2..8]);
    Ok(Guid {
        data1,
        data2,
        data3,
        data4,
    })
}
