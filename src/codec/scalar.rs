//! Integer, float, LEB128 and character codecs
//!
//! Everything here reads from the front of a slice and never looks past the
//! bytes it needs. Decoders return the consumed size where it is not implied
//! by the type.

use crate::error::{DecodeError, EncodeError};

use super::{Decoded, Endianness, TypeTag, Value};

const LEB128_MAX_BYTES: usize = 10;

fn need(bytes: &[u8], tag: TypeTag, needed: usize) -> Result<&[u8], DecodeError> {
    if bytes.len() < needed {
        return Err(DecodeError::InsufficientBytes {
            tag,
            needed,
            available: bytes.len(),
        });
    }
    Ok(&bytes[..needed])
}

/// Assembles up to 8 bytes into an unsigned integer honoring byte order.
fn read_uint(bytes: &[u8], endian: Endianness) -> u64 {
    let mut v = 0u64;
    match endian {
        Endianness::Little => {
            for &b in bytes.iter().rev() {
                v = (v << 8) | u64::from(b);
            }
        }
        Endianness::Big => {
            for &b in bytes {
                v = (v << 8) | u64::from(b);
            }
        }
    }
    v
}

fn write_uint(raw: u64, width: usize, endian: Endianness) -> Vec<u8> {
    match endian {
        Endianness::Little => raw.to_le_bytes()[..width].to_vec(),
        Endianness::Big => raw.to_be_bytes()[8 - width..].to_vec(),
    }
}

fn sign_extend(raw: u64, bits: u32) -> i64 {
    let shift = 64 - bits;
    ((raw << shift) as i64) >> shift
}

/// Byte width and signedness of a fixed-width integer tag, `None` for
/// everything else.
fn int_layout(tag: TypeTag) -> Option<(usize, bool)> {
    match tag {
        TypeTag::Int8 => Some((1, true)),
        TypeTag::UInt8 => Some((1, false)),
        TypeTag::Int16 => Some((2, true)),
        TypeTag::UInt16 => Some((2, false)),
        TypeTag::Int24 => Some((3, true)),
        TypeTag::UInt24 => Some((3, false)),
        TypeTag::Int32 => Some((4, true)),
        TypeTag::UInt32 => Some((4, false)),
        TypeTag::Int64 => Some((8, true)),
        TypeTag::UInt64 => Some((8, false)),
        _ => None,
    }
}

pub(super) fn decode_int(
    bytes: &[u8],
    tag: TypeTag,
    endian: Endianness,
) -> Result<Decoded, DecodeError> {
    let (width, signed) = int_layout(tag).ok_or(DecodeError::UnsupportedTag(tag))?;
    let raw = read_uint(need(bytes, tag, width)?, endian);
    let value = if signed {
        Value::Int(sign_extend(raw, width as u32 * 8))
    } else {
        Value::UInt(raw)
    };
    Ok(Decoded { value, size: width })
}

pub(super) fn decode_f32(bytes: &[u8], endian: Endianness) -> Result<f32, DecodeError> {
    let raw = read_uint(need(bytes, TypeTag::Float32, 4)?, endian) as u32;
    Ok(f32::from_bits(raw))
}

pub(super) fn decode_f64(bytes: &[u8], endian: Endianness) -> Result<f64, DecodeError> {
    let raw = read_uint(need(bytes, TypeTag::Float64, 8)?, endian);
    Ok(f64::from_bits(raw))
}

/// Decodes an unsigned LEB128 value, returning it and the bytes consumed.
///
/// A sequence with no terminating byte (bit 7 clear) within ten bytes is
/// malformed.
pub fn decode_uleb128(bytes: &[u8]) -> Result<(u64, usize), DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::InsufficientBytes {
            tag: TypeTag::Uleb128,
            needed: 1,
            available: 0,
        });
    }
    let mut result: u128 = 0;
    let mut shift = 0u32;
    for (i, &byte) in bytes.iter().take(LEB128_MAX_BYTES).enumerate() {
        result |= u128::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Ok((result as u64, i + 1));
        }
        shift += 7;
    }
    Err(DecodeError::Leb128Unterminated)
}

/// Decodes a signed LEB128 value, returning it and the bytes consumed.
pub fn decode_leb128(bytes: &[u8]) -> Result<(i64, usize), DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::InsufficientBytes {
            tag: TypeTag::Leb128,
            needed: 1,
            available: 0,
        });
    }
    let mut result: u128 = 0;
    let mut shift = 0u32;
    for (i, &byte) in bytes.iter().take(LEB128_MAX_BYTES).enumerate() {
        result |= u128::from(byte & 0x7F) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            let mut value = result as i128;
            if result & (1 << (shift - 1)) != 0 {
                value -= 1i128 << shift;
            }
            return Ok((value as i64, i + 1));
        }
    }
    Err(DecodeError::Leb128Unterminated)
}

/// Minimal-length unsigned LEB128 encoding.
pub fn encode_uleb128(mut value: u64) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return out;
        }
        out.push(byte | 0x80);
    }
}

/// Minimal-length signed LEB128 encoding.
pub fn encode_leb128(mut value: i64) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        let sign_clear = byte & 0x40 == 0;
        if (value == 0 && sign_clear) || (value == -1 && !sign_clear) {
            out.push(byte);
            return out;
        }
        out.push(byte | 0x80);
    }
}

fn is_printable_latin1(byte: u8) -> bool {
    (0x20..=0x7E).contains(&byte) || byte >= 0xA0
}

pub(super) fn decode_ansi_char(bytes: &[u8]) -> Result<String, DecodeError> {
    let byte = need(bytes, TypeTag::AnsiChar, 1)?[0];
    if is_printable_latin1(byte) {
        Ok(char::from_u32(u32::from(byte)).unwrap_or('\u{FFFD}').to_string())
    } else {
        Ok(format!("\\x{byte:02x}"))
    }
}

pub(super) fn decode_wide_char(bytes: &[u8], endian: Endianness) -> Result<String, DecodeError> {
    let unit = read_uint(need(bytes, TypeTag::WideChar, 2)?, endian) as u32;
    match char::from_u32(unit) {
        Some(c) => Ok(c.to_string()),
        // unpaired surrogate
        None => Ok(format!("\\u{unit:04x}")),
    }
}

pub(super) fn decode_utf8(bytes: &[u8]) -> Result<(String, usize), DecodeError> {
    let lead = need(bytes, TypeTag::Utf8Codepoint, 1)?[0];
    let len = match lead {
        b if b & 0x80 == 0x00 => 1,
        b if b & 0xE0 == 0xC0 => 2,
        b if b & 0xF0 == 0xE0 => 3,
        b if b & 0xF8 == 0xF0 => 4,
        _ => return Err(DecodeError::InvalidUtf8),
    };
    let slice = need(bytes, TypeTag::Utf8Codepoint, len)?;
    let text = std::str::from_utf8(slice).map_err(|_| DecodeError::InvalidUtf8)?;
    let c = text.chars().next().ok_or(DecodeError::InvalidUtf8)?;
    Ok((c.to_string(), len))
}

/// Parses integer text: optional `-` sign, `0x`/`0X` prefix for base 16.
fn parse_int_text(text: &str, tag: TypeTag) -> Result<(i128, bool), EncodeError> {
    let trimmed = text.trim();
    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    let (radix, digits) = match body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        Some(hex) => (16, hex),
        None => (10, body),
    };
    let magnitude = i128::from_str_radix(digits, radix).map_err(|_| EncodeError::InvalidFormat {
        tag,
        text: text.to_string(),
    })?;
    Ok((if negative { -magnitude } else { magnitude }, radix == 16))
}

pub(super) fn encode_int(
    text: &str,
    tag: TypeTag,
    endian: Endianness,
) -> Result<Vec<u8>, EncodeError> {
    let (width, signed) = int_layout(tag).ok_or(EncodeError::Unsupported(tag))?;
    let bits = width as u32 * 8;
    let (mut value, is_hex) = parse_int_text(text, tag)?;
    let unsigned_max = (1i128 << bits) - 1;
    let (min, max) = if signed {
        (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1)
    } else {
        (0, unsigned_max)
    };
    // Hex input for signed types is taken as a raw bit pattern, so 0xFF is a
    // valid int8 (-1).
    if signed && is_hex && value > max && value <= unsigned_max {
        value -= 1i128 << bits;
    }
    if value < min || value > max {
        return Err(EncodeError::OutOfRange {
            tag,
            text: text.to_string(),
        });
    }
    let raw = (value as i64 as u64) & (unsigned_max as u64);
    Ok(write_uint(raw, width, endian))
}

pub(super) fn encode_f32(text: &str, endian: Endianness) -> Result<Vec<u8>, EncodeError> {
    let v: f32 = text.trim().parse().map_err(|_| EncodeError::InvalidFormat {
        tag: TypeTag::Float32,
        text: text.to_string(),
    })?;
    Ok(write_uint(u64::from(v.to_bits()), 4, endian))
}

pub(super) fn encode_f64(text: &str, endian: Endianness) -> Result<Vec<u8>, EncodeError> {
    let v: f64 = text.trim().parse().map_err(|_| EncodeError::InvalidFormat {
        tag: TypeTag::Float64,
        text: text.to_string(),
    })?;
    Ok(write_uint(v.to_bits(), 8, endian))
}

pub(super) fn encode_leb128_text(text: &str) -> Result<Vec<u8>, EncodeError> {
    let (value, _) = parse_int_text(text, TypeTag::Leb128)?;
    if value < i128::from(i64::MIN) || value > i128::from(i64::MAX) {
        return Err(EncodeError::OutOfRange {
            tag: TypeTag::Leb128,
            text: text.to_string(),
        });
    }
    Ok(encode_leb128(value as i64))
}

pub(super) fn encode_uleb128_text(text: &str) -> Result<Vec<u8>, EncodeError> {
    let (value, _) = parse_int_text(text, TypeTag::Uleb128)?;
    if value < 0 || value > i128::from(u64::MAX) {
        return Err(EncodeError::OutOfRange {
            tag: TypeTag::Uleb128,
            text: text.to_string(),
        });
    }
    Ok(encode_uleb128(value as u64))
}

fn parse_escape(text: &str, prefix: &str, digits: usize) -> Option<u32> {
    let body = text.strip_prefix(prefix)?;
    if body.len() != digits {
        return None;
    }
    u32::from_str_radix(body, 16).ok()
}

pub(super) fn encode_ansi_char(text: &str) -> Result<Vec<u8>, EncodeError> {
    if let Some(code) = parse_escape(text, "\\x", 2) {
        return Ok(vec![code as u8]);
    }
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if (c as u32) <= 0xFF => Ok(vec![c as u32 as u8]),
        _ => Err(EncodeError::InvalidFormat {
            tag: TypeTag::AnsiChar,
            text: text.to_string(),
        }),
    }
}

pub(super) fn encode_wide_char(text: &str, endian: Endianness) -> Result<Vec<u8>, EncodeError> {
    let code = if let Some(code) = parse_escape(text, "\\u", 4) {
        code
    } else {
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if (c as u32) <= 0xFFFF => c as u32,
            _ => {
                return Err(EncodeError::InvalidFormat {
                    tag: TypeTag::WideChar,
                    text: text.to_string(),
                })
            }
        }
    };
    Ok(write_uint(u64::from(code), 2, endian))
}

pub(super) fn encode_utf8(text: &str) -> Result<Vec<u8>, EncodeError> {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => {
            let mut buf = [0u8; 4];
            Ok(c.encode_utf8(&mut buf).as_bytes().to_vec())
        }
        _ => Err(EncodeError::InvalidFormat {
            tag: TypeTag::Utf8Codepoint,
            text: text.to_string(),
        }),
    }
}
