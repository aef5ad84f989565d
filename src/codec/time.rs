//! Packed timestamp decoders
//!
//! All of these are decode-only: the editor surface treats timestamps as
//! read-only interpretations. Anything outside the representable range is an
//! [`DecodeError::InvalidTimestamp`], never a panic.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};

use crate::error::DecodeError;

use super::{Endianness, TypeTag};

fn invalid(tag: TypeTag) -> DecodeError {
    DecodeError::InvalidTimestamp { tag }
}

fn read_u16(bytes: &[u8], tag: TypeTag, endian: Endianness) -> Result<u16, DecodeError> {
    let b: [u8; 2] = bytes
        .get(..2)
        .and_then(|s| s.try_into().ok())
        .ok_or(DecodeError::InsufficientBytes {
            tag,
            needed: 2,
            available: bytes.len(),
        })?;
    Ok(match endian {
        Endianness::Little => u16::from_le_bytes(b),
        Endianness::Big => u16::from_be_bytes(b),
    })
}

fn read_u32(bytes: &[u8], tag: TypeTag, endian: Endianness) -> Result<u32, DecodeError> {
    let b: [u8; 4] = bytes
        .get(..4)
        .and_then(|s| s.try_into().ok())
        .ok_or(DecodeError::InsufficientBytes {
            tag,
            needed: 4,
            available: bytes.len(),
        })?;
    Ok(match endian {
        Endianness::Little => u32::from_le_bytes(b),
        Endianness::Big => u32::from_be_bytes(b),
    })
}

fn read_u64(bytes: &[u8], tag: TypeTag, endian: Endianness) -> Result<u64, DecodeError> {
    let b: [u8; 8] = bytes
        .get(..8)
        .and_then(|s| s.try_into().ok())
        .ok_or(DecodeError::InsufficientBytes {
            tag,
            needed: 8,
            available: bytes.len(),
        })?;
    Ok(match endian {
        Endianness::Little => u64::from_le_bytes(b),
        Endianness::Big => u64::from_be_bytes(b),
    })
}

fn dos_date_from_word(word: u16, tag: TypeTag) -> Result<NaiveDate, DecodeError> {
    let day = u32::from(word & 0x1F);
    let month = u32::from((word >> 5) & 0x0F);
    let year = 1980 + i32::from(word >> 9);
    if !(1..=31).contains(&day) || !(1..=12).contains(&month) {
        return Err(invalid(tag));
    }
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| invalid(tag))
}

fn dos_time_from_word(word: u16, tag: TypeTag) -> Result<NaiveTime, DecodeError> {
    let second = u32::from(word & 0x1F) * 2;
    let minute = u32::from((word >> 5) & 0x3F);
    let hour = u32::from(word >> 11);
    if hour >= 24 || minute >= 60 || second >= 60 {
        return Err(invalid(tag));
    }
    NaiveTime::from_hms_opt(hour, minute, second).ok_or_else(|| invalid(tag))
}

/// MS-DOS packed date: day in bits 0-4, month in 5-8, year-since-1980 in 9-15.
pub fn decode_dos_date(bytes: &[u8], endian: Endianness) -> Result<NaiveDate, DecodeError> {
    let word = read_u16(bytes, TypeTag::DosDate, endian)?;
    dos_date_from_word(word, TypeTag::DosDate)
}

/// MS-DOS packed time: 2-second units in bits 0-4, minute in 5-10, hour in 11-15.
pub fn decode_dos_time(bytes: &[u8], endian: Endianness) -> Result<NaiveTime, DecodeError> {
    let word = read_u16(bytes, TypeTag::DosTime, endian)?;
    dos_time_from_word(word, TypeTag::DosTime)
}

/// Four bytes as a DOS time word followed by a DOS date word.
pub fn decode_dos_datetime(bytes: &[u8], endian: Endianness) -> Result<NaiveDateTime, DecodeError> {
    let tag = TypeTag::DosDateTime;
    let time_word = read_u16(bytes, tag, endian)?;
    let date_word = read_u16(&bytes[2..], tag, endian)?;
    let date = dos_date_from_word(date_word, tag)?;
    let time = dos_time_from_word(time_word, tag)?;
    Ok(date.and_time(time))
}

/// Windows FILETIME: 100ns ticks since 1601-01-01 UTC. Zero is invalid.
pub fn decode_filetime(bytes: &[u8], endian: Endianness) -> Result<NaiveDateTime, DecodeError> {
    let tag = TypeTag::FileTime;
    let ticks = read_u64(bytes, tag, endian)?;
    if ticks == 0 {
        return Err(invalid(tag));
    }
    let base = NaiveDate::from_ymd_opt(1601, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| invalid(tag))?;
    let micros = i64::try_from(ticks / 10).map_err(|_| invalid(tag))?;
    base.checked_add_signed(TimeDelta::microseconds(micros))
        .ok_or_else(|| invalid(tag))
}

/// OLE automation date: fractional days since 1899-12-30, stored as f64.
pub fn decode_oletime(bytes: &[u8], endian: Endianness) -> Result<NaiveDateTime, DecodeError> {
    let tag = TypeTag::OleTime;
    let days = f64::from_bits(read_u64(bytes, tag, endian)?);
    if !days.is_finite() {
        return Err(invalid(tag));
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| invalid(tag))?;
    // float-to-int cast saturates, checked_add then rejects the overflow
    let millis = (days * 86_400_000.0) as i64;
    base.checked_add_signed(TimeDelta::milliseconds(millis))
        .ok_or_else(|| invalid(tag))
}

/// 32-bit signed Unix timestamp. Negative values are invalid.
pub fn decode_unix32(bytes: &[u8], endian: Endianness) -> Result<NaiveDateTime, DecodeError> {
    let tag = TypeTag::UnixTime32;
    let secs = read_u32(bytes, tag, endian)? as i32;
    unix_from_secs(i64::from(secs), tag)
}

/// 64-bit signed Unix timestamp. Negative values are invalid.
pub fn decode_unix64(bytes: &[u8], endian: Endianness) -> Result<NaiveDateTime, DecodeError> {
    let tag = TypeTag::UnixTime64;
    let secs = read_u64(bytes, tag, endian)? as i64;
    unix_from_secs(secs, tag)
}

fn unix_from_secs(secs: i64, tag: TypeTag) -> Result<NaiveDateTime, DecodeError> {
    if secs < 0 {
        return Err(invalid(tag));
    }
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| invalid(tag))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LE: Endianness = Endianness::Little;
    const BE: Endianness = Endianness::Big;

    #[test]
    fn dos_date_unpacks_fields() {
        // 2024-06-15: year 44, month 6, day 15 -> (44<<9)|(6<<5)|15 = 0x58CF
        let date = decode_dos_date(&0x58CFu16.to_le_bytes(), LE).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
        let date = decode_dos_date(&0x58CFu16.to_be_bytes(), BE).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
    }

    #[test]
    fn dos_date_rejects_zero_fields() {
        // day 0
        assert!(decode_dos_date(&0x58C0u16.to_le_bytes(), LE).is_err());
        // month 0
        assert!(decode_dos_date(&0x580Fu16.to_le_bytes(), LE).is_err());
        // month 13
        assert!(decode_dos_date(&((44 << 9) | (13 << 5) | 1u16).to_le_bytes(), LE).is_err());
    }

    #[test]
    fn dos_time_unpacks_and_validates() {
        // 13:45:30: (13<<11)|(45<<5)|15
        let word = (13u16 << 11) | (45 << 5) | 15;
        let time = decode_dos_time(&word.to_le_bytes(), LE).unwrap();
        assert_eq!(time, NaiveTime::from_hms_opt(13, 45, 30).unwrap());
        // hour 25
        let word = (25u16 << 11) | (0 << 5) | 0;
        assert!(decode_dos_time(&word.to_le_bytes(), LE).is_err());
        // minute 63
        let word = (1u16 << 11) | (63 << 5) | 0;
        assert!(decode_dos_time(&word.to_le_bytes(), LE).is_err());
    }

    #[test]
    fn dos_datetime_is_time_word_then_date_word() {
        let time_word: u16 = (13 << 11) | (45 << 5) | 15;
        let date_word: u16 = (44 << 9) | (6 << 5) | 15;
        let mut bytes = time_word.to_le_bytes().to_vec();
        bytes.extend_from_slice(&date_word.to_le_bytes());
        let dt = decode_dos_datetime(&bytes, LE).unwrap();
        assert_eq!(dt.to_string(), "2024-06-15 13:45:30");
    }

    #[test]
    fn filetime_zero_is_invalid() {
        assert!(decode_filetime(&[0u8; 8], LE).is_err());
    }

    #[test]
    fn filetime_epoch_math() {
        // the Unix epoch is 11644473600 seconds after the FILETIME epoch
        let ticks: u64 = 116_444_736_000_000_000;
        let dt = decode_filetime(&ticks.to_le_bytes(), LE).unwrap();
        assert_eq!(dt.to_string(), "1970-01-01 00:00:00");
    }

    #[test]
    fn oletime_counts_days_from_1899() {
        // 2.5 days after 1899-12-30 = 1900-01-01 12:00
        let dt = decode_oletime(&2.5f64.to_le_bytes(), LE).unwrap();
        assert_eq!(dt.to_string(), "1900-01-01 12:00:00");
        assert!(decode_oletime(&f64::NAN.to_le_bytes(), LE).is_err());
        assert!(decode_oletime(&f64::INFINITY.to_le_bytes(), LE).is_err());
        assert!(decode_oletime(&1.0e300f64.to_le_bytes(), LE).is_err());
    }

    #[test]
    fn unix_timestamps_reject_negative() {
        let dt = decode_unix32(&1_000_000_000u32.to_le_bytes(), LE).unwrap();
        assert_eq!(dt.to_string(), "2001-09-09 01:46:40");
        assert!(decode_unix32(&(-1i32 as u32).to_le_bytes(), LE).is_err());
        let dt = decode_unix64(&1_000_000_000u64.to_be_bytes(), BE).unwrap();
        assert_eq!(dt.to_string(), "2001-09-09 01:46:40");
        assert!(decode_unix64(&(-5i64 as u64).to_le_bytes(), LE).is_err());
    }
}
