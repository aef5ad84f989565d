//! Typed decoding and encoding of byte slices
//!
//! [`decode`] turns the bytes at some offset into a [`Value`] plus the number
//! of bytes consumed; [`encode`] turns user-typed text back into bytes. Both
//! are pure and never touch the buffer they are given. Types that only make
//! sense with annotation context (hex dumps, offsets, segments, indirect
//! strings) live in [`crate::interpret`] instead and are rejected here.

pub mod guid;
pub mod scalar;
pub mod time;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, EncodeError};
pub use guid::Guid;

/// Byte order used when assembling multi-byte values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Endianness {
    #[default]
    Little,
    Big,
}

impl Endianness {
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Endianness::Little => Endianness::Big,
            Endianness::Big => Endianness::Little,
        }
    }
}

impl fmt::Display for Endianness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endianness::Little => f.write_str("LE"),
            Endianness::Big => f.write_str("BE"),
        }
    }
}

/// Every value interpretation the crate knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int24,
    UInt24,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
    Leb128,
    Uleb128,
    AnsiChar,
    WideChar,
    Utf8Codepoint,
    Guid,
    DosDate,
    DosTime,
    DosDateTime,
    FileTime,
    OleTime,
    UnixTime32,
    UnixTime64,
    /// Raw bytes rendered as space-separated hex pairs.
    Hex,
    /// Printable-ASCII rendering of a byte range.
    StringAscii,
    /// Big-endian numeral built from the hex digits of the range.
    Offset,
    /// Start/length pair rendered as an address range.
    Segment,
    /// Numeric value used as an offset to a NUL-terminated string in the
    /// same buffer.
    StringAtOffset,
    /// Numeric value used as an offset into another buffer, scanning
    /// backward for the start of the string.
    StringInReferenceBuffer,
}

impl TypeTag {
    /// Exact byte width for fixed-size types, `None` for variable-length or
    /// annotation-context types.
    #[must_use]
    pub fn fixed_width(self) -> Option<usize> {
        use TypeTag::*;
        match self {
            Int8 | UInt8 | AnsiChar => Some(1),
            Int16 | UInt16 | WideChar | DosDate | DosTime => Some(2),
            Int24 | UInt24 => Some(3),
            Int32 | UInt32 | Float32 | DosDateTime | UnixTime32 => Some(4),
            Int64 | UInt64 | Float64 | FileTime | OleTime | UnixTime64 => Some(8),
            Guid => Some(16),
            Leb128 | Uleb128 | Utf8Codepoint | Hex | StringAscii | Offset | Segment
            | StringAtOffset | StringInReferenceBuffer => None,
        }
    }

    /// Whether byte order changes the decoded value.
    #[must_use]
    pub fn needs_endianness(self) -> bool {
        use TypeTag::*;
        !matches!(
            self,
            Int8 | UInt8 | AnsiChar | Leb128 | Uleb128 | Utf8Codepoint | Hex | StringAscii
        )
    }

    /// Tags that require a [`crate::interpret::Descriptor`] rather than a
    /// bare slice-and-endianness pair.
    #[must_use]
    pub fn needs_descriptor(self) -> bool {
        use TypeTag::*;
        matches!(
            self,
            Hex | StringAscii | Offset | Segment | StringAtOffset | StringInReferenceBuffer
        )
    }

    /// Tags whose length is caller-chosen rather than a property of the tag.
    #[must_use]
    pub fn variable_width(self) -> bool {
        self.fixed_width().is_none()
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use TypeTag::*;
        let name = match self {
            Int8 => "int8",
            UInt8 => "uint8",
            Int16 => "int16",
            UInt16 => "uint16",
            Int24 => "int24",
            UInt24 => "uint24",
            Int32 => "int32",
            UInt32 => "uint32",
            Int64 => "int64",
            UInt64 => "uint64",
            Float32 => "float32",
            Float64 => "float64",
            Leb128 => "LEB128",
            Uleb128 => "ULEB128",
            AnsiChar => "ANSI char",
            WideChar => "wide char",
            Utf8Codepoint => "UTF-8 codepoint",
            Guid => "GUID",
            DosDate => "DOS date",
            DosTime => "DOS time",
            DosDateTime => "DOS date/time",
            FileTime => "FILETIME",
            OleTime => "OLETIME",
            UnixTime32 => "time_t (32-bit)",
            UnixTime64 => "time_t (64-bit)",
            Hex => "hex",
            StringAscii => "string",
            Offset => "offset",
            Segment => "segment",
            StringAtOffset => "string at offset",
            StringInReferenceBuffer => "string in reference buffer",
        };
        f.write_str(name)
    }
}

/// A successfully decoded value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    UInt(u64),
    Float32(f32),
    Float64(f64),
    /// A single character, or its `\xNN` / `\uNNNN` escape when it has no
    /// printable form.
    Char(String),
    Guid(Guid),
    Date(chrono::NaiveDate),
    Time(chrono::NaiveTime),
    /// Packed calendar formats (DOS, FILETIME, OLETIME) with no zone of
    /// their own.
    DateTime(chrono::NaiveDateTime),
    /// Epoch-based timestamps, rendered with an explicit ` UTC` suffix.
    DateTimeUtc(chrono::NaiveDateTime),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::UInt(v) => write!(f, "{v}"),
            Value::Float32(v) => write!(f, "{v:.6}"),
            Value::Float64(v) => write!(f, "{v:.15}"),
            Value::Char(s) => f.write_str(s),
            Value::Guid(g) => write!(f, "{g}"),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Time(t) => write!(f, "{}", t.format("%H:%M:%S")),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            Value::DateTimeUtc(dt) => write!(f, "{} UTC", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

/// Result of a decode: the value plus how many bytes it consumed.
///
/// The size matters for the variable-length types (LEB128, UTF-8); for
/// fixed-width types it always equals [`TypeTag::fixed_width`].
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub value: Value,
    pub size: usize,
}

impl Decoded {
    fn new(value: Value, size: usize) -> Self {
        Decoded { value, size }
    }
}

/// Decodes the start of `bytes` as `tag`.
///
/// The slice may be longer than the value; trailing bytes are ignored and
/// `size` reports how many were consumed.
pub fn decode(bytes: &[u8], tag: TypeTag, endian: Endianness) -> Result<Decoded, DecodeError> {
    use TypeTag::*;
    match tag {
        Int8 | UInt8 | Int16 | UInt16 | Int24 | UInt24 | Int32 | UInt32 | Int64 | UInt64 => {
            scalar::decode_int(bytes, tag, endian)
        }
        Float32 => scalar::decode_f32(bytes, endian)
            .map(|v| Decoded::new(Value::Float32(v), 4)),
        Float64 => scalar::decode_f64(bytes, endian)
            .map(|v| Decoded::new(Value::Float64(v), 8)),
        Leb128 => scalar::decode_leb128(bytes)
            .map(|(v, n)| Decoded::new(Value::Int(v), n)),
        Uleb128 => scalar::decode_uleb128(bytes)
            .map(|(v, n)| Decoded::new(Value::UInt(v), n)),
        AnsiChar => scalar::decode_ansi_char(bytes)
            .map(|s| Decoded::new(Value::Char(s), 1)),
        WideChar => scalar::decode_wide_char(bytes, endian)
            .map(|s| Decoded::new(Value::Char(s), 2)),
        Utf8Codepoint => scalar::decode_utf8(bytes)
            .map(|(s, n)| Decoded::new(Value::Char(s), n)),
        Guid => guid::decode(bytes, endian)
            .map(|g| Decoded::new(Value::Guid(g), 16)),
        DosDate => time::decode_dos_date(bytes, endian)
            .map(|d| Decoded::new(Value::Date(d), 2)),
        DosTime => time::decode_dos_time(bytes, endian)
            .map(|t| Decoded::new(Value::Time(t), 2)),
        DosDateTime => time::decode_dos_datetime(bytes, endian)
            .map(|dt| Decoded::new(Value::DateTime(dt), 4)),
        FileTime => time::decode_filetime(bytes, endian)
            .map(|dt| Decoded::new(Value::DateTime(dt), 8)),
        OleTime => time::decode_oletime(bytes, endian)
            .map(|dt| Decoded::new(Value::DateTime(dt), 8)),
        UnixTime32 => time::decode_unix32(bytes, endian)
            .map(|dt| Decoded::new(Value::DateTimeUtc(dt), 4)),
        UnixTime64 => time::decode_unix64(bytes, endian)
            .map(|dt| Decoded::new(Value::DateTimeUtc(dt), 8)),
        Hex | StringAscii | Offset | Segment | StringAtOffset | StringInReferenceBuffer => {
            Err(DecodeError::UnsupportedTag(tag))
        }
    }
}

/// Encodes user-typed text as `tag`.
///
/// Integer text accepts an optional sign and a `0x`/`0X` prefix for base 16;
/// out-of-range values are rejected rather than truncated. The timestamp
/// family is decode-only. Descriptor-context types are handled by
/// [`crate::interpret::parse`].
pub fn encode(text: &str, tag: TypeTag, endian: Endianness) -> Result<Vec<u8>, EncodeError> {
    use TypeTag::*;
    match tag {
        Int8 | UInt8 | Int16 | UInt16 | Int24 | UInt24 | Int32 | UInt32 | Int64 | UInt64 => {
            scalar::encode_int(text, tag, endian)
        }
        Float32 => scalar::encode_f32(text, endian),
        Float64 => scalar::encode_f64(text, endian),
        Leb128 => scalar::encode_leb128_text(text),
        Uleb128 => scalar::encode_uleb128_text(text),
        AnsiChar => scalar::encode_ansi_char(text),
        WideChar => scalar::encode_wide_char(text, endian),
        Utf8Codepoint => scalar::encode_utf8(text),
        Guid => guid::parse(text).map(|g| guid::encode(&g, endian).to_vec()),
        DosDate | DosTime | DosDateTime | FileTime | OleTime | UnixTime32 | UnixTime64 | Hex
        | StringAscii | Offset | Segment | StringAtOffset | StringInReferenceBuffer => {
            Err(EncodeError::Unsupported(tag))
        }
    }
}
