//! Rendering annotations as text and parsing edits back into bytes
//!
//! Where the codec works on a bare slice, the interpreter works on a
//! [`Descriptor`]: a located, typed range with the extra context (segment
//! anchor, signedness, reference buffer) that the descriptor-only types
//! need. Rendering never fails; anything unreadable becomes the [`INVALID`]
//! marker so a table full of annotations can always be displayed.

use crate::annotations::{Pointer, Subfield, ValueKind};
use crate::codec::{self, Endianness, TypeTag};
use crate::error::EncodeError;
use crate::BufferId;

/// Marker rendered for anything that cannot be interpreted.
pub const INVALID: &str = "N/A";

/// Most bytes an indirect string lookup will read.
const STRING_LOOKUP_LIMIT: usize = 100;

/// Everything needed to interpret one annotated range.
#[derive(Debug, Clone)]
pub struct Descriptor {
    pub offset: usize,
    pub length: usize,
    pub tag: TypeTag,
    pub endian: Endianness,
    pub value_kind: ValueKind,
    /// Anchor address for [`TypeTag::Segment`] rendering.
    pub segment_start: usize,
    pub reference_buffer: Option<BufferId>,
}

impl Descriptor {
    pub fn new(offset: usize, length: usize, tag: TypeTag) -> Self {
        Descriptor {
            offset,
            length,
            tag,
            endian: Endianness::Little,
            value_kind: ValueKind::Unsigned,
            segment_start: offset,
            reference_buffer: None,
        }
    }
}

impl From<&Pointer> for Descriptor {
    fn from(p: &Pointer) -> Self {
        Descriptor {
            offset: p.offset,
            length: p.length,
            tag: p.tag,
            endian: p.endian,
            value_kind: p.value_kind,
            segment_start: p.segment_start,
            reference_buffer: p.reference_buffer,
        }
    }
}

impl From<&Subfield> for Descriptor {
    fn from(s: &Subfield) -> Self {
        Descriptor {
            offset: s.start,
            length: s.end - s.start,
            tag: s.tag,
            endian: s.endian,
            value_kind: ValueKind::Unsigned,
            segment_start: s.start,
            reference_buffer: None,
        }
    }
}

/// Resolves a [`BufferId`] to its bytes for indirect string lookups.
///
/// The host owns the buffers, so it decides what an ID maps to; returning
/// `None` makes the lookup render as [`INVALID`].
pub trait ReferenceResolver {
    fn buffer(&self, id: BufferId) -> Option<&[u8]>;
}

/// No buffers, every indirect lookup fails.
pub struct NoReferences;

impl ReferenceResolver for NoReferences {
    fn buffer(&self, _id: BufferId) -> Option<&[u8]> {
        None
    }
}

impl ReferenceResolver for std::collections::HashMap<BufferId, Vec<u8>> {
    fn buffer(&self, id: BufferId) -> Option<&[u8]> {
        self.get(&id).map(Vec::as_slice)
    }
}

fn is_printable(byte: u8) -> bool {
    (0x20..=0x7E).contains(&byte) || byte >= 0xA0
}

fn printable_or_dot(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if is_printable(b) { b as char } else { '.' })
        .collect()
}

/// The bytes of the range as one big-endian numeral, if they fit in 128 bits.
///
/// Ranges wider than 16 bytes render as [`INVALID`] rather than switching to
/// arbitrary precision; a pointer that wide is not addressing anything real.
fn numeral(slice: &[u8]) -> Option<u128> {
    if slice.is_empty() || slice.len() > 16 {
        return None;
    }
    let mut v = 0u128;
    for &b in slice {
        v = (v << 8) | u128::from(b);
    }
    Some(v)
}

fn segment_value(slice: &[u8], endian: Endianness, kind: ValueKind) -> Option<i128> {
    let width = slice.len();
    if !matches!(width, 1 | 2 | 4 | 8) {
        return None;
    }
    let mut raw = 0u64;
    match endian {
        Endianness::Little => {
            for &b in slice.iter().rev() {
                raw = (raw << 8) | u64::from(b);
            }
        }
        Endianness::Big => {
            for &b in slice {
                raw = (raw << 8) | u64::from(b);
            }
        }
    }
    Some(match kind {
        ValueKind::Unsigned => i128::from(raw),
        ValueKind::Signed => {
            let shift = 64 - width as u32 * 8;
            i128::from(((raw << shift) as i64) >> shift)
        }
    })
}

/// Renders the range `desc` describes within `data`, or [`INVALID`].
pub fn interpret(data: &[u8], desc: &Descriptor, refs: &dyn ReferenceResolver) -> String {
    match try_interpret(data, desc, refs) {
        Some(text) => text,
        None => INVALID.to_string(),
    }
}

fn try_interpret(data: &[u8], desc: &Descriptor, refs: &dyn ReferenceResolver) -> Option<String> {
    let slice = data.get(desc.offset..desc.offset.checked_add(desc.length)?)?;
    if slice.is_empty() {
        return None;
    }
    if let Some(width) = desc.tag.fixed_width() {
        // a typed range of the wrong size renders invalid rather than
        // silently reading fewer bytes than the user selected
        if desc.length != width {
            return None;
        }
    }
    match desc.tag {
        TypeTag::Hex => {
            let parts: Vec<String> = slice.iter().map(|b| format!("{b:02X}")).collect();
            Some(parts.join(" "))
        }
        TypeTag::StringAscii => Some(printable_or_dot(slice)),
        TypeTag::Offset => numeral(slice).map(|v| format!("{v:X}")),
        TypeTag::Segment => {
            let value = segment_value(slice, desc.endian, desc.value_kind)?;
            let start = desc.segment_start;
            let end = if value > 0 {
                start.checked_add(usize::try_from(value - 1).ok()?)?
            } else {
                start
            };
            Some(format!("0x{start:X}-0x{end:X}: {value}"))
        }
        TypeTag::StringAtOffset => {
            let target = usize::try_from(numeral(slice)?).ok()?;
            if target >= data.len() {
                return None;
            }
            let end = (target + STRING_LOOKUP_LIMIT).min(data.len());
            let mut bytes = &data[target..end];
            if let Some(nul) = bytes.iter().position(|&b| b == 0) {
                bytes = &bytes[..nul];
            }
            if bytes.is_empty() {
                return None;
            }
            Some(printable_or_dot(bytes))
        }
        TypeTag::StringInReferenceBuffer => {
            let reference = refs.buffer(desc.reference_buffer?)?;
            let target = usize::try_from(numeral(slice)?).ok()?;
            if target >= reference.len() {
                return None;
            }
            // the stored offset may point into the middle of the string;
            // walk back to its first printable byte
            let mut start = target;
            while start > 0 && reference[start - 1] != 0 && is_printable(reference[start - 1]) {
                start -= 1;
            }
            let end = (start + STRING_LOOKUP_LIMIT).min(reference.len());
            let mut bytes = &reference[start..end];
            if let Some(nul) = bytes.iter().position(|&b| b == 0) {
                bytes = &bytes[..nul];
            }
            if bytes.is_empty() {
                return None;
            }
            Some(printable_or_dot(bytes))
        }
        _ => codec::decode(slice, desc.tag, desc.endian)
            .ok()
            .map(|d| d.value.to_string()),
    }
}

/// Parses edited text back into exactly the bytes the range holds.
pub fn parse(text: &str, desc: &Descriptor) -> Result<Vec<u8>, EncodeError> {
    let invalid = || EncodeError::InvalidFormat {
        tag: desc.tag,
        text: text.to_string(),
    };
    match desc.tag {
        TypeTag::Hex => {
            let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
            if compact.len() % 2 != 0 || compact.is_empty() {
                return Err(invalid());
            }
            let mut bytes = (0..compact.len() / 2)
                .map(|i| u8::from_str_radix(&compact[i * 2..i * 2 + 2], 16))
                .collect::<Result<Vec<u8>, _>>()
                .map_err(|_| invalid())?;
            bytes.truncate(desc.length);
            bytes.resize(desc.length, 0);
            Ok(bytes)
        }
        TypeTag::StringAscii => {
            let mut bytes = text.as_bytes().to_vec();
            bytes.truncate(desc.length);
            bytes.resize(desc.length, 0);
            Ok(bytes)
        }
        TypeTag::Offset => {
            let mut digits: String = text.trim().to_string();
            if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(invalid());
            }
            if digits.len() % 2 != 0 {
                digits.insert(0, '0');
            }
            let mut bytes = (0..digits.len() / 2)
                .map(|i| u8::from_str_radix(&digits[i * 2..i * 2 + 2], 16))
                .collect::<Result<Vec<u8>, _>>()
                .map_err(|_| invalid())?;
            bytes.truncate(desc.length);
            bytes.resize(desc.length, 0);
            Ok(bytes)
        }
        TypeTag::Segment => {
            let tag = match (desc.length, desc.value_kind) {
                (1, ValueKind::Signed) => TypeTag::Int8,
                (1, ValueKind::Unsigned) => TypeTag::UInt8,
                (2, ValueKind::Signed) => TypeTag::Int16,
                (2, ValueKind::Unsigned) => TypeTag::UInt16,
                (4, ValueKind::Signed) => TypeTag::Int32,
                (4, ValueKind::Unsigned) => TypeTag::UInt32,
                (8, ValueKind::Signed) => TypeTag::Int64,
                (8, ValueKind::Unsigned) => TypeTag::UInt64,
                _ => return Err(EncodeError::Unsupported(TypeTag::Segment)),
            };
            codec::encode(text, tag, desc.endian)
        }
        TypeTag::StringAtOffset | TypeTag::StringInReferenceBuffer => {
            Err(EncodeError::Unsupported(desc.tag))
        }
        tag => {
            let bytes = codec::encode(text, tag, desc.endian)?;
            match tag.fixed_width() {
                Some(width) if width != desc.length => Err(EncodeError::LengthMismatch {
                    tag,
                    expected: desc.length,
                    got: width,
                }),
                _ => Ok(bytes),
            }
        }
    }
}
