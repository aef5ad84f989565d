//! Applying a textual edit to a buffer
//!
//! The contract is encode-first: the text is fully converted to bytes before
//! a single byte of the buffer changes, so a rejected edit leaves the buffer
//! exactly as it was.

use crate::error::EncodeError;
use crate::interpret::{self, Descriptor};

/// The byte range an edit actually touched, for redraw and undo capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyRange {
    pub offset: usize,
    pub len: usize,
}

impl DirtyRange {
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn offsets(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.len
    }
}

/// Parses `text` per the descriptor and writes the result at its offset.
///
/// Bytes that would land past the end of the buffer are clipped; the
/// returned range covers only what was written.
pub fn apply_edit(
    data: &mut [u8],
    desc: &Descriptor,
    text: &str,
) -> Result<DirtyRange, EncodeError> {
    let bytes = match interpret::parse(text, desc) {
        Ok(bytes) => bytes,
        Err(err) => {
            log::debug!("edit rejected at {:#X}: {err}", desc.offset);
            return Err(err);
        }
    };
    let writable = data.len().saturating_sub(desc.offset).min(bytes.len());
    if writable > 0 {
        data[desc.offset..desc.offset + writable].copy_from_slice(&bytes[..writable]);
    }
    Ok(DirtyRange {
        offset: desc.offset,
        len: writable,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::TypeTag;

    #[test]
    fn a_successful_edit_reports_the_written_range() {
        let mut data = [0u8; 8];
        let desc = Descriptor::new(2, 4, TypeTag::UInt32);
        let dirty = apply_edit(&mut data, &desc, "258").unwrap();
        assert_eq!(dirty, DirtyRange { offset: 2, len: 4 });
        assert_eq!(dirty.offsets(), 2..6);
        assert_eq!(data, [0, 0, 0x02, 0x01, 0, 0, 0, 0]);
    }

    #[test]
    fn a_failed_encode_leaves_the_buffer_untouched() {
        let mut data = [0xAAu8; 4];
        let desc = Descriptor::new(0, 1, TypeTag::Int8);
        let err = apply_edit(&mut data, &desc, "99999").unwrap_err();
        assert!(matches!(err, EncodeError::OutOfRange { .. }));
        assert_eq!(data, [0xAA; 4]);
    }

    #[test]
    fn writes_are_clipped_at_the_end_of_the_buffer() {
        let mut data = [0u8; 3];
        let desc = Descriptor::new(1, 4, TypeTag::Hex);
        let dirty = apply_edit(&mut data, &desc, "01 02 03 04").unwrap();
        assert_eq!(dirty, DirtyRange { offset: 1, len: 2 });
        assert_eq!(data, [0, 0x01, 0x02]);
    }

    #[test]
    fn an_edit_entirely_past_the_end_writes_nothing() {
        let mut data = [0u8; 2];
        let desc = Descriptor::new(5, 2, TypeTag::Hex);
        let dirty = apply_edit(&mut data, &desc, "AB CD").unwrap();
        assert!(dirty.is_empty());
        assert_eq!(data, [0, 0]);
    }

    #[test]
    fn string_edits_overwrite_the_whole_range() {
        let mut data = *b"________";
        let desc = Descriptor::new(1, 5, TypeTag::StringAscii);
        apply_edit(&mut data, &desc, "hi").unwrap();
        assert_eq!(&data, b"_hi\x00\x00\x00__");
    }
}
