//! Pointer annotations and bulk signature search

use serde::{Deserialize, Serialize};

use crate::codec::{Endianness, TypeTag};
use crate::BufferId;

/// Signedness of a numeric interpretation, used by segment rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    #[default]
    Unsigned,
    Signed,
}

/// A typed single location, usually created by a signature search.
///
/// Unlike a [`super::Field`] a pointer has no children; it carries enough
/// context (segment anchor, originating pattern, optional reference buffer)
/// for the interpreter to render it without re-running the search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pointer {
    pub id: u64,
    pub label: String,
    pub category: String,
    pub offset: usize,
    pub length: usize,
    pub tag: TypeTag,
    pub endian: Endianness,
    pub value_kind: ValueKind,
    /// Anchor for [`TypeTag::Segment`] rendering; equals `offset` otherwise.
    pub segment_start: usize,
    /// Pattern that produced this pointer, if any.
    pub pattern: Option<Vec<u8>>,
    /// Buffer that indirect string lookups resolve into.
    pub reference_buffer: Option<BufferId>,
    pub buffer: BufferId,
}

impl Pointer {
    pub fn new(id: u64, offset: usize, length: usize, tag: TypeTag, buffer: BufferId) -> Self {
        Pointer {
            id,
            label: String::new(),
            category: String::new(),
            offset,
            length,
            tag,
            endian: Endianness::Little,
            value_kind: ValueKind::Unsigned,
            segment_start: offset,
            pattern: None,
            reference_buffer: None,
            buffer,
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    pub(crate) fn adjust_for_insert(&mut self, pos: usize, len: usize) {
        let (s, e) = super::field::shift_for_insert(self.offset, self.end(), pos, len);
        self.offset = s;
        self.length = e - s;
        if pos <= self.segment_start {
            self.segment_start += len;
        }
    }

    pub(crate) fn adjust_for_delete(&mut self, pos: usize, len: usize) {
        let (s, e) = super::field::shift_for_delete(self.offset, self.end(), pos, len);
        self.offset = s;
        self.length = e - s;
        if pos < self.segment_start {
            self.segment_start -= len.min(self.segment_start - pos);
        }
    }
}

/// How to type the pointers a bulk search creates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointerTemplate {
    pub tag: TypeTag,
    pub endian: Endianness,
    pub length: usize,
    pub category: String,
    pub value_kind: ValueKind,
    pub reference_buffer: Option<BufferId>,
}

impl PointerTemplate {
    pub fn new(tag: TypeTag, length: usize) -> Self {
        PointerTemplate {
            tag,
            endian: Endianness::Little,
            length,
            category: String::new(),
            value_kind: ValueKind::Unsigned,
            reference_buffer: None,
        }
    }
}

/// Finds every occurrence of `pattern` and creates a pointer just past each
/// match, labeled `Result_0`, `Result_1`, ...
///
/// Matches advance one byte at a time so overlapping occurrences all count.
/// A match too close to the end of the buffer for the template length yields
/// no pointer. IDs start at `first_id` and increment.
pub fn search_pointers(
    data: &[u8],
    pattern: &[u8],
    template: &PointerTemplate,
    buffer: BufferId,
    first_id: u64,
) -> Vec<Pointer> {
    let mut out = Vec::new();
    if pattern.is_empty() || data.len() < pattern.len() {
        return out;
    }
    let mut pos = 0;
    while pos + pattern.len() <= data.len() {
        if &data[pos..pos + pattern.len()] != pattern {
            pos += 1;
            continue;
        }
        let value_offset = pos + pattern.len();
        if value_offset + template.length <= data.len() {
            let n = out.len();
            let mut ptr = Pointer::new(
                first_id + n as u64,
                value_offset,
                template.length,
                template.tag,
                buffer,
            )
            .with_label(format!("Result_{n}"))
            .with_category(template.category.clone());
            ptr.endian = template.endian;
            ptr.value_kind = template.value_kind;
            ptr.reference_buffer = template.reference_buffer;
            ptr.pattern = Some(pattern.to_vec());
            if template.tag == TypeTag::Segment {
                ptr.segment_start = pos;
            }
            out.push(ptr);
        }
        pos += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointers_land_just_past_each_match() {
        let data = b"..MAGIC\x10\x00..MAGIC\x20\x00";
        let template = PointerTemplate::new(TypeTag::UInt16, 2);
        let ptrs = search_pointers(data, b"MAGIC", &template, BufferId(0), 100);
        assert_eq!(ptrs.len(), 2);
        assert_eq!(ptrs[0].offset, 7);
        assert_eq!(ptrs[0].label, "Result_0");
        assert_eq!(ptrs[0].id, 100);
        assert_eq!(ptrs[1].offset, 16);
        assert_eq!(ptrs[1].label, "Result_1");
        assert_eq!(ptrs[1].id, 101);
    }

    #[test]
    fn overlapping_matches_all_count() {
        let data = b"aaaa\x01";
        let template = PointerTemplate::new(TypeTag::UInt8, 1);
        let ptrs = search_pointers(data, b"aa", &template, BufferId(0), 0);
        assert_eq!(ptrs.len(), 3);
        assert_eq!(
            ptrs.iter().map(|p| p.offset).collect::<Vec<_>>(),
            vec![2, 3, 4]
        );
    }

    #[test]
    fn match_too_close_to_the_end_yields_nothing() {
        let data = b"..MAGIC\x10";
        let template = PointerTemplate::new(TypeTag::UInt32, 4);
        assert!(search_pointers(data, b"MAGIC", &template, BufferId(0), 0).is_empty());
    }

    #[test]
    fn segment_pointers_anchor_at_the_match() {
        let data = b"SEG\x04\x00\x00\x00\x00\x00\x00\x00";
        let mut template = PointerTemplate::new(TypeTag::Segment, 4);
        template.value_kind = ValueKind::Signed;
        let ptrs = search_pointers(data, b"SEG", &template, BufferId(0), 0);
        assert_eq!(ptrs.len(), 1);
        assert_eq!(ptrs[0].offset, 3);
        assert_eq!(ptrs[0].segment_start, 0);
        assert_eq!(ptrs[0].value_kind, ValueKind::Signed);
    }

    #[test]
    fn pointer_ranges_shift_like_fields() {
        let mut ptr = Pointer::new(1, 10, 4, TypeTag::UInt32, BufferId(0));
        ptr.segment_start = 8;
        ptr.adjust_for_insert(0, 6);
        assert_eq!((ptr.offset, ptr.length, ptr.segment_start), (16, 4, 14));
        ptr.adjust_for_delete(0, 6);
        assert_eq!((ptr.offset, ptr.length, ptr.segment_start), (10, 4, 8));
        // deletion through the middle shortens it
        ptr.adjust_for_delete(11, 2);
        assert_eq!((ptr.offset, ptr.length), (10, 2));
    }
}
