//! Fields and their nested subfields
//!
//! A `Field` is a user-labeled half-open byte range `[start, end)`; its
//! subfields carry a type interpretation and may nest arbitrarily deep. The
//! shift rules here are what keep every range pointing at the same logical
//! content while the host inserts or deletes bytes.

use serde::{Deserialize, Serialize};

use crate::codec::{Endianness, TypeTag};
use crate::BufferId;

/// New endpoints for `[start, end)` after `len` bytes are inserted at `pos`.
///
/// Insertion at the exact start shifts the whole range; insertion strictly
/// inside grows it; insertion at or past the end leaves it alone.
pub fn shift_for_insert(start: usize, end: usize, pos: usize, len: usize) -> (usize, usize) {
    if pos <= start {
        (start + len, end + len)
    } else if pos < end {
        (start, end + len)
    } else {
        (start, end)
    }
}

/// New endpoints for `[start, end)` after `len` bytes are deleted at `pos`.
///
/// A deletion that swallows the range collapses it to zero length at `pos`;
/// it never ends up with `start > end`.
pub fn shift_for_delete(start: usize, end: usize, pos: usize, len: usize) -> (usize, usize) {
    if pos + len <= start {
        (start - len, end - len)
    } else if pos < end {
        if pos <= start {
            (pos, end.saturating_sub(len).max(pos))
        } else {
            (start, end - len.min(end - pos))
        }
    } else {
        (start, end)
    }
}

/// Whether `tag` is a legal interpretation for a range of `len` bytes.
pub fn tag_fits(tag: TypeTag, len: usize) -> bool {
    if len == 0 {
        return false;
    }
    match tag.fixed_width() {
        Some(width) => width <= len,
        None => match tag {
            TypeTag::Segment => matches!(len, 1 | 2 | 4 | 8),
            _ => true,
        },
    }
}

/// A typed sub-range of a field. Children must not be reparented outside
/// their top-level field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subfield {
    pub id: u64,
    pub name: String,
    pub start: usize,
    pub end: usize,
    pub tag: TypeTag,
    pub endian: Endianness,
    pub children: Vec<Subfield>,
}

impl Subfield {
    pub fn new(id: u64, name: impl Into<String>, start: usize, end: usize, tag: TypeTag) -> Self {
        Subfield {
            id,
            name: name.into(),
            start,
            end,
            tag,
            endian: Endianness::Little,
            children: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub(crate) fn adjust_for_insert(&mut self, pos: usize, len: usize) {
        let (s, e) = shift_for_insert(self.start, self.end, pos, len);
        self.start = s;
        self.end = e;
        for child in &mut self.children {
            child.adjust_for_insert(pos, len);
        }
    }

    pub(crate) fn adjust_for_delete(&mut self, pos: usize, len: usize) {
        let (s, e) = shift_for_delete(self.start, self.end, pos, len);
        self.start = s;
        self.end = e;
        for child in &mut self.children {
            child.adjust_for_delete(pos, len);
        }
    }

    pub(crate) fn find(&self, id: u64) -> Option<&Subfield> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }

    pub(crate) fn find_mut(&mut self, id: u64) -> Option<&mut Subfield> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(id))
    }

    pub(crate) fn remove_child(&mut self, id: u64) -> Option<Subfield> {
        if let Some(idx) = self.children.iter().position(|c| c.id == id) {
            return Some(self.children.remove(idx));
        }
        self.children.iter_mut().find_map(|c| c.remove_child(id))
    }

    pub(crate) fn contains_id(&self, id: u64) -> bool {
        self.find(id).is_some()
    }
}

/// A labeled top-level range with nested typed subfields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub id: u64,
    pub label: String,
    pub start: usize,
    pub end: usize,
    pub buffer: BufferId,
    pub subfields: Vec<Subfield>,
}

impl Field {
    pub fn new(
        id: u64,
        label: impl Into<String>,
        start: usize,
        end: usize,
        buffer: BufferId,
    ) -> Self {
        Field {
            id,
            label: label.into(),
            start,
            end,
            buffer,
            subfields: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether `[start, end)` lies entirely inside this field.
    pub fn contains_range(&self, start: usize, end: usize) -> bool {
        start >= self.start && end <= self.end && start < end
    }

    pub(crate) fn adjust_for_insert(&mut self, pos: usize, len: usize) {
        let (s, e) = shift_for_insert(self.start, self.end, pos, len);
        self.start = s;
        self.end = e;
        for sub in &mut self.subfields {
            sub.adjust_for_insert(pos, len);
        }
    }

    pub(crate) fn adjust_for_delete(&mut self, pos: usize, len: usize) {
        let (s, e) = shift_for_delete(self.start, self.end, pos, len);
        self.start = s;
        self.end = e;
        for sub in &mut self.subfields {
            sub.adjust_for_delete(pos, len);
        }
    }

    pub(crate) fn find_subfield(&self, id: u64) -> Option<&Subfield> {
        self.subfields.iter().find_map(|s| s.find(id))
    }

    pub(crate) fn find_subfield_mut(&mut self, id: u64) -> Option<&mut Subfield> {
        self.subfields.iter_mut().find_map(|s| s.find_mut(id))
    }

    pub(crate) fn remove_subfield(&mut self, id: u64) -> Option<Subfield> {
        if let Some(idx) = self.subfields.iter().position(|s| s.id == id) {
            return Some(self.subfields.remove(idx));
        }
        self.subfields.iter_mut().find_map(|s| s.remove_child(id))
    }

    pub(crate) fn owns_subfield(&self, id: u64) -> bool {
        self.subfields.iter().any(|s| s.contains_id(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_before_shifts_the_whole_range() {
        assert_eq!(shift_for_insert(10, 20, 5, 4), (14, 24));
        assert_eq!(shift_for_insert(10, 20, 10, 4), (14, 24));
    }

    #[test]
    fn insert_inside_grows_the_range() {
        assert_eq!(shift_for_insert(10, 20, 11, 4), (10, 24));
        assert_eq!(shift_for_insert(10, 20, 19, 4), (10, 24));
    }

    #[test]
    fn insert_at_or_after_end_is_ignored() {
        assert_eq!(shift_for_insert(10, 20, 20, 4), (10, 20));
        assert_eq!(shift_for_insert(10, 20, 25, 4), (10, 20));
    }

    #[test]
    fn delete_entirely_before_shifts_back() {
        assert_eq!(shift_for_delete(10, 20, 2, 4), (6, 16));
        assert_eq!(shift_for_delete(10, 20, 6, 4), (6, 16));
    }

    #[test]
    fn delete_overlapping_start_clamps_to_deletion_point() {
        // deletes [8, 14): 4 bytes of the field survive
        assert_eq!(shift_for_delete(10, 20, 8, 6), (8, 14));
    }

    #[test]
    fn delete_inside_shrinks_the_end() {
        assert_eq!(shift_for_delete(10, 20, 12, 4), (10, 16));
        // deletion runs past the end: only [12, 20) is removed
        assert_eq!(shift_for_delete(10, 20, 12, 100), (10, 12));
    }

    #[test]
    fn delete_swallowing_the_range_collapses_it() {
        assert_eq!(shift_for_delete(10, 20, 5, 30), (5, 5));
        assert_eq!(shift_for_delete(10, 20, 10, 10), (10, 10));
    }

    #[test]
    fn delete_at_or_after_end_is_ignored() {
        assert_eq!(shift_for_delete(10, 20, 20, 4), (10, 20));
        assert_eq!(shift_for_delete(10, 20, 30, 4), (10, 20));
    }

    #[test]
    fn shifts_never_invert_the_range() {
        for pos in 0..30 {
            for len in 1..25 {
                let (s, e) = shift_for_delete(10, 20, pos, len);
                assert!(s <= e, "inverted after delete at {pos}+{len}");
                let (s, e) = shift_for_insert(10, 20, pos, len);
                assert!(s <= e, "inverted after insert at {pos}+{len}");
            }
        }
    }

    #[test]
    fn nested_subfields_shift_with_their_parent() {
        let mut field = Field::new(1, "header", 10, 30, BufferId(0));
        let mut sub = Subfield::new(2, "magic", 12, 16, TypeTag::UInt32);
        sub.children.push(Subfield::new(3, "lo", 12, 14, TypeTag::UInt16));
        field.subfields.push(sub);

        field.adjust_for_insert(0, 8);
        assert_eq!((field.start, field.end), (18, 38));
        assert_eq!(
            (field.subfields[0].start, field.subfields[0].end),
            (20, 24)
        );
        let child = &field.subfields[0].children[0];
        assert_eq!((child.start, child.end), (20, 22));

        field.adjust_for_delete(0, 8);
        assert_eq!((field.start, field.end), (10, 30));
        let child = &field.subfields[0].children[0];
        assert_eq!((child.start, child.end), (12, 14));
    }

    #[test]
    fn tag_fits_respects_fixed_widths() {
        assert!(tag_fits(TypeTag::Int8, 1));
        assert!(tag_fits(TypeTag::UInt32, 8));
        assert!(!tag_fits(TypeTag::UInt32, 3));
        assert!(tag_fits(TypeTag::Hex, 5));
        assert!(tag_fits(TypeTag::Segment, 4));
        assert!(!tag_fits(TypeTag::Segment, 3));
        assert!(!tag_fits(TypeTag::Hex, 0));
    }
}
