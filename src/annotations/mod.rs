//! Range annotations: fields, subfields and pointers
//!
//! The [`AnnotationStore`] owns every annotation across all open buffers and
//! is the single place the host notifies about byte insertions and deletions;
//! the store fans the shift out to every range it holds. IDs are unique
//! across fields, subfields and pointers.

pub mod field;
pub mod pointer;

use serde::{Deserialize, Serialize};

use crate::codec::{Endianness, TypeTag};
use crate::error::RangeError;
use crate::BufferId;

pub use field::{shift_for_delete, shift_for_insert, tag_fits, Field, Subfield};
pub use pointer::{search_pointers, Pointer, PointerTemplate, ValueKind};

/// Where a subfield is being moved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReparentDest {
    /// Top level of the field with this ID.
    Field(u64),
    /// Child of the subfield with this ID.
    Subfield(u64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Clipboard {
    start: usize,
    end: usize,
    buffer: BufferId,
}

/// All annotations for every open buffer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnnotationStore {
    fields: Vec<Field>,
    pointers: Vec<Pointer>,
    next_id: u64,
    clipboard: Option<Clipboard>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn fields_for(&self, buffer: BufferId) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(move |f| f.buffer == buffer)
    }

    pub fn field(&self, id: u64) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == id)
    }

    fn field_mut(&mut self, id: u64) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.id == id)
    }

    pub fn subfield(&self, id: u64) -> Option<&Subfield> {
        self.fields.iter().find_map(|f| f.find_subfield(id))
    }

    fn subfield_mut(&mut self, id: u64) -> Option<&mut Subfield> {
        self.fields.iter_mut().find_map(|f| f.find_subfield_mut(id))
    }

    /// Index of the top-level field owning this subfield, if any.
    fn field_index_of_subfield(&self, id: u64) -> Option<usize> {
        self.fields.iter().position(|f| f.owns_subfield(id))
    }

    /// Creates a field over `[start, end)`.
    ///
    /// Pointers already lying entirely inside the range become subfields, so
    /// the user keeps their search results when grouping bytes into a
    /// structure.
    pub fn add_field(
        &mut self,
        label: impl Into<String>,
        start: usize,
        end: usize,
        buffer: BufferId,
    ) -> Result<u64, RangeError> {
        if start >= end {
            return Err(RangeError::StartNotBelowEnd { start, end });
        }
        let id = self.alloc_id();
        let mut field = Field::new(id, label, start, end, buffer);
        let mut derived: Vec<(String, usize, usize, TypeTag, Endianness)> = self
            .pointers
            .iter()
            .filter(|p| p.buffer == buffer && p.offset >= start && p.end() <= end)
            .map(|p| (p.label.clone(), p.offset, p.end(), p.tag, p.endian))
            .collect();
        derived.sort_by_key(|d| d.1);
        for (name, s, e, tag, endian) in derived {
            let mut sub = Subfield::new(self.alloc_id(), name, s, e, tag);
            sub.endian = endian;
            field.subfields.push(sub);
        }
        self.fields.push(field);
        Ok(id)
    }

    pub fn remove_field(&mut self, id: u64) -> Option<Field> {
        let idx = self.fields.iter().position(|f| f.id == id)?;
        Some(self.fields.remove(idx))
    }

    pub fn remove_subfield(&mut self, id: u64) -> Option<Subfield> {
        self.fields.iter_mut().find_map(|f| f.remove_subfield(id))
    }

    #[must_use = "renaming fails when the ID is unknown"]
    pub fn rename_field(&mut self, id: u64, label: impl Into<String>) -> bool {
        match self.field_mut(id) {
            Some(f) => {
                f.label = label.into();
                true
            }
            None => false,
        }
    }

    #[must_use = "renaming fails when the ID is unknown"]
    pub fn rename_subfield(&mut self, id: u64, name: impl Into<String>) -> bool {
        match self.subfield_mut(id) {
            Some(s) => {
                s.name = name.into();
                true
            }
            None => false,
        }
    }

    /// The field whose range entirely contains `[start, end)`, if any.
    pub fn field_containing(&self, start: usize, end: usize, buffer: BufferId) -> Option<&Field> {
        self.fields
            .iter()
            .find(|f| f.buffer == buffer && f.contains_range(start, end))
    }

    /// Records a copied selection. When the selection lies inside an existing
    /// field a hex subfield is appended to it immediately and its ID
    /// returned; otherwise the range is only remembered for a later paste.
    pub fn copy_segment(&mut self, start: usize, end: usize, buffer: BufferId) -> Option<u64> {
        if start >= end {
            return None;
        }
        self.clipboard = Some(Clipboard { start, end, buffer });
        let idx = self
            .fields
            .iter()
            .position(|f| f.buffer == buffer && f.contains_range(start, end))?;
        let id = self.alloc_id();
        let n = self.fields[idx].subfields.len();
        self.fields[idx].subfields.push(Subfield::new(
            id,
            format!("Subfield_{n}"),
            start,
            end,
            TypeTag::Hex,
        ));
        Some(id)
    }

    /// Pastes the remembered selection as a new top-level subfield.
    ///
    /// Rejected when there is nothing on the clipboard, the clipboard came
    /// from another buffer, or the range does not fit inside the field.
    pub fn paste_into_field(&mut self, field_id: u64) -> Option<u64> {
        let clip = self.clipboard.clone()?;
        let idx = self.fields.iter().position(|f| f.id == field_id)?;
        let field = &self.fields[idx];
        if field.buffer != clip.buffer || !field.contains_range(clip.start, clip.end) {
            return None;
        }
        let id = self.alloc_id();
        let n = self.fields[idx].subfields.len();
        self.fields[idx].subfields.push(Subfield::new(
            id,
            format!("Subfield_{n}"),
            clip.start,
            clip.end,
            TypeTag::Hex,
        ));
        Some(id)
    }

    /// Pastes the remembered selection as a child of an existing subfield.
    pub fn paste_into_subfield(&mut self, subfield_id: u64) -> Option<u64> {
        let clip = self.clipboard.clone()?;
        let field_idx = self.field_index_of_subfield(subfield_id)?;
        if self.fields[field_idx].buffer != clip.buffer {
            return None;
        }
        let id = self.next_id;
        let parent = self.fields[field_idx].find_subfield_mut(subfield_id)?;
        if clip.start < parent.start || clip.end > parent.end {
            return None;
        }
        let n = parent.children.len();
        parent.children.push(Subfield::new(
            id,
            format!("Subfield_{n}"),
            clip.start,
            clip.end,
            TypeTag::Hex,
        ));
        self.next_id += 1;
        Some(id)
    }

    pub fn set_field_range(
        &mut self,
        id: u64,
        start: usize,
        end: usize,
        buffer_len: usize,
    ) -> Result<(), RangeError> {
        validate_range(start, end, buffer_len)?;
        if let Some(field) = self.field_mut(id) {
            field.start = start;
            field.end = end;
        }
        Ok(())
    }

    pub fn set_subfield_range(
        &mut self,
        id: u64,
        start: usize,
        end: usize,
        buffer_len: usize,
    ) -> Result<(), RangeError> {
        validate_range(start, end, buffer_len)?;
        if let Some(sub) = self.subfield_mut(id) {
            sub.start = start;
            sub.end = end;
        }
        Ok(())
    }

    /// Changes a subfield's type. Fails when the type does not fit the
    /// current byte length. Switching to an order-insensitive type resets the
    /// stored endianness.
    #[must_use = "retyping fails when the type does not fit the range"]
    pub fn retype_subfield(&mut self, id: u64, tag: TypeTag) -> bool {
        let Some(sub) = self.subfield_mut(id) else {
            return false;
        };
        if !tag_fits(tag, sub.end - sub.start) {
            return false;
        }
        sub.tag = tag;
        if !tag.needs_endianness() {
            sub.endian = Default::default();
        }
        true
    }

    #[must_use = "toggling fails when the ID is unknown"]
    pub fn toggle_subfield_endian(&mut self, id: u64) -> bool {
        match self.subfield_mut(id) {
            Some(sub) => {
                sub.endian = sub.endian.toggled();
                true
            }
            None => false,
        }
    }

    /// Moves a subfield to a new parent.
    ///
    /// Allowed only within one top-level field, and never into the moved
    /// subfield's own subtree. A rejected move leaves the store untouched.
    #[must_use = "an illegal move is rejected without mutating anything"]
    pub fn reparent_subfield(&mut self, sub_id: u64, dest: ReparentDest) -> bool {
        let Some(src_idx) = self.field_index_of_subfield(sub_id) else {
            return false;
        };
        let dest_idx = match dest {
            ReparentDest::Field(field_id) => {
                match self.fields.iter().position(|f| f.id == field_id) {
                    Some(i) => i,
                    None => return false,
                }
            }
            ReparentDest::Subfield(parent_id) => {
                if parent_id == sub_id {
                    return false;
                }
                // moving under one's own descendant would orphan the subtree
                if let Some(sub) = self.subfield(sub_id) {
                    if sub.contains_id(parent_id) {
                        return false;
                    }
                }
                match self.field_index_of_subfield(parent_id) {
                    Some(i) => i,
                    None => return false,
                }
            }
        };
        if src_idx != dest_idx {
            return false;
        }
        let Some(moved) = self.fields[src_idx].remove_subfield(sub_id) else {
            return false;
        };
        match dest {
            ReparentDest::Field(_) => self.fields[dest_idx].subfields.push(moved),
            ReparentDest::Subfield(parent_id) => {
                // parent was verified above, remove_subfield cannot have
                // detached it because it is outside the moved subtree
                match self.fields[dest_idx].find_subfield_mut(parent_id) {
                    Some(parent) => parent.children.push(moved),
                    None => {
                        self.fields[dest_idx].subfields.push(moved);
                        return false;
                    }
                }
            }
        }
        true
    }

    pub fn pointers(&self) -> &[Pointer] {
        &self.pointers
    }

    pub fn pointers_for(&self, buffer: BufferId) -> impl Iterator<Item = &Pointer> {
        self.pointers.iter().filter(move |p| p.buffer == buffer)
    }

    pub fn pointer(&self, id: u64) -> Option<&Pointer> {
        self.pointers.iter().find(|p| p.id == id)
    }

    pub fn pointer_mut(&mut self, id: u64) -> Option<&mut Pointer> {
        self.pointers.iter_mut().find(|p| p.id == id)
    }

    /// Creates a bare pointer; callers configure it via [`Self::pointer_mut`].
    pub fn add_pointer(
        &mut self,
        offset: usize,
        length: usize,
        tag: TypeTag,
        buffer: BufferId,
    ) -> u64 {
        let id = self.alloc_id();
        self.pointers.push(Pointer::new(id, offset, length, tag, buffer));
        id
    }

    /// Takes ownership of externally built pointers (typically a search
    /// worker's results), reassigning their IDs into this store's sequence.
    pub fn adopt_pointers(&mut self, pointers: Vec<Pointer>) {
        for mut ptr in pointers {
            ptr.id = self.alloc_id();
            self.pointers.push(ptr);
        }
    }

    pub fn remove_pointer(&mut self, id: u64) -> Option<Pointer> {
        let idx = self.pointers.iter().position(|p| p.id == id)?;
        Some(self.pointers.remove(idx))
    }

    pub fn clear_pointers(&mut self, buffer: BufferId) {
        self.pointers.retain(|p| p.buffer != buffer);
    }

    /// Serializes the whole store, e.g. for a project sidecar file.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Shifts every annotation of `buffer` for an insertion of `len` bytes
    /// at `pos`.
    pub fn adjust_for_insert(&mut self, buffer: BufferId, pos: usize, len: usize) {
        if len == 0 {
            return;
        }
        for field in self.fields.iter_mut().filter(|f| f.buffer == buffer) {
            field.adjust_for_insert(pos, len);
        }
        for ptr in self.pointers.iter_mut().filter(|p| p.buffer == buffer) {
            ptr.adjust_for_insert(pos, len);
        }
        if let Some(clip) = &mut self.clipboard {
            if clip.buffer == buffer {
                let (s, e) = shift_for_insert(clip.start, clip.end, pos, len);
                clip.start = s;
                clip.end = e;
            }
        }
    }

    /// Shifts every annotation of `buffer` for a deletion of `len` bytes at
    /// `pos`.
    pub fn adjust_for_delete(&mut self, buffer: BufferId, pos: usize, len: usize) {
        if len == 0 {
            return;
        }
        for field in self.fields.iter_mut().filter(|f| f.buffer == buffer) {
            field.adjust_for_delete(pos, len);
        }
        for ptr in self.pointers.iter_mut().filter(|p| p.buffer == buffer) {
            ptr.adjust_for_delete(pos, len);
        }
        if let Some(clip) = &mut self.clipboard {
            if clip.buffer == buffer {
                let (s, e) = shift_for_delete(clip.start, clip.end, pos, len);
                clip.start = s;
                clip.end = e;
            }
        }
    }
}

fn validate_range(start: usize, end: usize, buffer_len: usize) -> Result<(), RangeError> {
    if start >= end {
        return Err(RangeError::StartNotBelowEnd { start, end });
    }
    if end > buffer_len {
        return Err(RangeError::OutOfBounds {
            end,
            len: buffer_len,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUF: BufferId = BufferId(0);
    const OTHER: BufferId = BufferId(1);

    #[test]
    fn new_field_adopts_contained_pointers_as_subfields() {
        let mut store = AnnotationStore::new();
        let inside = store.add_pointer(12, 4, TypeTag::UInt32, BUF);
        store.pointer_mut(inside).unwrap().label = "count".into();
        store.add_pointer(4, 2, TypeTag::UInt16, BUF); // before the field
        store.add_pointer(28, 8, TypeTag::UInt64, BUF); // straddles the end
        store.add_pointer(14, 2, TypeTag::UInt16, OTHER); // wrong buffer

        let field_id = store.add_field("header", 10, 30, BUF).unwrap();
        let field = store.field(field_id).unwrap();
        assert_eq!(field.subfields.len(), 1);
        assert_eq!(field.subfields[0].name, "count");
        assert_eq!(
            (field.subfields[0].start, field.subfields[0].end),
            (12, 16)
        );
    }

    #[test]
    fn zero_length_field_is_rejected() {
        let mut store = AnnotationStore::new();
        assert_eq!(
            store.add_field("x", 5, 5, BUF),
            Err(RangeError::StartNotBelowEnd { start: 5, end: 5 })
        );
    }

    #[test]
    fn copy_inside_a_field_appends_a_subfield() {
        let mut store = AnnotationStore::new();
        let field_id = store.add_field("header", 0, 32, BUF).unwrap();
        let sub_id = store.copy_segment(4, 8, BUF).unwrap();
        let field = store.field(field_id).unwrap();
        assert_eq!(field.subfields.len(), 1);
        assert_eq!(field.subfields[0].id, sub_id);
        assert_eq!(field.subfields[0].name, "Subfield_0");
        assert_eq!(field.subfields[0].tag, TypeTag::Hex);
    }

    #[test]
    fn paste_rejects_the_wrong_buffer() {
        let mut store = AnnotationStore::new();
        let clip_field = store.add_field("source", 0, 32, OTHER);
        assert!(clip_field.is_ok());
        store.copy_segment(40, 44, OTHER);
        let field_id = store.add_field("target", 0, 64, BUF).unwrap();
        assert_eq!(store.paste_into_field(field_id), None);
        assert!(store.field(field_id).unwrap().subfields.is_empty());
    }

    #[test]
    fn paste_nests_under_a_subfield() {
        let mut store = AnnotationStore::new();
        let field_id = store.add_field("header", 0, 32, BUF).unwrap();
        let sub_id = store.copy_segment(4, 12, BUF).unwrap();
        store.copy_segment(6, 8, BUF); // lands as Subfield_1, also on clipboard
        let nested = store.paste_into_subfield(sub_id).unwrap();
        let sub = store.subfield(sub_id).unwrap();
        assert_eq!(sub.children.len(), 1);
        assert_eq!(sub.children[0].id, nested);
        assert_eq!(store.field(field_id).unwrap().subfields.len(), 2);
    }

    #[test]
    fn reparent_is_confined_to_one_field() {
        let mut store = AnnotationStore::new();
        let f1 = store.add_field("a", 0, 16, BUF).unwrap();
        let f2 = store.add_field("b", 16, 32, BUF).unwrap();
        let s1 = store.copy_segment(0, 4, BUF).unwrap();
        let s2 = store.copy_segment(20, 24, BUF).unwrap();

        // across fields: rejected, nothing moves
        assert!(!store.reparent_subfield(s1, ReparentDest::Subfield(s2)));
        assert!(!store.reparent_subfield(s1, ReparentDest::Field(f2)));
        assert_eq!(store.field(f1).unwrap().subfields.len(), 1);
        assert_eq!(store.field(f2).unwrap().subfields.len(), 1);

        // within a field: allowed
        let s3 = store.copy_segment(4, 8, BUF).unwrap();
        assert!(store.reparent_subfield(s3, ReparentDest::Subfield(s1)));
        assert_eq!(store.subfield(s1).unwrap().children.len(), 1);

        // back to the top level of the same field
        assert!(store.reparent_subfield(s3, ReparentDest::Field(f1)));
        assert!(store.subfield(s1).unwrap().children.is_empty());
        assert_eq!(store.field(f1).unwrap().subfields.len(), 2);
    }

    #[test]
    fn reparent_into_own_subtree_is_rejected() {
        let mut store = AnnotationStore::new();
        let _f = store.add_field("a", 0, 16, BUF).unwrap();
        let parent = store.copy_segment(0, 8, BUF).unwrap();
        let child = store.copy_segment(2, 4, BUF).unwrap();
        assert!(store.reparent_subfield(child, ReparentDest::Subfield(parent)));
        assert!(!store.reparent_subfield(parent, ReparentDest::Subfield(child)));
        assert!(!store.reparent_subfield(parent, ReparentDest::Subfield(parent)));
        assert_eq!(store.subfield(parent).unwrap().children.len(), 1);
    }

    #[test]
    fn retype_checks_the_length() {
        let mut store = AnnotationStore::new();
        store.add_field("a", 0, 16, BUF).unwrap();
        let sub = store.copy_segment(0, 2, BUF).unwrap();
        assert!(store.retype_subfield(sub, TypeTag::UInt16));
        assert!(!store.retype_subfield(sub, TypeTag::UInt32));
        assert_eq!(store.subfield(sub).unwrap().tag, TypeTag::UInt16);
    }

    #[test]
    fn retype_to_single_byte_resets_endianness() {
        let mut store = AnnotationStore::new();
        store.add_field("a", 0, 16, BUF).unwrap();
        let sub = store.copy_segment(0, 2, BUF).unwrap();
        assert!(store.retype_subfield(sub, TypeTag::UInt16));
        assert!(store.toggle_subfield_endian(sub));
        assert_eq!(store.subfield(sub).unwrap().endian, Endianness::Big);
        assert!(store.retype_subfield(sub, TypeTag::UInt8));
        assert_eq!(store.subfield(sub).unwrap().endian, Endianness::Little);
    }

    #[test]
    fn adjustments_only_touch_the_edited_buffer() {
        let mut store = AnnotationStore::new();
        let f0 = store.add_field("a", 10, 20, BUF).unwrap();
        let f1 = store.add_field("b", 10, 20, OTHER).unwrap();
        let p0 = store.add_pointer(12, 4, TypeTag::UInt32, BUF);

        store.adjust_for_insert(BUF, 0, 16);
        let a = store.field(f0).unwrap();
        assert_eq!((a.start, a.end), (26, 36));
        let b = store.field(f1).unwrap();
        assert_eq!((b.start, b.end), (10, 20));
        assert_eq!(store.pointer(p0).unwrap().offset, 28);

        store.adjust_for_delete(BUF, 0, 16);
        let a = store.field(f0).unwrap();
        assert_eq!((a.start, a.end), (10, 20));
        assert_eq!(store.pointer(p0).unwrap().offset, 12);
    }

    #[test]
    fn range_updates_are_validated() {
        let mut store = AnnotationStore::new();
        let f = store.add_field("a", 0, 16, BUF).unwrap();
        assert_eq!(
            store.set_field_range(f, 8, 4, 64),
            Err(RangeError::StartNotBelowEnd { start: 8, end: 4 })
        );
        assert_eq!(
            store.set_field_range(f, 8, 80, 64),
            Err(RangeError::OutOfBounds { end: 80, len: 64 })
        );
        assert!(store.set_field_range(f, 8, 24, 64).is_ok());
        let field = store.field(f).unwrap();
        assert_eq!((field.start, field.end), (8, 24));
    }

    #[test]
    fn store_round_trips_through_json() {
        let mut store = AnnotationStore::new();
        let f = store.add_field("header", 0, 32, BUF).unwrap();
        let s = store.copy_segment(4, 8, BUF).unwrap();
        assert!(store.retype_subfield(s, TypeTag::UInt32));
        store.add_pointer(10, 2, TypeTag::UInt16, OTHER);

        let json = store.to_json().unwrap();
        let restored = AnnotationStore::from_json(&json).unwrap();
        assert_eq!(restored.field(f).unwrap().label, "header");
        assert_eq!(restored.subfield(s).unwrap().tag, TypeTag::UInt32);
        assert_eq!(restored.pointers_for(OTHER).count(), 1);

        // IDs keep incrementing past everything restored
        let mut restored = restored;
        let next = restored.add_pointer(0, 1, TypeTag::UInt8, BUF);
        assert!(next > s);
    }
}
