//! binspect: the reusable core of a hex-editing application
//!
//! This crate interprets raw bytes as typed values (integers of many widths,
//! floats, packed timestamps, GUIDs, LEB128), keeps user-defined byte-range
//! annotations consistent while the underlying buffer is edited, and scans
//! buffers for structural patterns (string runs, pointer tables, compression
//! and image signatures).
//!
//! ## Architecture
//!
//! The host application owns every buffer; this crate only borrows a byte
//! slice for the duration of one operation and never performs file I/O or
//! rendering. The pieces are:
//!
//! - [`codec`]: pure decode/encode between byte slices and semantic values
//! - [`annotations`]: `Field`/`Subfield`/`Pointer` ranges and the shift rules
//!   that keep them pointing at the same logical content across insertions
//!   and deletions
//! - [`scan`]: composable pattern detectors plus a background worker that
//!   reports progress over a channel
//! - [`interpret`]: renders an annotation descriptor as a display string and
//!   parses an edited string back into bytes
//! - [`edit`]: encode-then-write helper that reports the dirty byte range
//!
//! Long-running scans execute on a worker thread against a snapshot of the
//! buffer; events are tagged with a [`BufferId`] so the host can drop results
//! that arrive after the user switched buffers.

pub mod annotations;
pub mod codec;
pub mod edit;
pub mod error;
pub mod interpret;
pub mod scan;

use serde::{Deserialize, Serialize};

pub use annotations::{
    AnnotationStore, Field, Pointer, PointerTemplate, ReparentDest, Subfield, ValueKind,
};
pub use codec::{decode, encode, Decoded, Endianness, Guid, TypeTag, Value};
pub use edit::{apply_edit, DirtyRange};
pub use error::{DecodeError, EncodeError, RangeError};
pub use interpret::{interpret, parse, Descriptor, NoReferences, ReferenceResolver, INVALID};
pub use scan::{
    scan, spawn_pointer_search, spawn_scan, MimeSniffer, PatternCategory, PatternResult,
    ScanConfig, ScanEvent, SearchEvent,
};

/// Identity of one open buffer in the host (e.g. a tab index).
///
/// The core never dereferences this itself; it is carried on annotations and
/// scan events so the host can route them, and passed to a
/// [`ReferenceResolver`] for indirect string lookups into another buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BufferId(pub usize);
