//! Background execution of scans and signature searches
//!
//! Workers take an owned snapshot of the buffer, so edits made while a scan
//! runs never race with the detectors; they only mean the results describe a
//! slightly stale buffer. Every event carries the [`BufferId`] it was
//! computed for, letting the host drop events for buffers the user has since
//! switched away from or closed. A dropped receiver simply ends the worker.

use std::sync::mpsc::{self, Receiver};
use std::thread;

use crate::annotations::{search_pointers, Pointer, PointerTemplate};
use crate::BufferId;

use super::{scan_with_progress, MimeSniffer, PatternResult, ScanConfig};

/// Bytes of the buffer covered per progress tick of a signature search.
const SEARCH_CHUNK: usize = 50 * 16;

/// Events a background scan emits.
#[derive(Debug)]
pub enum ScanEvent {
    Progress {
        buffer: BufferId,
        done: usize,
        total: usize,
    },
    Complete {
        buffer: BufferId,
        results: Vec<PatternResult>,
    },
}

/// Events a background signature search emits.
#[derive(Debug)]
pub enum SearchEvent {
    Progress {
        buffer: BufferId,
        done: usize,
        total: usize,
    },
    Complete {
        buffer: BufferId,
        pointers: Vec<Pointer>,
    },
}

/// Runs a full pattern scan on a worker thread.
///
/// Emits one `Progress` per detector step and a final `Complete`. Progress
/// may arrive any number of times before completion; consumers must not
/// depend on a fixed count.
pub fn spawn_scan(
    buffer: BufferId,
    snapshot: Vec<u8>,
    sniffer: Option<Box<dyn MimeSniffer + Send>>,
    config: ScanConfig,
) -> Receiver<ScanEvent> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        log::debug!(
            "scan worker started: buffer {:?}, {} bytes",
            buffer,
            snapshot.len()
        );
        let results = scan_with_progress(
            &snapshot,
            sniffer.as_deref().map(|s| s as &dyn MimeSniffer),
            &config,
            |done, total| {
                // a send failure means the host lost interest; keep scanning,
                // the final send will be dropped the same way
                let _ = tx.send(ScanEvent::Progress {
                    buffer,
                    done,
                    total,
                });
            },
        );
        log::debug!("scan worker finished: {} results", results.len());
        let _ = tx.send(ScanEvent::Complete { buffer, results });
    });
    rx
}

/// Runs a bulk signature search on a worker thread.
///
/// The created pointers carry provisional IDs starting at zero;
/// [`crate::AnnotationStore::adopt_pointers`] reassigns them on arrival.
pub fn spawn_pointer_search(
    buffer: BufferId,
    snapshot: Vec<u8>,
    pattern: Vec<u8>,
    template: PointerTemplate,
) -> Receiver<SearchEvent> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        log::debug!(
            "search worker started: buffer {:?}, pattern {} bytes",
            buffer,
            pattern.len()
        );
        let total = snapshot.len().div_ceil(SEARCH_CHUNK).max(1);
        // overlap so a match or its value straddling a boundary is not lost
        let overlap = pattern.len() + template.length;
        let mut pointers = Vec::new();
        let mut done = 0;
        while done < total {
            let start = done * SEARCH_CHUNK;
            let end = ((done + 1) * SEARCH_CHUNK).min(snapshot.len());
            let slice_end = (end + overlap).min(snapshot.len());
            let found = search_pointers(&snapshot[start..slice_end], &pattern, &template, buffer, 0);
            for mut ptr in found {
                let match_pos = start + ptr.offset - pattern.len();
                if match_pos >= end {
                    // the next chunk owns this one
                    continue;
                }
                ptr.offset += start;
                ptr.segment_start += start;
                ptr.label = format!("Result_{}", pointers.len());
                ptr.id = pointers.len() as u64;
                pointers.push(ptr);
            }
            done += 1;
            let _ = tx.send(SearchEvent::Progress {
                buffer,
                done,
                total,
            });
        }
        log::debug!("search worker finished: {} pointers", pointers.len());
        let _ = tx.send(SearchEvent::Complete { buffer, pointers });
    });
    rx
}
