//! Pattern scanning over a whole buffer
//!
//! A scan runs six detector steps in a fixed order: file-type sniffing, ASCII
//! string runs, UTF-16LE string runs, pointer tables, compression signatures
//! and image signatures. Each step appends [`PatternResult`]s; results are
//! plain data the host can sort, filter and highlight.

pub mod signatures;
pub mod strings;
pub mod tables;
pub mod worker;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use worker::{spawn_pointer_search, spawn_scan, ScanEvent, SearchEvent};

/// Most bytes a sniffer gets to look at.
pub const SNIFF_WINDOW: usize = 512;

/// Number of detector steps one scan runs, for progress reporting.
pub const SCAN_STEPS: usize = 6;

/// Which detector produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternCategory {
    FileType,
    AsciiString,
    Utf16String,
    PointerTable,
    Compression,
    ImageMedia,
}

impl fmt::Display for PatternCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PatternCategory::FileType => "File Type",
            PatternCategory::AsciiString => "ASCII String",
            PatternCategory::Utf16String => "UTF-16LE String",
            PatternCategory::PointerTable => "Pointer Table",
            PatternCategory::Compression => "Compression",
            PatternCategory::ImageMedia => "Image/Media",
        };
        f.write_str(name)
    }
}

/// One finding of a scan.
///
/// `label` and `highlight_color` start empty; they are the only fields the
/// host mutates after creation, when the user names or colors a result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternResult {
    pub offset: usize,
    pub length: usize,
    pub category: PatternCategory,
    pub description: String,
    #[serde(default)]
    pub label: String,
    /// E.g. `"#RRGGBB"`; the core never interprets it.
    #[serde(default)]
    pub highlight_color: Option<String>,
}

impl PatternResult {
    pub fn new(
        offset: usize,
        length: usize,
        category: PatternCategory,
        description: impl Into<String>,
    ) -> Self {
        PatternResult {
            offset,
            length,
            category,
            description: description.into(),
            label: String::new(),
            highlight_color: None,
        }
    }

    pub fn end(&self) -> usize {
        self.offset + self.length
    }
}

/// Pluggable file-type identification (e.g. a libmagic binding).
///
/// The core deliberately does not link a magic database itself; hosts that
/// have one implement this trait, everyone else gets an `N/A` row.
pub trait MimeSniffer {
    /// Returns `(mime_type, description)` or `None` when unidentifiable.
    fn classify(&self, bytes: &[u8]) -> Option<(String, String)>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Minimum characters for ASCII and UTF-16 string runs.
    pub min_string_length: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            min_string_length: 3,
        }
    }
}

/// Runs every detector over `data`, invoking `on_step(done, total)` after
/// each one.
pub fn scan_with_progress(
    data: &[u8],
    sniffer: Option<&dyn MimeSniffer>,
    config: &ScanConfig,
    mut on_step: impl FnMut(usize, usize),
) -> Vec<PatternResult> {
    let mut results = Vec::new();

    results.push(sniff_file_type(data, sniffer));
    on_step(1, SCAN_STEPS);

    results.extend(strings::detect_ascii_strings(data, config.min_string_length));
    on_step(2, SCAN_STEPS);

    results.extend(strings::detect_utf16le_strings(data, config.min_string_length));
    on_step(3, SCAN_STEPS);

    results.extend(tables::detect_pointer_tables(data));
    on_step(4, SCAN_STEPS);

    results.extend(signatures::detect_compression(data));
    on_step(5, SCAN_STEPS);

    results.extend(signatures::detect_images(data));
    on_step(6, SCAN_STEPS);

    results
}

/// Runs every detector over `data` without progress reporting.
pub fn scan(
    data: &[u8],
    sniffer: Option<&dyn MimeSniffer>,
    config: &ScanConfig,
) -> Vec<PatternResult> {
    scan_with_progress(data, sniffer, config, |_, _| {})
}

fn sniff_file_type(data: &[u8], sniffer: Option<&dyn MimeSniffer>) -> PatternResult {
    let window = &data[..data.len().min(SNIFF_WINDOW)];
    let classified = sniffer.and_then(|s| s.classify(window));
    match classified {
        Some((mime, description)) => PatternResult::new(
            0,
            window.len(),
            PatternCategory::FileType,
            format!("MIME: {mime} | {description}"),
        ),
        None => PatternResult::new(0, 0, PatternCategory::FileType, "N/A"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSniffer;

    impl MimeSniffer for FixedSniffer {
        fn classify(&self, bytes: &[u8]) -> Option<(String, String)> {
            if bytes.starts_with(b"\x89PNG") {
                Some(("image/png".into(), "PNG image data".into()))
            } else {
                None
            }
        }
    }

    #[test]
    fn scan_without_a_sniffer_reports_na() {
        let results = scan(b"\x00\x00\x00\x00", None, &ScanConfig::default());
        assert_eq!(results[0].category, PatternCategory::FileType);
        assert_eq!(results[0].description, "N/A");
        assert_eq!(results[0].length, 0);
    }

    #[test]
    fn sniffer_result_is_the_first_row() {
        let mut data = b"\x89PNG\r\n\x1a\n".to_vec();
        data.resize(600, 0);
        let results = scan(&data, Some(&FixedSniffer), &ScanConfig::default());
        assert_eq!(results[0].category, PatternCategory::FileType);
        assert_eq!(results[0].description, "MIME: image/png | PNG image data");
        assert_eq!(results[0].length, SNIFF_WINDOW);
    }

    #[test]
    fn progress_fires_once_per_step() {
        let mut steps = Vec::new();
        scan_with_progress(b"hello world", None, &ScanConfig::default(), |done, total| {
            steps.push((done, total));
        });
        assert_eq!(
            steps,
            (1..=SCAN_STEPS).map(|i| (i, SCAN_STEPS)).collect::<Vec<_>>()
        );
    }

    #[test]
    fn user_fields_survive_serialization() {
        let mut result =
            PatternResult::new(4, 2, PatternCategory::Compression, "gzip signature");
        result.label = "payload".into();
        result.highlight_color = Some("#FF8800".into());

        let json = serde_json::to_string(&result).unwrap();
        let back: PatternResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);

        // results captured before the user touched them still load
        let legacy: PatternResult = serde_json::from_str(
            r#"{"offset":0,"length":2,"category":"Compression","description":"gzip signature"}"#,
        )
        .unwrap();
        assert_eq!(legacy.label, "");
        assert_eq!(legacy.highlight_color, None);
    }

    #[test]
    fn fresh_results_have_no_user_annotations() {
        let results = scan(b"\x78\x9C\x00\x00", None, &ScanConfig::default());
        assert!(results
            .iter()
            .all(|r| r.label.is_empty() && r.highlight_color.is_none()));
    }

    #[test]
    fn detectors_compose_into_one_result_list() {
        let mut data = Vec::new();
        data.extend_from_slice(b"\x00\x00hello there\x00\x00");
        data.extend_from_slice(&[0x1F, 0x8B]); // gzip magic
        let results = scan(&data, None, &ScanConfig::default());
        assert!(results
            .iter()
            .any(|r| r.category == PatternCategory::AsciiString));
        assert!(results
            .iter()
            .any(|r| r.category == PatternCategory::Compression));
    }
}
