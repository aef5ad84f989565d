//! ASCII and UTF-16LE string run detection

use super::{PatternCategory, PatternResult};

const DESCRIPTION_LIMIT: usize = 50;

fn is_printable_ascii(byte: u8) -> bool {
    (0x20..=0x7E).contains(&byte)
}

/// Quotes a found string for the result list, truncating long ones.
fn describe(text: &str) -> String {
    if text.len() > DESCRIPTION_LIMIT {
        format!("\"{}...\"", &text[..DESCRIPTION_LIMIT])
    } else {
        format!("\"{text}\"")
    }
}

/// Maximal runs of printable ASCII bytes of at least `min_len` characters.
pub fn detect_ascii_strings(data: &[u8], min_len: usize) -> Vec<PatternResult> {
    let min_len = min_len.max(1);
    let mut results = Vec::new();
    let mut start = None;
    for (i, &byte) in data.iter().enumerate() {
        if is_printable_ascii(byte) {
            start.get_or_insert(i);
            continue;
        }
        if let Some(s) = start.take() {
            if i - s >= min_len {
                results.push(run_result(data, s, i));
            }
        }
    }
    if let Some(s) = start {
        if data.len() - s >= min_len {
            results.push(run_result(data, s, data.len()));
        }
    }
    results
}

fn run_result(data: &[u8], start: usize, end: usize) -> PatternResult {
    let text: String = data[start..end].iter().map(|&b| b as char).collect();
    PatternResult::new(
        start,
        end - start,
        PatternCategory::AsciiString,
        describe(&text),
    )
}

/// Runs of UTF-16LE code units whose high byte is zero and whose low byte is
/// printable ASCII, at least `min_len` characters long.
///
/// Only the basic-latin subset is recognized; that is what padded Windows
/// strings in practice look like and it keeps the false-positive rate down.
pub fn detect_utf16le_strings(data: &[u8], min_len: usize) -> Vec<PatternResult> {
    let min_len = min_len.max(1);
    let mut results = Vec::new();
    if data.len() < min_len * 2 {
        return results;
    }
    let mut offset = 0;
    while offset + 2 <= data.len() {
        let mut pos = offset;
        let mut text = String::new();
        while pos + 2 <= data.len() && data[pos + 1] == 0 && is_printable_ascii(data[pos]) {
            text.push(data[pos] as char);
            pos += 2;
        }
        if text.len() >= min_len {
            results.push(PatternResult::new(
                offset,
                text.len() * 2,
                PatternCategory::Utf16String,
                describe(&text),
            ));
            offset = pos;
        } else {
            offset += 2;
        }
    }
    results
}
