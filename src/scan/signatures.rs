//! Compression and image signature detection

use super::{PatternCategory, PatternResult};

const COMPRESSION_SIGNATURES: &[(&[u8], &str)] = &[
    (&[0x78, 0x9C], "zlib (default compression)"),
    (&[0x78, 0x01], "zlib (no/low compression)"),
    (&[0x78, 0xDA], "zlib (best compression)"),
    (&[0x1F, 0x8B], "gzip"),
    (&[0x04, 0x22, 0x4D, 0x18], "LZ4 frame"),
    (&[0x28, 0xB5, 0x2F, 0xFD], "zstd frame"),
    (b"LZFSE", "LZFSE"),
];

const IMAGE_SIGNATURES: &[(&[u8], &str)] = &[
    (b"\x89PNG\r\n\x1a\n", "PNG image"),
    (&[0xFF, 0xD8, 0xFF], "JPEG image"),
    (b"GIF87a", "GIF image (87a)"),
    (b"GIF89a", "GIF image (89a)"),
    (b"BM", "BMP image"),
    (b"DDS ", "DDS texture"),
    (&[0x00, 0x00, 0x01, 0x00], "ICO icon"),
];

/// Every occurrence of `needle` in `haystack`, advancing one byte per match
/// so overlaps all count.
fn find_all(haystack: &[u8], needle: &[u8]) -> Vec<usize> {
    let mut positions = Vec::new();
    if needle.is_empty() || haystack.len() < needle.len() {
        return positions;
    }
    let mut pos = 0;
    while pos + needle.len() <= haystack.len() {
        if &haystack[pos..pos + needle.len()] == needle {
            positions.push(pos);
        }
        pos += 1;
    }
    positions
}

pub fn detect_compression(data: &[u8]) -> Vec<PatternResult> {
    let mut results = Vec::new();
    for (signature, name) in COMPRESSION_SIGNATURES {
        for pos in find_all(data, signature) {
            results.push(PatternResult::new(
                pos,
                signature.len(),
                PatternCategory::Compression,
                format!("{name} signature"),
            ));
        }
    }
    results
}

pub fn detect_images(data: &[u8]) -> Vec<PatternResult> {
    let mut results = Vec::new();
    for (signature, name) in IMAGE_SIGNATURES {
        for pos in find_all(data, signature) {
            results.push(PatternResult::new(
                pos,
                signature.len(),
                PatternCategory::ImageMedia,
                format!("{name} signature"),
            ));
        }
    }
    // RIFF containers distinguish themselves by the form type at offset 8
    for pos in find_all(data, b"RIFF") {
        let Some(form) = data.get(pos + 8..pos + 12) else {
            continue;
        };
        let name = match form {
            b"WEBP" => "WebP image",
            b"WAVE" => "WAV audio",
            _ => continue,
        };
        results.push(PatternResult::new(
            pos,
            12,
            PatternCategory::ImageMedia,
            format!("{name} signature"),
        ));
    }
    results
}
