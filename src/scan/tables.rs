//! Pointer table detection
//!
//! A pointer table is a run of aligned machine words that all look like
//! offsets into the buffer itself. Candidates are collected at 4-byte
//! alignment, both as 32-bit and 64-bit little-endian reads, then clustered;
//! a cluster of three or more nearby candidates is reported as a table.

use super::{PatternCategory, PatternResult};

/// Candidates further apart than this do not belong to the same table.
const CLUSTER_MAX_GAP: usize = 16;

/// Fewest candidates that count as a table.
const CLUSTER_MIN_SIZE: usize = 3;

#[derive(Debug, Clone, Copy)]
struct Candidate {
    offset: usize,
    size: usize,
    kind: &'static str,
}

fn collect_candidates(data: &[u8]) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    let len = data.len() as u64;
    if data.len() < 8 {
        return candidates;
    }
    let mut offset = 0;
    // every probe reads 8 bytes, so stop 8 short of the end
    while offset + 8 <= data.len() {
        let v32 = u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap());
        if v32 != 0 && u64::from(v32) < len {
            candidates.push(Candidate {
                offset,
                size: 4,
                kind: "32-bit",
            });
        }
        let v64 = u64::from_le_bytes(data[offset..offset + 8].try_into().unwrap());
        if v64 != 0 && v64 < len {
            candidates.push(Candidate {
                offset,
                size: 8,
                kind: "64-bit",
            });
        }
        offset += 4;
    }
    candidates
}

/// Finds clusters of in-range aligned words and reports them as tables.
pub fn detect_pointer_tables(data: &[u8]) -> Vec<PatternResult> {
    let candidates = collect_candidates(data);
    let mut results = Vec::new();
    let mut cluster: Vec<Candidate> = Vec::new();
    for cand in candidates {
        let adjacent = cluster
            .last()
            .is_some_and(|prev| cand.offset - prev.offset <= CLUSTER_MAX_GAP);
        if cluster.is_empty() || adjacent {
            cluster.push(cand);
        } else {
            flush_cluster(&cluster, &mut results);
            cluster.clear();
            cluster.push(cand);
        }
    }
    flush_cluster(&cluster, &mut results);
    results
}

fn flush_cluster(cluster: &[Candidate], results: &mut Vec<PatternResult>) {
    if cluster.len() < CLUSTER_MIN_SIZE {
        return;
    }
    let first = cluster[0];
    let last = cluster[cluster.len() - 1];
    results.push(PatternResult::new(
        first.offset,
        last.offset - first.offset + last.size,
        PatternCategory::PointerTable,
        format!("{} possible pointers ({})", cluster.len(), first.kind),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words_le(values: &[u32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn three_small_words_form_a_table() {
        // values 1, 2, 3 are all inside the 16-byte buffer; the last word is
        // junk so no stray 64-bit candidate appears
        let data = words_le(&[1, 2, 3, 0xFF00_0000]);
        let results = detect_pointer_tables(&data);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].offset, 0);
        assert_eq!(results[0].length, 12);
        assert_eq!(results[0].description, "3 possible pointers (32-bit)");
    }

    #[test]
    fn two_candidates_are_not_enough() {
        let data = words_le(&[1, 2, 0xFF00_0000, 0xFF00_0000]);
        assert!(detect_pointer_tables(&data).is_empty());
    }

    #[test]
    fn zero_and_out_of_range_words_are_not_candidates() {
        let data = words_le(&[0, 0x1000_0000, 0, 0]);
        assert!(detect_pointer_tables(&data).is_empty());
    }

    #[test]
    fn a_wide_gap_splits_clusters() {
        // three candidates, then 24 junk bytes, then three more
        let mut values = vec![1u32, 2, 3];
        values.extend([0xFF00_0000; 6]);
        values.extend([1, 2, 3]);
        values.push(0xFF00_0000);
        let data = words_le(&values);
        let results = detect_pointer_tables(&data);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].offset, 0);
        assert_eq!(results[1].offset, 36);
        assert_eq!(results[1].description, "3 possible pointers (32-bit)");
    }

    #[test]
    fn a_word_can_count_as_both_widths() {
        // 64-bit words whose high half is zero probe as both a 32-bit and a
        // 64-bit candidate at the same offset
        let data = words_le(&[1, 0, 2, 0, 3, 0, 0xFF00_0000, 0xFF00_0000]);
        let results = detect_pointer_tables(&data);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].description, "6 possible pointers (32-bit)");
        // span runs to the end of the trailing 64-bit read
        assert_eq!(results[0].offset, 0);
        assert_eq!(results[0].length, 24);
    }

    #[test]
    fn buffers_under_eight_bytes_have_no_tables() {
        assert!(detect_pointer_tables(&[1, 0, 0, 0, 1, 0, 0]).is_empty());
    }
}
