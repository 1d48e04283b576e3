use crate::types::SequenceFileData;
use anyhow::{anyhow, Result};
use needletail::parse_fastx_file;

// --------------------------------------------------
/// Length of the longest common prefix of `text[a..]` and `text[b..]`.
pub fn suffix_lcp(text: &[u8], a: usize, b: usize) -> usize {
    text[a..]
        .iter()
        .zip(&text[b..])
        .take_while(|(x, y)| x == y)
        .count()
}

// --------------------------------------------------
/// Whether `suffix(a)` precedes `suffix(b)` under the convention that
/// the implied sentinel past the end of the text is smaller than every
/// byte. Slice comparison orders a proper prefix before its extensions,
/// which is exactly that convention.
#[inline(always)]
pub fn suffix_less(text: &[u8], a: u32, b: u32) -> bool {
    text[a as usize..] < text[b as usize..]
}

// --------------------------------------------------
/// Binary search `suffix(query)` against the lexicographically sorted
/// `samples` and return the index of the bucket it falls into, in
/// `0..=samples.len()`. Returns `None` when `query` is itself one of the
/// samples; callers must skip it, not index with it.
pub fn binary_sa_search(text: &[u8], query: u32, samples: &[u32]) -> Option<usize> {
    let mut lo = 0;
    let mut hi = samples.len();
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        let sample = samples[mid];
        if sample == query {
            return None;
        }
        if suffix_less(text, sample, query) {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    Some(lo)
}

// --------------------------------------------------
// Reserve space for `additional` more elements, surfacing allocation
// failure as an error naming the operation instead of aborting.
pub(crate) fn try_reserve<T>(vec: &mut Vec<T>, additional: usize, what: &str) -> Result<()> {
    vec.try_reserve_exact(additional)
        .map_err(|e| anyhow!("out of memory allocating {what}: {e}"))
}

// --------------------------------------------------
// Utility function to read FASTA/Q sequence data. Records are
// concatenated with `sequence_delimiter` between them; no sentinel is
// appended because the suffix builders imply one past the end.
pub fn read_sequence_file(
    filename: &str,
    sequence_delimiter: u8,
) -> Result<SequenceFileData> {
    let mut reader = parse_fastx_file(filename)?;
    let mut seq: Vec<u8> = vec![];
    let mut sequence_names: Vec<String> = vec![];
    let mut start_positions: Vec<usize> = vec![];
    let mut i = 0;
    while let Some(rec) = reader.next() {
        let rec = rec?;
        if i > 0 {
            seq.push(sequence_delimiter);
        }

        start_positions.push(seq.len());
        seq.extend_from_slice(&rec.seq());
        i += 1;

        // Only take the ID up to the first whitespace
        let name = String::from_utf8(rec.id().to_vec())?
            .split_whitespace()
            .next()
            .map_or(i.to_string(), |v| v.to_string());
        sequence_names.push(name);
    }

    Ok(SequenceFileData {
        seq,
        start_positions,
        sequence_names,
    })
}
