//! Common types

use std::{error::Error, fmt};

// --------------------------------------------------
/// The largest supported text length. Suffix offsets are `u32` and the
/// empty suffix at offset `n` must itself be representable.
pub const MAX_TEXT_LEN: usize = u32::MAX as usize - 1;

// --------------------------------------------------
/// The arguments for building a `KarkkainenSa`
#[derive(Debug, Clone)]
pub struct KarkkainenArgs<'a> {
    /// The text whose suffixes will be streamed. A sentinel smaller than
    /// every byte value is implied after the final position, so the
    /// stream has `text.len() + 1` offsets.
    pub text: &'a [u8],

    /// Upper bound on the number of offsets per emitted block,
    /// clamped to at least 2.
    pub bucket_size: u32,

    /// Difference-cover periodicity. Zero disables the tie-breaker,
    /// any other value must be a power of two greater than 3.
    pub dc_v: u32,

    /// Seed for the sample-selection PRNG. Runs with the same text,
    /// bucket size, periodicity, and seed emit identical streams.
    pub random_seed: u64,

    /// Cross-validate every comparator shortcut against a naive
    /// comparison. Expensive, meant for debugging.
    pub sanity_check: bool,
}

// --------------------------------------------------
/// Returned by `SuffixStream::next_suffix` after every offset has been
/// emitted. This is the expected end-of-stream signal, cf.
/// `SuffixStream::has_more_suffixes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exhausted;

impl fmt::Display for Exhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no more suffixes")
    }
}

impl Error for Exhausted {}

// --------------------------------------------------
/// A consistency failure caught while `sanity_check` is enabled.
/// Always fatal, indicates a bug in the comparator or the sort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolated(pub String);

impl fmt::Display for InvariantViolated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invariant violated: {}", self.0)
    }
}

impl Error for InvariantViolated {}

// --------------------------------------------------
/// This struct is returned by `util::read_sequence_file` for reading
/// sequence data from a FASTA/Q file.
#[derive(Debug)]
pub struct SequenceFileData {
    /// The sequence as a vector of bytes. Multiple sequences are
    /// separated by a user-supplied delimiter.
    pub seq: Vec<u8>,

    /// The offsets where each sequence starts
    pub start_positions: Vec<usize>,

    /// The names of the sequences, same length as `start_positions`
    pub sequence_names: Vec<String>,
}
