//! Blockwise suffix-array construction for texts too large to hold a
//! full suffix array in memory. A small set of sample suffixes splits
//! the suffix array into bounded buckets, and each bucket is produced
//! by a single scan over the text with Z-box reuse and a
//! difference-cover tie-breaker, following Karkkainen's "Fast BWT"
//! scheme. Consumers pull one suffix at a time through
//! [`SuffixStream`], which is the shape a Burrows-Wheeler/FM-index
//! constructor wants.

pub mod dcover;
pub mod karkkainen;
pub mod mkqs;
pub mod naive;
pub mod suffix_stream;
pub mod types;
pub mod util;
pub mod zbox;

pub use crate::{
    dcover::DifferenceCover,
    karkkainen::KarkkainenSa,
    naive::NaiveSa,
    suffix_stream::{SuffixBlockSource, SuffixStream},
    types::{Exhausted, InvariantViolated, KarkkainenArgs},
};
