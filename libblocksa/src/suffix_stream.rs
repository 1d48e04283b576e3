use crate::types::Exhausted;
use anyhow::Result;

// --------------------------------------------------
/// A producer of suffix-array blocks in ascending lexicographic order.
/// Implementers promise that concatenating every block yields each
/// suffix offset of the text exactly once, sorted by suffix, with no
/// block larger than the configured bucket size.
pub trait SuffixBlockSource {
    /// Produce the next block of sorted suffix offsets
    fn next_block(&mut self) -> Result<Vec<u32>>;

    /// True iff `next_block` has another block to produce
    fn has_more_blocks(&self) -> bool;

    /// Rewind to the first block without rebuilding anything
    fn reset(&mut self);
}

// --------------------------------------------------
/// Adapts any block source into a one-suffix-at-a-time iterator with a
/// single slot of pushback, the shape the downstream Burrows-Wheeler
/// transform consumes.
#[derive(Debug)]
pub struct SuffixStream<B: SuffixBlockSource> {
    source: B,
    block: Vec<u32>,
    pos: usize,
    pushed_back: Option<u32>,
}

impl<B: SuffixBlockSource> SuffixStream<B> {
    // --------------------------------------------------
    pub fn new(source: B) -> SuffixStream<B> {
        SuffixStream {
            source,
            block: vec![],
            pos: 0,
            pushed_back: None,
        }
    }

    // --------------------------------------------------
    /// The next suffix offset in global lexicographic order, fetching
    /// the next block when the current one is spent. Fails with
    /// [`Exhausted`] once every offset has been emitted.
    pub fn next_suffix(&mut self) -> Result<u32> {
        if let Some(suffix) = self.pushed_back.take() {
            return Ok(suffix);
        }
        while self.pos >= self.block.len() {
            if !self.source.has_more_blocks() {
                return Err(Exhausted.into());
            }
            self.block = self.source.next_block()?;
            self.pos = 0;
        }
        let suffix = self.block[self.pos];
        self.pos += 1;
        Ok(suffix)
    }

    // --------------------------------------------------
    /// True iff the next call to `next_suffix` will succeed. Probes by
    /// fetching the next offset and stashing it as pushback, so no
    /// suffix is ever lost.
    pub fn has_more_suffixes(&mut self) -> Result<bool> {
        if self.pushed_back.is_some() {
            return Ok(true);
        }
        match self.next_suffix() {
            Ok(suffix) => {
                self.pushed_back = Some(suffix);
                Ok(true)
            }
            Err(e) if e.is::<Exhausted>() => Ok(false),
            Err(e) => Err(e),
        }
    }

    // --------------------------------------------------
    /// Restart the stream from the lexicographically first suffix. The
    /// underlying source rewinds without rebuilding its samples.
    pub fn reset(&mut self) {
        self.block.clear();
        self.pos = 0;
        self.pushed_back = None;
        self.source.reset();
    }

    // --------------------------------------------------
    /// Access the wrapped block source
    pub fn source(&self) -> &B {
        &self.source
    }
}
