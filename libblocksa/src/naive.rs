use crate::{
    suffix_stream::SuffixBlockSource,
    types::MAX_TEXT_LEN,
    util::try_reserve,
};
use anyhow::{bail, Result};
use log::info;
use std::{cmp::min, mem, time::Instant};

// --------------------------------------------------
/// Builds the entire suffix array up front, then doles it out one block
/// at a time through the same interface as the blockwise builder. Costs
/// memory proportional to the text, which is exactly what the blockwise
/// scheme avoids; its value is as a reference implementation and test
/// oracle.
#[derive(Debug)]
pub struct NaiveSa {
    sa: Vec<u32>,
    bucket_size: u32,
    cur: usize,
}

impl NaiveSa {
    // --------------------------------------------------
    /// Sort all `text.len() + 1` suffixes with Manber-Myers prefix
    /// doubling. Ranks double their reach every round, so the build is
    /// `O(n log^2 n)` comparisons even on fully repetitive input.
    pub fn new(text: &[u8], bucket_size: u32) -> Result<NaiveSa> {
        let n = text.len();
        if n > MAX_TEXT_LEN {
            bail!("text length {n} exceeds the supported maximum {MAX_TEXT_LEN}");
        }

        let now = Instant::now();
        let mut sa: Vec<u32> = Vec::new();
        try_reserve(&mut sa, n + 1, "full suffix array")?;
        sa.extend(0..=n as u32);

        // The empty suffix ranks below every byte
        let mut rank: Vec<i64> = text.iter().map(|&b| b as i64).chain([-1]).collect();
        let mut next = vec![0i64; n + 1];

        let key = |p: u32, h: usize, rank: &[i64]| {
            let p = p as usize;
            (rank[p], rank.get(p + h).copied().unwrap_or(-1))
        };

        let mut h = 1;
        while h <= n {
            sa.sort_unstable_by(|&a, &b| key(a, h, &rank).cmp(&key(b, h, &rank)));

            next[sa[0] as usize] = 0;
            for i in 1..=n {
                let bump = (key(sa[i - 1], h, &rank) < key(sa[i], h, &rank)) as i64;
                next[sa[i] as usize] = next[sa[i - 1] as usize] + bump;
            }
            mem::swap(&mut rank, &mut next);

            if rank[sa[n] as usize] == n as i64 {
                break; // all ranks distinct
            }
            h *= 2;
        }
        info!("Built full suffix array of {} in {:?}", n + 1, now.elapsed());

        Ok(NaiveSa {
            sa,
            bucket_size: bucket_size.max(2),
            cur: 0,
        })
    }
}

// --------------------------------------------------
impl SuffixBlockSource for NaiveSa {
    fn next_block(&mut self) -> Result<Vec<u32>> {
        let sz = min(self.bucket_size as usize, self.sa.len() - self.cur);
        let block = self.sa[self.cur..self.cur + sz].to_vec();
        self.cur += sz;
        Ok(block)
    }

    fn has_more_blocks(&self) -> bool {
        self.cur < self.sa.len()
    }

    fn reset(&mut self) {
        self.cur = 0;
    }
}

// --------------------------------------------------
#[cfg(test)]
mod tests {
    use super::NaiveSa;
    use crate::suffix_stream::SuffixBlockSource;
    use anyhow::Result;
    use pretty_assertions::assert_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn drain(source: &mut NaiveSa) -> Result<Vec<u32>> {
        let mut all = vec![];
        while source.has_more_blocks() {
            all.extend(source.next_block()?);
        }
        Ok(all)
    }

    #[test]
    fn test_known_suffix_arrays() -> Result<()> {
        let mut banana = NaiveSa::new(b"banana", 3)?;
        assert_eq!(drain(&mut banana)?, [6, 5, 3, 1, 0, 4, 2]);

        let mut runs = NaiveSa::new(b"aaaaaa", 4)?;
        assert_eq!(drain(&mut runs)?, [6, 5, 4, 3, 2, 1, 0]);

        let mut missi = NaiveSa::new(b"mississippi", 5)?;
        assert_eq!(drain(&mut missi)?, [11, 10, 7, 4, 1, 0, 9, 8, 6, 3, 5, 2]);

        let mut empty = NaiveSa::new(b"", 8)?;
        assert_eq!(drain(&mut empty)?, [0]);
        Ok(())
    }

    #[test]
    fn test_block_size_is_bounded() -> Result<()> {
        let mut source = NaiveSa::new(b"GATTACAGATTACA", 4)?;
        while source.has_more_blocks() {
            assert!(source.next_block()?.len() <= 4);
        }
        Ok(())
    }

    #[test]
    fn test_matches_slice_sort_on_random_text() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(11);
        let text: Vec<u8> = (0..2000).map(|_| b"ACGT"[rng.gen_range(0..4)]).collect();
        let mut expected: Vec<u32> = (0..=2000).collect();
        expected.sort_unstable_by(|&a, &b| text[a as usize..].cmp(&text[b as usize..]));

        let mut source = NaiveSa::new(&text, 256)?;
        assert_eq!(drain(&mut source)?, expected);
        Ok(())
    }

    #[test]
    fn test_reset_rewinds_to_first_block() -> Result<()> {
        let mut source = NaiveSa::new(b"banana", 3)?;
        let first = drain(&mut source)?;
        source.reset();
        assert_eq!(drain(&mut source)?, first);
        Ok(())
    }
}
