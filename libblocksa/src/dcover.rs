use crate::util::try_reserve;
use anyhow::{bail, Result};
use log::info;
use std::{cmp::Ordering, time::Instant};

// --------------------------------------------------
/// A difference-cover sample over a text: a set of sampled suffix
/// positions, one per covered residue modulo the periodicity `v`, ranked
/// lexicographically. For any two offsets `a` and `b` there is a shift
/// `delta < v` such that both `a + delta` and `b + delta` are sampled,
/// so any comparison of suffixes that share at least `v` characters can
/// be settled in constant time from the ranks.
///
/// The residue set is `{0..r-1}` united with the multiples of `r`,
/// where `r * r` is `v` or `2v`. Writing a difference as `q*r + s`,
/// the pair `(r - s, (q + 1) * r)` realizes it, and because `r`
/// divides `v` the multiples of `r` are closed under wrapping.
#[derive(Debug)]
pub struct DifferenceCover {
    /// Periodicity, a power of two greater than 3
    v: u32,

    /// Sorted cover residues in `0..v`
    residues: Vec<u32>,

    /// Residue -> index into `residues`, or `None` for uncovered residues
    residue_index: Vec<Option<u32>>,

    /// For each difference `d` in `0..v`, a residue `x` in the cover
    /// such that `(x + d) % v` is also in the cover
    anchor: Vec<u32>,

    /// Lexicographic rank of each sampled suffix, indexed by
    /// `(pos / v) * residues.len() + residue_index[pos % v]`
    rank: Vec<u32>,

    /// Length of the text the ranks were built over
    text_len: usize,
}

impl DifferenceCover {
    // --------------------------------------------------
    /// Build the cover and rank every sampled suffix of `text`,
    /// including the empty suffix at `text.len()` when its residue is
    /// covered.
    pub fn build(text: &[u8], v: u32) -> Result<DifferenceCover> {
        if v <= 3 || !v.is_power_of_two() {
            bail!("difference-cover periodicity must be a power of two > 3, got {v}");
        }

        let now = Instant::now();
        let r = 1u32 << ((v.trailing_zeros() + 1) / 2);
        let mut residues: Vec<u32> = (0..r).chain((r..v).step_by(r as usize)).collect();
        residues.sort_unstable();
        residues.dedup();

        let mut residue_index = vec![None; v as usize];
        for (i, &s) in residues.iter().enumerate() {
            residue_index[s as usize] = Some(i as u32);
        }

        // Any in-cover pair works as an anchor; take the first found.
        let mut anchor = vec![u32::MAX; v as usize];
        for &x in &residues {
            for &y in &residues {
                let diff = ((y + v - x) % v) as usize;
                if anchor[diff] == u32::MAX {
                    anchor[diff] = x;
                }
            }
        }
        debug_assert!(anchor.iter().all(|&x| x != u32::MAX));

        let mut dc = DifferenceCover {
            v,
            residues,
            residue_index,
            anchor,
            rank: vec![],
            text_len: text.len(),
        };
        let num_sampled = dc.build_ranks(text)?;
        info!(
            "Built difference cover v={v} with {} residues, {num_sampled} sampled \
             suffixes in {:?}",
            dc.residues.len(),
            now.elapsed()
        );
        Ok(dc)
    }

    // --------------------------------------------------
    /// Periodicity of this cover
    pub fn v(&self) -> u32 {
        self.v
    }

    // --------------------------------------------------
    /// The shift that lets the cover settle a comparison of `a` and
    /// `b`: both `a + delta` and `b + delta` are sampled positions.
    /// `None` when the shift would pass the end of the text, in which
    /// case a plain character scan terminates on its own.
    pub fn tie_break_off(&self, a: u32, b: u32) -> Option<u32> {
        let v = self.v;
        let (ra, rb) = (a % v, b % v);
        let delta = if self.residue_index[ra as usize].is_some()
            && self.residue_index[rb as usize].is_some()
        {
            0
        } else {
            let diff = (rb + v - ra) % v;
            (self.anchor[diff as usize] + v - ra) % v
        };
        let in_range = a as usize + delta as usize <= self.text_len
            && b as usize + delta as usize <= self.text_len;
        in_range.then_some(delta)
    }

    // --------------------------------------------------
    /// Total order of two sampled suffixes from their precomputed
    /// ranks. Both positions must be sampled and at most the text
    /// length.
    pub fn break_tie(&self, a: u32, b: u32) -> Ordering {
        self.rank[self.sample_index(a)].cmp(&self.rank[self.sample_index(b)])
    }

    // --------------------------------------------------
    fn sample_index(&self, pos: u32) -> usize {
        let q = (pos / self.v) as usize;
        let s = self.residue_index[(pos % self.v) as usize]
            .expect("position is not in the difference cover");
        q * self.residues.len() + s as usize
    }

    // --------------------------------------------------
    // Rank the sampled suffixes: order them by their first `v`
    // characters, then refine by prefix doubling with steps v, 2v, 4v,
    // ... (sampled positions are closed under adding v). A position
    // past the text end ranks below everything, matching the implied
    // sentinel.
    fn build_ranks(&mut self, text: &[u8]) -> Result<usize> {
        let n = text.len();
        let v = self.v as usize;
        let width = self.residues.len();

        let mut positions: Vec<u32> = Vec::new();
        try_reserve(&mut positions, (n / v + 1) * width, "cover sample positions")?;
        positions.extend(
            (0..=n as u32).filter(|&p| self.residue_index[(p % self.v) as usize].is_some()),
        );
        let m = positions.len();

        let prefix = |p: u32| {
            let start = p as usize;
            &text[start..(start + v).min(n)]
        };
        positions.sort_unstable_by(|&a, &b| prefix(a).cmp(prefix(b)));

        self.rank = vec![0; (n / v + 1) * width];
        let mut distinct = 1;
        for i in 1..m {
            if prefix(positions[i - 1]) != prefix(positions[i]) {
                distinct += 1;
            }
            let idx = self.sample_index(positions[i]);
            self.rank[idx] = (distinct - 1) as u32;
        }

        let mut h = v;
        while distinct < m {
            let step = h;
            let key = |p: u32, rank: &[u32]| {
                let head = rank[self.sample_index(p)] as u64;
                let tail = if p as usize + step <= n {
                    rank[self.sample_index(p + step as u32)] as u64 + 1
                } else {
                    0
                };
                (head << 32) | tail
            };
            let rank = &self.rank;
            positions.sort_unstable_by_key(|&p| key(p, rank));

            let mut next = vec![0u32; rank.len()];
            distinct = 1;
            for i in 1..m {
                if key(positions[i - 1], rank) != key(positions[i], rank) {
                    distinct += 1;
                }
                next[self.sample_index(positions[i])] = (distinct - 1) as u32;
            }
            self.rank = next;
            h *= 2;
        }

        Ok(m)
    }
}

// --------------------------------------------------
#[cfg(test)]
mod tests {
    use super::DifferenceCover;
    use pretty_assertions::assert_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::cmp::Ordering;

    #[test]
    fn test_rejects_bad_periodicity() {
        for v in [1, 2, 3, 5, 6, 100] {
            assert!(DifferenceCover::build(b"ACGT", v).is_err());
        }
    }

    #[test]
    fn test_every_difference_is_covered() {
        for v in [4u32, 8, 16, 64, 128, 1024] {
            let text = vec![b'A'; 2 * v as usize];
            let dc = DifferenceCover::build(&text, v).unwrap();
            for d in 0..v {
                // Offsets 0 and d have difference d and plenty of text
                let delta = dc.tie_break_off(0, d).unwrap();
                assert!(delta < v, "v {v} d {d} delta {delta}");
            }
        }
    }

    #[test]
    fn test_tie_break_off_is_symmetric_in_range() {
        let text = vec![b'C'; 300];
        let dc = DifferenceCover::build(&text, 16).unwrap();
        for a in 0..64u32 {
            for b in 0..64u32 {
                let delta = dc.tie_break_off(a, b).unwrap();
                // Both shifted positions must be sampled
                assert!(dc.residue_index[((a + delta) % 16) as usize].is_some());
                assert!(dc.residue_index[((b + delta) % 16) as usize].is_some());
            }
        }
    }

    #[test]
    fn test_tie_break_off_out_of_range() {
        let text = vec![b'C'; 20];
        let dc = DifferenceCover::build(&text, 16).unwrap();
        // Shifting past the end of the text yields no usable pair
        assert_eq!(dc.tie_break_off(19, 5), None);
    }

    #[test]
    fn test_break_tie_orders_sampled_suffixes() {
        let mut rng = StdRng::seed_from_u64(1);
        let text: Vec<u8> = (0..500).map(|_| b"ACGT"[rng.gen_range(0..4)]).collect();
        let dc = DifferenceCover::build(&text, 8).unwrap();

        let sampled: Vec<u32> = (0..=text.len() as u32)
            .filter(|&p| dc.residue_index[(p % 8) as usize].is_some())
            .collect();
        for &a in &sampled {
            for &b in &sampled {
                let expected = text[a as usize..].cmp(&text[b as usize..]);
                assert_eq!(dc.break_tie(a, b), expected, "a {a} b {b}");
            }
        }
    }

    #[test]
    fn test_break_tie_repetitive_text() {
        // Forces the prefix-doubling refinement: every length-8 window
        // is identical
        let text = vec![b'a'; 200];
        let dc = DifferenceCover::build(&text, 8).unwrap();
        let sampled: Vec<u32> = (0..=200u32)
            .filter(|&p| dc.residue_index[(p % 8) as usize].is_some())
            .collect();
        for w in sampled.windows(2) {
            // Longer run of a's sorts after the shorter one
            assert_eq!(dc.break_tie(w[0], w[1]), Ordering::Greater);
        }
    }
}
