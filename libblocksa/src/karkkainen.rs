use crate::{
    dcover::DifferenceCover,
    mkqs::multikey_qsort,
    suffix_stream::SuffixBlockSource,
    types::{InvariantViolated, KarkkainenArgs, MAX_TEXT_LEN},
    util::{binary_sa_search, suffix_lcp, suffix_less, try_reserve},
    zbox::calc_z,
};
use anyhow::{bail, Result};
use log::{debug, info};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::{cmp::min, time::Instant};

/// Sample-refinement rounds before a fresh set of random samples is
/// drawn.
const REFINE_ROUNDS: u32 = 20;

/// Fresh-sample restarts before the build gives up. In practice bucket
/// imbalance shrinks geometrically and one attempt suffices.
const MAX_RESTARTS: u32 = 16;

// --------------------------------------------------
/// Streams the suffix array of a text one block at a time following
/// Karkkainen's blockwise scheme: a small set of sample suffixes
/// partitions the suffix array into buckets no larger than the
/// requested bound, and each block is produced by a single scan of the
/// text that keeps only the suffixes falling between the bucket's two
/// bookend samples. Peak memory is one bucket plus the samples plus the
/// difference cover, never the whole suffix array.
#[derive(Debug)]
pub struct KarkkainenSa<'a> {
    text: &'a [u8],
    bucket_size: u32,
    dc_v: u32,
    sanity_check: bool,
    dc: Option<DifferenceCover>,
    sample_suffs: Vec<u32>,
    cur: usize,
    rng: StdRng,
}

// --------------------------------------------------
// Running match state for one bookend across the accumulator scan:
// `j` is the start of the rightmost extension, `k` the furthest text
// position any extension has reached, and `k_soft` records that `k`
// came from a cover tie-break and may underestimate the true match.
#[derive(Debug)]
struct ZState {
    j: i64,
    k: i64,
    k_soft: bool,
}

impl ZState {
    fn new() -> ZState {
        ZState {
            j: -1,
            k: -1,
            k_soft: false,
        }
    }
}

impl<'a> KarkkainenSa<'a> {
    // --------------------------------------------------
    /// Validate the arguments, build the difference cover (when
    /// enabled) and the sample suffixes. After this the builder only
    /// ever holds one bucket at a time.
    pub fn new(args: KarkkainenArgs<'a>) -> Result<KarkkainenSa<'a>> {
        let text = args.text;
        if text.len() > MAX_TEXT_LEN {
            bail!(
                "text length {} exceeds the supported maximum {MAX_TEXT_LEN}",
                text.len()
            );
        }
        if args.dc_v != 0 && (args.dc_v <= 3 || !args.dc_v.is_power_of_two()) {
            bail!(
                "difference-cover periodicity must be 0 or a power of two > 3, got {}",
                args.dc_v
            );
        }

        let dc = match args.dc_v {
            0 => None,
            v => Some(DifferenceCover::build(text, v)?),
        };

        let mut sa = KarkkainenSa {
            text,
            bucket_size: args.bucket_size.max(2),
            dc_v: args.dc_v,
            sanity_check: args.sanity_check,
            dc,
            sample_suffs: vec![],
            cur: 0,
            rng: StdRng::seed_from_u64(args.random_seed),
        };

        if (sa.bucket_size as usize) <= text.len() {
            sa.build_samples()?;
        } else {
            info!(
                "Text length {} is less than bucket size {}, skipping samples",
                text.len(),
                sa.bucket_size
            );
        }
        Ok(sa)
    }

    // --------------------------------------------------
    /// The sorted sample suffixes delimiting the buckets
    pub fn sample_suffixes(&self) -> &[u32] {
        &self.sample_suffs
    }

    // --------------------------------------------------
    // Select sample suffixes such that no induced bucket exceeds
    // `bucket_size - 1` elements, leaving one slot for the bookend that
    // is emitted with each block.
    fn build_samples(&mut self) -> Result<()> {
        let n = self.text.len();
        let bsz = (self.bucket_size - 1) as usize;
        // Over-sample by roughly 4x to keep monster buckets rare
        let num_samples = n.div_ceil(bsz) * 4;

        for attempt in 0..MAX_RESTARTS {
            let now = Instant::now();
            let mut samples: Vec<u32> = Vec::new();
            try_reserve(&mut samples, num_samples, "sample suffixes")?;
            for _ in 0..num_samples {
                samples.push(self.rng.gen_range(0..n) as u32);
            }
            // Dedup numerically before any lexicographic work; sorting
            // identical long suffixes against each other is quadratic.
            samples.sort_unstable();
            samples.dedup();
            info!(
                "Drew {} distinct sample offsets in {:?}",
                samples.len(),
                now.elapsed()
            );

            let now = Instant::now();
            multikey_qsort(self.text, &mut samples, self.dc.as_ref());
            info!(
                "Multikey-sorted {} samples in {:?}",
                samples.len(),
                now.elapsed()
            );

            if self.refine_samples(&mut samples, bsz)? {
                let num_buckets = samples.len() + 1;
                info!(
                    "Avg bucket size {:.1} (target {bsz}) across {num_buckets} buckets",
                    (n - samples.len()) as f64 / num_buckets as f64
                );
                self.sample_suffs = samples;
                return Ok(());
            }
            info!(
                "Bucket refinement unsettled after {REFINE_ROUNDS} rounds, \
                 restarting with fresh samples (attempt {})",
                attempt + 1
            );
        }
        bail!("bucket refinement failed to converge after {MAX_RESTARTS} attempts")
    }

    // --------------------------------------------------
    // One measurement pass sizes every bucket by binary-searching each
    // text offset against the samples, then adjacent small buckets are
    // merged and oversized buckets are split on a representative member
    // kept during the pass. Returns true once a pass performs no
    // splits.
    fn refine_samples(&mut self, samples: &mut Vec<u32>, bsz: usize) -> Result<bool> {
        let n = self.text.len();
        for round in 0..REFINE_ROUNDS {
            let mut num_buckets = samples.len() + 1;
            let mut bucket_szs: Vec<usize> = vec![0; num_buckets];
            let mut bucket_reps: Vec<Option<u32>> = vec![None; num_buckets];

            let now = Instant::now();
            for i in 0..n as u32 {
                let Some(r) = binary_sa_search(self.text, i, samples) else {
                    continue; // i is one of the samples
                };
                bucket_szs[r] += 1;
                // Replace the representative with 50% probability so it
                // is a reasonably random bucket member
                if bucket_reps[r].is_none() || (self.rng.gen::<u32>() & 1) == 0 {
                    bucket_reps[r] = Some(i);
                }
            }
            debug!(
                "Round {round}: sized {num_buckets} buckets in {:?}",
                now.elapsed()
            );

            // Splits go into `samples` immediately but not into the
            // size/rep arrays, so sample indexes run ahead by `added`.
            let mut added = 0;
            let mut merged = 0;
            let mut i = 0;
            while i < num_buckets {
                let merged_sz = if i < num_buckets - 1 {
                    bucket_szs[i] + bucket_szs[i + 1] + 1
                } else {
                    bsz + 1
                };
                if merged_sz <= bsz {
                    // Merge right; the removed boundary sample becomes
                    // the merged bucket's representative.
                    bucket_szs[i + 1] += bucket_szs[i] + 1;
                    bucket_reps[i + 1] = Some(samples[i + added]);
                    samples.remove(i + added);
                    bucket_szs.remove(i);
                    bucket_reps.remove(i);
                    num_buckets -= 1;
                    merged += 1;
                } else {
                    if bucket_szs[i] > bsz {
                        // The representative came from inside the
                        // bucket, so inserting here keeps the samples
                        // sorted.
                        let rep = bucket_reps[i].expect("oversized bucket has no representative");
                        samples.insert(i + added, rep);
                        added += 1;
                    }
                    i += 1;
                }
            }

            if added == 0 {
                return Ok(true);
            }
            debug!("Round {round}: split {added}, merged {merged}; iterating");
        }
        Ok(false)
    }

    // --------------------------------------------------
    /// Decide `suffix(i) < suffix(cmp)` for a fixed bookend `cmp`,
    /// reusing comparison work across an ascending scan of `i` through
    /// the bookend's Z array and the running match state. This is the
    /// SMALLERSUFFIXES comparison: any offset inside the furthest
    /// extension can be resolved from `z` instead of touching the text
    /// again.
    fn suffix_cmp(&self, cmp: u32, i: u32, st: &mut ZState, z: &[u32]) -> Result<bool> {
        let t = self.text;
        let n = t.len();
        let i_us = i as usize;
        let cmp_us = cmp as usize;
        debug_assert!(st.j < i as i64);

        let mut l;
        if i as i64 > st.k {
            // Not covered by any previous extension; start fresh
            st.k = i as i64;
            st.k_soft = false;
            l = 0;
        } else {
            let z_idx = (i as i64 - st.j) as usize;
            debug_assert!(z_idx <= n - cmp_us);
            if z_idx < z.len() {
                l = min(z[z_idx] as usize, n - i_us);
            } else if let Some(dc) = &self.dc {
                // Past the Z horizon: let the cover break the tie
                let (is_less, lcp, soft) = tie_breaking_lcp(t, dc, i, cmp);
                if self.sanity_check {
                    self.check_decision(i, cmp, is_less)?;
                    self.check_lcp(i, cmp, lcp, soft)?;
                }
                st.j = i as i64;
                st.k = (i_us + lcp) as i64;
                st.k_soft = soft;
                return Ok(is_less);
            } else {
                l = min(suffix_lcp(t, cmp_us + z_idx, cmp_us), n - i_us);
            }
        }

        if (i_us + l) as i64 == st.k {
            // The known match ends exactly at the frontier; push on
            while l < n - cmp_us && i_us + l < n && t[cmp_us + l] == t[i_us + l] {
                l += 1;
            }
            st.j = i as i64;
            st.k = (i_us + l) as i64;
            st.k_soft = false;
        } else if (i_us + l) as i64 > st.k {
            // The Z box crosses the frontier; everything past it is
            // unverified when the frontier was soft
            l = (st.k - i as i64) as usize;
            st.j = i as i64;
            if st.k_soft {
                while l < n - cmp_us && i_us + l < n && t[cmp_us + l] == t[i_us + l] {
                    l += 1;
                }
                st.k = (i_us + l) as i64;
                st.k_soft = false;
            }
        }

        if self.sanity_check {
            self.check_lcp(i, cmp, l, st.k_soft)?;
        }
        debug_assert!(l != n - cmp_us || i_us + l != n);

        // The implied sentinel is smaller than every byte, so the
        // suffix that runs out of text first is the smaller one.
        let is_less = if i_us + l == n {
            true
        } else if l == n - cmp_us {
            false
        } else {
            t[i_us + l] < t[cmp_us + l]
        };
        if self.sanity_check {
            self.check_decision(i, cmp, is_less)?;
        }
        Ok(is_less)
    }

    // --------------------------------------------------
    fn check_decision(&self, i: u32, cmp: u32, is_less: bool) -> Result<()> {
        if is_less != suffix_less(self.text, i, cmp) {
            return Err(InvariantViolated(format!(
                "comparator disagrees with naive order for suffixes {i} and {cmp}"
            ))
            .into());
        }
        Ok(())
    }

    // --------------------------------------------------
    fn check_lcp(&self, i: u32, cmp: u32, l: usize, soft: bool) -> Result<()> {
        let real = suffix_lcp(self.text, i as usize, cmp as usize);
        let ok = if soft { l <= real } else { l == real };
        if !ok {
            return Err(InvariantViolated(format!(
                "lcp {l} (soft {soft}) for suffixes {i} and {cmp}, expected {real}"
            ))
            .into());
        }
        Ok(())
    }

    // --------------------------------------------------
    fn check_block_order(&self, block: &[u32]) -> Result<()> {
        if block.len() >= self.bucket_size as usize {
            return Err(InvariantViolated(format!(
                "accumulated {} suffixes into a bucket bounded by {}",
                block.len(),
                self.bucket_size - 1
            ))
            .into());
        }
        for pair in block.windows(2) {
            if !suffix_less(self.text, pair[0], pair[1]) {
                return Err(InvariantViolated(format!(
                    "block out of lexicographic order at suffixes {} and {}",
                    pair[0], pair[1]
                ))
                .into());
            }
        }
        Ok(())
    }
}

// --------------------------------------------------
// LCP of two suffixes with the difference cover as tie-breaker: scan
// characters until a mismatch, a text end, or the cover shift, whichever
// comes first. When the cover supplies the verdict the returned lcp is
// only a lower bound and is flagged soft.
fn tie_breaking_lcp(
    text: &[u8],
    dc: &DifferenceCover,
    a: u32,
    b: u32,
) -> (bool, usize, bool) {
    let n = text.len();
    let a_us = a as usize;
    let b_us = b as usize;
    let dc_dist = dc.tie_break_off(a, b).map(|d| d as usize);

    let mut c = 0;
    while dc_dist != Some(c)
        && c < n - a_us
        && c < n - b_us
        && text[a_us + c] == text[b_us + c]
    {
        c += 1;
    }

    if c == n - a_us {
        // The left suffix ran out of text: it is the smaller one
        (true, c, false)
    } else if c == n - b_us {
        (false, c, false)
    } else if dc_dist == Some(c) {
        let less = dc.break_tie(a + c as u32, b + c as u32).is_lt();
        (less, c, true)
    } else {
        (text[a_us + c] < text[b_us + c], c, false)
    }
}

// --------------------------------------------------
impl SuffixBlockSource for KarkkainenSa<'_> {
    // The performance-critical part: one scan over every text offset,
    // comparing each against the block's two bookends.
    fn next_block(&mut self) -> Result<Vec<u32>> {
        let t = self.text;
        let n = t.len();
        debug!(
            "Building block {} of {}",
            self.cur + 1,
            self.sample_suffs.len() + 1
        );

        let mut block: Vec<u32> = Vec::new();
        let lo;
        if self.sample_suffs.is_empty() {
            // No samples: everything fits in one all-inclusive block
            try_reserve(&mut block, n + 1, "all-inclusive suffix block")?;
            block.extend(0..n as u32);
            lo = None;
        } else {
            try_reserve(&mut block, self.bucket_size as usize, "suffix block")?;
            let first = self.cur == 0;
            let last = self.cur == self.sample_suffs.len();
            let hi = (!last).then(|| self.sample_suffs[self.cur]);
            lo = (!first).then(|| self.sample_suffs[self.cur - 1]);

            let now = Instant::now();
            let z_hi = hi.map_or_else(Vec::new, |h| calc_z(t, h, self.dc_v));
            let z_lo = lo.map_or_else(Vec::new, |l| calc_z(t, l, self.dc_v));
            debug!("Calculated Z arrays in {:?}", now.elapsed());

            let mut st_hi = ZState::new();
            let mut st_lo = ZState::new();
            let now = Instant::now();
            for i in 0..n as u32 {
                if Some(i) == lo || Some(i) == hi {
                    continue;
                }
                if let Some(hi) = hi {
                    if !self.suffix_cmp(hi, i, &mut st_hi, &z_hi)? {
                        continue; // not below the upper bookend
                    }
                }
                if let Some(lo) = lo {
                    if self.suffix_cmp(lo, i, &mut st_lo, &z_lo)? {
                        continue; // not above the lower bookend
                    }
                }
                block.push(i);
            }
            debug!(
                "Accumulated {} suffixes in {:?}",
                block.len(),
                now.elapsed()
            );
        }

        if !block.is_empty() {
            let now = Instant::now();
            multikey_qsort(t, &mut block, self.dc.as_ref());
            debug!("Sorted block of {} in {:?}", block.len(), now.elapsed());
        }

        if self.sanity_check {
            self.check_block_order(&block)?;
        }

        // The lower bookend precedes everything accumulated between the
        // bookends; the very first block is led by the empty suffix,
        // the smallest of all.
        block.insert(0, lo.unwrap_or(n as u32));
        self.cur += 1;
        Ok(block)
    }

    fn has_more_blocks(&self) -> bool {
        self.cur <= self.sample_suffs.len()
    }

    fn reset(&mut self) {
        self.cur = 0;
    }
}
