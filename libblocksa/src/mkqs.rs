use crate::dcover::DifferenceCover;
use std::cmp::Ordering;

// --------------------------------------------------
/// Multikey quicksort a slice of suffix offsets into lexicographic
/// order, under the convention that a suffix ending before the other is
/// the smaller one. With a difference cover, any group of suffixes
/// still tied past the cover periodicity is settled from the cover
/// ranks instead of recursing deeper, which bounds the sort depth on
/// repetitive texts.
pub fn multikey_qsort(text: &[u8], sa: &mut [u32], dc: Option<&DifferenceCover>) {
    sort_range(text, sa, 0, dc);
}

// --------------------------------------------------
// The byte a suffix contributes at the given depth, or -1 past the end
// of the text so that ended suffixes partition below every byte value.
#[inline(always)]
fn byte_at(text: &[u8], suffix: u32, depth: usize) -> i32 {
    match text.get(suffix as usize + depth) {
        Some(&b) => b as i32,
        None => -1,
    }
}

// --------------------------------------------------
fn med3(a: i32, b: i32, c: i32) -> i32 {
    if a < b {
        if b < c {
            b
        } else {
            a.max(c)
        }
    } else if a < c {
        a
    } else {
        b.max(c)
    }
}

// --------------------------------------------------
fn sort_range(text: &[u8], sa: &mut [u32], depth: usize, dc: Option<&DifferenceCover>) {
    let len = sa.len();
    if len < 2 {
        return;
    }

    // Everything here shares a prefix of `depth` characters. Once that
    // reaches the periodicity, the cover can finish the job directly.
    if let Some(dc) = dc {
        if depth >= dc.v() as usize {
            sa.sort_unstable_by(|&a, &b| match dc.tie_break_off(a, b) {
                Some(delta) => dc.break_tie(a + delta, b + delta),
                None => text[a as usize..].cmp(&text[b as usize..]),
            });
            return;
        }
    }

    let pivot = med3(
        byte_at(text, sa[0], depth),
        byte_at(text, sa[len / 2], depth),
        byte_at(text, sa[len - 1], depth),
    );

    // Ternary split on the byte at this depth
    let mut lt = 0;
    let mut i = 0;
    let mut gt = len;
    while i < gt {
        match byte_at(text, sa[i], depth).cmp(&pivot) {
            Ordering::Less => {
                sa.swap(lt, i);
                lt += 1;
                i += 1;
            }
            Ordering::Equal => i += 1,
            Ordering::Greater => {
                gt -= 1;
                sa.swap(i, gt);
            }
        }
    }

    sort_range(text, &mut sa[..lt], depth, dc);
    if pivot >= 0 {
        // A group tied on -1 is a single ended suffix; no recursion
        sort_range(text, &mut sa[lt..gt], depth + 1, dc);
    }
    sort_range(text, &mut sa[gt..], depth, dc);
}

// --------------------------------------------------
#[cfg(test)]
mod tests {
    use super::multikey_qsort;
    use crate::dcover::DifferenceCover;
    use pretty_assertions::assert_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn naive_sorted(text: &[u8], offsets: &[u32]) -> Vec<u32> {
        let mut expected = offsets.to_vec();
        expected.sort_unstable_by(|&a, &b| text[a as usize..].cmp(&text[b as usize..]));
        expected
    }

    #[test]
    fn test_sorts_all_suffixes_of_banana() {
        let text = b"banana";
        let mut sa: Vec<u32> = (0..=6).collect();
        multikey_qsort(text, &mut sa, None);
        assert_eq!(sa, [6, 5, 3, 1, 0, 4, 2]);
    }

    #[test]
    fn test_sorts_subset_of_offsets() {
        let text = b"mississippi";
        let mut sa = vec![0, 4, 8, 2, 10];
        multikey_qsort(text, &mut sa, None);
        assert_eq!(sa, naive_sorted(text, &[0, 4, 8, 2, 10]));
    }

    #[test]
    fn test_random_text_with_and_without_cover() {
        let mut rng = StdRng::seed_from_u64(7);
        let text: Vec<u8> = (0..800).map(|_| b"ACGT"[rng.gen_range(0..4)]).collect();
        let offsets: Vec<u32> = (0..=800).step_by(3).collect();
        let expected = naive_sorted(&text, &offsets);

        let mut plain = offsets.clone();
        multikey_qsort(&text, &mut plain, None);
        assert_eq!(plain, expected);

        let dc = DifferenceCover::build(&text, 16).unwrap();
        let mut covered = offsets.clone();
        multikey_qsort(&text, &mut covered, Some(&dc));
        assert_eq!(covered, expected);
    }

    #[test]
    fn test_repetitive_text_uses_cover_past_periodicity() {
        // All suffixes share long prefixes, so every pair deeper than v
        // is settled by the cover ranks
        let text = vec![b'a'; 400];
        let offsets: Vec<u32> = (0..=400).collect();
        let dc = DifferenceCover::build(&text, 8).unwrap();
        let mut sa = offsets.clone();
        multikey_qsort(&text, &mut sa, Some(&dc));
        // Shorter runs of a's sort first
        let expected: Vec<u32> = (0..=400).rev().collect();
        assert_eq!(sa, expected);
    }
}
