use std::cmp::min;

// --------------------------------------------------
/// Fill a Z array for the suffix starting at `off`: `z[j]` is the exact
/// length of the longest common prefix of `text[off..]` and
/// `text[off + j..]`, computed for `1 <= j < v` with the standard
/// left/right-box reuse. `z[0]` is left at zero; the comparator never
/// consults it.
pub fn calc_z(text: &[u8], off: u32, v: u32) -> Vec<u32> {
    let s = &text[off as usize..];
    let n = s.len();
    let mut z = vec![0u32; v as usize];
    let mut l = 0;
    let mut r = 0;
    for j in 1..min(v as usize, n) {
        let mut len = if j < r {
            min(r - j, z[j - l] as usize)
        } else {
            0
        };
        while j + len < n && s[len] == s[j + len] {
            len += 1;
        }
        z[j] = len as u32;
        if j + len > r {
            l = j;
            r = j + len;
        }
    }
    z
}

// --------------------------------------------------
#[cfg(test)]
mod tests {
    use super::calc_z;
    use crate::util::suffix_lcp;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_calc_z_banana() {
        let text = b"banana";
        // Suffix "anana": LCPs with its own suffixes
        let z = calc_z(text, 1, 8);
        assert_eq!(z, [0, 0, 3, 0, 1, 0, 0, 0]);
    }

    #[test]
    fn test_calc_z_repetitive() {
        let text = b"aaaaaaaa";
        let z = calc_z(text, 2, 4);
        // Suffix "aaaaaa" of length 6
        assert_eq!(z, [0, 5, 4, 3]);
    }

    #[test]
    fn test_calc_z_truncated_at_text_end() {
        let text = b"acgt";
        let z = calc_z(text, 2, 8);
        // Suffix "gt" has length 2; entries past it stay zero
        assert_eq!(z, [0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_calc_z_matches_naive_lcp() {
        let text = b"GATTACAGATTACAGATGAT";
        for off in 0..text.len() as u32 {
            let z = calc_z(text, off, 16);
            for (j, &val) in z.iter().enumerate().skip(1) {
                let expected = if off as usize + j < text.len() {
                    suffix_lcp(text, off as usize, off as usize + j)
                } else {
                    0
                };
                assert_eq!(val as usize, expected, "off {off} j {j}");
            }
        }
    }
}
