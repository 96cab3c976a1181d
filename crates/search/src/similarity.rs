/// Ratcliff/Obershelp "gestalt" similarity of two strings, in `[0, 1]`.
///
/// `2 * M / (len(a) + len(b))`, where `M` counts characters in the longest
/// common block plus, recursively, the blocks left and right of it. Two empty
/// strings are identical.
#[must_use]
pub fn sequence_ratio(a: &str, b: &str) -> f32 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let ratio = (2 * matching_chars(&a, &b)) as f32 / total as f32;
    ratio
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut total = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];
    while let Some((a_lo, a_hi, b_lo, b_hi)) = pending.pop() {
        let (i, j, size) = longest_block(a, b, a_lo, a_hi, b_lo, b_hi);
        if size == 0 {
            continue;
        }
        total += size;
        if a_lo < i && b_lo < j {
            pending.push((a_lo, i, b_lo, j));
        }
        if i + size < a_hi && j + size < b_hi {
            pending.push((i + size, a_hi, j + size, b_hi));
        }
    }
    total
}

/// Longest common block of `a[a_lo..a_hi]` and `b[b_lo..b_hi]`; the
/// earliest one in `a` (then `b`) wins ties.
fn longest_block(
    a: &[char],
    b: &[char],
    a_lo: usize,
    a_hi: usize,
    b_lo: usize,
    b_hi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (a_lo, b_lo, 0);
    // run[j + 1] = length of the common run ending at a[i - 1], b[j].
    let mut prev = vec![0usize; b_hi - b_lo + 1];
    let mut curr = vec![0usize; b_hi - b_lo + 1];
    for i in a_lo..a_hi {
        for j in b_lo..b_hi {
            let k = j - b_lo;
            curr[k + 1] = if a[i] == b[j] { prev[k] + 1 } else { 0 };
            let size = curr[k + 1];
            if size > best_size {
                best_size = size;
                best_i = i + 1 - size;
                best_j = j + 1 - size;
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    (best_i, best_j, best_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn known_ratios() {
        assert!(close(sequence_ratio("abcd", "bcde"), 0.75));
        assert!(close(sequence_ratio("display po", "display po"), 1.0));
        assert!(close(sequence_ratio("abc", "xyz"), 0.0));
        assert!(close(sequence_ratio("", ""), 1.0));
        assert!(close(sequence_ratio("abc", ""), 0.0));
    }

    #[test]
    fn counts_blocks_on_both_sides_of_the_longest_match() {
        // "purchase" + " order" are matched around the differing middle word.
        let r = sequence_ratio("display purchase order", "change purchase order");
        assert!(r > 0.7 && r < 1.0, "{r}");
    }

    proptest! {
        #[test]
        fn ratio_is_bounded_and_reflexive(a in "[a-z ]{0,24}", b in "[a-z ]{0,24}") {
            let r = sequence_ratio(&a, &b);
            prop_assert!((0.0..=1.0).contains(&r));
            prop_assert!(close(sequence_ratio(&a, &a), 1.0));
        }
    }
}
