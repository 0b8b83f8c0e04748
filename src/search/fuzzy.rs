//! Character-level similarity scores
//!
//! Both scores are on a 0–100 scale and operate on Unicode scalar values.
//!
//! - [`ratio`] is the normalized Indel similarity: `2·LCS / (|a| + |b|)`.
//!   It backs query spelling correction.
//! - [`partial_ratio`] is the best [`ratio`] of the shorter string against any
//!   equally long window of the longer one (windows clipped at both edges
//!   included). It backs the n-gram booster, where a short query token must
//!   match somewhere inside a title.

/// Normalized Indel similarity in `[0, 100]`. Empty input scores 0.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio_chars(&a, &b)
}

/// Best windowed [`ratio`] in `[0, 100]`. Empty input scores 0.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let (needle, haystack) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    let n = needle.len();
    let m = haystack.len();

    let mut best = 0.0_f64;
    for start in 0..=(m - n) {
        best = best.max(ratio_chars(needle, &haystack[start..start + n]));
        if best >= 100.0 {
            return 100.0;
        }
    }

    // Windows hanging off either end of the haystack.
    for len in 1..n {
        best = best.max(ratio_chars(needle, &haystack[..len]));
        best = best.max(ratio_chars(needle, &haystack[m - len..]));
    }

    best
}

fn ratio_chars(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let lcs = lcs_len(a, b);
    #[allow(clippy::cast_precision_loss)]
    let score = (2 * lcs) as f64 / total as f64 * 100.0;
    score
}

/// Longest common subsequence length, two-row DP.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
