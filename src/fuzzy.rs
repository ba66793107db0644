//! Similarity scores in `0..=100`, built on normalized Levenshtein distance.

use strsim::normalized_levenshtein;

/// Whole-string similarity. Empty input scores 0.
#[must_use]
pub fn ratio(a: &str, b: &str) -> u8 {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    to_score(normalized_levenshtein(a, b))
}

/// Best [`ratio`] of the shorter string against every window of the longer one
/// with the same char length.
#[must_use]
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    if short.is_empty() {
        return 0;
    }
    let long_chars: Vec<char> = long.chars().collect();
    let width = short.chars().count();
    if width == long_chars.len() {
        return ratio(short, long);
    }

    let mut best = 0u8;
    let mut window = String::with_capacity(width * 4);
    for start in 0..=long_chars.len() - width {
        window.clear();
        window.extend(&long_chars[start..start + width]);
        let score = ratio(short, &window);
        if score > best {
            best = score;
            if best == 100 {
                break;
            }
        }
    }
    best
}

/// Index and score of the candidate closest to `query`; the first one wins ties.
#[must_use]
pub fn best_match<S: AsRef<str>>(query: &str, candidates: &[S]) -> Option<(usize, u8)> {
    let mut best: Option<(usize, u8)> = None;
    for (i, cand) in candidates.iter().enumerate() {
        let score = ratio(query, cand.as_ref());
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((i, score));
            if score == 100 {
                break;
            }
        }
    }
    best
}

fn to_score(sim: f64) -> u8 {
    (sim.clamp(0.0, 1.0) * 100.0).round() as u8
}
