use tracing::debug;

use crate::dictionary::DictionaryEntry;
use crate::fuzzy::{best_match, partial_ratio};
use crate::sentinels::MAX_SENTINELS;

const TOKEN_TRIM: [char; 4] = ['.', ',', '?', '!'];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatchCandidate {
    pub entry_index: usize,
    pub score: u8,
    pub is_phrase: bool,
}

/// Entries whose term occurs (approximately) in `text`, in dictionary order.
///
/// Phrases are scored with [`partial_ratio`] against the whole text, single words with
/// the best token score. Stops after [`MAX_SENTINELS`] matches.
pub fn find_matches(
    text: &str,
    entries: &[DictionaryEntry],
    default_threshold: u8,
) -> Vec<MatchCandidate> {
    let text_lower = text.to_lowercase();
    let tokens = tokenize(text);

    let mut out = Vec::new();
    for (entry_index, entry) in entries.iter().enumerate() {
        if out.len() >= MAX_SENTINELS {
            debug!(remaining = entries.len() - entry_index, "match cap reached");
            break;
        }
        let threshold = entry.fuzzy_threshold.unwrap_or(default_threshold);
        let term = entry.term.trim().to_lowercase();
        let is_phrase = entry.is_phrase();

        let score = if is_phrase {
            Some(partial_ratio(&term, &text_lower))
        } else {
            best_match(&term, &tokens).map(|(_, s)| s)
        };
        let Some(score) = score else {
            continue;
        };
        if score >= threshold {
            debug!(term = %entry.term, score, threshold, is_phrase, "dictionary term matched");
            out.push(MatchCandidate {
                entry_index,
                score,
                is_phrase,
            });
        }
    }
    out
}

/// Whitespace tokens, lower-cased, with trailing `. , ? !` stripped.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| w.trim_end_matches(&TOKEN_TRIM[..]).to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}
