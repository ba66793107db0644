use std::collections::{HashMap, HashSet};

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::dictionary::DictionaryEntry;
use crate::matcher::MatchCandidate;
use crate::sentinels::{sentinel_token, SENTINEL_RE, MAX_SENTINELS};

/// Sentinel → target text for one request.
pub type ShieldMapping = HashMap<String, String>;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShieldedTerm {
    pub token: String,
    pub term: String,
    pub occurrences: usize,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Shielded {
    pub text: String,
    pub mapping: ShieldMapping,
    #[serde(default)]
    pub terms: Vec<ShieldedTerm>,
}

impl Shielded {
    /// Text passed through untouched.
    #[must_use]
    pub fn passthrough(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Self::default()
        }
    }
}

enum Piece {
    Plain(String),
    Token(String),
}

/// Replaces every bounded, case-insensitive occurrence of each matched term with a
/// sentinel. Sentinels are numbered from 1 in match order; a match whose literal
/// term never occurs consumes no number, and no number above [`MAX_SENTINELS`] is used.
pub fn shield_text(
    text: &str,
    entries: &[DictionaryEntry],
    matches: &[MatchCandidate],
) -> Shielded {
    if text.is_empty() || matches.is_empty() {
        return Shielded::passthrough(text);
    }

    // Sentinel-shaped text already present in the input is kept as-is and its numbers
    // are never handed out.
    let reserved: HashSet<&str> = SENTINEL_RE.find_iter(text).map(|m| m.as_str()).collect();
    let mut pieces = split_existing_sentinels(text);

    let mut mapping = ShieldMapping::new();
    let mut terms = Vec::new();
    let mut next_seq = 1usize;

    for cand in matches {
        if terms.len() >= MAX_SENTINELS {
            debug!("sentinel cap reached");
            break;
        }
        let Some(entry) = entries.get(cand.entry_index) else {
            continue;
        };
        let term = entry.term.trim();
        let re = match term_regex(term) {
            Ok(re) => re,
            Err(err) => {
                warn!(term, "skipping dictionary term: {err}");
                continue;
            }
        };

        while reserved.contains(sentinel_token(next_seq).as_str()) {
            next_seq += 1;
        }
        if next_seq > MAX_SENTINELS {
            debug!("sentinel numbers exhausted");
            break;
        }
        let token = sentinel_token(next_seq);

        let mut occurrences = 0usize;
        let last = pieces.len().saturating_sub(1);
        let mut next = Vec::with_capacity(pieces.len());
        for (i, piece) in pieces.into_iter().enumerate() {
            match piece {
                Piece::Token(t) => next.push(Piece::Token(t)),
                Piece::Plain(s) => {
                    occurrences += replace_bounded(&s, term, &re, &token, i == 0, i == last, &mut next)
                }
            }
        }
        pieces = next;

        if occurrences == 0 {
            debug!(term, "matched term has no literal occurrence");
            continue;
        }
        debug!(term, token = %token, occurrences, "term shielded");
        mapping.insert(token.clone(), entry.target.clone());
        terms.push(ShieldedTerm {
            token,
            term: term.to_string(),
            occurrences,
        });
        next_seq += 1;
    }

    let text = pieces
        .into_iter()
        .map(|p| match p {
            Piece::Plain(s) | Piece::Token(s) => s,
        })
        .collect::<String>();
    Shielded {
        text,
        mapping,
        terms,
    }
}

/// Puts mapped targets back. Unknown sentinel-shaped tokens are left untouched, and
/// inserted targets are never scanned again.
pub fn restore_text(text: &str, mapping: &ShieldMapping) -> String {
    if mapping.is_empty() || text.is_empty() {
        return text.to_string();
    }
    SENTINEL_RE
        .replace_all(text, |caps: &regex::Captures<'_>| {
            let tok = &caps[0];
            mapping.get(tok).cloned().unwrap_or_else(|| tok.to_string())
        })
        .into_owned()
}

fn split_existing_sentinels(text: &str) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let mut pos = 0usize;
    for m in SENTINEL_RE.find_iter(text) {
        if m.start() > pos {
            pieces.push(Piece::Plain(text[pos..m.start()].to_string()));
        }
        pieces.push(Piece::Token(m.as_str().to_string()));
        pos = m.end();
    }
    if pos < text.len() {
        pieces.push(Piece::Plain(text[pos..].to_string()));
    }
    pieces
}

fn term_regex(term: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(&regex::escape(term))
        .case_insensitive(true)
        .build()
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

/// Splits `plain` around bounded matches of `re`, pushing the parts onto `out`.
///
/// A piece edge next to a sentinel counts as a word character, since sentinels are
/// alphanumeric. Returns the number of replacements.
fn replace_bounded(
    plain: &str,
    term: &str,
    re: &Regex,
    token: &str,
    at_text_start: bool,
    at_text_end: bool,
    out: &mut Vec<Piece>,
) -> usize {
    let need_left = term.chars().next().is_some_and(is_word_char);
    let need_right = term.chars().next_back().is_some_and(is_word_char);

    let mut count = 0usize;
    let mut emitted = 0usize;
    let mut pos = 0usize;
    while pos <= plain.len() {
        let Some(m) = re.find_at(plain, pos) else {
            break;
        };
        let left_ok = !need_left
            || match plain[..m.start()].chars().next_back() {
                Some(c) => !is_word_char(c),
                None => at_text_start,
            };
        let right_ok = !need_right
            || match plain[m.end()..].chars().next() {
                Some(c) => !is_word_char(c),
                None => at_text_end,
            };
        if left_ok && right_ok && m.end() > m.start() {
            if m.start() > emitted {
                out.push(Piece::Plain(plain[emitted..m.start()].to_string()));
            }
            out.push(Piece::Token(token.to_string()));
            emitted = m.end();
            pos = m.end();
            count += 1;
        } else {
            let step = plain[m.start()..].chars().next().map_or(1, char::len_utf8);
            pos = m.start() + step;
        }
    }
    if emitted < plain.len() {
        out.push(Piece::Plain(plain[emitted..].to_string()));
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::find_matches;

    fn entry(term: &str, target: &str) -> DictionaryEntry {
        DictionaryEntry {
            term: term.to_string(),
            target: target.to_string(),
            fuzzy_threshold: None,
        }
    }

    fn shield(text: &str, entries: &[DictionaryEntry], threshold: u8) -> Shielded {
        let matches = find_matches(text, entries, threshold);
        shield_text(text, entries, &matches)
    }

    #[test]
    fn no_terms_is_passthrough() {
        let entries = vec![entry("pencil", "연필")];
        let s = shield("nothing to see here", &entries, 90);
        assert_eq!(s.text, "nothing to see here");
        assert!(s.mapping.is_empty());
        assert_eq!(restore_text(&s.text, &s.mapping), "nothing to see here");
    }

    #[test]
    fn replaces_only_bounded_words() {
        let entries = vec![entry("pencil", "연필")];
        let s = shield("I love Pencil, Pencils and pencil-cases", &entries, 80);
        assert_eq!(s.text, "I love TkdicoTranslate1, Pencils and pencil-cases");
        assert_eq!(s.mapping.get("TkdicoTranslate1").map(String::as_str), Some("연필"));
        assert_eq!(s.terms[0].occurrences, 1);
    }

    #[test]
    fn fuzzy_hit_without_literal_occurrence_takes_no_number() {
        let entries = vec![entry("pencil", "연필"), entry("stone", "돌")];
        let s = shield("Pencils and stone", &entries, 80);
        assert_eq!(s.text, "Pencils and TkdicoTranslate1");
        assert_eq!(s.mapping.len(), 1);
        assert_eq!(s.mapping["TkdicoTranslate1"], "돌");
    }

    #[test]
    fn replaces_all_occurrences_case_insensitively() {
        let entries = vec![entry("Apple Pencil", "애플 펜슬")];
        let s = shield("apple pencil or APPLE PENCIL?", &entries, 90);
        assert_eq!(s.text, "TkdicoTranslate1 or TkdicoTranslate1?");
        assert_eq!(restore_text(&s.text, &s.mapping), "애플 펜슬 or 애플 펜슬?");
    }

    #[test]
    fn later_terms_do_not_touch_placed_sentinels() {
        let entries = vec![entry("stone", "돌"), entry("translate", "번역")];
        let s = shield("stone translate", &entries, 100);
        assert_eq!(s.text, "TkdicoTranslate1 TkdicoTranslate2");
    }

    #[test]
    fn non_word_term_edges_need_no_boundary() {
        let entries = vec![entry("C++", "씨쁠쁠")];
        let s = shield("I write C++ daily", &entries, 100);
        assert_eq!(s.text, "I write TkdicoTranslate1 daily");
    }

    #[test]
    fn skips_numbers_already_in_input() {
        let entries = vec![entry("stone", "돌")];
        let s = shield("TkdicoTranslate1 stone", &entries, 100);
        assert_eq!(s.text, "TkdicoTranslate1 TkdicoTranslate2");
        assert_eq!(restore_text(&s.text, &s.mapping), "TkdicoTranslate1 돌");
    }

    #[test]
    fn caps_at_ninety_nine_sentinels() {
        let entries: Vec<_> = (0..150).map(|i| entry(&format!("w{i}"), &format!("t{i}"))).collect();
        let text = (0..150).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        let s = shield(&text, &entries, 100);
        assert_eq!(s.mapping.len(), MAX_SENTINELS);
        assert!(s.text.contains("TkdicoTranslate99"));
        assert!(!s.text.contains("TkdicoTranslate100"));
        assert!(s.text.ends_with("w149"));
    }

    #[test]
    fn reserved_numbers_count_against_the_cap() {
        let entries: Vec<_> = (0..99).map(|i| entry(&format!("w{i}"), &format!("t{i}"))).collect();
        let words = (0..99).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ");
        let text = format!("TkdicoTranslate1 {words}");
        let s = shield(&text, &entries, 100);

        assert_eq!(s.mapping.len(), MAX_SENTINELS - 1);
        assert!(!s.mapping.contains_key("TkdicoTranslate1"));
        assert!(s.mapping.contains_key("TkdicoTranslate99"));
        assert!(!s.text.contains("TkdicoTranslate100"));
        assert!(s.text.ends_with(" w98"));
    }

    #[test]
    fn restore_tolerates_missing_duplicated_and_unknown_sentinels() {
        let mut mapping = ShieldMapping::new();
        mapping.insert("TkdicoTranslate1".to_string(), "하나".to_string());
        mapping.insert("TkdicoTranslate12".to_string(), "열둘".to_string());
        let out = restore_text(
            "TkdicoTranslate12 TkdicoTranslate1 TkdicoTranslate1 TkdicoTranslate7",
            &mapping,
        );
        assert_eq!(out, "열둘 하나 하나 TkdicoTranslate7");
    }

    #[test]
    fn restore_is_idempotent() {
        let mut mapping = ShieldMapping::new();
        mapping.insert("TkdicoTranslate1".to_string(), "펜슬".to_string());
        let once = restore_text("a TkdicoTranslate1 b", &mapping);
        assert_eq!(restore_text(&once, &mapping), once);
    }
}
