use once_cell::sync::Lazy;
use regex::Regex;

/// Alphanumeric so translation models copy it through instead of translating it.
pub const SENTINEL_PREFIX: &str = "TkdicoTranslate";

/// Upper bound on sentinels (and matches) per shielding pass.
pub const MAX_SENTINELS: usize = 99;

pub static SENTINEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"TkdicoTranslate\d+").expect("sentinel regex"));

pub fn sentinel_token(seq: usize) -> String {
    format!("{SENTINEL_PREFIX}{seq}")
}

#[inline]
pub fn is_sentinel(s: &str) -> bool {
    s.strip_prefix(SENTINEL_PREFIX)
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

pub fn sentinels_in(text: &str) -> Vec<&str> {
    SENTINEL_RE.find_iter(text).map(|m| m.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_shape() {
        assert_eq!(sentinel_token(7), "TkdicoTranslate7");
        assert!(is_sentinel("TkdicoTranslate12"));
        assert!(!is_sentinel("TkdicoTranslate"));
        assert!(!is_sentinel("TkdicoTranslate1a"));
    }

    #[test]
    fn finds_longest_number() {
        assert_eq!(
            sentinels_in("a TkdicoTranslate12, TkdicoTranslate1."),
            vec!["TkdicoTranslate12", "TkdicoTranslate1"]
        );
    }
}
