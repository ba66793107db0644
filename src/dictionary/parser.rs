use std::path::Path;

use encoding_rs::UTF_8;
use tracing::{debug, warn};

use super::model::{DictionaryEntry, ParsedDictionary};
use crate::error::{DictError, FormatError, Result};

const TAG_MAIN_FUZZY: &str = "main_fuzzy";
const TAG_WORD: &str = "word";
const TAG_TARGET: &str = "kor";
const TAG_FUZZY: &str = "fuzzy";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ParseState {
    Idle,
    /// A `word[` line was not closed; raw lines are term text until one ends in `]`.
    ReadingTermContinuation,
}

#[derive(Default)]
struct PendingEntry {
    term: Option<String>,
    target: Option<String>,
    fuzzy: Option<u8>,
}

impl PendingEntry {
    fn has_term(&self) -> bool {
        self.term.is_some()
    }

    fn commit(self, line: usize, out: &mut Vec<DictionaryEntry>) {
        let Some(term) = self.term else {
            return;
        };
        let term = term.trim().to_string();
        if term.is_empty() {
            warn!(line, "dropping dictionary entry with empty term");
            return;
        }
        let Some(target) = self.target else {
            warn!(line, term = %term, "dropping dictionary entry without kor[...]");
            return;
        };
        out.push(DictionaryEntry {
            term,
            target,
            fuzzy_threshold: self.fuzzy,
        });
    }
}

pub fn parse_dictionary_file(path: &Path) -> Result<ParsedDictionary> {
    let bytes = std::fs::read(path).map_err(|e| DictError::io(path, e))?;
    let (text, had_errors) = UTF_8.decode_with_bom_removal(&bytes);
    if had_errors {
        return Err(DictError::Encoding {
            path: path.to_path_buf(),
        });
    }
    let parsed = parse_dictionary(&text);
    debug!(
        path = %path.display(),
        entries = parsed.entries.len(),
        default_threshold = ?parsed.default_threshold,
        "parsed dictionary"
    );
    Ok(parsed)
}

pub fn parse_dictionary(contents: &str) -> ParsedDictionary {
    let contents = contents.strip_prefix('\u{feff}').unwrap_or(contents);

    let mut out = ParsedDictionary::default();
    let mut state = ParseState::Idle;
    let mut pending = PendingEntry::default();
    let mut line_no = 0usize;

    for raw in contents.lines() {
        line_no += 1;
        let line = raw.trim();

        if state == ParseState::ReadingTermContinuation {
            let term = pending.term.get_or_insert_with(String::new);
            match line.strip_suffix(']') {
                Some(rest) => {
                    term.push_str(rest);
                    state = ParseState::Idle;
                }
                None => {
                    term.push_str(line);
                    term.push(' ');
                }
            }
            continue;
        }

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((tag, value, closed)) = split_tag(line) else {
            debug!(line = line_no, "ignoring untagged dictionary line");
            continue;
        };

        match tag {
            TAG_MAIN_FUZZY => {
                if let Some(v) = parse_threshold(tag, value, line_no, &mut out.diagnostics) {
                    out.default_threshold = Some(v);
                }
            }
            TAG_WORD => {
                if pending.has_term() {
                    std::mem::take(&mut pending).commit(line_no, &mut out.entries);
                } else {
                    pending = PendingEntry::default();
                }
                let mut term = value.to_string();
                if !closed {
                    term.push(' ');
                    state = ParseState::ReadingTermContinuation;
                }
                pending.term = Some(term);
            }
            TAG_TARGET => pending.target = Some(value.to_string()),
            TAG_FUZZY => {
                if let Some(v) = parse_threshold(tag, value, line_no, &mut out.diagnostics) {
                    pending.fuzzy = Some(v);
                }
            }
            other => debug!(line = line_no, tag = other, "ignoring unknown dictionary tag"),
        }
    }

    if state == ParseState::ReadingTermContinuation {
        warn!(line = line_no, "dictionary ended inside an unclosed word[...]");
    }
    pending.commit(line_no, &mut out.entries);
    out
}

/// Splits `tag[value]` into `(tag, value, closed)`.
///
/// A closed line ends in `]` and its value stops at the last `]`; an open one takes
/// everything after the first `[`.
fn split_tag(line: &str) -> Option<(&str, &str, bool)> {
    let open = line.find('[')?;
    let tag = &line[..open];
    if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }
    let rest = &line[open + 1..];
    match rest.strip_suffix(']') {
        Some(value) => Some((tag, value, true)),
        None => Some((tag, rest, false)),
    }
}

fn parse_threshold(
    tag: &str,
    value: &str,
    line: usize,
    diagnostics: &mut Vec<FormatError>,
) -> Option<u8> {
    match value.trim().parse::<u8>() {
        Ok(v) if v <= 100 => Some(v),
        _ => {
            let err = FormatError {
                tag: tag.to_string(),
                raw: value.to_string(),
                line,
            };
            warn!("{err}");
            diagnostics.push(err);
            None
        }
    }
}
