use serde::{Deserialize, Serialize};

use crate::error::FormatError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub term: String,
    pub target: String,
    #[serde(default)]
    pub fuzzy_threshold: Option<u8>,
}

impl DictionaryEntry {
    /// Multi-word terms are scored against the whole text instead of single tokens.
    #[must_use]
    pub fn is_phrase(&self) -> bool {
        self.term.split_whitespace().nth(1).is_some()
    }
}

#[derive(Clone, Debug, Default)]
pub struct ParsedDictionary {
    /// `main_fuzzy[N]`; `None` when the file does not declare one.
    pub default_threshold: Option<u8>,
    pub entries: Vec<DictionaryEntry>,
    pub diagnostics: Vec<FormatError>,
}

impl ParsedDictionary {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// An entry appended through the registry.
#[derive(Clone, Debug, Deserialize)]
pub struct NewEntry {
    pub term: String,
    pub target: String,
    #[serde(default)]
    pub fuzzy: Option<u8>,
}
