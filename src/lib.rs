//! Dictionary-driven term shielding around an opaque translation step.
//!
//! A `.tkdic` dictionary lists terms that must survive translation. Matching terms
//! are swapped for sentinel tokens before the text goes to the translator, and the
//! sentinels are swapped for the dictionary targets afterwards.

pub mod config;
pub mod dictionary;
pub mod error;
pub mod ffi;
pub mod fuzzy;
pub mod logging;
pub mod matcher;
pub mod pipeline;
pub mod sentinels;
pub mod shield;

pub use dictionary::{DictionaryEntry, DictionaryRegistry, ParsedDictionary};
pub use error::{DictError, FormatError};
pub use pipeline::{ShieldPipeline, TextTransform};
pub use shield::{restore_text, shield_text, ShieldMapping, Shielded};
