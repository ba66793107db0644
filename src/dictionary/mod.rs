mod model;
mod parser;
mod registry;

pub use model::{DictionaryEntry, NewEntry, ParsedDictionary};
pub use parser::{parse_dictionary, parse_dictionary_file};
pub use registry::{list_dictionaries, DictionaryRegistry, DEFAULT_HEADER_FUZZY, DICT_EXTENSION};
