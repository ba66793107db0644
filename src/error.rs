use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DictError {
    #[error("read dictionary {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("dictionary is not valid UTF-8: {}", path.display())]
    Encoding { path: PathBuf },
    #[error("dictionary not found: {name}")]
    NotFound { name: String },
    #[error("invalid dictionary name: {name:?} (expected a bare *.tkdic file name)")]
    InvalidName { name: String },
    #[error("dictionary already exists: {name}")]
    AlreadyExists { name: String },
    #[error("invalid entry: {0}")]
    InvalidEntry(String),
    #[error("invalid upload: {0}")]
    InvalidUpload(String),
}

impl DictError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, DictError>;

/// A malformed numeric tag. Recorded while parsing; never aborts the file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {tag}[{raw}] is not an integer in 0..=100")]
pub struct FormatError {
    pub tag: String,
    pub raw: String,
    pub line: usize,
}
