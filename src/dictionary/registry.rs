use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use base64::Engine;
use tracing::{info, warn};

use super::model::{NewEntry, ParsedDictionary};
use super::parser::parse_dictionary_file;
use crate::error::{DictError, Result};

pub const DICT_EXTENSION: &str = "tkdic";

/// `main_fuzzy` written into dictionaries created by [`DictionaryRegistry::append_entry`].
pub const DEFAULT_HEADER_FUZZY: u8 = 85;

/// Dictionary file names in `dir`, in directory enumeration order.
///
/// A missing directory lists as empty.
pub fn list_dictionaries(dir: &Path) -> Result<Vec<String>> {
    let rd = match std::fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(DictError::io(dir, e)),
    };
    let mut out = Vec::new();
    for ent in rd {
        let ent = ent.map_err(|e| DictError::io(dir, e))?;
        let path = ent.path();
        if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some(DICT_EXTENSION) {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
            out.push(name.to_string());
        }
    }
    Ok(out)
}

/// The dictionary directory plus the active selection.
///
/// The selection is only a file name; it is looked up again on every use, so a file
/// replaced on disk is picked up by the next parse.
pub struct DictionaryRegistry {
    dir: PathBuf,
    active: RwLock<Option<String>>,
}

impl DictionaryRegistry {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            active: RwLock::new(None),
        }
    }

    /// Restores a configured selection, keeping it only if the file exists.
    #[must_use]
    pub fn with_selection(dir: impl Into<PathBuf>, active: Option<&str>) -> Self {
        let reg = Self::new(dir);
        if let Some(name) = active {
            if let Err(err) = reg.select(name) {
                warn!("configured dictionary ignored: {err}");
            }
        }
        reg
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn list(&self) -> Result<Vec<String>> {
        list_dictionaries(&self.dir)
    }

    /// Makes `name` the active dictionary. Does not open the file.
    pub fn select(&self, name: &str) -> Result<()> {
        let available = self.list()?;
        info!(dictionaries = ?available, "available dictionaries");
        if !available.iter().any(|n| n == name) {
            warn!(name, "selected dictionary does not exist");
            return Err(DictError::NotFound {
                name: name.to_string(),
            });
        }
        *self.active.write().unwrap_or_else(|e| e.into_inner()) = Some(name.to_string());
        info!(name, "dictionary selected");
        Ok(())
    }

    #[must_use]
    pub fn active(&self) -> Option<String> {
        self.active
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn clear_selection(&self) {
        *self.active.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    pub fn path_of(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.dir.join(name))
    }

    /// Parses `name` fresh from disk.
    pub fn entries(&self, name: &str) -> Result<ParsedDictionary> {
        let path = self.path_of(name)?;
        if !path.is_file() {
            return Err(DictError::NotFound {
                name: name.to_string(),
            });
        }
        parse_dictionary_file(&path)
    }

    pub fn upload(&self, name: &str, content: &[u8], overwrite: bool) -> Result<PathBuf> {
        let path = self.path_of(name)?;
        std::fs::create_dir_all(&self.dir).map_err(|e| DictError::io(&self.dir, e))?;
        if path.exists() && !overwrite {
            return Err(DictError::AlreadyExists {
                name: name.to_string(),
            });
        }
        std::fs::write(&path, content).map_err(|e| DictError::io(&path, e))?;
        info!(name, bytes = content.len(), "dictionary uploaded");
        Ok(path)
    }

    pub fn upload_base64(&self, name: &str, content_b64: &str, overwrite: bool) -> Result<PathBuf> {
        let content = base64::engine::general_purpose::STANDARD
            .decode(content_b64.trim())
            .map_err(|e| DictError::InvalidUpload(format!("content is not base64: {e}")))?;
        self.upload(name, &content, overwrite)
    }

    /// Removes `name`; clears the selection if it pointed at this file.
    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.path_of(name)?;
        if !path.exists() {
            return Err(DictError::NotFound {
                name: name.to_string(),
            });
        }
        std::fs::remove_file(&path).map_err(|e| DictError::io(&path, e))?;

        let mut active = self.active.write().unwrap_or_else(|e| e.into_inner());
        if active.as_deref() == Some(name) {
            *active = None;
            info!(name, "active dictionary deleted; selection cleared");
        }
        Ok(())
    }

    pub fn append_entry(
        &self,
        name: &str,
        entry: &NewEntry,
        create_if_missing: bool,
        header_fuzzy: Option<u8>,
    ) -> Result<PathBuf> {
        let path = self.path_of(name)?;
        let term = entry.term.trim();
        let target = entry.target.trim();
        if term.is_empty() || target.is_empty() {
            return Err(DictError::InvalidEntry("term and target are required".to_string()));
        }
        if term.contains(['\r', '\n']) || target.contains(['\r', '\n']) {
            return Err(DictError::InvalidEntry("term and target must be single-line".to_string()));
        }
        if let Some(f) = entry.fuzzy.filter(|f| *f > 100) {
            return Err(DictError::InvalidEntry(format!("fuzzy {f} is out of 0..=100")));
        }

        let mut block = String::new();
        if !path.exists() {
            if !create_if_missing {
                return Err(DictError::NotFound {
                    name: name.to_string(),
                });
            }
            std::fs::create_dir_all(&self.dir).map_err(|e| DictError::io(&self.dir, e))?;
            let header = header_fuzzy.filter(|f| *f <= 100).unwrap_or(DEFAULT_HEADER_FUZZY);
            block.push_str(&format!("main_fuzzy[{header}]\n\n"));
        } else if !ends_with_newline(&path)? {
            // The last tag must stay on its own line.
            block.push('\n');
        }
        block.push_str(&format!("word[{term}]\nkor[{target}]\n"));
        if let Some(f) = entry.fuzzy {
            block.push_str(&format!("fuzzy[{f}]\n"));
        }
        block.push('\n');

        let mut f = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| DictError::io(&path, e))?;
        f.write_all(block.as_bytes())
            .map_err(|e| DictError::io(&path, e))?;
        info!(name, term, "dictionary entry appended");
        Ok(path)
    }
}

fn ends_with_newline(path: &Path) -> Result<bool> {
    let mut f = std::fs::File::open(path).map_err(|e| DictError::io(path, e))?;
    let len = f.metadata().map_err(|e| DictError::io(path, e))?.len();
    if len == 0 {
        return Ok(true);
    }
    f.seek(SeekFrom::End(-1)).map_err(|e| DictError::io(path, e))?;
    let mut last = [0u8; 1];
    f.read_exact(&mut last).map_err(|e| DictError::io(path, e))?;
    Ok(last[0] == b'\n')
}

fn validate_name(name: &str) -> Result<()> {
    let bare = Path::new(name).file_name().and_then(|s| s.to_str()) == Some(name);
    let ext_ok = Path::new(name).extension().and_then(|s| s.to_str()) == Some(DICT_EXTENSION);
    if name.is_empty() || !bare || !ext_ok || name.contains(['/', '\\']) {
        return Err(DictError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}
