use std::path::{Path, PathBuf};

use anyhow::Context;

/// Per-request text dumps, one file per pipeline stage. `None` disables tracing.
pub struct TraceWriter {
    dir: Option<PathBuf>,
}

impl TraceWriter {
    pub fn new(dir: PathBuf, enabled: bool) -> anyhow::Result<Self> {
        if !enabled {
            return Ok(Self::disabled());
        }
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create trace dir: {}", dir.display()))?;
        Ok(Self { dir: Some(dir) })
    }

    pub fn disabled() -> Self {
        Self { dir: None }
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    pub fn write_request_text(&self, req_id: usize, stage: &str, text: &str) -> anyhow::Result<()> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        let path = dir.join(trace_file_name(req_id, stage));
        std::fs::write(&path, text).with_context(|| format!("write trace: {}", path.display()))
    }
}

/// `req_000042.<stage>.txt`, with path separators and reserved characters in the
/// stage replaced by `_`.
fn trace_file_name(req_id: usize, stage: &str) -> String {
    let stage: String = stage
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect();
    format!("req_{req_id:06}.{stage}.txt")
}
