mod trace;
mod transform;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::dictionary::DictionaryRegistry;
use crate::error::Result;
use crate::matcher::find_matches;
use crate::shield::{restore_text, shield_text, Shielded};

pub use trace::TraceWriter;
pub use transform::{CommandTransform, TextTransform};

/// Request-scoped shield → transform → restore around the active dictionary.
pub struct ShieldPipeline {
    registry: Arc<DictionaryRegistry>,
    default_fuzzy: u8,
    trace: TraceWriter,
    next_req: AtomicUsize,
}

impl ShieldPipeline {
    pub fn new(settings: &Settings, registry: Arc<DictionaryRegistry>) -> anyhow::Result<Self> {
        let trace = TraceWriter::new(settings.trace_dir.clone(), settings.trace)?;
        Ok(Self {
            registry,
            default_fuzzy: settings.default_fuzzy,
            trace,
            next_req: AtomicUsize::new(1),
        })
    }

    pub fn with_registry(registry: Arc<DictionaryRegistry>, default_fuzzy: u8) -> Self {
        Self {
            registry,
            default_fuzzy,
            trace: TraceWriter::disabled(),
            next_req: AtomicUsize::new(1),
        }
    }

    pub fn registry(&self) -> &DictionaryRegistry {
        &self.registry
    }

    /// Shields `text` with the active dictionary.
    ///
    /// Never fails: without a selection, or when the dictionary cannot be read, the
    /// text comes back unchanged with an empty mapping.
    pub fn prepare(&self, text: &str) -> Shielded {
        let Some(name) = self.registry.active() else {
            debug!("no dictionary selected; passing text through");
            return Shielded::passthrough(text);
        };
        match self.shield_with(text, &name) {
            Ok(shielded) => shielded,
            Err(err) => {
                error!(dictionary = %name, "dictionary shielding failed: {err}");
                Shielded::passthrough(text)
            }
        }
    }

    /// Shields `text` with a named dictionary, surfacing dictionary errors.
    pub fn shield_with(&self, text: &str, name: &str) -> Result<Shielded> {
        let parsed = self.registry.entries(name)?;
        if parsed.is_empty() {
            return Ok(Shielded::passthrough(text));
        }
        let default = parsed.default_threshold.unwrap_or(self.default_fuzzy);
        let matches = find_matches(text, &parsed.entries, default);
        let shielded = shield_text(text, &parsed.entries, &matches);
        info!(
            dictionary = name,
            matched = matches.len(),
            shielded = shielded.mapping.len(),
            "text shielded"
        );
        Ok(shielded)
    }

    pub fn finish(&self, transformed: &str, shielded: &Shielded) -> String {
        restore_text(transformed, &shielded.mapping)
    }

    /// prepare → `transform` → finish. Only errors from `transform` propagate.
    pub fn translate(&self, text: &str, transform: &mut dyn TextTransform) -> anyhow::Result<String> {
        let req_id = self.next_req.fetch_add(1, Ordering::Relaxed);
        self.trace_stage(req_id, "source", text);

        let shielded = self.prepare(text);
        self.trace_stage(req_id, "shielded", &shielded.text);

        let transformed = transform.transform(&shielded.text)?;
        self.trace_stage(req_id, "transformed", &transformed);

        let restored = self.finish(&transformed, &shielded);
        self.trace_stage(req_id, "restored", &restored);
        debug!(req_id, chars = restored.chars().count(), "request restored");
        Ok(restored)
    }

    fn trace_stage(&self, req_id: usize, stage: &str, text: &str) {
        if let Err(err) = self.trace.write_request_text(req_id, stage, text) {
            warn!("{err:#}");
        }
    }
}
