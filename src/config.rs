use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use serde::Deserialize;

pub const CONFIG_FILENAME: &str = "termshield.toml";
pub const CONFIG_ENV: &str = "TERMSHIELD_CONFIG";
pub const DEFAULT_DICT_DIR: &str = "tkdics";
pub const DEFAULT_FUZZY: u8 = 85;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub dictionary: DictionarySection,
    #[serde(default)]
    pub log: LogSection,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct DictionarySection {
    /// Directory holding `*.tkdic` files. Relative paths resolve against the config
    /// file directory.
    #[serde(default)]
    pub dir: Option<PathBuf>,

    /// Dictionary selected at startup.
    #[serde(default)]
    pub active: Option<String>,

    /// Threshold used when neither the entry nor the file's `main_fuzzy` sets one.
    #[serde(default)]
    pub default_fuzzy: Option<u8>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct LogSection {
    /// `tracing` filter directive; `RUST_LOG` wins when set.
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub trace_dir: Option<PathBuf>,
    #[serde(default)]
    pub trace: Option<bool>,
}

/// Resolved, immutable settings handed to the pipeline.
#[derive(Clone, Debug)]
pub struct Settings {
    pub config_path: Option<PathBuf>,
    pub dict_dir: PathBuf,
    pub active_dictionary: Option<String>,
    pub default_fuzzy: u8,
    pub log_level: String,
    pub trace_dir: PathBuf,
    pub trace: bool,
}

impl Settings {
    /// `explicit` → `TERMSHIELD_CONFIG` → `termshield.toml` searched upwards. A config
    /// that cannot be found yields defaults relative to the current directory.
    pub fn load(explicit: Option<PathBuf>) -> anyhow::Result<Self> {
        let cfg_file = explicit
            .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from))
            .or_else(locate_config);

        let mut file_cfg = AppConfig::default();
        let mut config_path = None;
        if let Some(p) = cfg_file {
            if p.exists() {
                file_cfg = AppConfig::from_file(&p)?;
                config_path = Some(p);
            } else {
                return Err(anyhow!("config not found: {}", p.display()));
            }
        }
        Self::from_config(file_cfg, config_path)
    }

    pub fn from_config(cfg: AppConfig, config_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let base_dir = config_path
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let resolve = |p: PathBuf| if p.is_relative() { base_dir.join(p) } else { p };

        let default_fuzzy = cfg.dictionary.default_fuzzy.unwrap_or(DEFAULT_FUZZY);
        if default_fuzzy > 100 {
            return Err(anyhow!(
                "dictionary.default_fuzzy must be in 0..=100, got {default_fuzzy}"
            ));
        }

        Ok(Self {
            dict_dir: resolve(
                cfg.dictionary
                    .dir
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_DICT_DIR)),
            ),
            active_dictionary: cfg
                .dictionary
                .active
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            default_fuzzy,
            log_level: cfg
                .log
                .level
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "info".to_string()),
            trace_dir: resolve(cfg.log.trace_dir.unwrap_or_else(|| PathBuf::from("trace"))),
            trace: cfg.log.trace.unwrap_or(false),
            config_path,
        })
    }
}

/// Nearest `name` in `dir` or one of its first `depth` ancestors.
fn search_ancestors(dir: &Path, name: &str, depth: usize) -> Option<PathBuf> {
    dir.ancestors()
        .take(depth + 1)
        .map(|d| d.join(name))
        .find(|p| p.is_file())
}

/// `termshield.toml` above the working directory, then above the executable.
fn locate_config() -> Option<PathBuf> {
    let from_cwd = std::env::current_dir()
        .ok()
        .and_then(|cwd| search_ancestors(&cwd, CONFIG_FILENAME, 8));
    from_cwd.or_else(|| {
        let exe = std::env::current_exe().ok()?;
        search_ancestors(exe.parent()?, CONFIG_FILENAME, 10)
    })
}

impl AppConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config: {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parse config: {}", path.display()))
    }
}

const DEFAULT_CONFIG_TOML: &str = r#"[dictionary]
# Directory with *.tkdic files (relative to this file).
dir = "tkdics"
# Dictionary selected at startup; leave unset to translate without shielding.
active = "sample.tkdic"
# Used when neither fuzzy[..] nor main_fuzzy[..] is set.
default_fuzzy = 85

[log]
# tracing filter, e.g. "info" or "termshield=debug". RUST_LOG overrides it.
level = "info"
# Write per-request source/shielded/transformed/restored text files.
trace = false
trace_dir = "trace"
"#;

const SAMPLE_DICTIONARY: &str = "main_fuzzy[85]

# word[...] starts an entry; kor[...] is the replacement; fuzzy[...] overrides main_fuzzy.
word[Apple Pencil]
kor[애플 펜슬]
fuzzy[90]

word[kill two birds
with one stone]
kor[일석이조]
";

/// Writes `termshield.toml` and a sample dictionary into `dir`.
pub fn init_default_config(dir: &Path, force: bool) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create config dir: {}", dir.display()))?;

    let dict_dir = dir.join(DEFAULT_DICT_DIR);
    std::fs::create_dir_all(&dict_dir)
        .with_context(|| format!("create dictionary dir: {}", dict_dir.display()))?;
    let sample = dict_dir.join("sample.tkdic");
    if !sample.exists() || force {
        std::fs::write(&sample, SAMPLE_DICTIONARY)
            .with_context(|| format!("write sample dictionary: {}", sample.display()))?;
    }

    let cfg_path = dir.join(CONFIG_FILENAME);
    if cfg_path.exists() && !force {
        return Ok(cfg_path);
    }
    std::fs::write(&cfg_path, DEFAULT_CONFIG_TOML)
        .with_context(|| format!("write config: {}", cfg_path.display()))?;
    Ok(cfg_path)
}
