use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use termshield::config::{init_default_config, Settings};
use termshield::dictionary::{DictionaryRegistry, NewEntry};
use termshield::logging::init_logging;
use termshield::pipeline::{CommandTransform, ShieldPipeline};
use termshield::shield::{restore_text, ShieldMapping};

#[derive(Parser, Debug)]
#[command(name = "termshield")]
#[command(about = "Protect dictionary terms from an external translator with sentinel tokens", long_about = None)]
struct Args {
    /// Config file path (default: search for termshield.toml upwards, or TERMSHIELD_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Dictionary directory (overrides dictionary.dir)
    #[arg(long, global = true, value_name = "DIR")]
    dict_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Write termshield.toml and a sample dictionary, then exit
    InitConfig {
        /// Target directory (default: current directory)
        #[arg(value_name = "DIR")]
        dir: Option<PathBuf>,
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },
    /// List dictionaries in the dictionary directory
    List,
    /// Check that a dictionary exists and can be selected
    Select { name: String },
    /// Print the parsed entries of a dictionary as JSON
    Entries { name: String },
    /// Append an entry, creating the dictionary if needed
    AddEntry {
        name: String,
        #[arg(long)]
        term: String,
        #[arg(long)]
        target: String,
        #[arg(long)]
        fuzzy: Option<u8>,
        /// main_fuzzy written when the dictionary is created
        #[arg(long)]
        main_fuzzy: Option<u8>,
        /// Fail instead of creating a missing dictionary
        #[arg(long)]
        no_create: bool,
    },
    /// Copy a local file into the dictionary directory
    Upload {
        file: PathBuf,
        /// Stored name (default: the file name)
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        overwrite: bool,
    },
    /// Delete a dictionary
    Delete { name: String },
    /// Shield text and print JSON {text, mapping, terms}
    Shield {
        /// Dictionary to use (default: dictionary.active)
        #[arg(long)]
        dict: Option<String>,
        /// Text, or "-" for stdin
        text: String,
    },
    /// Restore sentinels using a mapping JSON file
    Restore {
        #[arg(long, value_name = "JSON")]
        mapping: PathBuf,
        /// Text, or "-" for stdin
        text: String,
    },
    /// Shield, run an external translator (stdin → stdout), restore
    Translate {
        #[arg(long)]
        dict: Option<String>,
        /// Translator program
        #[arg(long, value_name = "PROGRAM")]
        command: PathBuf,
        /// Arguments passed to the translator
        #[arg(long = "arg", value_name = "ARG")]
        args: Vec<String>,
        /// Text, or "-" for stdin
        text: String,
    },
}

fn read_text(arg: &str) -> anyhow::Result<String> {
    if arg != "-" {
        return Ok(arg.to_string());
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("read stdin")?;
    Ok(buf)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if let Cmd::InitConfig { dir, force } = &args.command {
        init_logging("info");
        let dir = dir
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        let cfg_path = init_default_config(&dir, *force).context("init default config")?;
        eprintln!("Wrote config: {}", cfg_path.display());
        return Ok(());
    }

    let mut settings = Settings::load(args.config).context("load config")?;
    if let Some(dir) = args.dict_dir {
        settings.dict_dir = dir;
    }
    init_logging(&settings.log_level);

    let registry = Arc::new(DictionaryRegistry::with_selection(
        &settings.dict_dir,
        settings.active_dictionary.as_deref(),
    ));

    match args.command {
        Cmd::InitConfig { .. } => unreachable!("handled above"),
        Cmd::List => {
            for name in registry.list()? {
                println!("{name}");
            }
        }
        Cmd::Select { name } => {
            registry.select(&name)?;
            println!("{name}");
        }
        Cmd::Entries { name } => {
            let parsed = registry.entries(&name)?;
            let out = serde_json::json!({
                "filename": name,
                "main_fuzzy": parsed.default_threshold,
                "entries": parsed.entries,
                "diagnostics": parsed.diagnostics.iter().map(|d| d.to_string()).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Cmd::AddEntry {
            name,
            term,
            target,
            fuzzy,
            main_fuzzy,
            no_create,
        } => {
            let entry = NewEntry {
                term,
                target,
                fuzzy,
            };
            let path = registry.append_entry(&name, &entry, !no_create, main_fuzzy)?;
            eprintln!("Updated: {}", path.display());
        }
        Cmd::Upload {
            file,
            name,
            overwrite,
        } => {
            let name = match name {
                Some(n) => n,
                None => file
                    .file_name()
                    .and_then(|s| s.to_str())
                    .map(|s| s.to_string())
                    .context("upload file has no usable name")?,
            };
            let bytes =
                std::fs::read(&file).with_context(|| format!("read {}", file.display()))?;
            let path = registry.upload(&name, &bytes, overwrite)?;
            eprintln!("Stored: {}", path.display());
        }
        Cmd::Delete { name } => {
            registry.delete(&name)?;
            eprintln!("Deleted: {name}");
        }
        Cmd::Shield { dict, text } => {
            if let Some(d) = dict.as_deref() {
                registry.select(d)?;
            }
            let text = read_text(&text)?;
            let pipeline = ShieldPipeline::new(&settings, registry.clone())?;
            let shielded = pipeline.prepare(&text);
            println!("{}", serde_json::to_string_pretty(&shielded)?);
        }
        Cmd::Restore { mapping, text } => {
            let raw = std::fs::read_to_string(&mapping)
                .with_context(|| format!("read mapping: {}", mapping.display()))?;
            let value: serde_json::Value = serde_json::from_str(&raw).context("parse mapping json")?;
            // Accept either the bare mapping or the full `shield` output.
            let map_value = value.get("mapping").cloned().unwrap_or(value);
            let map: ShieldMapping =
                serde_json::from_value(map_value).context("mapping must be an object of strings")?;
            let text = read_text(&text)?;
            println!("{}", restore_text(&text, &map));
        }
        Cmd::Translate {
            dict,
            command,
            args,
            text,
        } => {
            if let Some(d) = dict.as_deref() {
                registry.select(d)?;
            }
            let text = read_text(&text)?;
            let pipeline = ShieldPipeline::new(&settings, registry.clone())?;
            let mut transform = CommandTransform::new(command, args);
            let out = pipeline.translate(&text, &mut transform)?;
            println!("{out}");
        }
    }
    Ok(())
}
