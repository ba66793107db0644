use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use anyhow::{anyhow, Context};

/// The opaque translation step. Output is untrusted: sentinels may come back
/// missing, reordered or duplicated.
pub trait TextTransform {
    fn transform(&mut self, text: &str) -> anyhow::Result<String>;
}

impl<F> TextTransform for F
where
    F: FnMut(&str) -> anyhow::Result<String>,
{
    fn transform(&mut self, text: &str) -> anyhow::Result<String> {
        self(text)
    }
}

/// Runs an external program per request: text on stdin, translation on stdout.
#[derive(Clone, Debug)]
pub struct CommandTransform {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl CommandTransform {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl TextTransform for CommandTransform {
    fn transform(&mut self, text: &str) -> anyhow::Result<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("spawn transform: {}", self.program.display()))?;

        {
            let mut stdin = child.stdin.take().context("transform stdin")?;
            stdin
                .write_all(text.as_bytes())
                .context("write transform stdin")?;
        }

        let out = child.wait_with_output().context("wait for transform")?;
        if !out.status.success() {
            return Err(anyhow!(
                "transform {} exited with {}",
                self.program.display(),
                out.status
            ));
        }
        let text = String::from_utf8(out.stdout).context("transform output is not UTF-8")?;
        Ok(text.trim_end_matches(&['\r', '\n'][..]).to_string())
    }
}
