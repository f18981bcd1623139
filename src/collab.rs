// FILE: src/collab.rs
//! Collaborator contracts: the editor, the chooser and the renderer.
//!
//! The engine never does UI itself. It hands paths to an `Editor`, labeled
//! candidates to a `Chooser`, and raw content to a `Renderer`.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::Command;

use crate::config::Config;
use crate::error::{KegError, Result};

/// Blocks until the user finishes editing `path`.
pub trait Editor {
    fn edit(&self, path: &Path) -> Result<()>;
}

/// Picks one of `labels` by index, or `None` when the user aborts.
pub trait Chooser {
    fn choose(&mut self, labels: &[String]) -> Result<Option<usize>>;
}

/// Turns raw node content into its display form.
pub trait Renderer {
    fn render(&self, content: &str) -> Result<String>;
}

/// Runs an external editor command with the path appended.
#[derive(Debug, Clone)]
pub struct CommandEditor {
    argv: Vec<String>,
}

impl CommandEditor {
    pub fn new(command: &str) -> Self {
        Self { argv: command.split_whitespace().map(String::from).collect() }
    }

    /// `editor` from config, then `$VISUAL`, then `$EDITOR`, then `vi`.
    pub fn from_config(config: &Config) -> Self {
        let command = config
            .editor
            .clone()
            .or_else(|| std::env::var("VISUAL").ok())
            .or_else(|| std::env::var("EDITOR").ok())
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| "vi".to_string());
        Self::new(&command)
    }
}

impl Editor for CommandEditor {
    fn edit(&self, path: &Path) -> Result<()> {
        let (program, args) = self
            .argv
            .split_first()
            .ok_or_else(|| KegError::Collaborator("no editor configured".into()))?;

        tracing::debug!("[Editor] {} {}", program, path.display());
        let status = Command::new(program).args(args).arg(path).status()?;
        if !status.success() {
            return Err(KegError::Collaborator(format!("editor exited with {}", status)));
        }
        Ok(())
    }
}

/// Numbered menu on a writer, answer read from a line reader.
pub struct PromptChooser<R, W> {
    input: R,
    output: W,
}

impl PromptChooser<io::StdinLock<'static>, io::Stderr> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> PromptChooser<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Chooser for PromptChooser<R, W> {
    fn choose(&mut self, labels: &[String]) -> Result<Option<usize>> {
        match labels.len() {
            0 => return Ok(None),
            1 => return Ok(Some(0)),
            _ => {}
        }

        for (i, label) in labels.iter().enumerate() {
            writeln!(self.output, "{:>4}) {}", i + 1, label)?;
        }

        loop {
            write!(self.output, "#? ")?;
            self.output.flush()?;

            let mut answer = String::new();
            if self.input.read_line(&mut answer)? == 0 {
                return Ok(None);
            }
            let answer = answer.trim();
            if answer.is_empty() || answer.eq_ignore_ascii_case("q") {
                return Ok(None);
            }
            match answer.parse::<usize>() {
                Ok(n) if (1..=labels.len()).contains(&n) => return Ok(Some(n - 1)),
                _ => writeln!(self.output, "pick 1-{} or q", labels.len())?,
            }
        }
    }
}

/// Shows content as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainRenderer;

impl Renderer for PlainRenderer {
    fn render(&self, content: &str) -> Result<String> {
        Ok(content.to_string())
    }
}
