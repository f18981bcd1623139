// FILE: src/core/front_matter.rs
//! Optional YAML metadata block at the head of a node.
//!
//! ```text
//! ---
//! title: Override
//! draft: true
//! ---
//!
//! # Body Title
//! ```
//!
//! Nodes without the block pass through untouched, so plain KEGML nodes and
//! annotated ones share the same title path.

use serde::Deserialize;

use crate::error::{KegError, Result};

const DELIMITER: &str = "---";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FrontMatter {
    pub title: Option<String>,
    pub description: Option<String>,
    pub published: Option<String>,
    pub image: Option<String>,
    pub draft: Option<bool>,
}

impl FrontMatter {
    /// The title, if present and not blank.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref().map(str::trim).filter(|t| !t.is_empty())
    }

    /// Decodes a parsed block. A block whose keys do not all fit their
    /// types (`draft: yes`, a nested `description`) still yields its string
    /// `title`.
    fn from_value(value: serde_yaml::Value) -> Self {
        match serde_yaml::from_value(value.clone()) {
            Ok(matter) => matter,
            Err(e) => {
                tracing::warn!("[FrontMatter] Keeping title only: {}", e);
                FrontMatter {
                    title: value.get("title").and_then(|t| t.as_str()).map(String::from),
                    ..FrontMatter::default()
                }
            }
        }
    }
}

/// Splits `content` into its body and front matter.
///
/// Content whose first line is not exactly `---` is returned whole with an
/// empty `FrontMatter`. An opened block must be closed by a `---` line that
/// is followed by a blank line or by end of input; anything else is
/// `InvalidContent`, as is YAML that does not parse.
pub fn parse_front_matter(content: &str) -> Result<(&str, FrontMatter)> {
    let mut lines = Lines::new(content);

    match lines.next() {
        Some((_, line)) if line == DELIMITER => {}
        _ => return Ok((content, FrontMatter::default())),
    }
    let block_start = lines.offset();

    while let Some((line_start, line)) = lines.next() {
        if line != DELIMITER {
            continue;
        }
        let after = lines.offset();
        let closes = match Lines::new(&content[after..]).next() {
            None => true,
            Some((_, next)) => next.trim().is_empty(),
        };
        if !closes {
            continue;
        }

        let yaml = &content[block_start..line_start];
        let matter = if yaml.trim().is_empty() {
            FrontMatter::default()
        } else {
            let value: serde_yaml::Value = serde_yaml::from_str(yaml)
                .map_err(|e| KegError::InvalidContent(format!("front matter: {}", e)))?;
            FrontMatter::from_value(value)
        };
        return Ok((&content[after..], matter));
    }

    Err(KegError::InvalidContent(
        "front matter opened but not closed by '---' and a blank line".into(),
    ))
}

/// Line iterator that reports each line's starting byte offset and strips the
/// terminator (`\n` or `\r\n`).
struct Lines<'a> {
    buf: &'a str,
    pos: usize,
}

impl<'a> Lines<'a> {
    fn new(buf: &'a str) -> Self {
        Self { buf, pos: 0 }
    }

    fn offset(&self) -> usize {
        self.pos
    }
}

impl<'a> Iterator for Lines<'a> {
    type Item = (usize, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.buf.len() {
            return None;
        }
        let start = self.pos;
        let rest = &self.buf[start..];
        let (line, consumed) = match rest.find('\n') {
            Some(i) => (&rest[..i], i + 1),
            None => (rest, rest.len()),
        };
        self.pos += consumed;
        Some((start, line.strip_suffix('\r').unwrap_or(line)))
    }
}
