// FILE: src/core/mod.rs
pub mod bouncer;
pub mod front_matter;
pub mod scanner;

pub use front_matter::{parse_front_matter, FrontMatter};
pub use scanner::{scan_title, Scanner, MAX_TITLE_CHARS};

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::storage::CONTENT_FILE;

/// Resolves the display title of a node from its raw content.
///
/// A non-blank front matter `title` wins without scanning the body.
/// Otherwise the first heading of the body is used. A node with no usable
/// heading, or with a malformed front matter block, gets an empty title.
/// A front matter title spread over several lines is joined with spaces.
pub fn title_of(content: &str) -> String {
    match parse_front_matter(content) {
        Ok((body, matter)) => match matter.title() {
            Some(title) => single_line(title),
            None => scan_title(body).unwrap_or_default(),
        },
        Err(e) => {
            tracing::warn!("[Title] Ignoring title of malformed node: {}", e);
            String::new()
        }
    }
}

fn single_line(title: &str) -> String {
    title
        .split(['\r', '\n', '\t'])
        .filter(|part| !part.trim().is_empty())
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reads a node's title from disk. `path` may name the node directory or its
/// content file.
pub fn read_title(path: &Path) -> Result<String> {
    let path: PathBuf = if path.ends_with(CONTENT_FILE) {
        path.to_path_buf()
    } else {
        path.join(CONTENT_FILE)
    };
    let bytes = std::fs::read(&path)?;
    Ok(title_of(&String::from_utf8_lossy(&bytes)))
}
