// FILE: src/engine/searcher.rs
use regex::Regex;
use serde::Serialize;

use crate::engine::dex::Dex;
use crate::error::{KegError, Result};
use crate::storage::{NodeId, NodeStore};

/// One matching line of node content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrepHit {
    pub id: NodeId,
    pub line: usize,
    pub text: String,
}

pub struct Searcher;

impl Searcher {
    /// Compiles a user pattern with the configured prefix (normally `(?i)`).
    pub fn compile(prefix: &str, pattern: &str) -> Result<Regex> {
        Ok(Regex::new(&format!("{}{}", prefix, pattern))?)
    }

    /// Entries whose title matches, in dex order.
    pub fn titles(dex: &Dex, re: &Regex) -> Dex {
        let hits = dex.with_title_text_exp(re);
        tracing::debug!("[Searcher] Title search '{}' ({} results)", re, hits.len());
        hits
    }

    /// Every content line matching `re`, ascending by node then line.
    /// Unreadable nodes are skipped.
    pub fn grep(store: &NodeStore, re: &Regex) -> Result<Vec<GrepHit>> {
        let mut hits = Vec::new();
        for id in store.list_ids()? {
            let bytes = match store.read_content(id) {
                Ok(b) => b,
                Err(KegError::Io(e)) => {
                    tracing::debug!("[Searcher] Skipping node {}: {}", id, e);
                    continue;
                }
                Err(e) => return Err(e),
            };
            let content = String::from_utf8_lossy(&bytes);
            for (i, line) in content.lines().enumerate() {
                if re.is_match(line) {
                    hits.push(GrepHit { id, line: i + 1, text: line.to_string() });
                }
            }
        }
        tracing::info!("[Searcher] Grep '{}' ({} hits)", re, hits.len());
        Ok(hits)
    }
}
