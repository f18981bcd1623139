// FILE: src/engine/indexer.rs
use crate::core::title_of;
use crate::engine::dex::{Dex, DexEntry};
use crate::error::{KegError, Result};
use crate::storage::{NodeId, NodeStore};

pub struct Indexer;

impl Indexer {
    /// Summarizes a single node:
    /// 1. Skip nodes without content (empty or missing file)
    /// 2. Read content (copy, then process)
    /// 3. Resolve the title (front matter, then heading)
    /// 4. Record the content file's mod time
    ///
    /// Returns `None` for nodes that are not indexable.
    pub fn index_node(store: &NodeStore, id: NodeId) -> Result<Option<DexEntry>> {
        if !store.has_content(id)? {
            tracing::debug!("[Indexer] Node {} has no content, excluding", id);
            return Ok(None);
        }

        let bytes = store.read_content(id)?;
        let content = String::from_utf8_lossy(&bytes);
        let title = title_of(&content);
        if title.is_empty() {
            tracing::debug!("[Indexer] Node {} has no title", id);
        }

        let updated = store.mod_time(id)?;
        Ok(Some(DexEntry::new(id, title, updated)))
    }

    /// Builds the dex from every node in the store, ascending by ID.
    ///
    /// Nodes whose content cannot be read are excluded and logged rather than
    /// failing the whole build; a missing root still fails.
    pub fn build(store: &NodeStore) -> Result<Dex> {
        let ids = store.list_ids()?;
        tracing::info!("[Indexer] Scanning {} node directories in {}", ids.len(), store.root().display());

        let mut dex = Dex::new();
        for id in ids {
            match Self::index_node(store, id) {
                Ok(Some(entry)) => dex.push(entry),
                Ok(None) => {}
                Err(KegError::Io(e)) => {
                    tracing::warn!("[Indexer] Skipping unreadable node {}: {}", id, e);
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!("[Indexer] Indexed {} nodes", dex.len());
        Ok(dex)
    }
}
