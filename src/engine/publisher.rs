// FILE: src/engine/publisher.rs
//! Publisher: re-synchronizes the dex after a mutation, then hands off to
//! the outward publish step.

use std::path::Path;
use std::process::Command;

use crate::engine::dex::Dex;
use crate::engine::indexer::Indexer;
use crate::error::{KegError, Result};
use crate::storage::{NodeId, NodeStore, Repository};

/// Outward publish step (site regeneration and the like).
pub trait PublishHook {
    fn publish(&self, root: &Path) -> Result<()>;
}

/// Publishes nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHook;

impl PublishHook for NoopHook {
    fn publish(&self, _root: &Path) -> Result<()> {
        Ok(())
    }
}

/// Runs a fixed argument vector with the keg root as working directory.
#[derive(Debug, Clone)]
pub struct CommandHook {
    argv: Vec<String>,
}

impl CommandHook {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

impl PublishHook for CommandHook {
    fn publish(&self, root: &Path) -> Result<()> {
        let Some((program, args)) = self.argv.split_first() else {
            return Ok(());
        };
        tracing::info!("[Publisher] Running {:?} in {}", self.argv, root.display());
        let status = Command::new(program).args(args).current_dir(root).status()?;
        if !status.success() {
            return Err(KegError::Collaborator(format!("publish command exited with {}", status)));
        }
        Ok(())
    }
}

pub struct Publisher<'a> {
    store: &'a NodeStore,
    repo: Repository,
    hook: Box<dyn PublishHook + 'a>,
}

impl<'a> Publisher<'a> {
    pub fn new(store: &'a NodeStore, hook: Box<dyn PublishHook + 'a>) -> Self {
        Self { store, repo: Repository::new(store.root()), hook }
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// Makes sure both artifacts exist and parse, rebuilding them if not, then
    /// runs the publish hook. Safe to call any number of times.
    pub fn publish(&self) -> Result<()> {
        self.ensure_current()?;
        self.hook.publish(self.store.root())
    }

    /// Full rebuild followed by the publish hook.
    pub fn rebuild(&self) -> Result<Dex> {
        let dex = self.repo.full_rebuild(self.store)?;
        self.hook.publish(self.store.root())?;
        Ok(dex)
    }

    /// Reflects a changed node in the dex and publishes.
    pub fn node_changed(&self, id: NodeId) -> Result<()> {
        self.sync_node(id)?;
        self.publish()
    }

    /// Returns whether the node is still part of the keg. A node left
    /// without content is removed along with its entry. Missing or
    /// unparsable artifacts are repaired by a full rebuild.
    fn sync_node(&self, id: NodeId) -> Result<bool> {
        if self.store.exists(id) && !self.store.has_content(id)? {
            self.store.remove(id)?;
        }
        match Indexer::index_node(self.store, id)? {
            Some(entry) => {
                self.repair(self.repo.incremental_update(&entry))?;
                Ok(true)
            }
            None => {
                self.repair(self.repo.incremental_remove(id))?;
                Ok(false)
            }
        }
    }

    /// Reflects an already deleted node in the dex and publishes.
    pub fn node_removed(&self, id: NodeId) -> Result<()> {
        self.repair(self.repo.incremental_remove(id))?;
        self.publish()
    }

    /// The dex as stored in the table artifact, rebuilt first if it is
    /// missing or unreadable.
    pub fn dex(&self) -> Result<Dex> {
        match self.repo.read_table() {
            Err(e) if e.is_inconsistent() => {
                tracing::warn!("[Publisher] {}; rebuilding", e);
                self.repo.full_rebuild(self.store)
            }
            other => other,
        }
    }

    fn ensure_current(&self) -> Result<()> {
        let table = self.repo.read_table();
        let changes = self.repo.read_changes();
        match (table, changes) {
            (Ok(t), Ok(c)) if t.len() == c.len() => Ok(()),
            (Ok(_), Ok(_)) => {
                tracing::warn!("[Publisher] Table and changes disagree; rebuilding");
                self.repo.full_rebuild(self.store).map(|_| ())
            }
            (Err(e), _) | (_, Err(e)) if e.is_inconsistent() => {
                tracing::warn!("[Publisher] {}; rebuilding", e);
                self.repo.full_rebuild(self.store).map(|_| ())
            }
            (Err(e), _) | (_, Err(e)) => Err(e),
        }
    }

    fn repair(&self, outcome: Result<()>) -> Result<()> {
        match outcome {
            Err(e) if e.is_inconsistent() => {
                tracing::warn!("[Publisher] {}; rebuilding", e);
                self.repo.full_rebuild(self.store).map(|_| ())
            }
            other => other,
        }
    }
}
