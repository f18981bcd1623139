// FILE: src/keg.rs
//! A keg on disk and the operations that mutate it.
//!
//! Every mutation touches the node tree directly, then brings the dex up to
//! date through the `Publisher`: incrementally for single-node changes, by
//! full rebuild after bulk changes (init, import).

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rand::Rng;

use crate::collab::{Chooser, Editor, Renderer};
use crate::config::Config;
use crate::engine::dex::{Dex, DexEntry};
use crate::engine::publisher::{CommandHook, NoopHook, PublishHook, Publisher};
use crate::engine::searcher::{GrepHit, Searcher};
use crate::error::{KegError, Result};
use crate::storage::{NodeId, NodeStore, CONTENT_FILE, KEG_FILE};

pub const DEFAULT_KEG_INFO: &str = "\
title: I am a KEG
url: https://github.com/YOU/YOUR_KEG_REPO
creator: https://github.com/YOU
state: living
summary: |
  This is a summary of my KEG.
indexes:
  - file: dex/changes.md
    summary: latest changes
  - file: dex/nodes.tsv
    summary: all nodes by id
";

pub const DEFAULT_ZERO_NODE: &str = "\
# Sorry, planned but not yet available

This is a filler until a node is created for this link.
";

pub const SAMPLE_NODE: &str = "\
# Sample Title (max 70 chars)

A short summary of what this node covers.

* one point
* another point

Link to another node like [this](../0).
";

/// How a command names the node it works on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Most recently changed node.
    Same,
    /// Most recently created node.
    Last,
    Id(NodeId),
    /// Title pattern, resolved through the chooser.
    Pattern(String),
}

impl FromStr for Target {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "same" => Target::Same,
            "last" => Target::Last,
            _ => match s.parse() {
                Ok(id) => Target::Id(id),
                Err(_) => Target::Pattern(s.to_string()),
            },
        })
    }
}

/// Result of editing an existing node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Unchanged,
    Updated,
    /// The node was emptied and is gone.
    Removed,
}

pub struct Keg {
    name: String,
    store: NodeStore,
    config: Config,
}

impl Keg {
    pub fn open(name: impl Into<String>, path: impl Into<PathBuf>, config: Config) -> Result<Self> {
        Ok(Self { name: name.into(), store: NodeStore::open(path)?, config })
    }

    /// The keg selected by `KEG_CURRENT`, the working directory, or the
    /// config, in that order.
    pub fn current(config: &Config) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let env = std::env::var("KEG_CURRENT").ok();
        let (name, path) = locate(config, env.as_deref(), &cwd)?;
        tracing::debug!("[Keg] Current keg {} at {}", name, path.display());
        Self::open(name, path, config.clone())
    }

    /// Makes `dir` a keg: writes the descriptor and node 0 if missing, then
    /// builds the dex from scratch and publishes.
    pub fn init(dir: &Path, config: &Config) -> Result<Self> {
        let info = dir.join(KEG_FILE);
        if !info.exists() {
            fs::write(&info, DEFAULT_KEG_INFO)?;
        }
        let zero = dir.join("0").join(CONTENT_FILE);
        if !zero.exists() {
            fs::create_dir_all(dir.join("0"))?;
            fs::write(&zero, DEFAULT_ZERO_NODE)?;
        }

        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "keg".to_string());
        let keg = Self::open(name, dir, config.clone())?;
        keg.publisher().rebuild()?;
        tracing::info!("[Keg] Initialized {}", dir.display());
        Ok(keg)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        self.store.root()
    }

    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn node_dir(&self, id: NodeId) -> PathBuf {
        self.store.node_dir(id)
    }

    pub fn publisher(&self) -> Publisher<'_> {
        let hook: Box<dyn PublishHook> = match &self.config.publish_command {
            Some(argv) => Box::new(CommandHook::new(argv.clone())),
            None => Box::new(NoopHook),
        };
        Publisher::new(&self.store, hook)
    }

    /// The full dex in ID order.
    pub fn dex(&self) -> Result<Dex> {
        self.publisher().dex()
    }

    pub fn lookup(&self, id: NodeId) -> Result<DexEntry> {
        self.dex()?.lookup(id).cloned()
    }

    /// Highest-numbered node.
    pub fn last(&self) -> Result<DexEntry> {
        self.dex()?.last().cloned().ok_or(KegError::NoCandidates)
    }

    /// Most recently changed node, read from the top of the changes log.
    pub fn last_changed(&self) -> Result<DexEntry> {
        self.changes(1)?.into_iter().next().ok_or(KegError::NoCandidates)
    }

    /// The `n` most recently changed nodes. Reads only the head of the
    /// changes log; rebuilds once if it is missing or garbled.
    pub fn changes(&self, n: usize) -> Result<Dex> {
        let publisher = self.publisher();
        let repo = publisher.repository();
        match repo.read_changes_head(n) {
            Err(e) if e.is_inconsistent() => {
                tracing::warn!("[Keg] {}; rebuilding", e);
                repo.full_rebuild(&self.store)?;
                repo.read_changes_head(n)
            }
            other => other,
        }
    }

    /// Nodes whose title matches `pattern` (with the configured prefix).
    pub fn titles(&self, pattern: &str) -> Result<Dex> {
        let re = Searcher::compile(&self.config.regex_prefix, pattern)?;
        Ok(Searcher::titles(&self.dex()?, &re))
    }

    pub fn grep(&self, pattern: &str) -> Result<Vec<GrepHit>> {
        let re = Searcher::compile(&self.config.regex_prefix, pattern)?;
        Searcher::grep(&self.store, &re)
    }

    pub fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<DexEntry> {
        self.dex()?.random(rng).cloned()
    }

    /// Turns a target into a dex entry. `Ok(None)` when the chooser was
    /// aborted.
    pub fn resolve(&self, target: &Target, chooser: &mut dyn Chooser) -> Result<Option<DexEntry>> {
        match target {
            Target::Same => self.last_changed().map(Some),
            Target::Last => self.last().map(Some),
            Target::Id(id) => self.lookup(*id).map(Some),
            Target::Pattern(p) => Ok(self.titles(p)?.choose(chooser)?.cloned()),
        }
    }

    /// Allocates a node, optionally seeds it with sample content, and opens
    /// it in the editor. A node left empty is discarded without touching the
    /// dex. Returns the new ID if the node was kept.
    pub fn create(&self, editor: &dyn Editor, sample: bool) -> Result<Option<NodeId>> {
        let id = self.store.allocate()?;
        if sample {
            self.store.write_content(id, SAMPLE_NODE.as_bytes())?;
        }

        editor.edit(&self.store.content_path(id))?;

        if !self.store.has_content(id)? {
            tracing::info!("[Keg] Node {} left empty, discarding", id);
            self.store.remove(id)?;
            return Ok(None);
        }

        self.publisher().node_changed(id)?;
        Ok(Some(id))
    }

    /// Opens an existing node in the editor and reflects the result.
    pub fn edit(&self, id: NodeId, editor: &dyn Editor) -> Result<EditOutcome> {
        if !self.store.exists(id) {
            return Err(KegError::NodeNotFound(id));
        }
        let path = self.store.content_path(id);
        let before = fs::metadata(&path)?.modified()?;

        editor.edit(&path)?;

        let publisher = self.publisher();
        if !self.store.has_content(id)? {
            publisher.node_changed(id)?;
            return Ok(EditOutcome::Removed);
        }

        // an untouched node keeps its place in the changes log
        let after = fs::metadata(&path)?.modified()?;
        if after > before {
            publisher.node_changed(id)?;
            Ok(EditOutcome::Updated)
        } else {
            Ok(EditOutcome::Unchanged)
        }
    }

    pub fn delete(&self, id: NodeId) -> Result<()> {
        self.store.remove(id)?;
        self.publisher().node_removed(id)
    }

    /// Copies node directories in as new nodes, then rebuilds and publishes.
    pub fn import(&self, sources: &[PathBuf]) -> Result<Vec<NodeId>> {
        let ids = self.store.import(sources)?;
        self.publisher().rebuild()?;
        Ok(ids)
    }

    pub fn view(&self, id: NodeId, renderer: &dyn Renderer) -> Result<String> {
        let bytes = self.store.read_content(id)?;
        renderer.render(&String::from_utf8_lossy(&bytes))
    }
}

/// Finds the current keg's name and directory.
///
/// 1. `env_name` mapped through `config.kegs` (its `docs/` if present)
/// 2. `cwd` holding a `keg` file
/// 3. `cwd/docs` holding a `keg` file
/// 4. `config.current` mapped through `config.kegs`
pub fn locate(config: &Config, env_name: Option<&str>, cwd: &Path) -> Result<(String, PathBuf)> {
    if let Some(name) = env_name.filter(|n| !n.is_empty()) {
        if let Some(dir) = config.keg_path(name) {
            if !dir.exists() {
                tracing::warn!("[Keg] {} points to missing {}", name, dir.display());
                return Err(KegError::NoKeg);
            }
            let docs = dir.join("docs");
            let dir = if docs.exists() { docs } else { dir };
            return Ok((name.to_string(), dir));
        }
    }

    if cwd.join(KEG_FILE).exists() {
        let mut name = base_name(cwd);
        if name == "docs" {
            name = cwd.parent().map(base_name).unwrap_or(name);
        }
        return Ok((name, cwd.to_path_buf()));
    }

    if cwd.join("docs").join(KEG_FILE).exists() {
        return Ok((base_name(cwd), cwd.join("docs")));
    }

    if let Some(name) = &config.current {
        if let Some(dir) = config.keg_path(name) {
            return Ok((name.clone(), dir));
        }
    }

    Err(KegError::NoKeg)
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
