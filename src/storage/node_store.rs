// FILE: src/storage/node_store.rs
//! Node directory CRUD operations
//!
//! Handles every direct filesystem effect on the keg tree:
//! - Allocating new node directories (max existing ID + 1, never a gap)
//! - Reading, writing and removing node content
//! - Listing integer-named node directories
//! - Importing node directories from elsewhere

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use walkdir::WalkDir;

use crate::core::bouncer::Bouncer;
use crate::error::{KegError, Result};
use crate::storage::{NodeId, CONTENT_FILE};

#[derive(Debug, Clone)]
pub struct NodeStore {
    root: PathBuf,
}

impl NodeStore {
    /// Opens the node tree rooted at `root`, which must be a directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(KegError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("keg directory does not exist: {}", root.display()),
            )));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn node_dir(&self, id: NodeId) -> PathBuf {
        self.root.join(id.to_string())
    }

    pub fn content_path(&self, id: NodeId) -> PathBuf {
        self.node_dir(id).join(CONTENT_FILE)
    }

    pub fn exists(&self, id: NodeId) -> bool {
        self.node_dir(id).is_dir()
    }

    /// A node is indexable only while its content file exists and is
    /// non-empty.
    pub fn has_content(&self, id: NodeId) -> Result<bool> {
        match fs::metadata(self.content_path(id)) {
            Ok(meta) => Ok(meta.is_file() && meta.len() > 0),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// All integer-named immediate subdirectories of the root. Names must be
    /// canonical (`7`, not `007`) to count.
    pub fn list_ids(&self) -> Result<BTreeSet<NodeId>> {
        let mut ids = BTreeSet::new();
        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| {
                e.into_io_error()
                    .map(KegError::Io)
                    .unwrap_or_else(|| KegError::Other(anyhow::anyhow!("walk failed")))
            })?;
            if !entry.file_type().is_dir() {
                continue;
            }
            if let Some(id) = entry.file_name().to_str().and_then(parse_node_name) {
                ids.insert(id);
            }
        }
        Ok(ids)
    }

    /// Creates the next node directory with an empty content file.
    ///
    /// The new ID is one greater than the highest existing ID (0 for an empty
    /// keg), so IDs freed by deleting lower nodes are never handed out again.
    pub fn allocate(&self) -> Result<NodeId> {
        let id = self.list_ids()?.last().map_or(0, |max| max + 1);
        let dir = self.node_dir(id);
        fs::create_dir(&dir)?;
        fs::File::create(dir.join(CONTENT_FILE))?;
        tracing::debug!("[NodeStore] Allocated node {}", id);
        Ok(id)
    }

    pub fn read_content(&self, id: NodeId) -> Result<Vec<u8>> {
        self.require(id)?;
        Ok(fs::read(self.content_path(id))?)
    }

    pub fn write_content(&self, id: NodeId, bytes: &[u8]) -> Result<()> {
        self.require(id)?;
        fs::write(self.content_path(id), bytes)?;
        Ok(())
    }

    /// Deletes the node directory and everything in it.
    pub fn remove(&self, id: NodeId) -> Result<()> {
        self.require(id)?;
        let dir = self.node_dir(id);
        tracing::info!("[NodeStore] Deleting {}", dir.display());
        fs::remove_dir_all(dir)?;
        Ok(())
    }

    /// Modification time of the content file, truncated to whole seconds.
    pub fn mod_time(&self, id: NodeId) -> Result<DateTime<Utc>> {
        let modified = fs::metadata(self.content_path(id))?.modified()?;
        Ok(whole_seconds(modified))
    }

    /// Copies each source into freshly allocated nodes.
    ///
    /// A source holding a content file is one node. Any other directory is
    /// treated as a keg and each of its node directories is imported in
    /// ascending ID order. Returns the new IDs in allocation order.
    pub fn import(&self, sources: &[PathBuf]) -> Result<Vec<NodeId>> {
        let root = fs::canonicalize(&self.root)?;
        let mut imported = Vec::new();

        for src in sources {
            let abs_src = fs::canonicalize(src)?;
            if abs_src == root || abs_src.starts_with(&root) {
                return Err(KegError::Other(anyhow::anyhow!(
                    "refusing to import {} into the keg that contains it",
                    src.display()
                )));
            }

            if abs_src.join(CONTENT_FILE).is_file() {
                imported.push(self.import_node(&abs_src)?);
                continue;
            }

            let source_keg = NodeStore::open(&abs_src)?;
            for old in source_keg.list_ids()? {
                let node_dir = source_keg.node_dir(old);
                if !node_dir.join(CONTENT_FILE).is_file() {
                    tracing::debug!("[NodeStore] Skipping {} (no content)", node_dir.display());
                    continue;
                }
                imported.push(self.import_node(&node_dir)?);
            }
        }

        Ok(imported)
    }

    fn import_node(&self, src: &Path) -> Result<NodeId> {
        let id = self.allocate()?;
        let dest = self.node_dir(id);

        let walker = WalkDir::new(src)
            .follow_links(false)
            .min_depth(1)
            .into_iter()
            .filter_entry(|e| !Bouncer::is_noise(&e.file_name().to_string_lossy()));

        for entry in walker {
            let entry = entry.map_err(|e| {
                e.into_io_error()
                    .map(KegError::Io)
                    .unwrap_or_else(|| KegError::Other(anyhow::anyhow!("walk failed")))
            })?;
            let rel = entry
                .path()
                .strip_prefix(src)
                .map_err(|e| KegError::Other(e.into()))?;
            let target = dest.join(rel);
            if entry.file_type().is_dir() {
                fs::create_dir_all(&target)?;
            } else if entry.file_type().is_file() {
                fs::copy(entry.path(), &target)?;
            }
        }

        tracing::info!("[NodeStore] Imported {} as node {}", src.display(), id);
        Ok(id)
    }

    fn require(&self, id: NodeId) -> Result<()> {
        if self.exists(id) {
            Ok(())
        } else {
            Err(KegError::NodeNotFound(id))
        }
    }
}

/// Parses a canonical node directory name.
pub fn parse_node_name(name: &str) -> Option<NodeId> {
    let id: NodeId = name.parse().ok()?;
    (id.to_string() == name).then_some(id)
}

pub fn whole_seconds(t: SystemTime) -> DateTime<Utc> {
    let dt = DateTime::<Utc>::from(t);
    DateTime::from_timestamp(dt.timestamp(), 0).unwrap_or(dt)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, NodeStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = NodeStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_open_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        assert!(NodeStore::open(dir.path().join("nope")).is_err());
    }

    #[test]
    fn test_allocate_starts_at_zero() {
        let (_dir, store) = store();
        assert_eq!(store.allocate().unwrap(), 0);
        assert_eq!(store.allocate().unwrap(), 1);
        assert!(store.content_path(1).is_file());
        assert!(!store.has_content(1).unwrap());
    }

    #[test]
    fn test_allocate_never_fills_gaps() {
        let (_dir, store) = store();
        for expected in 0..5 {
            assert_eq!(store.allocate().unwrap(), expected);
        }
        store.remove(2).unwrap();
        assert!(!store.exists(2));
        assert_eq!(store.allocate().unwrap(), 5);
    }

    #[test]
    fn test_list_ids_ignores_other_entries() {
        let (dir, store) = store();
        fs::create_dir(dir.path().join("3")).unwrap();
        fs::create_dir(dir.path().join("10")).unwrap();
        fs::create_dir(dir.path().join("007")).unwrap();
        fs::create_dir(dir.path().join("dex")).unwrap();
        fs::write(dir.path().join("42"), "not a dir").unwrap();
        fs::write(dir.path().join("keg"), "").unwrap();

        let ids: Vec<_> = store.list_ids().unwrap().into_iter().collect();
        assert_eq!(ids, vec![3, 10]);
    }

    #[test]
    fn test_content_round_trip() {
        let (_dir, store) = store();
        let id = store.allocate().unwrap();
        store.write_content(id, b"# Hello\n").unwrap();
        assert_eq!(store.read_content(id).unwrap(), b"# Hello\n");
        assert!(store.has_content(id).unwrap());
    }

    #[test]
    fn test_missing_node_is_not_found() {
        let (_dir, store) = store();
        assert!(matches!(store.read_content(9), Err(KegError::NodeNotFound(9))));
        assert!(matches!(store.write_content(9, b"x"), Err(KegError::NodeNotFound(9))));
        assert!(matches!(store.remove(9), Err(KegError::NodeNotFound(9))));
    }

    #[test]
    fn test_mod_time_whole_seconds() {
        let (_dir, store) = store();
        let id = store.allocate().unwrap();
        let t = store.mod_time(id).unwrap();
        assert_eq!(t.timestamp_subsec_nanos(), 0);
    }

    #[test]
    fn test_import_node_and_keg_dirs() {
        let (_dir, store) = store();
        store.allocate().unwrap();

        let src = tempfile::tempdir().unwrap();
        let single = src.path().join("single");
        fs::create_dir(&single).unwrap();
        fs::write(single.join(CONTENT_FILE), "# Single\n").unwrap();
        fs::write(single.join("image.png"), [1u8, 2, 3]).unwrap();
        fs::write(single.join(".README.md.swp"), "junk").unwrap();

        let other = src.path().join("other");
        for (id, body) in [(4, "# Four\n"), (2, "# Two\n")] {
            let d = other.join(id.to_string());
            fs::create_dir_all(&d).unwrap();
            fs::write(d.join(CONTENT_FILE), body).unwrap();
        }
        fs::create_dir_all(other.join("9")).unwrap();

        let ids = store.import(&[single, other]).unwrap();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(store.read_content(1).unwrap(), b"# Single\n");
        assert!(store.node_dir(1).join("image.png").is_file());
        assert!(!store.node_dir(1).join(".README.md.swp").exists());
        assert_eq!(store.read_content(2).unwrap(), b"# Two\n");
        assert_eq!(store.read_content(3).unwrap(), b"# Four\n");
    }

    #[test]
    fn test_import_into_itself_rejected() {
        let (dir, store) = store();
        assert!(store.import(&[dir.path().to_path_buf()]).is_err());
    }
}
