// FILE: src/storage/repository.rs
//! Dex artifacts on disk.
//!
//! - `dex/nodes.tsv`: one `N\tU\tT` row per node, ascending by ID
//! - `dex/changes.md`: one `* U [T](../N)` row per node, newest first
//!
//! Both are pure caches of the node tree. Nothing here is authoritative: a
//! missing or unparsable artifact is reported as `Inconsistent` and repaired
//! by `full_rebuild`.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::engine::dex::{parse_md_row, parse_tsv_row, Dex, DexEntry};
use crate::engine::indexer::Indexer;
use crate::error::{KegError, Result};
use crate::storage::{NodeId, NodeStore, DEX_DIR};

pub const TABLE_FILE: &str = "nodes.tsv";
pub const CHANGES_FILE: &str = "changes.md";

#[derive(Debug, Clone)]
pub struct Repository {
    dir: PathBuf,
}

impl Repository {
    pub fn new(keg_root: &Path) -> Self {
        Self { dir: keg_root.join(DEX_DIR) }
    }

    pub fn table_path(&self) -> PathBuf {
        self.dir.join(TABLE_FILE)
    }

    pub fn changes_path(&self) -> PathBuf {
        self.dir.join(CHANGES_FILE)
    }

    pub fn read_table(&self) -> Result<Dex> {
        let path = self.table_path();
        let dex = read_rows(&path, usize::MAX, parse_tsv_row)?;

        let ascending = dex.entries().windows(2).all(|w| w[0].n < w[1].n);
        if !ascending {
            return Err(KegError::inconsistent(&path, "rows not in ascending ID order"));
        }
        Ok(dex)
    }

    pub fn read_changes(&self) -> Result<Dex> {
        read_rows(&self.changes_path(), usize::MAX, parse_md_row)
    }

    /// Reads only the first `n` rows of the changes artifact.
    pub fn read_changes_head(&self, n: usize) -> Result<Dex> {
        read_rows(&self.changes_path(), n, parse_md_row)
    }

    /// Writes both artifacts from `dex`, each in its canonical order.
    pub fn write(&self, dex: &Dex) -> Result<()> {
        self.write_table(&dex.clone().by_id())?;
        self.write_changes(&dex.clone().by_recency())
    }

    fn write_table(&self, table: &Dex) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.table_path(), table.to_tsv())?;
        Ok(())
    }

    fn write_changes(&self, changes: &Dex) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.changes_path(), changes.to_md())?;
        Ok(())
    }

    /// Upserts `entry` in the table and moves its changes row to the top.
    pub fn incremental_update(&self, entry: &DexEntry) -> Result<()> {
        let mut table = self.read_table()?;
        let changes = self.read_changes()?;

        table.upsert(entry.clone());

        let mut front = Dex::new();
        front.push(entry.clone());
        let changes: Dex = front
            .into_iter()
            .chain(changes.into_iter().filter(|e| e.n != entry.n))
            .collect();

        self.write_table(&table)?;
        self.write_changes(&changes)?;
        tracing::debug!("[Repository] Updated dex entry {}", entry.n);
        Ok(())
    }

    /// Drops the node's rows from both artifacts. Other rows keep their IDs.
    pub fn incremental_remove(&self, id: NodeId) -> Result<()> {
        let mut table = self.read_table()?;
        let mut changes = self.read_changes()?;

        let in_table = table.remove(id);
        let in_changes = changes.remove(id);
        if !in_table && !in_changes {
            tracing::debug!("[Repository] Node {} was not in the dex", id);
            return Ok(());
        }

        self.write_table(&table)?;
        self.write_changes(&changes)?;
        tracing::debug!("[Repository] Removed dex entry {}", id);
        Ok(())
    }

    /// Recomputes both artifacts from the node tree.
    pub fn full_rebuild(&self, store: &NodeStore) -> Result<Dex> {
        let dex = Indexer::build(store)?;
        self.write(&dex)?;
        tracing::info!("[Repository] Rebuilt {} and {}", TABLE_FILE, CHANGES_FILE);
        Ok(dex)
    }
}

fn read_rows(path: &Path, limit: usize, parse: fn(&str) -> Option<DexEntry>) -> Result<Dex> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(KegError::inconsistent(path, "missing"));
        }
        Err(e) => return Err(e.into()),
    };

    let mut dex = Dex::new();
    for (i, line) in BufReader::new(file).lines().take(limit).enumerate() {
        let line = match line {
            Ok(l) => l,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                return Err(KegError::inconsistent(path, format!("line {} is not UTF-8", i + 1)));
            }
            Err(e) => return Err(e.into()),
        };
        let entry = parse(&line)
            .ok_or_else(|| KegError::inconsistent(path, format!("unparsable line {}", i + 1)))?;
        dex.push(entry);
    }
    Ok(dex)
}
