//! keg: Knowledge Exchange Graph index engine
//!
//! A keg is a directory of numbered nodes (`<root>/<N>/README.md`). This
//! crate keeps two derived artifacts in step with that tree:
//! - `dex/nodes.tsv` (every node by ID)
//! - `dex/changes.md` (every node, most recently changed first)
//!
//! Layers, bottom up:
//! - core (title extraction: front matter, then the first heading)
//! - storage (node tree and dex artifacts on disk)
//! - engine (in-memory dex, indexer, searcher, publisher)
//! - keg (the operations a user runs against one keg)

pub mod collab;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod keg;
pub mod storage;

pub use collab::{Chooser, CommandEditor, Editor, PlainRenderer, PromptChooser, Renderer};
pub use config::Config;
pub use engine::{Dex, DexEntry, Publisher};
pub use error::{KegError, Result};
pub use keg::{EditOutcome, Keg, Target};
pub use storage::{NodeId, NodeStore, Repository};
