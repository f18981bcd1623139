// FILE: src/engine/mod.rs
pub mod dex;
pub mod indexer;
pub mod publisher;
pub mod searcher;

pub use dex::{Dex, DexEntry, ISO_DATE_FMT};
pub use indexer::Indexer;
pub use publisher::{CommandHook, NoopHook, PublishHook, Publisher};
pub use searcher::{GrepHit, Searcher};
