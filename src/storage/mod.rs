// FILE: src/storage/mod.rs
pub mod node_store;
pub mod repository;

// Common exports
pub use node_store::NodeStore;
pub use repository::Repository;

/// Node identifier: the integer name of the node's directory.
pub type NodeId = u64;

/// Primary content file inside every node directory.
pub const CONTENT_FILE: &str = "README.md";

/// Repository descriptor marking a directory as a keg.
pub const KEG_FILE: &str = "keg";

/// Directory holding the derived dex artifacts.
pub const DEX_DIR: &str = "dex";
