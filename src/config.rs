// FILE: src/config.rs
//! Read-only user configuration.
//!
//! Loaded from `$KEG_CONFIG`, else `<config dir>/keg/config.toml`. A missing
//! file means defaults:
//!
//! ```toml
//! regex_prefix = "(?i)"
//! changes_default = 5
//! columns = 100
//! current = "notes"
//! editor = "nvim"
//! publish_command = ["make", "site"]
//!
//! [kegs]
//! notes = "~/notes/docs"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const DEFAULT_REGEX_PREFIX: &str = "(?i)";
pub const DEFAULT_CHANGES: usize = 5;
pub const DEFAULT_COLUMNS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Prepended to every title and grep pattern.
    pub regex_prefix: String,
    /// Rows shown by `changes` without an explicit count.
    pub changes_default: usize,
    /// Listing width when stdout is not a terminal.
    pub columns: usize,
    /// Name of the keg used when nothing else selects one.
    pub current: Option<String>,
    /// Keg name to directory.
    pub kegs: BTreeMap<String, PathBuf>,
    pub editor: Option<String>,
    /// Argument vector run in the keg root after each publish.
    pub publish_command: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            regex_prefix: DEFAULT_REGEX_PREFIX.to_string(),
            changes_default: DEFAULT_CHANGES,
            columns: DEFAULT_COLUMNS,
            current: None,
            kegs: BTreeMap::new(),
            editor: None,
            publish_command: None,
        }
    }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        if let Ok(p) = std::env::var("KEG_CONFIG") {
            return Some(PathBuf::from(p));
        }
        dirs::config_dir().map(|d| d.join("keg").join("config.toml"))
    }

    /// Loads the default config file, or defaults if there is none.
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("[Config] No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Directory for a named keg, with a leading `~` expanded.
    pub fn keg_path(&self, name: &str) -> Option<PathBuf> {
        self.kegs.get(name).map(|p| expand_tilde(p))
    }
}

pub fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}
