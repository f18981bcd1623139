// FILE: src/core/bouncer.rs
//! The Bouncer: keeps editor and OS litter out of imported nodes.
//!
//! Noise is:
//! 1. Hidden files (start with .)
//! 2. Backup files (end with ~)
//! 3. Known OS metadata files (Thumbs.db, desktop.ini)
//! 4. Editor swap and temp files

const IGNORED_EXACT: &[&str] = &[
    "thumbs.db",
    "ehthumbs.db",
    "desktop.ini",
    "icon?",
    "$recycle.bin",
];

const IGNORED_EXTENSIONS: &[&str] = &[
    "swp", "swo", "swx", "tmp", "bak", "orig", "rej", "partial", "crdownload",
];

pub struct Bouncer;

impl Bouncer {
    /// Decides if a file or directory name should be left behind on import.
    pub fn is_noise(name: &str) -> bool {
        let name_lower = name.to_lowercase();

        if name.starts_with('.') || name.ends_with('~') {
            return true;
        }

        if IGNORED_EXACT.contains(&name_lower.as_str()) {
            return true;
        }

        // Emacs lock and autosave files
        if name.starts_with(".#") || (name.starts_with('#') && name.ends_with('#')) {
            return true;
        }

        if let Some(idx) = name_lower.rfind('.') {
            if idx + 1 < name_lower.len() {
                let ext = &name_lower[idx + 1..];
                if IGNORED_EXTENSIONS.contains(&ext) {
                    return true;
                }
            }
        }

        false
    }
}
