//! Purpose: Extension configuration and script-path resolution.
//! Exports: `Config`, `BASE_DIR_ENV`.
//! Role: Keep ABI and CLI file-path semantics aligned from one source.
//! Invariants: Relative paths resolve against `base_dir`; absolute paths pass through.
//! Invariants: Defaults come from `JSONUS_BASE_DIR`, else the current directory.
use std::path::{Path, PathBuf};

pub const BASE_DIR_ENV: &str = "JSONUS_BASE_DIR";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    base_dir: PathBuf,
}

impl Config {
    pub fn new() -> Self {
        let base_dir = std::env::var_os(BASE_DIR_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        Self { base_dir }
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.base_dir.join(path)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
