//! Engine configuration.
//!
//! Resolution order (highest priority first):
//! 1. CLI flags (applied by the binary on top of the loaded value)
//! 2. Config file passed with `--config`
//! 3. Compiled defaults

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::error::{EngineError, Result};

/// Upper bound for auxiliary JSON inputs before they are treated as absent.
pub const DEFAULT_MAX_AUX_BYTES: u64 = 256 * 1024 * 1024;

/// Options shared by every worker of a batch. Built once, passed by reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Hops allowed past the first third-party/API call. -1 keeps everything.
    pub native_hop: i32,
    /// Include `find` edges in the adjacency index.
    pub track_find_edges: bool,
    /// Skip mundane nodes during traversal. Disabled only for debugging.
    pub noise_filter: bool,
    /// Run the dead-leaf eliminator during reduction.
    pub remove_leaf: bool,
    /// Drop behaviors that match neither UI nor method interest keywords.
    pub use_filter: bool,
    /// Rebuild `uhg_full.json` even if a valid one exists.
    pub rewrite_behavior: bool,
    /// Keep `uhg_full.json` after reduction.
    pub save_behavior: bool,
    /// Rebuild `uhg.json` even if the app looks finished.
    pub rewrite_reduce: bool,
    /// Worker count; `None` lets the pool pick from the core count.
    pub threads: Option<usize>,
    /// Directory holding the four keyword list files.
    pub lists_dir: PathBuf,
    pub max_aux_bytes: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            native_hop: 0,
            track_find_edges: false,
            noise_filter: true,
            remove_leaf: false,
            use_filter: false,
            rewrite_behavior: false,
            save_behavior: false,
            rewrite_reduce: false,
            threads: None,
            lists_dir: PathBuf::from("lists"),
            max_aux_bytes: DEFAULT_MAX_AUX_BYTES,
        }
    }
}

impl EngineConfig {
    /// Load a TOML config file. Missing keys keep their defaults.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
        Self::from_toml_str(&text).map_err(|message| EngineError::Config {
            path: path.to_path_buf(),
            message,
        })
    }

    pub fn from_toml_str(text: &str) -> std::result::Result<Self, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }

    /// Hop limit as an option; negative values mean unlimited.
    pub fn hop_limit(&self) -> Option<u32> {
        u32::try_from(self.native_hop).ok()
    }
}
