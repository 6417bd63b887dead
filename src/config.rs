//! Build-time configuration.
//!
//! The indexer reads an optional `tgs.json` next to the index root; absent
//! file means defaults. Every field has a serde default so partial configs
//! work.

use crate::error::{IndexError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// File name of the persisted index, conventionally at a project root.
pub const INDEX_FILE_NAME: &str = ".index";

const CONFIG_FILE: &str = "tgs.json";

/// Configuration for the indexer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Number of indexing worker threads.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Extension allow-list; files with any other extension are not indexed.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

fn default_workers() -> usize {
    8
}

fn default_extensions() -> Vec<String> {
    [
        ".cc", ".cpp", ".h", ".hpp", ".cs", ".js", ".md", ".py", ".txt",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            extensions: default_extensions(),
        }
    }
}

impl IndexConfig {
    /// Load the config from `root`, or return defaults if no config file
    /// exists there.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path).map_err(|source| IndexError::io(&path, source))?;
        serde_json::from_str(&content)
            .map_err(|e| IndexError::Config(format!("{}: {e}", path.display())))
    }

    /// Whether `path` passes the extension allow-list. Entries are matched
    /// with or without their leading dot.
    pub fn allows(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.extensions
            .iter()
            .any(|allowed| allowed.trim_start_matches('.') == ext)
    }
}
