//! Standard paths used by ZenFocus

use std::path::{Path, PathBuf};

/// Standard ZenFocus paths
#[derive(Debug, Clone)]
pub struct Paths {
    /// Data directory (~/.local/share/zenfocus)
    pub data: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self::new()
    }
}

impl Paths {
    pub fn new() -> Self {
        let data = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("zenfocus");

        Self { data }
    }

    /// Paths rooted at an explicit data directory (`--data-dir`)
    pub fn with_data_dir(data: &Path) -> Self {
        Self {
            data: data.to_path_buf(),
        }
    }

    /// Directory holding the persisted key-value blobs
    pub fn store(&self) -> PathBuf {
        self.data.join("store")
    }

    /// Log file of the interactive timer
    pub fn log_file(&self) -> PathBuf {
        self.data.join("zenfocus.log")
    }
}
