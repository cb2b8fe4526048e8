//! # Configuration
//!
//! Cardsync configuration is loaded with [`confique`] from layered sources.
//!
//! ## Resolution Order
//!
//! 1. **Environment variables**: `CARDSYNC_DATA_DIR`, `CARDSYNC_REMOTE_DIR`,
//!    `CARDSYNC_OWNER`.
//! 2. **Config file**: an explicit path, or `cardsync.toml` in the OS config
//!    directory (via the `directories` crate). A missing file is fine.
//! 3. **Compiled defaults**: `#[config(default = ...)]`.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `data_dir` | OS data directory | Where `cache.json` and `pending.json` live |
//! | `remote_dir` | none | Shared directory holding the authoritative collection |
//! | `owner` | `local` | Owner id used when none is given |

use crate::error::{CardError, Result};
use confique::Config;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "cardsync.toml";
const DEFAULT_OWNER: &str = "local";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "cardsync", "cardsync")
}

/// Default location of `cardsync.toml`, if the platform has a config dir.
pub fn default_config_file() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CardsyncConfig {
    /// Directory for the local cache and the pending queue.
    #[config(env = "CARDSYNC_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Shared directory used as the remote store. Unset means "never online".
    #[config(env = "CARDSYNC_REMOTE_DIR")]
    pub remote_dir: Option<PathBuf>,

    #[config(env = "CARDSYNC_OWNER", default = "local")]
    pub owner: String,
}

impl Default for CardsyncConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            remote_dir: None,
            owner: DEFAULT_OWNER.to_string(),
        }
    }
}

impl CardsyncConfig {
    /// Load from the environment, then `file` (or the default config file).
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = Self::builder().env();
        if let Some(path) = file.map(Path::to_path_buf).or_else(default_config_file) {
            builder = builder.file(path);
        }
        builder
            .load()
            .map_err(|e| CardError::InvalidArgument(format!("configuration: {}", e)))
    }

    /// The data directory, falling back to the OS data dir, then `.cardsync`.
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .or_else(|| project_dirs().map(|dirs| dirs.data_dir().to_path_buf()))
            .unwrap_or_else(|| PathBuf::from(".cardsync"))
    }
}
