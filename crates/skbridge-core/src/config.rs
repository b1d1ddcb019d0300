use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::BridgeError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Whether re-synchronization exposes anything at all (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Seal generated functions against further overriding (default: false)
    #[serde(default)]
    pub is_final: bool,

    /// Rebind routines after a runtime reload (default: true)
    #[serde(default = "default_true")]
    pub rebind_on_reload: bool,

    /// Structs up to this many bytes are passed by value (default: 16)
    #[serde(default = "default_inline_struct_capacity")]
    pub inline_struct_capacity: u32,

    /// Log routines that could not be exposed (default: true)
    #[serde(default = "default_true")]
    pub log_rejections: bool,
}

fn default_true() -> bool {
    true
}

fn default_inline_struct_capacity() -> u32 {
    skbridge_script::INLINE_STRUCT_CAPACITY as u32
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            is_final: false,
            rebind_on_reload: true,
            inline_struct_capacity: default_inline_struct_capacity(),
            log_rejections: true,
        }
    }
}

impl BridgeConfig {
    /// Default location: `bridge.toml` in the platform config directory
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "skbridge").map(|dirs| dirs.config_dir().join("bridge.toml"))
    }

    /// Load from the default location, falling back to defaults when absent
    pub fn load() -> Result<Self, BridgeError> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, BridgeError> {
        if !path.exists() {
            return Err(BridgeError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| BridgeError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        info!(target: "bridge", "Loaded bridge config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, BridgeError> {
        Ok(toml::from_str(content)?)
    }
}
