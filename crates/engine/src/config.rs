use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_INITIAL_CLAIM_BLOCKS: i32 = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Claim settings in effect for one world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub allow_claims: bool,
    pub initial_claim_blocks: i32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            allow_claims: true,
            initial_claim_blocks: DEFAULT_INITIAL_CLAIM_BLOCKS,
        }
    }
}

/// Per-world overrides; unset fields fall back to `[default]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldConfigLayer {
    pub allow_claims: Option<bool>,
    pub initial_claim_blocks: Option<i32>,
}

/// ```toml
/// [default]
/// initial_claim_blocks = 100
///
/// [worlds.world_the_end]
/// allow_claims = false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimConfig {
    pub default: WorldConfig,
    pub worlds: BTreeMap<String, WorldConfigLayer>,
}

impl ClaimConfig {
    pub fn from_toml_str(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents, path)
    }

    pub fn for_world(&self, world_name: &str) -> WorldConfig {
        let Some(layer) = self.worlds.get(world_name) else {
            return self.default;
        };
        WorldConfig {
            allow_claims: layer.allow_claims.unwrap_or(self.default.allow_claims),
            initial_claim_blocks: layer
                .initial_claim_blocks
                .unwrap_or(self.default.initial_claim_blocks),
        }
    }
}
