use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_FILE: &str = "stacker.toml";

/// Known donor tiles required before the staircase is planned.
pub const DEFAULT_MIN_DONOR_BLOCKS: usize = 3;
/// Known tiles required per gold level before the staircase is planned.
pub const DEFAULT_MIN_EXPLORED_PER_GOLD_LEVEL: usize = 3;
/// Hard turn ceiling; past it the agent only answers `none`.
pub const DEFAULT_MAX_TURNS: u64 = 1500;
/// Consecutive identical observations tolerated before a random escape move.
pub const DEFAULT_STUCK_THRESHOLD: u32 = 5;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_min_donor_blocks")]
    pub min_donor_blocks: usize,
    #[serde(default = "default_min_explored")]
    pub min_explored_per_gold_level: usize,
    #[serde(default = "default_max_turns")]
    pub max_turns: u64,
    #[serde(default = "default_stuck_threshold")]
    pub stuck_threshold: u32,
    /// Seed for tie-breaks and stuck escapes; `None` draws from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_min_donor_blocks() -> usize {
    DEFAULT_MIN_DONOR_BLOCKS
}

fn default_min_explored() -> usize {
    DEFAULT_MIN_EXPLORED_PER_GOLD_LEVEL
}

fn default_max_turns() -> u64 {
    DEFAULT_MAX_TURNS
}

fn default_stuck_threshold() -> u32 {
    DEFAULT_STUCK_THRESHOLD
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            min_donor_blocks: default_min_donor_blocks(),
            min_explored_per_gold_level: default_min_explored(),
            max_turns: default_max_turns(),
            stuck_threshold: default_stuck_threshold(),
            seed: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

impl AgentConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load an explicit file, or `stacker.toml` from the working directory when present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };

        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Self::from_toml_str(&text).map_err(|source| ConfigError::Parse { path, source })
    }

    /// Known tiles required before planning for a gold tile at `gold_level`.
    pub fn min_explored_cells(&self, gold_level: u32) -> usize {
        self.min_explored_per_gold_level
            .saturating_mul(gold_level as usize)
    }

    /// Known donors required before planning, capped at the blocks a staircase
    /// to `gold_level` consumes when built from the floor.
    pub fn min_donors(&self, gold_level: u32) -> usize {
        let level = gold_level as usize;
        let needed = level.saturating_mul(level.saturating_sub(1)) / 2;
        self.min_donor_blocks.min(needed)
    }
}
