//! Configuration for medprep

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::store::{EligibilityPolicy, SelectionOrder};

/// Hard cap on questions in a single practice attempt
pub const MAX_ATTEMPT_QUESTIONS: u32 = 20;

/// Default storage directory
pub fn default_storage_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("medprep")
}

/// Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the SQLite database and config file
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// HTTP API port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Upper bound applied to a requested attempt size
    #[serde(default = "default_max_attempt_questions")]
    pub max_attempt_questions: u32,

    /// Attempt size used when the caller gives no limit
    #[serde(default = "default_batch_size")]
    pub default_batch_size: u32,

    /// Skip questions the user has already mastered
    #[serde(default = "default_true")]
    pub exclude_mastered: bool,

    /// Randomize question order within an attempt
    #[serde(default = "default_true")]
    pub shuffle_questions: bool,
}

fn default_http_port() -> u16 {
    8095
}

fn default_max_attempt_questions() -> u32 {
    MAX_ATTEMPT_QUESTIONS
}

fn default_batch_size() -> u32 {
    10
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            http_port: default_http_port(),
            max_attempt_questions: MAX_ATTEMPT_QUESTIONS,
            default_batch_size: default_batch_size(),
            exclude_mastered: true,
            shuffle_questions: true,
        }
    }
}

impl Config {
    /// Load config from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Save config to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), std::io::Error> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Get SQLite database path
    pub fn db_path(&self) -> PathBuf {
        self.storage_dir.join("medprep.db")
    }

    /// Get config file path
    pub fn config_path(&self) -> PathBuf {
        self.storage_dir.join("config.toml")
    }

    /// Eligibility policy handed to the question store
    pub fn policy(&self) -> EligibilityPolicy {
        EligibilityPolicy {
            exclude_mastered: self.exclude_mastered,
            order: if self.shuffle_questions {
                SelectionOrder::Shuffled
            } else {
                SelectionOrder::Stable
            },
            default_batch_size: self.default_batch_size.max(1),
        }
    }
}
