//! Generator configuration, read from an optional `schemagen.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::generate::ArtifactKind;
use crate::order::OrderStrategy;

pub const CONFIG_FILE: &str = "schemagen.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Root directory artifacts are written under.
    pub output_dir: PathBuf,
    /// Treat structural problems (unclosed models, stray field lines) as errors.
    pub strict: bool,
    pub ordering: OrderStrategy,
    /// Build entities on a thread pool.
    pub parallel: bool,
    /// Artifact kinds to emit.
    pub artifacts: Vec<ArtifactKind>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("generated"),
            strict: false,
            ordering: OrderStrategy::default(),
            parallel: true,
            artifacts: ArtifactKind::ALL.to_vec(),
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Load `schemagen.toml` from `dir` if present, defaults otherwise.
    pub fn discover(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE);
        if path.is_file() {
            tracing::debug!(path = %path.display(), "loading configuration");
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }
}
