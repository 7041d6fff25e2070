use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::LoggerConfig;

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "awkit.toml";

/// Settings shared by the command line tools.
///
/// ```toml
/// data_dir = "game/DATA"
/// output_dir = "out"
///
/// [logger_config]
/// app_level_filter = "DEBUG"
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ToolConfig {
    /// Directory holding `MEMLIST.BIN` and the banks.
    pub data_dir: Option<PathBuf>,
    /// Where extracted or rebuilt files go.
    pub output_dir: Option<PathBuf>,
    /// Directory with edited `{id:02x}_*.bin` files, for the packer.
    pub resources_dir: Option<PathBuf>,
    pub logger_config: LoggerConfig,
}

impl ToolConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid tool configuration")
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read config {:?}", path))?;
        Self::from_toml(&text).with_context(|| format!("in {:?}", path))
    }

    /// An explicit path must exist; without one, `awkit.toml` is used when
    /// present and defaults otherwise.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => Self::load(DEFAULT_CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }
}
