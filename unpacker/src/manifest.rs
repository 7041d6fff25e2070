use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use awkit_core::MemListEntry;
use serde::{Deserialize, Serialize};

pub const MANIFEST_FILE_NAME: &str = "manifest.yaml";

/// What was extracted, written next to the resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub data_dir: PathBuf,
    pub resources: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub id: usize,
    pub file: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub listing: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
    #[serde(flatten)]
    pub entry: MemListEntry,
}

impl Manifest {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            resources: Vec::new(),
        }
    }

    pub fn failures(&self) -> usize {
        self.resources.iter().filter(|r| r.error.is_some()).count()
    }

    pub fn write(&self, output_dir: impl AsRef<Path>) -> Result<PathBuf> {
        let path = output_dir.as_ref().join(MANIFEST_FILE_NAME);
        let mut writer = std::fs::File::create(&path)
            .with_context(|| format!("unable to create {:?}", path))?;
        serde_yaml::to_writer(&mut writer, self)?;
        Ok(path)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read {:?}", path))?;
        serde_yaml::from_str(&text).with_context(|| format!("invalid manifest {:?}", path))
    }
}
