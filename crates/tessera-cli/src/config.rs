use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tessera_types::Format;
use tessera_value::DEFAULT_CHUNK_SIZE;

/// Name of the repository metadata directory.
pub const REPO_DIR: &str = ".tessera";

/// Per-repository settings, stored in `.tessera/config.toml`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    pub format: Format,
    pub chunk_size: usize,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            format: Format::default(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl RepoConfig {
    pub fn config_path(repo: &Path) -> PathBuf {
        repo.join(REPO_DIR).join("config.toml")
    }

    pub fn chunks_path(repo: &Path) -> PathBuf {
        repo.join(REPO_DIR).join("chunks")
    }

    pub fn load(repo: &Path) -> anyhow::Result<Self> {
        let path = Self::config_path(repo);
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("not a tessera repository (no {})", path.display()))?;
        let config: Self =
            toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
        anyhow::ensure!(config.chunk_size >= 2, "chunk_size must be at least 2");
        Ok(config)
    }

    pub fn save(&self, repo: &Path) -> anyhow::Result<()> {
        let path = Self::config_path(repo);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&path, toml::to_string_pretty(self)?)
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }
}
