use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use xdg::BaseDirectories;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gitlab: GitLabConfig,
    pub git: GitConfig,
    pub context: ContextConfig,
    pub discussion: DiscussionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitLabConfig {
    pub host: String,
    /// Environment variable holding the personal access token
    pub token_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitConfig {
    /// Local clone of the reviewed project
    pub repository: PathBuf,
    /// `-U<N>` for the diff that positions are resolved against
    pub diff_context: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    pub depth: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscussionConfig {
    /// Anchor new discussions at the resolved position
    pub include_position: bool,
}

impl Default for GitLabConfig {
    fn default() -> Self {
        Self {
            host: "https://gitlab.com".to_owned(),
            token_env: "GITLAB_TOKEN".to_owned(),
        }
    }
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            repository: PathBuf::from("."),
            diff_context: crate::session::DEFAULT_DIFF_CONTEXT,
        }
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self { depth: 3 }
    }
}

impl Default for DiscussionConfig {
    fn default() -> Self {
        Self {
            include_position: true,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// `$XDG_CONFIG_HOME/mranchor/config.toml`
    pub fn config_path() -> PathBuf {
        BaseDirectories::with_prefix("mranchor")
            .map(|dirs| dirs.get_config_home())
            .unwrap_or_else(|_| PathBuf::from(".config"))
            .join("config.toml")
    }

    /// Read the GitLab token from the configured environment variable
    pub fn gitlab_token(&self) -> Result<String> {
        std::env::var(&self.gitlab.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .with_context(|| format!("GitLab token not set (${})", self.gitlab.token_env))
    }
}
