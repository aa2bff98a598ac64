//! Configuration for article conversion
//!
//! Every field has a default, so an empty TOML document is a valid config.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Result, TelegraphError};

/// Proxy engine template understood by the source site.
/// `{provider}` is replaced by `youtube`, `vimeo` or `twitter`.
pub const DEFAULT_PROXY_ENGINE: &str = "https://telegra.ph/embed/{provider}?url=";

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub embed: EmbedConfig,
    pub media: MediaConfig,
    pub fetch: FetchConfig,
}

/// Embedded media (iframes and videos)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    /// Route embeds through this engine instead of the provider's own player
    pub proxy_engine: Option<String>,

    /// Width of iframes and videos
    pub width: u32,

    /// Height of iframes and videos
    pub height: u32,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            proxy_engine: None,
            width: 640,
            height: 360,
        }
    }
}

/// Downloaded figure media
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Base for relative figure sources
    pub base_url: String,

    /// Directory downloaded assets are written to
    pub upload_dir: PathBuf,

    /// Public prefix of returned asset references
    pub route: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            base_url: "https://telegra.ph/".to_string(),
            upload_dir: PathBuf::from("static"),
            route: "/file".to_string(),
        }
    }
}

/// Outbound HTTP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: concat!("telegraph/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    /// Parse a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| TelegraphError::Config(e.to_string()))
    }

    /// Read and parse a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| TelegraphError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Enable the default proxy engine for embeds
    pub fn with_proxy_embeds(mut self) -> Self {
        self.embed.proxy_engine = Some(DEFAULT_PROXY_ENGINE.to_string());
        self
    }
}
