//! Embed resolution
//!
//! Maps a third-party media URL to an embeddable iframe source, either the
//! provider's own player or a configured proxy engine.

use url::Url;

use crate::config::EmbedConfig;
use crate::{Result, TelegraphError};

/// Supported embed providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    YouTube,
    Vimeo,
    Twitter,
}

/// Registrable domain of each provider; subdomains match too
const PROVIDER_DOMAINS: &[(&str, Provider)] = &[
    ("youtube.com", Provider::YouTube),
    ("vimeo.com", Provider::Vimeo),
    ("twitter.com", Provider::Twitter),
];

impl Provider {
    /// Classify a URL by host
    pub fn detect(url: &str) -> Option<Self> {
        Self::for_url(&Url::parse(url).ok()?)
    }

    fn for_url(url: &Url) -> Option<Self> {
        let host = url.host_str()?.trim_end_matches('.');
        PROVIDER_DOMAINS
            .iter()
            .find(|(domain, _)| {
                host == *domain
                    || host
                        .strip_suffix(*domain)
                        .is_some_and(|sub| sub.ends_with('.'))
            })
            .map(|(_, provider)| *provider)
    }

    /// Name used in proxy engine templates
    pub fn name(self) -> &'static str {
        match self {
            Provider::YouTube => "youtube",
            Provider::Vimeo => "vimeo",
            Provider::Twitter => "twitter",
        }
    }
}

fn youtube_id(url: &Url) -> Result<String> {
    url.query_pairs()
        .find(|(key, _)| key == "v")
        .map(|(_, id)| id.into_owned())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| TelegraphError::MissingVideoId(url.to_string()))
}

fn vimeo_id(url: &Url) -> Result<&str> {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .filter(|id| id.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| TelegraphError::MissingVideoId(url.to_string()))
}

/// Resolves embed URLs and renders the iframe wrapper
#[derive(Debug, Clone)]
pub struct EmbedResolver {
    proxy_engine: Option<String>,
    width: u32,
    height: u32,
}

impl EmbedResolver {
    pub fn new(config: &EmbedConfig) -> Self {
        Self {
            proxy_engine: config.proxy_engine.clone(),
            width: config.width,
            height: config.height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn proxied(&self, provider: Provider, canonical: &str) -> Option<String> {
        self.proxy_engine.as_ref().map(|engine| {
            format!(
                "{}{}",
                engine.replace("{provider}", provider.name()),
                urlencoding::encode(canonical)
            )
        })
    }

    /// Embeddable source for a provider URL
    pub fn embed_url(&self, url: &str) -> Result<String> {
        let unsupported = || TelegraphError::UnsupportedEmbed(url.to_string());
        let parsed = Url::parse(url).map_err(|_| unsupported())?;
        let provider = Provider::for_url(&parsed).ok_or_else(unsupported)?;

        let (canonical, direct) = match provider {
            Provider::YouTube => {
                let id = youtube_id(&parsed)?;
                (
                    format!("https://www.youtube.com/watch?v={}", id),
                    format!("https://www.youtube.com/embed/{}", id),
                )
            }
            Provider::Vimeo => {
                let id = vimeo_id(&parsed)?;
                (
                    format!("https://vimeo.com/{}", id),
                    format!("https://player.vimeo.com/video/{}", id),
                )
            }
            Provider::Twitter => (
                url.to_string(),
                format!("https://twitframe.com/show?url={}", urlencoding::encode(url)),
            ),
        };

        Ok(self.proxied(provider, &canonical).unwrap_or(direct))
    }

    /// Full iframe markup for a provider URL
    pub fn render(&self, url: &str) -> Result<String> {
        let src = self.embed_url(url)?;
        Ok(format!(
            "<iframe src=\"{}\" width=\"{}\" height=\"{}\" frameborder=\"0\" \
             allowtransparency=\"true\" allowfullscreen=\"true\" scrolling=\"no\"></iframe>",
            src.replace('"', "&quot;"),
            self.width,
            self.height
        ))
    }
}

impl Default for EmbedResolver {
    fn default() -> Self {
        Self::new(&EmbedConfig::default())
    }
}
