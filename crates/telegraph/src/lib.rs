//! # telegraph
//!
//! Import articles published on an external service into sanitized markup.
//!
//! The source page is reduced to its article body, every top-level block is
//! re-rendered through [`telegraph_core`], figure media is copied to local
//! storage and iframes are mapped to embeddable players. Title, author and
//! lead image are extracted along the way.
//!
//! ## Design
//!
//! Conversion of one document is a single sequential pass. The only
//! suspension points are the two outbound calls, fetching the page and
//! downloading figure media, both behind the [`Fetcher`] and [`Downloader`]
//! traits so they can be replaced. Independent documents can be converted
//! concurrently; a [`Converter`] holds no per-document state.
//!
//! ## Example
//!
//! ```rust,no_run
//! use telegraph::{Config, Converter, Source};
//!
//! # async fn run() -> telegraph::Result<()> {
//! let converter = Converter::new(&Config::default())?;
//! let article = converter.article(Source::Url("https://telegra.ph/Data-model-test-06-25".into()));
//!
//! println!("{:?}", article.title().await?);
//! println!("{}", article.render().await?);
//! # Ok(())
//! # }
//! ```

pub mod config;
mod embed;
mod fetch;
mod figure;
mod media;
mod service;
mod source;

pub use config::{Config, EmbedConfig, FetchConfig, MediaConfig, DEFAULT_PROXY_ENGINE};
pub use embed::{EmbedResolver, Provider};
pub use fetch::{FetchError, Fetched, Fetcher, HttpFetcher};
pub use figure::{iframe_target, render_figure, resolve_figure};
pub use media::{
    essence, extension_for, media_type_of, Downloader, MediaDownloader, StorageError, UploadStore,
};
pub use service::{Article, Converted, Converter, Source, ANONYMOUS, TEXT_BLOCKS};
pub use source::prepare_body;

/// Error type for article conversion
#[derive(Debug, thiserror::Error)]
pub enum TelegraphError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("Unsupported tag: {0}")]
    UnsupportedTag(String),

    #[error("Unsupported embed: {0}")]
    UnsupportedEmbed(String),

    #[error("Missing video id: {0}")]
    MissingVideoId(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, TelegraphError>;
