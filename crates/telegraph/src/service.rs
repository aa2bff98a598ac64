//! Converter - the main entry point for importing an article.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use telegraph_core::utilities::{restore_line_breaks, strip_tags, LINE_BREAK_MARKER};
use telegraph_core::{
    assemble_list, extract_runs, render_block, render_list, Block, FigureKind, FormatMask,
    ListKind, Scanner, Unclosed,
};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;
use crate::embed::EmbedResolver;
use crate::fetch::{FetchError, Fetcher, HttpFetcher};
use crate::figure::{render_figure, resolve_figure};
use crate::media::{Downloader, MediaDownloader, UploadStore};
use crate::source::prepare_body;
use crate::{Result, TelegraphError};

/// Text blocks: source tag, output tag and the mask their runs start with
pub const TEXT_BLOCKS: &[(&str, &str, FormatMask)] = &[
    ("h1", "h1", FormatMask::empty()),
    ("h3", "h2", FormatMask::empty()),
    ("h4", "h3", FormatMask::empty()),
    ("p", "p", FormatMask::empty()),
    ("aside", "blockquote", FormatMask::empty()),
    ("blockquote", "p", FormatMask::QUOTE),
];

/// Anonymous author placeholder for handle-only bylines
pub const ANONYMOUS: &str = "Anonymous";

static LEAD_IMAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"<img src="([^"]+)" />"#).unwrap());

fn text_block(tag: &str) -> Option<(&'static str, FormatMask)> {
    TEXT_BLOCKS
        .iter()
        .find(|(source, _, _)| *source == tag)
        .map(|(_, output, mask)| (*output, *mask))
}

/// Whether the dispatch table knows `tag` as a top-level block
fn is_block_tag(tag: &str) -> bool {
    matches!(tag, "address" | "ul" | "ol" | "figure") || text_block(tag).is_some()
}

/// A top-level element without a closer: broken markup for a known block,
/// otherwise a tag the converter does not handle (`<img>`, `<video>`, ...)
fn unclosed_error(unclosed: Unclosed<'_>) -> TelegraphError {
    if is_block_tag(unclosed.name) {
        TelegraphError::MalformedDocument(unclosed.to_string())
    } else {
        TelegraphError::UnsupportedTag(unclosed.name.to_string())
    }
}

fn plain_text(markup: &str) -> String {
    strip_tags(&markup.replace(LINE_BREAK_MARKER, " "))
}

/// Author from an `address` line: text before the first `|`
fn parse_author(content: &str) -> Option<String> {
    let first = content.split('|').next().unwrap_or_default();
    let author = plain_text(first);

    if author.is_empty() {
        None
    } else if author.starts_with('@') {
        Some(ANONYMOUS.to_string())
    } else {
        Some(author)
    }
}

/// Where the source document comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// Fetch the page first
    Url(String),
    /// Full page markup already at hand
    Markup(String),
}

/// Output of one conversion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Converted {
    pub content: String,
    pub title: Option<String>,
    pub author: Option<String>,
    pub image: Option<String>,
}

/// The service turning source pages into sanitized article markup
pub struct Converter {
    fetcher: Arc<dyn Fetcher>,
    downloader: Arc<dyn Downloader>,
    embeds: EmbedResolver,
    base_url: Url,
}

impl Converter {
    /// Create a Converter using HTTP fetching and the configured upload store
    pub fn new(config: &Config) -> Result<Self> {
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(&config.fetch)?);
        let downloader = Arc::new(MediaDownloader::new(
            fetcher.clone(),
            UploadStore::from_config(&config.media),
        ));
        Self::with_collaborators(config, fetcher, downloader)
    }

    /// Create a Converter with custom fetch and download capabilities
    pub fn with_collaborators(
        config: &Config,
        fetcher: Arc<dyn Fetcher>,
        downloader: Arc<dyn Downloader>,
    ) -> Result<Self> {
        let base_url = Url::parse(&config.media.base_url).map_err(|e| FetchError::InvalidUrl {
            url: config.media.base_url.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            fetcher,
            downloader,
            embeds: EmbedResolver::new(&config.embed),
            base_url,
        })
    }

    /// A lazily converted article
    pub fn article(&self, source: Source) -> Article<'_> {
        Article {
            converter: self,
            source,
            converted: OnceCell::new(),
        }
    }

    /// Convert one source document
    #[tracing::instrument(skip_all)]
    pub async fn convert(&self, source: &Source) -> Result<Converted> {
        let page = match source {
            Source::Url(url) => {
                info!(url = %url, "fetching article");
                self.fetcher.fetch_text(url).await?
            }
            Source::Markup(markup) => markup.clone(),
        };

        let body = prepare_body(&page)?;
        self.convert_body(&body).await
    }

    /// Convert an already prepared article body.
    ///
    /// Media downloaded before a failure is discarded again.
    pub async fn convert_body(&self, body: &str) -> Result<Converted> {
        let mut downloaded = Vec::new();

        match self.assemble(body, &mut downloaded).await {
            Ok(converted) => Ok(converted),
            Err(err) => {
                self.discard(&downloaded).await;
                Err(err)
            }
        }
    }

    async fn discard(&self, references: &[String]) {
        for reference in references {
            if let Err(e) = self.downloader.discard(reference).await {
                warn!(reference = %reference, error = %e, "failed to discard asset");
            }
        }
    }

    async fn assemble(&self, body: &str, downloaded: &mut Vec<String>) -> Result<Converted> {
        let mut content = String::with_capacity(body.len());
        let mut title = None;
        let mut author = None;
        let mut blocks = 0usize;

        for element in Scanner::new(body) {
            let element = element.map_err(unclosed_error)?;
            debug!(tag = element.name, len = element.content.len(), "block");
            blocks += 1;

            match element.name {
                "address" => {
                    if author.is_none() {
                        author = parse_author(element.content);
                    }
                }
                "ul" | "ol" => {
                    let kind = ListKind::from_tag(element.name).unwrap_or(ListKind::Unordered);
                    let list = assemble_list(body, element.content_span.clone(), kind)
                        .map_err(|u| TelegraphError::MalformedDocument(u.to_string()))?;
                    content.push_str(&render_list(&list));
                }
                "figure" => {
                    let resolved =
                        resolve_figure(element.content, self.downloader.as_ref(), &self.base_url)
                            .await?;
                    match resolved {
                        Some(figure) => {
                            if figure.kind != FigureKind::Iframe && !figure.url.is_empty() {
                                downloaded.push(figure.url.clone());
                            }
                            content.push_str(&render_figure(&figure, &self.embeds)?);
                        }
                        None => warn!("dropping figure without supported media"),
                    }
                }
                tag => {
                    let (output, initial) = text_block(tag)
                        .ok_or_else(|| TelegraphError::UnsupportedTag(tag.to_string()))?;

                    if tag == "h1" && title.is_none() {
                        title = Some(plain_text(element.content)).filter(|t| !t.is_empty());
                    }

                    let block = Block::new(output, extract_runs(element.content, initial));
                    content.push_str(&render_block(&block));
                }
            }
        }

        let content = restore_line_breaks(&content);
        let image = LEAD_IMAGE
            .captures(&content)
            .map(|c| c[1].to_string());

        info!(blocks, title = ?title, "article converted");
        Ok(Converted {
            content,
            title,
            author,
            image,
        })
    }
}

/// One source document, converted on first access.
///
/// The markup and every metadata accessor share a single conversion.
pub struct Article<'a> {
    converter: &'a Converter,
    source: Source,
    converted: OnceCell<Converted>,
}

impl Article<'_> {
    pub fn source(&self) -> &Source {
        &self.source
    }

    /// The full conversion result
    pub async fn converted(&self) -> Result<&Converted> {
        self.converted
            .get_or_try_init(|| self.converter.convert(&self.source))
            .await
    }

    /// Rendered article markup
    pub async fn render(&self) -> Result<&str> {
        Ok(&self.converted().await?.content)
    }

    /// Plain-text title from the first `h1`
    pub async fn title(&self) -> Result<Option<&str>> {
        Ok(self.converted().await?.title.as_deref())
    }

    /// Author from the byline
    pub async fn author(&self) -> Result<Option<&str>> {
        Ok(self.converted().await?.author.as_deref())
    }

    /// Source of the first image in the rendered markup
    pub async fn lead_image(&self) -> Result<Option<&str>> {
        Ok(self.converted().await?.image.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::Fetched;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MapFetcher {
        pages: HashMap<String, String>,
        calls: AtomicUsize,
    }

    impl MapFetcher {
        fn with_page(url: &str, page: &str) -> Self {
            let mut pages = HashMap::new();
            pages.insert(url.to_string(), page.to_string());
            Self {
                pages,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Fetcher for MapFetcher {
        async fn fetch_text(&self, url: &str) -> std::result::Result<String, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.pages.get(url).cloned().ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
        }

        async fn fetch_bytes(&self, url: &str) -> std::result::Result<Fetched, FetchError> {
            Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
        }
    }

    #[derive(Default)]
    struct CountingDownloader {
        urls: Mutex<Vec<String>>,
        discarded: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Downloader for CountingDownloader {
        async fn download(&self, url: &str) -> Result<String> {
            let mut urls = self.urls.lock().unwrap();
            urls.push(url.to_string());
            Ok(format!("/file/{:048x}.jpg", urls.len()))
        }

        async fn discard(&self, reference: &str) -> Result<()> {
            self.discarded.lock().unwrap().push(reference.to_string());
            Ok(())
        }
    }

    /// Serves the same PNG bytes for every media URL
    struct PixelFetcher;

    #[async_trait]
    impl Fetcher for PixelFetcher {
        async fn fetch_text(&self, url: &str) -> std::result::Result<String, FetchError> {
            Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
        }

        async fn fetch_bytes(&self, _url: &str) -> std::result::Result<Fetched, FetchError> {
            Ok(Fetched {
                body: b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR".to_vec(),
                content_type: None,
            })
        }
    }

    fn converter_with(config: &Config, fetcher: MapFetcher) -> Converter {
        Converter::with_collaborators(
            config,
            Arc::new(fetcher),
            Arc::new(CountingDownloader::default()),
        )
        .unwrap()
    }

    fn converter() -> Converter {
        converter_with(&Config::default(), MapFetcher::default())
    }

    fn page(body: &str) -> String {
        format!(
            "<!DOCTYPE html><html><body><div class=\"tl_page\"><article id=\"_tl_editor\" class=\"tl_article_content\">{}</article></div></body></html>",
            body
        )
    }

    #[tokio::test]
    async fn test_simple_paragraph() {
        let out = converter()
            .convert_body("<p>Hello <b>World</b></p>")
            .await
            .unwrap();
        assert_eq!(out.content, "<p>Hello <b>World</b></p>");
    }

    #[tokio::test]
    async fn test_nested_formatting() {
        let out = converter()
            .convert_body("<p><b>A<i>B</i></b></p>")
            .await
            .unwrap();
        assert_eq!(out.content, "<p><b>A</b><b><i>B</i></b></p>");
    }

    #[tokio::test]
    async fn test_list() {
        let out = converter()
            .convert_body("<ul><li>One</li><li>Two</li></ul><ol><li>Three</li></ol>")
            .await
            .unwrap();
        assert_eq!(
            out.content,
            "<ul><li>One</li><li>Two</li></ul><ol><li>Three</li></ol>"
        );
    }

    #[tokio::test]
    async fn test_youtube_figure() {
        let out = converter()
            .convert_body(
                "<figure><iframe src=\"/embed/youtube?url=https%3A%2F%2Fwww.youtube.com%2Fwatch%3Fv%3Dabc\"></iframe></figure>",
            )
            .await
            .unwrap();
        assert!(out
            .content
            .starts_with("<figure><iframe src=\"https://www.youtube.com/embed/abc\""));
    }

    #[tokio::test]
    async fn test_youtube_figure_through_proxy() {
        let config = Config::default().with_proxy_embeds();
        let out = converter_with(&config, MapFetcher::default())
            .convert_body(
                "<figure><iframe src=\"/embed/youtube?url=https%3A%2F%2Fwww.youtube.com%2Fwatch%3Fv%3Dabc\"></iframe></figure>",
            )
            .await
            .unwrap();
        assert!(out.content.contains(
            "src=\"https://telegra.ph/embed/youtube?url=https%3A%2F%2Fwww.youtube.com%2Fwatch%3Fv%3Dabc\""
        ));
    }

    #[tokio::test]
    async fn test_anonymous_author_not_rendered() {
        let out = converter()
            .convert_body("<address>@handle | Extra</address><p>x</p>")
            .await
            .unwrap();
        assert_eq!(out.author.as_deref(), Some(ANONYMOUS));
        assert_eq!(out.content, "<p>x</p>");
    }

    #[tokio::test]
    async fn test_named_author() {
        let out = converter()
            .convert_body("<address><a rel=\"author\">Jane Roe</a> | June 25, 2021</address>")
            .await
            .unwrap();
        assert_eq!(out.author.as_deref(), Some("Jane Roe"));
        assert_eq!(out.content, "");
    }

    #[tokio::test]
    async fn test_title_is_first_heading_as_text() {
        let out = converter()
            .convert_body("<h1>Data <i>model</i>  test</h1><h1>Second</h1>")
            .await
            .unwrap();
        assert_eq!(out.title.as_deref(), Some("Data model test"));
        assert_eq!(
            out.content,
            "<h1>Data <i>model</i>  test</h1><h1>Second</h1>"
        );
    }

    #[tokio::test]
    async fn test_block_normalisation() {
        let out = converter()
            .convert_body(
                "<h3>Section</h3><h4>Sub</h4><aside>Aside</aside><blockquote>Said <b>so</b></blockquote>",
            )
            .await
            .unwrap();
        assert_eq!(
            out.content,
            "<h2>Section</h2><h3>Sub</h3><blockquote>Aside</blockquote><p><q>Said </q><q><b>so</b></q></p>"
        );
    }

    #[tokio::test]
    async fn test_unsupported_tag_aborts() {
        let err = converter()
            .convert_body("<p>ok</p><table><tr><td>x</td></tr></table>")
            .await
            .unwrap_err();
        assert!(matches!(err, TelegraphError::UnsupportedTag(ref t) if t == "table"));
    }

    #[tokio::test]
    async fn test_unsupported_embed_aborts() {
        let err = converter()
            .convert_body(
                "<p>ok</p><figure><iframe src=\"/embed/x?url=https%3A%2F%2Fexample.com%2Fv\"></iframe></figure>",
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TelegraphError::UnsupportedEmbed(_)));
    }

    #[tokio::test]
    async fn test_line_breaks_restored() {
        let body = format!("<p>one{}two</p>", LINE_BREAK_MARKER);
        let out = converter().convert_body(&body).await.unwrap();
        assert_eq!(out.content, "<p>one<br />two</p>");
    }

    #[tokio::test]
    async fn test_lead_image_from_first_figure() {
        let downloader = Arc::new(CountingDownloader::default());
        let converter = Converter::with_collaborators(
            &Config::default(),
            Arc::new(MapFetcher::default()),
            downloader.clone(),
        )
        .unwrap();

        let out = converter
            .convert_body(
                "<figure><img src=\"/file/a.jpg\"><figcaption>A</figcaption></figure><figure><img src=\"/file/b.jpg\"></figure>",
            )
            .await
            .unwrap();

        assert_eq!(
            *downloader.urls.lock().unwrap(),
            vec![
                "https://telegra.ph/file/a.jpg".to_string(),
                "https://telegra.ph/file/b.jpg".to_string(),
            ]
        );
        assert_eq!(out.image, Some(format!("/file/{:048x}.jpg", 1)));
        assert!(downloader.discarded.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_void_top_level_element_aborts() {
        let err = converter()
            .convert_body("<p>a</p><img src=\"x\"><p>b</p>")
            .await
            .unwrap_err();
        assert!(matches!(err, TelegraphError::UnsupportedTag(ref t) if t == "img"));
    }

    #[tokio::test]
    async fn test_unclosed_block_is_malformed() {
        for body in ["<p>a</p><p>b", "<h3>Head", "<ul><li>a</ul>"] {
            let err = converter().convert_body(body).await.unwrap_err();
            assert!(
                matches!(err, TelegraphError::MalformedDocument(_)),
                "{body}: {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_failed_conversion_discards_downloads() {
        let downloader = Arc::new(CountingDownloader::default());
        let converter = Converter::with_collaborators(
            &Config::default(),
            Arc::new(MapFetcher::default()),
            downloader.clone(),
        )
        .unwrap();

        let err = converter
            .convert_body(
                "<figure><img src=\"/file/a.png\"></figure><figure><iframe src=\"/embed/youtube?url=https%3A%2F%2Fwww.youtube.com%2Fwatch%3Fv%3Dabc\"></iframe></figure><table></table>",
            )
            .await
            .unwrap_err();

        assert!(matches!(err, TelegraphError::UnsupportedTag(_)));
        assert_eq!(
            *downloader.discarded.lock().unwrap(),
            vec![format!("/file/{:048x}.jpg", 1)]
        );
    }

    #[tokio::test]
    async fn test_failed_conversion_removes_its_downloads() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.media.upload_dir = dir.path().to_path_buf();

        let fetcher: Arc<dyn Fetcher> = Arc::new(PixelFetcher);
        let downloader = Arc::new(MediaDownloader::new(
            fetcher.clone(),
            UploadStore::from_config(&config.media),
        ));
        let converter = Converter::with_collaborators(&config, fetcher, downloader).unwrap();

        let ok = converter
            .convert_body("<figure><img src=\"/file/a\"></figure>")
            .await
            .unwrap();
        assert!(ok.image.unwrap().ends_with(".png"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        let err = converter
            .convert_body("<figure><img src=\"/file/b\"></figure><p>x</p><table></table>")
            .await
            .unwrap_err();
        assert!(matches!(err, TelegraphError::UnsupportedTag(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_convert_full_page_markup() {
        let markup = page(
            "<h1>Title<br></h1><address><a rel=\"author\">Writer</a></address>\n<p>Body <b>bold</b> <a href=\"/local\">x</a><br>line</p><hr><p><br></p>",
        );
        let out = converter()
            .convert(&Source::Markup(markup))
            .await
            .unwrap();

        assert_eq!(out.title.as_deref(), Some("Title"));
        assert_eq!(out.author.as_deref(), Some("Writer"));
        assert_eq!(out.content, "<h1>Title</h1><p>Body <b>bold</b> <br />line</p>");
        assert_eq!(out.image, None);
    }

    #[tokio::test]
    async fn test_malformed_page() {
        let err = converter()
            .convert(&Source::Markup("<html></html>".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, TelegraphError::MalformedDocument(_)));
    }

    #[tokio::test]
    async fn test_fetch_error_propagates() {
        let err = converter()
            .convert(&Source::Url("https://telegra.ph/missing".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, TelegraphError::Fetch(FetchError::Status { status: 404, .. })));
    }

    #[tokio::test]
    async fn test_article_converts_once() {
        let url = "https://telegra.ph/Data-model-test-06-25";
        let fetcher = Arc::new(MapFetcher::with_page(
            url,
            &page("<h1>T</h1><address>Ann</address><p>x</p>"),
        ));
        let converter = Converter::with_collaborators(
            &Config::default(),
            fetcher.clone(),
            Arc::new(CountingDownloader::default()),
        )
        .unwrap();

        let article = converter.article(Source::Url(url.to_string()));
        assert_eq!(article.title().await.unwrap(), Some("T"));
        assert_eq!(article.title().await.unwrap(), Some("T"));
        assert_eq!(article.author().await.unwrap(), Some("Ann"));
        assert_eq!(article.lead_image().await.unwrap(), None);
        assert_eq!(article.render().await.unwrap(), "<h1>T</h1><p>x</p>");

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_convert_url_end_to_end() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Post-01-01"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page(
                "<h1>Post</h1><figure><img src=\"/file/pic.png\"><figcaption>Pic</figcaption></figure><p>Text</p>",
            )))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/file/pic.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(vec![1, 2, 3]),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.media.base_url = format!("{}/", server.uri());
        config.media.upload_dir = dir.path().to_path_buf();

        let converter = Converter::new(&config).unwrap();
        let out = converter
            .convert(&Source::Url(format!("{}/Post-01-01", server.uri())))
            .await
            .unwrap();

        let image = out.image.clone().unwrap();
        assert!(image.starts_with("/file/"));
        assert!(image.ends_with(".png"));
        assert_eq!(
            out.content,
            format!(
                "<h1>Post</h1><figure><img src=\"{}\" /><figcaption>Pic</figcaption></figure><p>Text</p>",
                image
            )
        );

        let stored = UploadStore::from_config(&config.media)
            .path_for(&image)
            .unwrap();
        assert_eq!(std::fs::read(stored).unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_invalid_base_url() {
        let mut config = Config::default();
        config.media.base_url = "not a url".to_string();
        let result = Converter::with_collaborators(
            &config,
            Arc::new(MapFetcher::default()),
            Arc::new(CountingDownloader::default()),
        );
        assert!(matches!(
            result,
            Err(TelegraphError::Fetch(FetchError::InvalidUrl { .. }))
        ));
    }
}
