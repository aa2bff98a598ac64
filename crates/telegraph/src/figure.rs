//! Figure resolution and rendering
//!
//! Images and videos are downloaded to local assets; iframes keep the
//! decoded third-party URL and become embeds at render time.

use once_cell::sync::Lazy;
use regex::Regex;
use telegraph_core::utilities::strip_tags;
use telegraph_core::{Figure, FigureKind};
use url::Url;

use crate::embed::EmbedResolver;
use crate::fetch::FetchError;
use crate::media::Downloader;
use crate::Result;

static MEDIA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<\s*([a-z0-9]+)[^>]*?\ssrc="?([^"\s>]+)"?"#).unwrap());
static CAPTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<figcaption[^>]*>(.*?)</figcaption>").unwrap());

/// Target of a proxied iframe source (`...?url=<encoded>`), decoded
pub fn iframe_target(src: &str) -> String {
    src.split_once("?url=")
        .and_then(|(_, encoded)| urlencoding::decode(encoded).ok())
        .map(|decoded| decoded.into_owned())
        .unwrap_or_default()
}

/// Figure caption text, empty when absent
pub fn caption(content: &str) -> String {
    CAPTION
        .captures(content)
        .map(|c| strip_tags(&c[1]))
        .unwrap_or_default()
}

/// Resolve the inner markup of a `figure` element.
///
/// Returns `None` when the figure holds no supported media tag.
pub async fn resolve_figure(
    content: &str,
    downloader: &dyn Downloader,
    base_url: &Url,
) -> Result<Option<Figure>> {
    let Some(captures) = MEDIA.captures(content) else {
        return Ok(None);
    };
    let (tag, src) = (&captures[1], &captures[2]);

    let Some(kind) = FigureKind::from_tag(tag) else {
        tracing::warn!(tag, "unsupported figure media");
        return Ok(None);
    };

    let url = match kind {
        FigureKind::Img | FigureKind::Video => {
            let remote = base_url.join(src).map_err(|e| FetchError::InvalidUrl {
                url: src.to_string(),
                reason: e.to_string(),
            })?;
            downloader.download(remote.as_str()).await?
        }
        FigureKind::Iframe => iframe_target(src),
    };

    Ok(Some(Figure {
        kind,
        url,
        caption: caption(content),
    }))
}

/// Render a resolved figure
pub fn render_figure(figure: &Figure, embeds: &EmbedResolver) -> Result<String> {
    let mut out = String::from("<figure>");

    if !figure.url.is_empty() {
        match figure.kind {
            FigureKind::Iframe => out.push_str(&embeds.render(&figure.url)?),
            FigureKind::Video => out.push_str(&format!(
                "<video src=\"{}\" controls width=\"{}\" height=\"{}\"></video>",
                figure.url,
                embeds.width(),
                embeds.height()
            )),
            FigureKind::Img => out.push_str(&format!("<img src=\"{}\" />", figure.url)),
        }
    }

    if !figure.caption.is_empty() {
        out.push_str("<figcaption>");
        out.push_str(&figure.caption);
        out.push_str("</figcaption>");
    }

    out.push_str("</figure>");
    Ok(out)
}
