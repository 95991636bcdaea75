//! Remote dictionary lookup over HTTP, scraping a definition page.

use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use reqwest::{Client, StatusCode, Url};
use tracing::debug;

use super::{LookupError, LookupResult, RemoteLookup};

/// Placeholder replaced by the phrase inside [`HttpLookup`] URL templates.
pub const PHRASE_PLACEHOLDER: &str = "{phrase}";
const DEFAULT_URL_TEMPLATE: &str = "http://tratu.soha.vn/dict/vn_vn/{phrase}";
const DEFAULT_MARKERS: [&str; 3] = ["Kết quả", "Từ điển", "Định nghĩa"];
/// Visible text longer than this is assumed to be a definition.
const MIN_DEFINITION_TEXT: usize = 200;

/// Looks phrases up on a dictionary website and accepts any page that looks
/// like it carries a definition.
#[derive(Clone)]
pub struct HttpLookup {
    client: Client,
    url_template: Arc<str>,
    markers: Arc<[String]>,
}

impl HttpLookup {
    /// Build a lookup against `url_template`, which must contain `{phrase}`.
    pub fn new(url_template: impl Into<String>, request_timeout: Duration) -> LookupResult<Self> {
        let url_template = url_template.into();
        if !url_template.contains(PHRASE_PLACEHOLDER) {
            return Err(LookupError::InvalidUrl { url: url_template });
        }

        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|source| LookupError::ClientBuilder { source })?;

        Ok(Self {
            client,
            url_template: Arc::from(url_template),
            markers: DEFAULT_MARKERS.iter().map(|m| m.to_string()).collect(),
        })
    }

    /// Build a lookup from `LOOKUP_URL_TEMPLATE`, defaulting to the Vietnamese dictionary.
    pub fn from_env(request_timeout: Duration) -> LookupResult<Self> {
        let template = std::env::var("LOOKUP_URL_TEMPLATE")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_URL_TEMPLATE.to_string());
        Self::new(template, request_timeout)
    }

    fn url_for(&self, phrase: &str) -> LookupResult<Url> {
        let raw = self.url_template.replace(PHRASE_PLACEHOLDER, phrase);
        Url::parse(&raw).map_err(|_| LookupError::InvalidUrl { url: raw })
    }
}

/// Decide whether a response body looks like a definition page.
///
/// The page must carry a content block (an `h2`, or a `div` whose id mentions
/// `content`). Its visible text then has to contain a marker or be long.
pub fn looks_like_definition(body: &str, markers: &[String]) -> bool {
    if !has_content_block(body) {
        return false;
    }
    let text = visible_text(body);
    markers.iter().any(|marker| text.contains(marker.as_str()))
        || text.chars().count() > MIN_DEFINITION_TEXT
}

fn has_content_block(body: &str) -> bool {
    let lower = body.to_lowercase();
    if lower.contains("<h2") {
        return true;
    }
    lower.match_indices("<div").any(|(start, _)| {
        let tag = &lower[start..];
        let tag = &tag[..tag.find('>').unwrap_or(tag.len())];
        tag.split_whitespace()
            .filter_map(|attr| attr.strip_prefix("id="))
            .any(|id| id.contains("content"))
    })
}

/// Text outside of tags, with `script`/`style` bodies dropped and
/// whitespace collapsed.
fn visible_text(body: &str) -> String {
    let mut text = String::with_capacity(body.len());
    let mut rest = body;
    while let Some(open) = rest.find('<') {
        text.push_str(&rest[..open]);
        text.push(' ');
        let after = &rest[open..];
        let Some(close) = after.find('>') else {
            rest = "";
            break;
        };
        let tag = after[1..close].trim_start().to_lowercase();
        rest = &after[close + 1..];
        for hidden in ["script", "style"] {
            if tag.starts_with(hidden) {
                let end_tag = format!("</{hidden}");
                rest = match find_ignore_ascii_case(rest, &end_tag) {
                    Some(end) => &rest[end..],
                    None => "",
                };
            }
        }
    }
    text.push_str(rest);
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn find_ignore_ascii_case(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle.as_bytes()))
}

impl RemoteLookup for HttpLookup {
    fn lookup(&self, phrase: &str) -> BoxFuture<'static, LookupResult<bool>> {
        let lookup = self.clone();
        let phrase = phrase.to_string();
        Box::pin(async move {
            let url = lookup.url_for(&phrase)?;
            let url_text = url.to_string();

            let response = lookup.client.get(url).send().await.map_err(|source| {
                if source.is_timeout() {
                    LookupError::Timeout
                } else {
                    LookupError::Request {
                        url: url_text.clone(),
                        source,
                    }
                }
            })?;

            if response.status() != StatusCode::OK {
                debug!(%phrase, status = %response.status(), "lookup returned non-200");
                return Ok(false);
            }

            let body = response
                .text()
                .await
                .map_err(|source| LookupError::Request {
                    url: url_text,
                    source,
                })?;

            Ok(looks_like_definition(&body, &lookup.markers))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markers() -> Vec<String> {
        DEFAULT_MARKERS.iter().map(|m| m.to_string()).collect()
    }

    #[test]
    fn template_without_placeholder_is_rejected() {
        let err = HttpLookup::new("http://example.com/dict", Duration::from_secs(1)).err();
        assert!(matches!(err, Some(LookupError::InvalidUrl { .. })));
    }

    #[test]
    fn phrase_is_substituted_and_encoded() {
        let lookup =
            HttpLookup::new("http://example.com/dict/{phrase}", Duration::from_secs(1)).unwrap();
        let url = lookup.url_for("con mèo").unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
        assert!(url.path().starts_with("/dict/con%20m"));
    }

    #[test]
    fn marker_inside_content_block_counts_as_definition() {
        assert!(looks_like_definition(
            "<html><body><h2>Kết quả</h2><p>con mèo: động vật</p></body></html>",
            &markers()
        ));
        let long = format!(
            "<div id=\"content-main\"><p>{}</p></div>",
            "định nghĩa dài ".repeat(20)
        );
        assert!(looks_like_definition(&long, &markers()));
    }

    #[test]
    fn not_found_page_is_rejected_despite_long_markup() {
        let page = format!(
            "<html><head><title>Tra từ</title><style>{}</style>\
             <script>var x = \"Kết quả\";</script></head>\
             <body><div class=\"wrap\"><p>Không tìm thấy</p></div></body></html>",
            ".a{color:red} ".repeat(20)
        );
        assert!(page.chars().count() > 300);
        assert!(!looks_like_definition(&page, &markers()));
    }

    #[test]
    fn markup_does_not_count_towards_text_length() {
        let body = format!("<h2></h2>{}", "<span class=\"x\"></span>".repeat(30));
        assert!(!looks_like_definition(&body, &markers()));
        assert_eq!(visible_text("<p>con <b>mèo</b></p>"), "con mèo");
    }
}
