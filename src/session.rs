//! Page-session abstraction over the news listing page.
//!
//! The retrieval loop only needs four capabilities from whatever renders the
//! listing page: load it, ask it to reveal more articles, best-effort dismiss
//! interstitial overlays, and snapshot the currently visible article
//! elements. [`PageSession`] captures exactly that, so the loop can be
//! driven by the production HTTP backend or by a scripted fake in tests.
//!
//! [`BenzingaSession`] is the production backend: a `reqwest` + `scraper`
//! implementation that parses the `#stories-headlines` container and maps
//! the "load more" affordance onto fetching the next page of the headline
//! list. Overlay dismissal is a contractual no-op here, since there is
//! nothing to dismiss without a rendered DOM, but it stays on the trait
//! because the
//! interaction is an optional, failure-tolerant pre-step wherever a real
//! browser backend is plugged in.

use scraper::{Html, Selector};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, instrument, trace};
use url::Url;

use crate::errors::SessionError;

/// How often the load path re-fetches while waiting for the article-list
/// container to appear.
const PAGE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// One article element as it appears on the listing page, before any
/// normalization.
///
/// Named fields (`author`, `date_text`) are preferred; when the page omits
/// them the positional `spans` fallback applies: publisher from the first
/// span, date from the second.
#[derive(Debug, Clone, Default)]
pub struct RawArticle {
    /// Anchor text of the article link.
    pub headline: String,
    /// Absolute article URL.
    pub url: String,
    /// Text of the element carrying the `author` class, if present.
    pub author: Option<String>,
    /// Text of the element carrying the `date` class, if present.
    pub date_text: Option<String>,
    /// Text of every `span` in the element, in document order.
    pub spans: Vec<String>,
}

impl RawArticle {
    /// Publisher attribution: the named field, else the first span.
    pub fn publisher(&self) -> Option<&str> {
        self.author
            .as_deref()
            .or_else(|| self.spans.first().map(String::as_str))
    }

    /// Raw date text: the named field, else the second span.
    pub fn raw_date(&self) -> Option<&str> {
        self.date_text
            .as_deref()
            .or_else(|| self.spans.get(1).map(String::as_str))
    }
}

/// Capability interface the retrieval loop drives the listing page through.
pub trait PageSession {
    /// Load the listing page and wait up to `timeout` for the article-list
    /// container to appear.
    async fn load(&mut self, url: &str, timeout: Duration) -> Result<(), SessionError>;

    /// Attempt to reveal additional articles. The caller judges success by
    /// whether [`visible_articles`](Self::visible_articles) grew, not by
    /// this method's result.
    async fn request_more(&mut self) -> Result<(), SessionError>;

    /// Best-effort dismissal of interstitial overlays. Never fails the run.
    async fn dismiss_overlays(&mut self);

    /// Snapshot of every article element currently visible, in page order.
    fn visible_articles(&self) -> &[RawArticle];
}

/// HTTP-backed session for Benzinga's per-stock news pages.
///
/// Created lazily on the first non-skipped symbol and reused for the rest
/// of the run.
#[derive(Debug)]
pub struct BenzingaSession {
    client: reqwest::Client,
    /// URL of the currently loaded listing page.
    page_url: Option<Url>,
    /// Next headline-list page the load-more path will request.
    next_page: u32,
    visible: Vec<RawArticle>,
}

impl BenzingaSession {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            page_url: None,
            next_page: 2,
            visible: Vec::new(),
        }
    }

    async fn fetch_page_text(&self, url: &Url) -> Result<String, SessionError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| SessionError::Other(e.to_string()))?;
        response
            .text()
            .await
            .map_err(|e| SessionError::Other(e.to_string()))
    }

    /// Re-fetch the page until the article-list container shows up. The
    /// caller bounds this with a timeout; transport errors abort early.
    async fn poll_for_article_list(&mut self, url: &Url) -> Result<Vec<RawArticle>, SessionError> {
        loop {
            let body = self.fetch_page_text(url).await?;
            if let Some(articles) = parse_listing(&body, url) {
                return Ok(articles);
            }
            trace!(%url, "article-list container not present yet");
            sleep(PAGE_POLL_INTERVAL).await;
        }
    }
}

impl PageSession for BenzingaSession {
    #[instrument(level = "debug", skip(self))]
    async fn load(&mut self, url: &str, timeout: Duration) -> Result<(), SessionError> {
        let url = Url::parse(url).map_err(|e| SessionError::Other(e.to_string()))?;
        let articles = tokio::time::timeout(timeout, self.poll_for_article_list(&url))
            .await
            .map_err(|_| SessionError::Timeout)??;
        debug!(count = articles.len(), "loaded article list");
        self.visible = articles;
        self.page_url = Some(url);
        self.next_page = 2;
        Ok(())
    }

    #[instrument(level = "debug", skip(self))]
    async fn request_more(&mut self) -> Result<(), SessionError> {
        let Some(base) = self.page_url.clone() else {
            return Err(SessionError::Other("no page loaded".into()));
        };
        let mut url = base;
        url.query_pairs_mut()
            .clear()
            .append_pair("page", &self.next_page.to_string());

        let body = self.fetch_page_text(&url).await?;
        let Some(articles) = parse_listing(&body, &url) else {
            // No container on the overflow page: nothing more to reveal.
            return Ok(());
        };
        if !articles.is_empty() {
            debug!(page = self.next_page, added = articles.len(), "extended article list");
            self.visible.extend(articles);
            self.next_page += 1;
        }
        Ok(())
    }

    async fn dismiss_overlays(&mut self) {
        // Nothing rendered, nothing to dismiss.
    }

    fn visible_articles(&self) -> &[RawArticle] {
        &self.visible
    }
}

/// Parse the listing markup into raw article elements.
///
/// Returns `None` when the `#stories-headlines` container is absent (page
/// still rendering or an interstitial), `Some(vec)` otherwise, possibly
/// empty, which the retrieval loop treats as a page with no articles.
fn parse_listing(html: &str, base: &Url) -> Option<Vec<RawArticle>> {
    let container_selector =
        Selector::parse("#stories-headlines").expect("container selector is valid");
    let item_selector = Selector::parse("ul li").expect("item selector is valid");
    let anchor_selector = Selector::parse("a").expect("anchor selector is valid");
    let author_selector = Selector::parse(".author").expect("author selector is valid");
    let date_selector = Selector::parse(".date").expect("date selector is valid");
    let span_selector = Selector::parse("span").expect("span selector is valid");

    let document = Html::parse_document(html);
    let container = document.select(&container_selector).next()?;

    let mut articles = Vec::new();
    for item in container.select(&item_selector) {
        let mut raw = RawArticle::default();
        if let Some(anchor) = item.select(&anchor_selector).next() {
            raw.headline = anchor.text().collect::<Vec<_>>().join(" ").trim().to_string();
            if let Some(href) = anchor.value().attr("href") {
                if let Ok(resolved) = base.join(href) {
                    raw.url = resolved.to_string();
                }
            }
        }
        raw.author = item
            .select(&author_selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string());
        raw.date_text = item
            .select(&date_selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string());
        raw.spans = item
            .select(&span_selector)
            .map(|el| el.text().collect::<String>().trim().to_string())
            .collect();
        articles.push(raw);
    }
    Some(articles)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body>
        <div id="stories-headlines"><ul>
          <li>
            <a href="/news/24/03/001/upgrade">Analyst upgrades shares</a>
            <span class="author">Newsdesk</span>
            <span class="date">3 hours ago</span>
          </li>
          <li>
            <a href="https://example.com/news/2">Second story</a>
            <span>Wire Service</span>
            <span>a day ago</span>
          </li>
        </ul></div>
        </body></html>
    "#;

    #[test]
    fn test_parse_listing_named_fields() {
        let base = Url::parse("https://benzinga.com/stock/aapl").unwrap();
        let articles = parse_listing(LISTING, &base).unwrap();
        assert_eq!(articles.len(), 2);

        let first = &articles[0];
        assert_eq!(first.headline, "Analyst upgrades shares");
        assert_eq!(first.url, "https://benzinga.com/news/24/03/001/upgrade");
        assert_eq!(first.publisher(), Some("Newsdesk"));
        assert_eq!(first.raw_date(), Some("3 hours ago"));
    }

    #[test]
    fn test_parse_listing_positional_fallbacks() {
        let base = Url::parse("https://benzinga.com/stock/aapl").unwrap();
        let articles = parse_listing(LISTING, &base).unwrap();

        let second = &articles[1];
        assert_eq!(second.publisher(), Some("Wire Service"));
        assert_eq!(second.raw_date(), Some("a day ago"));
    }

    #[test]
    fn test_parse_listing_without_container() {
        let base = Url::parse("https://benzinga.com/stock/aapl").unwrap();
        assert!(parse_listing("<html><body>loading…</body></html>", &base).is_none());
    }

    #[test]
    fn test_parse_listing_empty_container() {
        let base = Url::parse("https://benzinga.com/stock/aapl").unwrap();
        let articles = parse_listing(
            r#"<div id="stories-headlines"><ul></ul></div>"#,
            &base,
        )
        .unwrap();
        assert!(articles.is_empty());
    }
}
