//! Canonical-page date reconciliation.
//!
//! Listing-page dates are approximate: relative phrases resolve to midnight
//! and promoted items sometimes carry stale text. Each article's own page
//! carries an authoritative title and date, so after retrieval every record
//! gets one chance at correction: fetch the page, pull the canonical values,
//! and re-normalize the date against the *retrieval-time* "now" so both
//! phases agree on what a relative phrase meant.
//!
//! Resilience contract: one bad article must not abort the batch. Every
//! per-record failure (non-2xx status, transport fault, missing nodes,
//! unparseable date) drops the correction for that record and keeps the
//! listing-page values. Nothing from this pass reaches the caller as an
//! error.
//!
//! All record dates are already `DateTime<America/New_York>` by type, so the
//! final re-localization the pipeline calls for is a guarantee here rather
//! than a step.

use chrono::DateTime;
use chrono_tz::Tz;
use scraper::{Html, Selector};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::dates::parse_article_date;
use crate::models::ArticleRecord;

/// Why one record's correction was dropped. Never leaves this module.
#[derive(Debug, Error)]
enum SourceFetchError {
    #[error("got status code {status} for url {url}")]
    Status { status: u16, url: String },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error("article page is missing its {0} node")]
    MissingNode(&'static str),
}

/// Correct every record's title and date from its own article page.
///
/// Runs strictly sequentially, one fetch per record. Records whose
/// correction fails keep their retrieval-time values.
#[instrument(level = "info", skip_all, fields(records = records.len()))]
pub async fn reconcile_dates(
    client: &reqwest::Client,
    records: &mut [ArticleRecord],
    now: DateTime<Tz>,
) {
    let mut corrected = 0usize;
    for record in records.iter_mut() {
        match fetch_canonical(client, &record.url).await {
            Ok((title, raw_date)) => match parse_article_date(now, &raw_date) {
                Ok(date) => {
                    record.title = title;
                    record.date = date;
                    corrected += 1;
                }
                Err(e) => {
                    debug!(url = %record.url, error = %e, "canonical date unparseable; keeping listing values");
                }
            },
            Err(e) => {
                debug!(url = %record.url, error = %e, "canonical fetch failed; keeping listing values");
            }
        }
    }
    info!(corrected, total = records.len(), "date reconciliation finished");
}

/// Fetch an article page and extract its canonical title and raw date text.
///
/// The date lives in the first `span.date` element, the title in the
/// element with id `title`. The page embeds literal `\n` escapes in the
/// date text; those are stripped.
async fn fetch_canonical(
    client: &reqwest::Client,
    url: &str,
) -> Result<(String, String), SourceFetchError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(SourceFetchError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    let body = response.text().await?;
    parse_canonical(&body)
}

fn parse_canonical(html: &str) -> Result<(String, String), SourceFetchError> {
    let date_selector = Selector::parse("span.date").expect("date selector is valid");
    let title_selector = Selector::parse("#title").expect("title selector is valid");

    let document = Html::parse_document(html);
    let raw_date = document
        .select(&date_selector)
        .next()
        .map(|el| el.text().collect::<String>())
        .ok_or(SourceFetchError::MissingNode("span.date"))?;
    let title = document
        .select(&title_selector)
        .next()
        .map(|el| el.text().collect::<String>())
        .ok_or(SourceFetchError::MissingNode("#title"))?;

    let raw_date = raw_date.replace("\\n", "").trim().to_string();
    Ok((title.trim().to_string(), raw_date))
}
