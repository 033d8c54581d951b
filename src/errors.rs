//! Error types for the scraping pipeline.
//!
//! The per-symbol retrieval phase reports every failure as a [`ScrapeError`];
//! its `Display` text is exactly what lands in the symbol's error marker file
//! and in the run log's `Error` column, so the variants carry enough context
//! (URL, symbol, attempt budget) to make those messages useful on their own.
//!
//! Per-article reconciliation failures are deliberately *not* here: they are
//! recovered record-by-record inside [`crate::reconcile`] and never reach the
//! caller.

use thiserror::Error;

/// A terminal failure while retrieving one symbol's news.
///
/// Exactly one of these is produced per failed symbol. None of them abort the
/// multi-symbol run; the driver records the message and moves on.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The news page did not expose its article list within the load timeout.
    #[error("request to news page {url} timed out")]
    PageLoadTimeout { url: String },

    /// The news page failed to load for a reason other than a timeout.
    #[error("request to news page {url} received unknown error: {reason}")]
    PageLoadFailed { url: String, reason: String },

    /// The page loaded but its article list was empty.
    #[error("page for stock {symbol} - {url} does not contain any articles")]
    NoArticlesFound { symbol: String, url: String },

    /// The load-more interaction never grew the article list within the
    /// attempt budget.
    #[error("maximum retries for the load-more-news interaction exceeded")]
    MaxRetriesExceeded,

    /// A revealed article element could not be turned into a record.
    ///
    /// This aborts the whole retrieval and discards partial results; a
    /// malformed element means the page structure can no longer be trusted.
    #[error("article extraction failed: {0}")]
    Extraction(String),
}

/// Failures surfaced by a [`crate::session::PageSession`] backend.
///
/// `Timeout` is kept distinct so the retrieval loop can report a page-load
/// timeout differently from an unknown transport or parse failure.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The article-list container never appeared within the allotted wait.
    #[error("timed out waiting for the article list")]
    Timeout,

    /// Anything else: transport failure, unexpected markup, bad URL.
    #[error("{0}")]
    Other(String),
}

/// A raw date string that none of the normalizer's four rules could handle.
#[derive(Debug, Error)]
#[error("unparseable article date string {raw:?}")]
pub struct DateParseError {
    pub raw: String,
}

/// Trading-calendar lookup failures.
#[derive(Debug, Error)]
pub enum CalendarError {
    /// No trading day exists strictly before the requested date within the
    /// covered schedule range.
    #[error("no trading day found before {0} in the covered schedule")]
    NotFound(chrono::NaiveDate),
}
