//! Core data structures for the scraping pipeline.
//!
//! This module defines the types that flow between the retrieval loop, the
//! reconciliation pass, and the output partitioner:
//! - [`ArticleRecord`]: one news headline with a normalized publication date
//! - [`DateWindow`]: the inclusive date range requested for one run
//! - [`LogRow`] / [`RunStatus`]: one row of the run-level summary log
//!
//! Records are owned by the in-memory result set for a single symbol's run
//! and are never shared across symbols.

use chrono::{DateTime, Duration, NaiveDate};
use chrono_tz::Tz;
use serde::{Serialize, Serializer};

/// One news headline for a symbol.
///
/// Produced by the retrieval loop with an *approximate* date (the listing
/// page mixes exact timestamps with relative phrases like "3 hours ago").
/// The reconciliation pass replaces `title` and `date` in place with the
/// canonical values from the article's own page when that page can be
/// fetched; after reconciliation the record is immutable.
#[derive(Debug, Clone, Serialize)]
pub struct ArticleRecord {
    /// The headline text.
    pub title: String,
    /// Absolute URL of the article.
    pub url: String,
    /// Publishing outlet or author attribution.
    pub publisher: String,
    /// Publication timestamp, localized to America/New_York.
    #[serde(serialize_with = "serialize_ny_timestamp")]
    pub date: DateTime<Tz>,
}

/// Serialize a New York timestamp as `YYYY-MM-DD HH:MM:SS±HHMM` for CSV.
fn serialize_ny_timestamp<S: Serializer>(
    date: &DateTime<Tz>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&date.format("%Y-%m-%d %H:%M:%S%z").to_string())
}

/// The inclusive date range requested for one run.
///
/// Normalized at construction: `start` sits at 00:00:00 and `end` at
/// 23:59:59, both New York time. Invariant: `start <= end`. Built once per
/// run from the CLI arguments and the trading calendar, immutable after.
#[derive(Debug, Clone, Copy)]
pub struct DateWindow {
    /// First instant of the window (midnight, New York).
    pub start: DateTime<Tz>,
    /// Last instant of the window (23:59:59, New York).
    pub end: DateTime<Tz>,
}

impl DateWindow {
    /// Iterate the calendar days covered by the window, inclusive on both
    /// ends. Empty when the invariant `start <= end` does not hold.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + use<> {
        let start = self.start.date_naive();
        let end = self.end.date_naive();
        std::iter::successors(Some(start).filter(|d| *d <= end), move |d| {
            let next = *d + Duration::days(1);
            (next <= end).then_some(next)
        })
    }
}

/// Outcome classification for one symbol in the run log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    #[serde(rename = "SUCCESS")]
    Success,
    #[serde(rename = "FAIL")]
    Fail,
    #[serde(rename = "SKIPPED")]
    Skipped,
}

/// One row of the run-level summary log.
///
/// Column headers match the log CSV exactly; the file is rewritten in full
/// after every append (snapshot semantics, see [`crate::outputs::log`]).
#[derive(Debug, Clone, Serialize)]
pub struct LogRow {
    /// Wall-clock time the row was recorded, `YYYY-MM-DD HH:MM:SS`.
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Symbol")]
    pub symbol: String,
    #[serde(rename = "Status")]
    pub status: RunStatus,
    /// Human-readable failure reason; empty on success or skip.
    #[serde(rename = "Error")]
    pub error: String,
    #[serde(rename = "Number of News")]
    pub num_news: usize,
    #[serde(rename = "Runtime Seconds")]
    pub runtime_secs: u64,
}
