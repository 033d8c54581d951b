//! Paginated retrieval loop for one symbol's news listing.
//!
//! A small state machine per symbol: load the page, repeatedly expand the
//! article list through the load-more affordance under a bounded
//! exponential-backoff retry policy, and extract records until the window's
//! minimum date is crossed.
//!
//! Two dating rules shape extraction. Articles arrive newest-first, so the
//! first one older than the window's start ends the whole retrieval
//! (stopping rule). Articles dated *past* the window's end plus a one-day
//! grace are pinned or promoted items out of order; those are skipped
//! without stopping the scan.
//!
//! Failure is all-or-nothing: any terminal error discards partial results.
//! An empty result set from a page that loaded fine is a success, not an
//! error.

use chrono::{DateTime, Duration as ChronoDuration};
use chrono_tz::Tz;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use crate::dates::parse_article_date;
use crate::errors::{ScrapeError, SessionError};
use crate::models::{ArticleRecord, DateWindow};
use crate::session::{PageSession, RawArticle};

/// How long the initial page load may take before it counts as a timeout.
pub const INITIAL_PAGE_LOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Settle delay between the initial load and the first expansion attempt;
/// the listing hydrates a beat after the container appears.
const SETTLE_DELAY: Duration = Duration::from_secs(5);

/// Bounded retry policy for the load-more interaction.
///
/// An attempt is the pure "did the visible article count grow" check; the
/// side actions around it (requesting more, dismissing overlays) are
/// failure-tolerant pre-steps and do not consume the budget on their own.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts before the retrieval fails with `MaxRetriesExceeded`.
    pub max_attempts: u32,
    /// Backoff base; the wait before attempt `n` is `base * growth^n`.
    pub base: Duration,
    /// Exponential growth factor.
    pub growth: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            base: Duration::from_millis(500),
            growth: 1.7,
        }
    }
}

impl RetryPolicy {
    /// Wait to observe the page after attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base.mul_f64(self.growth.powi(attempt as i32))
    }
}

/// The listing page URL for a symbol.
pub fn news_page_url(symbol: &str) -> String {
    format!("https://benzinga.com/stock/{}", symbol.to_lowercase())
}

/// Retrieve every article for `symbol` whose date falls inside `window`.
///
/// `now` is the reference instant relative date phrases are resolved
/// against; the caller keeps it for the later reconciliation pass so both
/// phases agree on what "3 hours ago" meant.
///
/// # Errors
///
/// Any [`ScrapeError`]; partial results are never returned alongside one.
#[instrument(level = "info", skip_all, fields(%symbol))]
pub async fn fetch_symbol_news<S: PageSession>(
    session: &mut S,
    symbol: &str,
    window: &DateWindow,
    now: DateTime<Tz>,
    policy: &RetryPolicy,
) -> Result<Vec<ArticleRecord>, ScrapeError> {
    let url = news_page_url(symbol);

    // LOADING_PAGE
    info!(%url, timeout_secs = INITIAL_PAGE_LOAD_TIMEOUT.as_secs(), "loading news page");
    match session.load(&url, INITIAL_PAGE_LOAD_TIMEOUT).await {
        Ok(()) => {}
        Err(SessionError::Timeout) => return Err(ScrapeError::PageLoadTimeout { url }),
        Err(SessionError::Other(reason)) => {
            return Err(ScrapeError::PageLoadFailed { url, reason });
        }
    }
    if session.visible_articles().is_empty() {
        return Err(ScrapeError::NoArticlesFound {
            symbol: symbol.to_string(),
            url,
        });
    }
    sleep(SETTLE_DELAY).await;

    let minimum_date = window.start;
    // One day of grace past the window end tolerates clock skew and items
    // the page pins ahead of the reverse-chronological flow.
    let skip_threshold = window.end + ChronoDuration::days(1);

    let mut records: Vec<ArticleRecord> = Vec::new();
    let mut current_index = 0usize;
    let mut last_count = 0usize;

    'run: loop {
        // EXPANDING: succeed only when the visible count grows. A count
        // that shrinks (an overlay replacing list items) is a failed
        // attempt like any other.
        let mut expanded = false;
        for attempt in 1..=policy.max_attempts {
            if let Err(e) = session.request_more().await {
                debug!(attempt, error = %e, "load-more request failed; retrying");
            }
            session.dismiss_overlays().await;
            sleep(policy.backoff(attempt)).await;

            let count = session.visible_articles().len();
            if count > last_count {
                debug!(attempt, count, "article list grew");
                last_count = count;
                expanded = true;
                break;
            }
            warn!(
                attempt,
                max = policy.max_attempts,
                count,
                "article count unchanged after load-more attempt"
            );
        }
        if !expanded {
            return Err(ScrapeError::MaxRetriesExceeded);
        }

        // EXTRACTING: from the first element we have not processed yet.
        while current_index < last_count {
            let raw = &session.visible_articles()[current_index];
            let record = extract_record(raw, now)?;

            if record.date > skip_threshold {
                debug!(date = %record.date, title = %record.title, "article dated past the window; skipping");
                current_index += 1;
                continue;
            }
            if record.date < minimum_date {
                info!(
                    date = %record.date,
                    %minimum_date,
                    collected = records.len(),
                    "reached an article older than the window start; stopping"
                );
                break 'run; // DONE
            }
            records.push(record);
            current_index += 1;
        }
    }

    Ok(records)
}

/// Turn a raw article element into a record with a normalized date.
///
/// # Errors
///
/// [`ScrapeError::Extraction`] when the element is missing its anchor,
/// publisher, or date, or when the date text defeats the normalizer. Any of
/// these aborts the whole retrieval.
fn extract_record(raw: &RawArticle, now: DateTime<Tz>) -> Result<ArticleRecord, ScrapeError> {
    if raw.headline.is_empty() || raw.url.is_empty() {
        return Err(ScrapeError::Extraction(
            "article element is missing its headline anchor".to_string(),
        ));
    }
    let publisher = raw.publisher().ok_or_else(|| {
        ScrapeError::Extraction(format!("article {} carries no publisher field", raw.url))
    })?;
    let date_text = raw.raw_date().ok_or_else(|| {
        ScrapeError::Extraction(format!("article {} carries no date field", raw.url))
    })?;
    let date =
        parse_article_date(now, date_text).map_err(|e| ScrapeError::Extraction(e.to_string()))?;

    Ok(ArticleRecord {
        title: raw.headline.clone(),
        url: raw.url.clone(),
        publisher: publisher.to_string(),
        date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::NEW_YORK;
    use chrono::TimeZone;

    /// Replays a fixed sequence of article-list snapshots: `load` installs
    /// the first, each `request_more` advances to the next (if any).
    struct ScriptedSession {
        snapshots: Vec<Vec<RawArticle>>,
        step: usize,
        visible: Vec<RawArticle>,
        load_calls: usize,
        more_calls: usize,
        fail_load: Option<SessionError>,
    }

    impl ScriptedSession {
        fn new(snapshots: Vec<Vec<RawArticle>>) -> Self {
            Self {
                snapshots,
                step: 0,
                visible: Vec::new(),
                load_calls: 0,
                more_calls: 0,
                fail_load: None,
            }
        }
    }

    impl PageSession for ScriptedSession {
        async fn load(&mut self, _url: &str, _timeout: Duration) -> Result<(), SessionError> {
            self.load_calls += 1;
            if let Some(err) = self.fail_load.take() {
                return Err(err);
            }
            self.visible = self.snapshots.first().cloned().unwrap_or_default();
            self.step = 1;
            Ok(())
        }

        async fn request_more(&mut self) -> Result<(), SessionError> {
            self.more_calls += 1;
            if self.step < self.snapshots.len() {
                self.visible = self.snapshots[self.step].clone();
                self.step += 1;
            }
            Ok(())
        }

        async fn dismiss_overlays(&mut self) {}

        fn visible_articles(&self) -> &[RawArticle] {
            &self.visible
        }
    }

    fn article(n: usize, date_text: &str) -> RawArticle {
        RawArticle {
            headline: format!("Story {n}"),
            url: format!("https://benzinga.com/news/{n}"),
            author: Some("Newsdesk".into()),
            date_text: Some(date_text.into()),
            spans: Vec::new(),
        }
    }

    fn window(start_day: u32, end_day: u32) -> DateWindow {
        DateWindow {
            start: NEW_YORK.with_ymd_and_hms(2024, 3, start_day, 0, 0, 0).unwrap(),
            end: NEW_YORK
                .with_ymd_and_hms(2024, 3, end_day, 23, 59, 59)
                .unwrap(),
        }
    }

    fn noon(day: u32) -> chrono::DateTime<chrono_tz::Tz> {
        NEW_YORK.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopping_rule_halts_before_older_articles() {
        // Dates D, D-1, D-2, D-10 with minimum D-3: keep the first three,
        // stop at the fourth.
        let mut session = ScriptedSession::new(vec![vec![
            article(1, "2024-03-20"),
            article(2, "2024-03-19"),
            article(3, "2024-03-18"),
            article(4, "2024-03-10"),
        ]]);
        let records = fetch_symbol_news(
            &mut session,
            "AAPL",
            &window(17, 20),
            noon(20),
            &RetryPolicy::default(),
        )
        .await
        .unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].title, "Story 1");
        assert_eq!(records[2].title, "Story 3");
    }

    #[tokio::test(start_paused = true)]
    async fn test_skip_ahead_does_not_halt_extraction() {
        // An article dated past window.end + 1 day is excluded but older
        // ones after it are still collected.
        let mut session = ScriptedSession::new(vec![vec![
            article(1, "2024-03-25"),
            article(2, "2024-03-19"),
            article(3, "2024-03-10"),
        ]]);
        let records = fetch_symbol_news(
            &mut session,
            "AAPL",
            &window(17, 20),
            noon(20),
            &RetryPolicy::default(),
        )
        .await
        .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Story 2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_plus_one_day_grace_is_kept() {
        // Exactly one day past the window end is within the grace band.
        let mut session = ScriptedSession::new(vec![vec![
            article(1, "2024-03-21"),
            article(2, "2024-03-10"),
        ]]);
        let records = fetch_symbol_news(
            &mut session,
            "AAPL",
            &window(17, 20),
            noon(21),
            &RetryPolicy::default(),
        )
        .await
        .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "Story 1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhaustion_returns_no_partial_results() {
        // The visible count never changes after the initial snapshot, and
        // every visible article is still inside the window, so the loop
        // re-enters EXPANDING and must exhaust its budget.
        let mut session = ScriptedSession::new(vec![vec![
            article(1, "2024-03-20"),
            article(2, "2024-03-19"),
        ]]);
        // Second pass through EXPANDING sees the same two articles forever.
        let err = fetch_symbol_news(
            &mut session,
            "AAPL",
            &window(1, 20),
            noon(20),
            &RetryPolicy::default(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ScrapeError::MaxRetriesExceeded));
        assert_eq!(session.more_calls, 1 + 8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shrinking_list_does_not_count_as_expansion() {
        // The list grows once, then shrinks on the next load-more. A
        // shrink must burn retry attempts like an unchanged count, not
        // register as a successful expansion.
        let mut session = ScriptedSession::new(vec![
            vec![article(1, "2024-03-20")],
            vec![
                article(1, "2024-03-20"),
                article(2, "2024-03-19"),
                article(3, "2024-03-18"),
            ],
            vec![article(1, "2024-03-20"), article(2, "2024-03-19")],
        ]);
        let policy = RetryPolicy::default();
        let err = fetch_symbol_news(&mut session, "AAPL", &window(1, 20), noon(20), &policy)
            .await
            .unwrap_err();

        assert!(matches!(err, ScrapeError::MaxRetriesExceeded));
        // One successful expansion, then a full budget of failed attempts;
        // the shrunken snapshot never restarted the extraction phase.
        assert_eq!(session.more_calls, 1 + policy.max_attempts as usize);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expansion_collects_across_snapshots() {
        let mut session = ScriptedSession::new(vec![
            vec![article(1, "2024-03-20")],
            vec![
                article(1, "2024-03-20"),
                article(2, "2024-03-19"),
                article(3, "2024-03-01"),
            ],
        ]);
        let records = fetch_symbol_news(
            &mut session,
            "AAPL",
            &window(17, 20),
            noon(20),
            &RetryPolicy::default(),
        )
        .await
        .unwrap();

        assert_eq!(records.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_timeout_is_distinguished() {
        let mut session = ScriptedSession::new(vec![]);
        session.fail_load = Some(SessionError::Timeout);
        let err = fetch_symbol_news(
            &mut session,
            "AAPL",
            &window(17, 20),
            noon(20),
            &RetryPolicy::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ScrapeError::PageLoadTimeout { .. }));

        let mut session = ScriptedSession::new(vec![]);
        session.fail_load = Some(SessionError::Other("dns failure".into()));
        let err = fetch_symbol_news(
            &mut session,
            "AAPL",
            &window(17, 20),
            noon(20),
            &RetryPolicy::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ScrapeError::PageLoadFailed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_initial_list_is_no_articles_error() {
        let mut session = ScriptedSession::new(vec![vec![]]);
        let err = fetch_symbol_news(
            &mut session,
            "AAPL",
            &window(17, 20),
            noon(20),
            &RetryPolicy::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ScrapeError::NoArticlesFound { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_element_aborts_whole_retrieval() {
        let broken = RawArticle {
            headline: String::new(),
            url: String::new(),
            ..Default::default()
        };
        let mut session = ScriptedSession::new(vec![vec![article(1, "2024-03-20"), broken]]);
        let err = fetch_symbol_news(
            &mut session,
            "AAPL",
            &window(17, 20),
            noon(20),
            &RetryPolicy::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ScrapeError::Extraction(_)));
    }

    #[test]
    fn test_backoff_grows_exponentially() {
        let policy = RetryPolicy::default();
        let first = policy.backoff(1);
        let second = policy.backoff(2);
        assert_eq!(first, Duration::from_millis(850));
        assert!((second.as_secs_f64() / first.as_secs_f64() - 1.7).abs() < 1e-9);
    }

    #[test]
    fn test_news_page_url_lowercases_symbol() {
        assert_eq!(news_page_url("AAPL"), "https://benzinga.com/stock/aapl");
    }
}
