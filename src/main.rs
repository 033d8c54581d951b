//! # Stock News Scraper
//!
//! A batch CLI that fetches historical news headlines for a list of stock
//! ticker symbols, normalizes publication dates to America/New_York, and
//! persists per-symbol per-day CSV datasets plus a run-level summary log.
//!
//! ## Pipeline
//!
//! For each requested symbol, strictly in sequence:
//! 1. **Skip check**: if every day of the window already has a day-file on
//!    disk, the symbol is skipped with zero network activity
//! 2. **Retrieval**: paginated load-more scraping of the symbol's news
//!    listing with bounded exponential-backoff retries
//! 3. **Reconciliation**: each article's own page corrects the approximate
//!    listing-page title and date
//! 4. **Partitioning**: results land in idempotent per-day files; failures
//!    land in a per-symbol error marker instead
//!
//! A failed symbol never aborts the run; the driver logs the outcome and
//! moves to the next symbol.
//!
//! ## Usage
//!
//! ```sh
//! stock_news_scraper AAPL,MSFT --start 2024-03-01 --end 2024-03-10
//! stock_news_scraper ./watchlist.csv -d 2024-03-08
//! ```

use chrono::{DateTime, Datelike, TimeZone, Utc};
use chrono_tz::Tz;
use clap::Parser;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::fs;
use tracing::{error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod calendar;
mod cli;
mod dates;
mod errors;
mod models;
mod outputs;
mod reconcile;
mod retrieval;
mod session;
mod utils;

use cli::Cli;
use dates::{NEW_YORK, midnight_of, truncate_to_midnight};
use models::{DateWindow, RunStatus};
use outputs::log::RunLog;
use outputs::partition::save_symbol_data;
use outputs::paths::{ERROR_DIR, LAST_RUN_ALL_DIR, LOGS_DIR, range_fully_covered};
use reconcile::reconcile_dates;
use retrieval::{RetryPolicy, fetch_symbol_news};
use session::{BenzingaSession, PageSession};
use utils::{normalize_symbol, resolve_symbol_list};

/// The news source stops surfacing headlines this far back.
const MAX_LOOKBACK_DAYS: i64 = 3 * 365;

/// Run-wide mutable state owned by the driver.
///
/// The page session is created lazily on the first non-skipped symbol and
/// reused for the remainder of the run; the log accumulates one row per
/// symbol. Generic over the session so the per-symbol pipeline can be
/// driven by a scripted session in tests.
struct RunContext<S: PageSession> {
    output_root: PathBuf,
    http: reqwest::Client,
    session: Option<S>,
    log: RunLog,
    policy: RetryPolicy,
}

#[tokio::main]
async fn main() {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    if let Err(e) = run().await {
        error!(error = %e, "run aborted by unexpected error");
        eprintln!("Unknown error occurred:\n{e}");
        std::process::exit(1);
    }
}

#[instrument]
async fn run() -> Result<(), Box<dyn Error>> {
    let start_time = Instant::now();
    info!("stock_news_scraper starting up");

    let args = Cli::parse();
    let now = now_ny();

    let window = build_window(&args, now)?;
    info!(start = %window.start, end = %window.end, "resolved scraping window");

    // Pre-flight: the source degrades beyond the lookback limit, so refuse
    // the run outright rather than produce silently thin datasets.
    let lookback_days = (now - window.start).num_days();
    if lookback_days > MAX_LOOKBACK_DAYS {
        eprintln!(
            "only lookbacks up to {MAX_LOOKBACK_DAYS} days are supported; \
             the requested start date is {lookback_days} days ago"
        );
        std::process::exit(1);
    }

    prepare_output_root(&args.output_dir).await?;
    let symbols = resolve_symbol_list(&args.stock_list)?;
    info!(count = symbols.len(), "resolved symbol list");

    let mut ctx = RunContext {
        output_root: args.output_dir.clone(),
        http: reqwest::Client::new(),
        session: None::<BenzingaSession>,
        log: RunLog::new(&args.output_dir, now),
        policy: RetryPolicy::default(),
    };

    let total = symbols.len();
    for (position, raw_symbol) in symbols.iter().enumerate() {
        let symbol = normalize_symbol(raw_symbol);
        info!(%symbol, position = position + 1, total, "processing symbol");

        let http = ctx.http.clone();
        process_symbol(&mut ctx, &symbol, &window, move || {
            info!("initializing scraping session");
            BenzingaSession::new(http)
        })
        .await?;
    }

    info!(
        log = %ctx.log.path().display(),
        elapsed_secs = start_time.elapsed().as_secs(),
        "finished fetching all symbols"
    );
    Ok(())
}

/// Run the full per-symbol pipeline: skip gate, retrieval, reconciliation,
/// partitioning, log row.
///
/// The skip gate comes first and short-circuits everything else: a window
/// already fully covered on disk records a `SKIPPED` row and returns without
/// touching the session, so `make_session` is never even invoked for a run
/// that skips every symbol.
async fn process_symbol<S: PageSession>(
    ctx: &mut RunContext<S>,
    symbol: &str,
    window: &DateWindow,
    make_session: impl FnOnce() -> S,
) -> Result<(), Box<dyn Error>> {
    if range_fully_covered(&ctx.output_root, symbol, window) {
        info!(%symbol, "window already fully covered on disk; skipping");
        ctx.log
            .record(now_ny(), symbol, RunStatus::Skipped, "", 0, 0)
            .await?;
        return Ok(());
    }

    let scrape_start = Instant::now();
    let symbol_now = now_ny();

    let session = ctx.session.get_or_insert_with(make_session);
    let mut outcome = fetch_symbol_news(session, symbol, window, symbol_now, &ctx.policy).await;

    match &mut outcome {
        Ok(records) => {
            info!(%symbol, count = records.len(), "retrieval finished; reconciling dates");
            reconcile_dates(&ctx.http, records, symbol_now).await;
        }
        Err(e) => warn!(%symbol, error = %e, "retrieval failed"),
    }

    save_symbol_data(&ctx.output_root, symbol, &outcome, window).await?;

    let runtime_secs = scrape_start.elapsed().as_secs();
    let (status, error_text, num_news) = match &outcome {
        Ok(records) => (RunStatus::Success, String::new(), records.len()),
        Err(e) => (RunStatus::Fail, e.to_string(), 0),
    };
    ctx.log
        .record(now_ny(), symbol, status, &error_text, num_news, runtime_secs)
        .await?;
    Ok(())
}

fn now_ny() -> DateTime<Tz> {
    Utc::now().with_timezone(&NEW_YORK)
}

/// Build the run's date window from the CLI arguments.
///
/// The start day is widened back to the previous trading day's close
/// (truncated to midnight) when it is itself a trading day, so after-hours
/// news attributed to the requested day is not missed. The end defaults to
/// "now" in New York.
fn build_window(args: &Cli, now: DateTime<Tz>) -> Result<DateWindow, Box<dyn Error>> {
    let (start_day, end_day) = args.requested_days();

    let mut start = midnight_of(start_day).ok_or("start date is not representable in New York")?;
    if calendar::is_trading_day(start_day) {
        start = truncate_to_midnight(calendar::previous_trading_day_close(start_day)?);
    }

    let end = match end_day {
        Some(day) => NEW_YORK
            .with_ymd_and_hms(day.year(), day.month(), day.day(), 23, 59, 59)
            .earliest()
            .ok_or("end date is not representable in New York")?,
        None => now,
    };

    Ok(DateWindow { start, end })
}

/// Create the output directory skeleton, clearing the previous run's
/// full-results directory.
async fn prepare_output_root(root: &Path) -> Result<(), Box<dyn Error>> {
    let all_dir = root.join(LAST_RUN_ALL_DIR);
    if all_dir.exists() {
        fs::remove_dir_all(&all_dir).await?;
    }
    fs::create_dir_all(&all_dir).await?;
    fs::create_dir_all(root.join(ERROR_DIR)).await?;
    fs::create_dir_all(root.join(LOGS_DIR)).await?;
    Ok(())
}
