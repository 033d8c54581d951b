//! Output partitioner: per-day dataset files and error markers.
//!
//! One call per symbol per run, after retrieval (and reconciliation, when
//! retrieval succeeded). On failure it records the reason in the symbol's
//! error marker and touches nothing else. On success it writes the full
//! result set to `LAST_RUN_ALL/`, then one day-file per window day,
//! skipping days that already exist and writing empty files for days with
//! no news (a permanent "checked, nothing found" record), and finally
//! clears the error marker.
//!
//! A symbol therefore ends each run attempt with either a fresh error
//! marker or fresh datasets, never both.

use chrono::Duration;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, instrument};

use crate::dates::midnight_of;
use crate::errors::ScrapeError;
use crate::models::{ArticleRecord, DateWindow};
use crate::outputs::paths::{all_results_filepath, dataset_filepath, error_marker_filepath};

/// Persist one symbol's run outcome.
///
/// # Errors
///
/// Only filesystem/CSV faults; a scrape error in `outcome` is data here,
/// not an error of this function.
#[instrument(level = "info", skip(outcome, window), fields(%symbol))]
pub async fn save_symbol_data(
    root: &Path,
    symbol: &str,
    outcome: &Result<Vec<ArticleRecord>, ScrapeError>,
    window: &DateWindow,
) -> Result<(), Box<dyn Error>> {
    let marker_path = error_marker_filepath(root, symbol);

    let records = match outcome {
        Err(scrape_err) => {
            if let Some(parent) = marker_path.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::write(&marker_path, scrape_err.to_string()).await?;
            info!(path = %marker_path.display(), "wrote error marker");
            return Ok(());
        }
        Ok(records) => records,
    };

    // Full result set for this run, always overwritten.
    let all_path = all_results_filepath(root, symbol);
    if let Some(parent) = all_path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(&all_path, records_to_csv(records.iter())?).await?;
    info!(path = %all_path.display(), count = records.len(), "wrote full result set");

    for day in window.days() {
        let day_path = dataset_filepath(root, symbol, day);
        if day_path.exists() {
            debug!(path = %day_path.display(), "day-file already exists; not overwriting");
            continue;
        }

        let Some(day_start) = midnight_of(day) else {
            continue;
        };
        let day_end = midnight_of(day + Duration::days(1)).unwrap_or(day_start + Duration::days(1));
        let subset = records
            .iter()
            .filter(|r| r.date >= day_start && r.date < day_end);

        if let Some(parent) = day_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&day_path, records_to_csv(subset)?).await?;
        debug!(path = %day_path.display(), "wrote day-file");
    }

    // This run succeeded; any marker from an earlier attempt is stale.
    if marker_path.exists() {
        fs::remove_file(&marker_path).await?;
        info!(path = %marker_path.display(), "removed stale error marker");
    }

    Ok(())
}

/// Render records as CSV. The header row is always present, so an empty
/// subset still produces a valid (and meaningful) file.
fn records_to_csv<'a>(
    records: impl Iterator<Item = &'a ArticleRecord>,
) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(vec![]);
    wtr.write_record(["title", "url", "publisher", "date"])?;
    for record in records {
        wtr.serialize(record)?;
    }
    Ok(wtr.into_inner()?)
}
