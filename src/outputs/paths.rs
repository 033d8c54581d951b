//! Deterministic output paths and the existing-output index.
//!
//! A day-file's existence is the pipeline's idempotence marker: once
//! `root/YYYYMMDD/SYMBOL.csv` exists, that symbol/day is final and must
//! never be refetched or overwritten. The index answers the skip question
//! before any network activity happens: an all-or-nothing gate per symbol,
//! not a per-day merge.

use chrono::NaiveDate;
use std::path::{Path, PathBuf};

use crate::models::DateWindow;

/// Directory holding the full (unpartitioned) results of the latest run.
pub const LAST_RUN_ALL_DIR: &str = "LAST_RUN_ALL";

/// Directory holding per-symbol error markers.
pub const ERROR_DIR: &str = "ERROR";

/// Directory holding run-level summary logs.
pub const LOGS_DIR: &str = "LOGS";

/// The per-day dataset path: `root/YYYYMMDD/SYMBOL.csv`.
pub fn dataset_filepath(root: &Path, symbol: &str, day: NaiveDate) -> PathBuf {
    root.join(day.format("%Y%m%d").to_string())
        .join(format!("{symbol}.csv"))
}

/// The full-results path for this run: `root/LAST_RUN_ALL/SYMBOL.csv`.
pub fn all_results_filepath(root: &Path, symbol: &str) -> PathBuf {
    root.join(LAST_RUN_ALL_DIR).join(format!("{symbol}.csv"))
}

/// The error-marker path: `root/ERROR/SYMBOL.txt`.
pub fn error_marker_filepath(root: &Path, symbol: &str) -> PathBuf {
    root.join(ERROR_DIR).join(format!("{symbol}.txt"))
}

/// Whether the day-file for this symbol/day already exists.
pub fn day_exists(root: &Path, symbol: &str, day: NaiveDate) -> bool {
    dataset_filepath(root, symbol, day).exists()
}

/// Whether every day of the window already has a day-file.
///
/// Short-circuits on the first missing day.
pub fn range_fully_covered(root: &Path, symbol: &str, window: &DateWindow) -> bool {
    window.days().all(|day| day_exists(root, symbol, day))
}
