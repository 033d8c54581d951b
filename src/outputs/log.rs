//! Run-level summary log.
//!
//! One row per symbol processed this run. Rows accumulate in memory and the
//! whole file is rewritten after every append: last-writer-wins snapshot
//! semantics rather than true appends, so a crash mid-run still leaves a
//! complete, parseable CSV of everything logged so far.

use chrono::DateTime;
use chrono_tz::Tz;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::models::{LogRow, RunStatus};
use crate::outputs::paths::LOGS_DIR;

/// The accumulating run log, bound to one file named for the run's start
/// time.
#[derive(Debug)]
pub struct RunLog {
    rows: Vec<LogRow>,
    path: PathBuf,
}

impl RunLog {
    /// Create a log for a run that started at `started`. The file is only
    /// written on the first append.
    pub fn new(root: &Path, started: DateTime<Tz>) -> Self {
        let filename = format!("{}.csv", started.format("%Y_%m_%d_%H_%M"));
        Self {
            rows: Vec::new(),
            path: root.join(LOGS_DIR).join(filename),
        }
    }

    /// Where the log file lives.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record one symbol's outcome and rewrite the log file in full.
    pub async fn record(
        &mut self,
        now: DateTime<Tz>,
        symbol: &str,
        status: RunStatus,
        error: &str,
        num_news: usize,
        runtime_secs: u64,
    ) -> Result<(), Box<dyn Error>> {
        self.rows.push(LogRow {
            date: now.format("%Y-%m-%d %H:%M:%S").to_string(),
            symbol: symbol.to_string(),
            status,
            error: error.to_string(),
            num_news,
            runtime_secs,
        });

        let mut wtr = csv::Writer::from_writer(vec![]);
        for row in &self.rows {
            wtr.serialize(row)?;
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&self.path, wtr.into_inner()?).await?;
        debug!(path = %self.path.display(), rows = self.rows.len(), "rewrote run log");
        Ok(())
    }
}
