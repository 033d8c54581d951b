//! Persistence layer: dataset partitioning, error markers, and the run log.
//!
//! # Submodules
//!
//! - [`paths`]: the deterministic path function and the existing-output
//!   index that drives skip decisions
//! - [`partition`]: writes the full result set and per-day subsets, and
//!   manages per-symbol error markers
//! - [`log`]: the run-level summary log (snapshot-rewrite CSV)
//!
//! # Output Structure
//!
//! ```text
//! output/
//! ├── LAST_RUN_ALL/
//! │   └── AAPL.csv        # full result for the most recent run (cleared at start)
//! ├── 20240308/
//! │   └── AAPL.csv        # per-day dataset; existence = "done, never refetch"
//! ├── ERROR/
//! │   └── AAPL.txt        # last failure reason; removed on next success
//! └── LOGS/
//!     └── 2024_03_10_12_00.csv
//! ```

pub mod log;
pub mod partition;
pub mod paths;
