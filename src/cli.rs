//! Command-line interface definitions.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Date arguments parse as `YYYY-MM-DD`; clap rejects a run with neither
//! `-d` nor `--start` before any work begins.

use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the news scraper.
///
/// # Examples
///
/// ```sh
/// # Symbols inline, explicit window
/// stock_news_scraper AAPL,MSFT --start 2024-03-01 --end 2024-03-10
///
/// # Symbols from a screener export, single-day mode
/// stock_news_scraper ./watchlist.csv -d 2024-03-08
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to a csv/txt file containing the stock list, or an inline
    /// comma-separated list of symbols
    pub stock_list: String,

    /// Single-day mode: use this date (YYYY-MM-DD) as both start and end
    #[arg(short = 'd', value_name = "DATE")]
    pub day: Option<NaiveDate>,

    /// First day of the window (YYYY-MM-DD); required unless -d is given
    #[arg(long, value_name = "DATE", required_unless_present = "day")]
    pub start: Option<NaiveDate>,

    /// Last day of the window (YYYY-MM-DD); defaults to today in New York
    #[arg(long, value_name = "DATE")]
    pub end: Option<NaiveDate>,

    /// Root directory for datasets, error markers, and logs
    #[arg(short, long, default_value = "./output")]
    pub output_dir: PathBuf,
}

impl Cli {
    /// The requested start and (optional) end days, with `-d` taking
    /// precedence over `--start`/`--end`.
    pub fn requested_days(&self) -> (NaiveDate, Option<NaiveDate>) {
        match self.day {
            Some(day) => (day, Some(day)),
            // required_unless_present guarantees start is set when -d is not.
            None => (self.start.expect("clap enforces --start"), self.end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_window_parsing() {
        let cli = Cli::parse_from([
            "stock_news_scraper",
            "AAPL,MSFT",
            "--start",
            "2024-03-01",
            "--end",
            "2024-03-10",
        ]);

        assert_eq!(cli.stock_list, "AAPL,MSFT");
        let (start, end) = cli.requested_days();
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(end, Some(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()));
    }

    #[test]
    fn test_cli_single_day_mode_sets_both_ends() {
        let cli = Cli::parse_from(["stock_news_scraper", "AAPL", "-d", "2024-03-08"]);
        let (start, end) = cli.requested_days();
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 3, 8).unwrap());
        assert_eq!(end, Some(start));
    }

    #[test]
    fn test_cli_requires_start_or_day() {
        let result = Cli::try_parse_from(["stock_news_scraper", "AAPL"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_end_is_optional() {
        let cli = Cli::parse_from(["stock_news_scraper", "AAPL", "--start", "2024-03-01"]);
        let (_, end) = cli.requested_days();
        assert!(end.is_none());
    }

    #[test]
    fn test_cli_default_output_dir() {
        let cli = Cli::parse_from(["stock_news_scraper", "AAPL", "-d", "2024-03-08"]);
        assert_eq!(cli.output_dir, PathBuf::from("./output"));
    }
}
