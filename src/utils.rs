//! Symbol-list handling.
//!
//! The stock list argument is either an inline comma-separated list or a
//! path to a delimited file (screener exports, watchlists). File parsing is
//! deliberately forgiving: only single-token, all-uppercase entries in the
//! leftmost column are kept, which filters out header rows, company names,
//! and blank lines without needing to know the export format.

use std::error::Error;
use std::path::Path;

/// Canonical symbol form: uppercased, path separators replaced so the
/// symbol is safe to use as a filename (`BRK/B` → `BRK.B`).
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().replace('/', ".").to_uppercase()
}

/// Resolve the `stock_list` argument into a list of raw symbols.
///
/// An argument containing `csv` or `txt` is treated as a file path;
/// anything else is split on commas.
pub fn resolve_symbol_list(arg: &str) -> Result<Vec<String>, Box<dyn Error>> {
    if arg.contains("csv") || arg.contains("txt") {
        load_symbol_list(Path::new(arg))
    } else {
        Ok(arg
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect())
    }
}

/// Read symbols from a delimited file: leftmost column, single-token,
/// all-uppercase entries only; blank rows skipped.
fn load_symbol_list(path: &Path) -> Result<Vec<String>, Box<dyn Error>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut symbols = Vec::new();
    for result in reader.records() {
        let record = result?;
        let Some(first) = record.get(0) else {
            continue;
        };
        // Screener exports occasionally lead with a BOM.
        let first = first.trim_start_matches('\u{feff}').trim();
        if first.is_empty() {
            continue;
        }
        if first.split_whitespace().count() > 1 {
            continue;
        }
        if !is_all_uppercase(first) {
            continue;
        }
        symbols.push(first.to_string());
    }
    Ok(symbols)
}

/// True when the entry has at least one cased character and every cased
/// character is uppercase (so `BRK.B` passes, `Apple Inc` and `123` fail).
fn is_all_uppercase(s: &str) -> bool {
    let mut has_cased = false;
    for c in s.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            has_cased = true;
        }
    }
    has_cased
}
