//! Publication-date normalization for the news listing page.
//!
//! The listing page mixes three shapes of date text: exact timestamps with a
//! UTC offset for recent items, relative phrases ("3 hours ago", "a day ago")
//! for slightly older ones, and plain calendar dates beyond that. The
//! pipeline needs a single consistent `DateTime` in America/New_York, so
//! [`parse_article_date`] resolves all three through a fixed four-rule
//! fallback chain.
//!
//! The relative-phrase rule is a deliberately narrow heuristic: it accepts
//! only `<integer> <unit> ago` with second/minute/hour/day/week units.
//! Anything fuzzier ("a few seconds ago") falls through to absolute-date
//! parsing rather than being guessed at.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::errors::DateParseError;

/// The fixed timezone every timestamp in the pipeline is expressed in.
pub const NEW_YORK: Tz = chrono_tz::America::New_York;

/// Matches the narrow relative form `<integer> <unit> ago`.
static RELATIVE_PHRASE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+)\s+(second|minute|hour|day|week)s?\s+ago$")
        .expect("relative-phrase regex is valid")
});

/// Absolute formats carrying an explicit UTC offset, tried in order.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%B %d, %Y %I:%M %p %z",
];

/// Offset-free absolute formats, tried in order. Time-of-day is discarded
/// anyway (rule 4 truncates to midnight) but must parse where present.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%B %d, %Y %I:%M %p",
    "%B %d, %Y %I:%M%p",
];

const NAIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%B %d, %Y", "%m/%d/%Y"];

/// Truncate a New York timestamp to midnight of the same calendar day.
pub fn truncate_to_midnight(dt: DateTime<Tz>) -> DateTime<Tz> {
    midnight_of(dt.date_naive()).unwrap_or(dt)
}

/// Midnight (00:00:00) of a calendar day, New York time.
///
/// New York's DST transitions happen at 02:00, so local midnight always
/// exists; `None` guards only against hypothetical gap dates.
pub fn midnight_of(day: NaiveDate) -> Option<DateTime<Tz>> {
    NEW_YORK
        .from_local_datetime(&day.and_time(NaiveTime::MIN))
        .earliest()
}

/// Normalize a raw article date string into a New York timestamp.
///
/// `now` is the reference instant the listing page was observed at; relative
/// phrases are resolved against it. Rules, in priority order:
///
/// 1. An explicit `-0400`/`-0500` offset marker → parse as an absolute
///    timestamp and keep the full time-of-day.
/// 2. The literal `"a day ago"` → `now` minus one day, truncated to midnight.
/// 3. A `<integer> <unit> ago` phrase → subtract that duration from `now`,
///    truncated to midnight.
/// 4. Otherwise → absolute date parse, truncated to midnight.
///
/// # Errors
///
/// [`DateParseError`] when no rule applies; the caller treats that as an
/// extraction fault.
pub fn parse_article_date(now: DateTime<Tz>, raw: &str) -> Result<DateTime<Tz>, DateParseError> {
    let raw = raw.trim();

    // Rule 1: the two offsets New York ever uses. Full precision is kept
    // only on this path.
    if raw.contains("-0400") || raw.contains("-0500") {
        for fmt in OFFSET_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
                return Ok(dt.with_timezone(&NEW_YORK));
            }
        }
        return Err(DateParseError { raw: raw.to_string() });
    }

    // Rule 2: the one relative phrase with no leading integer.
    if raw == "a day ago" {
        return Ok(truncate_to_midnight(now - Duration::days(1)));
    }

    // Rule 3: narrow relative form only; anything fuzzier falls through.
    if raw.contains("ago") {
        if let Some(delta) = parse_relative_phrase(raw) {
            return Ok(truncate_to_midnight(now - delta));
        }
        debug!(raw, "relative phrase outside the supported form; trying absolute parse");
    }

    // Rule 4: absolute date, midnight precision.
    parse_absolute(raw)
        .map(truncate_to_midnight)
        .ok_or_else(|| DateParseError { raw: raw.to_string() })
}

/// Parse `<integer> <unit> ago` into a duration, or `None` if the phrase is
/// outside the supported form.
fn parse_relative_phrase(raw: &str) -> Option<Duration> {
    let caps = RELATIVE_PHRASE.captures(raw)?;
    let amount: i64 = caps[1].parse().ok()?;
    let delta = match &caps[2] {
        "second" => Duration::seconds(amount),
        "minute" => Duration::minutes(amount),
        "hour" => Duration::hours(amount),
        "day" => Duration::days(amount),
        "week" => Duration::weeks(amount),
        _ => return None,
    };
    Some(delta)
}

/// Try the offset-free absolute formats and localize to New York.
fn parse_absolute(raw: &str) -> Option<DateTime<Tz>> {
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            if let Some(localized) = NEW_YORK.from_local_datetime(&dt).earliest() {
                return Some(localized);
            }
        }
    }
    for fmt in NAIVE_DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            let dt = d.and_time(NaiveTime::MIN);
            if let Some(localized) = NEW_YORK.from_local_datetime(&dt).earliest() {
                return Some(localized);
            }
        }
    }
    None
}
