//! NYSE trading-calendar oracle.
//!
//! Answers two questions for the run driver: "is this date a trading day"
//! and "what was the close of the last trading day before it". The schedule
//! is generated once per process (weekdays from 2016-01-01 through today,
//! minus full-closure NYSE holidays) and is read-only thereafter.
//!
//! Holiday rules implemented: New Year's Day (Sunday observed Monday; a
//! Saturday New Year's is not observed), Martin Luther King Jr. Day,
//! Washington's Birthday, Good Friday, Memorial Day, Juneteenth (from 2022),
//! Independence Day, Labor Day, Thanksgiving, Christmas, plus the ad-hoc
//! national days of mourning the exchange closed for within the covered
//! range.

use chrono::{Datelike, DateTime, Duration, NaiveDate, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use std::collections::BTreeSet;

use crate::dates::NEW_YORK;
use crate::errors::CalendarError;

/// First date the schedule covers.
const SCHEDULE_START: (i32, u32, u32) = (2016, 1, 1);

/// Regular NYSE closing bell, New York local time.
const MARKET_CLOSE_HOUR: u32 = 16;

/// Ad-hoc full closures within the covered range (national days of
/// mourning for presidents G.H.W. Bush and Carter).
const SPECIAL_CLOSURES: &[(i32, u32, u32)] = &[(2018, 12, 5), (2025, 1, 9)];

/// The precomputed schedule: every NYSE trading day from [`SCHEDULE_START`]
/// through today, New York time.
static TRADING_DAYS: Lazy<BTreeSet<NaiveDate>> = Lazy::new(|| {
    let (y, m, d) = SCHEDULE_START;
    let start = NaiveDate::from_ymd_opt(y, m, d).expect("schedule start date is valid");
    let end = Utc::now().with_timezone(&NEW_YORK).date_naive();
    build_schedule(start, end)
});

/// Whether the market opened on `date`.
///
/// False for weekends, holidays, and any date outside the covered range
/// (before 2016 or after today).
pub fn is_trading_day(date: NaiveDate) -> bool {
    TRADING_DAYS.contains(&date)
}

/// Closing-bell timestamp (16:00 New York) of the most recent trading day
/// strictly before `date`.
///
/// # Errors
///
/// [`CalendarError::NotFound`] when no covered trading day precedes `date`.
pub fn previous_trading_day_close(date: NaiveDate) -> Result<DateTime<Tz>, CalendarError> {
    let prev = TRADING_DAYS
        .range(..date)
        .next_back()
        .ok_or(CalendarError::NotFound(date))?;
    NEW_YORK
        .with_ymd_and_hms(prev.year(), prev.month(), prev.day(), MARKET_CLOSE_HOUR, 0, 0)
        .earliest()
        .ok_or(CalendarError::NotFound(date))
}

fn build_schedule(start: NaiveDate, end: NaiveDate) -> BTreeSet<NaiveDate> {
    let mut holidays = BTreeSet::new();
    for year in start.year()..=end.year() {
        holidays.extend(holidays_for_year(year));
    }
    for &(y, m, d) in SPECIAL_CLOSURES {
        if let Some(d) = NaiveDate::from_ymd_opt(y, m, d) {
            holidays.insert(d);
        }
    }

    let mut days = BTreeSet::new();
    let mut day = start;
    while day <= end {
        let weekday = day.weekday();
        if weekday != Weekday::Sat && weekday != Weekday::Sun && !holidays.contains(&day) {
            days.insert(day);
        }
        day += Duration::days(1);
    }
    days
}

fn holidays_for_year(year: i32) -> Vec<NaiveDate> {
    let mut holidays = Vec::new();

    // New Year's Day: Sunday rolls to Monday; a Saturday New Year's is not
    // observed by the exchange at all.
    if let Some(d) = observed_sunday_to_monday(year, 1, 1) {
        holidays.push(d);
    }

    holidays.push(nth_weekday(year, 1, Weekday::Mon, 3)); // MLK Day
    holidays.push(nth_weekday(year, 2, Weekday::Mon, 3)); // Washington's Birthday
    holidays.push(easter_sunday(year) - Duration::days(2)); // Good Friday
    holidays.push(last_weekday(year, 5, Weekday::Mon)); // Memorial Day

    if year >= 2022 {
        holidays.extend(observed_both_ways(year, 6, 19)); // Juneteenth
    }
    holidays.extend(observed_both_ways(year, 7, 4)); // Independence Day
    holidays.push(nth_weekday(year, 9, Weekday::Mon, 1)); // Labor Day
    holidays.push(nth_weekday(year, 11, Weekday::Thu, 4)); // Thanksgiving
    holidays.extend(observed_both_ways(year, 12, 25)); // Christmas

    holidays
}

/// Fixed-date holiday observed the following Monday when it falls on a
/// Sunday and not at all when it falls on a Saturday.
fn observed_sunday_to_monday(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    match date.weekday() {
        Weekday::Sat => None,
        Weekday::Sun => Some(date + Duration::days(1)),
        _ => Some(date),
    }
}

/// Fixed-date holiday shifted to Friday when on a Saturday and to Monday
/// when on a Sunday.
fn observed_both_ways(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let observed = match date.weekday() {
        Weekday::Sat => date - Duration::days(1),
        Weekday::Sun => date + Duration::days(1),
        _ => date,
    };
    Some(observed)
}

/// The `n`th occurrence of `weekday` in the given month.
fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u32) -> NaiveDate {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, n as u8)
        .expect("nth weekday exists for every month in the schedule range")
}

/// The last occurrence of `weekday` in the given month.
fn last_weekday(year: i32, month: u32, weekday: Weekday) -> NaiveDate {
    let first_next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .expect("first of month is valid");
    let mut day = first_next_month - Duration::days(1);
    while day.weekday() != weekday {
        day -= Duration::days(1);
    }
    day
}

/// Gregorian Easter Sunday (anonymous computus).
fn easter_sunday(year: i32) -> NaiveDate {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = ((h + l - 7 * m + 114) % 31) + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32).expect("computus yields a valid date")
}
