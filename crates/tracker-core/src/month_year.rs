//! `MM-YYYY` text codec and timezone-aware "today" resolution.

use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use regex::Regex;
use tracing::warn;

fn month_year_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d{2})-(\d{4})$").expect("regex is valid"))
}

// ── Parsing / formatting ──────────────────────────────────────────────────────

/// Parse a strict `MM-YYYY` string into the first day of that month.
///
/// Returns `None` for anything else: single-digit months, two-digit years,
/// month `00` or `13`, surrounding whitespace.
///
/// ```
/// use chrono::NaiveDate;
/// use tracker_core::month_year::parse_month_year;
///
/// assert_eq!(parse_month_year("07-2025"), NaiveDate::from_ymd_opt(2025, 7, 1));
/// assert_eq!(parse_month_year("7-2025"), None);
/// ```
pub fn parse_month_year(value: &str) -> Option<NaiveDate> {
    let caps = month_year_pattern().captures(value)?;
    let month: u32 = caps[1].parse().ok()?;
    let year: i32 = caps[2].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// Format a date as `MM-YYYY`. The day component is dropped.
pub fn format_month_year(date: NaiveDate) -> String {
    format!("{:02}-{:04}", date.month(), date.year())
}

/// Truncate a date to the first day of its month.
pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    // Day 1 exists in every month.
    date.with_day(1).unwrap_or(date)
}

// ── System timezone detection ─────────────────────────────────────────────────

/// Detect the IANA timezone name of the running system.
///
/// Falls back to `"UTC"` if detection fails.
pub fn get_system_timezone() -> String {
    iana_time_zone::get_timezone().unwrap_or_else(|_| "UTC".to_string())
}

// ── TimezoneHandler ───────────────────────────────────────────────────────────

/// Resolves the current calendar date in a configured timezone.
///
/// The summary window's default upper bound is "now"; which month that falls
/// in depends on where the user is.
#[derive(Debug, Clone, Copy)]
pub struct TimezoneHandler {
    tz: Tz,
}

impl TimezoneHandler {
    /// Create a handler for an IANA timezone name.
    ///
    /// `"auto"` resolves to the system timezone. Unrecognised names fall back
    /// to UTC and log a warning.
    pub fn new(tz_name: &str) -> Self {
        let name = if tz_name.eq_ignore_ascii_case("auto") {
            get_system_timezone()
        } else {
            tz_name.to_string()
        };
        let tz = name.parse::<Tz>().unwrap_or_else(|_| {
            warn!(
                "TimezoneHandler: unrecognised timezone \"{}\", falling back to UTC",
                name
            );
            Tz::UTC
        });
        Self { tz }
    }

    /// Validate that `tz_name` is a recognised IANA timezone identifier.
    pub fn validate_timezone(tz_name: &str) -> bool {
        tz_name.parse::<Tz>().is_ok()
    }

    /// Today's date in the handler's timezone.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.tz).date_naive()
    }

    /// The configured timezone.
    pub fn tz(&self) -> Tz {
        self.tz
    }
}

impl Default for TimezoneHandler {
    fn default() -> Self {
        Self { tz: Tz::UTC }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
