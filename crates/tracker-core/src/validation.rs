//! Request validation for the subscription service.
//!
//! Everything here runs before a request reaches storage or the overlap
//! engine, so the engine can assume well-formed intervals and windows.

use chrono::NaiveDate;
use tracing::warn;
use uuid::Uuid;

use crate::error::{Result, TrackerError};
use crate::models::QueryWindow;
use crate::month_year::{format_month_year, parse_month_year};

/// Longest accepted service name, in characters.
pub const MAX_SERVICE_NAME_LEN: usize = 100;

/// Ensure `user_id` is present and a valid UUID.
pub fn validate_user_id(user_id: &str) -> Result<Uuid> {
    if user_id.trim().is_empty() {
        warn!("user_id is empty");
        return Err(TrackerError::EmptyUserId);
    }
    Uuid::parse_str(user_id.trim()).map_err(|e| {
        warn!(error = %e, user_id, "invalid user_id UUID");
        TrackerError::InvalidUserId(user_id.to_string())
    })
}

/// Ensure the service name is non-blank and fits the storage column.
pub fn validate_service_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        warn!("service name is empty");
        return Err(TrackerError::InvalidServiceName);
    }
    let len = name.chars().count();
    if len > MAX_SERVICE_NAME_LEN {
        warn!(len, "service name too long");
        return Err(TrackerError::ServiceNameTooLong {
            len,
            max: MAX_SERVICE_NAME_LEN,
        });
    }
    Ok(())
}

pub fn validate_price(price: i64) -> Result<()> {
    if price <= 0 {
        warn!("invalid price: {}", price);
        return Err(TrackerError::InvalidPrice(price));
    }
    Ok(())
}

/// Parse a required `MM-YYYY` start date.
pub fn validate_start_date(value: &str) -> Result<NaiveDate> {
    parse_month_year(value).ok_or_else(|| {
        warn!("invalid start_date: {}", value);
        TrackerError::InvalidStartDate(value.to_string())
    })
}

/// Parse an optional `MM-YYYY` end date and check it is not before `start`.
///
/// `None` and the empty string both mean "open-ended". An end equal to the
/// start is a single-month subscription.
pub fn validate_end_date(start: NaiveDate, value: Option<&str>) -> Result<Option<NaiveDate>> {
    let Some(value) = value.filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    let end = parse_month_year(value).ok_or_else(|| {
        warn!("invalid end_date: {}", value);
        TrackerError::InvalidEndDate(value.to_string())
    })?;
    if end < start {
        warn!("end_date {} is before start_date {}", end, start);
        return Err(TrackerError::EndDateBeforeStart {
            start: format_month_year(start),
            end: value.to_string(),
        });
    }
    Ok(Some(end))
}

/// Parse a subscription identifier from text (e.g. a CLI argument).
pub fn validate_subscription_id(value: &str) -> Result<u64> {
    match value.trim().parse::<u64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => {
            warn!("invalid subscription ID: {}", value);
            Err(TrackerError::InvalidSubscriptionId(value.to_string()))
        }
    }
}

/// Build the summary window from optional `MM-YYYY` bounds.
///
/// A missing `from` leaves the window unbounded below; a missing `to` ends it
/// at `today`. The resulting window never ends before it starts.
pub fn resolve_window(
    from: Option<&str>,
    to: Option<&str>,
    today: NaiveDate,
) -> Result<QueryWindow> {
    let start = match from.filter(|v| !v.is_empty()) {
        Some(value) => Some(validate_start_date(value)?),
        None => None,
    };

    let end = match (start, to.filter(|v| !v.is_empty())) {
        (Some(start), Some(_)) => validate_end_date(start, to)?.unwrap_or(today),
        (None, Some(value)) => parse_month_year(value).ok_or_else(|| {
            warn!("invalid end_date: {}", value);
            TrackerError::InvalidEndDate(value.to_string())
        })?,
        (_, None) => today,
    };

    if let Some(start) = start {
        if end < start {
            warn!("summary window ends {} before it starts {}", end, start);
            return Err(TrackerError::EndDateBeforeStart {
                start: format_month_year(start),
                end: format_month_year(end),
            });
        }
    }

    Ok(QueryWindow::new(start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ── validate_user_id ──────────────────────────────────────────────────────

    #[test]
    fn test_user_id_valid() {
        let id = validate_user_id("60601fee-2bf1-4721-ae6f-7636e79a0cba").unwrap();
        assert_eq!(id.to_string(), "60601fee-2bf1-4721-ae6f-7636e79a0cba");
    }

    #[test]
    fn test_user_id_empty() {
        assert!(matches!(validate_user_id(""), Err(TrackerError::EmptyUserId)));
        assert!(matches!(validate_user_id("   "), Err(TrackerError::EmptyUserId)));
    }

    #[test]
    fn test_user_id_not_uuid() {
        assert!(matches!(
            validate_user_id("user-42"),
            Err(TrackerError::InvalidUserId(_))
        ));
    }

    // ── validate_service_name ─────────────────────────────────────────────────

    #[test]
    fn test_service_name() {
        assert!(validate_service_name("Yandex Plus").is_ok());
        assert!(matches!(
            validate_service_name("  "),
            Err(TrackerError::InvalidServiceName)
        ));
        let long = "x".repeat(MAX_SERVICE_NAME_LEN + 1);
        assert!(matches!(
            validate_service_name(&long),
            Err(TrackerError::ServiceNameTooLong { len: 101, max: 100 })
        ));
    }

    // ── validate_price ────────────────────────────────────────────────────────

    #[test]
    fn test_price() {
        assert!(validate_price(1).is_ok());
        assert!(matches!(validate_price(0), Err(TrackerError::InvalidPrice(0))));
        assert!(matches!(validate_price(-10), Err(TrackerError::InvalidPrice(-10))));
    }

    // ── start / end dates ─────────────────────────────────────────────────────

    #[test]
    fn test_start_date() {
        assert_eq!(validate_start_date("07-2025").unwrap(), ymd(2025, 7, 1));
        assert!(matches!(
            validate_start_date("2025-07"),
            Err(TrackerError::InvalidStartDate(_))
        ));
    }

    #[test]
    fn test_end_date_absent_or_empty_is_open() {
        let start = ymd(2025, 7, 1);
        assert_eq!(validate_end_date(start, None).unwrap(), None);
        assert_eq!(validate_end_date(start, Some("")).unwrap(), None);
    }

    #[test]
    fn test_end_date_equal_to_start_allowed() {
        let start = ymd(2025, 7, 1);
        assert_eq!(validate_end_date(start, Some("07-2025")).unwrap(), Some(start));
    }

    #[test]
    fn test_end_date_before_start_rejected() {
        let start = ymd(2025, 7, 1);
        let err = validate_end_date(start, Some("06-2025")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "end date 06-2025 must not be before start date 07-2025"
        );
    }

    #[test]
    fn test_end_date_bad_format() {
        let start = ymd(2025, 7, 1);
        assert!(matches!(
            validate_end_date(start, Some("13-2025")),
            Err(TrackerError::InvalidEndDate(_))
        ));
    }

    // ── validate_subscription_id ──────────────────────────────────────────────

    #[test]
    fn test_subscription_id() {
        assert_eq!(validate_subscription_id("12").unwrap(), 12);
        assert!(validate_subscription_id("0").is_err());
        assert!(validate_subscription_id("-3").is_err());
        assert!(validate_subscription_id("abc").is_err());
    }

    // ── resolve_window ────────────────────────────────────────────────────────

    #[test]
    fn test_window_defaults() {
        let today = ymd(2025, 10, 18);
        let w = resolve_window(None, None, today).unwrap();
        assert_eq!(w, QueryWindow::until(today));
    }

    #[test]
    fn test_window_explicit_bounds() {
        let w = resolve_window(Some("01-2024"), Some("08-2024"), ymd(2025, 1, 1)).unwrap();
        assert_eq!(w.start, Some(ymd(2024, 1, 1)));
        assert_eq!(w.end, ymd(2024, 8, 1));
    }

    #[test]
    fn test_window_only_to() {
        let w = resolve_window(None, Some("08-2024"), ymd(2025, 1, 1)).unwrap();
        assert_eq!(w.start, None);
        assert_eq!(w.end, ymd(2024, 8, 1));
    }

    #[test]
    fn test_window_empty_strings_are_absent() {
        let today = ymd(2025, 1, 1);
        let w = resolve_window(Some(""), Some(""), today).unwrap();
        assert_eq!(w, QueryWindow::until(today));
    }

    #[test]
    fn test_window_reversed_rejected() {
        assert!(matches!(
            resolve_window(Some("08-2024"), Some("01-2024"), ymd(2025, 1, 1)),
            Err(TrackerError::EndDateBeforeStart { .. })
        ));
    }

    #[test]
    fn test_window_from_in_future_rejected() {
        assert!(matches!(
            resolve_window(Some("03-2026"), None, ymd(2025, 1, 1)),
            Err(TrackerError::EndDateBeforeStart { .. })
        ));
    }
}
