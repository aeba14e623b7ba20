use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, TrackerError};
use crate::month_year::format_month_year;

/// A recurring monthly subscription owned by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Store-assigned identifier, unique across all users.
    pub id: u64,
    /// Name of the subscribed service (e.g. `"Yandex Plus"`).
    pub service_name: String,
    /// Monthly charge, currency-unit-agnostic.
    pub price: i64,
    /// Owner of the subscription.
    pub user_id: Uuid,
    /// First active month (always the first day of that month).
    pub start_date: NaiveDate,
    /// Last active month; `None` while the subscription is ongoing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

/// Inclusive date window a summary is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryWindow {
    /// Lower bound; `None` means "from the beginning of time".
    pub start: Option<NaiveDate>,
    /// Upper bound; also the effective end of open-ended subscriptions.
    pub end: NaiveDate,
}

impl QueryWindow {
    pub fn new(start: Option<NaiveDate>, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Window with no lower bound.
    pub fn until(end: NaiveDate) -> Self {
        Self { start: None, end }
    }
}

/// Spend and activity for one user/service pair inside a [`QueryWindow`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionSummary {
    /// Price of the first subscription that contributed at least one month.
    pub unit_price: i64,
    /// Sum over contributing subscriptions of price × newly covered months.
    #[serde(rename = "total_amount")]
    pub total_cost: i64,
    /// Distinct calendar months covered by any subscription.
    #[serde(rename = "total_months")]
    pub unique_months: usize,
}

// ── Requests ──────────────────────────────────────────────────────────────────

/// Input for creating a subscription. Dates are `MM-YYYY`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub service_name: String,
    pub price: i64,
    pub user_id: String,
    pub start_date: String,
    #[serde(default)]
    pub end_date: Option<String>,
}

/// Partial update. Absent fields keep their value, except `end_date`:
/// absent or empty clears it, making the subscription open-ended.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSubscriptionRequest {
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(default)]
    pub price: Option<i64>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

/// Field a subscription listing is ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    Id,
    StartDate,
    Price,
}

impl FromStr for SortField {
    type Err = TrackerError;

    /// Accepts `"id"`, `"start_date"` and `"price"` (case-insensitive).
    fn from_str(value: &str) -> Result<Self> {
        match value.to_lowercase().as_str() {
            "id" => Ok(SortField::Id),
            "start_date" => Ok(SortField::StartDate),
            "price" => Ok(SortField::Price),
            other => Err(TrackerError::InvalidSortField(other.to_string())),
        }
    }
}

/// Filtered, paginated, sorted listing request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListSubscriptionsRequest {
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub service_name: Option<String>,
    /// Maximum page size; `None` returns every match.
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub sort_by: SortField,
    #[serde(default)]
    pub descending: bool,
}

impl ListSubscriptionsRequest {
    /// Whether `sub` passes the user and service filters.
    pub fn matches(&self, sub: &Subscription) -> bool {
        self.user_id.map_or(true, |id| sub.user_id == id)
            && self
                .service_name
                .as_deref()
                .map_or(true, |name| sub.service_name == name)
    }
}

/// Summary query. `from` / `to` are optional `MM-YYYY` bounds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryRequest {
    pub user_id: String,
    pub service_name: String,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
}

// ── Responses ─────────────────────────────────────────────────────────────────

/// External view of a subscription with `MM-YYYY` dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionResponse {
    pub id: u64,
    pub service_name: String,
    pub price: i64,
    pub user_id: String,
    pub start_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

impl From<&Subscription> for SubscriptionResponse {
    fn from(sub: &Subscription) -> Self {
        Self {
            id: sub.id,
            service_name: sub.service_name.clone(),
            price: sub.price,
            user_id: sub.user_id.to_string(),
            start_date: format_month_year(sub.start_date),
            end_date: sub.end_date.map(format_month_year),
        }
    }
}

/// One page of a listing plus the unpaginated match count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionPage {
    pub total: usize,
    pub items: Vec<SubscriptionResponse>,
}
