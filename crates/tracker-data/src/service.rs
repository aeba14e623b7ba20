//! Subscription service: validation in front of storage, and the summary
//! pipeline in front of the overlap engine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use tracker_core::models::{
    CreateSubscriptionRequest, ListSubscriptionsRequest, QueryWindow, Subscription,
    SubscriptionSummary, SummaryRequest, UpdateSubscriptionRequest,
};
use tracker_core::month_year::{format_month_year, TimezoneHandler};
use tracker_core::overlap::{compute_summary, month_breakdown, MonthCharge};
use tracker_core::validation::{
    resolve_window, validate_end_date, validate_price, validate_service_name,
    validate_start_date, validate_user_id,
};
use tracker_core::{Result, TrackerError};

use crate::repository::{NewSubscription, SubscriptionRepository};

/// A summary together with the window it was computed over and, optionally,
/// the per-month attribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryReport {
    #[serde(flatten)]
    pub summary: SubscriptionSummary,
    /// Window start as `MM-YYYY`; absent when unbounded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Window end as `MM-YYYY`.
    pub to: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub months: Vec<MonthCharge>,
}

/// Business operations on subscriptions, generic over the storage backend.
pub struct SubscriptionService<R> {
    repo: R,
    timezone: TimezoneHandler,
}

impl<R: SubscriptionRepository> SubscriptionService<R> {
    /// `timezone` decides which calendar day "now" is for open-ended windows.
    pub fn new(repo: R, timezone: TimezoneHandler) -> Self {
        Self { repo, timezone }
    }

    /// Borrow the underlying repository.
    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Validate and store a new subscription.
    pub fn create(&mut self, request: &CreateSubscriptionRequest) -> Result<Subscription> {
        let user_id = validate_user_id(&request.user_id)?;
        validate_service_name(&request.service_name)?;
        validate_price(request.price)?;
        let start_date = validate_start_date(&request.start_date)?;
        let end_date = validate_end_date(start_date, request.end_date.as_deref())?;

        let sub = self.repo.create(NewSubscription {
            service_name: request.service_name.clone(),
            price: request.price,
            user_id,
            start_date,
            end_date,
        })?;
        info!(
            id = sub.id,
            user_id = %sub.user_id,
            service = %sub.service_name,
            "subscription created"
        );
        Ok(sub)
    }

    /// Fetch one subscription or fail with [`TrackerError::NotFound`].
    pub fn get(&self, id: u64) -> Result<Subscription> {
        self.repo.get(id)?.ok_or(TrackerError::NotFound(id))
    }

    pub fn list(&self, request: &ListSubscriptionsRequest) -> Result<(usize, Vec<Subscription>)> {
        self.repo.list(request)
    }

    /// Apply a partial update.
    ///
    /// Provided fields are validated and replaced. The end date is always
    /// re-derived from the request: absent or empty makes the subscription
    /// open-ended, otherwise it must not precede the (possibly new) start.
    pub fn update(&mut self, id: u64, request: &UpdateSubscriptionRequest) -> Result<Subscription> {
        let mut sub = self.get(id)?;

        if let Some(name) = request.service_name.as_deref().filter(|n| !n.is_empty()) {
            validate_service_name(name)?;
            sub.service_name = name.to_string();
        }
        if let Some(start) = request.start_date.as_deref().filter(|s| !s.is_empty()) {
            sub.start_date = validate_start_date(start)?;
        }
        if let Some(price) = request.price {
            validate_price(price)?;
            sub.price = price;
        }
        sub.end_date = validate_end_date(sub.start_date, request.end_date.as_deref())?;

        self.repo.update(&sub)?;
        info!(id, "subscription updated");
        Ok(sub)
    }

    /// Delete a subscription, failing with [`TrackerError::NotFound`] when it
    /// does not exist.
    pub fn delete(&mut self, id: u64) -> Result<()> {
        let sub = self.get(id)?;
        self.repo.delete(sub.id)?;
        info!(id, "subscription deleted");
        Ok(())
    }

    /// Spend summary with the window end defaulting to today.
    pub fn summary(&self, request: &SummaryRequest) -> Result<SubscriptionSummary> {
        self.summary_as_of(request, self.timezone.today())
    }

    /// Spend summary with an explicit "today".
    pub fn summary_as_of(
        &self,
        request: &SummaryRequest,
        today: NaiveDate,
    ) -> Result<SubscriptionSummary> {
        let (window, subscriptions) = self.load_for_summary(request, today)?;
        let summary = compute_summary(&subscriptions, &window);

        info!(
            user_id = %request.user_id,
            service = %request.service_name,
            total_months = summary.unique_months,
            total_cost = summary.total_cost,
            "subscription metrics"
        );
        Ok(summary)
    }

    /// Summary plus window bounds and, when `with_breakdown`, the month-by-month
    /// attribution.
    pub fn report_as_of(
        &self,
        request: &SummaryRequest,
        today: NaiveDate,
        with_breakdown: bool,
    ) -> Result<SummaryReport> {
        let (window, subscriptions) = self.load_for_summary(request, today)?;
        let summary = compute_summary(&subscriptions, &window);
        let months = if with_breakdown {
            month_breakdown(&subscriptions, &window)
        } else {
            Vec::new()
        };

        info!(
            user_id = %request.user_id,
            service = %request.service_name,
            total_months = summary.unique_months,
            total_cost = summary.total_cost,
            "subscription metrics"
        );
        Ok(SummaryReport {
            summary,
            from: window.start.map(format_month_year),
            to: format_month_year(window.end),
            months,
        })
    }

    /// [`Self::report_as_of`] using today's date in the configured timezone.
    pub fn report(&self, request: &SummaryRequest, with_breakdown: bool) -> Result<SummaryReport> {
        self.report_as_of(request, self.timezone.today(), with_breakdown)
    }

    fn load_for_summary(
        &self,
        request: &SummaryRequest,
        today: NaiveDate,
    ) -> Result<(QueryWindow, Vec<Subscription>)> {
        let user_id = validate_user_id(&request.user_id)?;
        validate_service_name(&request.service_name)?;
        let window = resolve_window(request.from.as_deref(), request.to.as_deref(), today)?;
        let subscriptions = self
            .repo
            .find_by_user_and_service(user_id, &request.service_name)?;
        Ok((window, subscriptions))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
