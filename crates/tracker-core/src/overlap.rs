//! Overlap accounting: how many distinct months, and at what cost, a set of
//! subscriptions to one service was active inside a query window.
//!
//! The computation is a pure fold over the subscriptions in the order they are
//! supplied. Each subscription is clipped to the window ([`normalize`]), then
//! walked month by month ([`accumulate`]); a month already claimed by an
//! earlier subscription is neither counted nor charged again.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::models::{QueryWindow, Subscription, SubscriptionSummary};

// ── MonthKey ──────────────────────────────────────────────────────────────────

/// One calendar month. Ordered chronologically; displays as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    /// 1-based month number.
    pub month: u32,
}

impl MonthKey {
    /// The month containing `date`.
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The following calendar month.
    pub fn succ(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Number of months from `self` to `other` inclusive, or 0 if `other` is
    /// earlier.
    fn span_to(self, other: MonthKey) -> usize {
        let a = i64::from(self.year) * 12 + i64::from(self.month);
        let b = i64::from(other.year) * 12 + i64::from(other.month);
        usize::try_from(b - a + 1).unwrap_or(0)
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Running set of months already counted within one computation.
pub type MonthSet = HashSet<MonthKey>;

// ── Interval normalizer ───────────────────────────────────────────────────────

/// The part of a subscription that falls inside the query window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectiveInterval {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl EffectiveInterval {
    /// Every month the interval touches, first to last.
    pub fn months(&self) -> MonthRange {
        MonthRange::new(MonthKey::of(self.start), MonthKey::of(self.end))
    }
}

/// Clip a subscription's `[start, end]` to `window`.
///
/// An open-ended subscription runs through `window.end`. Comparisons use full
/// dates; month truncation only happens once the interval is walked.
///
/// Returns `None` when the clipped start lies after the clipped end, including
/// the case where the start is exactly one day past the end.
pub fn normalize(
    start: NaiveDate,
    end: Option<NaiveDate>,
    window: &QueryWindow,
) -> Option<EffectiveInterval> {
    let effective_start = match window.start {
        Some(window_start) => start.max(window_start),
        None => start,
    };
    let effective_end = match end {
        Some(end) => end.min(window.end),
        None => window.end,
    };

    if effective_start > effective_end
        || effective_end.checked_add_days(Days::new(1)) == Some(effective_start)
    {
        return None;
    }

    Some(EffectiveInterval {
        start: effective_start,
        end: effective_end,
    })
}

// ── Month aggregator ──────────────────────────────────────────────────────────

/// Lazy walk over consecutive months, both ends inclusive.
///
/// Once exhausted it stays exhausted.
#[derive(Debug, Clone)]
pub struct MonthRange {
    next: Option<MonthKey>,
    last: MonthKey,
}

impl MonthRange {
    pub fn new(first: MonthKey, last: MonthKey) -> Self {
        let next = (first <= last).then_some(first);
        Self { next, last }
    }
}

impl Iterator for MonthRange {
    type Item = MonthKey;

    fn next(&mut self) -> Option<MonthKey> {
        let current = self.next?;
        self.next = (current < self.last).then(|| current.succ());
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.next.map_or(0, |next| next.span_to(self.last));
        (n, Some(n))
    }
}

impl ExactSizeIterator for MonthRange {}

impl std::iter::FusedIterator for MonthRange {}

/// Add every month of `interval` to `seen`, returning how many were new.
pub fn accumulate(interval: &EffectiveInterval, seen: &mut MonthSet) -> usize {
    interval.months().filter(|month| seen.insert(*month)).count()
}

// ── Orchestration ─────────────────────────────────────────────────────────────

/// Fold `subscriptions` (in the given order) into a [`SubscriptionSummary`].
///
/// Each month is charged at the price of the first subscription that covers
/// it, so reordering overlapping subscriptions with different prices changes
/// `total_cost` but never `unique_months`. `total_cost` saturates at
/// `i64::MAX`.
pub fn compute_summary(
    subscriptions: &[Subscription],
    window: &QueryWindow,
) -> SubscriptionSummary {
    let mut seen = MonthSet::new();
    let mut unit_price: Option<i64> = None;
    let mut total_cost: i64 = 0;

    for sub in subscriptions {
        let Some(interval) = normalize(sub.start_date, sub.end_date, window) else {
            trace!(id = sub.id, "subscription outside query window");
            continue;
        };

        let added = accumulate(&interval, &mut seen);
        trace!(id = sub.id, added, "months accumulated");
        if added == 0 {
            continue;
        }

        unit_price.get_or_insert(sub.price);
        let charge = i64::try_from(added)
            .map_or(i64::MAX, |months| sub.price.saturating_mul(months));
        total_cost = total_cost.saturating_add(charge);
    }

    SubscriptionSummary {
        unit_price: unit_price.unwrap_or(0),
        total_cost,
        unique_months: seen.len(),
    }
}

/// The subscription and price a single month was charged at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthCharge {
    /// Month as `MM-YYYY`.
    pub month: String,
    pub subscription_id: u64,
    pub price: i64,
}

/// Per-month attribution behind [`compute_summary`], in calendar order.
///
/// Uses the same first-come rule, so the prices sum to `total_cost` and the
/// row count equals `unique_months`.
pub fn month_breakdown(
    subscriptions: &[Subscription],
    window: &QueryWindow,
) -> Vec<MonthCharge> {
    let mut claimed: BTreeMap<MonthKey, &Subscription> = BTreeMap::new();

    for sub in subscriptions {
        if let Some(interval) = normalize(sub.start_date, sub.end_date, window) {
            for month in interval.months() {
                claimed.entry(month).or_insert(sub);
            }
        }
    }

    claimed
        .into_iter()
        .map(|(month, sub)| MonthCharge {
            month: format!("{:02}-{:04}", month.month, month.year),
            subscription_id: sub.id,
            price: sub.price,
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
