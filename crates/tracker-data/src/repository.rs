//! Storage seam for subscriptions plus an in-memory implementation.

use chrono::NaiveDate;
use tracker_core::models::{ListSubscriptionsRequest, SortField, Subscription};
use tracker_core::{Result, TrackerError};
use uuid::Uuid;

/// A validated subscription that has not been assigned an ID yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubscription {
    pub service_name: String,
    pub price: i64,
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

impl NewSubscription {
    /// Attach a store-assigned ID.
    pub fn with_id(self, id: u64) -> Subscription {
        Subscription {
            id,
            service_name: self.service_name,
            price: self.price,
            user_id: self.user_id,
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}

/// Persistence operations the service layer depends on.
///
/// Implementations do no validation; callers hand them well-formed records.
pub trait SubscriptionRepository {
    /// Store `new` and return it with its assigned ID.
    fn create(&mut self, new: NewSubscription) -> Result<Subscription>;

    /// Look up one subscription; `Ok(None)` when absent.
    fn get(&self, id: u64) -> Result<Option<Subscription>>;

    /// Matching subscriptions after sorting and pagination, together with the
    /// number of matches before pagination.
    fn list(&self, request: &ListSubscriptionsRequest) -> Result<(usize, Vec<Subscription>)>;

    /// Replace the stored record with the same ID.
    ///
    /// Returns [`TrackerError::NotFound`] when no such record exists.
    fn update(&mut self, subscription: &Subscription) -> Result<()>;

    /// Remove a record. Returns [`TrackerError::NotFound`] when absent.
    fn delete(&mut self, id: u64) -> Result<()>;

    /// All of a user's subscriptions to one service, in ascending ID order.
    ///
    /// This order is the processing order of the overlap engine, so it must
    /// be stable across calls.
    fn find_by_user_and_service(
        &self,
        user_id: Uuid,
        service_name: &str,
    ) -> Result<Vec<Subscription>>;
}

/// Filter, sort and paginate `subscriptions` per `request`.
///
/// Ties on the sort key fall back to ascending ID so pages are deterministic.
pub fn apply_list_request(
    subscriptions: impl IntoIterator<Item = Subscription>,
    request: &ListSubscriptionsRequest,
) -> (usize, Vec<Subscription>) {
    let mut matches: Vec<Subscription> = subscriptions
        .into_iter()
        .filter(|sub| request.matches(sub))
        .collect();

    matches.sort_by(|a, b| {
        let primary = match request.sort_by {
            SortField::Id => a.id.cmp(&b.id),
            SortField::StartDate => a.start_date.cmp(&b.start_date),
            SortField::Price => a.price.cmp(&b.price),
        };
        let primary = if request.descending {
            primary.reverse()
        } else {
            primary
        };
        primary.then(a.id.cmp(&b.id))
    });

    let total = matches.len();
    let page = matches
        .into_iter()
        .skip(request.offset)
        .take(request.limit.unwrap_or(usize::MAX))
        .collect();

    (total, page)
}

// ── MemoryStore ───────────────────────────────────────────────────────────────

/// Process-local store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Vec<Subscription>,
    last_id: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl SubscriptionRepository for MemoryStore {
    fn create(&mut self, new: NewSubscription) -> Result<Subscription> {
        self.last_id += 1;
        let sub = new.with_id(self.last_id);
        self.records.push(sub.clone());
        Ok(sub)
    }

    fn get(&self, id: u64) -> Result<Option<Subscription>> {
        Ok(self.records.iter().find(|s| s.id == id).cloned())
    }

    fn list(&self, request: &ListSubscriptionsRequest) -> Result<(usize, Vec<Subscription>)> {
        Ok(apply_list_request(self.records.iter().cloned(), request))
    }

    fn update(&mut self, subscription: &Subscription) -> Result<()> {
        let slot = self
            .records
            .iter_mut()
            .find(|s| s.id == subscription.id)
            .ok_or(TrackerError::NotFound(subscription.id))?;
        *slot = subscription.clone();
        Ok(())
    }

    fn delete(&mut self, id: u64) -> Result<()> {
        let before = self.records.len();
        self.records.retain(|s| s.id != id);
        if self.records.len() == before {
            return Err(TrackerError::NotFound(id));
        }
        Ok(())
    }

    fn find_by_user_and_service(
        &self,
        user_id: Uuid,
        service_name: &str,
    ) -> Result<Vec<Subscription>> {
        let mut found: Vec<Subscription> = self
            .records
            .iter()
            .filter(|s| s.user_id == user_id && s.service_name == service_name)
            .cloned()
            .collect();
        found.sort_by_key(|s| s.id);
        Ok(found)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
