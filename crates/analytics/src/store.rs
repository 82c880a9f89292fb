//! Read-only query surface over the event store.
//!
//! The storage engine itself lives outside this crate; calculators talk to
//! it only through [`EventStore`]. Every method is a bounded read against
//! indexed timestamp ranges, independently parameterized per call — there is
//! no shared mutable statement state.

use std::collections::{BTreeMap, HashSet};

use liveops_core::types::{
    CustomEvent, PlayerId, ProductType, Purchase, PurchaseStatus, Registration, Session,
};
use liveops_core::LiveOpsResult;

/// Read-only adapter over the four logical tables: registrations, sessions,
/// purchases, and custom events.
///
/// A failed query aborts the whole computation; the engine never returns a
/// partially computed cohort table.
pub trait EventStore {
    /// Distinct users with at least one session starting in `[start, end)`.
    fn count_distinct_users_with_session(&self, start: i64, end: i64) -> LiveOpsResult<u64>;

    /// Distinct users that fired `event_type` at or after `since`.
    fn count_distinct_users_with_event(&self, event_type: &str, since: i64) -> LiveOpsResult<u64>;

    /// Distinct users with a completed purchase at or after `since`.
    fn count_distinct_users_with_completed_purchase(&self, since: i64) -> LiveOpsResult<u64>;

    /// Completed-purchase revenue in dollars, optionally restricted to one
    /// player and to purchases created strictly before `before`.
    fn sum_completed_purchase_revenue(
        &self,
        player: Option<PlayerId>,
        before: Option<i64>,
    ) -> LiveOpsResult<f64>;

    /// Registrations with `registered_at` in `[start, end)`.
    fn registrations_in_range(&self, start: i64, end: i64) -> LiveOpsResult<Vec<Registration>>;

    /// Whether `player` has any session starting in `[start, end)`.
    fn has_session_in_range(&self, player: PlayerId, start: i64, end: i64) -> LiveOpsResult<bool>;

    /// Total registrations strictly before `before`.
    fn count_registrations(&self, before: i64) -> LiveOpsResult<u64>;

    /// Lifetime completed-purchase total in dollars per paying player, as of
    /// `before`.
    fn payer_totals(&self, before: i64) -> LiveOpsResult<Vec<(PlayerId, f64)>>;

    /// Completed subscription-product revenue in dollars at or after `since`.
    fn sum_completed_subscription_revenue(&self, since: i64) -> LiveOpsResult<f64>;
}

/// In-memory [`EventStore`] over plain vectors. Serves as the executable
/// contract of the trait and as the fixture for every test in this crate.
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    registrations: Vec<Registration>,
    sessions: Vec<Session>,
    purchases: Vec<Purchase>,
    events: Vec<CustomEvent>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_registration(&mut self, player_id: PlayerId, registered_at: i64) {
        self.registrations.push(Registration {
            player_id,
            registered_at,
        });
    }

    pub fn add_session(&mut self, player_id: PlayerId, start_time: i64, end_time: Option<i64>) {
        self.sessions.push(Session {
            player_id,
            start_time,
            end_time,
        });
    }

    pub fn add_purchase(
        &mut self,
        player_id: PlayerId,
        product_type: ProductType,
        price_cents: i64,
        status: PurchaseStatus,
        created_at: i64,
    ) {
        self.purchases.push(Purchase {
            player_id,
            product_type,
            price_cents,
            status,
            created_at,
        });
    }

    pub fn add_event(&mut self, player_id: PlayerId, event_type: &str, timestamp: i64) {
        self.events.push(CustomEvent {
            player_id,
            event_type: event_type.to_string(),
            timestamp,
        });
    }

    fn completed_purchases(&self) -> impl Iterator<Item = &Purchase> {
        self.purchases
            .iter()
            .filter(|p| p.status == PurchaseStatus::Completed)
    }
}

impl EventStore for MemoryEventStore {
    fn count_distinct_users_with_session(&self, start: i64, end: i64) -> LiveOpsResult<u64> {
        let users: HashSet<PlayerId> = self
            .sessions
            .iter()
            .filter(|s| s.start_time >= start && s.start_time < end)
            .map(|s| s.player_id)
            .collect();
        Ok(users.len() as u64)
    }

    fn count_distinct_users_with_event(&self, event_type: &str, since: i64) -> LiveOpsResult<u64> {
        let users: HashSet<PlayerId> = self
            .events
            .iter()
            .filter(|e| e.event_type == event_type && e.timestamp >= since)
            .map(|e| e.player_id)
            .collect();
        Ok(users.len() as u64)
    }

    fn count_distinct_users_with_completed_purchase(&self, since: i64) -> LiveOpsResult<u64> {
        let users: HashSet<PlayerId> = self
            .completed_purchases()
            .filter(|p| p.created_at >= since)
            .map(|p| p.player_id)
            .collect();
        Ok(users.len() as u64)
    }

    fn sum_completed_purchase_revenue(
        &self,
        player: Option<PlayerId>,
        before: Option<i64>,
    ) -> LiveOpsResult<f64> {
        let cents: i64 = self
            .completed_purchases()
            .filter(|p| player.map_or(true, |id| p.player_id == id))
            .filter(|p| before.map_or(true, |b| p.created_at < b))
            .map(|p| p.price_cents)
            .sum();
        Ok(cents as f64 / 100.0)
    }

    fn registrations_in_range(&self, start: i64, end: i64) -> LiveOpsResult<Vec<Registration>> {
        Ok(self
            .registrations
            .iter()
            .filter(|r| r.registered_at >= start && r.registered_at < end)
            .copied()
            .collect())
    }

    fn has_session_in_range(&self, player: PlayerId, start: i64, end: i64) -> LiveOpsResult<bool> {
        Ok(self
            .sessions
            .iter()
            .any(|s| s.player_id == player && s.start_time >= start && s.start_time < end))
    }

    fn count_registrations(&self, before: i64) -> LiveOpsResult<u64> {
        Ok(self
            .registrations
            .iter()
            .filter(|r| r.registered_at < before)
            .count() as u64)
    }

    fn payer_totals(&self, before: i64) -> LiveOpsResult<Vec<(PlayerId, f64)>> {
        let mut totals: BTreeMap<PlayerId, i64> = BTreeMap::new();
        for p in self.completed_purchases().filter(|p| p.created_at < before) {
            *totals.entry(p.player_id).or_insert(0) += p.price_cents;
        }
        Ok(totals
            .into_iter()
            .map(|(id, cents)| (id, cents as f64 / 100.0))
            .collect())
    }

    fn sum_completed_subscription_revenue(&self, since: i64) -> LiveOpsResult<f64> {
        let cents: i64 = self
            .completed_purchases()
            .filter(|p| p.product_type == ProductType::Subscription && p.created_at >= since)
            .map(|p| p.price_cents)
            .sum();
        Ok(cents as f64 / 100.0)
    }
}
