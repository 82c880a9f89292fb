//! Domain records consumed by the analytics engine.
//!
//! All timestamps are unix epoch seconds. Every record here is owned and
//! mutated by upstream systems (gameplay server, payment processor); the
//! analytics engine only ever reads them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque player identity.
pub type PlayerId = Uuid;

/// Account creation record. `registered_at` is set once and immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    pub player_id: PlayerId,
    pub registered_at: i64,
}

/// A gameplay session. Append-only; a player may have arbitrarily many.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub player_id: PlayerId,
    pub start_time: i64,
    /// `None` while the session is still open.
    pub end_time: Option<i64>,
}

/// Purchase settlement state. Only `Completed` counts toward revenue;
/// refunds are excluded retroactively, with no negative adjustment modeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseStatus {
    Pending,
    Completed,
    Refunded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    Consumable,
    Durable,
    /// Monthly-billed recurring product; feeds MRR/ARR.
    Subscription,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub player_id: PlayerId,
    pub product_type: ProductType,
    pub price_cents: i64,
    pub status: PurchaseStatus,
    pub created_at: i64,
}

/// Free-form named application event (e.g. `"tutorial_completed"`).
/// No uniqueness constraint; counting queries use distinct-user semantics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomEvent {
    pub player_id: PlayerId,
    pub event_type: String,
    pub timestamp: i64,
}
