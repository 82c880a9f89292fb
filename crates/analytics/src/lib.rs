//! Derived analytics over raw gameplay/commerce event logs — cohort
//! retention, cumulative LTV curves, conversion funnels, and point-in-time
//! aggregate metrics for the operations dashboard.
//!
//! The engine is strictly read-only: every calculator pulls raw counts from
//! an [`EventStore`] adapter and recomputes its result from source tables on
//! each request. Nothing is cached; freshness over speed.

pub mod aggregate;
pub mod cohort;
pub mod funnel;
pub mod retention;
pub mod revenue;
pub mod store;
pub mod window;

pub use aggregate::{AggregateCalculator, AggregateSnapshot, TierChurn};
pub use cohort::{Cohort, CohortBuilder};
pub use funnel::{
    FunnelCatalog, FunnelDefinition, FunnelEngine, FunnelReport, FunnelStepDef, StepSource,
};
pub use retention::{RetentionCalculator, RetentionReport};
pub use revenue::{RevenueCalculator, RevenueReport};
pub use store::{EventStore, MemoryEventStore};
pub use window::{day_window, has_elapsed, CohortWindow};
