//! Cohort construction — partitions players into registration-time cohorts.

use liveops_core::types::Registration;
use liveops_core::{LiveOpsError, LiveOpsResult};
use tracing::debug;

use crate::store::EventStore;
use crate::window::CohortWindow;

/// A registration-time cohort. Derived fresh per request, never persisted.
#[derive(Debug, Clone)]
pub struct Cohort {
    pub label: String,
    pub start: i64,
    pub end: i64,
    pub members: Vec<Registration>,
}

impl Cohort {
    pub fn size(&self) -> u64 {
        self.members.len() as u64
    }
}

pub struct CohortBuilder;

impl CohortBuilder {
    /// Select every identity registered inside the window. No upper bound on
    /// cohort size; callers loop per member rather than materializing joins,
    /// trading query count for bounded memory.
    pub fn build<S: EventStore>(store: &S, window: &CohortWindow) -> LiveOpsResult<Cohort> {
        let members = store.registrations_in_range(window.start, window.end)?;
        debug!(label = %window.label, size = members.len(), "built cohort");
        Ok(Cohort {
            label: window.label.clone(),
            start: window.start,
            end: window.end,
            members,
        })
    }
}

/// Shared pre-query validation for cohort-shaped requests. Runs before any
/// adapter query so a bad request never touches the store.
pub(crate) fn validate_cohort_request(
    count: u32,
    span_days: u32,
    offsets: &[u32],
    max_window_days: u32,
) -> LiveOpsResult<()> {
    if count == 0 {
        return Err(LiveOpsError::InvalidParameter(
            "cohort count must be at least 1".into(),
        ));
    }
    let window_days = u64::from(count) * u64::from(span_days);
    if window_days > u64::from(max_window_days) {
        return Err(LiveOpsError::InvalidParameter(format!(
            "cohort window of {window_days} days exceeds the {max_window_days}-day ceiling"
        )));
    }
    if offsets.is_empty() {
        return Err(LiveOpsError::InvalidParameter(
            "at least one day offset is required".into(),
        ));
    }
    if let Some(&offset) = offsets.iter().find(|&&d| d > max_window_days) {
        return Err(LiveOpsError::InvalidParameter(format!(
            "day offset {offset} exceeds the {max_window_days}-day ceiling"
        )));
    }
    Ok(())
}
