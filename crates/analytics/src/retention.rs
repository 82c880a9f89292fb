//! Cohort retention — fraction of each cohort with a session on the Nth day
//! after each member's own registration.

use liveops_core::LiveOpsResult;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cohort::{validate_cohort_request, CohortBuilder};
use crate::store::EventStore;
use crate::window::{
    daily_cohort_windows, day_window, has_elapsed, round2, weekly_cohort_windows, CohortWindow,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionReport {
    pub retention_days: Vec<u32>,
    pub cohorts: Vec<RetentionRow>,
}

/// One cohort row. A `None` cell means "not yet measurable" (or an empty
/// cohort), which is distinct from a measured `0.0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionRow {
    pub cohort_label: String,
    pub cohort_size: u64,
    pub retention: Vec<Option<f64>>,
}

pub struct RetentionCalculator<'a, S: EventStore> {
    store: &'a S,
    max_window_days: u32,
}

impl<'a, S: EventStore> RetentionCalculator<'a, S> {
    pub fn new(store: &'a S, max_window_days: u32) -> Self {
        Self {
            store,
            max_window_days,
        }
    }

    /// Retention for `weeks` trailing weekly cohorts at the given day
    /// offsets (typical: 1, 3, 7, 14, 30).
    pub fn weekly(&self, weeks: u32, offsets: &[u32], now: i64) -> LiveOpsResult<RetentionReport> {
        validate_cohort_request(weeks, 7, offsets, self.max_window_days)?;
        self.compute(weekly_cohort_windows(weeks, now), offsets, now)
    }

    /// Retention for `days` trailing daily cohorts.
    pub fn daily(&self, days: u32, offsets: &[u32], now: i64) -> LiveOpsResult<RetentionReport> {
        validate_cohort_request(days, 1, offsets, self.max_window_days)?;
        self.compute(daily_cohort_windows(days, now), offsets, now)
    }

    fn compute(
        &self,
        windows: Vec<CohortWindow>,
        offsets: &[u32],
        now: i64,
    ) -> LiveOpsResult<RetentionReport> {
        let mut cohorts = Vec::with_capacity(windows.len());
        for window in windows {
            let cohort = CohortBuilder::build(self.store, &window)?;
            let size = cohort.size();
            let mut retention = Vec::with_capacity(offsets.len());
            for &offset in offsets {
                // The cohort end boundary is the most conservative anchor: if
                // the day-offset window has not elapsed for a member registered
                // at the very end, the whole cell is unknown.
                if size == 0 || !has_elapsed(cohort.end, offset, now) {
                    retention.push(None);
                    continue;
                }
                let mut returned = 0u64;
                for member in &cohort.members {
                    // Anchored at the member's own registration, not the
                    // cohort boundary: members registered on different days
                    // within one weekly cohort each measure from their own
                    // day zero.
                    let (start, end) = day_window(member.registered_at, offset);
                    if self.store.has_session_in_range(member.player_id, start, end)? {
                        returned += 1;
                    }
                }
                retention.push(Some(round2(returned as f64 / size as f64 * 100.0)));
            }
            cohorts.push(RetentionRow {
                cohort_label: cohort.label,
                cohort_size: size,
                retention,
            });
        }
        info!(
            cohorts = cohorts.len(),
            offsets = offsets.len(),
            "computed retention"
        );
        Ok(RetentionReport {
            retention_days: offsets.to_vec(),
            cohorts,
        })
    }
}
