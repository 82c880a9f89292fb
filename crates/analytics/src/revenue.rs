//! Cohort revenue and lifetime value — cumulative completed-purchase revenue
//! attributable to cohort members as of each day offset.

use liveops_core::LiveOpsResult;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::cohort::{validate_cohort_request, CohortBuilder};
use crate::store::EventStore;
use crate::window::{
    daily_cohort_windows, has_elapsed, round2, weekly_cohort_windows, CohortWindow, DAY_SECS,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueReport {
    pub revenue_days: Vec<u32>,
    pub cohorts: Vec<RevenueRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueRow {
    pub cohort_label: String,
    pub cohort_size: u64,
    pub revenue: Vec<Option<f64>>,
    pub ltv: Vec<Option<f64>>,
}

pub struct RevenueCalculator<'a, S: EventStore> {
    store: &'a S,
    max_window_days: u32,
}

impl<'a, S: EventStore> RevenueCalculator<'a, S> {
    pub fn new(store: &'a S, max_window_days: u32) -> Self {
        Self {
            store,
            max_window_days,
        }
    }

    /// Cumulative revenue and LTV for `weeks` trailing weekly cohorts.
    pub fn weekly(&self, weeks: u32, offsets: &[u32], now: i64) -> LiveOpsResult<RevenueReport> {
        validate_cohort_request(weeks, 7, offsets, self.max_window_days)?;
        self.compute(weekly_cohort_windows(weeks, now), offsets, now)
    }

    /// Cumulative revenue and LTV for `days` trailing daily cohorts.
    pub fn daily(&self, days: u32, offsets: &[u32], now: i64) -> LiveOpsResult<RevenueReport> {
        validate_cohort_request(days, 1, offsets, self.max_window_days)?;
        self.compute(daily_cohort_windows(days, now), offsets, now)
    }

    fn compute(
        &self,
        windows: Vec<CohortWindow>,
        offsets: &[u32],
        now: i64,
    ) -> LiveOpsResult<RevenueReport> {
        let mut cohorts = Vec::with_capacity(windows.len());
        for window in windows {
            let cohort = CohortBuilder::build(self.store, &window)?;
            let size = cohort.size();
            let mut revenue = Vec::with_capacity(offsets.len());
            let mut ltv = Vec::with_capacity(offsets.len());
            for &offset in offsets {
                // Same null rule as retention, evaluated against the cohort
                // end boundary (the most conservative member).
                if size == 0 || !has_elapsed(cohort.end, offset, now) {
                    revenue.push(None);
                    ltv.push(None);
                    continue;
                }
                let mut total = 0.0;
                for member in &cohort.members {
                    // Cumulative since registration: the upper bound only
                    // grows with the offset, so per-member values are
                    // monotonic by construction.
                    let cutoff = member.registered_at + i64::from(offset) * DAY_SECS;
                    total += self
                        .store
                        .sum_completed_purchase_revenue(Some(member.player_id), Some(cutoff))?;
                }
                revenue.push(Some(round2(total)));
                ltv.push(Some(round2(total / size as f64)));
            }
            cohorts.push(RevenueRow {
                cohort_label: cohort.label,
                cohort_size: size,
                revenue,
                ltv,
            });
        }
        info!(
            cohorts = cohorts.len(),
            offsets = offsets.len(),
            "computed revenue/ltv"
        );
        Ok(RevenueReport {
            revenue_days: offsets.to_vec(),
            cohorts,
        })
    }
}
