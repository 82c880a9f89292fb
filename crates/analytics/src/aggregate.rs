//! Point-in-time aggregate metrics for the operations dashboard.
//!
//! Unlike the cohort calculators, every field here is always measurable (it
//! uses only past data up to `now`), so division by zero resolves to `0`,
//! never to a null cell.

use liveops_core::config::AnalyticsConfig;
use liveops_core::LiveOpsResult;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::store::EventStore;
use crate::window::{round2, DAY_SECS};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateSnapshot {
    pub dau: u64,
    pub mau: u64,
    pub total_users: u64,
    pub paying_users: u64,
    pub total_revenue: f64,
    pub arpu: f64,
    pub arppu: f64,
    /// Paying users as a percentage of total users.
    pub conversion_rate: f64,
    /// `arppu * projection_months * margin` — a fixed documented heuristic,
    /// not a survival-model estimate. Callers must not treat it as precise.
    pub projected_ltv: f64,
    pub mrr: f64,
    pub arr: f64,
    pub churn_by_tier: Vec<TierChurn>,
    pub generated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierChurn {
    pub tier: String,
    pub size: u64,
    pub churned: u64,
    pub churn_rate: f64,
}

pub struct AggregateCalculator<'a, S: EventStore> {
    store: &'a S,
    config: AnalyticsConfig,
}

impl<'a, S: EventStore> AggregateCalculator<'a, S> {
    pub fn new(store: &'a S, config: AnalyticsConfig) -> Self {
        Self { store, config }
    }

    /// Compute the full dashboard snapshot as of `now`.
    pub fn snapshot(&self, now: i64) -> LiveOpsResult<AggregateSnapshot> {
        let dau = self
            .store
            .count_distinct_users_with_session(now - DAY_SECS, now)?;
        let mau = self
            .store
            .count_distinct_users_with_session(now - 30 * DAY_SECS, now)?;
        let total_users = self.store.count_registrations(now)?;
        let paying_users = self.store.count_distinct_users_with_completed_purchase(0)?;
        let total_revenue = self.store.sum_completed_purchase_revenue(None, Some(now))?;

        let arpu = if total_users > 0 {
            round2(total_revenue / total_users as f64)
        } else {
            0.0
        };
        // Mean of per-payer totals equals total revenue over payer count.
        let arppu = if paying_users > 0 {
            round2(total_revenue / paying_users as f64)
        } else {
            0.0
        };
        let conversion_rate = if total_users > 0 {
            round2(paying_users as f64 / total_users as f64 * 100.0)
        } else {
            0.0
        };
        let projected_ltv = round2(
            arppu * f64::from(self.config.ltv_projection_months) * self.config.ltv_margin,
        );

        // Monthly billing assumption: completed subscription purchases in
        // the trailing 30 days count as active recurring revenue.
        let mrr = round2(
            self.store
                .sum_completed_subscription_revenue(now - 30 * DAY_SECS)?,
        );
        let arr = round2(mrr * 12.0);

        let churn_by_tier = self.churn_by_tier(now)?;

        info!(dau, mau, total_users, paying_users, "computed aggregate snapshot");
        Ok(AggregateSnapshot {
            dau,
            mau,
            total_users,
            paying_users,
            total_revenue: round2(total_revenue),
            arpu,
            arppu,
            conversion_rate,
            projected_ltv,
            mrr,
            arr,
            churn_by_tier,
            generated_at: now,
        })
    }

    /// Classify payers by lifetime spend and measure recent inactivity per
    /// tier. A payer with no session in the trailing inactivity window
    /// counts as churned.
    fn churn_by_tier(&self, now: i64) -> LiveOpsResult<Vec<TierChurn>> {
        let payers = self.store.payer_totals(now)?;
        let window_start = now - i64::from(self.config.churn_inactive_days) * DAY_SECS;

        let mut tallies = [("whale", 0u64, 0u64), ("dolphin", 0, 0), ("minnow", 0, 0)];
        for (player, spend) in payers {
            let idx = if spend >= self.config.whale_threshold_usd {
                0
            } else if spend >= self.config.dolphin_threshold_usd {
                1
            } else {
                2
            };
            tallies[idx].1 += 1;
            if !self.store.has_session_in_range(player, window_start, now)? {
                tallies[idx].2 += 1;
            }
        }

        Ok(tallies
            .into_iter()
            .map(|(tier, size, churned)| TierChurn {
                tier: tier.to_string(),
                size,
                churned,
                churn_rate: if size > 0 {
                    round2(churned as f64 / size as f64 * 100.0)
                } else {
                    0.0
                },
            })
            .collect())
    }
}
