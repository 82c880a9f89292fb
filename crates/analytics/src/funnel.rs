//! Conversion funnels — ordered milestone counts with conversion and
//! drop-off rates, plus a deterministic, clearly-flagged estimation fallback
//! for steps whose instrumentation is missing.

use dashmap::DashMap;
use liveops_core::{LiveOpsError, LiveOpsResult};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::store::EventStore;
use crate::window::{round2, DAY_SECS};

/// Where a step's distinct-user count comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepSource {
    /// Distinct users that fired the named custom event.
    Event(String),
    /// Distinct users with at least one session.
    Session,
    /// Distinct users with a completed purchase.
    CompletedPurchase,
    /// Distinct new registrations.
    Registration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunnelStepDef {
    pub name: String,
    pub source: StepSource,
    /// Calibration constant for the transition into this step, applied only
    /// when the real counter reads zero. These are domain-tuned placeholders
    /// pending real instrumentation, not statistically derived.
    pub fallback_ratio: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunnelDefinition {
    pub name: String,
    pub steps: Vec<FunnelStepDef>,
}

impl FunnelDefinition {
    /// A funnel needs at least two steps to measure a transition.
    pub fn new(name: impl Into<String>, steps: Vec<FunnelStepDef>) -> LiveOpsResult<Self> {
        if steps.len() < 2 {
            return Err(LiveOpsError::InvalidParameter(
                "funnel requires at least 2 steps".into(),
            ));
        }
        Ok(Self {
            name: name.into(),
            steps,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelReport {
    pub name: String,
    pub total_started: u64,
    pub total_completed: u64,
    pub overall_conversion: f64,
    pub steps: Vec<FunnelStepReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunnelStepReport {
    pub step: String,
    pub count: u64,
    /// Percentage of the first step's count.
    pub conversion_rate: f64,
    /// Percentage lost from the previous step, clamped to `[0, 100]`.
    pub dropoff_rate: f64,
    /// True when `count` is a heuristic substitute, never a silent blend.
    pub estimated: bool,
}

/// Registry of funnel definitions, pre-seeded with the five built-in
/// funnels. `define` replaces a definition wholesale, which is how operators
/// recalibrate fallback ratios without touching the engine.
pub struct FunnelCatalog {
    definitions: DashMap<String, FunnelDefinition>,
}

impl FunnelCatalog {
    pub fn new() -> Self {
        let catalog = Self {
            definitions: DashMap::new(),
        };
        for def in builtin_funnels() {
            catalog.define(def);
        }
        catalog
    }

    pub fn define(&self, definition: FunnelDefinition) {
        self.definitions.insert(definition.name.clone(), definition);
    }

    pub fn get(&self, name: &str) -> Option<FunnelDefinition> {
        self.definitions.get(name).map(|d| d.clone())
    }

    pub fn names(&self) -> Vec<String> {
        self.definitions.iter().map(|d| d.key().clone()).collect()
    }
}

impl Default for FunnelCatalog {
    fn default() -> Self {
        Self::new()
    }
}

pub struct FunnelEngine<'a, S: EventStore> {
    store: &'a S,
    max_window_days: u32,
}

impl<'a, S: EventStore> FunnelEngine<'a, S> {
    pub fn new(store: &'a S, max_window_days: u32) -> Self {
        Self {
            store,
            max_window_days,
        }
    }

    /// Run a funnel over a trailing lookback window ending at `now`.
    ///
    /// A step whose counter returns zero is substituted: the first step falls
    /// back to the total registrations in the window, later steps to
    /// `floor(previous * fallback_ratio)` when a ratio is configured. Every
    /// substitution is flagged `estimated` in the report.
    pub fn run(
        &self,
        definition: &FunnelDefinition,
        lookback_days: u32,
        now: i64,
    ) -> LiveOpsResult<FunnelReport> {
        validate_funnel_request(definition.steps.len(), lookback_days, self.max_window_days)?;
        let since = now - i64::from(lookback_days) * DAY_SECS;

        let mut counts: Vec<u64> = Vec::with_capacity(definition.steps.len());
        let mut estimated: Vec<bool> = Vec::with_capacity(definition.steps.len());
        for (i, step) in definition.steps.iter().enumerate() {
            let measured = self.count_step(&step.source, since, now)?;
            let (count, is_estimate) = if measured > 0 {
                (measured, false)
            } else if i == 0 {
                let base = self.store.registrations_in_range(since, now)?.len() as u64;
                warn!(
                    funnel = %definition.name,
                    step = %step.name,
                    base,
                    "first step uninstrumented; falling back to cohort size"
                );
                (base, true)
            } else if let Some(ratio) = step.fallback_ratio {
                let estimate = (counts[i - 1] as f64 * ratio).floor() as u64;
                warn!(
                    funnel = %definition.name,
                    step = %step.name,
                    ratio,
                    estimate,
                    "step counter returned zero; using calibrated estimate"
                );
                (estimate, true)
            } else {
                (0, false)
            };
            counts.push(count);
            estimated.push(is_estimate);
        }

        let step_names: Vec<&str> = definition.steps.iter().map(|s| s.name.as_str()).collect();
        let report = build_report(&definition.name, &step_names, &counts, &estimated);
        info!(
            funnel = %report.name,
            started = report.total_started,
            completed = report.total_completed,
            "computed funnel"
        );
        Ok(report)
    }

    /// Ad-hoc funnel over an ordered list of named event types. Assumed
    /// fully instrumented: no fallback heuristics are applied, so a zero
    /// mid-funnel stays a measured zero.
    pub fn run_custom(
        &self,
        name: &str,
        event_types: &[String],
        lookback_days: u32,
        now: i64,
    ) -> LiveOpsResult<FunnelReport> {
        validate_funnel_request(event_types.len(), lookback_days, self.max_window_days)?;
        let since = now - i64::from(lookback_days) * DAY_SECS;

        let mut counts = Vec::with_capacity(event_types.len());
        for event_type in event_types {
            counts.push(self.store.count_distinct_users_with_event(event_type, since)?);
        }
        let estimated = vec![false; counts.len()];
        let step_names: Vec<&str> = event_types.iter().map(String::as_str).collect();
        Ok(build_report(name, &step_names, &counts, &estimated))
    }

    fn count_step(&self, source: &StepSource, since: i64, now: i64) -> LiveOpsResult<u64> {
        match source {
            StepSource::Event(event_type) => {
                self.store.count_distinct_users_with_event(event_type, since)
            }
            StepSource::Session => self.store.count_distinct_users_with_session(since, now),
            StepSource::CompletedPurchase => {
                self.store.count_distinct_users_with_completed_purchase(since)
            }
            StepSource::Registration => {
                Ok(self.store.registrations_in_range(since, now)?.len() as u64)
            }
        }
    }
}

fn validate_funnel_request(
    step_count: usize,
    lookback_days: u32,
    max_window_days: u32,
) -> LiveOpsResult<()> {
    if step_count < 2 {
        return Err(LiveOpsError::InvalidParameter(
            "funnel requires at least 2 steps".into(),
        ));
    }
    if lookback_days == 0 {
        return Err(LiveOpsError::InvalidParameter(
            "lookback must be at least 1 day".into(),
        ));
    }
    if lookback_days > max_window_days {
        return Err(LiveOpsError::InvalidParameter(format!(
            "lookback of {lookback_days} days exceeds the {max_window_days}-day ceiling"
        )));
    }
    Ok(())
}

fn build_report(name: &str, step_names: &[&str], counts: &[u64], estimated: &[bool]) -> FunnelReport {
    let first = counts.first().copied().unwrap_or(0);
    let mut steps = Vec::with_capacity(counts.len());
    for (i, &count) in counts.iter().enumerate() {
        let conversion_rate = if first > 0 {
            round2(count as f64 / first as f64 * 100.0)
        } else {
            0.0
        };
        let dropoff_rate = if i == 0 {
            0.0
        } else {
            let prev = counts[i - 1];
            if prev == 0 {
                0.0
            } else {
                // Growth between steps signals an instrumentation anomaly;
                // clamp instead of reporting negative churn.
                round2(((prev as f64 - count as f64) / prev as f64 * 100.0).max(0.0))
            }
        };
        steps.push(FunnelStepReport {
            step: step_names[i].to_string(),
            count,
            conversion_rate,
            dropoff_rate,
            estimated: estimated[i],
        });
    }
    FunnelReport {
        name: name.to_string(),
        total_started: first,
        total_completed: counts.last().copied().unwrap_or(0),
        overall_conversion: steps.last().map_or(0.0, |s| s.conversion_rate),
        steps,
    }
}

fn step(name: &str, source: StepSource, fallback_ratio: Option<f64>) -> FunnelStepDef {
    FunnelStepDef {
        name: name.to_string(),
        source,
        fallback_ratio,
    }
}

fn event_step(name: &str, event_type: &str, fallback_ratio: f64) -> FunnelStepDef {
    step(name, StepSource::Event(event_type.to_string()), Some(fallback_ratio))
}

/// The five built-in dashboard funnels. Fallback ratios are calibration
/// placeholders carried over from the live-ops dashboards.
fn builtin_funnels() -> Vec<FunnelDefinition> {
    vec![
        FunnelDefinition {
            name: "tutorial".to_string(),
            steps: vec![
                step("registered", StepSource::Registration, None),
                event_step("tutorial_started", "tutorial_started", 0.9),
                event_step("tutorial_midpoint", "tutorial_midpoint", 0.85),
                event_step("tutorial_completed", "tutorial_completed", 0.6),
                event_step("first_match_played", "match_started", 0.5),
            ],
        },
        FunnelDefinition {
            name: "purchase".to_string(),
            steps: vec![
                step("active_player", StepSource::Session, None),
                event_step("store_opened", "store_opened", 0.6),
                event_step("offer_viewed", "offer_viewed", 0.85),
                event_step("checkout_started", "checkout_started", 0.35),
                step(
                    "purchase_completed",
                    StepSource::CompletedPurchase,
                    Some(0.7),
                ),
            ],
        },
        FunnelDefinition {
            name: "subscription".to_string(),
            steps: vec![
                step("active_player", StepSource::Session, None),
                event_step("subscription_page_viewed", "subscription_page_viewed", 0.25),
                event_step("trial_started", "trial_started", 0.3),
                event_step("subscription_started", "subscription_started", 0.6),
                event_step("subscription_renewed", "subscription_renewed", 0.7),
            ],
        },
        FunnelDefinition {
            name: "social".to_string(),
            steps: vec![
                step("active_player", StepSource::Session, None),
                event_step("friend_search", "friend_search", 0.4),
                event_step("friend_request_sent", "friend_request_sent", 0.7),
                event_step("friend_added", "friend_added", 0.8),
                event_step("clan_joined", "clan_joined", 0.3),
                event_step("chat_message_sent", "chat_message_sent", 0.9),
            ],
        },
        FunnelDefinition {
            name: "ranked".to_string(),
            steps: vec![
                step("active_player", StepSource::Session, None),
                event_step("ranked_unlocked", "ranked_unlocked", 0.5),
                event_step("ranked_match_started", "ranked_match_started", 0.8),
                event_step("ranked_match_completed", "ranked_match_completed", 0.9),
                event_step("rank_promoted", "rank_promoted", 0.4),
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryEventStore;
    use uuid::Uuid;

    const NOW: i64 = 1_700_000_000;
    const LOOKBACK: u32 = 30;

    fn seed_event_users(store: &mut MemoryEventStore, event_type: &str, count: usize) {
        for _ in 0..count {
            store.add_event(Uuid::new_v4(), event_type, NOW - 1000);
        }
    }

    fn four_step_definition() -> FunnelDefinition {
        FunnelDefinition {
            name: "checkout".to_string(),
            steps: vec![
                event_step("landed", "landed", 0.9),
                event_step("browsed", "browsed", 0.9),
                event_step("carted", "carted", 0.85),
                event_step("paid", "paid", 0.6),
            ],
        }
    }

    #[test]
    fn missing_mid_step_is_estimated_from_the_prior_step() {
        let mut store = MemoryEventStore::new();
        seed_event_users(&mut store, "landed", 1000);
        seed_event_users(&mut store, "browsed", 900);
        // "carted" has no instrumentation at all.
        seed_event_users(&mut store, "paid", 300);

        let engine = FunnelEngine::new(&store, 180);
        let report = engine.run(&four_step_definition(), LOOKBACK, NOW).unwrap();

        let counts: Vec<u64> = report.steps.iter().map(|s| s.count).collect();
        assert_eq!(counts, vec![1000, 900, 765, 300]);

        let estimated: Vec<bool> = report.steps.iter().map(|s| s.estimated).collect();
        assert_eq!(estimated, vec![false, false, true, false]);

        assert_eq!(report.steps[0].conversion_rate, 100.0);
        assert_eq!(report.steps[0].dropoff_rate, 0.0);
        assert_eq!(report.steps[2].dropoff_rate, 15.0);
        assert_eq!(report.steps[3].dropoff_rate, 60.78);
        assert_eq!(report.total_started, 1000);
        assert_eq!(report.total_completed, 300);
        assert_eq!(report.overall_conversion, 30.0);
    }

    #[test]
    fn first_step_falls_back_to_registration_count() {
        let mut store = MemoryEventStore::new();
        for _ in 0..50 {
            store.add_registration(Uuid::new_v4(), NOW - 1000);
        }
        seed_event_users(&mut store, "browsed", 20);

        let definition = FunnelDefinition {
            name: "partial".to_string(),
            steps: vec![
                event_step("landed", "landed", 0.9),
                event_step("browsed", "browsed", 0.9),
            ],
        };

        let engine = FunnelEngine::new(&store, 180);
        let report = engine.run(&definition, LOOKBACK, NOW).unwrap();
        assert_eq!(report.steps[0].count, 50);
        assert!(report.steps[0].estimated);
        assert_eq!(report.steps[1].count, 20);
        assert!(!report.steps[1].estimated);
    }

    #[test]
    fn growth_between_steps_clamps_dropoff_to_zero() {
        let mut store = MemoryEventStore::new();
        seed_event_users(&mut store, "landed", 10);
        seed_event_users(&mut store, "browsed", 20);

        let definition = FunnelDefinition {
            name: "anomalous".to_string(),
            steps: vec![
                event_step("landed", "landed", 0.9),
                event_step("browsed", "browsed", 0.9),
            ],
        };

        let engine = FunnelEngine::new(&store, 180);
        let report = engine.run(&definition, LOOKBACK, NOW).unwrap();
        assert_eq!(report.steps[1].dropoff_rate, 0.0);
        assert_eq!(report.steps[1].conversion_rate, 200.0);
    }

    #[test]
    fn custom_funnels_apply_no_fallback() {
        let mut store = MemoryEventStore::new();
        seed_event_users(&mut store, "quest_accepted", 100);
        // "quest_midpoint" uninstrumented, "quest_completed" measured.
        seed_event_users(&mut store, "quest_completed", 10);

        let engine = FunnelEngine::new(&store, 180);
        let steps = vec![
            "quest_accepted".to_string(),
            "quest_midpoint".to_string(),
            "quest_completed".to_string(),
        ];
        let report = engine.run_custom("quests", &steps, LOOKBACK, NOW).unwrap();

        assert_eq!(report.steps[1].count, 0);
        assert!(!report.steps[1].estimated);
        assert_eq!(report.steps[1].dropoff_rate, 100.0);
        // Previous step count is zero, so drop-off resolves to 0, not NaN.
        assert_eq!(report.steps[2].dropoff_rate, 0.0);
        assert_eq!(report.steps[2].conversion_rate, 10.0);
    }

    #[test]
    fn single_step_funnel_is_rejected_before_any_query() {
        let store = MemoryEventStore::new();
        let engine = FunnelEngine::new(&store, 180);
        let result = engine.run_custom("tiny", &["only_step".to_string()], LOOKBACK, NOW);
        assert!(matches!(result, Err(LiveOpsError::InvalidParameter(_))));
    }

    #[test]
    fn zero_lookback_is_rejected() {
        let store = MemoryEventStore::new();
        let engine = FunnelEngine::new(&store, 180);
        let steps = vec!["a".to_string(), "b".to_string()];
        let result = engine.run_custom("zero", &steps, 0, NOW);
        assert!(matches!(result, Err(LiveOpsError::InvalidParameter(_))));
    }

    #[test]
    fn lookback_beyond_the_ceiling_is_rejected() {
        let store = MemoryEventStore::new();
        let engine = FunnelEngine::new(&store, 180);
        let catalog = FunnelCatalog::new();
        let definition = catalog.get("tutorial").unwrap();

        let result = engine.run(&definition, 10_000, NOW);
        assert!(matches!(result, Err(LiveOpsError::InvalidParameter(_))));

        let steps = vec!["a".to_string(), "b".to_string()];
        let result = engine.run_custom("deep", &steps, 181, NOW);
        assert!(matches!(result, Err(LiveOpsError::InvalidParameter(_))));
        assert!(engine.run_custom("ok", &steps, 180, NOW).is_ok());
    }

    #[test]
    fn definition_constructor_requires_two_steps() {
        let result = FunnelDefinition::new("tiny", vec![step("a", StepSource::Session, None)]);
        assert!(matches!(result, Err(LiveOpsError::InvalidParameter(_))));
    }

    #[test]
    fn catalog_seeds_the_five_builtin_funnels() {
        let catalog = FunnelCatalog::new();
        let mut names = catalog.names();
        names.sort();
        assert_eq!(
            names,
            vec!["purchase", "ranked", "social", "subscription", "tutorial"]
        );
        for name in names {
            let definition = catalog.get(&name).unwrap();
            assert!(definition.steps.len() >= 5);
            // Every non-first step of a built-in carries a calibration ratio.
            assert!(definition.steps[1..]
                .iter()
                .all(|s| s.fallback_ratio.is_some()));
        }
    }

    #[test]
    fn empty_funnel_on_empty_store_reports_zeros() {
        let store = MemoryEventStore::new();
        let engine = FunnelEngine::new(&store, 180);
        let catalog = FunnelCatalog::new();
        let definition = catalog.get("tutorial").unwrap();

        let report = engine.run(&definition, LOOKBACK, NOW).unwrap();
        assert_eq!(report.total_started, 0);
        assert_eq!(report.overall_conversion, 0.0);
        for s in &report.steps {
            assert_eq!(s.count, 0);
            assert_eq!(s.conversion_rate, 0.0);
            assert_eq!(s.dropoff_rate, 0.0);
        }
    }
}
