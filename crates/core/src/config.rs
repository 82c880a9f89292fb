use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `LIVEOPS__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub analytics: AnalyticsConfig,
}

/// Tunables for the analytics engine. The LTV projection and churn tier
/// values are calibration constants, not derived quantities; treat them as
/// placeholders pending real instrumentation.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsConfig {
    /// Ceiling on the historical window any computation may reach into.
    #[serde(default = "default_max_window_days")]
    pub max_window_days: u32,
    #[serde(default = "default_lookback_days")]
    pub default_lookback_days: u32,
    #[serde(default = "default_retention_offsets")]
    pub retention_offsets: Vec<u32>,
    #[serde(default = "default_ltv_projection_months")]
    pub ltv_projection_months: u32,
    #[serde(default = "default_ltv_margin")]
    pub ltv_margin: f64,
    #[serde(default = "default_whale_threshold_usd")]
    pub whale_threshold_usd: f64,
    #[serde(default = "default_dolphin_threshold_usd")]
    pub dolphin_threshold_usd: f64,
    /// A payer with no session in this many trailing days counts as churned.
    #[serde(default = "default_churn_inactive_days")]
    pub churn_inactive_days: u32,
}

fn default_max_window_days() -> u32 { 180 }
fn default_lookback_days() -> u32 { 30 }
fn default_retention_offsets() -> Vec<u32> { vec![1, 3, 7, 14, 30] }
fn default_ltv_projection_months() -> u32 { 6 }
fn default_ltv_margin() -> f64 { 0.3 }
fn default_whale_threshold_usd() -> f64 { 100.0 }
fn default_dolphin_threshold_usd() -> f64 { 10.0 }
fn default_churn_inactive_days() -> u32 { 30 }

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            max_window_days: default_max_window_days(),
            default_lookback_days: default_lookback_days(),
            retention_offsets: default_retention_offsets(),
            ltv_projection_months: default_ltv_projection_months(),
            ltv_margin: default_ltv_margin(),
            whale_threshold_usd: default_whale_threshold_usd(),
            dolphin_threshold_usd: default_dolphin_threshold_usd(),
            churn_inactive_days: default_churn_inactive_days(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            analytics: AnalyticsConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("LIVEOPS")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
