//! Validation configuration
//!
//! Field names, synonym sets, sample cap and anomaly thresholds used by the
//! fixed check set. Every field has a default, so a TOML file only needs the
//! keys it wants to override.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default time column of the event exports.
pub const DEFAULT_TIME_FIELD: &str = "event_timestamp";

/// Check configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DqConfig {
    /// Column holding the event time.
    #[serde(default = "default_time_field")]
    pub time_field: String,

    /// Maximum rows per sample list and per sample file.
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,

    /// Also write every flagged row, unsampled.
    #[serde(default)]
    pub full_output: bool,

    /// Columns that must exist in the schema. The time field is always required
    /// on top of these.
    #[serde(default = "default_required_fields")]
    pub required_fields: Vec<String>,

    /// Columns whose nulls are counted.
    #[serde(default = "default_null_count_fields")]
    pub null_count_fields: Vec<String>,

    #[serde(default = "default_transaction_field")]
    pub transaction_field: String,

    #[serde(default = "default_revenue_field")]
    pub revenue_field: String,

    /// Column holding serialized JSON event properties.
    #[serde(default = "default_properties_field")]
    pub properties_field: String,

    #[serde(default = "default_event_name_field")]
    pub event_name_field: String,

    #[serde(default = "default_primary_identity_field")]
    pub primary_identity_field: String,

    #[serde(default = "default_secondary_identity_field")]
    pub secondary_identity_field: String,

    #[serde(default = "default_currency_field")]
    pub currency_field: String,

    /// Column whose per-day distinct count is watched for spikes.
    #[serde(default = "default_cardinality_field")]
    pub cardinality_field: String,

    /// Time column for cardinality buckets (`None` = `time_field`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cardinality_time_field: Option<String>,

    /// Volume buckets further than this many standard deviations from the
    /// mean are anomalies.
    #[serde(default = "default_volume_sigma")]
    pub volume_sigma: f64,

    /// Day-over-day distinct-count growth (percent) above which a bucket is a spike.
    #[serde(default = "default_cardinality_growth_pct")]
    pub cardinality_growth_pct: f64,

    /// Event names that satisfy the sequence prerequisite (case-insensitive).
    #[serde(default = "default_prerequisite_events")]
    pub prerequisite_events: Vec<String>,

    /// Event names that require a prior prerequisite (case-insensitive).
    #[serde(default = "default_terminal_events")]
    pub terminal_events: Vec<String>,
}

fn default_time_field() -> String {
    DEFAULT_TIME_FIELD.to_string()
}
fn default_sample_size() -> usize {
    100
}
fn default_required_fields() -> Vec<String> {
    vec!["event_name".to_string()]
}
fn default_null_count_fields() -> Vec<String> {
    ["user_id", "client_id", "transaction_id", "value", "currency", "product_id"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_transaction_field() -> String {
    "transaction_id".to_string()
}
fn default_revenue_field() -> String {
    "value".to_string()
}
fn default_properties_field() -> String {
    "event_properties".to_string()
}
fn default_event_name_field() -> String {
    "event_name".to_string()
}
fn default_primary_identity_field() -> String {
    "user_id".to_string()
}
fn default_secondary_identity_field() -> String {
    "client_id".to_string()
}
fn default_currency_field() -> String {
    "currency".to_string()
}
fn default_cardinality_field() -> String {
    "user_id".to_string()
}
fn default_volume_sigma() -> f64 {
    3.0
}
fn default_cardinality_growth_pct() -> f64 {
    100.0
} // more than doubling
fn default_prerequisite_events() -> Vec<String> {
    ["add_to_cart", "add_to_cart_item", "add_to_cart_event"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_terminal_events() -> Vec<String> {
    ["purchase", "transaction", "order_complete"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for DqConfig {
    fn default() -> Self {
        Self {
            time_field: default_time_field(),
            sample_size: default_sample_size(),
            full_output: false,
            required_fields: default_required_fields(),
            null_count_fields: default_null_count_fields(),
            transaction_field: default_transaction_field(),
            revenue_field: default_revenue_field(),
            properties_field: default_properties_field(),
            event_name_field: default_event_name_field(),
            primary_identity_field: default_primary_identity_field(),
            secondary_identity_field: default_secondary_identity_field(),
            currency_field: default_currency_field(),
            cardinality_field: default_cardinality_field(),
            cardinality_time_field: None,
            volume_sigma: default_volume_sigma(),
            cardinality_growth_pct: default_cardinality_growth_pct(),
            prerequisite_events: default_prerequisite_events(),
            terminal_events: default_terminal_events(),
        }
    }
}

impl DqConfig {
    /// Load from TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load from `DQ_CONFIG_PATH` (default `dq_config.toml`), falling back to defaults.
    pub fn from_env() -> Self {
        let path =
            std::env::var("DQ_CONFIG_PATH").unwrap_or_else(|_| "dq_config.toml".to_string());

        Self::load(&path).unwrap_or_else(|e| {
            tracing::debug!("Using default dq config ({}): {}", path, e);
            Self::default()
        })
    }

    /// Required columns: the configured list plus the time field, without repeats.
    pub fn required_columns(&self) -> Vec<String> {
        let mut required = self.required_fields.clone();
        if !required.contains(&self.time_field) {
            required.push(self.time_field.clone());
        }
        required
    }

    pub fn cardinality_time_field(&self) -> &str {
        self.cardinality_time_field
            .as_deref()
            .unwrap_or(&self.time_field)
    }

    /// Every timestamp column some check reads; the cache is built for these.
    pub fn timestamp_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.time_field.as_str()];
        let cardinality = self.cardinality_time_field();
        if cardinality != self.time_field {
            fields.push(cardinality);
        }
        fields
    }
}
