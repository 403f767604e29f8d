use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Direction of the monitored move, derived from the threshold sign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    PriceDrop,
    PriceSpike,
}

/// One-way lifecycle: PENDING -> TRIGGERED -> ACKNOWLEDGED.
/// Only an explicit re-arm or baseline reset returns a record to PENDING.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    Pending,
    Triggered,
    Acknowledged,
}

/// One breach observation, appended to the record history
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerEvent {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub change_percent: f64,
    pub baseline_price: f64,
}

/// Monitoring state for one tracked subject.
///
/// Created lazily on the first breach; `trigger_history` is append-only and
/// survives counter resets and re-arms.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    pub id: Uuid,
    pub subject_id: i64,
    pub symbol: String,
    pub alert_type: AlertType,
    pub status: AlertStatus,
    pub baseline_price: f64,
    /// Price seen by the most recent applied evaluation
    pub current_value: f64,
    pub threshold_value: f64,
    pub required_triggers: u32,
    pub trigger_count: u32,
    pub trigger_history: Vec<TriggerEvent>,
    /// Notification line, stamped at the PENDING -> TRIGGERED transition
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_evaluated_at: Option<DateTime<Utc>>,
    pub triggered_at: Option<DateTime<Utc>>,
    pub acknowledged_at: Option<DateTime<Utc>>,
}

impl AlertType {
    pub fn from_threshold(threshold_percent: f64) -> Self {
        if threshold_percent < 0.0 {
            AlertType::PriceDrop
        } else {
            AlertType::PriceSpike
        }
    }
}

impl AlertRecord {
    /// Deterministic notification line for the most recent breach
    pub fn trigger_message(&self) -> Option<String> {
        let event = self.trigger_history.last()?;
        let direction = match self.alert_type {
            AlertType::PriceDrop => "fell",
            AlertType::PriceSpike => "rose",
        };
        Some(format!(
            "{} {} {:.2}% from baseline {:.2} to {:.2} (breach {} of {})",
            self.symbol,
            direction,
            event.change_percent.abs(),
            event.baseline_price,
            event.price,
            self.trigger_count,
            self.required_triggers,
        ))
    }
}

/// Record counts by status across the engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSummary {
    pub pending: usize,
    pub triggered: usize,
    pub acknowledged: usize,
}
