use analysis_core::AnalysisError;
use chrono::{DateTime, Utc};

use crate::models::{AlertRecord, AlertStatus, AlertType, TriggerEvent};

/// One price tick to fold into a record
#[derive(Debug, Clone, Copy)]
pub struct PriceObservation {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

/// What a single evaluation did to the record
#[derive(Debug, Clone, Copy)]
pub struct EvaluationOutcome {
    pub previous_status: AlertStatus,
    pub new_status: AlertStatus,
    pub trigger_count: u32,
    pub change_percent: f64,
    pub breached: bool,
    pub counter_reset: bool,
    /// True when the observation was ignored: stale timestamp or a record
    /// already acknowledged
    pub skipped: bool,
}

pub fn change_percent(baseline_price: f64, price: f64) -> f64 {
    (price - baseline_price) / baseline_price * 100.0
}

pub fn is_breach(alert_type: AlertType, change_percent: f64, threshold_percent: f64) -> bool {
    match alert_type {
        AlertType::PriceDrop => change_percent <= threshold_percent,
        AlertType::PriceSpike => change_percent >= threshold_percent,
    }
}

/// Fold one observation into the record.
///
/// The counter is cumulative: a miss never decrements it. It resets only
/// when a pending record sees the price cross back past baseline by at
/// least `recovery_margin_percent` in the favorable direction, which opens
/// a fresh monitoring window. Observations at or before the last evaluated
/// timestamp are skipped without touching the record, as are records that
/// have already been acknowledged.
pub fn evaluate(
    record: &mut AlertRecord,
    observation: &PriceObservation,
    recovery_margin_percent: f64,
) -> EvaluationOutcome {
    let previous_status = record.status;
    let change = change_percent(record.baseline_price, observation.price);

    let unchanged = |skipped| EvaluationOutcome {
        previous_status,
        new_status: previous_status,
        trigger_count: record.trigger_count,
        change_percent: change,
        breached: false,
        counter_reset: false,
        skipped,
    };

    if record.status == AlertStatus::Acknowledged {
        return unchanged(true);
    }
    if let Some(last) = record.last_evaluated_at {
        if observation.timestamp <= last {
            return unchanged(true);
        }
    }

    record.last_evaluated_at = Some(observation.timestamp);
    record.current_value = observation.price;

    let breached = is_breach(record.alert_type, change, record.threshold_value);
    if breached {
        record.trigger_count += 1;
        record.trigger_history.push(TriggerEvent {
            timestamp: observation.timestamp,
            price: observation.price,
            change_percent: change,
            baseline_price: record.baseline_price,
        });

        if record.status == AlertStatus::Pending
            && record.trigger_count >= record.required_triggers
        {
            record.status = AlertStatus::Triggered;
            record.triggered_at = Some(observation.timestamp);
            record.message = record.trigger_message();
        }

        return EvaluationOutcome {
            previous_status,
            new_status: record.status,
            trigger_count: record.trigger_count,
            change_percent: change,
            breached: true,
            counter_reset: false,
            skipped: false,
        };
    }

    // Recovery crossing: the price moved back past baseline by the margin
    // in the direction opposite the monitored move
    let recovered = match record.alert_type {
        AlertType::PriceDrop => change >= recovery_margin_percent,
        AlertType::PriceSpike => change <= -recovery_margin_percent,
    };
    let counter_reset =
        recovered && record.status == AlertStatus::Pending && record.trigger_count > 0;
    if counter_reset {
        record.trigger_count = 0;
    }

    EvaluationOutcome {
        previous_status,
        new_status: record.status,
        trigger_count: record.trigger_count,
        change_percent: change,
        breached: false,
        counter_reset,
        skipped: false,
    }
}

/// TRIGGERED -> ACKNOWLEDGED. Any other starting status is an error.
pub fn acknowledge(record: &mut AlertRecord, now: DateTime<Utc>) -> Result<(), AnalysisError> {
    if record.status != AlertStatus::Triggered {
        return Err(AnalysisError::InvalidStateTransition(format!(
            "cannot acknowledge alert for subject {} in status {:?}",
            record.subject_id, record.status
        )));
    }
    record.status = AlertStatus::Acknowledged;
    record.acknowledged_at = Some(now);
    Ok(())
}

/// Explicit return to PENDING with a zeroed counter. History is retained.
pub fn re_arm(record: &mut AlertRecord) -> Result<(), AnalysisError> {
    if record.status == AlertStatus::Pending {
        return Err(AnalysisError::InvalidStateTransition(format!(
            "alert for subject {} is already pending",
            record.subject_id
        )));
    }
    record.status = AlertStatus::Pending;
    record.trigger_count = 0;
    record.message = None;
    record.triggered_at = None;
    record.acknowledged_at = None;
    Ok(())
}
