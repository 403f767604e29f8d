pub mod machine;
mod models;


use std::sync::{Arc, Mutex};

use analysis_core::{AlertConfig, AnalysisError, TrackedSubject};
use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, info};
use uuid::Uuid;

pub use machine::{EvaluationOutcome, PriceObservation};
pub use models::{AlertRecord, AlertStatus, AlertSummary, AlertType, TriggerEvent};

/// Concurrent alert store with single-writer evaluation per record.
///
/// Records are created lazily on the first breach, so subjects that never
/// cross their threshold occupy no alert state.
pub struct AlertEngine {
    config: AlertConfig,
    subjects: DashMap<i64, TrackedSubject>,
    records: DashMap<i64, Arc<Mutex<AlertRecord>>>,
}

impl AlertEngine {
    pub fn new(config: AlertConfig) -> Self {
        Self {
            config,
            subjects: DashMap::new(),
            records: DashMap::new(),
        }
    }

    /// Start monitoring a subject. Re-registering replaces the subject and
    /// discards any existing alert record.
    pub fn register(&self, subject: TrackedSubject) -> Result<(), AnalysisError> {
        if subject.baseline_price <= 0.0 {
            return Err(AnalysisError::Computation(format!(
                "baseline price must be positive, got {}",
                subject.baseline_price
            )));
        }
        if subject.threshold_percent == 0.0 {
            return Err(AnalysisError::Computation(
                "threshold must be non-zero".to_string(),
            ));
        }
        if subject.required_triggers == 0 {
            return Err(AnalysisError::Computation(
                "required triggers must be at least 1".to_string(),
            ));
        }

        let id = subject.id;
        self.records.remove(&id);
        self.subjects.insert(id, subject);
        Ok(())
    }

    /// Register with the engine-wide default threshold and trigger count
    pub fn register_with_defaults(
        &self,
        id: i64,
        symbol: &str,
        baseline_price: f64,
    ) -> Result<(), AnalysisError> {
        self.register(TrackedSubject {
            id,
            symbol: symbol.to_string(),
            baseline_price,
            threshold_percent: self.config.default_threshold_percent,
            required_triggers: self.config.default_required_triggers,
        })
    }

    /// Fold one price observation into the subject's alert state.
    pub fn evaluate(
        &self,
        subject_id: i64,
        observation: PriceObservation,
    ) -> Result<EvaluationOutcome, AnalysisError> {
        let subject = self.subjects.get(&subject_id).ok_or_else(|| {
            AnalysisError::DataUnavailable(format!("unknown subject {subject_id}"))
        })?;

        if !self.records.contains_key(&subject_id) {
            let change = machine::change_percent(subject.baseline_price, observation.price);
            let alert_type = AlertType::from_threshold(subject.threshold_percent);
            if !machine::is_breach(alert_type, change, subject.threshold_percent) {
                // Nothing breached yet: no record to create or mutate
                return Ok(EvaluationOutcome {
                    previous_status: AlertStatus::Pending,
                    new_status: AlertStatus::Pending,
                    trigger_count: 0,
                    change_percent: change,
                    breached: false,
                    counter_reset: false,
                    skipped: false,
                });
            }
            debug!(subject_id, symbol = %subject.symbol, "first breach, creating alert record");
        }

        let entry = self
            .records
            .entry(subject_id)
            .or_insert_with(|| Arc::new(Mutex::new(new_record(&subject, &observation))));
        let record = Arc::clone(entry.value());
        drop(entry);

        let mut guard = record.try_lock().map_err(|_| {
            AnalysisError::ConcurrencyConflict(format!(
                "alert record for subject {subject_id} is being evaluated"
            ))
        })?;

        let outcome = machine::evaluate(
            &mut guard,
            &observation,
            self.config.recovery_margin_percent,
        );

        if outcome.previous_status == AlertStatus::Pending
            && outcome.new_status == AlertStatus::Triggered
        {
            info!(
                subject_id,
                symbol = %guard.symbol,
                trigger_count = outcome.trigger_count,
                change_percent = outcome.change_percent,
                "alert triggered"
            );
        }

        Ok(outcome)
    }

    /// TRIGGERED -> ACKNOWLEDGED; errors from any other state, including
    /// subjects that never breached.
    pub fn acknowledge(&self, subject_id: i64) -> Result<(), AnalysisError> {
        let record = self.record_handle(subject_id)?;
        let mut guard = record.try_lock().map_err(|_| {
            AnalysisError::ConcurrencyConflict(format!(
                "alert record for subject {subject_id} is being evaluated"
            ))
        })?;
        machine::acknowledge(&mut guard, Utc::now())
    }

    /// Explicitly return a triggered or acknowledged record to PENDING
    pub fn re_arm(&self, subject_id: i64) -> Result<(), AnalysisError> {
        let record = self.record_handle(subject_id)?;
        let mut guard = record.try_lock().map_err(|_| {
            AnalysisError::ConcurrencyConflict(format!(
                "alert record for subject {subject_id} is being evaluated"
            ))
        })?;
        machine::re_arm(&mut guard)
    }

    /// Move the reference point and open a fresh monitoring window.
    /// The trigger history is retained.
    pub fn reset_baseline(
        &self,
        subject_id: i64,
        new_baseline: f64,
    ) -> Result<(), AnalysisError> {
        if new_baseline <= 0.0 {
            return Err(AnalysisError::Computation(format!(
                "baseline price must be positive, got {new_baseline}"
            )));
        }

        let mut subject = self.subjects.get_mut(&subject_id).ok_or_else(|| {
            AnalysisError::DataUnavailable(format!("unknown subject {subject_id}"))
        })?;
        subject.baseline_price = new_baseline;

        if let Some(entry) = self.records.get(&subject_id) {
            let record = Arc::clone(entry.value());
            drop(entry);
            let mut guard = record.try_lock().map_err(|_| {
                AnalysisError::ConcurrencyConflict(format!(
                    "alert record for subject {subject_id} is being evaluated"
                ))
            })?;
            guard.baseline_price = new_baseline;
            guard.status = AlertStatus::Pending;
            guard.trigger_count = 0;
            guard.message = None;
            guard.triggered_at = None;
            guard.acknowledged_at = None;
        }

        Ok(())
    }

    /// Remove the subject and whatever alert state it accumulated, legal
    /// from any status
    pub fn delete(&self, subject_id: i64) -> bool {
        let had_subject = self.subjects.remove(&subject_id).is_some();
        self.records.remove(&subject_id);
        had_subject
    }

    pub fn record(&self, subject_id: i64) -> Option<AlertRecord> {
        let entry = self.records.get(&subject_id)?;
        let record = Arc::clone(entry.value());
        drop(entry);
        let guard = record.lock().ok()?;
        Some(guard.clone())
    }

    pub fn summary(&self) -> AlertSummary {
        let mut summary = AlertSummary::default();
        for entry in self.records.iter() {
            let status = match entry.value().lock() {
                Ok(guard) => guard.status,
                Err(_) => continue,
            };
            match status {
                AlertStatus::Pending => summary.pending += 1,
                AlertStatus::Triggered => summary.triggered += 1,
                AlertStatus::Acknowledged => summary.acknowledged += 1,
            }
        }
        summary
    }

    pub fn triggered(&self) -> Vec<AlertRecord> {
        self.records
            .iter()
            .filter_map(|entry| {
                let guard = entry.value().lock().ok()?;
                (guard.status == AlertStatus::Triggered).then(|| guard.clone())
            })
            .collect()
    }

    fn record_handle(&self, subject_id: i64) -> Result<Arc<Mutex<AlertRecord>>, AnalysisError> {
        let entry = self.records.get(&subject_id).ok_or_else(|| {
            AnalysisError::InvalidStateTransition(format!(
                "subject {subject_id} has no alert record"
            ))
        })?;
        Ok(Arc::clone(entry.value()))
    }
}

impl Default for AlertEngine {
    fn default() -> Self {
        Self::new(AlertConfig::default())
    }
}

fn new_record(subject: &TrackedSubject, observation: &PriceObservation) -> AlertRecord {
    AlertRecord {
        id: Uuid::new_v4(),
        subject_id: subject.id,
        symbol: subject.symbol.clone(),
        alert_type: AlertType::from_threshold(subject.threshold_percent),
        status: AlertStatus::Pending,
        baseline_price: subject.baseline_price,
        current_value: observation.price,
        threshold_value: subject.threshold_percent,
        required_triggers: subject.required_triggers,
        trigger_count: 0,
        trigger_history: Vec::new(),
        message: None,
        created_at: observation.timestamp,
        last_evaluated_at: None,
        triggered_at: None,
        acknowledged_at: None,
    }
}
