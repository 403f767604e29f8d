use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The ingestion collaborator has nothing for the requested range
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    /// An engine received fewer points than its minimum window
    #[error("Insufficient history: need {required} points, got {actual}")]
    InsufficientHistory { required: usize, actual: usize },

    /// A numeric guard fired where no sentinel value was possible
    #[error("Computation error: {0}")]
    Computation(String),

    /// An alert action that is not legal from the record's current status
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    /// Two writers raced on the same record, or a newer analysis request
    /// superseded this one
    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),
}

impl AnalysisError {
    /// Whether the orchestrator may recover this error into a
    /// section-unavailable marker instead of failing the whole run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AnalysisError::DataUnavailable(_)
                | AnalysisError::InsufficientHistory { .. }
                | AnalysisError::Computation(_)
        )
    }
}
