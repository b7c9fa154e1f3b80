use crate::detector::PrecedenceError;
use crate::events::InputError;
use crate::metrics::AggregationError;
use thiserror::Error;

/// Failures that stop the analysis of a meeting.
///
/// Protocol violations are never errors; they come back as records.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Meeting '{meeting_id}' rejected: {source}")]
    Input {
        meeting_id: String,
        #[source]
        source: InputError,
    },
    #[error(transparent)]
    Aggregation(#[from] AggregationError),
    #[error("Invalid detector configuration: {0}")]
    Precedence(#[from] PrecedenceError),
}

impl EngineError {
    pub fn input(meeting_id: impl Into<String>, source: InputError) -> Self {
        EngineError::Input {
            meeting_id: meeting_id.into(),
            source,
        }
    }
}
