// Commitment Consistency Library - commitment lifecycle checking for meeting transcripts
// This exposes the core components for testing and integration

pub mod config;
pub mod detector;
pub mod engine;
pub mod errors;
pub mod events;
pub mod lifecycle;
pub mod metrics;
pub mod observability;
pub mod solver;
pub mod telemetry;

// Re-export key types for easy access
pub use config::EngineSettings;
pub use detector::{Precedence, Severity, ViolationDetector, ViolationKind, ViolationRecord};
pub use engine::{BatchAnalysis, Engine, EngineConfig, MeetingAnalysis, MeetingFailure};
pub use errors::EngineError;
pub use events::{validate_meeting, Event, EventKind, InputError, MeetingRecord, Person};
pub use lifecycle::{advance, replay, AuthorizationPolicy, Commitment, CommitmentState, Transition};
pub use metrics::{summarize, summarize_batch, BatchSummary, MeetingSummary, TypeBreakdown};
pub use observability::OperationTimer;
pub use solver::{FeasibilityChecker, FeasibilityStatus, NoopSolver, SolverError};
pub use telemetry::{create_meeting_span, generate_correlation_id, init_telemetry};
