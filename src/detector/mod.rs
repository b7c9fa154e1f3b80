// Violation Detector - classifies offending events into typed records

pub mod hints;
pub mod rules;
pub mod types;

pub use hints::remediation_hint;
pub use rules::ViolationDetector;
pub use types::{
    Precedence, PrecedenceError, Severity, UnknownViolationKind, ViolationKind, ViolationRecord,
};
