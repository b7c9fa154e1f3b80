// Feasibility solver capability
//
// An external collaborator may check whether a complete relabeling of a
// commitment's transitions satisfies every hard constraint. The engine never
// depends on it: failures and timeouts collapse into `Skipped`.

use crate::events::Event;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeasibilityStatus {
    Satisfiable,
    Infeasible,
    /// No solver, solver unavailable, or out of time. Carries no information.
    Skipped,
}

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("Solver backend unavailable: {0}")]
    Unavailable(String),
    #[error("Solver exceeded its {budget_ms}ms budget")]
    Timeout { budget_ms: u64 },
    #[error("Solver failed: {0}")]
    Backend(String),
}

/// Capability interface for an optional feasibility backend.
///
/// Implementations must return within `budget`; the engine calls them
/// synchronously from the commitment's worker.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait FeasibilityChecker: Send + Sync {
    fn check_feasibility(
        &self,
        commitment_id: &str,
        history: &[Event],
        budget: Duration,
    ) -> Result<FeasibilityStatus, SolverError>;
}

/// Stand-in used when no solver backend is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSolver;

impl FeasibilityChecker for NoopSolver {
    fn check_feasibility(
        &self,
        _commitment_id: &str,
        _history: &[Event],
        _budget: Duration,
    ) -> Result<FeasibilityStatus, SolverError> {
        Ok(FeasibilityStatus::Skipped)
    }
}

/// Ask `checker` about a history, degrading any failure to `Skipped`.
pub fn check_or_skip(
    checker: &dyn FeasibilityChecker,
    commitment_id: &str,
    history: &[Event],
    budget: Duration,
) -> FeasibilityStatus {
    if history.is_empty() {
        return FeasibilityStatus::Skipped;
    }
    match checker.check_feasibility(commitment_id, history, budget) {
        Ok(status) => status,
        Err(e) => {
            tracing::warn!(
                commitment_id = %commitment_id,
                error = %e,
                "Feasibility check unavailable, continuing without it"
            );
            FeasibilityStatus::Skipped
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    fn history() -> Vec<Event> {
        vec![Event::new("m1", 1, "C1", EventKind::Assign, "Bob")]
    }

    #[test]
    fn test_noop_solver_always_skips() {
        let status = check_or_skip(&NoopSolver, "C1", &history(), Duration::from_millis(10));
        assert_eq!(status, FeasibilityStatus::Skipped);
    }

    #[test]
    fn test_solver_errors_degrade_to_skipped() {
        let mut mock = MockFeasibilityChecker::new();
        mock.expect_check_feasibility()
            .returning(|_, _, budget| Err(SolverError::Timeout { budget_ms: budget.as_millis() as u64 }));

        let status = check_or_skip(&mock, "C1", &history(), Duration::from_millis(250));
        assert_eq!(status, FeasibilityStatus::Skipped);
    }

    #[test]
    fn test_solver_answer_passes_through() {
        let mut mock = MockFeasibilityChecker::new();
        mock.expect_check_feasibility()
            .withf(|id, history, _| id == "C1" && history.len() == 1)
            .times(1)
            .returning(|_, _, _| Ok(FeasibilityStatus::Infeasible));

        let status = check_or_skip(&mock, "C1", &history(), Duration::from_secs(1));
        assert_eq!(status, FeasibilityStatus::Infeasible);
    }

    #[test]
    fn test_empty_history_never_reaches_solver() {
        let mut mock = MockFeasibilityChecker::new();
        mock.expect_check_feasibility().times(0);

        let status = check_or_skip(&mock, "C1", &[], Duration::from_secs(1));
        assert_eq!(status, FeasibilityStatus::Skipped);
    }
}
