// Per-commitment worker
//
// A worker exclusively owns one commitment and its violation buffer. Nothing
// is shared between workers; the engine merges their outcomes afterwards.

use crate::detector::{ViolationDetector, ViolationKind, ViolationRecord};
use crate::events::{Event, InputError};
use crate::lifecycle::{advance, AuthorizationPolicy, Commitment};
use crate::solver::{check_or_skip, FeasibilityChecker};
use std::time::Duration;
use tracing::debug;

/// Final state of one commitment together with its records
#[derive(Debug, Clone)]
pub struct CommitmentOutcome {
    pub commitment: Commitment,
    pub violations: Vec<ViolationRecord>,
}

pub struct CommitmentWorker<'a> {
    commitment: Commitment,
    observed: Vec<Event>,
    records: Vec<ViolationRecord>,
    last_turn: Option<u64>,
    detector: &'a ViolationDetector,
    policy: &'a AuthorizationPolicy,
}

impl<'a> CommitmentWorker<'a> {
    pub fn new(
        commitment_id: impl Into<String>,
        detector: &'a ViolationDetector,
        policy: &'a AuthorizationPolicy,
    ) -> Self {
        Self {
            commitment: Commitment::new(commitment_id),
            observed: Vec::new(),
            records: Vec::new(),
            last_turn: None,
            detector,
            policy,
        }
    }

    pub fn commitment(&self) -> &Commitment {
        &self.commitment
    }

    /// Feed the next event. Yields the reported kind when the event offends.
    pub fn feed(&mut self, event: Event) -> Result<Option<ViolationKind>, InputError> {
        if let Some(previous) = self.last_turn {
            if event.turn <= previous {
                return Err(InputError::CommitmentOutOfOrder {
                    commitment_id: self.commitment.id().to_string(),
                    previous,
                    turn: event.turn,
                });
            }
        }
        self.last_turn = Some(event.turn);

        let transition = advance(&self.commitment, &event, self.policy);
        let record = self.detector.inspect(&self.commitment, &event, &transition);
        self.commitment
            .apply(&event, transition.to, transition.accepted);

        debug!(
            commitment_id = %self.commitment.id(),
            turn = event.turn,
            act = %event.kind,
            from = %transition.from,
            to = %transition.to,
            accepted = transition.accepted,
            "Commitment event applied"
        );

        self.observed.push(event);
        let reported = record.as_ref().map(|r| r.kind);
        self.records.extend(record);
        Ok(reported)
    }

    /// Run the end-of-meeting checks and hand the commitment back.
    pub fn finish(mut self, solver: &dyn FeasibilityChecker, budget: Duration) -> CommitmentOutcome {
        self.detector.finalize(&self.commitment, &mut self.records);

        let feasibility = check_or_skip(solver, self.commitment.id(), &self.observed, budget);
        self.commitment.set_feasibility(feasibility);

        CommitmentOutcome {
            commitment: self.commitment,
            violations: self.records,
        }
    }
}
