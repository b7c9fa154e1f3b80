// Core types for the commitment lifecycle

use crate::events::{Event, EventKind, Person};
use crate::solver::FeasibilityStatus;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Commitment states in the lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommitmentState {
    /// Referenced but never assigned
    Unassigned,
    /// Assigned, waiting for the owner to confirm
    AssignedPending,
    /// Owner confirmed the current terms
    Confirmed,
    /// Terms changed, waiting for confirmation again
    RevisedPending,
    /// Withdrawn (terminal)
    Cancelled,
    /// Done (terminal)
    Completed,
}

impl CommitmentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitmentState::Unassigned => "UNASSIGNED",
            CommitmentState::AssignedPending => "ASSIGNED_PENDING",
            CommitmentState::Confirmed => "CONFIRMED",
            CommitmentState::RevisedPending => "REVISED_PENDING",
            CommitmentState::Cancelled => "CANCELLED",
            CommitmentState::Completed => "COMPLETED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CommitmentState::Cancelled | CommitmentState::Completed)
    }

    /// Waiting on a CONFIRM since the last ASSIGN/REVISE
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            CommitmentState::AssignedPending | CommitmentState::RevisedPending
        )
    }
}

impl fmt::Display for CommitmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An unresolved who/what/when gap, opened by ASSIGN/REVISE and closed by CONFIRM
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenQuestion {
    pub commitment_id: String,
    pub raised_at_turn: u64,
    pub resolved_at_turn: Option<u64>,
}

impl OpenQuestion {
    pub fn is_open(&self) -> bool {
        self.resolved_at_turn.is_none()
    }
}

/// A tracked obligation within one meeting.
///
/// Only the worker that owns a commitment mutates it; everything else reads
/// it through the accessors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Commitment {
    id: String,
    owner: Option<Person>,
    due: Option<NaiveDate>,
    status: CommitmentState,
    history: Vec<Event>,
    stages: Vec<CommitmentState>,
    open_questions: Vec<OpenQuestion>,
    feasibility: FeasibilityStatus,
}

impl Commitment {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            owner: None,
            due: None,
            status: CommitmentState::Unassigned,
            history: Vec::new(),
            stages: vec![CommitmentState::Unassigned],
            open_questions: Vec::new(),
            feasibility: FeasibilityStatus::Skipped,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn owner(&self) -> Option<&Person> {
        self.owner.as_ref()
    }

    pub fn due(&self) -> Option<NaiveDate> {
        self.due
    }

    pub fn status(&self) -> CommitmentState {
        self.status
    }

    /// Accepted events in turn order
    pub fn history(&self) -> &[Event] {
        &self.history
    }

    /// Status before the first event followed by the status after each fed event
    pub fn stages(&self) -> &[CommitmentState] {
        &self.stages
    }

    pub fn open_questions(&self) -> &[OpenQuestion] {
        &self.open_questions
    }

    pub fn feasibility(&self) -> FeasibilityStatus {
        self.feasibility
    }

    /// Last accepted ASSIGN or REVISE
    pub fn last_assignment(&self) -> Option<&Event> {
        self.history
            .iter()
            .rev()
            .find(|e| matches!(e.kind, EventKind::Assign | EventKind::Revise))
    }

    pub(crate) fn set_feasibility(&mut self, status: FeasibilityStatus) {
        self.feasibility = status;
    }

    /// Apply the outcome of [`advance`](crate::lifecycle::advance) for `event`.
    pub(crate) fn apply(&mut self, event: &Event, next: CommitmentState, accepted: bool) {
        self.stages.push(next);
        if !accepted {
            return;
        }

        match event.kind {
            EventKind::Assign => {
                if self.owner.is_none() {
                    self.owner = Some(event.owner.clone().unwrap_or_else(|| event.speaker.clone()));
                }
                if let Some(due) = event.effective_due() {
                    self.due = Some(due);
                }
                self.raise_question(event.turn);
            }
            EventKind::Revise => {
                if let Some(due) = event.effective_due() {
                    self.due = Some(due);
                }
                self.raise_question(event.turn);
            }
            EventKind::Confirm => self.resolve_question(event.turn),
            EventKind::Cancel | EventKind::Other => {}
        }

        self.status = next;
        self.history.push(event.clone());
    }

    fn raise_question(&mut self, turn: u64) {
        if self.open_questions.iter().any(OpenQuestion::is_open) {
            return;
        }
        self.open_questions.push(OpenQuestion {
            commitment_id: self.id.clone(),
            raised_at_turn: turn,
            resolved_at_turn: None,
        });
    }

    fn resolve_question(&mut self, turn: u64) {
        if let Some(question) = self.open_questions.iter_mut().rev().find(|q| q.is_open()) {
            question.resolved_at_turn = Some(turn);
        }
    }
}
