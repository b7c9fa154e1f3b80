// Violation rules and tie-breaking
//
// Every rule is evaluated against the commitment as it stood before the
// event. The state machine contributes what it flagged; the rules here add the
// history-based cancel classifications. One record per offending event
// survives the precedence order.

use crate::detector::hints::remediation_hint;
use crate::detector::types::{Precedence, ViolationKind, ViolationRecord};
use crate::events::{Event, EventKind};
use crate::lifecycle::{Commitment, CommitmentState, Transition};
use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct ViolationDetector {
    precedence: Precedence,
}

impl ViolationDetector {
    pub fn new(precedence: Precedence) -> Self {
        Self { precedence }
    }

    /// Every kind matching `event`, in evaluation order, without duplicates
    pub fn candidates(
        &self,
        before: &Commitment,
        event: &Event,
        transition: &Transition,
    ) -> Vec<ViolationKind> {
        let mut kinds = transition.flagged.clone();

        if event.kind == EventKind::Cancel {
            let cancel_rule = match before.status() {
                CommitmentState::Cancelled => Some(ViolationKind::DuplicateCancel),
                CommitmentState::Unassigned => Some(ViolationKind::CancelWithoutAssignment),
                CommitmentState::AssignedPending | CommitmentState::RevisedPending => {
                    Some(ViolationKind::CancelBeforeConfirmation)
                }
                CommitmentState::Confirmed | CommitmentState::Completed => None,
            };
            if let Some(kind) = cancel_rule {
                if !kinds.contains(&kind) {
                    kinds.push(kind);
                }
            }
        }

        kinds
    }

    /// Classify one fed event. `before` is the commitment prior to applying it.
    pub fn inspect(
        &self,
        before: &Commitment,
        event: &Event,
        transition: &Transition,
    ) -> Option<ViolationRecord> {
        let candidates = self.candidates(before, event, transition);
        let (kind, suppressed) = self.precedence.select(&candidates)?;

        let record = ViolationRecord {
            meeting_id: event.meeting_id.clone(),
            turn: event.turn,
            commitment_id: before.id().to_string(),
            kind,
            speaker: event.speaker.clone(),
            explanation: explain(kind, before, event, transition),
            remediation_hint: remediation_hint(kind, before.owner(), &event.speaker),
            severity: kind.severity(),
            suppressed,
        };

        warn!(
            meeting_id = %record.meeting_id,
            commitment_id = %record.commitment_id,
            turn = record.turn,
            kind = %record.kind,
            suppressed = ?record.suppressed,
            "Protocol violation detected"
        );
        Some(record)
    }

    /// End-of-meeting pass: flag a commitment still waiting on a CONFIRM.
    ///
    /// The record is anchored at the last accepted ASSIGN/REVISE. If that turn
    /// already carries a record for the commitment, the precedence order
    /// decides which kind is reported. Returns whether anything was added or
    /// changed.
    pub fn finalize(&self, commitment: &Commitment, records: &mut Vec<ViolationRecord>) -> bool {
        if !commitment.status().is_pending() {
            return false;
        }
        let Some(anchor) = commitment.last_assignment() else {
            return false;
        };

        let kind = ViolationKind::MissingConfirmation;
        if let Some(existing) = records
            .iter_mut()
            .find(|r| r.turn == anchor.turn && r.commitment_id == commitment.id())
        {
            let mut candidates = existing.candidates();
            candidates.push(kind);
            if let Some((winner, suppressed)) = self.precedence.select(&candidates) {
                if winner != existing.kind {
                    existing.kind = winner;
                    existing.severity = winner.severity();
                    existing.explanation = missing_confirmation_explanation(commitment, anchor);
                    existing.remediation_hint =
                        remediation_hint(winner, commitment.owner(), &existing.speaker);
                }
                existing.suppressed = suppressed;
            }
            return true;
        }

        let speaker = commitment
            .owner()
            .cloned()
            .unwrap_or_else(|| anchor.speaker.clone());
        let record = ViolationRecord {
            meeting_id: anchor.meeting_id.clone(),
            turn: anchor.turn,
            commitment_id: commitment.id().to_string(),
            kind,
            explanation: missing_confirmation_explanation(commitment, anchor),
            remediation_hint: remediation_hint(kind, commitment.owner(), &speaker),
            speaker,
            severity: kind.severity(),
            suppressed: Vec::new(),
        };

        warn!(
            meeting_id = %record.meeting_id,
            commitment_id = %record.commitment_id,
            turn = record.turn,
            "Commitment never confirmed"
        );
        records.push(record);
        true
    }
}

fn explain(kind: ViolationKind, before: &Commitment, event: &Event, transition: &Transition) -> String {
    let owner = before.owner().map(|p| p.as_str()).unwrap_or("nobody");
    match kind {
        ViolationKind::UnauthorizedCancel => format!(
            "CANCEL by {} on a commitment owned by {}",
            event.speaker, owner
        ),
        ViolationKind::DuplicateCancel => {
            "CANCEL on a commitment that was already cancelled".to_string()
        }
        ViolationKind::CancelWithoutAssignment => "CANCEL before any ASSIGN".to_string(),
        ViolationKind::CancelBeforeConfirmation => format!(
            "CANCEL while {} with no CONFIRM since the last ASSIGN/REVISE",
            transition.from
        ),
        ViolationKind::InvalidTransition if transition.accepted && !transition.authorized => format!(
            "{} by {} on a commitment owned by {}",
            event.kind, event.speaker, owner
        ),
        ViolationKind::InvalidTransition
            if transition.from == CommitmentState::Unassigned
                && matches!(event.kind, EventKind::Confirm | EventKind::Revise) =>
        {
            format!("{} before any ASSIGN", event.kind)
        }
        ViolationKind::InvalidTransition => {
            let act = if event.is_completion() { "completion" } else { event.kind.as_str() };
            format!("{} does not accept {}", transition.from, act)
        }
        ViolationKind::MissingConfirmation => format!(
            "{} status {} never reached CONFIRMED",
            before.id(),
            before.status()
        ),
    }
}

fn missing_confirmation_explanation(commitment: &Commitment, anchor: &Event) -> String {
    format!(
        "{} at turn {} was never confirmed; commitment ended the meeting {}",
        anchor.kind,
        anchor.turn,
        commitment.status()
    )
}
