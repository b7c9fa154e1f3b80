// Commitment lifecycle state machine
//
// `advance` is a pure function of the commitment's current status and owner,
// the incoming event, and the authorization policy. Each state has its own
// handler deciding where an event leads; anything a handler does not accept is
// rejected and leaves the status untouched.

use crate::detector::ViolationKind;
use crate::events::{Event, EventKind, Person};
use crate::lifecycle::types::{Commitment, CommitmentState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Who may act on a commitment they do not own
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationPolicy {
    /// People allowed to act on behalf of any owner
    pub facilitators: BTreeSet<Person>,
    /// Extend the owner check from CANCEL to CONFIRM and REVISE
    pub authorize_all_acts: bool,
}

impl AuthorizationPolicy {
    pub fn new<I, P>(facilitators: I, authorize_all_acts: bool) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Person>,
    {
        Self {
            facilitators: facilitators.into_iter().map(Into::into).collect(),
            authorize_all_acts,
        }
    }

    pub fn is_facilitator(&self, speaker: &Person) -> bool {
        self.facilitators.contains(speaker)
    }

    /// Whether `kind` is subject to the owner check under this policy
    pub fn requires_authorization(&self, kind: EventKind) -> bool {
        match kind {
            EventKind::Cancel => true,
            EventKind::Confirm | EventKind::Revise => self.authorize_all_acts,
            EventKind::Assign | EventKind::Other => false,
        }
    }

    /// A commitment without an owner has nobody to check against
    pub fn is_authorized(&self, speaker: &Person, owner: Option<&Person>) -> bool {
        match owner {
            None => true,
            Some(owner) => speaker == owner || self.is_facilitator(speaker),
        }
    }
}

/// Result of feeding one event to a commitment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: CommitmentState,
    pub to: CommitmentState,
    /// The event was applied and joins the history
    pub accepted: bool,
    /// The owner check passed or did not apply
    pub authorized: bool,
    /// Kinds raised by the state machine itself
    pub flagged: Vec<ViolationKind>,
}

impl Transition {
    pub fn is_clean(&self) -> bool {
        self.flagged.is_empty()
    }
}

enum Outcome {
    Transition(CommitmentState),
    /// Moves the commitment but is itself an invalid transition
    Irregular(CommitmentState),
    Handled,
    Rejected,
}

/// Decide where `event` takes `commitment` without mutating anything.
pub fn advance(commitment: &Commitment, event: &Event, policy: &AuthorizationPolicy) -> Transition {
    let from = commitment.status();
    let outcome = match from {
        CommitmentState::Unassigned => unassigned(event),
        CommitmentState::AssignedPending => assigned_pending(event),
        CommitmentState::Confirmed => confirmed(event),
        CommitmentState::RevisedPending => revised_pending(event),
        CommitmentState::Cancelled | CommitmentState::Completed => Outcome::Rejected,
    };

    let (to, accepted, irregular) = match outcome {
        Outcome::Transition(next) => (next, true, false),
        Outcome::Irregular(next) => (next, true, true),
        Outcome::Handled => (from, true, false),
        Outcome::Rejected => (from, false, false),
    };

    let authorized = !policy.requires_authorization(event.kind)
        || policy.is_authorized(&event.speaker, commitment.owner());

    let mut flagged = Vec::new();
    if !accepted || irregular {
        flagged.push(ViolationKind::InvalidTransition);
    }
    if !authorized {
        let kind = match event.kind {
            EventKind::Cancel => ViolationKind::UnauthorizedCancel,
            _ => ViolationKind::InvalidTransition,
        };
        if !flagged.contains(&kind) {
            flagged.push(kind);
        }
    }

    Transition {
        from,
        to,
        accepted,
        authorized,
        flagged,
    }
}

fn unassigned(event: &Event) -> Outcome {
    match event.kind {
        EventKind::Assign => Outcome::Transition(CommitmentState::AssignedPending),
        // Closes the commitment even though nothing was ever assigned
        EventKind::Cancel => Outcome::Irregular(CommitmentState::Cancelled),
        EventKind::Other if !event.completes => Outcome::Handled,
        _ => Outcome::Rejected,
    }
}

fn assigned_pending(event: &Event) -> Outcome {
    match event.kind {
        EventKind::Confirm => Outcome::Transition(CommitmentState::Confirmed),
        EventKind::Revise => Outcome::Transition(CommitmentState::RevisedPending),
        EventKind::Assign => Outcome::Rejected,
        EventKind::Cancel | EventKind::Other => closing(event),
    }
}

fn confirmed(event: &Event) -> Outcome {
    match event.kind {
        EventKind::Revise => Outcome::Transition(CommitmentState::RevisedPending),
        EventKind::Assign | EventKind::Confirm => Outcome::Rejected,
        EventKind::Cancel | EventKind::Other => closing(event),
    }
}

fn revised_pending(event: &Event) -> Outcome {
    match event.kind {
        EventKind::Confirm => Outcome::Transition(CommitmentState::Confirmed),
        EventKind::Assign | EventKind::Revise => Outcome::Rejected,
        EventKind::Cancel | EventKind::Other => closing(event),
    }
}

// CANCEL and completion are shared by every live state
fn closing(event: &Event) -> Outcome {
    match event.kind {
        EventKind::Cancel => Outcome::Transition(CommitmentState::Cancelled),
        EventKind::Other if event.completes => Outcome::Transition(CommitmentState::Completed),
        EventKind::Other => Outcome::Handled,
        _ => Outcome::Rejected,
    }
}

/// Rebuild a commitment by feeding `history` through [`advance`] turn by turn.
pub fn replay(id: &str, history: &[Event], policy: &AuthorizationPolicy) -> Commitment {
    let mut commitment = Commitment::new(id);
    for event in history {
        let transition = advance(&commitment, event, policy);
        commitment.apply(event, transition.to, transition.accepted);
    }
    commitment
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(turn: u64, kind: EventKind, speaker: &str) -> Event {
        Event::new("m1", turn, "C1", kind, speaker)
    }

    fn feed(commitment: &mut Commitment, event: &Event, policy: &AuthorizationPolicy) -> Transition {
        let transition = advance(commitment, event, policy);
        commitment.apply(event, transition.to, transition.accepted);
        transition
    }

    #[test]
    fn test_commitment_basic_workflow() {
        let policy = AuthorizationPolicy::default();
        let mut c = Commitment::new("C1");
        assert_eq!(c.status(), CommitmentState::Unassigned);

        let t = feed(&mut c, &event(1, EventKind::Assign, "Bob"), &policy);
        assert!(t.is_clean());
        assert_eq!(c.status(), CommitmentState::AssignedPending);
        assert_eq!(c.owner(), Some(&Person::new("Bob")));

        feed(&mut c, &event(2, EventKind::Confirm, "Bob"), &policy);
        assert_eq!(c.status(), CommitmentState::Confirmed);

        feed(&mut c, &event(3, EventKind::Revise, "Bob"), &policy);
        assert_eq!(c.status(), CommitmentState::RevisedPending);

        feed(&mut c, &event(4, EventKind::Confirm, "Bob"), &policy);
        assert_eq!(c.status(), CommitmentState::Confirmed);

        let t = feed(&mut c, &event(5, EventKind::Other, "Bob").completing(), &policy);
        assert!(t.is_clean());
        assert_eq!(c.status(), CommitmentState::Completed);
        assert_eq!(c.history().len(), 5);
    }

    #[test]
    fn test_explicit_owner_wins_over_speaker() {
        let policy = AuthorizationPolicy::default();
        let mut c = Commitment::new("C1");
        feed(&mut c, &event(1, EventKind::Assign, "Manager").with_owner("Alice"), &policy);
        assert_eq!(c.owner(), Some(&Person::new("Alice")));
    }

    #[test]
    fn test_rejected_event_leaves_status_and_history() {
        let policy = AuthorizationPolicy::default();
        let mut c = Commitment::new("C1");

        let t = feed(&mut c, &event(1, EventKind::Confirm, "Bob"), &policy);
        assert!(!t.accepted);
        assert_eq!(t.flagged, vec![ViolationKind::InvalidTransition]);
        assert_eq!(c.status(), CommitmentState::Unassigned);
        assert!(c.history().is_empty());
        assert_eq!(
            c.stages(),
            &[CommitmentState::Unassigned, CommitmentState::Unassigned]
        );
    }

    #[test]
    fn test_cancel_without_assignment_still_closes() {
        let policy = AuthorizationPolicy::default();
        let mut c = Commitment::new("C3");

        let t = feed(&mut c, &event(1, EventKind::Cancel, "Dan"), &policy);
        assert!(t.accepted);
        assert_eq!(t.to, CommitmentState::Cancelled);
        assert_eq!(t.flagged, vec![ViolationKind::InvalidTransition]);
        assert_eq!(c.history().len(), 1);

        let t = feed(&mut c, &event(2, EventKind::Assign, "Dan"), &policy);
        assert!(!t.accepted);
        assert_eq!(c.status(), CommitmentState::Cancelled);
        assert!(c.owner().is_none());
        assert_eq!(replay("C3", c.history(), &policy).status(), CommitmentState::Cancelled);
    }

    #[test]
    fn test_completion_without_assignment_is_rejected() {
        let policy = AuthorizationPolicy::default();
        let mut c = Commitment::new("C1");
        let t = feed(&mut c, &event(1, EventKind::Other, "Bob").completing(), &policy);
        assert!(!t.accepted);
        assert_eq!(c.status(), CommitmentState::Unassigned);
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        let policy = AuthorizationPolicy::default();
        for closing_event in [
            event(2, EventKind::Cancel, "Bob"),
            event(2, EventKind::Other, "Bob").completing(),
        ] {
            let mut c = Commitment::new("C1");
            feed(&mut c, &event(1, EventKind::Assign, "Bob"), &policy);
            feed(&mut c, &closing_event, &policy);
            assert!(c.status().is_terminal());

            for kind in [
                EventKind::Assign,
                EventKind::Confirm,
                EventKind::Revise,
                EventKind::Cancel,
                EventKind::Other,
            ] {
                let t = advance(&c, &event(3, kind, "Bob"), &policy);
                assert!(!t.accepted, "{kind} accepted from {}", c.status());
                assert_eq!(t.to, c.status());
                assert!(t.flagged.contains(&ViolationKind::InvalidTransition));
            }
        }
    }

    #[test]
    fn test_unauthorized_cancel_still_completes() {
        let policy = AuthorizationPolicy::default();
        let mut c = Commitment::new("C2");
        feed(&mut c, &event(1, EventKind::Assign, "Alice"), &policy);

        let t = feed(&mut c, &event(2, EventKind::Cancel, "Bob"), &policy);
        assert!(t.accepted);
        assert!(!t.authorized);
        assert_eq!(t.flagged, vec![ViolationKind::UnauthorizedCancel]);
        assert_eq!(c.status(), CommitmentState::Cancelled);
    }

    #[test]
    fn test_facilitator_may_cancel_for_owner() {
        let policy = AuthorizationPolicy::new(["Chair"], false);
        let mut c = Commitment::new("C1");
        feed(&mut c, &event(1, EventKind::Assign, "Alice"), &policy);
        feed(&mut c, &event(2, EventKind::Confirm, "Alice"), &policy);

        let t = feed(&mut c, &event(3, EventKind::Cancel, "Chair"), &policy);
        assert!(t.is_clean());
        assert_eq!(c.status(), CommitmentState::Cancelled);
    }

    #[test]
    fn test_authorize_all_acts_toggle() {
        let relaxed = AuthorizationPolicy::default();
        let strict = AuthorizationPolicy::new(Vec::<Person>::new(), true);
        let mut c = Commitment::new("C1");
        feed(&mut c, &event(1, EventKind::Assign, "Alice"), &relaxed);

        let confirm_by_other = event(2, EventKind::Confirm, "Bob");
        assert!(advance(&c, &confirm_by_other, &relaxed).is_clean());

        let t = advance(&c, &confirm_by_other, &strict);
        assert!(t.accepted);
        assert_eq!(t.to, CommitmentState::Confirmed);
        assert_eq!(t.flagged, vec![ViolationKind::InvalidTransition]);
    }

    #[test]
    fn test_other_is_a_no_op_on_live_commitments() {
        let policy = AuthorizationPolicy::default();
        let mut c = Commitment::new("C1");
        let t = feed(&mut c, &event(1, EventKind::Other, "Bob"), &policy);
        assert!(t.is_clean());
        assert_eq!(c.status(), CommitmentState::Unassigned);

        feed(&mut c, &event(2, EventKind::Assign, "Bob"), &policy);
        let t = feed(&mut c, &event(3, EventKind::Other, "Ann"), &policy);
        assert!(t.is_clean());
        assert_eq!(c.status(), CommitmentState::AssignedPending);
    }

    #[test]
    fn test_open_questions_follow_assign_revise_confirm() {
        let policy = AuthorizationPolicy::default();
        let mut c = Commitment::new("C1");
        feed(&mut c, &event(1, EventKind::Assign, "Bob"), &policy);
        feed(&mut c, &event(2, EventKind::Revise, "Bob"), &policy);
        feed(&mut c, &event(3, EventKind::Confirm, "Bob"), &policy);
        feed(&mut c, &event(4, EventKind::Revise, "Bob"), &policy);

        let questions = c.open_questions();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].raised_at_turn, 1);
        assert_eq!(questions[0].resolved_at_turn, Some(3));
        assert_eq!(questions[1].raised_at_turn, 4);
        assert!(questions[1].is_open());
    }

    #[test]
    fn test_due_date_follows_last_assign_or_revise() {
        let policy = AuthorizationPolicy::default();
        let first = chrono::NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let moved = chrono::NaiveDate::from_ymd_opt(2024, 5, 8).unwrap();
        let mut c = Commitment::new("C1");

        feed(&mut c, &event(1, EventKind::Assign, "Bob").with_due(first), &policy);
        assert_eq!(c.due(), Some(first));
        feed(&mut c, &event(2, EventKind::Revise, "Bob"), &policy);
        assert_eq!(c.due(), Some(first));
        feed(&mut c, &event(3, EventKind::Confirm, "Bob"), &policy);
        feed(&mut c, &event(4, EventKind::Revise, "Bob").with_due(moved), &policy);
        assert_eq!(c.due(), Some(moved));
    }

    #[test]
    fn test_revise_new_due_and_new_owner() {
        let policy = AuthorizationPolicy::default();
        let first = chrono::NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let moved = chrono::NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let mut c = Commitment::new("C1");

        feed(&mut c, &event(1, EventKind::Assign, "Bob").with_due(first), &policy);
        feed(&mut c, &event(2, EventKind::Confirm, "Bob"), &policy);
        let mut revise = event(3, EventKind::Revise, "Bob").with_new_due(moved);
        revise.new_owner = Some(Person::new("Ann"));
        feed(&mut c, &revise, &policy);

        assert_eq!(c.due(), Some(moved));
        assert_eq!(c.owner(), Some(&Person::new("Bob")));
    }

    #[test]
    fn test_replay_reproduces_status() {
        let policy = AuthorizationPolicy::default();
        let mut c = Commitment::new("C4");
        for e in [
            event(1, EventKind::Assign, "Eve"),
            event(2, EventKind::Confirm, "Eve"),
            event(3, EventKind::Cancel, "Frank"),
            event(4, EventKind::Cancel, "Eve"),
        ] {
            feed(&mut c, &e, &policy);
        }

        let replayed = replay("C4", c.history(), &policy);
        assert_eq!(replayed.status(), c.status());
        assert_eq!(replayed.history(), c.history());
    }
}
