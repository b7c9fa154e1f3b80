// Input contract checks for meeting records
//
// A meeting either passes every check or is rejected as a whole. Events are
// never reordered, skipped or given a guessed turn.

use crate::events::types::{Event, EventKind, MeetingRecord, Person};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("Meeting record has an empty meeting_id")]
    EmptyMeetingId,
    #[error("Event at turn {turn} belongs to meeting '{found}', expected '{expected}'")]
    MeetingMismatch {
        expected: String,
        found: String,
        turn: u64,
    },
    #[error("Event at turn {turn} has an empty commitment_id")]
    EmptyCommitmentId { turn: u64 },
    #[error("Turn {turn} appears more than once")]
    DuplicateTurn { turn: u64 },
    #[error("Turn {turn} arrived after turn {previous}; turns must be strictly increasing")]
    OutOfOrder { previous: u64, turn: u64 },
    #[error("Commitment '{commitment_id}' received turn {turn} after turn {previous}")]
    CommitmentOutOfOrder {
        commitment_id: String,
        previous: u64,
        turn: u64,
    },
    #[error("Event at turn {turn} has confidence {value} outside [0, 1]")]
    ConfidenceOutOfRange { turn: u64, value: f64 },
}

/// A meeting whose events satisfy the input contract
#[derive(Debug, Clone)]
pub struct ValidatedMeeting {
    meeting_id: String,
    topic: Option<String>,
    participants: Vec<Person>,
    events: Vec<Event>,
}

impl ValidatedMeeting {
    pub fn meeting_id(&self) -> &str {
        &self.meeting_id
    }

    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    pub fn participants(&self) -> &[Person] {
        &self.participants
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Split events per commitment, keeping turn order inside each group and
    /// ordering groups by the turn that first referenced them.
    pub fn group_by_commitment(self) -> Vec<(String, Vec<Event>)> {
        let mut groups: Vec<(String, Vec<Event>)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for event in self.events {
            match index.get(&event.commitment_id) {
                Some(&slot) => groups[slot].1.push(event),
                None => {
                    index.insert(event.commitment_id.clone(), groups.len());
                    groups.push((event.commitment_id.clone(), vec![event]));
                }
            }
        }
        groups
    }
}

/// Check a meeting record against the input contract.
///
/// Events with an empty `meeting_id` inherit the record's id; a non-empty
/// id that differs from the record is rejected.
pub fn validate_meeting(record: MeetingRecord) -> Result<ValidatedMeeting, InputError> {
    if record.meeting_id.trim().is_empty() {
        return Err(InputError::EmptyMeetingId);
    }

    let participants = record.unique_speakers();
    let MeetingRecord {
        meeting_id,
        topic,
        events,
        ..
    } = record;

    let mut previous: Option<u64> = None;
    let mut validated = Vec::with_capacity(events.len());
    for mut event in events {
        if event.meeting_id.is_empty() {
            event.meeting_id = meeting_id.clone();
        } else if event.meeting_id != meeting_id {
            return Err(InputError::MeetingMismatch {
                expected: meeting_id,
                found: event.meeting_id,
                turn: event.turn,
            });
        }

        if let Some(value) = event.confidence {
            if !(0.0..=1.0).contains(&value) {
                return Err(InputError::ConfidenceOutOfRange {
                    turn: event.turn,
                    value,
                });
            }
        }

        if let Some(prev) = previous {
            if event.turn == prev {
                return Err(InputError::DuplicateTurn { turn: event.turn });
            }
            if event.turn < prev {
                return Err(InputError::OutOfOrder {
                    previous: prev,
                    turn: event.turn,
                });
            }
        }
        previous = Some(event.turn);

        if event.commitment_id.trim().is_empty() {
            // Chatter about no commitment in particular
            if event.kind == EventKind::Other && !event.completes {
                continue;
            }
            return Err(InputError::EmptyCommitmentId { turn: event.turn });
        }
        validated.push(event);
    }

    Ok(ValidatedMeeting {
        meeting_id,
        topic,
        participants,
        events: validated,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(turn: u64, cid: &str, kind: EventKind, speaker: &str) -> Event {
        Event::new("", turn, cid, kind, speaker)
    }

    #[test]
    fn test_events_inherit_meeting_id() {
        let record = MeetingRecord::new(
            "m1",
            vec![
                event(1, "C1", EventKind::Assign, "Bob"),
                event(2, "C1", EventKind::Confirm, "Bob"),
            ],
        );

        let meeting = validate_meeting(record).unwrap();
        assert_eq!(meeting.meeting_id(), "m1");
        assert!(meeting.events().iter().all(|e| e.meeting_id == "m1"));
    }

    #[test]
    fn test_out_of_order_turns_fail_fast() {
        let record = MeetingRecord::new(
            "m1",
            vec![
                event(3, "C1", EventKind::Assign, "Bob"),
                event(2, "C1", EventKind::Confirm, "Bob"),
            ],
        );

        assert_eq!(
            validate_meeting(record).unwrap_err(),
            InputError::OutOfOrder { previous: 3, turn: 2 }
        );
    }

    #[test]
    fn test_duplicate_turn_is_rejected() {
        let record = MeetingRecord::new(
            "m1",
            vec![
                event(1, "C1", EventKind::Assign, "Bob"),
                event(1, "C2", EventKind::Assign, "Ann"),
            ],
        );

        assert_eq!(
            validate_meeting(record).unwrap_err(),
            InputError::DuplicateTurn { turn: 1 }
        );
    }

    #[test]
    fn test_empty_identifiers_are_rejected() {
        let record = MeetingRecord::new(" ", vec![]);
        assert_eq!(validate_meeting(record).unwrap_err(), InputError::EmptyMeetingId);

        let record = MeetingRecord::new("m1", vec![event(4, "", EventKind::Cancel, "Bob")]);
        assert_eq!(
            validate_meeting(record).unwrap_err(),
            InputError::EmptyCommitmentId { turn: 4 }
        );

        let record = MeetingRecord::new(
            "m1",
            vec![event(5, "", EventKind::Other, "Bob").completing()],
        );
        assert_eq!(
            validate_meeting(record).unwrap_err(),
            InputError::EmptyCommitmentId { turn: 5 }
        );
    }

    #[test]
    fn test_chatter_without_commitment_is_dropped_but_ordered() {
        let record = MeetingRecord::new(
            "m1",
            vec![
                event(1, "C1", EventKind::Assign, "Bob"),
                event(2, "", EventKind::Other, "Ann"),
                event(3, "C1", EventKind::Confirm, "Bob"),
            ],
        );
        let meeting = validate_meeting(record).unwrap();
        let turns: Vec<u64> = meeting.events().iter().map(|e| e.turn).collect();
        assert_eq!(turns, vec![1, 3]);
        assert_eq!(meeting.participants().len(), 2);

        let record = MeetingRecord::new(
            "m1",
            vec![
                event(1, "C1", EventKind::Assign, "Bob"),
                event(4, "", EventKind::Other, "Ann"),
                event(3, "C1", EventKind::Confirm, "Bob"),
            ],
        );
        assert_eq!(
            validate_meeting(record).unwrap_err(),
            InputError::OutOfOrder { previous: 4, turn: 3 }
        );
    }

    #[test]
    fn test_foreign_meeting_id_is_rejected() {
        let record = MeetingRecord::new(
            "m1",
            vec![Event::new("m2", 1, "C1", EventKind::Assign, "Bob")],
        );

        assert!(matches!(
            validate_meeting(record),
            Err(InputError::MeetingMismatch { turn: 1, .. })
        ));
    }

    #[test]
    fn test_confidence_must_be_probability() {
        let mut bad = event(1, "C1", EventKind::Assign, "Bob");
        bad.confidence = Some(1.5);
        let record = MeetingRecord::new("m1", vec![bad]);

        assert!(matches!(
            validate_meeting(record),
            Err(InputError::ConfidenceOutOfRange { turn: 1, .. })
        ));
    }

    #[test]
    fn test_grouping_keeps_first_reference_order() {
        let record = MeetingRecord::new(
            "m1",
            vec![
                event(1, "C2", EventKind::Assign, "Ann"),
                event(2, "C1", EventKind::Assign, "Bob"),
                event(3, "C2", EventKind::Confirm, "Ann"),
            ],
        );

        let groups = validate_meeting(record).unwrap().group_by_commitment();
        let ids: Vec<&str> = groups.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["C2", "C1"]);
        let turns: Vec<u64> = groups[0].1.iter().map(|e| e.turn).collect();
        assert_eq!(turns, vec![1, 3]);
    }

    #[test]
    fn test_grouping_many_interleaved_commitments() {
        let events = (0..300u64)
            .map(|turn| event(turn + 1, &format!("C{}", 99 - (turn % 100)), EventKind::Other, "Bob"))
            .collect();
        let groups = validate_meeting(MeetingRecord::new("m1", events))
            .unwrap()
            .group_by_commitment();

        assert_eq!(groups.len(), 100);
        assert_eq!(groups[0].0, "C99");
        assert_eq!(groups[99].0, "C0");
        assert!(groups.iter().all(|(_, bucket)| bucket.len() == 3));
        let turns: Vec<u64> = groups[0].1.iter().map(|e| e.turn).collect();
        assert_eq!(turns, vec![1, 101, 201]);
    }

    #[test]
    fn test_alternate_field_names_deserialize() {
        let json = r#"{
            "meeting_id": "m1",
            "utterances": [
                {"turn": 1, "commitment_id": "C1", "act": "ASSIGN", "speaker": "Alice", "owner": "Bob", "due": "2024-05-01"},
                {"turn": 2, "commitment_id": "C1", "act": "OTHER", "speaker": "Bob", "completes": true}
            ]
        }"#;

        let record: MeetingRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.events.len(), 2);
        assert_eq!(record.events[0].due, chrono::NaiveDate::from_ymd_opt(2024, 5, 1));
        assert_eq!(record.events[0].owner, Some(Person::new("Bob")));
        assert!(record.events[1].is_completion());
    }
}
