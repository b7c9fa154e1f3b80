// Core types for meeting speech-act events

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A participant identified by name or role
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Person(pub String);

impl Person {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Person {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl fmt::Display for Person {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Person {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// Speech act recorded for a commitment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Assign,
    Confirm,
    Revise,
    Cancel,
    Other,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Assign => "ASSIGN",
            EventKind::Confirm => "CONFIRM",
            EventKind::Revise => "REVISE",
            EventKind::Cancel => "CANCEL",
            EventKind::Other => "OTHER",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One lifecycle event extracted from a meeting turn.
///
/// Events are immutable once constructed. `turn` is the only temporal
/// signal the engine looks at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub turn: u64,
    /// Empty for chatter that refers to no commitment
    #[serde(default)]
    pub commitment_id: String,
    #[serde(alias = "act")]
    pub kind: EventKind,
    pub speaker: Person,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<NaiveDate>,
    /// Filled from the enclosing meeting record when left empty
    #[serde(default)]
    pub meeting_id: String,
    /// Owner named explicitly by an ASSIGN; the speaker owns it otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Person>,
    /// Due date proposed by a REVISE; takes priority over `due`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_due: Option<NaiveDate>,
    /// Owner proposed by a REVISE. Kept for reporting only; ownership is
    /// fixed by the first ASSIGN.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_owner: Option<Person>,
    /// Marks an OTHER event as the act that completes the commitment
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub completes: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl Event {
    pub fn new(
        meeting_id: impl Into<String>,
        turn: u64,
        commitment_id: impl Into<String>,
        kind: EventKind,
        speaker: impl Into<String>,
    ) -> Self {
        Self {
            turn,
            commitment_id: commitment_id.into(),
            kind,
            speaker: Person(speaker.into()),
            due: None,
            meeting_id: meeting_id.into(),
            owner: None,
            new_due: None,
            new_owner: None,
            completes: false,
            text: None,
            confidence: None,
        }
    }

    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(Person(owner.into()));
        self
    }

    pub fn with_due(mut self, due: NaiveDate) -> Self {
        self.due = Some(due);
        self
    }

    pub fn with_new_due(mut self, due: NaiveDate) -> Self {
        self.new_due = Some(due);
        self
    }

    /// The due date this event sets, if any
    pub fn effective_due(&self) -> Option<NaiveDate> {
        self.new_due.or(self.due)
    }

    /// Turn an OTHER event into the completion act
    pub fn completing(mut self) -> Self {
        self.completes = true;
        self
    }

    pub fn is_completion(&self) -> bool {
        self.kind == EventKind::Other && self.completes
    }
}

/// A meeting as handed over by the extraction collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingRecord {
    pub meeting_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participants: Option<Vec<Person>>,
    #[serde(alias = "utterances")]
    pub events: Vec<Event>,
}

impl MeetingRecord {
    pub fn new(meeting_id: impl Into<String>, events: Vec<Event>) -> Self {
        Self {
            meeting_id: meeting_id.into(),
            topic: None,
            participants: None,
            events,
        }
    }

    /// Declared participants, or every speaker in order of first appearance
    pub fn unique_speakers(&self) -> Vec<Person> {
        if let Some(participants) = &self.participants {
            return participants.clone();
        }
        let mut seen: Vec<Person> = Vec::new();
        for event in &self.events {
            if !seen.contains(&event.speaker) {
                seen.push(event.speaker.clone());
            }
        }
        seen
    }
}
