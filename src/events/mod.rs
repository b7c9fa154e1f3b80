// Event Model - typed speech-act events and the input contract

pub mod types;
pub mod validation;

pub use types::{Event, EventKind, MeetingRecord, Person};
pub use validation::{validate_meeting, InputError, ValidatedMeeting};
