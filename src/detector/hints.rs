// Remediation hints, one template per violation kind

use crate::detector::types::ViolationKind;
use crate::events::Person;

/// Advisory text for a violation. Only the owner and speaker names vary.
pub fn remediation_hint(kind: ViolationKind, owner: Option<&Person>, speaker: &Person) -> String {
    let owner = owner.map(Person::as_str).unwrap_or("the owner");
    match kind {
        ViolationKind::InvalidTransition => format!(
            "Check the event order for this commitment; the act by {speaker} does not follow from its current state"
        ),
        ViolationKind::UnauthorizedCancel => format!(
            "Have {owner} confirm the cancellation, or list {speaker} as a facilitator"
        ),
        ViolationKind::DuplicateCancel => {
            "Drop the repeated CANCEL; track any renewed work as a new commitment".to_string()
        }
        ViolationKind::CancelWithoutAssignment => {
            "Record the ASSIGN that created this commitment before it is cancelled".to_string()
        }
        ViolationKind::CancelBeforeConfirmation => format!(
            "Ask {owner} to confirm or explicitly decline before the commitment is cancelled"
        ),
        ViolationKind::MissingConfirmation => format!(
            "Follow up with {owner} to confirm the latest assignment or revision"
        ),
    }
}
