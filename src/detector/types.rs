// Violation taxonomy and records

use crate::events::Person;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Closed set of protocol violations the detector can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    InvalidTransition,
    UnauthorizedCancel,
    DuplicateCancel,
    CancelWithoutAssignment,
    CancelBeforeConfirmation,
    MissingConfirmation,
}

impl ViolationKind {
    pub const ALL: [ViolationKind; 6] = [
        ViolationKind::InvalidTransition,
        ViolationKind::UnauthorizedCancel,
        ViolationKind::DuplicateCancel,
        ViolationKind::CancelWithoutAssignment,
        ViolationKind::CancelBeforeConfirmation,
        ViolationKind::MissingConfirmation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::InvalidTransition => "invalid_transition",
            ViolationKind::UnauthorizedCancel => "unauthorized_cancel",
            ViolationKind::DuplicateCancel => "duplicate_cancel",
            ViolationKind::CancelWithoutAssignment => "cancel_without_assignment",
            ViolationKind::CancelBeforeConfirmation => "cancel_before_confirmation",
            ViolationKind::MissingConfirmation => "missing_confirmation",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            ViolationKind::MissingConfirmation => Severity::Warning,
            ViolationKind::InvalidTransition
            | ViolationKind::UnauthorizedCancel
            | ViolationKind::DuplicateCancel
            | ViolationKind::CancelWithoutAssignment
            | ViolationKind::CancelBeforeConfirmation => Severity::Error,
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown violation kind '{0}'")]
pub struct UnknownViolationKind(pub String);

impl FromStr for ViolationKind {
    type Err = UnknownViolationKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ViolationKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.trim())
            .ok_or_else(|| UnknownViolationKind(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// One reported offence. Produced once per offending event, never retracted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationRecord {
    pub meeting_id: String,
    pub turn: u64,
    pub commitment_id: String,
    pub kind: ViolationKind,
    pub speaker: Person,
    pub explanation: String,
    pub remediation_hint: String,
    pub severity: Severity,
    /// Other kinds that matched the same event, highest precedence first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suppressed: Vec<ViolationKind>,
}

impl ViolationRecord {
    /// Every kind that matched this event, reported one first
    pub fn candidates(&self) -> Vec<ViolationKind> {
        let mut all = Vec::with_capacity(1 + self.suppressed.len());
        all.push(self.kind);
        all.extend(self.suppressed.iter().copied());
        all
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrecedenceError {
    #[error("Precedence lists {found} kinds; every one of the {expected} violation kinds must appear exactly once")]
    WrongLength { expected: usize, found: usize },
    #[error("Violation kind '{0}' appears more than once in the precedence order")]
    Repeated(ViolationKind),
}

/// Total order used to pick one kind when several rules fire on one event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Precedence {
    order: Vec<ViolationKind>,
}

impl Default for Precedence {
    fn default() -> Self {
        Self {
            order: vec![
                ViolationKind::UnauthorizedCancel,
                ViolationKind::DuplicateCancel,
                ViolationKind::CancelWithoutAssignment,
                ViolationKind::CancelBeforeConfirmation,
                ViolationKind::InvalidTransition,
                ViolationKind::MissingConfirmation,
            ],
        }
    }
}

impl Precedence {
    /// Build an order from highest to lowest priority. The list must be a
    /// permutation of [`ViolationKind::ALL`].
    pub fn new(order: Vec<ViolationKind>) -> Result<Self, PrecedenceError> {
        if order.len() != ViolationKind::ALL.len() {
            return Err(PrecedenceError::WrongLength {
                expected: ViolationKind::ALL.len(),
                found: order.len(),
            });
        }
        for (idx, kind) in order.iter().enumerate() {
            if order[..idx].contains(kind) {
                return Err(PrecedenceError::Repeated(*kind));
            }
        }
        Ok(Self { order })
    }

    pub fn order(&self) -> &[ViolationKind] {
        &self.order
    }

    /// Position in the order; lower ranks win
    pub fn rank(&self, kind: ViolationKind) -> usize {
        self.order
            .iter()
            .position(|k| *k == kind)
            .unwrap_or(self.order.len())
    }

    /// Sort candidates by precedence and split off the winner
    pub fn select(&self, candidates: &[ViolationKind]) -> Option<(ViolationKind, Vec<ViolationKind>)> {
        let mut ranked: Vec<ViolationKind> = Vec::with_capacity(candidates.len());
        for kind in candidates {
            if !ranked.contains(kind) {
                ranked.push(*kind);
            }
        }
        ranked.sort_by_key(|kind| self.rank(*kind));
        if ranked.is_empty() {
            return None;
        }
        let winner = ranked.remove(0);
        Some((winner, ranked))
    }
}
