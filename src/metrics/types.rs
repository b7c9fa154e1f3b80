use crate::detector::ViolationKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Violation count per kind. Always holds every kind, zero-filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeBreakdown(BTreeMap<ViolationKind, usize>);

impl Default for TypeBreakdown {
    fn default() -> Self {
        Self(ViolationKind::ALL.into_iter().map(|kind| (kind, 0)).collect())
    }
}

impl TypeBreakdown {
    pub fn get(&self, kind: ViolationKind) -> usize {
        self.0.get(&kind).copied().unwrap_or(0)
    }

    pub fn record(&mut self, kind: ViolationKind) {
        *self.0.entry(kind).or_insert(0) += 1;
    }

    pub fn absorb(&mut self, other: &TypeBreakdown) {
        for (kind, count) in &other.0 {
            *self.0.entry(*kind).or_insert(0) += count;
        }
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ViolationKind, usize)> + '_ {
        self.0.iter().map(|(kind, count)| (*kind, *count))
    }
}

/// Per-meeting view over the violation records. Recomputable at any time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingSummary {
    pub meeting_id: String,
    pub commitment_count: usize,
    pub contradictory_commitment_count: usize,
    pub contradiction_rate: f64,
    pub violation_total: usize,
    pub type_breakdown: TypeBreakdown,
}

/// Cross-meeting view, weighted by commitment count
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub meeting_count: usize,
    pub commitment_count: usize,
    pub contradictory_commitment_count: usize,
    pub batch_contradiction_rate: f64,
    pub violation_total: usize,
    pub type_breakdown: TypeBreakdown,
}

impl Default for BatchSummary {
    fn default() -> Self {
        Self {
            meeting_count: 0,
            commitment_count: 0,
            contradictory_commitment_count: 0,
            batch_contradiction_rate: 0.0,
            violation_total: 0,
            type_breakdown: TypeBreakdown::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregationError {
    #[error("Commitment '{commitment_id}' appears more than once in meeting '{meeting_id}'")]
    DuplicateCommitment {
        meeting_id: String,
        commitment_id: String,
    },
    #[error("Violation at turn {turn} refers to commitment '{commitment_id}', which is not part of meeting '{meeting_id}'")]
    UnknownCommitment {
        meeting_id: String,
        commitment_id: String,
        turn: u64,
    },
}
