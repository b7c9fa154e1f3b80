// Folding violation records into meeting and batch summaries

use crate::detector::ViolationRecord;
use crate::lifecycle::Commitment;
use crate::metrics::types::{AggregationError, BatchSummary, MeetingSummary, TypeBreakdown};
use std::collections::{BTreeSet, HashSet};

/// `numerator / denominator`, or 0.0 when there is nothing to divide by
pub fn rate(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Summarize one meeting.
///
/// Fails on duplicate commitment ids and on records pointing at commitments
/// the meeting does not contain; both indicate an upstream integrity bug.
pub fn summarize(
    meeting_id: &str,
    commitments: &[Commitment],
    violations: &[ViolationRecord],
) -> Result<MeetingSummary, AggregationError> {
    let mut ids: HashSet<&str> = HashSet::with_capacity(commitments.len());
    for commitment in commitments {
        if !ids.insert(commitment.id()) {
            return Err(AggregationError::DuplicateCommitment {
                meeting_id: meeting_id.to_string(),
                commitment_id: commitment.id().to_string(),
            });
        }
    }

    let mut contradictory: BTreeSet<&str> = BTreeSet::new();
    let mut type_breakdown = TypeBreakdown::default();
    for record in violations {
        if !ids.contains(record.commitment_id.as_str()) {
            return Err(AggregationError::UnknownCommitment {
                meeting_id: meeting_id.to_string(),
                commitment_id: record.commitment_id.clone(),
                turn: record.turn,
            });
        }
        contradictory.insert(record.commitment_id.as_str());
        type_breakdown.record(record.kind);
    }

    Ok(MeetingSummary {
        meeting_id: meeting_id.to_string(),
        commitment_count: commitments.len(),
        contradictory_commitment_count: contradictory.len(),
        contradiction_rate: rate(contradictory.len(), commitments.len()),
        violation_total: violations.len(),
        type_breakdown,
    })
}

/// Sum meeting summaries; the rate is weighted by commitment count
pub fn summarize_batch<'a, I>(summaries: I) -> BatchSummary
where
    I: IntoIterator<Item = &'a MeetingSummary>,
{
    let mut batch = BatchSummary::default();
    for summary in summaries {
        batch.meeting_count += 1;
        batch.commitment_count += summary.commitment_count;
        batch.contradictory_commitment_count += summary.contradictory_commitment_count;
        batch.violation_total += summary.violation_total;
        batch.type_breakdown.absorb(&summary.type_breakdown);
    }
    batch.batch_contradiction_rate = rate(
        batch.contradictory_commitment_count,
        batch.commitment_count,
    );
    batch
}

impl BatchSummary {
    /// Combine two batches with the same weighted-sum rule
    pub fn merge(&self, other: &BatchSummary) -> BatchSummary {
        let mut type_breakdown = self.type_breakdown.clone();
        type_breakdown.absorb(&other.type_breakdown);

        let commitment_count = self.commitment_count + other.commitment_count;
        let contradictory_commitment_count =
            self.contradictory_commitment_count + other.contradictory_commitment_count;

        BatchSummary {
            meeting_count: self.meeting_count + other.meeting_count,
            commitment_count,
            contradictory_commitment_count,
            batch_contradiction_rate: rate(contradictory_commitment_count, commitment_count),
            violation_total: self.violation_total + other.violation_total,
            type_breakdown,
        }
    }
}
