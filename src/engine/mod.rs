// Commitment Consistency Engine
//
// validate -> group by commitment -> one worker per commitment -> merge ->
// summarize. Workers share nothing mutable, so they run on the rayon pool
// when `parallel` is set and produce the same output either way.

pub mod worker;

pub use worker::{CommitmentOutcome, CommitmentWorker};

use crate::detector::{Precedence, ViolationDetector, ViolationRecord};
use crate::errors::EngineError;
use crate::events::{validate_meeting, Event, InputError, MeetingRecord, Person};
use crate::lifecycle::{AuthorizationPolicy, Commitment, OpenQuestion};
use crate::metrics::{summarize, summarize_batch, BatchSummary, MeetingSummary};
use crate::observability::OperationTimer;
use crate::solver::{FeasibilityChecker, NoopSolver};
use crate::telemetry::{create_meeting_span, generate_correlation_id};
use rayon::prelude::*;
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info};

/// Settings fixed at engine construction
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub policy: AuthorizationPolicy,
    pub precedence: Precedence,
    pub parallel: bool,
    pub solver_budget: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            policy: AuthorizationPolicy::default(),
            precedence: Precedence::default(),
            parallel: true,
            solver_budget: Duration::from_millis(1000),
        }
    }
}

/// Everything handed to the reporting side for one meeting
#[derive(Debug, Clone, Serialize)]
pub struct MeetingAnalysis {
    pub meeting_id: String,
    pub correlation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    pub participants: Vec<Person>,
    pub commitments: Vec<Commitment>,
    pub violations: Vec<ViolationRecord>,
    pub summary: MeetingSummary,
}

impl MeetingAnalysis {
    pub fn commitment(&self, id: &str) -> Option<&Commitment> {
        self.commitments.iter().find(|c| c.id() == id)
    }

    pub fn violations_for<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a ViolationRecord> + 'a {
        self.violations.iter().filter(move |v| v.commitment_id == id)
    }

    pub fn open_questions(&self) -> impl Iterator<Item = &OpenQuestion> {
        self.commitments.iter().flat_map(|c| c.open_questions())
    }
}

/// A meeting whose analysis failed; it is left out of the batch summary
#[derive(Debug, Clone, Serialize)]
pub struct MeetingFailure {
    pub meeting_id: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchAnalysis {
    pub meetings: Vec<MeetingAnalysis>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<MeetingFailure>,
    pub summary: BatchSummary,
}

pub struct Engine {
    config: EngineConfig,
    detector: ViolationDetector,
    solver: Box<dyn FeasibilityChecker>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let detector = ViolationDetector::new(config.precedence.clone());
        Self {
            config,
            detector,
            solver: Box::new(NoopSolver),
        }
    }

    /// Plug in a feasibility backend in place of the no-op one
    pub fn with_solver(mut self, solver: impl FeasibilityChecker + 'static) -> Self {
        self.solver = Box::new(solver);
        self
    }

    /// Analyze one meeting.
    ///
    /// Input contract violations fail the whole meeting; protocol violations
    /// are returned as records.
    pub fn analyze_meeting(&self, record: MeetingRecord) -> Result<MeetingAnalysis, EngineError> {
        let correlation_id = generate_correlation_id();
        let span = create_meeting_span(&record.meeting_id, &correlation_id);
        let _guard = span.enter();

        let timer = OperationTimer::new("analyze_meeting");
        let result = self.run_meeting(record, correlation_id);
        timer.finish();
        result
    }

    /// Analyze independent meetings; a failed meeting does not stop the rest.
    pub fn analyze_batch(&self, records: Vec<MeetingRecord>) -> BatchAnalysis {
        let results: Vec<(String, Result<MeetingAnalysis, EngineError>)> = if self.config.parallel {
            records
                .into_par_iter()
                .map(|record| (record.meeting_id.clone(), self.analyze_meeting(record)))
                .collect()
        } else {
            records
                .into_iter()
                .map(|record| (record.meeting_id.clone(), self.analyze_meeting(record)))
                .collect()
        };

        let mut meetings = Vec::new();
        let mut failures = Vec::new();
        for (meeting_id, result) in results {
            match result {
                Ok(analysis) => meetings.push(analysis),
                Err(e) => {
                    error!(meeting_id = %meeting_id, error = %e, "Meeting analysis failed");
                    failures.push(MeetingFailure {
                        meeting_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        let summary = summarize_batch(meetings.iter().map(|m| &m.summary));
        info!(
            meetings = summary.meeting_count,
            failed = failures.len(),
            batch_contradiction_rate = summary.batch_contradiction_rate,
            "Batch analyzed"
        );

        BatchAnalysis {
            meetings,
            failures,
            summary,
        }
    }

    fn run_meeting(&self, record: MeetingRecord, correlation_id: String) -> Result<MeetingAnalysis, EngineError> {
        let meeting_id = record.meeting_id.clone();
        let meeting = validate_meeting(record).map_err(|e| EngineError::input(&meeting_id, e))?;
        let topic = meeting.topic().map(str::to_string);
        let participants = meeting.participants().to_vec();
        let groups = meeting.group_by_commitment();

        let collected: Result<Vec<CommitmentOutcome>, InputError> = if self.config.parallel {
            groups
                .into_par_iter()
                .map(|(id, events)| self.run_commitment(id, events))
                .collect()
        } else {
            groups
                .into_iter()
                .map(|(id, events)| self.run_commitment(id, events))
                .collect()
        };
        let outcomes = collected.map_err(|e| EngineError::input(&meeting_id, e))?;

        let mut commitments = Vec::with_capacity(outcomes.len());
        let mut violations = Vec::new();
        for outcome in outcomes {
            commitments.push(outcome.commitment);
            violations.extend(outcome.violations);
        }
        violations.sort_by_key(|v| v.turn);

        let summary = summarize(&meeting_id, &commitments, &violations)?;
        info!(
            meeting_id = %meeting_id,
            commitments = summary.commitment_count,
            contradictory = summary.contradictory_commitment_count,
            violations = summary.violation_total,
            contradiction_rate = summary.contradiction_rate,
            "Meeting analyzed"
        );

        Ok(MeetingAnalysis {
            meeting_id,
            correlation_id,
            topic,
            participants,
            commitments,
            violations,
            summary,
        })
    }

    fn run_commitment(&self, id: String, events: Vec<Event>) -> Result<CommitmentOutcome, InputError> {
        let mut worker = CommitmentWorker::new(id, &self.detector, &self.config.policy);
        for event in events {
            worker.feed(event)?;
        }
        Ok(worker.finish(self.solver.as_ref(), self.config.solver_budget))
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
