//! Participant outcomes and round results

use crate::response::MalformedResponse;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::participant::Participant;

/// The answer a participant returned for a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    /// Answering time in milliseconds, as reported by the participant itself.
    pub reported_time_ms: i64,
    pub resources: Vec<String>,
    pub title_foci: String,
    pub body_foci: String,
    pub summary: String,
}

/// A participant's human-readable explanation for declining a question.
/// May be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclineReason {
    pub reason: String,
}

impl DeclineReason {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

/// The classified result of one participant's handling of one question.
///
/// Exactly one variant is populated: the participant answered, declined
/// with a reason, or returned a payload the coordinator could not parse.
#[derive(Debug, Clone, PartialEq)]
pub enum OutcomePayload {
    Answered(Answer),
    Declined(DeclineReason),
    Malformed(MalformedResponse),
}

/// Timing metadata of the request-response operation: when it started,
/// when it ended, and the measured duration (end minus start).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingInfo {
    pub started: DateTime<Utc>,
    pub ended: DateTime<Utc>,
    pub duration: Duration,
}

/// A participant's outcome plus its timing metadata.
///
/// Timing is attached only by the round bookkeeping, for participants
/// that completed within the slack-widened wait; participants that blew
/// the strict deadline are removed from the result map entirely and thus
/// never carry timing.
#[derive(Debug, Clone, PartialEq)]
pub struct ParticipantOutcome {
    pub payload: OutcomePayload,
    pub timing: Option<TimingInfo>,
}

impl ParticipantOutcome {
    pub fn answered(answer: Answer) -> Self {
        Self { payload: OutcomePayload::Answered(answer), timing: None }
    }

    pub fn declined(reason: DeclineReason) -> Self {
        Self { payload: OutcomePayload::Declined(reason), timing: None }
    }

    pub fn malformed(error: MalformedResponse) -> Self {
        Self { payload: OutcomePayload::Malformed(error), timing: None }
    }

    /// Short label of the payload kind, for logs and storage records.
    pub fn kind(&self) -> &'static str {
        match &self.payload {
            OutcomePayload::Answered(_) => "answered",
            OutcomePayload::Declined(_) => "declined",
            OutcomePayload::Malformed(_) => "malformed",
        }
    }
}

/// Mapping participant -> outcome for one question, produced fresh per
/// round and discarded after handoff to storage.
pub type RoundResult = HashMap<Participant, ParticipantOutcome>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_kind_labels() {
        let answer = Answer {
            text: "hello".to_string(),
            reported_time_ms: 0,
            resources: vec![],
            title_foci: String::new(),
            body_foci: String::new(),
            summary: String::new(),
        };
        assert_eq!(ParticipantOutcome::answered(answer).kind(), "answered");
        assert_eq!(
            ParticipantOutcome::declined(DeclineReason::new("busy")).kind(),
            "declined"
        );
    }

    #[test]
    fn test_fresh_outcome_has_no_timing() {
        let outcome = ParticipantOutcome::declined(DeclineReason::new(""));
        assert!(outcome.timing.is_none());
    }
}
