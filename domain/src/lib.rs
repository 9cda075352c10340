//! Domain layer for gauntlet
//!
//! This crate contains the challenge entities and value objects, and the
//! parser for participant answer payloads. It has no dependencies on
//! infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Round
//!
//! A round is the processing of one question against all registered
//! participants: the question is fanned out concurrently, each
//! participant's reply is classified into an outcome, and only
//! participants that answered within the allowed duration survive into
//! the round result.
//!
//! ## Outcome
//!
//! A participant's outcome is exactly one of: an answer, an explicit
//! decline with a reason, or a malformed-response error. Outcomes carry
//! timing metadata once the round bookkeeping has accepted them.

pub mod limits;
pub mod outcome;
pub mod participant;
pub mod question;
pub mod response;
pub mod util;

// Re-export commonly used types
pub use limits::{AnswerLimits, RequestTimingParameters};
pub use outcome::{
    Answer, DeclineReason, OutcomePayload, ParticipantOutcome, RoundResult, TimingInfo,
};
pub use participant::{Participant, ParticipantRoster, RosterError};
pub use question::Question;
pub use response::{MalformedResponse, ParsedResponse, parse_answer_payload};
