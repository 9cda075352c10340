//! Application layer for gauntlet
//!
//! This crate contains the challenge use cases and the port definitions
//! for their collaborators (participant transport, question feed,
//! storage, shutdown signal). It depends only on the domain layer.

pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use ports::{
    participant_connector::{ParticipantConnector, QuestionSender, SendError, SendOutcome},
    question_feed::{FeedFatalError, NextQuestion, QuestionFeed, QuestionFilter},
    shutdown::{NeverSignaled, ShutdownSignal},
    storage::{AnswerStore, QuestionStore, StorageError},
};
pub use use_cases::collect_answers::{AnswerCollector, CollectError, SharedOutcomeMap};
pub use use_cases::pacing::NextQuestionPacing;
pub use use_cases::run_challenge::{ChallengeError, ChallengeParameters, ChallengeScheduler};
pub use use_cases::run_round::{RoundError, RoundRunner};
