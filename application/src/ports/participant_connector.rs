//! Participant transport port
//!
//! Defines how the application layer delivers a question to one
//! participant endpoint and obtains the raw reply body. The HTTP adapter
//! lives in the infrastructure layer.

use async_trait::async_trait;
use gauntlet_domain::{Participant, Question};
use thiserror::Error;

/// Errors that can occur while sending a question to a participant
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("failed to set up the round transport: {0}")]
    Setup(String),
}

/// What came back from one participant request.
///
/// An unsuccessful HTTP status is not a transport error: the request
/// completed, the participant just did not produce a usable reply, and
/// its body is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// 2xx reply; the raw response body, capped by the transport.
    Body(String),
    /// Reply with a non-2xx status code.
    UnsuccessfulStatus { code: u16 },
}

/// Builds round-scoped senders.
///
/// One sender is created per round, with its connection pool sized to the
/// participant count, and dropped when the round ends. No cross-round
/// connection reuse.
#[async_trait]
pub trait ParticipantConnector: Send + Sync {
    async fn connect(
        &self,
        participant_count: usize,
    ) -> Result<Box<dyn QuestionSender>, SendError>;
}

/// Delivers one question to one participant and returns the reply.
#[async_trait]
pub trait QuestionSender: Send + Sync {
    async fn send(
        &self,
        participant: &Participant,
        question: &Question,
    ) -> Result<SendOutcome, SendError>;
}
