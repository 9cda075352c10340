//! Question feed port

use async_trait::async_trait;
use gauntlet_domain::Question;
use thiserror::Error;

/// A fatal feed failure. Anything recoverable (no fresh question right
/// now, everything filtered out) is reported as
/// [`NextQuestion::Unavailable`] instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedFatalError {
    #[error("question feed failed fatally: {0}")]
    Fatal(String),

    #[error("question feed internal inconsistency: {0}")]
    Bug(String),
}

/// The result of one feed tick.
#[derive(Debug, Clone, PartialEq)]
pub enum NextQuestion {
    /// A fresh, filter-passing question.
    Ready(Question),
    /// No question this tick; the reason is human-readable and non-fatal.
    Unavailable(String),
}

/// Feeds questions to the scheduler, one per call.
#[async_trait]
pub trait QuestionFeed: Send + Sync {
    async fn next(&self) -> Result<NextQuestion, FeedFatalError>;
}

/// Predicate applied by feed adapters to decide whether a question is
/// suitable for the challenge.
pub trait QuestionFilter: Send + Sync {
    fn accept(&self, question: &Question) -> bool;
}

/// Filter that accepts every question.
pub struct AcceptAll;

impl QuestionFilter for AcceptAll {
    fn accept(&self, _question: &Question) -> bool {
        true
    }
}
