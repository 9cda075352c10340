//! Storage ports for questions and round results

use async_trait::async_trait;
use gauntlet_domain::{Question, RoundResult};
use thiserror::Error;

/// A storage failure, split by severity.
///
/// Fatal means the backend is unusable and the whole challenge must
/// stop; non-fatal means a single record was lost and the round
/// continues. Callers pattern-match on the kind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("fatal storage failure: {0}")]
    Fatal(String),

    #[error("non-fatal storage failure: {0}")]
    NonFatal(String),
}

impl StorageError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, StorageError::Fatal(_))
    }
}

/// Persists the raw question of a round.
///
/// Must be safely callable concurrently from multiple rounds.
#[async_trait]
pub trait QuestionStore: Send + Sync {
    async fn store_question(&self, question: &Question) -> Result<(), StorageError>;
}

/// Persists the surviving outcomes of a round.
///
/// Must be safely callable concurrently from multiple rounds.
#[async_trait]
pub trait AnswerStore: Send + Sync {
    async fn store_answers(
        &self,
        question: &Question,
        answers: &RoundResult,
    ) -> Result<(), StorageError>;
}
