//! One question round
//!
//! Runs the full processing of a single question: persist the raw
//! question concurrently with fanning it out to the participants, then
//! persist the surviving outcomes. Question persistence runs on its own
//! task so that storage latency never delays the requests.

use crate::ports::participant_connector::{ParticipantConnector, SendError};
use crate::ports::storage::{AnswerStore, QuestionStore};
use crate::use_cases::collect_answers::{AnswerCollector, CollectError, SharedOutcomeMap};
use gauntlet_domain::{ParticipantRoster, Question};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

/// Errors that end a round. All of these poison the whole challenge;
/// per-participant failures are absorbed inside the collector and never
/// reach this level.
#[derive(Error, Debug)]
pub enum RoundError {
    #[error("fatal storage failure: {0}")]
    Storage(String),

    #[error(transparent)]
    Collect(#[from] CollectError),

    #[error("failed to set up the participant transport: {0}")]
    Transport(SendError),

    #[error("round was cancelled before completion")]
    Cancelled,
}

/// Orchestrates one round: store the question, send it to every
/// participant, collect and store the answers.
pub struct RoundRunner {
    roster: Arc<ParticipantRoster>,
    connector: Arc<dyn ParticipantConnector>,
    question_store: Arc<dyn QuestionStore>,
    answer_store: Arc<dyn AnswerStore>,
    collector: AnswerCollector,
}

impl RoundRunner {
    pub fn new(
        roster: Arc<ParticipantRoster>,
        connector: Arc<dyn ParticipantConnector>,
        question_store: Arc<dyn QuestionStore>,
        answer_store: Arc<dyn AnswerStore>,
        collector: AnswerCollector,
    ) -> Self {
        Self { roster, connector, question_store, answer_store, collector }
    }

    /// Process one question end to end.
    ///
    /// Both concurrent activities are always joined before returning: a
    /// fatal error from the question-store task is recorded and re-raised
    /// only after the send-and-collect branch has had its chance to run,
    /// and it wins over an error from that branch.
    pub async fn operate(&self, question: Question) -> Result<(), RoundError> {
        let question_task = {
            let store = Arc::clone(&self.question_store);
            let question = question.clone();
            tokio::spawn(async move {
                debug!(question_id = %question.id, "store-question task starts");
                match store.store_question(&question).await {
                    Ok(()) => {
                        debug!(question_id = %question.id, "store-question task ends");
                        Ok(())
                    }
                    Err(storage_error) if storage_error.is_fatal() => Err(storage_error),
                    Err(storage_error) => {
                        error!(
                            question_id = %question.id,
                            error = %storage_error,
                            "failed to store a question; non-fatal, the challenge continues"
                        );
                        Ok(())
                    }
                }
            })
        };

        let send_result = self.send_and_store_answers(&question).await;

        debug!(question_id = %question.id, "joining store-question task");
        let question_result = question_task.await;

        // Join-then-rethrow: the question-store verdict is examined
        // first, even when the send branch failed too.
        match question_result {
            Ok(Ok(())) => {}
            Ok(Err(storage_error)) => return Err(RoundError::Storage(storage_error.to_string())),
            Err(join_error) => {
                error!(error = %join_error, "store-question task did not complete");
                return Err(RoundError::Cancelled);
            }
        }
        send_result
    }

    async fn send_and_store_answers(&self, question: &Question) -> Result<(), RoundError> {
        let sender = self
            .connector
            .connect(self.roster.len())
            .await
            .map_err(RoundError::Transport)?;

        let outcomes = SharedOutcomeMap::new();
        self.collector
            .collect(Arc::from(sender), self.roster.participants(), question, &outcomes)
            .await?;
        let result = outcomes.into_result();

        match self.answer_store.store_answers(question, &result).await {
            Ok(()) => Ok(()),
            Err(storage_error) if storage_error.is_fatal() => {
                Err(RoundError::Storage(storage_error.to_string()))
            }
            Err(storage_error) => {
                error!(
                    question_id = %question.id,
                    error = %storage_error,
                    "failed to store answers; non-fatal, the round result is lost"
                );
                Ok(())
            }
        }
    }
}
