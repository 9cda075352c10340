//! Inter-round pacing
//!
//! Defines when the next question may be issued. The idea is to leave
//! participants time to finish one question before the next arrives; a
//! reasonable effort, not a guarantee.

use std::time::Duration;
use tracing::debug;

/// Fixed delay between questions. The policy shape is deliberately
/// small so a smarter implementation can replace it later.
#[derive(Debug, Clone, Copy)]
pub struct NextQuestionPacing {
    between_questions: Duration,
}

impl NextQuestionPacing {
    pub fn new(between_questions: Duration) -> Self {
        Self { between_questions }
    }

    /// Block the scheduler until it is time for the next question.
    pub async fn wait(&self) {
        debug!(
            sleep_ms = self.between_questions.as_millis() as u64,
            "pacing sleep before the next question"
        );
        tokio::time::sleep(self.between_questions).await;
    }
}
