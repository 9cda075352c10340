//! HTTP transport to participant systems
//!
//! One [`reqwest::Client`] per round, its idle pool sized to the number
//! of participants so every system keeps a warm connection for the
//! duration of the fan-out. The question travels as a form-encoded POST
//! with the fields `qid`, `title`, `body` and `category`.

use async_trait::async_trait;
use gauntlet_application::{ParticipantConnector, QuestionSender, SendError, SendOutcome};
use gauntlet_domain::{AnswerLimits, Participant, Question, RequestTimingParameters};
use tracing::{debug, warn};

/// Allowance for XML markup, attributes and resource lists around the
/// answer text itself when capping the response body read.
const RESPONSE_ENVELOPE_BYTES: usize = 8 * 1024;

/// Builds one round-scoped HTTP sender per round.
pub struct HttpParticipantConnector {
    timing: RequestTimingParameters,
    max_body_bytes: usize,
}

impl HttpParticipantConnector {
    pub fn new(timing: RequestTimingParameters, limits: AnswerLimits) -> Self {
        // Answer text is capped in characters; budget four bytes per
        // character plus the envelope.
        let max_body_bytes = limits.max_answer_len * 4 + RESPONSE_ENVELOPE_BYTES;
        Self { timing, max_body_bytes }
    }
}

#[async_trait]
impl ParticipantConnector for HttpParticipantConnector {
    async fn connect(
        &self,
        participant_count: usize,
    ) -> Result<Box<dyn QuestionSender>, SendError> {
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(participant_count.max(1))
            .timeout(self.timing.total_wait())
            .build()
            .map_err(|e| SendError::Setup(e.to_string()))?;
        debug!(
            participant_count,
            timeout_ms = self.timing.total_wait().as_millis() as u64,
            "round-scoped HTTP client built"
        );
        Ok(Box::new(HttpQuestionSender { client, max_body_bytes: self.max_body_bytes }))
    }
}

struct HttpQuestionSender {
    client: reqwest::Client,
    max_body_bytes: usize,
}

fn form_fields(question: &Question) -> [(&'static str, &str); 4] {
    [
        ("qid", question.id.as_str()),
        ("title", question.title.as_str()),
        ("body", question.body.as_str()),
        ("category", question.category.as_str()),
    ]
}

#[async_trait]
impl QuestionSender for HttpQuestionSender {
    async fn send(
        &self,
        participant: &Participant,
        question: &Question,
    ) -> Result<SendOutcome, SendError> {
        let response = self
            .client
            .post(&participant.server_url)
            .form(&form_fields(question))
            .send()
            .await
            .map_err(|e| SendError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Ok(SendOutcome::UnsuccessfulStatus { code: status.as_u16() });
        }

        if let Some(length) = response.content_length()
            && length > self.max_body_bytes as u64
        {
            return Err(SendError::Transport(format!(
                "response body too large: {} bytes (cap {})",
                length, self.max_body_bytes
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| SendError::Transport(e.to_string()))?;
        if body.len() > self.max_body_bytes {
            warn!(
                participant = %participant,
                bytes = body.len(),
                "response body over the cap despite content-length check"
            );
            return Err(SendError::Transport(format!(
                "response body too large: {} bytes (cap {})",
                body.len(),
                self.max_body_bytes
            )));
        }

        Ok(SendOutcome::Body(String::from_utf8_lossy(&body).into_owned()))
    }
}
