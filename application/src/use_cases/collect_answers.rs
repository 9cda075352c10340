//! Fan-out answer collection
//!
//! Sends one question to all participants concurrently and collects
//! their outcomes into a shared map under a deadline budget. This is the
//! partial-failure core of the system: every per-participant failure
//! (bad status, malformed payload, transport error, timeout) is absorbed
//! and logged, and only participants that completed within the strict
//! maximum allowed duration survive into the round result.

use crate::ports::participant_connector::{QuestionSender, SendError, SendOutcome};
use gauntlet_domain::{
    AnswerLimits, MalformedResponse, ParsedResponse, Participant, ParticipantOutcome, Question,
    RequestTimingParameters, RoundResult, TimingInfo, parse_answer_payload,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Errors of the collection pass itself.
///
/// Per-participant failures are never errors; the only failure mode is a
/// structural precondition violation, which indicates a bug in the
/// caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollectError {
    #[error("BUG: the shared outcome map was not empty at round start")]
    DirtyOutcomeMap,
}

/// The participant -> outcome map of one round, shared between the
/// response tasks and the draining loop.
///
/// The response task that received a participant's reply is the single
/// writer of that participant's entry; a second write for the same
/// participant is refused and reported as an internal-consistency bug.
#[derive(Clone, Default)]
pub struct SharedOutcomeMap {
    inner: Arc<Mutex<RoundResult>>,
}

impl SharedOutcomeMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RoundResult> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Atomic insert-if-absent. The existing entry always wins.
    fn insert_if_absent(&self, participant: Participant, outcome: ParticipantOutcome) {
        let mut map = self.lock();
        if let Some(existing) = map.get(&participant) {
            error!(
                participant = %participant,
                existing_kind = existing.kind(),
                refused_kind = outcome.kind(),
                "outcome map already contains an entry for this participant; \
                 refusing to overwrite. This indicates a bug in the round bookkeeping."
            );
            return;
        }
        map.insert(participant, outcome);
    }

    /// Attach timing metadata to an accepted participant's entry, if the
    /// participant wrote one. A completed request without a map entry is
    /// normal: it follows an unsuccessful status code.
    fn attach_timing(&self, participant: &Participant, timing: TimingInfo) -> bool {
        let mut map = self.lock();
        match map.get_mut(participant) {
            Some(outcome) => {
                outcome.timing = Some(timing);
                true
            }
            None => false,
        }
    }

    /// Drop every entry whose participant is not in the succeeded set.
    fn retain_only(&self, succeeded: &HashSet<Participant>) {
        self.lock().retain(|participant, _| succeeded.contains(participant));
    }

    /// Consume the map into the final round result.
    pub fn into_result(self) -> RoundResult {
        match Arc::try_unwrap(self.inner) {
            Ok(mutex) => mutex.into_inner().unwrap_or_else(PoisonError::into_inner),
            // A cancelled task may still hold a clone until the runtime
            // drops it; fall back to copying out of the shared map.
            Err(arc) => arc.lock().unwrap_or_else(PoisonError::into_inner).clone(),
        }
    }
}

/// How one participant task ended, as seen by the draining loop.
#[derive(Debug)]
enum TaskEnd {
    /// The request-response completed (successful status with the
    /// outcome published to the map, or unsuccessful status with no
    /// entry). Duration decides acceptance.
    Completed { timing: TimingInfo },
    /// Connection or protocol failure; nothing was written.
    TransportFailed(SendError),
    /// The task observed its cancellation token and stopped early.
    Cancelled,
}

/// Sends a question to all participants concurrently and collects their
/// outcomes under the configured deadline budget.
pub struct AnswerCollector {
    timing: RequestTimingParameters,
    limits: AnswerLimits,
}

impl AnswerCollector {
    pub fn new(timing: RequestTimingParameters, limits: AnswerLimits) -> Self {
        Self { timing, limits }
    }

    /// Fan the question out and fill `outcomes`.
    ///
    /// On return, `outcomes` contains entries only for participants that
    /// both produced output and completed within the maximum allowed
    /// duration; timing metadata is attached to every surviving entry.
    pub async fn collect(
        &self,
        sender: Arc<dyn QuestionSender>,
        participants: &[Participant],
        question: &Question,
        outcomes: &SharedOutcomeMap,
    ) -> Result<(), CollectError> {
        if !outcomes.is_empty() {
            return Err(CollectError::DirtyOutcomeMap);
        }

        let question = Arc::new(question.clone());
        info!(question_id = %question.id, participants = participants.len(), "sending requests");

        let mut tasks = Vec::with_capacity(participants.len());
        for participant in participants {
            let token = CancellationToken::new();
            let handle = tokio::spawn(Self::request_task(
                Arc::clone(&sender),
                participant.clone(),
                Arc::clone(&question),
                outcomes.clone(),
                self.limits,
                token.clone(),
            ));
            tasks.push((participant.clone(), token, handle));
        }

        let succeeded = self.drain_tasks(tasks, outcomes).await;

        // Remove those who did not finish in time but did write results.
        // All tasks are stopped by now, so no late entry can appear after
        // this pass.
        outcomes.retain_only(&succeeded);
        info!(
            question_id = %question.id,
            accepted = succeeded.len(),
            "sending requests - done"
        );
        Ok(())
    }

    /// Wait for each task in spawn order, classify its end, and build the
    /// set of participants that succeeded within the deadline.
    async fn drain_tasks(
        &self,
        tasks: Vec<(
            Participant,
            CancellationToken,
            tokio::task::JoinHandle<TaskEnd>,
        )>,
        outcomes: &SharedOutcomeMap,
    ) -> HashSet<Participant> {
        let total_wait = self.timing.total_wait();
        let maximum_allowed = self.timing.maximum_allowed_duration();

        let mut succeeded = HashSet::new();
        let loop_start = Instant::now();
        let mut extra_wait = Duration::ZERO;
        for (participant, token, mut handle) in tasks {
            // Later-drained participants get slightly more wait slack to
            // compensate for drain-order bias; the accept/reject deadline
            // below is unaffected.
            extra_wait += self.timing.wait_slack_increment;
            let elapsed = loop_start.elapsed();
            let iteration_wait = total_wait.saturating_sub(elapsed) + extra_wait;
            debug!(
                participant = %participant,
                wait_ms = iteration_wait.as_millis() as u64,
                "waiting for participant task"
            );

            match tokio::time::timeout(iteration_wait, &mut handle).await {
                Err(_elapsed) => {
                    info!(
                        participant = %participant,
                        "request timed out waiting; cancelling the in-flight task"
                    );
                    token.cancel();
                    handle.abort();
                }
                Ok(Err(join_error)) => {
                    if join_error.is_cancelled() {
                        info!(participant = %participant, "request task was cancelled");
                    } else {
                        error!(
                            participant = %participant,
                            error = %join_error,
                            "request task failed to run; round continues"
                        );
                    }
                }
                Ok(Ok(TaskEnd::Cancelled)) => {
                    info!(participant = %participant, "request task observed cancellation");
                }
                Ok(Ok(TaskEnd::TransportFailed(send_error))) => {
                    error!(
                        participant = %participant,
                        error = %send_error,
                        "request failed to execute; round continues"
                    );
                }
                Ok(Ok(TaskEnd::Completed { timing })) => {
                    info!(participant = %participant, "participant finished question processing");
                    if timing.duration <= maximum_allowed {
                        succeeded.insert(participant.clone());
                        // The outcome (if any) was already published by the
                        // response task; only the timing is attached here.
                        let in_map = outcomes.attach_timing(&participant, timing);
                        if !in_map {
                            info!(
                                participant = %participant,
                                "request-response completed with no recorded outcome \
                                 (unsuccessful status code)"
                            );
                        }
                    } else {
                        info!(
                            participant = %participant,
                            duration_ms = timing.duration.as_millis() as u64,
                            allowed_ms = maximum_allowed.as_millis() as u64,
                            "participant finished, but not in time; its outcome (if any) \
                             will be discarded"
                        );
                    }
                }
            }
        }
        succeeded
    }

    /// One request-response task. Publishes the participant's outcome
    /// into the shared map as soon as it is known; acceptance is decided
    /// later by the draining loop from the measured duration.
    async fn request_task(
        sender: Arc<dyn QuestionSender>,
        participant: Participant,
        question: Arc<Question>,
        outcomes: SharedOutcomeMap,
        limits: AnswerLimits,
        token: CancellationToken,
    ) -> TaskEnd {
        let started_wall = chrono::Utc::now();
        let started = Instant::now();

        let reply = tokio::select! {
            _ = token.cancelled() => return TaskEnd::Cancelled,
            reply = sender.send(&participant, &question) => reply,
        };

        match reply {
            Err(send_error) => TaskEnd::TransportFailed(send_error),
            Ok(SendOutcome::UnsuccessfulStatus { code }) => {
                warn!(
                    participant = %participant,
                    status = code,
                    "unsuccessful http status code; response body ignored"
                );
                TaskEnd::Completed { timing: Self::finish_timing(started_wall, started) }
            }
            Ok(SendOutcome::Body(body)) => {
                // Cancellation requested while the response was in
                // flight: stop before parsing.
                if token.is_cancelled() {
                    return TaskEnd::Cancelled;
                }
                let outcome = match parse_answer_payload(&body, &limits) {
                    Ok(ParsedResponse::Answered(answer)) => ParticipantOutcome::answered(answer),
                    Ok(ParsedResponse::Declined(reason)) => ParticipantOutcome::declined(reason),
                    Err(malformed) => {
                        warn!(
                            participant = %participant,
                            error = %malformed,
                            "failed to parse participant response; \
                             this is the participant's error, the challenge continues"
                        );
                        ParticipantOutcome::malformed(malformed)
                    }
                };
                // Checked again before writing the outcome.
                if token.is_cancelled() {
                    return TaskEnd::Cancelled;
                }
                outcomes.insert_if_absent(participant, outcome);
                TaskEnd::Completed { timing: Self::finish_timing(started_wall, started) }
            }
        }
    }

    fn finish_timing(started_wall: chrono::DateTime<chrono::Utc>, started: Instant) -> TimingInfo {
        TimingInfo {
            started: started_wall,
            ended: chrono::Utc::now(),
            duration: started.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use gauntlet_domain::{Answer, DeclineReason, OutcomePayload};
    use std::collections::HashMap;

    fn timing_1000_200_250() -> RequestTimingParameters {
        RequestTimingParameters {
            time_for_answer: Duration::from_millis(1000),
            extra_request_response_time: Duration::from_millis(200),
            wait_slack: Duration::from_millis(250),
            wait_slack_increment: Duration::from_millis(200),
        }
    }

    fn limits() -> AnswerLimits {
        AnswerLimits { max_answer_len: 1000, max_summary_len: 250 }
    }

    fn participant(n: usize) -> Participant {
        Participant::new(
            "org",
            format!("sys-{n}"),
            format!("http://localhost:900{n}/answer"),
            "team@example.org",
        )
    }

    fn question() -> Question {
        Question::new("Q1", "How do magnets work?", "Serious answers only.", "Science", Utc::now())
    }

    fn answered_body(text: &str) -> String {
        format!(r#"<answer answered="yes" time="5"><content>{text}</content></answer>"#)
    }

    /// A sender scripted per participant: an artificial delay followed by
    /// a canned reply.
    struct ScriptedSender {
        scripts: HashMap<String, (Duration, Result<SendOutcome, SendError>)>,
    }

    impl ScriptedSender {
        fn new() -> Self {
            Self { scripts: HashMap::new() }
        }

        fn respond(
            mut self,
            participant: &Participant,
            delay: Duration,
            reply: Result<SendOutcome, SendError>,
        ) -> Self {
            self.scripts.insert(participant.unique_id(), (delay, reply));
            self
        }
    }

    #[async_trait]
    impl QuestionSender for ScriptedSender {
        async fn send(
            &self,
            participant: &Participant,
            _question: &Question,
        ) -> Result<SendOutcome, SendError> {
            let (delay, reply) = self
                .scripts
                .get(&participant.unique_id())
                .expect("unscripted participant")
                .clone();
            tokio::time::sleep(delay).await;
            reply
        }
    }

    async fn collect_with(
        sender: ScriptedSender,
        participants: &[Participant],
    ) -> RoundResult {
        let collector = AnswerCollector::new(timing_1000_200_250(), limits());
        let outcomes = SharedOutcomeMap::new();
        collector
            .collect(Arc::new(sender), participants, &question(), &outcomes)
            .await
            .unwrap();
        outcomes.into_result()
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_answer_is_accepted_with_timing() {
        let p = participant(1);
        let sender = ScriptedSender::new().respond(
            &p,
            Duration::from_millis(500),
            Ok(SendOutcome::Body(answered_body("hello"))),
        );
        let result = collect_with(sender, std::slice::from_ref(&p)).await;

        assert_eq!(result.len(), 1);
        let outcome = &result[&p];
        match &outcome.payload {
            OutcomePayload::Answered(answer) => assert_eq!(answer.text, "hello"),
            other => panic!("expected an answer, got {:?}", other),
        }
        let timing = outcome.timing.expect("accepted outcome must carry timing");
        assert_eq!(timing.duration, Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_responders_are_dropped_even_with_valid_answers() {
        let (p1, p2, p3) = (participant(1), participant(2), participant(3));
        // Maximum allowed duration is 1000 + 200 = 1200ms. The slack only
        // widens the wait, so the two late (but still waited-for)
        // responders are discarded after the fact.
        let sender = ScriptedSender::new()
            .respond(&p1, Duration::from_millis(500), Ok(SendOutcome::Body(answered_body("a"))))
            .respond(&p2, Duration::from_millis(1250), Ok(SendOutcome::Body(answered_body("b"))))
            .respond(&p3, Duration::from_millis(1400), Ok(SendOutcome::Body(answered_body("c"))));
        let result = collect_with(sender, &[p1.clone(), p2, p3]).await;

        assert_eq!(result.len(), 1);
        assert!(result.contains_key(&p1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_exactly_at_deadline_is_accepted() {
        let p = participant(1);
        let sender = ScriptedSender::new().respond(
            &p,
            Duration::from_millis(1200),
            Ok(SendOutcome::Body(answered_body("boundary"))),
        );
        let result = collect_with(sender, std::slice::from_ref(&p)).await;
        assert!(result.contains_key(&p));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_participant_is_cancelled_and_absent() {
        let p = participant(1);
        let sender = ScriptedSender::new().respond(
            &p,
            Duration::from_secs(60),
            Ok(SendOutcome::Body(answered_body("way too late"))),
        );
        let result = collect_with(sender, std::slice::from_ref(&p)).await;
        assert!(result.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_body_is_recorded_as_outcome_not_error() {
        let p = participant(1);
        let sender = ScriptedSender::new().respond(
            &p,
            Duration::from_millis(100),
            Ok(SendOutcome::Body("not xml at all <".to_string())),
        );
        let result = collect_with(sender, std::slice::from_ref(&p)).await;

        assert_eq!(result.len(), 1);
        assert!(matches!(result[&p].payload, OutcomePayload::Malformed(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_decline_is_recorded_with_reason() {
        let p = participant(1);
        let sender = ScriptedSender::new().respond(
            &p,
            Duration::from_millis(100),
            Ok(SendOutcome::Body(
                r#"<answer answered="no"><discard-reason>busy</discard-reason></answer>"#
                    .to_string(),
            )),
        );
        let result = collect_with(sender, std::slice::from_ref(&p)).await;

        assert_eq!(
            result[&p].payload,
            OutcomePayload::Declined(DeclineReason::new("busy"))
        );
        assert!(result[&p].timing.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsuccessful_status_leaves_participant_absent() {
        let p = participant(1);
        let sender = ScriptedSender::new().respond(
            &p,
            Duration::from_millis(100),
            Ok(SendOutcome::UnsuccessfulStatus { code: 503 }),
        );
        let result = collect_with(sender, std::slice::from_ref(&p)).await;
        assert!(result.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_leaves_participant_absent() {
        let p = participant(1);
        let sender = ScriptedSender::new().respond(
            &p,
            Duration::from_millis(100),
            Err(SendError::Transport("connection refused".to_string())),
        );
        let result = collect_with(sender, std::slice::from_ref(&p)).await;
        assert!(result.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_bad_participant_does_not_affect_others() {
        let (p1, p2, p3) = (participant(1), participant(2), participant(3));
        let sender = ScriptedSender::new()
            .respond(&p1, Duration::from_millis(200), Ok(SendOutcome::Body(answered_body("ok"))))
            .respond(&p2, Duration::from_millis(50), Err(SendError::Transport("reset".into())))
            .respond(&p3, Duration::from_millis(300), Ok(SendOutcome::Body("garbage".into())));
        let participants = [p1.clone(), p2.clone(), p3.clone()];
        let result = collect_with(sender, &participants).await;

        assert_eq!(result.len(), 2);
        assert!(matches!(result[&p1].payload, OutcomePayload::Answered(_)));
        assert!(matches!(result[&p3].payload, OutcomePayload::Malformed(_)));
        // Result keys are always a subset of the input participants.
        assert!(result.keys().all(|k| participants.contains(k)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dirty_outcome_map_is_a_fatal_precondition() {
        let p = participant(1);
        let outcomes = SharedOutcomeMap::new();
        outcomes.insert_if_absent(
            p.clone(),
            ParticipantOutcome::declined(DeclineReason::new("stale")),
        );

        let sender = ScriptedSender::new().respond(
            &p,
            Duration::from_millis(100),
            Ok(SendOutcome::Body(answered_body("x"))),
        );
        let collector = AnswerCollector::new(timing_1000_200_250(), limits());
        let err = collector
            .collect(Arc::new(sender), std::slice::from_ref(&p), &question(), &outcomes)
            .await
            .unwrap_err();
        assert_eq!(err, CollectError::DirtyOutcomeMap);
    }

    #[test]
    fn test_insert_if_absent_refuses_overwrite() {
        let map = SharedOutcomeMap::new();
        let p = Participant::new("org", "sys", "http://a.example", "a@example.org");
        map.insert_if_absent(p.clone(), ParticipantOutcome::declined(DeclineReason::new("first")));
        map.insert_if_absent(
            p.clone(),
            ParticipantOutcome::answered(Answer {
                text: "second".into(),
                reported_time_ms: 0,
                resources: vec![],
                title_foci: String::new(),
                body_foci: String::new(),
                summary: String::new(),
            }),
        );
        let result = map.into_result();
        assert_eq!(
            result[&p].payload,
            OutcomePayload::Declined(DeclineReason::new("first"))
        );
    }

    #[test]
    fn test_retain_only_drops_non_succeeded_entries() {
        let map = SharedOutcomeMap::new();
        let keep = Participant::new("org", "keep", "http://a.example", "a@example.org");
        let drop = Participant::new("org", "drop", "http://b.example", "b@example.org");
        map.insert_if_absent(keep.clone(), ParticipantOutcome::declined(DeclineReason::new("")));
        map.insert_if_absent(drop.clone(), ParticipantOutcome::declined(DeclineReason::new("")));

        let succeeded = HashSet::from([keep.clone()]);
        map.retain_only(&succeeded);

        let result = map.into_result();
        assert_eq!(result.len(), 1);
        assert!(result.contains_key(&keep));
    }
}
