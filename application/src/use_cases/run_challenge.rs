//! The challenge loop
//!
//! Pulls questions from the feed and runs one round per question until
//! the planned end time is reached or a shutdown is signaled. Rounds run
//! asynchronously, bounded by a maximum concurrent-rounds limit; when
//! the limit is hit the current question is shed, never queued. A fatal
//! error from any round poisons the challenge and aborts it at the top
//! of the next iteration.

use crate::ports::question_feed::{FeedFatalError, NextQuestion, QuestionFeed};
use crate::ports::shutdown::ShutdownSignal;
use crate::use_cases::pacing::NextQuestionPacing;
use crate::use_cases::run_round::{RoundError, RoundRunner};
use gauntlet_domain::Question;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Errors that end the whole challenge
#[derive(Error, Debug)]
pub enum ChallengeError {
    #[error(transparent)]
    Feed(#[from] FeedFatalError),

    #[error("a question round failed fatally: {0}")]
    Round(RoundError),
}

/// Scheduler-level knobs of one challenge run.
#[derive(Debug, Clone, Copy)]
pub struct ChallengeParameters {
    /// Wall-clock length of the challenge.
    pub duration: Duration,
    /// Bound on simultaneously running rounds; questions arriving above
    /// the bound are shed.
    pub max_concurrent_rounds: usize,
    /// Recovery sleep after an unavailable feed tick or a shed question.
    pub safe_side_sleep: Duration,
}

impl Default for ChallengeParameters {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(24 * 60 * 60),
            max_concurrent_rounds: 10,
            safe_side_sleep: Duration::from_millis(500),
        }
    }
}

/// First-error-wins slot shared between the scheduler loop and its round
/// tasks.
type PoisonSlot = Arc<Mutex<Option<RoundError>>>;

fn set_poison(slot: &PoisonSlot, error: RoundError) {
    let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
    if guard.is_none() {
        *guard = Some(error);
    }
}

fn take_poison(slot: &PoisonSlot) -> Option<RoundError> {
    slot.lock().unwrap_or_else(PoisonError::into_inner).take()
}

/// Runs the challenge: the timed loop over questions and rounds.
pub struct ChallengeScheduler {
    runner: Arc<RoundRunner>,
    feed: Arc<dyn QuestionFeed>,
    shutdown: Arc<dyn ShutdownSignal>,
    pacing: NextQuestionPacing,
    params: ChallengeParameters,
}

impl ChallengeScheduler {
    pub fn new(
        runner: Arc<RoundRunner>,
        feed: Arc<dyn QuestionFeed>,
        shutdown: Arc<dyn ShutdownSignal>,
        pacing: NextQuestionPacing,
        params: ChallengeParameters,
    ) -> Self {
        Self { runner, feed, shutdown, pacing, params }
    }

    pub async fn run(&self) -> Result<(), ChallengeError> {
        let end_time = Instant::now() + self.params.duration;
        info!(
            duration_secs = self.params.duration.as_secs(),
            "challenge started; end time planned"
        );

        let in_flight = Arc::new(AtomicUsize::new(0));
        let poison: PoisonSlot = Arc::new(Mutex::new(None));
        let mut rounds: JoinSet<()> = JoinSet::new();

        while Instant::now() < end_time && !self.shutdown.is_signaled() {
            if let Some(round_error) = take_poison(&poison) {
                error!(
                    "an unrecovered error was reported by a previous round; \
                     aborting the challenge"
                );
                rounds.shutdown().await;
                return Err(ChallengeError::Round(round_error));
            }
            // Reap rounds that already finished, without blocking.
            while rounds.try_join_next().is_some() {}

            match self.feed.next().await? {
                NextQuestion::Unavailable(reason) => {
                    warn!(
                        %reason,
                        sleep_ms = self.params.safe_side_sleep.as_millis() as u64,
                        "feed could not provide a question for the moment; \
                         another attempt next iteration"
                    );
                    tokio::time::sleep(self.params.safe_side_sleep).await;
                }
                NextQuestion::Ready(question) => {
                    self.launch_round(question, &mut rounds, &in_flight, &poison).await;
                }
            }

            self.pacing.wait().await;
        }

        if self.shutdown.is_signaled() {
            warn!("a shutdown signal has been captured; the challenge stops");
        }
        info!("issuing questions - ended; draining in-flight rounds");
        while let Some(joined) = rounds.join_next().await {
            if let Err(join_error) = joined {
                error!(error = %join_error, "a round task did not complete cleanly");
            }
        }
        if let Some(round_error) = take_poison(&poison) {
            return Err(ChallengeError::Round(round_error));
        }

        if Instant::now() >= end_time {
            info!("challenge ended at the planned time");
        } else {
            warn!("note: the challenge ended before the planned end time");
        }
        Ok(())
    }

    async fn launch_round(
        &self,
        question: Question,
        rounds: &mut JoinSet<()>,
        in_flight: &Arc<AtomicUsize>,
        poison: &PoisonSlot,
    ) {
        let running = in_flight.load(Ordering::SeqCst);
        debug!(running, "previously launched rounds still active");
        info!(question_id = %question.id, "operating on question");

        if running >= self.params.max_concurrent_rounds {
            warn!(
                running,
                maximum = self.params.max_concurrent_rounds,
                question_id = %question.id,
                "concurrent-round limit reached; this question is being shed"
            );
            tokio::time::sleep(self.params.safe_side_sleep).await;
            return;
        }

        in_flight.fetch_add(1, Ordering::SeqCst);
        let runner = Arc::clone(&self.runner);
        let in_flight = Arc::clone(in_flight);
        let poison = Arc::clone(poison);
        rounds.spawn(async move {
            let question_id = question.id.clone();
            if let Err(round_error) = runner.operate(question).await {
                error!(
                    question_id = %question_id,
                    error = %round_error,
                    "error when operating on a question"
                );
                set_poison(&poison, round_error);
            }
            info!(question_id = %question_id, "operation on question is done");
            in_flight.fetch_sub(1, Ordering::SeqCst);
        });
        info!("asynchronous operation on the question has been fired");
    }
}
