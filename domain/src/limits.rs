//! Time budgets and answer-size limits for one round

use std::time::Duration;

/// Time restrictions on a participant's request-response operation.
///
/// The deadline used to accept or reject an answer is
/// `time_for_answer + extra_request_response_time`. The slack values only
/// widen how long the draining loop is willing to wait before classifying
/// a task as timed out; they never admit a late answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTimingParameters {
    /// Budget for the participant to compute its answer.
    pub time_for_answer: Duration,
    /// Allowance for request and response transfer on top of the answer budget.
    pub extra_request_response_time: Duration,
    /// Flat slack added to the wait so the loop itself does not produce
    /// false timeouts.
    pub wait_slack: Duration,
    /// Extra wait granted to each successive participant drained, to
    /// compensate for wait-queue ordering bias.
    pub wait_slack_increment: Duration,
}

impl RequestTimingParameters {
    /// The strict accept/reject deadline, excluding all slack.
    pub fn maximum_allowed_duration(&self) -> Duration {
        self.time_for_answer + self.extra_request_response_time
    }

    /// The total wait budget of the draining loop, including flat slack.
    pub fn total_wait(&self) -> Duration {
        self.maximum_allowed_duration() + self.wait_slack
    }
}

impl Default for RequestTimingParameters {
    fn default() -> Self {
        Self {
            time_for_answer: Duration::from_secs(60),
            extra_request_response_time: Duration::from_secs(10),
            wait_slack: Duration::from_millis(250),
            wait_slack_increment: Duration::from_millis(200),
        }
    }
}

/// Maximum lengths (in characters) of answer fields. Longer values are
/// silently truncated, never rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerLimits {
    pub max_answer_len: usize,
    pub max_summary_len: usize,
}

impl Default for AnswerLimits {
    fn default() -> Self {
        Self { max_answer_len: 1000, max_summary_len: 250 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maximum_allowed_duration_excludes_slack() {
        let timing = RequestTimingParameters {
            time_for_answer: Duration::from_millis(1000),
            extra_request_response_time: Duration::from_millis(200),
            wait_slack: Duration::from_millis(250),
            wait_slack_increment: Duration::from_millis(200),
        };
        assert_eq!(timing.maximum_allowed_duration(), Duration::from_millis(1200));
        assert_eq!(timing.total_wait(), Duration::from_millis(1450));
    }
}
