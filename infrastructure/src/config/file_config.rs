//! Raw TOML configuration data types
//!
//! These structs mirror the structure of `gauntlet.toml` exactly and are
//! deserialized directly. Durations are configured in milliseconds,
//! except the challenge length which reads more naturally as
//! hours/minutes/seconds fields.

use gauntlet_application::ChallengeParameters;
use gauntlet_domain::{AnswerLimits, RequestTimingParameters};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Challenge run length, concurrency and pacing
    pub challenge: FileChallengeConfig,
    /// Per-request timeout arithmetic and answer size limits
    pub request: FileRequestConfig,
    /// Question feed source and filtering
    pub feed: FileFeedConfig,
    /// Question and answer output files
    pub storage: FileStorageConfig,
    /// Participant roster source
    pub participants: FileParticipantsConfig,
    /// Operator shutdown signal
    pub shutdown: FileShutdownConfig,
}

impl FileConfig {
    /// Check the configuration for values the challenge cannot run with.
    /// Returns human-readable problems; an empty list means usable.
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.challenge.duration().is_zero() {
            problems.push("challenge duration is zero; nothing would run".to_string());
        }
        if self.challenge.max_concurrent_rounds == 0 {
            problems.push(
                "challenge.max_concurrent_rounds is 0; every question would be shed".to_string(),
            );
        }
        if self.request.time_for_answer_ms == 0 {
            problems.push("request.time_for_answer_ms is 0; no answer could arrive in time".to_string());
        }
        if self.request.max_answer_len == 0 {
            problems.push("request.max_answer_len is 0; every answer would be emptied".to_string());
        }
        if self.feed.questions_file.is_empty() {
            problems.push("feed.questions_file is empty".to_string());
        }
        problems
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileChallengeConfig {
    pub duration_hours: u64,
    pub duration_minutes: u64,
    pub duration_seconds: u64,
    pub max_concurrent_rounds: usize,
    /// Sleep between scheduler iterations, leaving participants room to
    /// finish one question before the next.
    pub pacing_ms: u64,
    /// Recovery sleep after an empty feed tick or a shed question.
    pub safe_side_sleep_ms: u64,
}

impl Default for FileChallengeConfig {
    fn default() -> Self {
        Self {
            duration_hours: 24,
            duration_minutes: 0,
            duration_seconds: 0,
            max_concurrent_rounds: 10,
            pacing_ms: 60_000,
            safe_side_sleep_ms: 500,
        }
    }
}

impl FileChallengeConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(
            self.duration_hours * 3600 + self.duration_minutes * 60 + self.duration_seconds,
        )
    }

    pub fn to_parameters(&self) -> ChallengeParameters {
        ChallengeParameters {
            duration: self.duration(),
            max_concurrent_rounds: self.max_concurrent_rounds,
            safe_side_sleep: Duration::from_millis(self.safe_side_sleep_ms),
        }
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRequestConfig {
    /// Time a participant is allowed to spend producing its answer.
    pub time_for_answer_ms: u64,
    /// Extra budget for the request and response traveling the network.
    pub extra_request_response_time_ms: u64,
    /// Initial grace beyond the deadline before a request is abandoned.
    pub wait_slack_ms: u64,
    /// Additional grace added for each participant already drained.
    pub wait_slack_increment_ms: u64,
    pub max_answer_len: usize,
    pub max_summary_len: usize,
}

impl Default for FileRequestConfig {
    fn default() -> Self {
        Self {
            time_for_answer_ms: 60_000,
            extra_request_response_time_ms: 10_000,
            wait_slack_ms: 250,
            wait_slack_increment_ms: 200,
            max_answer_len: 1000,
            max_summary_len: 250,
        }
    }
}

impl FileRequestConfig {
    pub fn to_timing(&self) -> RequestTimingParameters {
        RequestTimingParameters {
            time_for_answer: Duration::from_millis(self.time_for_answer_ms),
            extra_request_response_time: Duration::from_millis(self.extra_request_response_time_ms),
            wait_slack: Duration::from_millis(self.wait_slack_ms),
            wait_slack_increment: Duration::from_millis(self.wait_slack_increment_ms),
        }
    }

    pub fn to_limits(&self) -> AnswerLimits {
        AnswerLimits {
            max_answer_len: self.max_answer_len,
            max_summary_len: self.max_summary_len,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileFeedConfig {
    pub questions_file: String,
    /// Only titles starting with this prefix are served; empty accepts all.
    pub title_prefix: String,
}

impl Default for FileFeedConfig {
    fn default() -> Self {
        Self { questions_file: "questions.jsonl".to_string(), title_prefix: String::new() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStorageConfig {
    pub questions_file: String,
    pub answers_file: String,
}

impl Default for FileStorageConfig {
    fn default() -> Self {
        Self {
            questions_file: "stored-questions.jsonl".to_string(),
            answers_file: "stored-answers.jsonl".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileParticipantsConfig {
    pub roster_file: String,
}

impl Default for FileParticipantsConfig {
    fn default() -> Self {
        Self { roster_file: "participants.tsv".to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileShutdownConfig {
    pub sentinel_file: String,
}

impl Default for FileShutdownConfig {
    fn default() -> Self {
        Self { sentinel_file: "shutdown".to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_partial_config_keeps_defaults() {
        let toml_str = r#"
[challenge]
duration_hours = 0
duration_minutes = 30

[request]
time_for_answer_ms = 45000

[feed]
title_prefix = "Open Question :"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.challenge.duration(), Duration::from_secs(30 * 60));
        assert_eq!(config.challenge.max_concurrent_rounds, 10);
        assert_eq!(config.request.time_for_answer_ms, 45_000);
        assert_eq!(config.request.extra_request_response_time_ms, 10_000);
        assert_eq!(config.feed.title_prefix, "Open Question :");
        assert_eq!(config.storage.answers_file, "stored-answers.jsonl");
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(FileConfig::default().validate().is_empty());
    }

    #[test]
    fn test_validate_flags_unusable_values() {
        let mut config = FileConfig::default();
        config.challenge.duration_hours = 0;
        config.challenge.max_concurrent_rounds = 0;
        let problems = config.validate();
        assert_eq!(problems.len(), 2);
    }

    #[test]
    fn test_timing_conversion() {
        let timing = FileRequestConfig::default().to_timing();
        assert_eq!(timing.maximum_allowed_duration(), Duration::from_millis(70_000));
        assert_eq!(timing.total_wait(), Duration::from_millis(70_250));
    }
}
