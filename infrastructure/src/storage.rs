//! JSONL file storage for questions and round results
//!
//! Append-only files, one JSON object per line, written through a
//! buffered writer behind a mutex so concurrent rounds interleave whole
//! lines. Flushed after every record; a challenge crash loses at most
//! the line being written.

use chrono::SecondsFormat;
use gauntlet_application::{AnswerStore, QuestionStore, StorageError};
use gauntlet_domain::{OutcomePayload, Question, RoundResult, TimingInfo};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use async_trait::async_trait;
use tracing::{debug, error};

/// Shared line-oriented writer for both stores.
#[derive(Debug)]
struct JsonlWriter {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlWriter {
    fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Fatal(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| StorageError::Fatal(format!("cannot open {}: {}", path.display(), e)))?;
        Ok(Self { writer: Mutex::new(BufWriter::new(file)), path: path.to_path_buf() })
    }

    fn write_line(&self, line: &str) -> Result<(), StorageError> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(writer, "{}", line)
            .and_then(|_| writer.flush())
            .map_err(|e| StorageError::Fatal(format!("write to {} failed: {}", self.path.display(), e)))
    }
}

impl Drop for JsonlWriter {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

fn timestamp_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Serialize)]
struct QuestionRecord<'a> {
    #[serde(rename = "type")]
    record_type: &'static str,
    timestamp: String,
    qid: &'a str,
    title: &'a str,
    body: &'a str,
    category: &'a str,
    published: String,
}

#[derive(Serialize)]
struct TimingRecord {
    started: String,
    ended: String,
    duration_ms: u64,
}

impl From<&TimingInfo> for TimingRecord {
    fn from(timing: &TimingInfo) -> Self {
        Self {
            started: timing.started.to_rfc3339_opts(SecondsFormat::Millis, true),
            ended: timing.ended.to_rfc3339_opts(SecondsFormat::Millis, true),
            duration_ms: timing.duration.as_millis() as u64,
        }
    }
}

#[derive(Serialize)]
struct AnswerRecord<'a> {
    #[serde(rename = "type")]
    record_type: &'static str,
    timestamp: String,
    qid: &'a str,
    participant: String,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    answer: Option<&'a gauntlet_domain::Answer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    decline_reason: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    malformed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timing: Option<TimingRecord>,
}

/// Appends every received question to a JSONL file.
#[derive(Debug)]
pub struct JsonlQuestionStore {
    writer: JsonlWriter,
}

impl JsonlQuestionStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Ok(Self { writer: JsonlWriter::open(path)? })
    }
}

#[async_trait]
impl QuestionStore for JsonlQuestionStore {
    async fn store_question(&self, question: &Question) -> Result<(), StorageError> {
        let record = QuestionRecord {
            record_type: "question",
            timestamp: timestamp_now(),
            qid: &question.id,
            title: &question.title,
            body: &question.body,
            category: &question.category,
            published: question.published.to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        let line = serde_json::to_string(&record)
            .map_err(|e| StorageError::NonFatal(format!("question record not serializable: {e}")))?;
        self.writer.write_line(&line)?;
        debug!(question_id = %question.id, "question stored");
        Ok(())
    }
}

/// Appends one line per surviving participant outcome to a JSONL file.
pub struct JsonlAnswerStore {
    writer: JsonlWriter,
}

impl JsonlAnswerStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Ok(Self { writer: JsonlWriter::open(path)? })
    }
}

#[async_trait]
impl AnswerStore for JsonlAnswerStore {
    async fn store_answers(
        &self,
        question: &Question,
        answers: &RoundResult,
    ) -> Result<(), StorageError> {
        let mut lost = 0usize;
        for (participant, outcome) in answers {
            let record = AnswerRecord {
                record_type: "answer",
                timestamp: timestamp_now(),
                qid: &question.id,
                participant: participant.unique_id(),
                kind: outcome.kind(),
                answer: match &outcome.payload {
                    OutcomePayload::Answered(answer) => Some(answer),
                    _ => None,
                },
                decline_reason: match &outcome.payload {
                    OutcomePayload::Declined(decline) => Some(decline.reason.as_str()),
                    _ => None,
                },
                malformed: match &outcome.payload {
                    OutcomePayload::Malformed(parse_error) => Some(parse_error.to_string()),
                    _ => None,
                },
                timing: outcome.timing.as_ref().map(TimingRecord::from),
            };
            match serde_json::to_string(&record) {
                Ok(line) => self.writer.write_line(&line)?,
                Err(serde_error) => {
                    error!(
                        participant = %participant,
                        error = %serde_error,
                        "answer record not serializable; this record is lost"
                    );
                    lost += 1;
                }
            }
        }
        if lost > 0 {
            return Err(StorageError::NonFatal(format!("{lost} answer record(s) lost")));
        }
        debug!(question_id = %question.id, records = answers.len(), "round result stored");
        Ok(())
    }
}
