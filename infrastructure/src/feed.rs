//! File-backed question feed
//!
//! Serves questions from a JSONL file, one per scheduler tick, in file
//! order. The file is re-read on every tick so questions appended while
//! the challenge runs are picked up, the way a polled upstream feed
//! would surface them. Lines already served (or skipped) are never
//! served again.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gauntlet_application::{FeedFatalError, NextQuestion, QuestionFeed, QuestionFilter};
use gauntlet_domain::Question;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// One line of the question file.
#[derive(Deserialize)]
struct QuestionFileRecord {
    id: String,
    title: String,
    body: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    published: Option<DateTime<Utc>>,
}

impl QuestionFileRecord {
    fn into_question(self) -> Question {
        Question::new(
            self.id,
            self.title,
            self.body,
            self.category,
            self.published.unwrap_or_else(Utc::now),
        )
    }
}

/// Reads questions from a JSONL file, filtered, in order.
pub struct FileQuestionFeed {
    path: PathBuf,
    filter: Arc<dyn QuestionFilter>,
    /// Number of file lines already handled, served or skipped.
    consumed: Mutex<usize>,
}

impl FileQuestionFeed {
    pub fn new(path: impl AsRef<Path>, filter: Arc<dyn QuestionFilter>) -> Self {
        Self { path: path.as_ref().to_path_buf(), filter, consumed: Mutex::new(0) }
    }
}

#[async_trait]
impl QuestionFeed for FileQuestionFeed {
    async fn next(&self) -> Result<NextQuestion, FeedFatalError> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            FeedFatalError::Fatal(format!("cannot read {}: {}", self.path.display(), e))
        })?;

        let mut consumed = self.consumed.lock().unwrap_or_else(PoisonError::into_inner);
        for (line_number, line) in content.lines().enumerate().skip(*consumed) {
            *consumed = line_number + 1;
            if line.trim().is_empty() {
                continue;
            }
            let record: QuestionFileRecord = match serde_json::from_str(line) {
                Ok(record) => record,
                Err(parse_error) => {
                    warn!(
                        line = line_number + 1,
                        error = %parse_error,
                        "skipping malformed question line"
                    );
                    continue;
                }
            };
            let question = record.into_question();
            if !self.filter.accept(&question) {
                debug!(question_id = %question.id, "question rejected by the filter");
                continue;
            }
            return Ok(NextQuestion::Ready(question));
        }

        Ok(NextQuestion::Unavailable(format!(
            "no new questions in {}",
            self.path.display()
        )))
    }
}

/// Accepts only questions whose title starts with a fixed prefix.
/// An empty prefix accepts everything.
pub struct TitlePrefixFilter {
    prefix: String,
}

impl TitlePrefixFilter {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }
}

impl QuestionFilter for TitlePrefixFilter {
    fn accept(&self, question: &Question) -> bool {
        question.title.starts_with(&self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gauntlet_application::ports::question_feed::AcceptAll;
    use std::io::Write;

    fn write_lines(path: &Path, lines: &[&str]) {
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
    }

    #[tokio::test]
    async fn test_serves_questions_in_file_order_then_reports_exhaustion() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("questions.jsonl");
        write_lines(
            &path,
            &[
                r#"{"id":"Q1","title":"first","body":"b1","category":"c"}"#,
                r#"{"id":"Q2","title":"second","body":"b2","category":"c"}"#,
            ],
        );

        let feed = FileQuestionFeed::new(&path, Arc::new(AcceptAll));
        let NextQuestion::Ready(q1) = feed.next().await.unwrap() else {
            panic!("expected a question")
        };
        assert_eq!(q1.id, "Q1");
        let NextQuestion::Ready(q2) = feed.next().await.unwrap() else {
            panic!("expected a question")
        };
        assert_eq!(q2.id, "Q2");
        assert!(matches!(feed.next().await.unwrap(), NextQuestion::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_picks_up_lines_appended_after_exhaustion() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("questions.jsonl");
        write_lines(&path, &[r#"{"id":"Q1","title":"t","body":"b"}"#]);

        let feed = FileQuestionFeed::new(&path, Arc::new(AcceptAll));
        assert!(matches!(feed.next().await.unwrap(), NextQuestion::Ready(_)));
        assert!(matches!(feed.next().await.unwrap(), NextQuestion::Unavailable(_)));

        write_lines(&path, &[r#"{"id":"Q2","title":"t","body":"b"}"#]);
        let NextQuestion::Ready(q) = feed.next().await.unwrap() else {
            panic!("expected the appended question")
        };
        assert_eq!(q.id, "Q2");
    }

    #[tokio::test]
    async fn test_malformed_and_blank_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("questions.jsonl");
        write_lines(
            &path,
            &[
                "not json at all",
                "",
                r#"{"id":"Q9","title":"t","body":"b"}"#,
            ],
        );

        let feed = FileQuestionFeed::new(&path, Arc::new(AcceptAll));
        let NextQuestion::Ready(q) = feed.next().await.unwrap() else {
            panic!("expected the valid question")
        };
        assert_eq!(q.id, "Q9");
    }

    #[tokio::test]
    async fn test_title_prefix_filter_applies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("questions.jsonl");
        write_lines(
            &path,
            &[
                r#"{"id":"Q1","title":"Closed Question : nope","body":"b"}"#,
                r#"{"id":"Q2","title":"Open Question : yes","body":"b"}"#,
            ],
        );

        let feed = FileQuestionFeed::new(
            &path,
            Arc::new(TitlePrefixFilter::new("Open Question :")),
        );
        let NextQuestion::Ready(q) = feed.next().await.unwrap() else {
            panic!("expected the open question")
        };
        assert_eq!(q.id, "Q2");
    }

    #[tokio::test]
    async fn test_missing_file_is_fatal() {
        let feed = FileQuestionFeed::new("/no/such/questions.jsonl", Arc::new(AcceptAll));
        assert!(matches!(feed.next().await, Err(FeedFatalError::Fatal(_))));
    }

    #[test]
    fn test_empty_prefix_accepts_everything() {
        let filter = TitlePrefixFilter::new("");
        let question = Question::new("Q", "anything", "b", "c", Utc::now());
        assert!(filter.accept(&question));
    }
}
