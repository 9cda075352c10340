//! Question value object

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A question to be fanned out to all participants (Value Object)
///
/// Created by the question feed once per round, immutable, and retained
/// only for the duration of that round plus its asynchronous store
/// operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub title: String,
    pub body: String,
    pub category: String,
    pub published: DateTime<Utc>,
}

impl Question {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        category: impl Into<String>,
        published: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            body: body.into(),
            category: category.into(),
            published,
        }
    }
}

impl std::fmt::Display for Question {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Question [id={}, title={}]", self.id, self.title)
    }
}
