//! Infrastructure layer - adapters behind the application ports
//!
//! HTTP transport to participant systems, JSONL file storage, the
//! file-backed question feed, the roster reader, the sentinel-file
//! shutdown signal, and the TOML configuration loader.

pub mod config;
pub mod feed;
pub mod http;
pub mod roster;
pub mod shutdown;
pub mod storage;

pub use config::{ConfigLoader, FileConfig};
pub use feed::{FileQuestionFeed, TitlePrefixFilter};
pub use http::HttpParticipantConnector;
pub use roster::read_roster_file;
pub use shutdown::SentinelFileShutdown;
pub use storage::{JsonlAnswerStore, JsonlQuestionStore};
