//! Port definitions (interfaces to the outside world)
//!
//! Ports are trait definitions that the application layer depends on.
//! Implementations (adapters) live in the infrastructure layer.

pub mod participant_connector;
pub mod question_feed;
pub mod shutdown;
pub mod storage;
