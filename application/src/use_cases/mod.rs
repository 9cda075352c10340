//! Challenge use cases

pub mod collect_answers;
pub mod pacing;
pub mod run_challenge;
pub mod run_round;
