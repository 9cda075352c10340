//! Participant identity and roster validation

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Separator used to build the unique id from organization and system ids
pub const UNIQUE_ID_SEPARATOR: &str = "-";

/// A registered participant endpoint competing in the challenge.
///
/// A team may register several versions of its system; each version is a
/// separate participant. Identity (equality, hashing, the unique id) is
/// based solely on the (organization_id, system_id) pair; the server URL
/// and contact email are payload, not identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub organization_id: String,
    pub system_id: String,
    pub server_url: String,
    pub email: String,
}

impl Participant {
    pub fn new(
        organization_id: impl Into<String>,
        system_id: impl Into<String>,
        server_url: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            organization_id: organization_id.into(),
            system_id: system_id.into(),
            server_url: server_url.into(),
            email: email.into(),
        }
    }

    /// The unique key of this participant: `organization_id + "-" + system_id`.
    pub fn unique_id(&self) -> String {
        format!(
            "{}{}{}",
            self.organization_id, UNIQUE_ID_SEPARATOR, self.system_id
        )
    }
}

impl PartialEq for Participant {
    fn eq(&self, other: &Self) -> bool {
        self.organization_id == other.organization_id && self.system_id == other.system_id
    }
}

impl Eq for Participant {}

impl std::hash::Hash for Participant {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.organization_id.hash(state);
        self.system_id.hash(state);
    }
}

impl std::fmt::Display for Participant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.unique_id())
    }
}

/// Errors detected while assembling the participant roster
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RosterError {
    #[error("duplicate participant \"{0}\": organization-id + system-id must be unique")]
    DuplicateParticipant(String),

    #[error("the participant roster is empty")]
    Empty,
}

/// The immutable set of participants taking part in the challenge.
///
/// Loaded once at startup and shared read-only across all rounds. Two
/// participants with the same (organization_id, system_id) pair are
/// rejected here, before any round runs.
#[derive(Debug, Clone)]
pub struct ParticipantRoster {
    participants: Vec<Participant>,
}

impl ParticipantRoster {
    pub fn new(participants: Vec<Participant>) -> Result<Self, RosterError> {
        if participants.is_empty() {
            return Err(RosterError::Empty);
        }
        let mut seen = HashSet::new();
        for participant in &participants {
            if !seen.insert(participant.clone()) {
                return Err(RosterError::DuplicateParticipant(participant.unique_id()));
            }
        }
        Ok(Self { participants })
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}
