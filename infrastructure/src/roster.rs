//! Participant roster file reader
//!
//! Tab-separated file, one participant per line:
//! organization-id, system-id, server-url, contact-email.
//! Blank lines and `#` comments are skipped. Any malformed line is a
//! configuration error; the challenge refuses to start.

use gauntlet_domain::{Participant, ParticipantRoster, RosterError};
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum RosterFileError {
    #[error("cannot read roster file: {0}")]
    Io(String),

    #[error("malformed roster line {line}: {detail}")]
    MalformedLine { line: usize, detail: String },

    #[error(transparent)]
    Roster(#[from] RosterError),
}

pub fn read_roster_file(path: impl AsRef<Path>) -> Result<ParticipantRoster, RosterFileError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| RosterFileError::Io(format!("{}: {}", path.display(), e)))?;

    let mut participants = Vec::new();
    for (index, raw_line) in content.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').map(str::trim).collect();
        let [organization_id, system_id, server_url, email] = fields.as_slice() else {
            return Err(RosterFileError::MalformedLine {
                line: index + 1,
                detail: format!("expected 4 tab-separated fields, found {}", fields.len()),
            });
        };
        if organization_id.is_empty() || system_id.is_empty() || server_url.is_empty() {
            return Err(RosterFileError::MalformedLine {
                line: index + 1,
                detail: "organization, system and url must be non-empty".to_string(),
            });
        }
        participants.push(Participant::new(*organization_id, *system_id, *server_url, *email));
    }

    let roster = ParticipantRoster::new(participants)?;
    info!(participants = roster.len(), roster_file = %path.display(), "roster loaded");
    Ok(roster)
}
