use chrono::{DateTime, Utc};
use serde::Serialize;

use super::id::{generate_id, ParticipantId};
use super::participant::Participant;

/// A chat line. The author's name is captured when it is sent and never
/// follows later renames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub user_id: ParticipantId,
    pub user_name: String,
    pub text: String,
    /// Milliseconds since the Unix epoch
    pub ts: i64,
}

impl ChatMessage {
    #[must_use]
    pub fn new(author: &Participant, text: String, now: DateTime<Utc>) -> Self {
        Self {
            id: generate_id(),
            user_id: author.id.clone(),
            user_name: author.name.clone(),
            text,
            ts: now.timestamp_millis(),
        }
    }
}
