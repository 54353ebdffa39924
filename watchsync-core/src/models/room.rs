use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::Serialize;

use super::chat::ChatMessage;
use super::id::{AdminSecret, ParticipantId, RoomId};
use super::media::MediaSource;
use super::participant::Participant;
use super::playback::{PlaybackState, PlaybackView};

/// A shared viewing session.
///
/// Exactly one playback clock and at most one media source; every
/// participant watches the same clock. Participants are kept in join order,
/// chat in send order.
#[derive(Debug, Clone)]
pub struct Room {
    pub id: RoomId,
    pub admin_secret: AdminSecret,
    pub allow_guest_control: bool,
    pub media: Option<MediaSource>,
    pub playback: PlaybackState,
    pub participants: IndexMap<ParticipantId, Participant>,
    pub chat: Vec<ChatMessage>,
    pub last_activity: DateTime<Utc>,
}

impl Room {
    #[must_use]
    pub fn new(id: RoomId, admin_secret: AdminSecret, now: DateTime<Utc>) -> Self {
        Self {
            id,
            admin_secret,
            allow_guest_control: false,
            media: None,
            playback: PlaybackState::new(now),
            participants: IndexMap::new(),
            chat: Vec::new(),
            last_activity: now,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
    }

    /// Replace the media and reset the clock to paused/0/rate 1
    pub fn set_media(&mut self, media: MediaSource, now: DateTime<Utc>) {
        self.media = Some(media);
        self.playback.reset(now);
    }

    #[must_use]
    pub fn participant(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.get(id)
    }

    /// Remove a participant, keeping the others in join order
    pub fn remove_participant(&mut self, id: &ParticipantId) -> Option<Participant> {
        self.participants.shift_remove(id)
    }

    #[must_use]
    pub fn users(&self) -> Vec<Participant> {
        self.participants.values().cloned().collect()
    }

    /// Client-facing view of the whole room, playback resolved at `now`.
    /// Never carries the admin secret.
    #[must_use]
    pub fn snapshot(&self, now: DateTime<Utc>) -> RoomSnapshot {
        RoomSnapshot {
            id: self.id.clone(),
            allow_guest_control: self.allow_guest_control,
            media: self.media.clone(),
            playback: self.playback.view(now),
            users: self.users(),
            chat: self.chat.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
    pub id: RoomId,
    pub allow_guest_control: bool,
    pub media: Option<MediaSource>,
    pub playback: PlaybackView,
    pub users: Vec<Participant>,
    pub chat: Vec<ChatMessage>,
}
