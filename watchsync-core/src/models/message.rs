use serde::Serialize;

use super::chat::ChatMessage;
use super::id::{ParticipantId, RoomId};
use super::media::MediaSource;
use super::participant::Participant;
use super::playback::PlaybackView;
use super::room::RoomSnapshot;
use crate::Error;

/// Everything the server sends down a connection
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Reply to exactly one client command
    #[serde(rename = "ack")]
    Ack(Ack),

    /// Participant list changed (join, leave, rename, mute, kick)
    #[serde(rename = "presence")]
    Presence { users: Vec<Participant> },

    /// Media replaced; playback was reset with it
    #[serde(rename = "mediaChanged")]
    MediaChanged {
        media: Option<MediaSource>,
        playback: PlaybackView,
    },

    /// Playback clock changed (play, pause, seek, rate)
    #[serde(rename = "sync")]
    Sync { playback: PlaybackView },

    /// Room settings changed
    #[serde(rename = "settings", rename_all = "camelCase")]
    Settings { allow_guest_control: bool },

    /// New chat message
    #[serde(rename = "chat:new")]
    ChatNew(ChatMessage),

    /// Someone else started or stopped typing
    #[serde(rename = "chat:typing", rename_all = "camelCase")]
    ChatTyping { user_id: ParticipantId, typing: bool },

    /// This connection was removed from the room by an admin
    #[serde(rename = "kicked", rename_all = "camelCase")]
    Kicked { room_id: RoomId },
}

impl ServerMessage {
    /// Get a short description of the message type
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::Ack(_) => "ack",
            Self::Presence { .. } => "presence",
            Self::MediaChanged { .. } => "media_changed",
            Self::Sync { .. } => "sync",
            Self::Settings { .. } => "settings",
            Self::ChatNew(_) => "chat_new",
            Self::ChatTyping { .. } => "chat_typing",
            Self::Kicked { .. } => "kicked",
        }
    }
}

/// Acknowledgement of a client command, success or failure
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ack {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<u64>,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<AckData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Ack {
    #[must_use]
    pub const fn success(request_id: Option<u64>, data: Option<AckData>) -> Self {
        Self {
            request_id,
            ok: true,
            data,
            error: None,
        }
    }

    #[must_use]
    pub fn failure(request_id: Option<u64>, error: &Error) -> Self {
        Self {
            request_id,
            ok: false,
            data: None,
            error: Some(ErrorBody::from(error)),
        }
    }
}

/// Command-specific payload of a successful ack
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AckData {
    #[serde(rename_all = "camelCase")]
    RoomCreated {
        room_id: RoomId,
        admin_secret: String,
    },
    #[serde(rename_all = "camelCase")]
    Joined {
        state: RoomSnapshot,
        self_id: ParticipantId,
        is_admin: bool,
    },
    State { state: RoomSnapshot },
    Playback { playback: PlaybackView },
    #[serde(rename_all = "camelCase")]
    GuestControl { allow_guest_control: bool },
    Chat { message: ChatMessage },
}

/// Machine-readable failure reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl From<&Error> for ErrorBody {
    fn from(err: &Error) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ack_failure_serialization() {
        let ack = Ack::failure(Some(7), &Error::NotFound("Room not found".into()));
        let json = serde_json::to_value(ServerMessage::Ack(ack)).unwrap();
        assert_eq!(json["type"], "ack");
        assert_eq!(json["requestId"], 7);
        assert_eq!(json["ok"], false);
        assert_eq!(json["error"]["code"], "not_found");
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_ack_success_with_data() {
        let ack = Ack::success(
            None,
            Some(AckData::RoomCreated {
                room_id: RoomId::from_string("r1".into()),
                admin_secret: "s".into(),
            }),
        );
        let json = serde_json::to_value(ServerMessage::Ack(ack)).unwrap();
        assert_eq!(json["ok"], true);
        assert!(json.get("requestId").is_none());
        assert_eq!(json["data"]["roomId"], "r1");
        assert_eq!(json["data"]["adminSecret"], "s");
    }

    #[test]
    fn test_event_tags() {
        let typing = ServerMessage::ChatTyping {
            user_id: ParticipantId::from_string("p1".into()),
            typing: true,
        };
        let json = serde_json::to_value(&typing).unwrap();
        assert_eq!(json["type"], "chat:typing");
        assert_eq!(json["userId"], "p1");
        assert_eq!(typing.event_type(), "chat_typing");

        let settings = serde_json::to_value(ServerMessage::Settings { allow_guest_control: true }).unwrap();
        assert_eq!(settings["type"], "settings");
        assert_eq!(settings["allowGuestControl"], true);
    }
}
