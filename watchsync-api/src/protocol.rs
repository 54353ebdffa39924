//! Client-to-server frames
//!
//! A frame is a JSON object tagged by `type`, with an optional numeric
//! `requestId` the server echoes in the ack. Frames are fully validated here,
//! so handlers only ever see well-typed commands with finite numbers.

use serde::Deserialize;
use serde_json::Value;
use watchsync_core::models::{MediaSource, ParticipantId, RoomId};
use watchsync_core::Error;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum ClientCommand {
    #[serde(rename = "createRoom")]
    CreateRoom {},

    #[serde(rename = "joinRoom", rename_all = "camelCase")]
    JoinRoom {
        room_id: RoomId,
        name: Option<String>,
        admin_secret: Option<String>,
    },

    #[serde(rename = "leaveRoom")]
    LeaveRoom {},

    #[serde(rename = "getState", rename_all = "camelCase")]
    GetState { room_id: RoomId },

    #[serde(rename = "changeMedia", rename_all = "camelCase")]
    ChangeMedia {
        room_id: RoomId,
        media: MediaSource,
        admin_secret: Option<String>,
    },

    #[serde(rename = "control:play", rename_all = "camelCase")]
    Play {
        room_id: RoomId,
        admin_secret: Option<String>,
    },

    #[serde(rename = "control:pause", rename_all = "camelCase")]
    Pause {
        room_id: RoomId,
        admin_secret: Option<String>,
    },

    #[serde(rename = "control:seek", rename_all = "camelCase")]
    Seek {
        room_id: RoomId,
        position_seconds: f64,
        admin_secret: Option<String>,
    },

    #[serde(rename = "control:rate", rename_all = "camelCase")]
    Rate {
        room_id: RoomId,
        playback_rate: f64,
        admin_secret: Option<String>,
    },

    #[serde(rename = "toggleGuestControl", rename_all = "camelCase")]
    ToggleGuestControl {
        room_id: RoomId,
        admin_secret: Option<String>,
    },

    #[serde(rename = "presence:updateName", rename_all = "camelCase")]
    UpdateName { room_id: RoomId, name: String },

    #[serde(rename = "admin:mute", rename_all = "camelCase")]
    Mute {
        room_id: RoomId,
        target_user_id: ParticipantId,
        admin_secret: Option<String>,
    },

    #[serde(rename = "admin:kick", rename_all = "camelCase")]
    Kick {
        room_id: RoomId,
        target_user_id: ParticipantId,
        admin_secret: Option<String>,
    },

    #[serde(rename = "chat:message", rename_all = "camelCase")]
    ChatMessage { room_id: RoomId, text: String },

    #[serde(rename = "chat:typing", rename_all = "camelCase")]
    ChatTyping { room_id: RoomId, typing: bool },
}

impl ClientCommand {
    /// Wire verb, for logging
    #[must_use]
    pub const fn verb(&self) -> &'static str {
        match self {
            Self::CreateRoom {} => "createRoom",
            Self::JoinRoom { .. } => "joinRoom",
            Self::LeaveRoom {} => "leaveRoom",
            Self::GetState { .. } => "getState",
            Self::ChangeMedia { .. } => "changeMedia",
            Self::Play { .. } => "control:play",
            Self::Pause { .. } => "control:pause",
            Self::Seek { .. } => "control:seek",
            Self::Rate { .. } => "control:rate",
            Self::ToggleGuestControl { .. } => "toggleGuestControl",
            Self::UpdateName { .. } => "presence:updateName",
            Self::Mute { .. } => "admin:mute",
            Self::Kick { .. } => "admin:kick",
            Self::ChatMessage { .. } => "chat:message",
            Self::ChatTyping { .. } => "chat:typing",
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            Self::Seek {
                position_seconds, ..
            } if !position_seconds.is_finite() => {
                Err("positionSeconds must be a finite number".to_string())
            }
            Self::Rate { playback_rate, .. } if !playback_rate.is_finite() => {
                Err("playbackRate must be a finite number".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// A parsed, validated client frame
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub request_id: Option<u64>,
    pub command: ClientCommand,
}

/// A frame that could not be turned into a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedFrame {
    /// Echoed back when it could be read
    pub request_id: Option<u64>,
    pub reason: String,
}

impl From<MalformedFrame> for Error {
    fn from(frame: MalformedFrame) -> Self {
        Self::InvalidInput(frame.reason)
    }
}

/// Parse one text frame
pub fn parse_frame(raw: &str) -> Result<Frame, MalformedFrame> {
    let malformed = |request_id, reason: String| MalformedFrame { request_id, reason };

    let mut value: Value =
        serde_json::from_str(raw).map_err(|e| malformed(None, format!("Invalid JSON: {e}")))?;
    let object = value
        .as_object_mut()
        .ok_or_else(|| malformed(None, "Frame must be a JSON object".to_string()))?;

    let request_id = match object.remove("requestId") {
        None | Some(Value::Null) => None,
        Some(id) => Some(
            id.as_u64()
                .ok_or_else(|| malformed(None, "requestId must be a non-negative integer".to_string()))?,
        ),
    };

    let command: ClientCommand = serde_json::from_value(value)
        .map_err(|e| malformed(request_id, format!("Invalid command: {e}")))?;
    command
        .validate()
        .map_err(|reason| malformed(request_id, reason))?;

    Ok(Frame {
        request_id,
        command,
    })
}
