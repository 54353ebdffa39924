//! Room command handlers
//!
//! Every handler resolves its room by id, checks permissions, mutates, and
//! fans out while holding that room's entry lock. Broadcasts for one command
//! are therefore queued in order, and before the caller's ack.

use std::sync::Arc;
use tracing::{debug, info};

use crate::models::{
    AdminSecret, ChatMessage, MediaSource, Participant, ParticipantId, PlaybackCommand,
    PlaybackView, Room, RoomId, RoomSnapshot, ServerMessage,
};
use crate::registry::RoomRegistry;
use crate::service::broadcast::{MessageSender, RoomBroadcaster};
use crate::service::permission::{is_admin, require_admin, require_control};
use crate::validation::normalize_chat_text;
use crate::{Error, Result};

/// Result of a successful join
#[derive(Debug, Clone)]
pub struct JoinOutcome {
    pub snapshot: RoomSnapshot,
    pub is_admin: bool,
}

#[derive(Clone)]
pub struct RoomService {
    registry: Arc<RoomRegistry>,
    broadcaster: Arc<dyn RoomBroadcaster>,
}

impl std::fmt::Debug for RoomService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomService")
            .field("registry", &self.registry)
            .finish()
    }
}

fn presence(room: &Room) -> ServerMessage {
    ServerMessage::Presence { users: room.users() }
}

fn member<'a>(room: &'a mut Room, participant_id: &ParticipantId) -> Result<&'a mut Participant> {
    room.participants
        .get_mut(participant_id)
        .ok_or_else(|| Error::NotJoined("Not a participant of this room".to_string()))
}

impl RoomService {
    #[must_use]
    pub fn new(registry: Arc<RoomRegistry>, broadcaster: Arc<dyn RoomBroadcaster>) -> Self {
        Self {
            registry,
            broadcaster,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    pub fn create_room(&self) -> (RoomId, AdminSecret) {
        self.registry.create()
    }

    /// Add a participant and subscribe its connection.
    ///
    /// The admin flag is fixed here from the secret presented now.
    pub fn join(
        &self,
        room_id: &RoomId,
        participant_id: ParticipantId,
        name: Option<&str>,
        admin_secret: Option<&str>,
        sender: MessageSender,
    ) -> Result<JoinOutcome> {
        self.registry.with_room_mut(room_id, |room, now| {
            let admin = is_admin(room, admin_secret);
            let participant = Participant::new(participant_id.clone(), name, admin);
            room.participants.insert(participant_id.clone(), participant);

            self.broadcaster.subscribe(room_id, &participant_id, sender);
            self.broadcaster.broadcast(room_id, presence(room));

            info!(
                room_id = %room_id,
                participant_id = %participant_id,
                is_admin = admin,
                participants = room.participants.len(),
                "Participant joined room"
            );

            Ok(JoinOutcome {
                snapshot: room.snapshot(now),
                is_admin: admin,
            })
        })
    }

    /// Remove a participant and tell the rest of the room.
    ///
    /// The connection is unsubscribed even if the participant was already
    /// gone (kicked), so a stale subscription can never linger.
    pub fn leave(&self, room_id: &RoomId, participant_id: &ParticipantId) -> Result<()> {
        let result = self.registry.with_room_mut(room_id, |room, _| {
            if room.remove_participant(participant_id).is_none() {
                return Err(Error::NotJoined("Not a participant of this room".to_string()));
            }
            self.broadcaster.unsubscribe(room_id, participant_id);
            self.broadcaster.broadcast(room_id, presence(room));
            info!(
                room_id = %room_id,
                participant_id = %participant_id,
                participants = room.participants.len(),
                "Participant left room"
            );
            Ok(())
        });
        if result.is_err() {
            self.broadcaster.unsubscribe(room_id, participant_id);
        }
        result
    }

    pub fn snapshot(&self, room_id: &RoomId) -> Result<RoomSnapshot> {
        self.registry.snapshot(room_id)
    }

    /// Replace the media and reset playback to paused/0/rate 1
    pub fn change_media(
        &self,
        room_id: &RoomId,
        media: MediaSource,
        admin_secret: Option<&str>,
    ) -> Result<PlaybackView> {
        media.validate()?;
        self.registry.with_room_mut(room_id, |room, now| {
            require_control(room, admin_secret)?;
            room.set_media(media, now);
            let playback = room.playback.view(now);
            self.broadcaster.broadcast(
                room_id,
                ServerMessage::MediaChanged {
                    media: room.media.clone(),
                    playback,
                },
            );
            debug!(room_id = %room_id, kind = ?room.media.as_ref().map(|m| m.kind), "Media changed");
            Ok(playback)
        })
    }

    /// Apply a play/pause/seek/rate command to the room clock
    pub fn control(
        &self,
        room_id: &RoomId,
        command: PlaybackCommand,
        admin_secret: Option<&str>,
    ) -> Result<PlaybackView> {
        self.registry.with_room_mut(room_id, |room, now| {
            require_control(room, admin_secret)?;
            room.playback.apply(command, now);
            let playback = room.playback.view(now);
            self.broadcaster
                .broadcast(room_id, ServerMessage::Sync { playback });
            debug!(
                room_id = %room_id,
                action = command.action(),
                position = playback.position_seconds,
                rate = playback.playback_rate,
                "Playback updated"
            );
            Ok(playback)
        })
    }

    /// Flip guest control and return the new value
    pub fn toggle_guest_control(&self, room_id: &RoomId, admin_secret: Option<&str>) -> Result<bool> {
        self.registry.with_room_mut(room_id, |room, _| {
            require_admin(room, admin_secret)?;
            room.allow_guest_control = !room.allow_guest_control;
            self.broadcaster.broadcast(
                room_id,
                ServerMessage::Settings {
                    allow_guest_control: room.allow_guest_control,
                },
            );
            info!(room_id = %room_id, allow_guest_control = room.allow_guest_control, "Guest control toggled");
            Ok(room.allow_guest_control)
        })
    }

    pub fn rename(&self, room_id: &RoomId, participant_id: &ParticipantId, name: &str) -> Result<()> {
        self.registry.with_room_mut(room_id, |room, _| {
            member(room, participant_id)?.rename(name);
            self.broadcaster.broadcast(room_id, presence(room));
            Ok(())
        })
    }

    /// Mute a participant. There is no unmute.
    pub fn mute(&self, room_id: &RoomId, target: &ParticipantId, admin_secret: Option<&str>) -> Result<()> {
        self.registry.with_room_mut(room_id, |room, _| {
            require_admin(room, admin_secret)?;
            room.participants
                .get_mut(target)
                .ok_or_else(|| Error::NotFound("Participant not found".to_string()))?
                .mute();
            self.broadcaster.broadcast(room_id, presence(room));
            info!(room_id = %room_id, target = %target, "Participant muted");
            Ok(())
        })
    }

    /// Remove a participant, notify its connection, and drop it from the
    /// room's audience before the remaining participants see the new list.
    pub fn kick(&self, room_id: &RoomId, target: &ParticipantId, admin_secret: Option<&str>) -> Result<()> {
        self.registry.with_room_mut(room_id, |room, _| {
            require_admin(room, admin_secret)?;
            room.remove_participant(target)
                .ok_or_else(|| Error::NotFound("Participant not found".to_string()))?;
            self.broadcaster.send_to(
                room_id,
                target,
                ServerMessage::Kicked {
                    room_id: room_id.clone(),
                },
            );
            self.broadcaster.unsubscribe(room_id, target);
            self.broadcaster.broadcast(room_id, presence(room));
            info!(room_id = %room_id, target = %target, "Participant kicked");
            Ok(())
        })
    }

    /// Append a chat message. Muted participants and blank text are refused.
    pub fn send_chat(&self, room_id: &RoomId, participant_id: &ParticipantId, text: &str) -> Result<ChatMessage> {
        self.registry.with_room_mut(room_id, |room, now| {
            let author = member(room, participant_id)?;
            if author.is_muted {
                return Err(Error::Muted("You are muted in this room".to_string()));
            }
            let text = normalize_chat_text(text)
                .ok_or_else(|| Error::InvalidInput("Chat message is empty".to_string()))?;
            let message = ChatMessage::new(author, text, now);
            room.chat.push(message.clone());
            self.broadcaster
                .broadcast(room_id, ServerMessage::ChatNew(message.clone()));
            Ok(message)
        })
    }

    /// Relay a typing indicator to everyone else. No state changes.
    pub fn typing(&self, room_id: &RoomId, participant_id: &ParticipantId, typing: bool) -> Result<()> {
        self.registry.with_room(room_id, |room| {
            if room.participant(participant_id).is_none() {
                return Err(Error::NotJoined("Not a participant of this room".to_string()));
            }
            self.broadcaster.broadcast_except(
                room_id,
                participant_id,
                ServerMessage::ChatTyping {
                    user_id: participant_id.clone(),
                    typing,
                },
            );
            Ok(())
        })?
    }
}
