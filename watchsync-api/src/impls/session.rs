//! Per-connection command dispatch
//!
//! A `Session` owns one connection's protocol state and turns frames into
//! room service calls. Everything it produces, room events and its own acks,
//! goes through the same ordered sender, so a command's broadcasts always
//! reach this connection before that command's ack.

use std::sync::Arc;
use tracing::{debug, info, warn};
use watchsync_core::models::{Ack, AckData, ParticipantId, PlaybackCommand, RoomId, ServerMessage};
use watchsync_core::service::{MessageSender, RoomService};
use watchsync_core::{Error, Result};

use crate::protocol::{parse_frame, ClientCommand};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unjoined,
    Joined {
        room_id: RoomId,
        participant_id: ParticipantId,
    },
}

pub struct Session {
    connection_id: ParticipantId,
    service: Arc<RoomService>,
    sender: MessageSender,
    state: SessionState,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("connection_id", &self.connection_id)
            .field("state", &self.state)
            .finish()
    }
}

fn not_joined() -> Error {
    Error::NotJoined("Join the room first".to_string())
}

impl Session {
    /// The connection id doubles as the participant id in any room this
    /// session joins.
    #[must_use]
    pub fn new(service: Arc<RoomService>, sender: MessageSender) -> Self {
        Self {
            connection_id: ParticipantId::new(),
            service,
            sender,
            state: SessionState::Unjoined,
        }
    }

    #[must_use]
    pub const fn connection_id(&self) -> &ParticipantId {
        &self.connection_id
    }

    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub const fn joined_room(&self) -> Option<&RoomId> {
        match &self.state {
            SessionState::Joined { room_id, .. } => Some(room_id),
            SessionState::Unjoined => None,
        }
    }

    /// Handle one inbound text frame. Always queues exactly one ack.
    pub fn handle_frame(&mut self, raw: &str) {
        let ack = match parse_frame(raw) {
            Ok(frame) => {
                let verb = frame.command.verb();
                match self.dispatch(frame.command) {
                    Ok(data) => Ack::success(frame.request_id, data),
                    Err(err) => {
                        debug!(
                            connection_id = %self.connection_id,
                            verb,
                            code = err.code(),
                            error = %err,
                            "Command rejected"
                        );
                        Ack::failure(frame.request_id, &err)
                    }
                }
            }
            Err(malformed) => {
                debug!(connection_id = %self.connection_id, reason = %malformed.reason, "Malformed frame");
                Ack::failure(malformed.request_id, &Error::from(malformed))
            }
        };
        self.reply(ack);
    }

    /// Track events addressed to this connection that change its state.
    ///
    /// A `kicked` event can be read after this session already rejoined the
    /// same room, so the registry decides whether the kick still applies.
    pub fn observe(&mut self, message: &ServerMessage) {
        let ServerMessage::Kicked { room_id } = message else {
            return;
        };
        let SessionState::Joined {
            room_id: joined,
            participant_id,
        } = &self.state
        else {
            return;
        };
        if joined != room_id {
            return;
        }

        let still_member = self
            .service
            .registry()
            .with_room(room_id, |room| room.participant(participant_id).is_some())
            .unwrap_or(false);
        if still_member {
            debug!(connection_id = %self.connection_id, room_id = %room_id, "Stale kick, session rejoined");
            return;
        }

        info!(connection_id = %self.connection_id, room_id = %room_id, "Session kicked from room");
        self.state = SessionState::Unjoined;
    }

    /// Leave whatever room this session is in. Safe to call repeatedly.
    pub fn disconnect(&mut self) {
        if let SessionState::Joined {
            room_id,
            participant_id,
        } = std::mem::replace(&mut self.state, SessionState::Unjoined)
        {
            if let Err(err) = self.service.leave(&room_id, &participant_id) {
                debug!(room_id = %room_id, participant_id = %participant_id, error = %err, "Leave on disconnect");
            }
        }
    }

    fn reply(&self, ack: Ack) {
        if self.sender.send(ServerMessage::Ack(ack)).is_err() {
            warn!(connection_id = %self.connection_id, "Connection closed before ack could be queued");
        }
    }

    /// The joined room, provided the command names it
    fn require_joined(&self, room_id: &RoomId) -> Result<&ParticipantId> {
        match &self.state {
            SessionState::Joined {
                room_id: joined,
                participant_id,
            } if joined == room_id => Ok(participant_id),
            _ => Err(not_joined()),
        }
    }

    fn control(
        &self,
        room_id: &RoomId,
        command: PlaybackCommand,
        admin_secret: Option<&str>,
    ) -> Result<Option<AckData>> {
        let playback = self.service.control(room_id, command, admin_secret)?;
        Ok(Some(AckData::Playback { playback }))
    }

    fn dispatch(&mut self, command: ClientCommand) -> Result<Option<AckData>> {
        match command {
            ClientCommand::CreateRoom {} => {
                let (room_id, secret) = self.service.create_room();
                Ok(Some(AckData::RoomCreated {
                    room_id,
                    admin_secret: secret.as_str().to_string(),
                }))
            }
            ClientCommand::JoinRoom {
                room_id,
                name,
                admin_secret,
            } => {
                if !self.service.registry().contains(&room_id) {
                    return Err(Error::NotFound("Room not found".to_string()));
                }
                self.disconnect();
                let outcome = self.service.join(
                    &room_id,
                    self.connection_id.clone(),
                    name.as_deref(),
                    admin_secret.as_deref(),
                    self.sender.clone(),
                )?;
                self.state = SessionState::Joined {
                    room_id,
                    participant_id: self.connection_id.clone(),
                };
                Ok(Some(AckData::Joined {
                    state: outcome.snapshot,
                    self_id: self.connection_id.clone(),
                    is_admin: outcome.is_admin,
                }))
            }
            ClientCommand::LeaveRoom {} => {
                let SessionState::Joined {
                    room_id,
                    participant_id,
                } = std::mem::replace(&mut self.state, SessionState::Unjoined)
                else {
                    return Err(not_joined());
                };
                self.service.leave(&room_id, &participant_id)?;
                Ok(None)
            }
            ClientCommand::GetState { room_id } => Ok(Some(AckData::State {
                state: self.service.snapshot(&room_id)?,
            })),
            ClientCommand::ChangeMedia {
                room_id,
                media,
                admin_secret,
            } => {
                let playback = self
                    .service
                    .change_media(&room_id, media, admin_secret.as_deref())?;
                Ok(Some(AckData::Playback { playback }))
            }
            ClientCommand::ToggleGuestControl {
                room_id,
                admin_secret,
            } => {
                let allow_guest_control = self
                    .service
                    .toggle_guest_control(&room_id, admin_secret.as_deref())?;
                Ok(Some(AckData::GuestControl {
                    allow_guest_control,
                }))
            }
            ClientCommand::UpdateName { room_id, name } => {
                let participant_id = self.require_joined(&room_id)?;
                self.service.rename(&room_id, participant_id, &name)?;
                Ok(None)
            }
            ClientCommand::Mute {
                room_id,
                target_user_id,
                admin_secret,
            } => {
                self.service
                    .mute(&room_id, &target_user_id, admin_secret.as_deref())?;
                Ok(None)
            }
            ClientCommand::Kick {
                room_id,
                target_user_id,
                admin_secret,
            } => {
                self.service
                    .kick(&room_id, &target_user_id, admin_secret.as_deref())?;
                Ok(None)
            }
            ClientCommand::ChatMessage { room_id, text } => {
                let participant_id = self.require_joined(&room_id)?;
                let message = self.service.send_chat(&room_id, participant_id, &text)?;
                Ok(Some(AckData::Chat { message }))
            }
            ClientCommand::ChatTyping { room_id, typing } => {
                let participant_id = self.require_joined(&room_id)?;
                self.service.typing(&room_id, participant_id, typing)?;
                Ok(None)
            }
            ClientCommand::Play {
                room_id,
                admin_secret,
            } => self.control(&room_id, PlaybackCommand::Play, admin_secret.as_deref()),
            ClientCommand::Pause {
                room_id,
                admin_secret,
            } => self.control(&room_id, PlaybackCommand::Pause, admin_secret.as_deref()),
            ClientCommand::Seek {
                room_id,
                position_seconds,
                admin_secret,
            } => self.control(
                &room_id,
                PlaybackCommand::Seek(position_seconds),
                admin_secret.as_deref(),
            ),
            ClientCommand::Rate {
                room_id,
                playback_rate,
                admin_secret,
            } => self.control(
                &room_id,
                PlaybackCommand::Rate(playback_rate),
                admin_secret.as_deref(),
            ),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.disconnect();
    }
}
