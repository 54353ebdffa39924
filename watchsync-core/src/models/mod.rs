pub mod chat;
pub mod id;
pub mod media;
pub mod message;
pub mod participant;
pub mod playback;
pub mod room;

pub use chat::ChatMessage;
pub use id::{generate_id, AdminSecret, ParticipantId, RoomId};
pub use media::{MediaKind, MediaSource};
pub use message::{Ack, AckData, ErrorBody, ServerMessage};
pub use participant::Participant;
pub use playback::{
    clamp_rate, PlaybackCommand, PlaybackState, PlaybackView, MAX_PLAYBACK_RATE,
    MIN_PLAYBACK_RATE,
};
pub use room::{Room, RoomSnapshot};
