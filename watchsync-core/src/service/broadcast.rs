use tokio::sync::mpsc;

use crate::models::{ParticipantId, RoomId, ServerMessage};

/// Ordered outbound channel of one connection
pub type MessageSender = mpsc::UnboundedSender<ServerMessage>;

/// Receiving half of a [`MessageSender`]
pub type MessageReceiver = mpsc::UnboundedReceiver<ServerMessage>;

/// Fan-out seam between the room service and whatever delivers messages to
/// connections.
///
/// The room service calls these while it holds a room's lock, so
/// implementations must never block and must never call back into the
/// registry.
#[cfg_attr(test, mockall::automock)]
pub trait RoomBroadcaster: Send + Sync {
    /// Route room events to `sender` until unsubscribed
    fn subscribe(&self, room_id: &RoomId, participant_id: &ParticipantId, sender: MessageSender);

    fn unsubscribe(&self, room_id: &RoomId, participant_id: &ParticipantId);

    /// Send to every subscriber of the room. Returns the number reached.
    fn broadcast(&self, room_id: &RoomId, message: ServerMessage) -> usize;

    /// Send to every subscriber of the room except `except`
    fn broadcast_except(
        &self,
        room_id: &RoomId,
        except: &ParticipantId,
        message: ServerMessage,
    ) -> usize;

    /// Send to a single subscriber. Returns false if it is not subscribed.
    fn send_to(&self, room_id: &RoomId, participant_id: &ParticipantId, message: ServerMessage) -> bool;
}
