use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use watchsync_core::models::{ParticipantId, RoomId, ServerMessage};
use watchsync_core::service::{MessageSender, RoomBroadcaster};

/// A connection routed to by the hub
#[derive(Debug, Clone)]
pub struct Subscriber {
    pub participant_id: ParticipantId,
    pub sender: MessageSender,
}

/// In-memory hub routing room events to connected clients.
///
/// Sends go into unbounded channels and never wait, so the room service may
/// call in while holding a room lock. A subscriber whose receiver is gone is
/// dropped on the next failed send.
#[derive(Clone, Default)]
pub struct RoomMessageHub {
    /// room_id -> subscribers in subscription order
    rooms: Arc<DashMap<RoomId, Vec<Subscriber>>>,

    /// participant_id -> room_id, for connection counting and cleanup
    connections: Arc<DashMap<ParticipantId, RoomId>>,
}

impl std::fmt::Debug for RoomMessageHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomMessageHub")
            .field("rooms", &self.rooms.len())
            .field("connections", &self.connections.len())
            .finish()
    }
}

impl RoomMessageHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `message` to every subscriber of the room that `filter` keeps
    fn deliver(
        &self,
        room_id: &RoomId,
        message: &ServerMessage,
        filter: impl Fn(&Subscriber) -> bool,
    ) -> usize {
        let mut sent_count = 0;
        let mut failed = Vec::new();

        if let Some(subscribers) = self.rooms.get(room_id) {
            for subscriber in subscribers.iter().filter(|s| filter(s)) {
                match subscriber.sender.send(message.clone()) {
                    Ok(()) => {
                        sent_count += 1;
                        debug!(
                            room_id = %room_id,
                            participant_id = %subscriber.participant_id,
                            event_type = %message.event_type(),
                            "Event sent to client"
                        );
                    }
                    Err(err) => {
                        warn!(
                            room_id = %room_id,
                            participant_id = %subscriber.participant_id,
                            error = %err,
                            "Failed to send event to client, marking for cleanup"
                        );
                        failed.push(subscriber.participant_id.clone());
                    }
                }
            }
        }

        for participant_id in failed {
            self.unsubscribe(room_id, &participant_id);
        }

        sent_count
    }

    #[must_use]
    pub fn subscriber_count(&self, room_id: &RoomId) -> usize {
        self.rooms.get(room_id).map_or(0, |subscribers| subscribers.len())
    }

    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

impl RoomBroadcaster for RoomMessageHub {
    fn subscribe(&self, room_id: &RoomId, participant_id: &ParticipantId, sender: MessageSender) {
        let mut subscribers = self.rooms.entry(room_id.clone()).or_default();
        subscribers.retain(|sub| sub.participant_id != *participant_id);
        subscribers.push(Subscriber {
            participant_id: participant_id.clone(),
            sender,
        });
        drop(subscribers);

        self.connections
            .insert(participant_id.clone(), room_id.clone());

        info!(
            room_id = %room_id,
            participant_id = %participant_id,
            "Client subscribed to room"
        );
    }

    fn unsubscribe(&self, room_id: &RoomId, participant_id: &ParticipantId) {
        let removed = self
            .connections
            .remove_if(participant_id, |_, subscribed_to| subscribed_to == room_id)
            .is_some();

        if let Some(mut subscribers) = self.rooms.get_mut(room_id) {
            subscribers.retain(|sub| sub.participant_id != *participant_id);
            if subscribers.is_empty() {
                drop(subscribers);
                self.rooms.remove_if(room_id, |_, subs| subs.is_empty());
                debug!(room_id = %room_id, "Room has no more subscribers, removed");
            }
        }

        if removed {
            info!(
                room_id = %room_id,
                participant_id = %participant_id,
                "Client unsubscribed from room"
            );
        } else {
            debug!(
                room_id = %room_id,
                participant_id = %participant_id,
                "Unsubscribe for a connection that was not subscribed"
            );
        }
    }

    fn broadcast(&self, room_id: &RoomId, message: ServerMessage) -> usize {
        let sent_count = self.deliver(room_id, &message, |_| true);
        if sent_count > 0 {
            debug!(
                room_id = %room_id,
                sent_count = sent_count,
                event_type = %message.event_type(),
                "Event broadcast complete"
            );
        }
        sent_count
    }

    fn broadcast_except(
        &self,
        room_id: &RoomId,
        except: &ParticipantId,
        message: ServerMessage,
    ) -> usize {
        self.deliver(room_id, &message, |sub| sub.participant_id != *except)
    }

    fn send_to(&self, room_id: &RoomId, participant_id: &ParticipantId, message: ServerMessage) -> bool {
        self.deliver(room_id, &message, |sub| sub.participant_id == *participant_id) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use watchsync_core::models::{PlaybackState, ServerMessage};

    fn room(id: &str) -> RoomId {
        RoomId::from_string(id.to_string())
    }

    fn pid(id: &str) -> ParticipantId {
        ParticipantId::from_string(id.to_string())
    }

    fn sync_event() -> ServerMessage {
        ServerMessage::Sync {
            playback: PlaybackState::new(Utc::now()).view(Utc::now()),
        }
    }

    #[tokio::test]
    async fn test_subscribe_and_broadcast() {
        let hub = RoomMessageHub::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        hub.subscribe(&room("r1"), &pid("p1"), tx);

        assert_eq!(hub.subscriber_count(&room("r1")), 1);
        assert_eq!(hub.connection_count(), 1);

        assert_eq!(hub.broadcast(&room("r1"), sync_event()), 1);
        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_type(), "sync");
    }

    #[tokio::test]
    async fn test_unsubscribe_removes_empty_room() {
        let hub = RoomMessageHub::new();
        let (tx, _rx) = mpsc::unbounded_channel();
        hub.subscribe(&room("r1"), &pid("p1"), tx);

        hub.unsubscribe(&room("r1"), &pid("p1"));
        assert_eq!(hub.subscriber_count(&room("r1")), 0);
        assert_eq!(hub.connection_count(), 0);
        assert_eq!(hub.room_count(), 0);

        // Second unsubscribe is a no-op
        hub.unsubscribe(&room("r1"), &pid("p1"));
    }

    #[tokio::test]
    async fn test_broadcast_except_skips_sender() {
        let hub = RoomMessageHub::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        hub.subscribe(&room("r1"), &pid("p1"), tx1);
        hub.subscribe(&room("r1"), &pid("p2"), tx2);

        let typing = ServerMessage::ChatTyping {
            user_id: pid("p1"),
            typing: true,
        };
        assert_eq!(hub.broadcast_except(&room("r1"), &pid("p1"), typing), 1);

        assert_eq!(rx2.recv().await.unwrap().event_type(), "chat_typing");
        let nothing = tokio::time::timeout(Duration::from_millis(50), rx1.recv()).await;
        assert!(nothing.is_err(), "sender should not see its own typing notice");
    }

    #[tokio::test]
    async fn test_send_to_single_subscriber() {
        let hub = RoomMessageHub::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        hub.subscribe(&room("r1"), &pid("p1"), tx1);
        hub.subscribe(&room("r1"), &pid("p2"), tx2);

        let kicked = ServerMessage::Kicked { room_id: room("r1") };
        assert!(hub.send_to(&room("r1"), &pid("p2"), kicked));
        assert!(!hub.send_to(&room("r1"), &pid("ghost"), sync_event()));

        assert_eq!(rx2.recv().await.unwrap().event_type(), "kicked");
        assert!(rx1.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_rooms_are_isolated() {
        let hub = RoomMessageHub::new();
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        hub.subscribe(&room("r1"), &pid("p1"), tx1);
        hub.subscribe(&room("r2"), &pid("p2"), tx2);

        assert_eq!(hub.broadcast(&room("r1"), sync_event()), 1);
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dead_receiver_is_cleaned_up() {
        let hub = RoomMessageHub::new();
        let (tx1, rx1) = mpsc::unbounded_channel();
        let (tx2, _rx2) = mpsc::unbounded_channel();
        hub.subscribe(&room("r1"), &pid("p1"), tx1);
        hub.subscribe(&room("r1"), &pid("p2"), tx2);
        drop(rx1);

        assert_eq!(hub.broadcast(&room("r1"), sync_event()), 1);
        assert_eq!(hub.subscriber_count(&room("r1")), 1);
        assert_eq!(hub.connection_count(), 1);
    }

    #[tokio::test]
    async fn test_resubscribe_replaces_sender() {
        let hub = RoomMessageHub::new();
        let (old_tx, mut old_rx) = mpsc::unbounded_channel();
        let (new_tx, mut new_rx) = mpsc::unbounded_channel();
        hub.subscribe(&room("r1"), &pid("p1"), old_tx);
        hub.subscribe(&room("r1"), &pid("p1"), new_tx);

        assert_eq!(hub.subscriber_count(&room("r1")), 1);
        hub.broadcast(&room("r1"), sync_event());
        assert!(new_rx.try_recv().is_ok());
        assert!(old_rx.try_recv().is_err());
    }
}
