//! End-to-end command flows through `Session` and the in-memory hub

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use watchsync_api::impls::{Session, SessionState};
use watchsync_core::registry::RoomRegistry;
use watchsync_core::service::{MessageReceiver, RoomService};
use watchsync_hub::RoomMessageHub;

fn service() -> Arc<RoomService> {
    let hub = Arc::new(RoomMessageHub::new());
    Arc::new(RoomService::new(Arc::new(RoomRegistry::default()), hub))
}

/// A session plus the receiving end of its connection
struct Client {
    session: Session,
    rx: MessageReceiver,
}

impl Client {
    fn connect(service: &Arc<RoomService>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            session: Session::new(service.clone(), tx),
            rx,
        }
    }

    fn id(&self) -> String {
        self.session.connection_id().to_string()
    }

    /// Everything queued for this connection so far, in order
    fn drain(&mut self) -> Vec<Value> {
        let mut out = Vec::new();
        while let Ok(message) = self.rx.try_recv() {
            self.session.observe(&message);
            out.push(serde_json::to_value(&message).unwrap());
        }
        out
    }

    /// Send a frame and return every message it produced, ack last
    fn send_raw(&mut self, raw: &str) -> Vec<Value> {
        self.session.handle_frame(raw);
        let out = self.drain();
        let acks = out.iter().filter(|m| m["type"] == "ack").count();
        assert_eq!(acks, 1, "expected exactly one ack, got {out:?}");
        assert_eq!(out.last().unwrap()["type"], "ack", "ack must come last: {out:?}");
        out
    }

    fn send(&mut self, frame: Value) -> Vec<Value> {
        self.send_raw(&frame.to_string())
    }

    fn request(&mut self, frame: Value) -> Value {
        self.send(frame).pop().unwrap()
    }
}

/// Create a room and join it as admin. Returns (client, room id, secret).
fn admin_in_new_room(service: &Arc<RoomService>) -> (Client, String, String) {
    let mut admin = Client::connect(service);
    let created = admin.request(json!({"type": "createRoom", "requestId": 1}));
    assert_eq!(created["ok"], true);
    let room_id = created["data"]["roomId"].as_str().unwrap().to_string();
    let secret = created["data"]["adminSecret"].as_str().unwrap().to_string();

    let joined = admin.request(json!({
        "type": "joinRoom", "roomId": room_id, "name": "host", "adminSecret": secret
    }));
    assert_eq!(joined["ok"], true);
    assert_eq!(joined["data"]["isAdmin"], true);
    (admin, room_id, secret)
}

fn join_guest(service: &Arc<RoomService>, room_id: &str, name: &str) -> Client {
    let mut guest = Client::connect(service);
    let joined = guest.request(json!({"type": "joinRoom", "roomId": room_id, "name": name}));
    assert_eq!(joined["ok"], true);
    assert_eq!(joined["data"]["isAdmin"], false);
    guest
}

#[test]
fn test_join_returns_snapshot_after_presence() {
    let service = service();
    let (mut admin, room_id, secret) = admin_in_new_room(&service);

    let mut guest = Client::connect(&service);
    let out = guest.send(json!({"type": "joinRoom", "requestId": 2, "roomId": room_id, "name": "amy"}));
    assert_eq!(out[0]["type"], "presence");
    assert_eq!(out[0]["users"].as_array().unwrap().len(), 2);

    let ack = &out[1];
    assert_eq!(ack["requestId"], 2);
    assert_eq!(ack["data"]["selfId"], guest.id());
    assert_eq!(ack["data"]["state"]["id"], room_id);
    assert_eq!(ack["data"]["state"]["playback"]["isPlaying"], false);
    assert!(!ack.to_string().contains(&secret));

    let seen = admin.drain();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0]["users"][1]["name"], "amy");
}

#[test]
fn test_join_missing_room() {
    let service = service();
    let mut client = Client::connect(&service);
    let ack = client.request(json!({"type": "joinRoom", "requestId": 5, "roomId": "nope"}));
    assert_eq!(ack["ok"], false);
    assert_eq!(ack["requestId"], 5);
    assert_eq!(ack["error"]["code"], "not_found");
    assert_eq!(*client.session.state(), SessionState::Unjoined);
}

#[test]
fn test_malformed_frames_are_acked() {
    let service = service();
    let (mut admin, room_id, secret) = admin_in_new_room(&service);

    let ack = admin.send_raw("{not json").pop().unwrap();
    assert_eq!(ack["ok"], false);
    assert_eq!(ack["error"]["code"], "malformed_input");
    assert!(ack.get("requestId").is_none());

    let ack = admin.request(json!({
        "type": "control:seek", "requestId": 3, "roomId": room_id,
        "positionSeconds": "ten", "adminSecret": secret
    }));
    assert_eq!(ack["requestId"], 3);
    assert_eq!(ack["error"]["code"], "malformed_input");

    let state = admin.request(json!({"type": "getState", "roomId": room_id}));
    assert_eq!(state["data"]["state"]["playback"]["positionSeconds"], 0.0);
}

#[test]
fn test_guest_control_toggle() {
    let service = service();
    let (mut admin, room_id, secret) = admin_in_new_room(&service);
    let mut guest = join_guest(&service, &room_id, "amy");
    admin.drain();

    let denied = guest.request(json!({"type": "control:play", "roomId": room_id}));
    assert_eq!(denied["error"]["code"], "unauthorized");
    assert!(admin.drain().is_empty());

    let denied = guest.request(json!({"type": "toggleGuestControl", "roomId": room_id}));
    assert_eq!(denied["error"]["code"], "unauthorized");

    let toggled = admin.send(json!({"type": "toggleGuestControl", "roomId": room_id, "adminSecret": secret}));
    assert_eq!(toggled[0]["type"], "settings");
    assert_eq!(toggled[1]["data"]["allowGuestControl"], true);
    assert_eq!(guest.drain()[0]["allowGuestControl"], true);

    let out = guest.send(json!({"type": "control:seek", "roomId": room_id, "positionSeconds": 30}));
    assert_eq!(out[0]["type"], "sync");
    assert_eq!(out[0]["playback"]["positionSeconds"], 30.0);
    assert_eq!(out[1]["ok"], true);
    assert_eq!(admin.drain()[0]["type"], "sync");
}

#[test]
fn test_change_media_resets_playback_for_everyone() {
    let service = service();
    let (mut admin, room_id, secret) = admin_in_new_room(&service);
    let mut guest = join_guest(&service, &room_id, "amy");

    admin.request(json!({"type": "control:rate", "roomId": room_id, "playbackRate": 10, "adminSecret": secret}));
    admin.request(json!({"type": "control:play", "roomId": room_id, "adminSecret": secret}));
    let rate = admin.request(json!({"type": "getState", "roomId": room_id}));
    assert_eq!(rate["data"]["state"]["playback"]["playbackRate"], 3.0);
    guest.drain();

    let ack = admin.request(json!({
        "type": "changeMedia", "roomId": room_id, "adminSecret": secret,
        "media": {"type": "url", "url": "https://cdn.example/movie.mp4", "title": "Movie"}
    }));
    assert_eq!(ack["ok"], true);

    let events = guest.drain();
    assert_eq!(events[0]["type"], "mediaChanged");
    assert_eq!(events[0]["media"]["type"], "url");
    assert_eq!(events[0]["playback"]["isPlaying"], false);
    assert_eq!(events[0]["playback"]["positionSeconds"], 0.0);
    assert_eq!(events[0]["playback"]["playbackRate"], 1.0);
}

#[test]
fn test_kick_removes_target_from_room_and_audience() {
    let service = service();
    let (mut admin, room_id, secret) = admin_in_new_room(&service);
    let mut guest = join_guest(&service, &room_id, "troll");
    admin.drain();

    let out = admin.send(json!({
        "type": "admin:kick", "roomId": room_id, "targetUserId": guest.id(), "adminSecret": secret
    }));
    assert_eq!(out[0]["type"], "presence");
    assert_eq!(out[0]["users"].as_array().unwrap().len(), 1);
    assert_eq!(out[1]["ok"], true);

    let events = guest.drain();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["type"], "kicked");
    assert_eq!(events[0]["roomId"], room_id);
    assert_eq!(*guest.session.state(), SessionState::Unjoined);

    let ack = guest.request(json!({"type": "chat:message", "roomId": room_id, "text": "hi"}));
    assert_eq!(ack["error"]["code"], "not_joined");

    admin.request(json!({"type": "control:play", "roomId": room_id, "adminSecret": secret}));
    assert!(guest.drain().is_empty());
}

#[test]
fn test_rejoin_before_kick_is_read_keeps_membership() {
    let service = service();
    let (mut admin, room_id, secret) = admin_in_new_room(&service);
    let mut guest = join_guest(&service, &room_id, "amy");
    admin.drain();

    let kick = admin.request(json!({
        "type": "admin:kick", "roomId": room_id, "targetUserId": guest.id(), "adminSecret": secret
    }));
    assert_eq!(kick["ok"], true);

    // The guest's inbound join is handled before its queued kick is written out
    guest
        .session
        .handle_frame(&json!({"type": "joinRoom", "roomId": room_id, "name": "amy"}).to_string());
    let events: Vec<Value> = guest.drain();
    let kinds: Vec<&str> = events.iter().map(|e| e["type"].as_str().unwrap()).collect();
    assert_eq!(kinds, vec!["kicked", "presence", "ack"]);
    assert!(matches!(guest.session.state(), SessionState::Joined { .. }));
    admin.drain();

    drop(guest);
    let presence = admin.drain();
    assert_eq!(presence[0]["users"].as_array().unwrap().len(), 1);
    let state = admin.request(json!({"type": "getState", "roomId": room_id}));
    let users = state["data"]["state"]["users"].as_array().unwrap().clone();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["name"], "host");
}

#[test]
fn test_kick_requires_secret() {
    let service = service();
    let (mut admin, room_id, _) = admin_in_new_room(&service);
    let mut guest = join_guest(&service, &room_id, "amy");

    let ack = guest.request(json!({"type": "admin:kick", "roomId": room_id, "targetUserId": admin.id()}));
    assert_eq!(ack["error"]["code"], "unauthorized");
    let state = admin.request(json!({"type": "getState", "roomId": room_id}));
    assert_eq!(state["data"]["state"]["users"].as_array().unwrap().len(), 2);
}

#[test]
fn test_muted_participant_chat_is_dropped() {
    let service = service();
    let (mut admin, room_id, secret) = admin_in_new_room(&service);
    let mut guest = join_guest(&service, &room_id, "loud");

    let ack = admin.request(json!({
        "type": "admin:mute", "roomId": room_id, "targetUserId": guest.id(), "adminSecret": secret
    }));
    assert_eq!(ack["ok"], true);
    let presence = guest.drain();
    assert_eq!(presence[0]["users"][1]["isMuted"], true);
    admin.drain();

    let ack = guest.request(json!({"type": "chat:message", "roomId": room_id, "text": "spam"}));
    assert_eq!(ack["error"]["code"], "muted");
    assert!(admin.drain().is_empty());

    let state = admin.request(json!({"type": "getState", "roomId": room_id}));
    assert!(state["data"]["state"]["chat"].as_array().unwrap().is_empty());
}

#[test]
fn test_chat_and_typing() {
    let service = service();
    let (mut admin, room_id, _) = admin_in_new_room(&service);
    let mut guest = join_guest(&service, &room_id, "amy");
    admin.drain();

    let out = guest.send(json!({"type": "chat:message", "roomId": room_id, "text": "hello"}));
    assert_eq!(out[0]["type"], "chat:new");
    assert_eq!(out[0]["userName"], "amy");
    assert_eq!(out[1]["data"]["message"]["text"], "hello");
    assert_eq!(admin.drain()[0]["text"], "hello");

    let out = guest.send(json!({"type": "chat:typing", "roomId": room_id, "typing": true}));
    assert_eq!(out.len(), 1, "typing is not echoed to the sender");
    let seen = admin.drain();
    assert_eq!(seen[0]["type"], "chat:typing");
    assert_eq!(seen[0]["userId"], guest.id());

    let ack = guest.request(json!({"type": "chat:message", "roomId": "elsewhere", "text": "hi"}));
    assert_eq!(ack["error"]["code"], "not_joined");
}

#[test]
fn test_rename_truncates_and_broadcasts() {
    let service = service();
    let (mut admin, room_id, _) = admin_in_new_room(&service);
    let out = admin.send(json!({"type": "presence:updateName", "roomId": room_id, "name": "x".repeat(80)}));
    assert_eq!(out[0]["users"][0]["name"].as_str().unwrap().len(), 40);
}

#[test]
fn test_leave_and_drop_notify_others() {
    let service = service();
    let (mut admin, room_id, _) = admin_in_new_room(&service);
    let mut guest = join_guest(&service, &room_id, "amy");
    let other = join_guest(&service, &room_id, "bob");
    admin.drain();

    let out = guest.send(json!({"type": "leaveRoom", "requestId": 8}));
    assert_eq!(out.last().unwrap()["ok"], true);
    assert_eq!(admin.drain()[0]["users"].as_array().unwrap().len(), 2);

    let again = guest.request(json!({"type": "leaveRoom"}));
    assert_eq!(again["error"]["code"], "not_joined");

    // Abnormal termination: no leave frame, the session is just dropped
    drop(other);
    let presence = admin.drain();
    assert_eq!(presence[0]["users"].as_array().unwrap().len(), 1);
}

#[test]
fn test_joining_another_room_leaves_the_first() {
    let service = service();
    let (mut first_admin, first_room, _) = admin_in_new_room(&service);
    let (_second_admin, second_room, _) = admin_in_new_room(&service);
    let mut wanderer = join_guest(&service, &first_room, "nomad");
    first_admin.drain();

    let joined = wanderer.request(json!({"type": "joinRoom", "roomId": second_room}));
    assert_eq!(joined["ok"], true);
    assert_eq!(
        *wanderer.session.joined_room().unwrap(),
        watchsync_core::models::RoomId::from_string(second_room)
    );
    assert_eq!(first_admin.drain()[0]["users"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_playback_advances_in_real_time() {
    let service = service();
    let (mut admin, room_id, secret) = admin_in_new_room(&service);

    admin.request(json!({
        "type": "changeMedia", "roomId": room_id, "adminSecret": secret,
        "media": {"type": "url", "url": "https://cdn.example/clip.mp4"}
    }));
    let play = admin.request(json!({"type": "control:play", "roomId": room_id, "adminSecret": secret}));
    assert_eq!(play["data"]["playback"]["isPlaying"], true);

    tokio::time::sleep(Duration::from_secs(2)).await;

    let state = admin.request(json!({"type": "getState", "roomId": room_id}));
    let playback = &state["data"]["state"]["playback"];
    let rate = playback["playbackRate"].as_f64().unwrap();
    let position = playback["positionSeconds"].as_f64().unwrap();
    assert!(
        (position - 2.0 * rate).abs() < 0.25,
        "expected about {} seconds, got {position}",
        2.0 * rate
    );
    assert!(playback["lastSyncTsMs"].as_i64().unwrap() > 0);
}
