//! Process-wide room registry
//!
//! Owns every `Room`. Handlers never hold a room across calls: they look it up
//! by id, mutate it inside a closure while the entry is locked, and let go.
//! That gives each room a single writer at a time, and anything the closure
//! emits (fan-out) is ordered per room.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::eviction::EvictionPolicy;
use crate::models::{AdminSecret, Room, RoomId, RoomSnapshot};
use crate::{Error, Result};

pub struct RoomRegistry {
    rooms: DashMap<RoomId, Room>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for RoomRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomRegistry")
            .field("rooms", &self.rooms.len())
            .finish()
    }
}

impl RoomRegistry {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            rooms: DashMap::new(),
            clock,
        }
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Allocate a fresh room and return its id and admin secret.
    ///
    /// Both tokens are generated independently; an id collision is retried.
    pub fn create(&self) -> (RoomId, AdminSecret) {
        loop {
            let room_id = RoomId::new();
            if let Entry::Vacant(slot) = self.rooms.entry(room_id.clone()) {
                let secret = AdminSecret::generate();
                slot.insert(Room::new(room_id.clone(), secret.clone(), self.clock.now()));
                info!(room_id = %room_id, total_rooms = self.rooms.len(), "Room created");
                return (room_id, secret);
            }
            debug!(room_id = %room_id, "Room id collision, regenerating");
        }
    }

    #[must_use]
    pub fn contains(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Read a room without recording activity
    pub fn with_room<R>(&self, room_id: &RoomId, f: impl FnOnce(&Room) -> R) -> Result<R> {
        let room = self.rooms.get(room_id).ok_or_else(Error::room_not_found)?;
        Ok(f(room.value()))
    }

    /// Mutate a room. The closure also receives "now" so every timestamp
    /// written in one command is the same instant. Activity is recorded only
    /// when the closure succeeds.
    pub fn with_room_mut<R>(
        &self,
        room_id: &RoomId,
        f: impl FnOnce(&mut Room, DateTime<Utc>) -> Result<R>,
    ) -> Result<R> {
        let mut room = self.rooms.get_mut(room_id).ok_or_else(Error::room_not_found)?;
        let now = self.clock.now();
        let out = f(room.value_mut(), now)?;
        room.touch(now);
        Ok(out)
    }

    pub fn snapshot(&self, room_id: &RoomId) -> Result<RoomSnapshot> {
        let now = self.clock.now();
        self.with_room(room_id, |room| room.snapshot(now))
    }

    /// Drop every room the policy selects and return their ids
    pub fn evict(&self, policy: &dyn EvictionPolicy) -> Vec<RoomId> {
        let now = self.clock.now();
        let mut evicted = Vec::new();
        self.rooms.retain(|room_id, room| {
            if policy.should_evict(room, now) {
                evicted.push(room_id.clone());
                false
            } else {
                true
            }
        });
        for room_id in &evicted {
            info!(room_id = %room_id, "Room evicted");
        }
        evicted
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}
