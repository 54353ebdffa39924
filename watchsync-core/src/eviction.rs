//! Room eviction policies and the background sweeper

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::models::Room;
use crate::registry::RoomRegistry;

/// Decides whether a room may be dropped from the registry
pub trait EvictionPolicy: Send + Sync + std::fmt::Debug {
    fn should_evict(&self, room: &Room, now: DateTime<Utc>) -> bool;
}

/// Keep every room for the life of the process
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverEvict;

impl EvictionPolicy for NeverEvict {
    fn should_evict(&self, _room: &Room, _now: DateTime<Utc>) -> bool {
        false
    }
}

/// Evict rooms that are empty and have seen no activity for `ttl`.
///
/// A room with anyone still in it is never evicted, however long it idles.
#[derive(Debug, Clone, Copy)]
pub struct IdleTtl {
    ttl: chrono::Duration,
}

impl IdleTtl {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
        }
    }
}

impl EvictionPolicy for IdleTtl {
    fn should_evict(&self, room: &Room, now: DateTime<Utc>) -> bool {
        room.participants.is_empty() && now - room.last_activity > self.ttl
    }
}

/// Run `registry.evict(policy)` every `every` until the task is aborted
pub fn spawn_sweeper(
    registry: Arc<RoomRegistry>,
    policy: Arc<dyn EvictionPolicy>,
    every: Duration,
) -> JoinHandle<()> {
    info!(interval_secs = every.as_secs(), policy = ?policy, "Starting room eviction sweeper");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let evicted = registry.evict(policy.as_ref());
            debug!(evicted = evicted.len(), remaining = registry.len(), "Eviction sweep finished");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::models::{AdminSecret, Participant, ParticipantId, RoomId};

    fn empty_room(now: DateTime<Utc>) -> Room {
        Room::new(RoomId::new(), AdminSecret::generate(), now)
    }

    #[test]
    fn test_idle_ttl_boundary() {
        let now = Utc::now();
        let policy = IdleTtl::new(Duration::from_secs(30));
        let room = empty_room(now);

        assert!(!policy.should_evict(&room, now + chrono::Duration::seconds(30)));
        assert!(policy.should_evict(&room, now + chrono::Duration::seconds(31)));
    }

    #[test]
    fn test_idle_ttl_keeps_occupied_room() {
        let now = Utc::now();
        let mut room = empty_room(now);
        let id = ParticipantId::new();
        room.participants.insert(id.clone(), Participant::new(id, Some("a"), false));

        let policy = IdleTtl::new(Duration::from_secs(1));
        assert!(!policy.should_evict(&room, now + chrono::Duration::hours(5)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_evicts_on_interval() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let registry = Arc::new(RoomRegistry::new(clock.clone()));
        registry.create();

        let handle = spawn_sweeper(
            registry.clone(),
            Arc::new(IdleTtl::new(Duration::from_secs(10))),
            Duration::from_secs(5),
        );

        clock.advance(chrono::Duration::seconds(11));
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert!(registry.is_empty());

        handle.abort();
    }
}
