use chrono::{DateTime, Utc};
use serde::Serialize;

/// Slowest accepted playback rate
pub const MIN_PLAYBACK_RATE: f64 = 0.25;
/// Fastest accepted playback rate
pub const MAX_PLAYBACK_RATE: f64 = 3.0;

/// Authoritative playback clock for a room.
///
/// Only a snapshot is stored: the position at `last_sync`, the rate, and
/// whether the clock is running. The current position is projected from that
/// snapshot whenever it is read, so no timer ever ticks per room.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackState {
    pub is_playing: bool,
    pub position_seconds: f64,
    pub playback_rate: f64,
    pub last_sync: DateTime<Utc>,
}

impl PlaybackState {
    /// Paused at position 0, rate 1
    #[must_use]
    pub const fn new(now: DateTime<Utc>) -> Self {
        Self {
            is_playing: false,
            position_seconds: 0.0,
            playback_rate: 1.0,
            last_sync: now,
        }
    }

    /// Position at `now`. While paused this is the stored position.
    #[must_use]
    pub fn effective_position(&self, now: DateTime<Utc>) -> f64 {
        if !self.is_playing {
            return self.position_seconds;
        }
        let elapsed_ms = (now - self.last_sync).num_milliseconds() as f64;
        (self.position_seconds + elapsed_ms / 1000.0 * self.playback_rate).max(0.0)
    }

    /// Fold elapsed time into the stored position and restart the clock at `now`.
    fn resync(&mut self, now: DateTime<Utc>) {
        self.position_seconds = self.effective_position(now);
        self.last_sync = now;
    }

    pub fn play(&mut self, now: DateTime<Utc>) {
        self.resync(now);
        self.is_playing = true;
    }

    pub fn pause(&mut self, now: DateTime<Utc>) {
        self.resync(now);
        self.is_playing = false;
    }

    /// Jump to `position_seconds`, floored at 0. Keeps the running state.
    pub fn seek(&mut self, position_seconds: f64, now: DateTime<Utc>) {
        self.position_seconds = position_seconds.max(0.0);
        self.last_sync = now;
    }

    /// Change the rate, clamped to [`MIN_PLAYBACK_RATE`, `MAX_PLAYBACK_RATE`].
    pub fn set_rate(&mut self, playback_rate: f64, now: DateTime<Utc>) {
        self.resync(now);
        self.playback_rate = clamp_rate(playback_rate);
    }

    /// Back to paused/0/rate 1, as on a media change
    pub fn reset(&mut self, now: DateTime<Utc>) {
        *self = Self::new(now);
    }

    pub fn apply(&mut self, command: PlaybackCommand, now: DateTime<Utc>) {
        match command {
            PlaybackCommand::Play => self.play(now),
            PlaybackCommand::Pause => self.pause(now),
            PlaybackCommand::Seek(position) => self.seek(position, now),
            PlaybackCommand::Rate(rate) => self.set_rate(rate, now),
        }
    }

    /// Wire view with the position resolved at `now`
    #[must_use]
    pub fn view(&self, now: DateTime<Utc>) -> PlaybackView {
        PlaybackView {
            is_playing: self.is_playing,
            position_seconds: self.effective_position(now),
            playback_rate: self.playback_rate,
            last_sync_ts_ms: now.timestamp_millis(),
        }
    }
}

#[must_use]
pub fn clamp_rate(rate: f64) -> f64 {
    rate.clamp(MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE)
}

/// A playback mutation issued by a participant
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackCommand {
    Play,
    Pause,
    Seek(f64),
    Rate(f64),
}

impl PlaybackCommand {
    #[must_use]
    pub const fn action(&self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Seek(_) => "seek",
            Self::Rate(_) => "rate",
        }
    }
}

/// Playback state as sent to clients.
///
/// `last_sync_ts_ms` is the instant `position_seconds` was resolved at, in
/// milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackView {
    pub is_playing: bool,
    pub position_seconds: f64,
    pub playback_rate: f64,
    pub last_sync_ts_ms: i64,
}
