//! In-process fan-out of room events to connected sessions

pub mod room_hub;

pub use room_hub::{RoomMessageHub, Subscriber};
