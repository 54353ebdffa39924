pub mod broadcast;
pub mod permission;
pub mod room;

pub use broadcast::{MessageReceiver, MessageSender, RoomBroadcaster};
pub use room::{JoinOutcome, RoomService};
