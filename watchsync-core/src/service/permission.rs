//! Authorization guard
//!
//! Two tiers only: whoever presents the room's admin secret, and guests.
//! Admin-only actions (guest-control toggle, mute, kick) always need the
//! secret. Playback and media changes also pass for guests while guest
//! control is enabled.

use crate::models::Room;
use crate::{Error, Result};

/// True when `presented` is non-empty and equals the room's secret
#[must_use]
pub fn is_admin(room: &Room, presented: Option<&str>) -> bool {
    room.admin_secret.matches(presented)
}

/// True when guest control is on, or the caller is admin
#[must_use]
pub fn is_command_allowed(room: &Room, presented: Option<&str>) -> bool {
    room.allow_guest_control || is_admin(room, presented)
}

pub fn require_admin(room: &Room, presented: Option<&str>) -> Result<()> {
    if is_admin(room, presented) {
        Ok(())
    } else {
        Err(Error::Unauthorized("Admin secret required".to_string()))
    }
}

pub fn require_control(room: &Room, presented: Option<&str>) -> Result<()> {
    if is_command_allowed(room, presented) {
        Ok(())
    } else {
        Err(Error::Unauthorized(
            "Guest control is disabled and caller is not admin".to_string(),
        ))
    }
}
