use serde::Serialize;

use super::id::ParticipantId;
use crate::validation::normalize_name;

/// Someone currently in a room.
///
/// `is_admin` is decided once, at join time, from the secret presented then.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: ParticipantId,
    pub name: String,
    pub is_muted: bool,
    pub is_admin: bool,
}

impl Participant {
    #[must_use]
    pub fn new(id: ParticipantId, name: Option<&str>, is_admin: bool) -> Self {
        Self {
            id,
            name: normalize_name(name),
            is_muted: false,
            is_admin,
        }
    }

    pub fn rename(&mut self, name: &str) {
        self.name = normalize_name(Some(name));
    }

    /// There is no unmute; a muted participant stays muted until they leave.
    pub fn mute(&mut self) {
        self.is_muted = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_participant_defaults() {
        let p = Participant::new(ParticipantId::from_string("p1".into()), None, false);
        assert_eq!(p.name, "Guest");
        assert!(!p.is_muted);
        assert!(!p.is_admin);
    }

    #[test]
    fn test_rename_truncates() {
        let mut p = Participant::new(ParticipantId::new(), Some("bob"), true);
        p.rename(&"n".repeat(64));
        assert_eq!(p.name.len(), 40);
        p.rename("");
        assert_eq!(p.name, "Guest");
    }

    #[test]
    fn test_serialization_uses_camel_case() {
        let p = Participant::new(ParticipantId::from_string("p1".into()), Some("amy"), true);
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["id"], "p1");
        assert_eq!(json["isAdmin"], true);
        assert_eq!(json["isMuted"], false);
    }
}
