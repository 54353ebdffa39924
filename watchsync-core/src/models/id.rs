use nanoid::nanoid;
use serde::{Deserialize, Serialize};

/// Length of generated room, participant and chat ids
pub const ID_LENGTH: usize = 12;

/// Random URL-safe id of [`ID_LENGTH`] characters
#[must_use]
pub fn generate_id() -> String {
    nanoid!(12)
}

/// Opaque string id: random on `new`, serialized as a bare string
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            #[must_use]
            pub fn new() -> Self {
                Self(generate_id())
            }

            #[must_use]
            pub const fn from_string(id: String) -> Self {
                Self(id)
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Room identifier, handed out at creation
    RoomId
);

string_id!(
    /// One participant per connection: the connection's id doubles as the
    /// participant's identity inside whatever room it joins.
    ParticipantId
);

/// Per-room admin secret.
///
/// Debug output is redacted so the secret never ends up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminSecret(String);

impl AdminSecret {
    /// Secret length in characters (~143 bits of entropy with the nanoid alphabet)
    pub const LENGTH: usize = 24;

    #[must_use]
    pub fn generate() -> Self {
        Self(nanoid!(24))
    }

    #[must_use]
    pub const fn from_string(secret: String) -> Self {
        Self(secret)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exact match against a presented secret. Empty or missing never matches.
    #[must_use]
    pub fn matches(&self, presented: Option<&str>) -> bool {
        presented.is_some_and(|p| !p.is_empty() && p == self.0)
    }
}

impl std::fmt::Debug for AdminSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AdminSecret(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_distinct() {
        assert_eq!(generate_id().len(), ID_LENGTH);

        let id1 = RoomId::new();
        let id2 = RoomId::new();
        assert_ne!(id1, id2);
        assert_eq!(id1.as_str().len(), ID_LENGTH);
        assert_eq!(ParticipantId::new().to_string().len(), ID_LENGTH);
    }

    #[test]
    fn test_ids_serialize_as_strings() {
        let id = ParticipantId::from_string("p1".into());
        assert_eq!(serde_json::to_value(&id).unwrap(), "p1");
        let back: RoomId = serde_json::from_str("\"r9\"").unwrap();
        assert_eq!(back, RoomId::from("r9".to_string()));
    }

    #[test]
    fn test_admin_secret_matching() {
        let secret = AdminSecret::from_string("s3cret".to_string());
        assert!(secret.matches(Some("s3cret")));
        assert!(!secret.matches(Some("S3cret")));
        assert!(!secret.matches(Some("")));
        assert!(!secret.matches(None));
    }

    #[test]
    fn test_generated_secret_length_and_redaction() {
        let secret = AdminSecret::generate();
        assert_eq!(secret.as_str().len(), AdminSecret::LENGTH);
        assert_ne!(secret, AdminSecret::generate());
        assert!(!format!("{secret:?}").contains(secret.as_str()));
    }
}
