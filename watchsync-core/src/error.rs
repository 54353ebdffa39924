use thiserror::Error;

/// Failure of a room command.
///
/// Every variant is handled inside the command dispatch path and reported to
/// the caller; none of them is fatal to the process.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not joined: {0}")]
    NotJoined(String),

    #[error("Muted: {0}")]
    Muted(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Stable code sent to clients in failed acks
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Unauthorized(_) => "unauthorized",
            Self::NotJoined(_) => "not_joined",
            Self::Muted(_) => "muted",
            Self::InvalidInput(_) => "malformed_input",
        }
    }

    pub(crate) fn room_not_found() -> Self {
        Self::NotFound("Room not found".to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
