use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the synchronization engine.
///
/// Every variant carries plain text so a single failure can be handed to all
/// requesters of a coalesced change batch.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Malformed temperature, unit, mode or setting
    #[error("validation error: {0}")]
    Validation(String),

    /// Upstream network or session failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Upstream rejected the session id, the session layer must log in again
    #[error("invalid session: {0}")]
    InvalidSession(String),

    /// Upstream rejected a submitted change
    #[error("command rejected: {0}")]
    Command(String),

    /// No devices could be discovered at startup
    #[error("bootstrap failed: {0}")]
    Bootstrap(String),

    /// Bus publish or subscribe failure
    #[error("bus error: {0}")]
    Bus(String),
}

impl Error {
    pub fn is_invalid_session(&self) -> bool {
        matches!(self, Error::InvalidSession(_))
    }
}

impl From<derive_builder::UninitializedFieldError> for Error {
    fn from(e: derive_builder::UninitializedFieldError) -> Self {
        Error::Validation(e.to_string())
    }
}

impl From<rumqttc::ClientError> for Error {
    fn from(e: rumqttc::ClientError) -> Self {
        Error::Bus(e.to_string())
    }
}
