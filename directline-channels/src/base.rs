//! Error taxonomy for the Direct Line session

/// Direct Line errors
///
/// Every upstream failure aborts the operation in progress; nothing here is
/// retried by the session.
#[derive(Debug, thiserror::Error)]
pub enum DirectLineError {
    #[error("Failed to generate token (status {status}): {body}")]
    TokenAcquisition { status: u16, body: String },

    #[error("Failed to start conversation with the bot (status {status})")]
    ConversationStart { status: u16 },

    #[error("Failed to send activity (status {status}): {body}")]
    SendActivity { status: u16, body: String },

    #[error("Failed to retrieve activities from the bot (status {status})")]
    Poll { status: u16 },

    #[error("No active conversation to retrieve activities")]
    NoActiveConversation,

    #[error("Malformed activity id: {0}")]
    MalformedActivity(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid response body: {0}")]
    Decode(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Reply polling cancelled")]
    Cancelled,

    #[error("Session closed")]
    SessionClosed,
}

impl DirectLineError {
    /// Upstream (or upstream-equivalent) HTTP status carried by the error
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::TokenAcquisition { status, .. }
            | Self::ConversationStart { status }
            | Self::SendActivity { status, .. }
            | Self::Poll { status } => Some(*status),
            Self::NoActiveConversation => Some(400),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for DirectLineError {
    fn from(e: reqwest::Error) -> Self {
        DirectLineError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for DirectLineError {
    fn from(e: serde_json::Error) -> Self {
        DirectLineError::Decode(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DirectLineError>;
