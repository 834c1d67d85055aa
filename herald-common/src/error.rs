//! Error types for the herald-common crate.

use thiserror::Error;

/// Errors raised while building or validating a [`Message`](crate::Message).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    /// The recipient is not a usable phone number.
    #[error("Invalid recipient {recipient:?}: {reason}")]
    InvalidRecipient {
        recipient: String,
        reason: &'static str,
    },

    /// The message has no content to send.
    #[error("Message content is empty")]
    EmptyContent,

    /// The message kind is not one the dispatcher knows about.
    #[error("Unknown message kind: {0}")]
    UnknownKind(String),
}

impl MessageError {
    /// Returns `true` if the error concerns the recipient rather than the payload.
    #[must_use]
    pub const fn is_recipient_error(&self) -> bool {
        matches!(self, Self::InvalidRecipient { .. })
    }
}
