//! Outbound message model.
//!
//! A [`Message`] is the descriptor a caller hands to the dispatcher: who it is
//! for, what kind of payload it carries, and the payload itself. The dispatcher
//! treats it as opaque; only transports look inside.

use std::{
    fmt::{self, Display},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::MessageError;

/// A phone number in international format, digits only.
///
/// Parsing is forgiving about formatting (`+44 (0)20-7946.0000` style input)
/// but strict about the result: 10 to 15 ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Recipient(String);

impl Recipient {
    /// Fewest digits accepted after normalisation
    pub const MIN_DIGITS: usize = 10;
    /// Most digits accepted after normalisation (E.164 limit)
    pub const MAX_DIGITS: usize = 15;

    /// Normalise and validate a raw phone number.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::InvalidRecipient`] if the input contains
    /// characters other than digits and common separators, or if the digit
    /// count falls outside `MIN_DIGITS..=MAX_DIGITS`.
    pub fn parse(raw: &str) -> Result<Self, MessageError> {
        let invalid = |reason| MessageError::InvalidRecipient {
            recipient: raw.to_string(),
            reason,
        };

        let trimmed = raw.trim();
        let trimmed = trimmed.strip_prefix('+').unwrap_or(trimmed);

        let mut digits = String::with_capacity(trimmed.len());
        for c in trimmed.chars() {
            match c {
                '0'..='9' => digits.push(c),
                ' ' | '-' | '.' | '(' | ')' => {}
                _ => return Err(invalid("contains characters other than digits")),
            }
        }

        if digits.len() < Self::MIN_DIGITS {
            return Err(invalid("too few digits"));
        }

        if digits.len() > Self::MAX_DIGITS {
            return Err(invalid("too many digits"));
        }

        Ok(Self(digits))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Recipient {
    type Err = MessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Recipient {
    type Error = MessageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Recipient> for String {
    fn from(value: Recipient) -> Self {
        value.0
    }
}

/// The kind of payload a message carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Plain text body
    #[default]
    Text,
    /// Pre-approved template, content is the template name
    Template,
    /// Content is a link to the media
    Image,
    Document,
    Audio,
    Video,
}

impl MessageKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Template => "template",
            Self::Image => "image",
            Self::Document => "document",
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }

    /// Returns `true` for kinds whose content is a media link.
    #[must_use]
    pub const fn is_media(self) -> bool {
        matches!(self, Self::Image | Self::Document | Self::Audio | Self::Video)
    }
}

impl Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageKind {
    type Err = MessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "text" => Ok(Self::Text),
            "template" => Ok(Self::Template),
            "image" => Ok(Self::Image),
            "document" => Ok(Self::Document),
            "audio" => Ok(Self::Audio),
            "video" => Ok(Self::Video),
            _ => Err(MessageError::UnknownKind(s.to_string())),
        }
    }
}

/// A single outbound message descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub recipient: Recipient,
    #[serde(default, rename = "type")]
    pub kind: MessageKind,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn new(recipient: Recipient, kind: MessageKind, content: impl Into<String>) -> Self {
        Self {
            recipient,
            kind,
            content: content.into(),
        }
    }

    /// Convenience constructor for a plain text message
    #[must_use]
    pub fn text(recipient: Recipient, content: impl Into<String>) -> Self {
        Self::new(recipient, MessageKind::Text, content)
    }

    /// Check the payload is sendable.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::EmptyContent`] if the content is blank.
    pub fn validate(&self) -> Result<(), MessageError> {
        if self.content.trim().is_empty() {
            return Err(MessageError::EmptyContent);
        }

        Ok(())
    }
}
