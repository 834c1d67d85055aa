#![allow(dead_code)] // Test utility module - not all helpers used in every test

pub mod mock_transport;

use herald_common::{Message, Recipient};

/// A text message to a fixed, valid recipient.
pub fn message(content: impl Into<String>) -> Message {
    let recipient = Recipient::parse("919876543210").unwrap_or_else(|err| panic!("{err}"));
    Message::text(recipient, content)
}
