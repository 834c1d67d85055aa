//! Shared building blocks for the herald bulk dispatcher.
//!
//! - [`message`]: the outbound message model handed to transports
//! - [`logging`]: subscriber initialisation and the `internal!`/`outgoing!` macros
//! - [`error`]: validation errors for the message model

pub mod error;
pub mod logging;
pub mod message;

pub use error::MessageError;
pub use message::{Message, MessageKind, Recipient};
pub use tracing;
