//! WhatsApp Cloud API transport
//!
//! Implements [`herald_dispatch::Transport`] by POSTing one message per
//! request to the Graph API `messages` endpoint, and classifies failures so
//! the dispatcher's retry policy can tell transient trouble from rejection.

mod config;
mod error;
pub mod payload;
mod transport;

pub use config::{API_KEY_ENV, API_URL_ENV, WhatsAppConfig};
pub use error::TransportError;
pub use transport::WhatsAppTransport;
