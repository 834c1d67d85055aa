use thiserror::Error;

use crate::{API_KEY_ENV, API_URL_ENV};

/// Errors building a [`WhatsAppTransport`](crate::WhatsAppTransport).
///
/// Per-message failures are reported as
/// [`DeliveryError`](herald_dispatch::DeliveryError) instead.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("No WhatsApp API key configured, set `api_key` or {API_KEY_ENV}")]
    MissingApiKey,

    #[error("No WhatsApp API URL configured, set `api_url` or {API_URL_ENV}")]
    MissingApiUrl,

    #[error("Invalid WhatsApp API URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
