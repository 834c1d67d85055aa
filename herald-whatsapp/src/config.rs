use std::fmt;

use serde::Deserialize;

use crate::TransportError;

/// Environment variable consulted when `api_key` is not configured.
pub const API_KEY_ENV: &str = "WHATSAPP_API_KEY";

/// Environment variable consulted when `api_url` is not configured.
pub const API_URL_ENV: &str = "WHATSAPP_API_URL";

const fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("herald/{}", env!("CARGO_PKG_VERSION"))
}

/// WhatsApp Cloud API connection settings.
///
/// `api_url` is the full `messages` endpoint, e.g.
/// `https://graph.facebook.com/v17.0/<PHONE_NUMBER_ID>/messages`.
#[derive(Clone, Deserialize)]
pub struct WhatsAppConfig {
    #[serde(default)]
    pub api_url: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request timeout (in seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            api_key: None,
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl fmt::Debug for WhatsAppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WhatsAppConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout_secs", &self.timeout_secs)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl WhatsAppConfig {
    /// Endpoint URL, falling back to [`API_URL_ENV`].
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::MissingApiUrl`] if neither is set.
    pub fn api_url(&self) -> Result<String, TransportError> {
        self.api_url_with(|name| std::env::var(name).ok())
    }

    /// Access token, falling back to [`API_KEY_ENV`].
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::MissingApiKey`] if neither is set.
    pub fn api_key(&self) -> Result<String, TransportError> {
        self.api_key_with(|name| std::env::var(name).ok())
    }

    pub(crate) fn api_url_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<String, TransportError> {
        resolve(self.api_url.as_deref(), API_URL_ENV, lookup).ok_or(TransportError::MissingApiUrl)
    }

    pub(crate) fn api_key_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<String, TransportError> {
        resolve(self.api_key.as_deref(), API_KEY_ENV, lookup).ok_or(TransportError::MissingApiKey)
    }
}

/// Configured value first, then the environment. Blank values count as unset.
fn resolve(
    configured: Option<&str>,
    env: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    configured
        .map(str::to_string)
        .filter(|value| !value.trim().is_empty())
        .or_else(|| lookup(env).filter(|value| !value.trim().is_empty()))
}
