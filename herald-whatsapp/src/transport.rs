use std::{fmt, time::Duration};

use async_trait::async_trait;
use herald_common::{Message, outgoing};
use herald_dispatch::{
    DeliveryError, PermanentError, Receipt, SystemError, TemporaryError, Transport,
};
use reqwest::{StatusCode, Url};
use tracing::{debug, warn};

use crate::{TransportError, WhatsAppConfig, payload};

/// Delivers messages through the WhatsApp Cloud API.
///
/// Holds a pooled HTTP client, so one instance should serve every delivery.
#[derive(Clone)]
pub struct WhatsAppTransport {
    client: reqwest::Client,
    endpoint: Url,
    api_key: String,
}

impl fmt::Debug for WhatsAppTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WhatsAppTransport")
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

impl WhatsAppTransport {
    /// Build a transport from `config`, reading missing credentials from the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] if the key or URL are missing, the URL
    /// does not parse, or the HTTP client cannot be built.
    pub fn new(config: &WhatsAppConfig) -> Result<Self, TransportError> {
        let url = config.api_url()?;
        let api_key = config.api_key()?;
        Self::with_credentials(config, &url, api_key)
    }

    fn with_credentials(
        config: &WhatsAppConfig,
        url: &str,
        api_key: String,
    ) -> Result<Self, TransportError> {
        let endpoint = Url::parse(url).map_err(|e| TransportError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(TransportError::InvalidUrl {
                url: url.to_string(),
                reason: format!("unsupported scheme {}", endpoint.scheme()),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }
}

#[async_trait]
impl Transport for WhatsAppTransport {
    async fn deliver(&self, message: &Message) -> Result<Receipt, DeliveryError> {
        let body = payload::request_body(message);
        outgoing!("POST {} {} to {}", self.endpoint, message.kind, message.recipient);

        let started = std::time::Instant::now();
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        let text = response.text().await.map_err(request_error)?;

        debug!(
            status = status.as_u16(),
            duration_ms = started.elapsed().as_millis(),
            recipient = %message.recipient,
            "WhatsApp API responded"
        );

        if !status.is_success() {
            let error = classify(status, &text);
            warn!(status = status.as_u16(), recipient = %message.recipient, "WhatsApp API error: {error}");
            return Err(error);
        }

        let body: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
            SystemError::InvalidResponse(format!("undecodable success body ({status}): {e}"))
        })?;

        Ok(Receipt {
            id: payload::message_id(&body),
            body,
        })
    }
}

/// Map a failed HTTP exchange to a retry category.
fn request_error(err: reqwest::Error) -> DeliveryError {
    if err.is_timeout() {
        return TemporaryError::Timeout(err.to_string()).into();
    }

    if err.is_connect() {
        return TemporaryError::ConnectionFailed(err.to_string()).into();
    }

    if err.is_builder() {
        return SystemError::Internal(err.to_string()).into();
    }

    TemporaryError::ConnectionFailed(err.to_string()).into()
}

/// Map a non-success response to a retry category.
///
/// Timeouts, rate limiting and server errors may clear up; any other client
/// error will not.
pub(crate) fn classify(status: StatusCode, body: &str) -> DeliveryError {
    let detail = payload::error_message(body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .map_or_else(|| status.as_str().to_string(), str::to_string)
    });
    let detail = format!("HTTP {}: {detail}", status.as_u16());

    match status {
        StatusCode::REQUEST_TIMEOUT => TemporaryError::Timeout(detail).into(),
        StatusCode::TOO_MANY_REQUESTS => TemporaryError::RateLimited(detail).into(),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            PermanentError::AuthenticationFailed(detail).into()
        }
        status if status.is_server_error() => TemporaryError::ServerError(detail).into(),
        status if status.is_client_error() => PermanentError::MessageRejected(detail).into(),
        _ => SystemError::InvalidResponse(detail).into(),
    }
}
