//! Graph API request and response bodies

use herald_common::{Message, MessageKind};
use serde::Deserialize;
use serde_json::{Value, json};

/// Language sent with template messages
pub const TEMPLATE_LANGUAGE: &str = "en_US";

/// Build the `messages` request body for `message`.
///
/// The kind-specific object sits under a key named after the kind, as the
/// Graph API expects:
///
/// ```json
/// {"messaging_product": "whatsapp", "recipient_type": "individual",
///  "to": "919876543210", "type": "text", "text": {"body": "Hello"}}
/// ```
#[must_use]
pub fn request_body(message: &Message) -> Value {
    let kind = message.kind.as_str();
    let content = if message.kind.is_media() {
        json!({ "link": message.content })
    } else if message.kind == MessageKind::Template {
        json!({
            "name": message.content,
            "language": { "code": TEMPLATE_LANGUAGE },
        })
    } else {
        json!({ "body": message.content })
    };

    let mut body = json!({
        "messaging_product": "whatsapp",
        "recipient_type": "individual",
        "to": message.recipient.as_str(),
        "type": kind,
    });
    body[kind] = content;
    body
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

/// The `error` object of a failed Graph API call
#[derive(Debug, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub message: Option<String>,
}

/// Extract the API's error description from a response body, if it has one.
#[must_use]
pub fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error.message)
        .filter(|message| !message.is_empty())
}

/// The id the API assigned to an accepted message.
#[must_use]
pub fn message_id(body: &Value) -> Option<String> {
    body.pointer("/messages/0/id")
        .and_then(Value::as_str)
        .map(str::to_string)
}
