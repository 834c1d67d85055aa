//! The seam between the dispatcher and a remote messaging API.

use std::sync::Arc;

use async_trait::async_trait;
use herald_common::Message;
use serde::{Deserialize, Serialize};

use crate::DeliveryError;

/// Acknowledgement returned by the remote API for an accepted message.
///
/// The dispatcher never looks inside; it is handed back to the caller as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    /// Identifier assigned by the remote API, when it returns one
    pub id: Option<String>,
    /// Raw response body
    #[serde(default)]
    pub body: serde_json::Value,
}

impl Receipt {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            body: serde_json::Value::Null,
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = body;
        self
    }
}

/// A single-message delivery mechanism.
///
/// Implementations are invoked concurrently from many tasks, and must
/// classify every failure so the retry policy can act on it.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Attempt to deliver `message` once.
    ///
    /// # Errors
    ///
    /// Returns a [`DeliveryError`] describing why this attempt failed.
    async fn deliver(&self, message: &Message) -> Result<Receipt, DeliveryError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn deliver(&self, message: &Message) -> Result<Receipt, DeliveryError> {
        (**self).deliver(message).await
    }
}
