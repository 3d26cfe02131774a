//! Inbound push notification envelope and payload decoding.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::object::{ObjectName, ObjectNameError};

/// Why a notification was rejected.
///
/// All variants are client errors: the payload is malformed, so the job is
/// acknowledged with a 400 and never retried by this service.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("notification envelope has no message")]
    MissingMessage,
    #[error("message data is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("message payload is not valid JSON: {0}")]
    InvalidPayload(#[from] serde_json::Error),
    #[error("message payload is missing the video name")]
    MissingName,
    #[error("message payload has an unusable video name: {0}")]
    InvalidName(#[from] ObjectNameError),
}

/// Push envelope delivered by the upstream queue.
///
/// Follows the Pub/Sub push shape: the payload rides base64-encoded in
/// `message.data`, with delivery metadata alongside it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PushEnvelope {
    /// The enveloped message; absent in malformed deliveries
    pub message: Option<PushMessage>,

    /// Subscription the delivery came from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription: Option<String>,
}

/// One queued message inside a [`PushEnvelope`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    /// Base64-encoded JSON payload
    #[serde(default)]
    pub data: String,

    /// Queue-assigned message ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,

    /// Publish timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_time: Option<DateTime<Utc>>,

    /// Publisher-set attributes
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, String>,
}

/// Decoded payload carried inside `message.data`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VideoUploadPayload {
    /// Key of the raw object that landed in the raw bucket
    #[serde(default)]
    pub name: Option<String>,
}

impl PushEnvelope {
    /// Wrap a message for publishing (used by tests and tooling).
    pub fn from_message(message: PushMessage) -> Self {
        Self {
            message: Some(message),
            subscription: None,
        }
    }

    /// Decode the enveloped payload down to a validated object name.
    ///
    /// Pure: a rejected payload provably touches neither local nor remote
    /// storage.
    pub fn decode(&self) -> Result<ObjectName, NotificationError> {
        let message = self
            .message
            .as_ref()
            .ok_or(NotificationError::MissingMessage)?;
        let bytes = STANDARD.decode(&message.data)?;
        let payload: VideoUploadPayload = serde_json::from_slice(&bytes)?;
        let name = payload.name.ok_or(NotificationError::MissingName)?;
        Ok(ObjectName::new(name)?)
    }
}

impl PushMessage {
    /// Build a message carrying `payload` as base64 JSON.
    pub fn with_payload(payload: &VideoUploadPayload) -> Self {
        // A plain struct with string fields cannot fail to serialize.
        let json = serde_json::to_vec(payload).unwrap_or_else(|_| b"{}".to_vec());
        Self {
            data: STANDARD.encode(json),
            ..Self::default()
        }
    }
}
