//! Shapes signing primitive output into client payloads

use crate::auth::UserId;
use crate::signing::{PresenceChannelData, SignedPayload, SigningError, SigningPrimitive};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Primitive output before `channel_data` is flattened to JSON text
#[derive(Deserialize)]
struct RawPayload {
    auth: String,
    #[serde(default)]
    channel_data: Value,
}

/// Parse primitive output and check that `auth` looks like `key:signature`
///
/// `channel_data` may come back as JSON text or as a nested object; either
/// way the payload carries it as text.
fn decode(raw: &str) -> Result<SignedPayload, SigningError> {
    let raw: RawPayload =
        serde_json::from_str(raw).map_err(|e| SigningError::MalformedResponse(e.to_string()))?;

    let channel_data = match raw.channel_data {
        Value::Null => None,
        Value::String(text) => Some(text),
        nested => Some(nested.to_string()),
    };

    match raw.auth.split_once(':') {
        Some((key, signature)) if !key.is_empty() && !signature.is_empty() => Ok(SignedPayload {
            auth: raw.auth,
            channel_data,
        }),
        _ => Err(SigningError::MalformedResponse(format!(
            "auth '{}' is not of the form key:signature",
            raw.auth
        ))),
    }
}

#[derive(Clone)]
pub struct SignedResponseBuilder {
    signer: Arc<dyn SigningPrimitive>,
}

impl SignedResponseBuilder {
    pub fn new(signer: Arc<dyn SigningPrimitive>) -> Self {
        Self { signer }
    }

    /// Sign a private channel subscription
    pub fn sign_private(&self, channel: &str, socket_id: &str) -> Result<SignedPayload, SigningError> {
        let raw = self.signer.socket_auth(channel, socket_id)?;
        let payload = decode(&raw)?;

        if payload.channel_data.is_some() {
            return Err(SigningError::MalformedResponse(
                "unexpected channel_data for private channel".to_string(),
            ));
        }

        Ok(payload)
    }

    /// Sign a presence channel subscription, embedding the member data
    pub fn sign_presence(
        &self,
        channel: &str,
        socket_id: &str,
        user_id: &UserId,
        user_info: Option<&Value>,
    ) -> Result<SignedPayload, SigningError> {
        let member = PresenceChannelData {
            user_id: user_id.clone(),
            user_info: user_info.cloned(),
        };
        let channel_data = serde_json::to_string(&member)?;

        let raw = self.signer.presence_auth(channel, socket_id, &channel_data)?;
        let payload = decode(&raw)?;

        match payload.presence_data() {
            Ok(Some(_)) => Ok(payload),
            Ok(None) => Err(SigningError::MalformedResponse(
                "missing channel_data for presence channel".to_string(),
            )),
            Err(e) => Err(SigningError::MalformedResponse(e.to_string())),
        }
    }
}
