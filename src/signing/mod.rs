//! Broker authentication signatures
//!
//! The broker verifies subscriptions offline: the gateway signs
//! `socket_id:channel[:channel_data]` with the application secret and hands
//! the client an `auth` string of the form `<app_key>:<hex signature>`.
//!
//! - [`SigningPrimitive`]: the component that owns the secret
//! - [`HmacSigner`]: HMAC-SHA256 implementation of the primitive
//! - [`SignedResponseBuilder`]: shapes primitive output into [`SignedPayload`]

mod response;
mod signer;

pub use response::SignedResponseBuilder;
pub use signer::HmacSigner;

use crate::auth::UserId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SigningError {
    #[error("invalid socket id '{0}'")]
    InvalidSocketId(String),

    #[error("invalid channel name '{0}'")]
    InvalidChannel(String),

    #[error("malformed signer output: {0}")]
    MalformedResponse(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("signer failure: {0}")]
    Primitive(String),
}

/// Produces serialized broker auth responses
///
/// Both operations return JSON text: `{"auth": ...}` for `socket_auth` and
/// `{"auth": ..., "channel_data": ...}` for `presence_auth`.
pub trait SigningPrimitive: Send + Sync {
    fn socket_auth(&self, channel: &str, socket_id: &str) -> Result<String, SigningError>;

    fn presence_auth(
        &self,
        channel: &str,
        socket_id: &str,
        channel_data: &str,
    ) -> Result<String, SigningError>;
}

/// Body returned to the client on a successful guarded subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedPayload {
    /// `<app_key>:<signature>`
    pub auth: String,
    /// JSON-encoded [`PresenceChannelData`], presence channels only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_data: Option<String>,
}

impl SignedPayload {
    /// Decode the embedded presence data, if any
    pub fn presence_data(&self) -> Result<Option<PresenceChannelData>, SigningError> {
        self.channel_data
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .map_err(SigningError::from)
    }

    /// The application key half of `auth`
    pub fn app_key(&self) -> Option<&str> {
        self.auth.split_once(':').map(|(key, _)| key)
    }
}

/// Member data announced to other subscribers of a presence channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceChannelData {
    pub user_id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_info: Option<Value>,
}
