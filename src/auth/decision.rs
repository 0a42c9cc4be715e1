//! Channel subscription decisions
//!
//! Flow for a raw channel name:
//! 1. Classify. Public channels are granted without a token.
//! 2. Guarded channels need an authenticated caller.
//! 3. Resolve the normalized name against the registry.
//! 4. Run the callback and read its answer for the channel's tier.
//! 5. Sign the original, prefixed channel name for the caller's socket.

use crate::auth::caller::CallerContext;
use crate::auth::registry::{ChannelAccess, ChannelRegistry};
use crate::channels::{Channel, ChannelTier};
use crate::signing::{SignedPayload, SignedResponseBuilder, SigningError};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Why a subscription was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// Guarded channel and no authenticated caller
    Unauthenticated,
    /// No registered pattern matches the channel
    NoAuthorizer,
    /// The channel's callback said no
    CallbackRejected,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::Unauthenticated => write!(f, "no authenticated caller"),
            DenyReason::NoAuthorizer => write!(f, "no authorizer registered for channel"),
            DenyReason::CallbackRejected => write!(f, "channel authorizer rejected caller"),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("access denied: {reason}")]
    AccessDenied { reason: DenyReason },

    #[error("signing failed: {0}")]
    SigningFailure(#[from] SigningError),
}

impl AuthError {
    fn denied(reason: DenyReason) -> Self {
        AuthError::AccessDenied { reason }
    }

    pub fn is_access_denied(&self) -> bool {
        matches!(self, AuthError::AccessDenied { .. })
    }

    /// HTTP status the host should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::AccessDenied { .. } => 403,
            AuthError::SigningFailure(_) => 500,
        }
    }
}

/// Callback answer read for a private channel
#[derive(Debug, Clone, PartialEq)]
pub enum PrivateDecision {
    Grant,
    Deny,
}

impl From<ChannelAccess> for PrivateDecision {
    fn from(access: ChannelAccess) -> Self {
        match access {
            ChannelAccess::Denied => PrivateDecision::Deny,
            ChannelAccess::Allowed | ChannelAccess::Member(_) => PrivateDecision::Grant,
        }
    }
}

/// Callback answer read for a presence channel
#[derive(Debug, Clone, PartialEq)]
pub enum PresenceDecision {
    /// Join, announcing the callback's answer as member info
    Grant(Value),
    Deny,
}

impl From<ChannelAccess> for PresenceDecision {
    fn from(access: ChannelAccess) -> Self {
        match access {
            ChannelAccess::Denied => PresenceDecision::Deny,
            ChannelAccess::Allowed => PresenceDecision::Grant(Value::Bool(true)),
            ChannelAccess::Member(info) => PresenceDecision::Grant(info),
        }
    }
}

/// Successful outcome of an authorization request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelGrant {
    /// Public channel, no token needed
    Public,
    Private(SignedPayload),
    Presence(SignedPayload),
}

impl ChannelGrant {
    pub fn payload(&self) -> Option<&SignedPayload> {
        match self {
            ChannelGrant::Public => None,
            ChannelGrant::Private(payload) | ChannelGrant::Presence(payload) => Some(payload),
        }
    }

    pub fn into_payload(self) -> Option<SignedPayload> {
        match self {
            ChannelGrant::Public => None,
            ChannelGrant::Private(payload) | ChannelGrant::Presence(payload) => Some(payload),
        }
    }
}

/// Decides channel subscriptions against a frozen registry
#[derive(Clone)]
pub struct ChannelAuthorizer {
    registry: Arc<ChannelRegistry>,
    responses: SignedResponseBuilder,
}

impl ChannelAuthorizer {
    pub fn new(registry: Arc<ChannelRegistry>, responses: SignedResponseBuilder) -> Self {
        Self { registry, responses }
    }

    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    /// Authorize `caller` to subscribe to the raw channel name
    pub fn authorize(&self, channel_name: &str, caller: &CallerContext) -> Result<ChannelGrant, AuthError> {
        let channel = Channel::new(channel_name);

        if !channel.is_guarded() {
            return Ok(ChannelGrant::Public);
        }

        let result = self.authorize_guarded(&channel, caller);

        match &result {
            Ok(_) => debug!(channel = %channel, tier = %channel.tier(), "Channel access granted"),
            Err(AuthError::AccessDenied { reason }) => {
                debug!(channel = %channel, reason = %reason, "Channel access denied")
            }
            Err(e) => warn!(channel = %channel, error = %e, "Failed to sign channel auth"),
        }

        result
    }

    fn authorize_guarded(&self, channel: &Channel, caller: &CallerContext) -> Result<ChannelGrant, AuthError> {
        let Some(user) = &caller.user else {
            return Err(AuthError::denied(DenyReason::Unauthenticated));
        };

        let resolved = self
            .registry
            .resolve(channel.normalized())
            .ok_or(AuthError::denied(DenyReason::NoAuthorizer))?;

        let access = resolved.authorize(caller);

        match channel.tier() {
            ChannelTier::Private => match PrivateDecision::from(access) {
                PrivateDecision::Grant => {
                    let payload = self.responses.sign_private(channel.as_str(), &caller.socket_id)?;
                    Ok(ChannelGrant::Private(payload))
                }
                PrivateDecision::Deny => Err(AuthError::denied(DenyReason::CallbackRejected)),
            },
            ChannelTier::Presence => match PresenceDecision::from(access) {
                PresenceDecision::Grant(info) => {
                    let payload = self.responses.sign_presence(
                        channel.as_str(),
                        &caller.socket_id,
                        &user.id,
                        Some(&info),
                    )?;
                    Ok(ChannelGrant::Presence(payload))
                }
                PresenceDecision::Deny => Err(AuthError::denied(DenyReason::CallbackRejected)),
            },
            ChannelTier::Public => Ok(ChannelGrant::Public),
        }
    }
}
