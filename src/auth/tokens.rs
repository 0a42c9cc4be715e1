//! Session tokens identifying the caller of the auth endpoint
//!
//! Format: `sess-<base64url(json payload)>.<base64url(truncated HMAC)>`
//!
//! The payload is the [`AuthenticatedUser`] itself, so the gateway resolves
//! the caller without a user store.

use crate::auth::caller::{AuthenticatedUser, UserId};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use std::fmt;
use thiserror::Error;

/// Token prefix
pub const SESSION_TOKEN_PREFIX: &str = "sess-";

/// Bytes of the HMAC kept in the token
const SIGNATURE_LEN: usize = 16;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token format")]
    InvalidFormat,

    #[error("invalid token prefix: expected '{expected}', got '{got}'")]
    InvalidPrefix { expected: String, got: String },

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token decode error: {0}")]
    DecodeError(String),

    #[error("invalid signing key: {0}")]
    InvalidKey(String),
}

fn mac_for(secret: &[u8], payload_b64: &str) -> Result<HmacSha256, TokenError> {
    let mut mac =
        HmacSha256::new_from_slice(secret).map_err(|e| TokenError::InvalidKey(e.to_string()))?;
    mac.update(payload_b64.as_bytes());
    Ok(mac)
}

/// A signed, self-contained session token
#[derive(Debug, Clone)]
pub struct SessionToken {
    /// The full token string including prefix
    token: String,
    user: AuthenticatedUser,
}

impl SessionToken {
    /// Issue a token for a user
    pub fn issue(user: AuthenticatedUser, secret: &[u8]) -> Result<Self, TokenError> {
        let payload_json =
            serde_json::to_vec(&user).map_err(|e| TokenError::DecodeError(e.to_string()))?;
        let payload_b64 = URL_SAFE_NO_PAD.encode(&payload_json);

        let signature = mac_for(secret, &payload_b64)?.finalize().into_bytes();
        let signature_b64 = URL_SAFE_NO_PAD.encode(&signature[..SIGNATURE_LEN]);

        let token = format!("{}{}.{}", SESSION_TOKEN_PREFIX, payload_b64, signature_b64);

        Ok(Self { token, user })
    }

    /// Parse and verify a token
    pub fn parse(token: &str, secret: &[u8]) -> Result<Self, TokenError> {
        let Some(content) = token.strip_prefix(SESSION_TOKEN_PREFIX) else {
            return Err(TokenError::InvalidPrefix {
                expected: SESSION_TOKEN_PREFIX.to_string(),
                got: token.chars().take(SESSION_TOKEN_PREFIX.len()).collect(),
            });
        };

        let Some((payload_b64, signature_b64)) = content.split_once('.') else {
            return Err(TokenError::InvalidFormat);
        };

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| TokenError::InvalidSignature)?;
        if signature.len() != SIGNATURE_LEN {
            return Err(TokenError::InvalidSignature);
        }

        mac_for(secret, payload_b64)?
            .verify_truncated_left(&signature)
            .map_err(|_| TokenError::InvalidSignature)?;

        let payload_json = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|e| TokenError::DecodeError(e.to_string()))?;

        let user: AuthenticatedUser = serde_json::from_slice(&payload_json)
            .map_err(|e| TokenError::DecodeError(e.to_string()))?;

        Ok(Self {
            token: token.to_string(),
            user,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.token
    }

    pub fn user(&self) -> &AuthenticatedUser {
        &self.user
    }

    pub fn user_id(&self) -> &UserId {
        &self.user.id
    }

    pub fn user_info(&self) -> &Value {
        &self.user.info
    }

    pub fn into_user(self) -> AuthenticatedUser {
        self.user
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TEST_SECRET: &[u8] = b"test-secret-key-for-signing";

    fn user() -> AuthenticatedUser {
        AuthenticatedUser::new(42).with_info(json!({"name": "Ada"}))
    }

    #[test]
    fn test_session_token_issue_parse() {
        let token = SessionToken::issue(user(), TEST_SECRET).unwrap();
        assert!(token.as_str().starts_with(SESSION_TOKEN_PREFIX));

        let parsed = SessionToken::parse(token.as_str(), TEST_SECRET).unwrap();
        assert_eq!(parsed.user_id(), &UserId::Int(42));
        assert_eq!(parsed.user_info(), &json!({"name": "Ada"}));
        assert_eq!(parsed.into_user(), user());
    }

    #[test]
    fn test_session_token_without_info() {
        let token = SessionToken::issue(AuthenticatedUser::new("ada"), TEST_SECRET).unwrap();
        let parsed = SessionToken::parse(token.as_str(), TEST_SECRET).unwrap();

        assert_eq!(parsed.user_id(), &UserId::from("ada"));
        assert!(parsed.user_info().is_null());
    }

    #[test]
    fn test_session_token_invalid_signature() {
        let token = SessionToken::issue(user(), TEST_SECRET).unwrap();

        let result = SessionToken::parse(token.as_str(), b"wrong-secret");
        assert!(matches!(result, Err(TokenError::InvalidSignature)));
    }

    #[test]
    fn test_session_token_tampered_payload() {
        let token = SessionToken::issue(user(), TEST_SECRET).unwrap();
        let (_, signature) = token.as_str().split_once('.').unwrap();

        let forged_payload = URL_SAFE_NO_PAD.encode(br#"{"id":1}"#);
        let forged = format!("{}{}.{}", SESSION_TOKEN_PREFIX, forged_payload, signature);

        let result = SessionToken::parse(&forged, TEST_SECRET);
        assert!(matches!(result, Err(TokenError::InvalidSignature)));
    }

    #[test]
    fn test_session_token_bad_format() {
        assert!(matches!(
            SessionToken::parse("role-abc", TEST_SECRET),
            Err(TokenError::InvalidPrefix { .. })
        ));
        assert!(matches!(
            SessionToken::parse("sess-nodot", TEST_SECRET),
            Err(TokenError::InvalidFormat)
        ));
        assert!(matches!(
            SessionToken::parse("sess-abc.!!!", TEST_SECRET),
            Err(TokenError::InvalidSignature)
        ));
    }
}
