//! HMAC-SHA256 signing primitive
//!
//! Signature: hex(HMAC-SHA256(app_secret, "socket_id:channel[:channel_data]"))

use crate::signing::{SigningError, SigningPrimitive};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

/// Socket ids look like `1234.5678`
fn is_valid_socket_id(socket_id: &str) -> bool {
    let is_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    socket_id
        .split_once('.')
        .is_some_and(|(a, b)| is_digits(a) && is_digits(b))
}

fn is_valid_channel_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '=' | '@' | ',' | '.' | ';')
}

fn is_valid_channel(channel: &str) -> bool {
    !channel.is_empty() && channel.chars().all(is_valid_channel_char)
}

/// Broker credentials and the signer built on them
#[derive(Clone)]
pub struct HmacSigner {
    app_key: String,
    app_secret: String,
}

impl HmacSigner {
    pub fn new(app_key: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Self {
            app_key: app_key.into(),
            app_secret: app_secret.into(),
        }
    }

    pub fn app_key(&self) -> &str {
        &self.app_key
    }

    fn mac(&self) -> Result<HmacSha256, SigningError> {
        HmacSha256::new_from_slice(self.app_secret.as_bytes())
            .map_err(|e| SigningError::Primitive(e.to_string()))
    }

    fn validate(channel: &str, socket_id: &str) -> Result<(), SigningError> {
        if !is_valid_socket_id(socket_id) {
            return Err(SigningError::InvalidSocketId(socket_id.to_string()));
        }
        if !is_valid_channel(channel) {
            return Err(SigningError::InvalidChannel(channel.to_string()));
        }
        Ok(())
    }

    /// Sign a string and format it as `<app_key>:<hex signature>`
    pub fn sign(&self, string_to_sign: &str) -> Result<String, SigningError> {
        let mut mac = self.mac()?;
        mac.update(string_to_sign.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        Ok(format!("{}:{}", self.app_key, signature))
    }

    /// Check an `auth` string against the expected signed content
    ///
    /// Comparison of the signature is constant-time.
    pub fn verify(&self, string_to_sign: &str, auth: &str) -> bool {
        let Some((key, signature)) = auth.split_once(':') else {
            return false;
        };
        if key != self.app_key {
            return false;
        }
        let Ok(signature) = hex::decode(signature) else {
            return false;
        };
        let Ok(mut mac) = self.mac() else {
            return false;
        };

        mac.update(string_to_sign.as_bytes());
        mac.verify_slice(&signature).is_ok()
    }
}

impl SigningPrimitive for HmacSigner {
    fn socket_auth(&self, channel: &str, socket_id: &str) -> Result<String, SigningError> {
        Self::validate(channel, socket_id)?;

        let auth = self.sign(&format!("{}:{}", socket_id, channel))?;
        Ok(serde_json::to_string(&json!({ "auth": auth }))?)
    }

    fn presence_auth(
        &self,
        channel: &str,
        socket_id: &str,
        channel_data: &str,
    ) -> Result<String, SigningError> {
        Self::validate(channel, socket_id)?;

        let auth = self.sign(&format!("{}:{}:{}", socket_id, channel, channel_data))?;
        Ok(serde_json::to_string(&json!({
            "auth": auth,
            "channel_data": channel_data,
        }))?)
    }
}

impl fmt::Debug for HmacSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacSigner")
            .field("app_key", &self.app_key)
            .field("app_secret", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn signer() -> HmacSigner {
        HmacSigner::new("278d425bdf160c739803", "7ad3773142a6692b25b8")
    }

    #[test]
    fn test_known_private_signature() {
        // Reference vector from the broker's published auth documentation
        let auth = signer().sign("1234.1234:private-foobar").unwrap();
        assert_eq!(
            auth,
            "278d425bdf160c739803:58df8b0c36d6982b82c3ecf6b4662e34fe8c25bba48f5369f135bf843651c3a4"
        );
    }

    #[test]
    fn test_socket_auth_output() {
        let out = signer().socket_auth("private-foobar", "1234.1234").unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();

        assert_eq!(
            value["auth"],
            "278d425bdf160c739803:58df8b0c36d6982b82c3ecf6b4662e34fe8c25bba48f5369f135bf843651c3a4"
        );
        assert!(value.get("channel_data").is_none());
    }

    #[test]
    fn test_presence_auth_signs_channel_data() {
        let signer = signer();
        let data = r#"{"user_id":42,"user_info":[1,2,3,4]}"#;
        let out = signer.presence_auth("presence-test", "1234.1234", data).unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();

        assert_eq!(value["channel_data"], data);
        let auth = value["auth"].as_str().unwrap();
        assert!(signer.verify(&format!("1234.1234:presence-test:{}", data), auth));
        assert!(!signer.verify("1234.1234:presence-test", auth));
    }

    #[test]
    fn test_verify_rejects_tampering() {
        let signer = signer();
        let auth = signer.sign("1.2:private-a").unwrap();

        assert!(signer.verify("1.2:private-a", &auth));
        assert!(!signer.verify("1.2:private-b", &auth));
        assert!(!signer.verify("1.2:private-a", "no-colon"));
        assert!(!signer.verify("1.2:private-a", &auth.replace("278d", "0000")));
        assert!(!signer.verify("1.2:private-a", "278d425bdf160c739803:zz"));

        let other = HmacSigner::new("278d425bdf160c739803", "different-secret");
        assert!(!other.verify("1.2:private-a", &auth));
    }

    #[test]
    fn test_socket_id_validation() {
        assert!(is_valid_socket_id("1234.5678"));
        assert!(!is_valid_socket_id("abcd.1234"));
        assert!(!is_valid_socket_id("1234"));
        assert!(!is_valid_socket_id("1234."));
        assert!(!is_valid_socket_id(".1234"));
        assert!(!is_valid_socket_id("1.2.3"));
        assert!(!is_valid_socket_id("1234.5678:private-evil"));

        let err = signer().socket_auth("private-test", "abcd.1234").unwrap_err();
        assert!(matches!(err, SigningError::InvalidSocketId(_)));
    }

    #[test]
    fn test_channel_validation() {
        assert!(!is_valid_channel("private-test.{param}"));
        assert!(is_valid_channel("presence-room_1=@,.;"));
        assert!(!is_valid_channel(""));
        assert!(!is_valid_channel("private-a:b"));

        let err = signer().socket_auth("private-a b", "1.2").unwrap_err();
        assert!(matches!(err, SigningError::InvalidChannel(_)));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", signer());
        assert!(debug.contains("278d425bdf160c739803"));
        assert!(!debug.contains("7ad3773142a6692b25b8"));
    }
}
