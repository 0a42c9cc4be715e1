//! The inbound principal of an authorization request

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// User identifier, either numeric or textual
///
/// Serialized untagged so presence data carries `"user_id": 42` rather than a
/// stringified number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Int(i64),
    Str(String),
}

impl UserId {
    /// Parse from text, preferring the numeric form
    pub fn parse(s: &str) -> Self {
        s.parse::<i64>()
            .map(UserId::Int)
            .unwrap_or_else(|_| UserId::Str(s.to_string()))
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Int(id) => write!(f, "{}", id),
            UserId::Str(id) => write!(f, "{}", id),
        }
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        UserId::Int(id)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        UserId::Str(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        UserId::Str(id)
    }
}

/// A caller whose identity was established by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: UserId,
    /// Arbitrary attributes the host knows about the user
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub info: Value,
}

impl AuthenticatedUser {
    pub fn new(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            info: Value::Null,
        }
    }

    pub fn with_info(mut self, info: Value) -> Self {
        self.info = info;
        self
    }
}

/// Per-request caller context
#[derive(Debug, Clone)]
pub struct CallerContext {
    /// Authenticated user, if any. Guarded channels require one.
    pub user: Option<AuthenticatedUser>,
    /// The client's connection id on the broker
    pub socket_id: String,
}

impl CallerContext {
    pub fn anonymous(socket_id: impl Into<String>) -> Self {
        Self {
            user: None,
            socket_id: socket_id.into(),
        }
    }

    pub fn authenticated(socket_id: impl Into<String>, user: AuthenticatedUser) -> Self {
        Self {
            user: Some(user),
            socket_id: socket_id.into(),
        }
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.user.as_ref().map(|u| &u.id)
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}
