//! Declarative channel rules for the standalone server
//!
//! A binding is `<pattern>=<rule>`:
//! - `orders.{id}=owner:id` : the `id` parameter must equal the caller's user id
//! - `chat.{room}=authenticated` : any signed-in caller
//! - `audit=deny` : nobody
//!
//! On presence channels a granted caller is announced with their session info.

use crate::auth::{AuthenticatedUser, AuthorizationCallback, CallerContext, ChannelAccess, ChannelRegistry};
use crate::channels::{ChannelParams, ChannelPattern, PatternError};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("invalid channel binding '{0}': expected <pattern>=<rule>")]
    InvalidBinding(String),

    #[error("unknown channel rule '{0}': expected authenticated, owner:<param> or deny")]
    UnknownRule(String),

    #[error("rule for '{pattern}' references unknown parameter '{param}'")]
    UnknownParam { pattern: String, param: String },

    #[error(transparent)]
    Pattern(#[from] PatternError),
}

/// Access rule applied to a channel pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelRule {
    Authenticated,
    Owner { param: String },
    Deny,
}

/// Member data for a granted caller
fn membership(user: &AuthenticatedUser) -> ChannelAccess {
    match &user.info {
        Value::Null => ChannelAccess::Allowed,
        info => ChannelAccess::Member(info.clone()),
    }
}

impl AuthorizationCallback for ChannelRule {
    fn authorize(&self, caller: &CallerContext, params: &ChannelParams) -> ChannelAccess {
        let Some(user) = &caller.user else {
            return ChannelAccess::Denied;
        };

        match self {
            ChannelRule::Authenticated => membership(user),
            ChannelRule::Owner { param } => {
                if params.get(param) == Some(user.id.to_string().as_str()) {
                    membership(user)
                } else {
                    ChannelAccess::Denied
                }
            }
            ChannelRule::Deny => ChannelAccess::Denied,
        }
    }
}

impl FromStr for ChannelRule {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "authenticated" => Ok(ChannelRule::Authenticated),
            "deny" => Ok(ChannelRule::Deny),
            other => match other.strip_prefix("owner:") {
                Some(param) if !param.is_empty() => Ok(ChannelRule::Owner {
                    param: param.to_string(),
                }),
                _ => Err(RuleError::UnknownRule(other.to_string())),
            },
        }
    }
}

impl fmt::Display for ChannelRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelRule::Authenticated => write!(f, "authenticated"),
            ChannelRule::Owner { param } => write!(f, "owner:{}", param),
            ChannelRule::Deny => write!(f, "deny"),
        }
    }
}

/// A pattern paired with its rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelBinding {
    pub pattern: String,
    pub rule: ChannelRule,
}

impl ChannelBinding {
    /// Check the pattern compiles and owner rules name one of its placeholders
    pub fn validate(&self) -> Result<(), RuleError> {
        let pattern = ChannelPattern::parse(&self.pattern)?;

        if let ChannelRule::Owner { param } = &self.rule {
            if !pattern.placeholders().any(|p| p == param) {
                return Err(RuleError::UnknownParam {
                    pattern: self.pattern.clone(),
                    param: param.clone(),
                });
            }
        }

        Ok(())
    }

    pub fn register(&self, registry: &mut ChannelRegistry) -> Result<(), RuleError> {
        self.validate()?;
        registry.register_authorizer(&self.pattern, Arc::new(self.rule.clone()))?;
        Ok(())
    }
}

impl FromStr for ChannelBinding {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((pattern, rule)) = s.rsplit_once('=') else {
            return Err(RuleError::InvalidBinding(s.to_string()));
        };

        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(RuleError::InvalidBinding(s.to_string()));
        }

        Ok(Self {
            pattern: pattern.to_string(),
            rule: rule.parse()?,
        })
    }
}

impl fmt::Display for ChannelBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.pattern, self.rule)
    }
}

/// Build a registry from bindings, in order
pub fn build_registry(bindings: &[ChannelBinding]) -> Result<ChannelRegistry, RuleError> {
    let mut registry = ChannelRegistry::new();
    for binding in bindings {
        binding.register(&mut registry)?;
    }
    Ok(registry)
}
