//! Channel authorizer registry
//!
//! Maps channel patterns to the callbacks that decide access. Built once at
//! startup, then shared read-only behind an `Arc`.

use crate::auth::caller::CallerContext;
use crate::channels::{ChannelParams, ChannelPattern, PatternError};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// What an authorization callback decided
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelAccess {
    /// Caller may not join
    Denied,
    /// Caller may join; no presence data
    Allowed,
    /// Caller may join and is announced with this data on presence channels
    Member(Value),
}

impl ChannelAccess {
    pub fn is_denied(&self) -> bool {
        matches!(self, ChannelAccess::Denied)
    }
}

impl From<bool> for ChannelAccess {
    fn from(allowed: bool) -> Self {
        if allowed {
            ChannelAccess::Allowed
        } else {
            ChannelAccess::Denied
        }
    }
}

/// Null, `false`, zero and empty strings/arrays/objects deny
impl From<Value> for ChannelAccess {
    fn from(value: Value) -> Self {
        let empty = match &value {
            Value::Null => true,
            Value::Bool(allowed) => return (*allowed).into(),
            Value::Number(n) => n.as_f64() == Some(0.0),
            Value::String(s) => s.is_empty(),
            Value::Array(items) => items.is_empty(),
            Value::Object(map) => map.is_empty(),
        };

        if empty {
            ChannelAccess::Denied
        } else {
            ChannelAccess::Member(value)
        }
    }
}

impl<T: Into<ChannelAccess>> From<Option<T>> for ChannelAccess {
    fn from(value: Option<T>) -> Self {
        value.map_or(ChannelAccess::Denied, Into::into)
    }
}

/// Decides whether a caller may join a channel matched by a pattern
///
/// Implemented for any `Fn(&CallerContext, &ChannelParams) -> impl Into<ChannelAccess>`.
pub trait AuthorizationCallback: Send + Sync {
    fn authorize(&self, caller: &CallerContext, params: &ChannelParams) -> ChannelAccess;
}

impl<F, R> AuthorizationCallback for F
where
    F: Fn(&CallerContext, &ChannelParams) -> R + Send + Sync,
    R: Into<ChannelAccess>,
{
    fn authorize(&self, caller: &CallerContext, params: &ChannelParams) -> ChannelAccess {
        self(caller, params).into()
    }
}

struct RegistryEntry {
    pattern: ChannelPattern,
    callback: Arc<dyn AuthorizationCallback>,
}

/// A pattern matched against a channel name, with its bound parameters
pub struct ResolvedChannel<'a> {
    pub pattern: &'a ChannelPattern,
    pub params: ChannelParams,
    callback: &'a dyn AuthorizationCallback,
}

impl ResolvedChannel<'_> {
    /// Run the bound callback
    pub fn authorize(&self, caller: &CallerContext) -> ChannelAccess {
        self.callback.authorize(caller, &self.params)
    }
}

impl fmt::Debug for ResolvedChannel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedChannel")
            .field("pattern", &self.pattern.as_str())
            .field("params", &self.params)
            .finish()
    }
}

/// Ordered set of pattern -> callback bindings
///
/// Lookup is first-match-wins in registration order.
#[derive(Default)]
pub struct ChannelRegistry {
    entries: Vec<RegistryEntry>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Register a closure for a pattern
    pub fn register<F, R>(&mut self, pattern: &str, callback: F) -> Result<(), PatternError>
    where
        F: Fn(&CallerContext, &ChannelParams) -> R + Send + Sync + 'static,
        R: Into<ChannelAccess>,
    {
        self.register_authorizer(pattern, Arc::new(callback))
    }

    /// Register a shared callback for a pattern
    ///
    /// Re-registering the same pattern text replaces the callback but keeps
    /// the pattern's original position.
    pub fn register_authorizer(
        &mut self,
        pattern: &str,
        callback: Arc<dyn AuthorizationCallback>,
    ) -> Result<(), PatternError> {
        let pattern = ChannelPattern::parse(pattern)?;

        if let Some(entry) = self.entries.iter_mut().find(|e| e.pattern == pattern) {
            debug!(pattern = %pattern, "Replacing channel authorizer");
            entry.callback = callback;
            return Ok(());
        }

        debug!(pattern = %pattern, "Registered channel authorizer");
        self.entries.push(RegistryEntry { pattern, callback });
        Ok(())
    }

    /// Find the first pattern matching a normalized channel name
    pub fn resolve(&self, normalized: &str) -> Option<ResolvedChannel<'_>> {
        self.entries.iter().find_map(|entry| {
            entry.pattern.matches(normalized).map(|params| ResolvedChannel {
                pattern: &entry.pattern,
                params,
                callback: entry.callback.as_ref(),
            })
        })
    }

    /// Registered patterns in registration order
    pub fn patterns(&self) -> impl Iterator<Item = &ChannelPattern> {
        self.entries.iter().map(|e| &e.pattern)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ChannelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|e| e.pattern.as_str()))
            .finish()
    }
}
