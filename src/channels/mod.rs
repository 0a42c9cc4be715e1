//! Channel naming and classification
//!
//! Channel names are opaque strings supplied by clients. Two prefixes mark a
//! channel as guarded:
//! - `private-` : subscriber must be authorized
//! - `presence-` : subscriber must be authorized and is announced to others
//!
//! Anything else is public. Only a prefix at position 0 counts, so
//! `test-private-channel` is public.

mod pattern;

pub use pattern::{ChannelParams, ChannelPattern, PatternError};

use std::fmt;

/// Channel prefixes
pub const PRIVATE_PREFIX: &str = "private-";
pub const PRESENCE_PREFIX: &str = "presence-";

/// Trust tier of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelTier {
    Public,
    Private,
    Presence,
}

impl ChannelTier {
    /// Guarded channels need an authenticated caller and a registered authorizer
    pub fn is_guarded(&self) -> bool {
        !matches!(self, ChannelTier::Public)
    }

    /// The prefix that marks this tier, if any
    pub fn prefix(&self) -> Option<&'static str> {
        match self {
            ChannelTier::Public => None,
            ChannelTier::Private => Some(PRIVATE_PREFIX),
            ChannelTier::Presence => Some(PRESENCE_PREFIX),
        }
    }
}

impl fmt::Display for ChannelTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelTier::Public => write!(f, "public"),
            ChannelTier::Private => write!(f, "private"),
            ChannelTier::Presence => write!(f, "presence"),
        }
    }
}

/// Determine the tier of a raw channel name
pub fn classify(raw: &str) -> ChannelTier {
    if raw.starts_with(PRIVATE_PREFIX) {
        ChannelTier::Private
    } else if raw.starts_with(PRESENCE_PREFIX) {
        ChannelTier::Presence
    } else {
        ChannelTier::Public
    }
}

/// Strip the tier prefix from a raw channel name.
///
/// At most one prefix is removed: `private-presence-test` becomes
/// `presence-test`.
pub fn normalize(raw: &str) -> &str {
    classify(raw)
        .prefix()
        .and_then(|prefix| raw.strip_prefix(prefix))
        .unwrap_or(raw)
}

/// A raw channel name together with its tier and normalized form
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Channel {
    /// The name exactly as the client sent it, e.g. "presence-room.42"
    name: String,
    tier: ChannelTier,
}

impl Channel {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let tier = classify(&name);
        Self { name, tier }
    }

    /// The original, prefixed name
    pub fn as_str(&self) -> &str {
        &self.name
    }

    pub fn tier(&self) -> ChannelTier {
        self.tier
    }

    /// The name with its tier prefix removed
    pub fn normalized(&self) -> &str {
        match self.tier.prefix() {
            Some(prefix) => &self.name[prefix.len()..],
            None => &self.name,
        }
    }

    pub fn is_guarded(&self) -> bool {
        self.tier.is_guarded()
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
