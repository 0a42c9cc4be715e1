//! Channel authorization
//!
//! - [`ChannelRegistry`]: pattern -> callback bindings, built at startup
//! - [`ChannelAuthorizer`]: decides a subscription and signs the grant
//! - [`SessionToken`]: `sess-` prefixed tokens identifying callers over HTTP

mod caller;
mod decision;
mod registry;
mod tokens;

pub use caller::{AuthenticatedUser, CallerContext, UserId};
pub use decision::{
    AuthError, ChannelAuthorizer, ChannelGrant, DenyReason, PresenceDecision, PrivateDecision,
};
pub use registry::{AuthorizationCallback, ChannelAccess, ChannelRegistry, ResolvedChannel};
pub use tokens::{SessionToken, TokenError, SESSION_TOKEN_PREFIX};
