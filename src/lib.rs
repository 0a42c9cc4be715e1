//! Herald - channel authorization gateway for pub/sub broadcasting
//!
//! Decides whether a client may subscribe to a `private-` or `presence-`
//! channel and signs the token the client presents to the real-time broker.

pub mod auth;
pub mod channels;
pub mod server;
pub mod signing;

pub use auth::{
    AuthError, AuthenticatedUser, CallerContext, ChannelAccess, ChannelAuthorizer, ChannelGrant,
    ChannelRegistry, SessionToken, UserId,
};
pub use channels::{classify, normalize, Channel, ChannelParams, ChannelPattern, ChannelTier};
pub use server::{HeraldServer, ServerConfig};
pub use signing::{HmacSigner, SignedPayload, SignedResponseBuilder, SigningPrimitive};
