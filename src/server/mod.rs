//! Standalone gateway server
//!
//! Wires declarative channel rules, the HMAC signer and session tokens into
//! the HTTP auth endpoint.

mod http;
mod rules;

pub use http::{create_router, run_http_server, AppState, AuthRequest};
pub use rules::{build_registry, ChannelBinding, ChannelRule, RuleError};

use crate::auth::ChannelAuthorizer;
use crate::signing::{HmacSigner, SignedResponseBuilder};

use axum::Router;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

/// Herald server configuration
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,
    /// Broker application key, sent in clear as part of `auth`
    pub app_key: String,
    /// Broker application secret used to sign subscriptions
    pub app_secret: String,
    /// Secret for verifying session tokens
    pub session_secret: Vec<u8>,
    /// Channel rules in match order
    pub channels: Vec<ChannelBinding>,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("app_key", &self.app_key)
            .field("channels", &self.channels)
            .finish_non_exhaustive()
    }
}

/// The auth gateway
pub struct HeraldServer {
    bind_addr: SocketAddr,
    state: AppState,
}

impl HeraldServer {
    /// Build the registry from the configured rules and freeze it
    pub fn new(config: ServerConfig) -> Result<Self, RuleError> {
        let registry = build_registry(&config.channels)?;
        for binding in &config.channels {
            info!(binding = %binding, "Channel rule registered");
        }

        let signer = HmacSigner::new(config.app_key, config.app_secret);
        let responses = SignedResponseBuilder::new(Arc::new(signer));
        let authorizer = ChannelAuthorizer::new(Arc::new(registry), responses);

        Ok(Self {
            bind_addr: config.bind_addr,
            state: AppState {
                authorizer,
                session_secret: Arc::from(config.session_secret),
            },
        })
    }

    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    pub fn authorizer(&self) -> &ChannelAuthorizer {
        &self.state.authorizer
    }

    /// Run the server
    pub async fn run(&self) -> anyhow::Result<()> {
        info!(
            addr = %self.bind_addr,
            channels = self.state.authorizer.registry().len(),
            "Herald server starting"
        );
        run_http_server(self.bind_addr, self.state.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthenticatedUser, CallerContext, ChannelGrant};

    fn config(channels: &[&str]) -> ServerConfig {
        ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            app_key: "key".to_string(),
            app_secret: "secret".to_string(),
            session_secret: b"session".to_vec(),
            channels: channels.iter().map(|c| c.parse().unwrap()).collect(),
        }
    }

    #[test]
    fn test_server_builds_registry_in_order() {
        let server = HeraldServer::new(config(&["orders.{id}=owner:id", "orders.all=authenticated"]))
            .unwrap();

        let patterns: Vec<&str> = server
            .authorizer()
            .registry()
            .patterns()
            .map(|p| p.as_str())
            .collect();
        assert_eq!(patterns, vec!["orders.{id}", "orders.all"]);

        let caller = CallerContext::authenticated("1.1", AuthenticatedUser::new(42));
        let grant = server.authorizer().authorize("private-orders.42", &caller).unwrap();
        assert!(matches!(grant, ChannelGrant::Private(_)));
    }

    #[test]
    fn test_server_rejects_bad_rules() {
        let err = HeraldServer::new(config(&["orders.{id}=owner:user"])).err().unwrap();
        assert!(matches!(err, RuleError::UnknownParam { .. }));
    }

    #[test]
    fn test_config_debug_hides_secrets() {
        let debug = format!("{:?}", config(&[]));
        assert!(debug.contains("key"));
        assert!(!debug.contains("secret"));
    }
}
