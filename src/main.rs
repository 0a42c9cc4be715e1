//! Herald CLI entry point

mod cli;

use crate::cli::{Cli, Commands};
use anyhow::{bail, Context, Result};
use clap::Parser;
use herald::auth::{AuthenticatedUser, SessionToken, UserId};
use herald::channels::{classify, ChannelTier};
use herald::server::{ChannelBinding, HeraldServer, ServerConfig};
use herald::signing::{HmacSigner, SignedResponseBuilder};
use serde_json::Value;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Serve {
            bind,
            app_key,
            app_secret,
            session_secret,
            channels,
        } => serve(bind, app_key, app_secret, session_secret, channels).await,
        Commands::Token {
            user_id,
            info,
            session_secret,
        } => token(user_id, info, session_secret),
        Commands::Sign {
            channel,
            socket_id,
            user_id,
            info,
            app_key,
            app_secret,
        } => sign(channel, socket_id, user_id, info, app_key, app_secret),
    }
}

fn parse_info(info: Option<&str>) -> Result<Option<Value>> {
    info.map(|raw| serde_json::from_str(raw).context("--info must be valid JSON"))
        .transpose()
}

async fn serve(
    bind: String,
    app_key: String,
    app_secret: String,
    session_secret: String,
    channels: Vec<ChannelBinding>,
) -> Result<()> {
    if channels.is_empty() {
        warn!("No channel rules configured; every guarded channel will be denied");
    }

    let config = ServerConfig {
        bind_addr: bind.parse().context("Invalid bind address")?,
        app_key,
        app_secret,
        session_secret: session_secret.into_bytes(),
        channels,
    };

    let server = HeraldServer::new(config).context("Invalid channel rules")?;

    tokio::select! {
        result = server.run() => {
            result?;
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received, stopping server");
        }
    }

    info!("Herald stopped");
    Ok(())
}

fn token(user_id: String, info: Option<String>, session_secret: String) -> Result<()> {
    let mut user = AuthenticatedUser::new(UserId::parse(&user_id));
    if let Some(info) = parse_info(info.as_deref())? {
        user = user.with_info(info);
    }

    let token = SessionToken::issue(user, session_secret.as_bytes())?;

    println!("{}", token);
    println!();
    println!("User ID: {}", token.user_id());
    if !token.user_info().is_null() {
        println!("Info: {}", token.user_info());
    }

    Ok(())
}

fn sign(
    channel: String,
    socket_id: String,
    user_id: Option<String>,
    info: Option<String>,
    app_key: String,
    app_secret: String,
) -> Result<()> {
    let responses = SignedResponseBuilder::new(Arc::new(HmacSigner::new(app_key, app_secret)));

    let payload = match classify(&channel) {
        ChannelTier::Public => bail!("Public channel '{}' needs no signature", channel),
        ChannelTier::Private => responses.sign_private(&channel, &socket_id)?,
        ChannelTier::Presence => {
            let user_id = user_id.context("--user-id is required for presence channels")?;
            let info = parse_info(info.as_deref())?;
            responses.sign_presence(&channel, &socket_id, &UserId::parse(&user_id), info.as_ref())?
        }
    };

    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
