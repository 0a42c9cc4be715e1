//! CLI command definitions

use clap::{Parser, Subcommand};
use herald::server::ChannelBinding;

#[derive(Parser)]
#[command(name = "herald")]
#[command(about = "Channel authorization gateway for pub/sub broadcasting", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log filter, used when RUST_LOG is unset
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the auth endpoint
    ///
    /// Examples:
    ///   herald serve --channel 'orders.{id}=owner:id' --channel 'chat.{room}=authenticated'
    Serve {
        /// Address to bind to
        #[arg(short, long, default_value = "0.0.0.0:8080", env = "HERALD_BIND")]
        bind: String,

        /// Broker application key
        #[arg(long, env = "HERALD_APP_KEY")]
        app_key: String,

        /// Broker application secret
        #[arg(long, env = "HERALD_APP_SECRET")]
        app_secret: String,

        /// Secret for verifying session tokens
        #[arg(long, env = "HERALD_SESSION_SECRET")]
        session_secret: String,

        /// Channel rule as <pattern>=<rule> (can be repeated; first match wins).
        /// Several rules in one value are separated by spaces, which channel
        /// names cannot contain.
        #[arg(long = "channel", env = "HERALD_CHANNELS", value_delimiter = ' ')]
        channels: Vec<ChannelBinding>,
    },

    /// Issue a session token for a user
    ///
    /// Examples:
    ///   herald token --user-id 42 --info '{"name":"Ada"}'
    Token {
        /// User id (numeric ids stay numeric in presence data)
        #[arg(long)]
        user_id: String,

        /// User info as JSON, announced on presence channels
        #[arg(long)]
        info: Option<String>,

        /// Secret for signing session tokens
        #[arg(long, env = "HERALD_SESSION_SECRET")]
        session_secret: String,
    },

    /// Sign a channel subscription directly, bypassing channel rules
    Sign {
        /// Full channel name, e.g. private-orders.42
        #[arg(long)]
        channel: String,

        /// Broker socket id, e.g. 1234.5678
        #[arg(long)]
        socket_id: String,

        /// User id, required for presence channels
        #[arg(long)]
        user_id: Option<String>,

        /// User info as JSON (presence channels)
        #[arg(long)]
        info: Option<String>,

        /// Broker application key
        #[arg(long, env = "HERALD_APP_KEY")]
        app_key: String,

        /// Broker application secret
        #[arg(long, env = "HERALD_APP_SECRET")]
        app_secret: String,
    },
}
