use clap::{Args, Parser};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{BackoffKind, DEFAULT_HOST, DEFAULT_PATH, DEFAULT_PORT, Deployment, MirrorConfig};
use crate::telemetry::logging::{LogConfig, LogLevel};

#[derive(Parser, Debug)]
#[command(
    name = "spyglass",
    about = "🔭  Mirror a remote terminal stream, read-only",
    author,
    version
)]
pub struct Cli {
    #[command(flatten)]
    pub endpoint: EndpointArgs,

    #[command(flatten)]
    pub reconnect: ReconnectArgs,

    #[command(flatten)]
    pub logging: LoggingArgs,
}

#[derive(Args, Debug, Clone)]
pub struct EndpointArgs {
    #[arg(
        long,
        env = "SPYGLASS_HOST",
        default_value = DEFAULT_HOST,
        help = "Host of the terminal frame producer"
    )]
    pub host: String,

    #[arg(
        long,
        env = "SPYGLASS_PORT",
        default_value_t = DEFAULT_PORT,
        help = "Port of the terminal frame producer"
    )]
    pub port: u16,

    #[arg(
        long,
        env = "SPYGLASS_PATH",
        default_value = DEFAULT_PATH,
        help = "WebSocket path on the producer"
    )]
    pub path: String,

    #[arg(
        long,
        value_enum,
        env = "SPYGLASS_DEPLOYMENT",
        default_value_t = Deployment::Development,
        help = "Deployment kind; production connects over wss://"
    )]
    pub deployment: Deployment,
}

#[derive(Args, Debug, Clone)]
pub struct ReconnectArgs {
    #[arg(
        long = "reconnect-delay-ms",
        env = "SPYGLASS_RECONNECT_DELAY_MS",
        value_name = "MILLIS",
        default_value_t = 1000,
        help = "Delay before reconnecting after the connection closes"
    )]
    pub delay_ms: u64,

    #[arg(
        long = "backoff",
        value_enum,
        env = "SPYGLASS_BACKOFF",
        default_value_t = BackoffKind::Fixed,
        help = "Reconnect delay policy"
    )]
    pub backoff: BackoffKind,

    #[arg(
        long = "max-reconnect-delay-ms",
        env = "SPYGLASS_MAX_RECONNECT_DELAY_MS",
        value_name = "MILLIS",
        default_value_t = 30_000,
        help = "Ceiling for exponential backoff"
    )]
    pub max_delay_ms: u64,

    #[arg(
        long = "max-attempts",
        env = "SPYGLASS_MAX_ATTEMPTS",
        value_name = "COUNT",
        help = "Give up after this many consecutive failed reconnects (default: never)"
    )]
    pub max_attempts: Option<u32>,
}

#[derive(Args, Debug, Clone)]
pub struct LoggingArgs {
    #[arg(
        long = "log-level",
        value_enum,
        env = "SPYGLASS_LOG_LEVEL",
        default_value_t = LogLevel::Warn,
        help = "Minimum log level (error, warn, info, debug, trace)"
    )]
    pub level: LogLevel,

    #[arg(
        long = "log-file",
        value_name = "PATH",
        env = "SPYGLASS_LOG_FILE",
        help = "Write structured logs to the specified file instead of stderr"
    )]
    pub file: Option<PathBuf>,
}

impl LoggingArgs {
    pub fn to_config(&self) -> LogConfig {
        LogConfig {
            level: self.level,
            file: self.file.clone(),
        }
    }
}

impl Cli {
    pub fn mirror_config(&self) -> MirrorConfig {
        MirrorConfig {
            host: self.endpoint.host.clone(),
            port: self.endpoint.port,
            path: self.endpoint.path.clone(),
            deployment: self.endpoint.deployment,
            reconnect_delay: Duration::from_millis(self.reconnect.delay_ms),
            backoff: self.reconnect.backoff,
            max_reconnect_delay: Duration::from_millis(self.reconnect.max_delay_ms),
            max_attempts: self.reconnect.max_attempts,
        }
    }
}
