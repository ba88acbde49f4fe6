use std::time::Duration;

use clap::ValueEnum;

use crate::session::{Backoff, ReconnectPolicy};
use crate::transport::websocket::WebSocketConfig;
use crate::transport::{Endpoint, TransportError};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_PATH: &str = "/ws";

#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq)]
pub enum Deployment {
    #[default]
    Development,
    Production,
}

#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq)]
pub enum BackoffKind {
    #[default]
    Fixed,
    Exponential,
}

/// Resolved mirror settings, after flags, environment, and `.env`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorConfig {
    pub host: String,
    pub port: u16,
    pub path: String,
    pub deployment: Deployment,
    pub reconnect_delay: Duration,
    pub backoff: BackoffKind,
    pub max_reconnect_delay: Duration,
    pub max_attempts: Option<u32>,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        let policy = ReconnectPolicy::default();
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            path: DEFAULT_PATH.to_string(),
            deployment: Deployment::default(),
            reconnect_delay: policy.delay,
            backoff: BackoffKind::default(),
            max_reconnect_delay: crate::session::reconnect::DEFAULT_MAX_RECONNECT_DELAY,
            max_attempts: policy.max_attempts,
        }
    }
}

impl MirrorConfig {
    /// Production deployments are only reachable over TLS.
    pub fn use_tls(&self) -> bool {
        self.deployment == Deployment::Production
    }

    pub fn websocket(&self) -> WebSocketConfig {
        WebSocketConfig::new(self.host.clone(), self.port)
            .with_path(self.path.clone())
            .with_tls(self.use_tls())
    }

    pub fn endpoint(&self) -> Result<Endpoint, TransportError> {
        self.websocket().endpoint()
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        let backoff = match self.backoff {
            BackoffKind::Fixed => Backoff::Fixed,
            BackoffKind::Exponential => Backoff::Exponential {
                max: self.max_reconnect_delay.max(self.reconnect_delay),
            },
        };
        ReconnectPolicy::fixed(self.reconnect_delay)
            .with_backoff(backoff)
            .with_max_attempts(self.max_attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_uses_plain_websocket() {
        let config = MirrorConfig::default();
        assert_eq!(
            config.endpoint().unwrap().url().as_str(),
            "ws://127.0.0.1:8080/ws"
        );
        assert_eq!(config.reconnect_policy(), ReconnectPolicy::default());
    }

    #[test]
    fn production_uses_tls() {
        let config = MirrorConfig {
            host: "mirror.example.com".to_string(),
            port: 8443,
            deployment: Deployment::Production,
            ..MirrorConfig::default()
        };
        let endpoint = config.endpoint().unwrap();
        assert!(endpoint.is_secure());
        assert_eq!(endpoint.url().as_str(), "wss://mirror.example.com:8443/ws");
    }

    #[test]
    fn exponential_ceiling_never_undercuts_base_delay() {
        let config = MirrorConfig {
            reconnect_delay: Duration::from_secs(5),
            max_reconnect_delay: Duration::from_secs(1),
            backoff: BackoffKind::Exponential,
            ..MirrorConfig::default()
        };
        assert_eq!(
            config.reconnect_policy().backoff,
            Backoff::Exponential {
                max: Duration::from_secs(5)
            }
        );
    }
}
