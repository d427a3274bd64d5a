use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    sync::{Arc, Mutex},
    time::Duration,
};

use tcplb_backend::BackendPool;
use tcplb_config::config::Config;
use tcplb_lb::Selector;
use tcplb_utils::retry::RetryPolicy;
use tokio::{net::TcpListener, sync::watch};

pub mod error;
pub mod relay;
pub mod tcp_listener;

pub use error::LbError;

/// Client-facing TCP listener in front of a bootstrapped [`BackendPool`].
///
/// Lifecycle is `Created → Accepting → Closed`. See [`tcp_listener`] for the
/// operations.
pub struct LoadBalancer {
    addr: SocketAddr,
    // dense copy of the pool addresses; the pool never changes after bootstrap
    backends: Arc<[SocketAddr]>,
    selector: Arc<dyn Selector>,
    pool: tokio::sync::Mutex<BackendPool>,
    lifecycle: Mutex<Lifecycle>,

    shutdown: watch::Sender<bool>,
    released: watch::Sender<bool>,
}

enum Lifecycle {
    Created(TcpListener),
    Accepting,
    Closed,
}

/// Construction parameters for [`LoadBalancer::with_options`].
#[derive(Debug, Clone)]
pub struct BalancerOptions {
    pub listen: SocketAddr,
    pub backend_count: usize,
    pub backend_host: IpAddr,
    pub retry: RetryPolicy,
}

impl Default for BalancerOptions {
    fn default() -> Self {
        Self {
            listen: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0),
            backend_count: 1,
            backend_host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            retry: RetryPolicy::default(),
        }
    }
}

impl BalancerOptions {
    pub fn from_config(config: &Config) -> Result<Self, LbError> {
        let listen_ip: IpAddr = config.listen.address.parse().map_err(|_| {
            LbError::Configuration(format!(
                "invalid listen address '{}'",
                config.listen.address
            ))
        })?;
        let backend_host: IpAddr = config.backends.address.parse().map_err(|_| {
            LbError::Configuration(format!(
                "invalid backend address '{}'",
                config.backends.address
            ))
        })?;

        Ok(Self {
            listen: SocketAddr::new(listen_ip, config.listen.port),
            backend_count: config.backends.count,
            backend_host,
            retry: RetryPolicy::new(
                config.bootstrap.max_attempts,
                Duration::from_millis(config.bootstrap.retry_delay_ms),
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_follow_config() {
        let mut config = Config::default();
        config.listen.address = "0.0.0.0".to_string();
        config.listen.port = 9000;
        config.backends.count = 12;
        config.bootstrap.max_attempts = 5;
        config.bootstrap.retry_delay_ms = 250;

        let options = BalancerOptions::from_config(&config).unwrap();
        assert_eq!(options.listen, "0.0.0.0:9000".parse().unwrap());
        assert_eq!(options.backend_count, 12);
        assert_eq!(options.backend_host, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(
            options.retry,
            RetryPolicy::new(5, Duration::from_millis(250))
        );
    }

    #[test]
    fn options_reject_unparsable_addresses() {
        let mut config = Config::default();
        config.backends.address = "backend.local".to_string();

        match BalancerOptions::from_config(&config) {
            Err(LbError::Configuration(msg)) => assert!(msg.contains("backend.local")),
            other => panic!("unexpected result: {:?}", other.map(|o| o.listen)),
        }
    }
}
