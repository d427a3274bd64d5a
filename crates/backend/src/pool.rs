use std::{
    future::Future,
    net::{IpAddr, SocketAddr},
};

use log::{error, info};
use tcplb_config::validator::MAX_BACKENDS;
use tcplb_utils::retry::{RetryPolicy, retry};

use crate::{BackendError, BackendServer, PoolError};

/// Backends that came up during bootstrap, in ordinal order.
///
/// Ordinals that never started leave no gap, so positions are dense while
/// [`BackendServer::id`] keeps the original ordinal.
pub struct BackendPool {
    servers: Vec<BackendServer>,
}

impl BackendPool {
    /// Binds `count` servers on `host` and starts serving each as soon as it
    /// is up.
    pub async fn bootstrap(
        count: usize,
        host: IpAddr,
        policy: &RetryPolicy,
    ) -> Result<Self, PoolError> {
        Self::bootstrap_with(count, policy, |id| BackendServer::bind(id, host)).await
    }

    /// Same as [`BackendPool::bootstrap`] with a caller-supplied start step.
    pub async fn bootstrap_with<F, Fut>(
        count: usize,
        policy: &RetryPolicy,
        mut start: F,
    ) -> Result<Self, PoolError>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<BackendServer, BackendError>>,
    {
        if count == 0 || count > MAX_BACKENDS {
            return Err(PoolError::Configuration { requested: count });
        }

        let mut servers = Vec::with_capacity(count);
        for id in 0..count {
            let label = format!("server {id} start");
            match retry(policy, &label, |_attempt| start(id)).await {
                Ok(mut server) => {
                    server.serve();
                    info!("Server {} starting on {}", id, server.addr());
                    servers.push(server);
                }
                Err(err) => {
                    error!("Server {} permanently failed to start: {}", id, err);
                }
            }
        }

        if servers.is_empty() {
            return Err(PoolError::Exhausted { requested: count });
        }

        if servers.len() < count {
            info!(
                "Backend pool degraded: {} of {} servers running",
                servers.len(),
                count
            );
        }

        Ok(Self { servers })
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn address(&self, index: usize) -> Option<SocketAddr> {
        self.servers.get(index).map(|s| s.addr())
    }

    pub fn addresses(&self) -> Vec<SocketAddr> {
        self.servers.iter().map(|s| s.addr()).collect()
    }

    /// Original ordinals of the running servers, in pool order.
    pub fn ids(&self) -> Vec<usize> {
        self.servers.iter().map(|s| s.id()).collect()
    }

    #[cfg(test)]
    pub(crate) fn servers(&self) -> &[BackendServer] {
        &self.servers
    }

    /// Closes every server, carrying on past failures. Returns the failures.
    pub async fn close_all(&mut self) -> Vec<BackendError> {
        let mut failures = Vec::new();
        for server in &mut self.servers {
            if let Err(err) = server.close().await {
                failures.push(err);
            }
        }
        failures
    }
}

#[cfg(test)]
mod tests {
    use std::{io, net::Ipv4Addr, time::Duration};

    use tokio::net::TcpStream;

    use super::*;

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    fn quick() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1))
    }

    fn bind_failure(id: usize) -> BackendError {
        BackendError::Bind {
            id,
            source: io::Error::new(io::ErrorKind::AddrInUse, "no free sockets"),
        }
    }

    #[tokio::test]
    async fn out_of_range_counts_fail_before_any_start() {
        for count in [0, MAX_BACKENDS + 1] {
            let mut calls = 0;
            let result = BackendPool::bootstrap_with(count, &quick(), |id| {
                calls += 1;
                BackendServer::bind(id, LOCALHOST)
            })
            .await;

            assert_eq!(
                result.err(),
                Some(PoolError::Configuration { requested: count })
            );
            assert_eq!(calls, 0);
        }
    }

    #[tokio::test]
    async fn pool_and_config_validation_share_the_backend_limit() {
        let mut config = tcplb_config::config::Config::default();
        config.backends.count = MAX_BACKENDS + 1;
        assert!(!tcplb_config::validator::validate(&config));

        let result = BackendPool::bootstrap_with(config.backends.count, &quick(), |id| {
            BackendServer::bind(id, LOCALHOST)
        })
        .await;
        let err = result.err().unwrap();
        assert!(err.to_string().contains(&format!("between 1 and {MAX_BACKENDS}")));
    }

    #[tokio::test]
    async fn starts_every_requested_server() {
        let mut pool = BackendPool::bootstrap(4, LOCALHOST, &quick()).await.unwrap();

        assert_eq!(pool.len(), 4);
        assert_eq!(pool.ids(), vec![0, 1, 2, 3]);
        assert!(pool.servers().iter().all(|s| s.is_serving()));
        assert_eq!(pool.address(1), Some(pool.servers()[1].addr()));
        assert_eq!(pool.address(4), None);

        assert!(pool.close_all().await.is_empty());
    }

    #[tokio::test]
    async fn failed_ordinal_is_skipped_and_pool_is_compacted() {
        let mut attempts_for_one = 0;
        let mut pool = BackendPool::bootstrap_with(3, &quick(), |id| {
            let fail = id == 1;
            if fail {
                attempts_for_one += 1;
            }
            async move {
                if fail {
                    Err(bind_failure(id))
                } else {
                    BackendServer::bind(id, LOCALHOST).await
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(attempts_for_one, 3);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.ids(), vec![0, 2]);

        pool.close_all().await;
    }

    #[tokio::test]
    async fn flaky_start_succeeds_on_retry() {
        let mut attempts = 0;
        let mut pool = BackendPool::bootstrap_with(2, &quick(), |id| {
            attempts += 1;
            let fail = attempts == 1;
            async move {
                if fail {
                    Err(bind_failure(id))
                } else {
                    BackendServer::bind(id, LOCALHOST).await
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(attempts, 3);
        assert_eq!(pool.ids(), vec![0, 1]);

        pool.close_all().await;
    }

    #[tokio::test]
    async fn every_ordinal_failing_exhausts_the_pool() {
        let result = BackendPool::bootstrap_with(2, &quick(), |id| async move {
            Err(bind_failure(id))
        })
        .await;

        assert_eq!(result.err(), Some(PoolError::Exhausted { requested: 2 }));
    }

    #[tokio::test]
    async fn close_all_refuses_new_connections_and_reports_repeats() {
        let mut pool = BackendPool::bootstrap(3, LOCALHOST, &quick()).await.unwrap();
        let addresses = pool.addresses();

        assert!(pool.close_all().await.is_empty());
        for addr in addresses {
            assert!(TcpStream::connect(addr).await.is_err());
        }

        let failures = pool.close_all().await;
        assert_eq!(failures.len(), 3);
        assert!(
            failures
                .iter()
                .all(|err| matches!(err, BackendError::AlreadyClosed { .. }))
        );
    }
}
