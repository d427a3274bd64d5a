use std::{
    mem,
    net::SocketAddr,
    sync::{Arc, MutexGuard, PoisonError},
};

use log::{debug, error, info};
use tcplb_backend::BackendPool;
use tcplb_config::config::Config;
use tcplb_lb::{LoadBalancing, Selector};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::watch,
    task::JoinHandle,
};

use crate::{BalancerOptions, LbError, Lifecycle, LoadBalancer, relay};

impl LoadBalancer {
    /// Boots `backend_count` local backends and binds the balancer on an
    /// OS-assigned loopback port.
    pub async fn new(backend_count: usize, selector: Arc<dyn Selector>) -> Result<Self, LbError> {
        let options = BalancerOptions {
            backend_count,
            ..BalancerOptions::default()
        };
        Self::with_options(options, selector).await
    }

    pub async fn from_config(config: &Config) -> Result<Self, LbError> {
        let selector = LoadBalancing::from_config(&config.load_balancing.lb_type)
            .map_err(LbError::Configuration)?;
        let options = BalancerOptions::from_config(config)?;
        Self::with_options(options, Arc::new(selector)).await
    }

    pub async fn with_options(
        options: BalancerOptions,
        selector: Arc<dyn Selector>,
    ) -> Result<Self, LbError> {
        let mut pool =
            BackendPool::bootstrap(options.backend_count, options.backend_host, &options.retry)
                .await?;

        let (listener, addr) = match bind_listener(options.listen).await {
            Ok(bound) => bound,
            Err(err) => {
                for failure in pool.close_all().await {
                    error!("Failed to close backend: {}", failure);
                }
                return Err(err);
            }
        };

        info!(
            "Load balancer bound to {} with {} backends {:?} ({})",
            addr,
            pool.len(),
            pool.ids(),
            selector.name()
        );

        let backends: Arc<[SocketAddr]> = pool.addresses().into();
        let (shutdown, _) = watch::channel(false);
        let (released, _) = watch::channel(false);

        Ok(Self {
            addr,
            backends,
            selector,
            pool: tokio::sync::Mutex::new(pool),
            lifecycle: std::sync::Mutex::new(Lifecycle::Created(listener)),
            shutdown,
            released,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn backend_count(&self) -> usize {
        self.backends.len()
    }

    /// Backend addresses in pool order.
    pub fn backend_addresses(&self) -> &[SocketAddr] {
        &self.backends
    }

    pub fn selector_name(&self) -> &'static str {
        self.selector.name()
    }

    /// Runs [`LoadBalancer::accept_connections`] on its own task.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<Result<(), LbError>> {
        let lb = Arc::clone(self);
        tokio::spawn(async move { lb.accept_connections().await })
    }

    /// Accepts clients until [`LoadBalancer::close`] is called.
    ///
    /// Each client is dispatched on its own task. Returns `Ok` when stopped
    /// by `close` and `LbError::Accept` if the listener itself fails; the
    /// listener is not recovered in that case.
    pub async fn accept_connections(&self) -> Result<(), LbError> {
        let taken = {
            let mut lifecycle = self.lock_lifecycle();
            match mem::replace(&mut *lifecycle, Lifecycle::Accepting) {
                Lifecycle::Created(listener) => listener,
                Lifecycle::Accepting => return Err(LbError::AlreadyAccepting),
                Lifecycle::Closed => {
                    *lifecycle = Lifecycle::Closed;
                    return Err(LbError::Closed);
                }
            }
        };

        let _release = ReleaseOnDrop(&self.released);
        // declared after `_release` so the socket is dropped first
        let listener = taken;
        let mut shutdown = self.shutdown.subscribe();

        info!("Load balancer accepting connections on {}", self.addr);

        loop {
            tokio::select! {
                _ = closed(&mut shutdown) => {
                    info!("Load balancer gracefully shutting down");
                    return Ok(());
                }
                accepted = listener.accept() => match accepted {
                    Ok((client, peer)) => {
                        let backends = Arc::clone(&self.backends);
                        let selector = Arc::clone(&self.selector);
                        tokio::spawn(async move {
                            let dispatched =
                                dispatch(client, peer, &backends, selector.as_ref()).await;
                            if let Err(err) = dispatched {
                                error!("Connection from {} failed: {}", peer, err);
                            }
                        });
                    }
                    Err(err) => {
                        error!("Load balancer error while accepting: {}", err);
                        return Err(LbError::Accept(err));
                    }
                }
            }
        }
    }

    /// Closes every backend, then the balancer's own listener.
    ///
    /// Backend close failures are logged and skipped. Relayed connections
    /// already in flight are left alone. Calling this again, even while a
    /// previous call is still running, is a no-op.
    pub async fn close(&self) {
        let previous = mem::replace(&mut *self.lock_lifecycle(), Lifecycle::Closed);
        if matches!(previous, Lifecycle::Closed) {
            debug!("Load balancer on {} already closed", self.addr);
            return;
        }

        info!("Closing load balancer on {}", self.addr);

        for failure in self.pool.lock().await.close_all().await {
            error!("Failed to close backend: {}", failure);
        }

        match previous {
            Lifecycle::Created(listener) => drop(listener),
            Lifecycle::Accepting => {
                let mut released = self.released.subscribe();
                self.shutdown.send_replace(true);
                let _ = released.wait_for(|released| *released).await;
            }
            Lifecycle::Closed => {}
        }

        info!("Load balancer on {} closed", self.addr);
    }

    fn lock_lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks the accept loop's listener as released, however the loop ends.
struct ReleaseOnDrop<'a>(&'a watch::Sender<bool>);

impl Drop for ReleaseOnDrop<'_> {
    fn drop(&mut self) {
        self.0.send_replace(true);
    }
}

async fn closed(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|closed| *closed).await;
}

async fn bind_listener(address: SocketAddr) -> Result<(TcpListener, SocketAddr), LbError> {
    let listener = TcpListener::bind(address)
        .await
        .map_err(|source| LbError::Bind { address, source })?;
    let addr = listener
        .local_addr()
        .map_err(|source| LbError::Bind { address, source })?;
    Ok((listener, addr))
}

/// Pairs one client with one backend and relays until either side is done.
///
/// A failed dial drops the client without a reply; no other backend is tried.
async fn dispatch(
    client: TcpStream,
    peer: SocketAddr,
    backends: &[SocketAddr],
    selector: &dyn Selector,
) -> Result<(), LbError> {
    let pool_size = backends.len();
    let index = selector.next(pool_size);
    let address = *backends
        .get(index)
        .ok_or(LbError::NoBackend { index, pool_size })?;

    let backend = TcpStream::connect(address)
        .await
        .map_err(|source| LbError::Dial {
            index,
            address,
            source,
        })?;

    debug!("Relaying {} to backend {} ({})", peer, index, address);

    match relay::pipe(client, backend).await {
        Ok(summary) => {
            debug!(
                "Relay {} <-> {} done: {:?} finished first ({} bytes)",
                peer, address, summary.first_finished, summary.bytes
            );
        }
        Err(err) => debug!("Relay {} <-> {} ended: {}", peer, address, err),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tcplb_lb::RoundRobin;
    use tokio::{io::AsyncReadExt, time::timeout};

    use super::*;

    #[tokio::test]
    async fn dial_failure_closes_client_without_reply() {
        let dead = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };

        let front = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut client = TcpStream::connect(front.local_addr().unwrap())
            .await
            .unwrap();
        let (accepted, peer) = front.accept().await.unwrap();

        let result = dispatch(accepted, peer, &[dead], &RoundRobin::new()).await;
        match result {
            Err(LbError::Dial { index, address, .. }) => {
                assert_eq!(index, 0);
                assert_eq!(address, dead);
            }
            other => panic!("unexpected dispatch result: {other:?}"),
        }

        let mut buf = Vec::new();
        let read = timeout(Duration::from_secs(5), client.read_to_end(&mut buf))
            .await
            .expect("client was left open");
        assert!(read.is_err() || buf.is_empty());
    }

    struct OutOfRange;

    impl Selector for OutOfRange {
        fn next(&self, pool_size: usize) -> usize {
            pool_size
        }

        fn name(&self) -> &'static str {
            "out-of-range"
        }
    }

    #[tokio::test]
    async fn out_of_range_pick_drops_client_instead_of_panicking() {
        let backend = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let backends = [backend.local_addr().unwrap()];

        let front = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut client = TcpStream::connect(front.local_addr().unwrap())
            .await
            .unwrap();
        let (accepted, peer) = front.accept().await.unwrap();

        let result = dispatch(accepted, peer, &backends, &OutOfRange).await;
        assert!(matches!(
            result,
            Err(LbError::NoBackend {
                index: 1,
                pool_size: 1
            })
        ));

        let mut buf = Vec::new();
        let read = timeout(Duration::from_secs(5), client.read_to_end(&mut buf))
            .await
            .expect("client was left open");
        assert!(read.is_err() || buf.is_empty());
    }
}
