use std::{
    mem,
    net::{IpAddr, SocketAddr},
};

use log::{debug, error, info};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    sync::watch,
    task::JoinHandle,
};

use crate::BackendError;

/// One upstream listener on an OS-assigned port.
///
/// Lifecycle is `bind` → `serve` → `close`. Dropping a serving server also
/// stops its accept loop.
pub struct BackendServer {
    id: usize,
    addr: SocketAddr,
    state: ServerState,
}

enum ServerState {
    Bound(TcpListener),
    Serving {
        shutdown: watch::Sender<bool>,
        task: JoinHandle<()>,
    },
    Closed,
}

impl BackendServer {
    pub async fn bind(id: usize, host: IpAddr) -> Result<Self, BackendError> {
        let listener = TcpListener::bind(SocketAddr::new(host, 0))
            .await
            .map_err(|source| BackendError::Bind { id, source })?;
        let addr = listener
            .local_addr()
            .map_err(|source| BackendError::Bind { id, source })?;

        debug!("Server {} bound to {}", id, addr);

        Ok(Self {
            id,
            addr,
            state: ServerState::Bound(listener),
        })
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn is_serving(&self) -> bool {
        matches!(self.state, ServerState::Serving { .. })
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, ServerState::Closed)
    }

    /// Spawns the accept loop. Has no effect unless the server is freshly bound.
    pub fn serve(&mut self) {
        match mem::replace(&mut self.state, ServerState::Closed) {
            ServerState::Bound(listener) => {
                let (shutdown, signal) = watch::channel(false);
                let task = tokio::spawn(accept_connections(self.id, listener, signal));
                self.state = ServerState::Serving { shutdown, task };
            }
            other => self.state = other,
        }
    }

    /// Stops accepting and releases the listening socket.
    ///
    /// Returns once the socket is gone, so new connection attempts are
    /// refused. Only the first call succeeds.
    pub async fn close(&mut self) -> Result<(), BackendError> {
        match mem::replace(&mut self.state, ServerState::Closed) {
            ServerState::Bound(listener) => {
                drop(listener);
                Ok(())
            }
            ServerState::Serving { shutdown, task } => {
                // The loop may already be gone after an accept failure.
                let _ = shutdown.send(true);
                if let Err(err) = task.await {
                    error!("Server {} accept loop ended abnormally: {}", self.id, err);
                }
                Ok(())
            }
            ServerState::Closed => Err(BackendError::AlreadyClosed { id: self.id }),
        }
    }
}

async fn accept_connections(
    id: usize,
    listener: TcpListener,
    mut shutdown: watch::Receiver<bool>,
) {
    info!("Server {} accepting connections", id);

    loop {
        tokio::select! {
            _ = closed(&mut shutdown) => {
                info!("Listener closed, stopping server {}", id);
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!("Server {} accepted connection from {}", id, peer);
                    tokio::spawn(handle_connection(id, stream));
                }
                Err(err) => {
                    error!("Server {} error while accepting: {}", id, err);
                    break;
                }
            }
        }
    }
}

async fn closed(shutdown: &mut watch::Receiver<bool>) {
    // A dropped sender counts as closed.
    let _ = shutdown.wait_for(|closed| *closed).await;
}

async fn handle_connection(id: usize, stream: TcpStream) {
    let mut reader = BufReader::new(stream);
    let mut line = Vec::new();

    match reader.read_until(b'\n', &mut line).await {
        Ok(_) if line.ends_with(b"\n") => {}
        Ok(_) => {
            debug!(
                "Server {} connection closed before end of line ({} bytes unacknowledged)",
                id,
                line.len()
            );
            return;
        }
        Err(err) => {
            error!("Server {} read error: {}", id, err);
            return;
        }
    }

    let response = acknowledge(id, &String::from_utf8_lossy(&line));
    let mut stream = reader.into_inner();

    if let Err(err) = stream.write_all(response.as_bytes()).await {
        error!("Server {} write error: {}", id, err);
        return;
    }
    let _ = stream.shutdown().await;
}

/// Builds the reply line for `line` as sent to server `id`.
pub fn acknowledge(id: usize, line: &str) -> String {
    format!("Server {} ACK: {}\n", id, line.trim().to_uppercase())
}
