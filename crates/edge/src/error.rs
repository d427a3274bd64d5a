use std::{fmt, io, net::SocketAddr};

use tcplb_backend::PoolError;

#[derive(Debug)]
pub enum LbError {
    /// Rejected before any socket was opened.
    Configuration(String),
    Bind {
        address: SocketAddr,
        source: io::Error,
    },
    PoolExhausted {
        requested: usize,
    },
    /// Selector picked a position outside the pool. Affects one connection.
    NoBackend {
        index: usize,
        pool_size: usize,
    },
    /// Selected backend could not be reached. Affects one connection.
    Dial {
        index: usize,
        address: SocketAddr,
        source: io::Error,
    },
    /// I/O failure mid-relay. Affects one connection.
    Transfer(io::Error),
    Accept(io::Error),
    AlreadyAccepting,
    Closed,
}

impl fmt::Display for LbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LbError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            LbError::Bind { address, source } => {
                write!(f, "Failed to bind {}: {}", address, source)
            }
            LbError::PoolExhausted { requested } => {
                write!(f, "Failed to start any of {} backend servers", requested)
            }
            LbError::NoBackend { index, pool_size } => write!(
                f,
                "Selector picked backend {} outside a pool of {}",
                index, pool_size
            ),
            LbError::Dial {
                index,
                address,
                source,
            } => write!(
                f,
                "Failed to connect to backend {} ({}): {}",
                index, address, source
            ),
            LbError::Transfer(err) => write!(f, "Transfer error: {}", err),
            LbError::Accept(err) => write!(f, "Accept error: {}", err),
            LbError::AlreadyAccepting => write!(f, "Load balancer is already accepting"),
            LbError::Closed => write!(f, "Load balancer is closed"),
        }
    }
}

impl std::error::Error for LbError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LbError::Bind { source, .. } | LbError::Dial { source, .. } => Some(source),
            LbError::Transfer(err) | LbError::Accept(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PoolError> for LbError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Configuration { .. } => LbError::Configuration(err.to_string()),
            PoolError::Exhausted { requested } => LbError::PoolExhausted { requested },
        }
    }
}
