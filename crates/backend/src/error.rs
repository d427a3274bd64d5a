use std::{fmt, io};

#[derive(Debug)]
pub enum BackendError {
    Bind { id: usize, source: io::Error },
    AlreadyClosed { id: usize },
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Bind { id, source } => {
                write!(f, "server {id} failed to bind: {source}")
            }
            BackendError::AlreadyClosed { id } => write!(f, "server {id} is already closed"),
        }
    }
}

impl std::error::Error for BackendError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BackendError::Bind { source, .. } => Some(source),
            BackendError::AlreadyClosed { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// Requested backend count is outside `1..=MAX_BACKENDS`.
    Configuration { requested: usize },
    /// Every ordinal failed all of its start attempts.
    Exhausted { requested: usize },
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::Configuration { requested } => write!(
                f,
                "number of servers must be between 1 and {}, got {requested}",
                crate::MAX_BACKENDS
            ),
            PoolError::Exhausted { requested } => {
                write!(f, "failed to start any of {requested} backend servers")
            }
        }
    }
}

impl std::error::Error for PoolError {}
