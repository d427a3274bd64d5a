//! Two-way byte pipe between a client and the backend it was paired with.
//!
//! Each direction is copied on its own task. The first direction to reach
//! end-of-stream or fail ends the session: the other task is aborted and both
//! sockets are closed. There is no per-direction half-close.

use std::io;

use log::debug;
use tokio::{io::copy, net::TcpStream, task::JoinHandle};

use crate::LbError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToBackend,
    BackendToClient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelaySummary {
    /// Direction whose copy ended the session.
    pub first_finished: Direction,
    /// Bytes that direction copied.
    pub bytes: u64,
}

pub async fn pipe(client: TcpStream, backend: TcpStream) -> Result<RelaySummary, LbError> {
    let (mut client_read, mut client_write) = client.into_split();
    let (mut backend_read, mut backend_write) = backend.into_split();

    let mut upstream: JoinHandle<io::Result<u64>> =
        tokio::spawn(async move { copy(&mut client_read, &mut backend_write).await });
    let mut downstream: JoinHandle<io::Result<u64>> =
        tokio::spawn(async move { copy(&mut backend_read, &mut client_write).await });

    let (first_finished, outcome) = tokio::select! {
        res = &mut upstream => (Direction::ClientToBackend, res),
        res = &mut downstream => (Direction::BackendToClient, res),
    };
    let other = match first_finished {
        Direction::ClientToBackend => downstream,
        Direction::BackendToClient => upstream,
    };

    // Dropping the aborted task's halves closes whatever is still open.
    other.abort();
    let _ = other.await;

    let bytes = outcome
        .map_err(|err| LbError::Transfer(io::Error::other(err)))?
        .map_err(LbError::Transfer)?;

    debug!("{:?} finished first after {} bytes", first_finished, bytes);

    Ok(RelaySummary {
        first_finished,
        bytes,
    })
}
