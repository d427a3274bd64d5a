//! Upstream echo endpoints and the pool that boots them.
//!
//! Each [`BackendServer`] answers one newline-terminated line per connection
//! with `Server <id> ACK: <LINE>`. [`BackendPool`] starts a numbered set of
//! them, retrying failed starts and skipping ordinals that never come up.

mod error;
pub mod pool;
pub mod server;

pub use error::{BackendError, PoolError};
pub use pool::BackendPool;
pub use server::{BackendServer, acknowledge};
pub use tcplb_config::validator::MAX_BACKENDS;
