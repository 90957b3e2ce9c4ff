//! TCP keep-alive probing for the PostgreSQL driver connection (§4.8).
//!
//! Grounded in the teacher's `keep_alive.rs` probe helper, adapted from a
//! server-side liveness check to a driver-side one: the driver periodically
//! writes a zero-length chunk to detect a half-dead socket before it would
//! otherwise surface as a confusing read timeout.

use anyhow::Result;
use std::io::ErrorKind;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{trace, warn};

/// Probe a socket for liveness by writing zero bytes. Returns `Ok(false)`
/// once the peer has clearly gone away (broken pipe / reset / aborted);
/// any other error is treated as transient.
pub async fn send_keep_alive_probe<S>(socket: &mut S) -> Result<bool>
where
    S: AsyncWrite + Unpin,
{
    match socket.write(&[]).await {
        Ok(_) => {
            trace!("keep-alive probe sent successfully");
            Ok(true)
        }
        Err(e)
            if e.kind() == ErrorKind::BrokenPipe
                || e.kind() == ErrorKind::ConnectionAborted
                || e.kind() == ErrorKind::ConnectionReset =>
        {
            warn!("keep-alive probe failed: connection is dead ({e})");
            Ok(false)
        }
        Err(e) => {
            trace!("keep-alive probe transient error: {e}");
            Ok(true)
        }
    }
}
