//! Port Probing
//!
//! The server does not insist on its preferred port. Starting from the
//! configured port it walks forward, skipping ports that are already
//! taken, and binds the first free one. Callers get the listener plus
//! the port that actually stuck, so logs and clients agree on where the
//! server lives.

use std::io;

use tokio::net::TcpListener;
use tracing::debug;

/// How many consecutive ports to try before giving up.
pub const PROBE_SPAN: u16 = 100;

/// Why the probe could not produce a listener.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// Every candidate port in the span was taken.
    #[error("No free port in {start}..={end}")]
    Exhausted {
        /// First port tried.
        start: u16,
        /// Last port tried.
        end: u16,
    },

    /// A bind failed for a reason other than the port being taken.
    #[error("Bind failed: {0}")]
    Bind(#[from] io::Error),
}

/// Bind the first free port at or after `start_port`.
///
/// `AddrInUse` moves the probe to the next port; any other bind failure
/// stops it. Probing from port 0 is allowed and yields whatever
/// ephemeral port the OS picks.
pub async fn bind_first_available(
    host: &str,
    start_port: u16,
) -> Result<(TcpListener, u16), ProbeError> {
    let end = start_port.saturating_add(PROBE_SPAN - 1);

    for port in start_port..=end {
        match TcpListener::bind((host, port)).await {
            Ok(listener) => {
                let bound = listener.local_addr()?.port();
                return Ok((listener, bound));
            }
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                debug!("Port {} in use, trying next", port);
            }
            Err(e) => return Err(ProbeError::Bind(e)),
        }
    }

    Err(ProbeError::Exhausted { start: start_port, end })
}
