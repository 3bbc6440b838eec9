//! Echo responder answering probes from other agents.

use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use crate::{error::Result, metrics::agent_metrics};

/// Largest datagram the responder reflects in full.
const MAX_DATAGRAM: usize = 65535;

/// Sends every received datagram back to its sender, unmodified.
///
/// Payloads are not inspected and senders are not checked against the target
/// list, so any agent can use this one as a reflector. Returns `Ok(())` once
/// `cancel` fires; a socket error ends the loop.
pub async fn run_reflector(socket: &UdpSocket, cancel: CancellationToken) -> Result<()> {
    let mut buf = vec![0u8; MAX_DATAGRAM];

    loop {
        let (len, src) = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            result = socket.recv_from(&mut buf) => result?,
        };

        socket.send_to(&buf[..len], src).await?;
        agent_metrics::record_echo();
        log::trace!("Echoed {} bytes to {}", len, src);
    }
}
