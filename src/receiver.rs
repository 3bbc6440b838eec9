//! Reply receiver matching echoed probes back to targets.

use std::net::SocketAddr;

use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use crate::{
    error::Result,
    metrics::agent_metrics,
    packets::{self, PacketError},
    registry::TargetRegistry,
    stats::StatsTable,
    time::{elapsed_ns, monotonic_ns},
};

/// Receive buffer size; anything longer than a probe is rejected anyway, but
/// must not be mistaken for one by truncation.
const RECV_BUF_SIZE: usize = 1024;

/// What became of one datagram received on the probe socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// Reply from target `idx` after `elapsed_ns` nanoseconds.
    Matched { idx: usize, elapsed_ns: i64 },
    /// Sender is not a registered target.
    UnknownSender,
    /// Sender is a target but the payload is not a probe.
    Malformed(PacketError),
}

/// Accounts for one datagram received at monotonic time `now`.
///
/// Only a matched, well-formed reply touches the stats; everything else is
/// dropped without side effects.
pub fn handle_reply(
    registry: &TargetRegistry,
    stats: &StatsTable,
    src: SocketAddr,
    payload: &[u8],
    now: u64,
) -> ReplyOutcome {
    let Some(idx) = registry.lookup(&src) else {
        return ReplyOutcome::UnknownSender;
    };

    let sent_at = match packets::decode(payload) {
        Ok(ts) => ts,
        Err(e) => return ReplyOutcome::Malformed(e),
    };

    let elapsed_ns = elapsed_ns(now, sent_at);
    stats.record_reply(idx, elapsed_ns);
    ReplyOutcome::Matched { idx, elapsed_ns }
}

/// Receives replies on the probe socket until `cancel` fires.
///
/// A socket error ends the loop; individual bad datagrams never do.
pub async fn run_receiver(
    socket: &UdpSocket,
    registry: &TargetRegistry,
    stats: &StatsTable,
    cancel: CancellationToken,
) -> Result<()> {
    let mut buf = [0u8; RECV_BUF_SIZE];

    loop {
        let (len, src) = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            result = socket.recv_from(&mut buf) => result?,
        };

        match handle_reply(registry, stats, src, &buf[..len], monotonic_ns()) {
            ReplyOutcome::Matched { idx, elapsed_ns } => {
                agent_metrics::record_reply();
                if let Some(target) = registry.get(idx) {
                    log::trace!("Reply from {} after {} ns", target.name, elapsed_ns);
                }
            }
            ReplyOutcome::UnknownSender => {
                agent_metrics::record_reply_dropped("unknown_sender");
            }
            ReplyOutcome::Malformed(e) => {
                agent_metrics::record_reply_dropped("malformed");
                log::debug!("Dropping reply from {}: {}", src, e);
            }
        }
    }
}
