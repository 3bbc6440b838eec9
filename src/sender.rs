//! Prober sending a timestamped probe to every target once per period.

use std::time::Duration;

use tokio::{
    net::UdpSocket,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{
    metrics::agent_metrics, packets, registry::TargetRegistry, stats::StatsTable,
    time::monotonic_ns,
};

/// Probe period used by the agent.
pub const PROBE_INTERVAL: Duration = Duration::from_secs(1);

/// Probes every target once.
///
/// The target's stats are updated before the datagram leaves, so the echo can
/// never be counted ahead of its own send. A failed send is logged and the
/// remaining targets are still probed; the unsendable probe ends up counted as
/// lost.
pub async fn probe_targets(socket: &UdpSocket, registry: &TargetRegistry, stats: &StatsTable) {
    for (idx, target) in registry.iter() {
        let payload = packets::encode(monotonic_ns());
        stats.record_sent(idx);
        match socket.send_to(&payload, target.addr).await {
            Ok(_) => agent_metrics::record_probe_sent(),
            Err(e) => {
                log::warn!(
                    "Error sending {}-bytes request to {}: {}",
                    payload.len(),
                    target.addr,
                    e
                );
                agent_metrics::record_send_error();
            }
        }
    }
}

/// Runs the prober until `cancel` fires.
///
/// Ticks come from a monotonic periodic timer, the first one `period` after
/// start. A late tick delays the schedule instead of bursting to catch up, so
/// under sustained scheduling delay the probe rate simply drops.
pub async fn run_prober(
    socket: &UdpSocket,
    registry: &TargetRegistry,
    stats: &StatsTable,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => probe_targets(socket, registry, stats).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{receiver::run_receiver, reflector::run_reflector};
    use std::net::SocketAddr;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_probe_targets_sends_timestamp() {
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let registry = TargetRegistry::new(vec![("peer".to_string(), peer.local_addr().unwrap())]);
        let stats = StatsTable::new("paris", &registry);
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        let before = monotonic_ns();
        probe_targets(&socket, &registry, &stats).await;

        let mut buf = [0u8; 64];
        let (len, from) = peer.recv_from(&mut buf).await.unwrap();
        assert_eq!(from, socket.local_addr().unwrap());
        let ts = packets::decode(&buf[..len]).unwrap();
        assert!(ts >= before);
        assert!(ts <= monotonic_ns());

        let s = stats.get(0).unwrap();
        assert_eq!(s.sent(), 1);
        assert_eq!(s.in_flight(), 1);
    }

    #[tokio::test]
    async fn test_send_failure_is_isolated() {
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        // An IPv6 destination cannot be reached from an IPv4 socket.
        let unreachable: SocketAddr = "[::1]:9".parse().unwrap();
        let registry = TargetRegistry::new(vec![
            ("broken".to_string(), unreachable),
            ("peer".to_string(), peer.local_addr().unwrap()),
        ]);
        let stats = StatsTable::new("paris", &registry);
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();

        probe_targets(&socket, &registry, &stats).await;

        let mut buf = [0u8; 64];
        let (len, _) = peer.recv_from(&mut buf).await.unwrap();
        assert_eq!(len, packets::PROBE_SIZE);
        assert_eq!(stats.get(0).unwrap().sent(), 1);
        assert_eq!(stats.get(1).unwrap().sent(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_echo_never_counted_before_its_send() {
        let echo = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let registry = Arc::new(TargetRegistry::new(vec![(
            "peer".to_string(),
            echo.local_addr().unwrap(),
        )]));
        let stats = Arc::new(StatsTable::new("paris", &registry));
        let cancel = CancellationToken::new();

        let reflector = {
            let (echo, cancel) = (Arc::clone(&echo), cancel.clone());
            tokio::spawn(async move { run_reflector(&echo, cancel).await })
        };
        let receiver = {
            let (socket, registry, stats, cancel) = (
                Arc::clone(&socket),
                Arc::clone(&registry),
                Arc::clone(&stats),
                cancel.clone(),
            );
            tokio::spawn(async move { run_receiver(&socket, &registry, &stats, cancel).await })
        };

        for round in 1..=200u64 {
            probe_targets(&socket, &registry, &stats).await;

            let deadline = Instant::now() + Duration::from_secs(5);
            loop {
                let s = stats.get(0).unwrap();
                assert!(s.received() <= s.sent(), "reply counted before its send");
                if s.received() == round {
                    // Nothing else is outstanding once the echo is in.
                    assert_eq!(s.sent(), round);
                    assert_eq!(s.in_flight(), 0);
                    assert_eq!(s.packet_loss(), 0);
                    break;
                }
                assert!(Instant::now() < deadline, "echo {} never arrived", round);
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        }

        cancel.cancel();
        assert!(reflector.await.unwrap().is_ok());
        assert!(receiver.await.unwrap().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_prober_ticks_once_per_period() {
        // The peer never reads, so no probe is ever answered.
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let registry = Arc::new(TargetRegistry::new(vec![(
            "peer".to_string(),
            peer.local_addr().unwrap(),
        )]));
        let stats = Arc::new(StatsTable::new("paris", &registry));
        let socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let cancel = CancellationToken::new();

        let handle = {
            let (registry, stats, socket, cancel) = (
                Arc::clone(&registry),
                Arc::clone(&stats),
                Arc::clone(&socket),
                cancel.clone(),
            );
            tokio::spawn(async move {
                run_prober(&socket, &registry, &stats, PROBE_INTERVAL, cancel).await
            })
        };

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(stats.get(0).unwrap().sent(), 0);

        tokio::time::sleep(Duration::from_secs(5)).await;
        let s = stats.get(0).unwrap();
        assert_eq!(s.sent(), 5);
        assert_eq!(s.received(), 0);
        assert_eq!(s.in_flight(), 1);
        assert_eq!(s.packet_loss(), 4);

        cancel.cancel();
        handle.await.unwrap();
    }
}
