//! The probing agent: sockets, shared state, and the concurrent loops.
//!
//! Two UDP sockets are used. The echo socket answers probes from other
//! agents; the probe socket sends this agent's own probes and receives their
//! echoes. Keeping them apart means the agent never reflects its own probes.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::{net::UdpSocket, task::JoinSet};
use tokio_util::sync::CancellationToken;

use crate::{
    error::{Error, Result},
    receiver::run_receiver,
    reflector::run_reflector,
    registry::TargetRegistry,
    sender::{run_prober, PROBE_INTERVAL},
    stats::StatsTable,
};

/// A bound agent ready to run its loops.
pub struct Agent {
    echo_socket: Arc<UdpSocket>,
    probe_socket: Arc<UdpSocket>,
    registry: Arc<TargetRegistry>,
    stats: Arc<StatsTable>,
    period: Duration,
}

async fn bind_socket(addr: SocketAddr) -> Result<UdpSocket> {
    UdpSocket::bind(addr)
        .await
        .map_err(|source| Error::Bind { addr, source })
}

impl Agent {
    /// Binds both sockets and allocates stats for every registered target.
    pub async fn bind(
        source: impl Into<String>,
        registry: TargetRegistry,
        echo_addr: SocketAddr,
        probe_addr: SocketAddr,
    ) -> Result<Self> {
        let echo_socket = bind_socket(echo_addr).await?;
        log::info!("Starting UDP echo server on {}", echo_socket.local_addr()?);
        let probe_socket = bind_socket(probe_addr).await?;
        log::debug!("Probing from {}", probe_socket.local_addr()?);

        let stats = StatsTable::new(source, &registry);
        Ok(Agent {
            echo_socket: Arc::new(echo_socket),
            probe_socket: Arc::new(probe_socket),
            registry: Arc::new(registry),
            stats: Arc::new(stats),
            period: PROBE_INTERVAL,
        })
    }

    /// Overrides the probe period.
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Local address of the echo socket.
    pub fn echo_addr(&self) -> Result<SocketAddr> {
        Ok(self.echo_socket.local_addr()?)
    }

    /// Local address of the probe socket.
    pub fn probe_addr(&self) -> Result<SocketAddr> {
        Ok(self.probe_socket.local_addr()?)
    }

    /// Shared stats, for the metrics endpoint.
    pub fn stats(&self) -> Arc<StatsTable> {
        Arc::clone(&self.stats)
    }

    /// Runs reflector, prober and receiver until `cancel` fires or one of them
    /// fails.
    ///
    /// A failing loop cancels the others; its error is returned once all of
    /// them have stopped.
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        let mut tasks = JoinSet::new();

        {
            let socket = Arc::clone(&self.echo_socket);
            let cancel = cancel.clone();
            tasks.spawn(async move {
                run_reflector(&socket, cancel)
                    .await
                    .inspect_err(|e| log::error!("Echo server stopped: {}", e))
            });
        }
        {
            let socket = Arc::clone(&self.probe_socket);
            let registry = Arc::clone(&self.registry);
            let stats = Arc::clone(&self.stats);
            let cancel = cancel.clone();
            let period = self.period;
            tasks.spawn(async move {
                run_prober(&socket, &registry, &stats, period, cancel).await;
                Ok(())
            });
        }
        {
            let socket = Arc::clone(&self.probe_socket);
            let registry = Arc::clone(&self.registry);
            let stats = Arc::clone(&self.stats);
            let cancel = cancel.clone();
            tasks.spawn(async move {
                run_receiver(&socket, &registry, &stats, cancel)
                    .await
                    .inspect_err(|e| log::error!("Ping receiver stopped: {}", e))
            });
        }

        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            let result = joined
                .map_err(|e| Error::Task(e.to_string()))
                .and_then(|r| r);
            if let Err(e) = result {
                cancel.cancel();
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
