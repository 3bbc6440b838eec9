use std::net::{IpAddr, Ipv4Addr, SocketAddr};

pub use clap::Parser;

use crate::error::Error;

/// Measure ping between locations and report as Prometheus metrics.
#[derive(Parser, Debug, Clone)]
#[command(name = "prometheus-ping", version, about, long_about = None)]
pub struct Configuration {
    /// Name of this agent, used as the `source` label
    #[arg(long)]
    pub source: String,
    /// UDP port answering probes from other agents
    #[arg(long, default_value_t = 5000)]
    pub listen_port: u16,
    /// TCP port serving the Prometheus endpoint
    #[arg(long, default_value_t = 8000)]
    pub metrics_port: u16,
    /// Local address to bind sockets to; also selects the target address family
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind_addr: IpAddr,
    /// Agents to probe, as host:port
    #[arg(value_name = "TARGET")]
    pub targets: Vec<String>,
}

impl Configuration {
    /// Checks values clap cannot check on its own.
    pub fn validate(&self) -> Result<(), Error> {
        if self.source.trim().is_empty() {
            return Err(Error::Configuration("source must not be empty".into()));
        }
        Ok(())
    }

    /// Address of the echo socket other agents send probes to.
    pub fn echo_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.listen_port)
    }

    /// Address of this agent's own probe socket; the OS picks the port.
    pub fn probe_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, 0)
    }

    /// Address the Prometheus endpoint listens on.
    pub fn metrics_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.metrics_port)
    }
}
