//! Static set of probed targets.
//!
//! Targets are resolved once at startup and never change afterwards. Each target
//! gets a dense index that the stats table uses for its per-target slots.

use std::collections::HashMap;
use std::net::SocketAddr;

use tokio::net::lookup_host;

use crate::error::{Error, Result};

/// A remote agent being probed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Logical name, as given on the command line.
    pub name: String,
    /// Resolved address of the remote echo socket.
    pub addr: SocketAddr,
}

/// Maps reply source addresses back to targets.
#[derive(Debug, Default)]
pub struct TargetRegistry {
    targets: Vec<Target>,
    by_addr: HashMap<SocketAddr, usize>,
}

impl TargetRegistry {
    /// Builds a registry from already resolved `(name, address)` pairs.
    ///
    /// A pair whose address is already registered is skipped, since replies from
    /// that address could not be told apart; the first name wins.
    pub fn new<I>(targets: I) -> Self
    where
        I: IntoIterator<Item = (String, SocketAddr)>,
    {
        let mut registry = TargetRegistry::default();
        for (name, addr) in targets {
            if let Some(&idx) = registry.by_addr.get(&addr) {
                log::warn!(
                    "Skipping target {}: {} is already probed as {}",
                    name,
                    addr,
                    registry.targets[idx].name
                );
                continue;
            }
            registry.by_addr.insert(addr, registry.targets.len());
            registry.targets.push(Target { name, addr });
        }
        registry
    }

    /// Resolves `host:port` strings and builds the registry.
    ///
    /// Only addresses in the same family as `bind` are considered, because the
    /// probe socket cannot reach the other one.
    pub async fn resolve(specs: &[String], bind: SocketAddr) -> Result<Self> {
        let mut resolved = Vec::with_capacity(specs.len());
        for spec in specs {
            let addr = resolve_target(spec, bind).await?;
            resolved.push((spec.clone(), addr));
        }
        Ok(Self::new(resolved))
    }

    /// Index of the target whose address is `addr`, if any.
    pub fn lookup(&self, addr: &SocketAddr) -> Option<usize> {
        self.by_addr.get(addr).copied()
    }

    /// Target at index `idx`.
    pub fn get(&self, idx: usize) -> Option<&Target> {
        self.targets.get(idx)
    }

    /// Targets with their indices, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Target)> {
        self.targets.iter().enumerate()
    }

    /// Number of targets.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Returns `true` when no target is configured.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Logs the target table the way it is shown at startup.
    pub fn log_targets(&self) {
        log::info!("Targets:");
        if self.targets.is_empty() {
            log::info!("  no targets");
        }
        for target in &self.targets {
            log::info!("  {} -> {}", target.name, target.addr);
        }
    }
}

async fn resolve_target(spec: &str, bind: SocketAddr) -> Result<SocketAddr> {
    let addrs = lookup_host(spec).await.map_err(|e| Error::Resolve {
        target: spec.to_string(),
        reason: e.to_string(),
    })?;

    addrs
        .into_iter()
        .find(|a| a.is_ipv4() == bind.is_ipv4())
        .ok_or_else(|| Error::Resolve {
            target: spec.to_string(),
            reason: format!(
                "no {} address",
                if bind.is_ipv4() { "IPv4" } else { "IPv6" }
            ),
        })
}
