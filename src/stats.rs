//! Per-target probe statistics and their on-demand aggregation.
//!
//! Every target owns one [`TargetStats`] slot behind its own mutex. The prober
//! and the reply receiver each apply their whole update inside one critical
//! section, and a scrape copies a slot under the same lock, so a scrape never
//! sees a reply counted while the in-flight flag is still set for it.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::registry::TargetRegistry;

/// Number of latency samples kept per target.
pub const SAMPLES: usize = 30;

/// Mutable probe state of a single target.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetStats {
    sent: u64,
    received: u64,
    /// Sticky flag, not a count: set by every send, cleared by any reply.
    in_flight: bool,
    latencies: VecDeque<i64>,
}

impl TargetStats {
    /// Creates empty stats with nothing sent yet.
    pub fn new() -> Self {
        TargetStats {
            sent: 0,
            received: 0,
            in_flight: false,
            latencies: VecDeque::with_capacity(SAMPLES + 1),
        }
    }

    /// Accounts for a probe sent to this target.
    pub fn record_sent(&mut self) {
        self.sent += 1;
        self.in_flight = true;
    }

    /// Accounts for a matched reply that took `elapsed_ns` to come back.
    ///
    /// Duplicate or reordered replies are counted at face value.
    pub fn record_reply(&mut self, elapsed_ns: i64) {
        self.latencies.push_back(elapsed_ns);
        while self.latencies.len() > SAMPLES {
            self.latencies.pop_front();
        }
        self.received += 1;
        self.in_flight = false;
    }

    /// Probes sent so far.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// Replies matched so far.
    pub fn received(&self) -> u64 {
        self.received
    }

    /// The in-flight flag as 0 or 1.
    pub fn in_flight(&self) -> u64 {
        self.in_flight as u64
    }

    /// Latency samples in nanoseconds, oldest first.
    pub fn latencies(&self) -> impl Iterator<Item = i64> + '_ {
        self.latencies.iter().copied()
    }

    /// Probes considered lost: `sent - received - in_flight`.
    ///
    /// The in-flight flag discounts at most one outstanding probe, so the value
    /// is an approximation. It is not clamped and can dip below zero when
    /// replies outnumber sends.
    pub fn packet_loss(&self) -> i64 {
        self.sent as i64 - self.received as i64 - self.in_flight() as i64
    }

    /// Mean of the latency window in seconds, `None` while the window is empty.
    pub fn average_latency_secs(&self) -> Option<f64> {
        if self.latencies.is_empty() {
            return None;
        }
        let sum: i128 = self.latencies.iter().map(|&ns| ns as i128).sum();
        Some(sum as f64 / self.latencies.len() as f64 / 1e9)
    }
}

/// Aggregated figures for one target at the time of a scrape.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetSnapshot {
    pub source: String,
    pub target: String,
    pub sent: u64,
    pub received: u64,
    pub in_flight: u64,
    pub packet_loss: i64,
    pub average_latency_secs: Option<f64>,
}

/// Stats slots for every registered target, indexed like the registry.
#[derive(Debug)]
pub struct StatsTable {
    source: String,
    names: Vec<String>,
    slots: Vec<Mutex<TargetStats>>,
}

impl StatsTable {
    /// Allocates one empty slot per registered target.
    pub fn new(source: impl Into<String>, registry: &TargetRegistry) -> Self {
        let names: Vec<String> = registry.iter().map(|(_, t)| t.name.clone()).collect();
        let slots = names.iter().map(|_| Mutex::new(TargetStats::new())).collect();
        StatsTable {
            source: source.into(),
            names,
            slots,
        }
    }

    /// Identity of this agent, used as the `source` label.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of targets.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` when no target is configured.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn slot(&self, idx: usize) -> Option<MutexGuard<'_, TargetStats>> {
        // A panicked writer cannot leave a slot half-updated: every update is
        // plain field writes with no early return.
        self.slots
            .get(idx)
            .map(|m| m.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Accounts for a probe sent to target `idx`.
    pub fn record_sent(&self, idx: usize) {
        if let Some(mut stats) = self.slot(idx) {
            stats.record_sent();
        }
    }

    /// Accounts for a reply from target `idx`.
    pub fn record_reply(&self, idx: usize, elapsed_ns: i64) {
        if let Some(mut stats) = self.slot(idx) {
            stats.record_reply(elapsed_ns);
        }
    }

    /// Consistent copy of one target's stats.
    pub fn get(&self, idx: usize) -> Option<TargetStats> {
        self.slot(idx).map(|stats| stats.clone())
    }

    /// Computes loss and average latency for every target, in registry order.
    pub fn collect(&self) -> Vec<TargetSnapshot> {
        self.names
            .iter()
            .zip(&self.slots)
            .map(|(name, slot)| {
                let stats = slot.lock().unwrap_or_else(PoisonError::into_inner);
                TargetSnapshot {
                    source: self.source.clone(),
                    target: name.clone(),
                    sent: stats.sent(),
                    received: stats.received(),
                    in_flight: stats.in_flight(),
                    packet_loss: stats.packet_loss(),
                    average_latency_secs: stats.average_latency_secs(),
                }
            })
            .collect()
    }
}
