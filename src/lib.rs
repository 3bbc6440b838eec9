//! prometheus-ping - measure ping between locations and report as Prometheus metrics.
//!
//! Every agent answers UDP probes from its peers and probes each of its own
//! targets once per second. Replies are matched by source address, and the
//! resulting packet loss and average round-trip latency are served on a
//! Prometheus endpoint.
//!
//! # Usage
//!
//! ```bash
//! prometheus-ping --source paris london.example.net:5000 tokyo.example.net:5000
//! curl http://127.0.0.1:8000/metrics
//! ```

/// Agent runtime tying sockets, stats and loops together.
pub mod agent;
/// Command-line configuration and validation.
pub mod configuration;
/// Error types.
pub mod error;
/// Prometheus endpoint and self-instrumentation.
pub mod metrics;
/// Probe payload encoding and decoding.
pub mod packets;
/// Reply receiver.
pub mod receiver;
/// Echo responder.
pub mod reflector;
/// Target registry and resolution.
pub mod registry;
/// Prober.
pub mod sender;
/// Per-target statistics and aggregation.
pub mod stats;
/// Monotonic clock.
pub mod time;
