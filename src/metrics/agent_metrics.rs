//! Operational counters of the agent itself.
//!
//! These complement the per-target ping figures and are rendered after them
//! on the same endpoint. Without an installed recorder they are no-ops.

use ::metrics::counter;

/// Records a probe handed to the socket.
pub fn record_probe_sent() {
    counter!("ping_probes_sent_total").increment(1);
}

/// Records a probe the socket refused to send.
pub fn record_send_error() {
    counter!("ping_send_errors_total").increment(1);
}

/// Records a reply matched to a target.
pub fn record_reply() {
    counter!("ping_replies_total").increment(1);
}

/// Records a datagram discarded by the reply receiver.
///
/// # Arguments
/// * `reason` - `"unknown_sender"` or `"malformed"`
pub fn record_reply_dropped(reason: &'static str) {
    counter!("ping_replies_dropped_total", "reason" => reason).increment(1);
}

/// Records a datagram echoed back to a peer.
pub fn record_echo() {
    counter!("ping_echo_packets_total").increment(1);
}
