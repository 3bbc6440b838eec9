//! Prometheus text rendering of the per-target figures.

use std::fmt::Write;

use crate::stats::TargetSnapshot;

pub const PACKET_LOSS: &str = "ping_packet_loss";
pub const LATENCY_AVERAGE: &str = "ping_latency_average_30s";

/// Renders loss and average latency families for every snapshot.
///
/// Loss is exposed as a gauge: it is counter-like but can decrease and go
/// negative. Targets without latency samples have no latency line at all.
pub fn render(snapshots: &[TargetSnapshot]) -> String {
    let mut out = String::new();

    header(&mut out, PACKET_LOSS, "Lost packets");
    for s in snapshots {
        sample(&mut out, PACKET_LOSS, s, s.packet_loss);
    }

    header(
        &mut out,
        LATENCY_AVERAGE,
        "Average round-trip latency over the last 30s",
    );
    for s in snapshots {
        if let Some(latency) = s.average_latency_secs {
            sample(&mut out, LATENCY_AVERAGE, s, latency);
        }
    }

    out
}

fn header(out: &mut String, name: &str, help: &str) {
    let _ = writeln!(out, "# HELP {} {}", name, help);
    let _ = writeln!(out, "# TYPE {} gauge", name);
}

fn sample(out: &mut String, name: &str, s: &TargetSnapshot, value: impl std::fmt::Display) {
    let _ = writeln!(
        out,
        "{}{{source=\"{}\",target=\"{}\"}} {}",
        name,
        escape_label(&s.source),
        escape_label(&s.target),
        value
    );
}

fn escape_label(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(target: &str, loss: i64, latency: Option<f64>) -> TargetSnapshot {
        TargetSnapshot {
            source: "paris".to_string(),
            target: target.to_string(),
            sent: 0,
            received: 0,
            in_flight: 0,
            packet_loss: loss,
            average_latency_secs: latency,
        }
    }

    #[test]
    fn test_render() {
        let text = render(&[
            snapshot("london:5000", 3, Some(0.0125)),
            snapshot("tokyo:5000", -1, None),
        ]);
        let expected = "\
# HELP ping_packet_loss Lost packets
# TYPE ping_packet_loss gauge
ping_packet_loss{source=\"paris\",target=\"london:5000\"} 3
ping_packet_loss{source=\"paris\",target=\"tokyo:5000\"} -1
# HELP ping_latency_average_30s Average round-trip latency over the last 30s
# TYPE ping_latency_average_30s gauge
ping_latency_average_30s{source=\"paris\",target=\"london:5000\"} 0.0125
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_render_no_targets() {
        let text = render(&[]);
        assert_eq!(text.lines().count(), 4);
        assert!(text.lines().all(|l| l.starts_with('#')));
    }

    #[test]
    fn test_escape_label() {
        assert_eq!(escape_label("plain"), "plain");
        assert_eq!(escape_label("a\"b"), "a\\\"b");
        assert_eq!(escape_label("a\\b"), "a\\\\b");
        assert_eq!(escape_label("a\nb"), "a\\nb");
    }
}
