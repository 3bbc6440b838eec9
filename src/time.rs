use std::sync::OnceLock;
use std::time::Instant;

static ANCHOR: OnceLock<Instant> = OnceLock::new();

/// Returns monotonic nanoseconds elapsed since the process-wide anchor.
///
/// The anchor is fixed on first use. Values are only meaningful within one
/// process, which is all the probe protocol needs since peers echo our own
/// timestamps back to us.
///
/// ```
/// use prometheus_ping::time::monotonic_ns;
/// let a = monotonic_ns();
/// let b = monotonic_ns();
/// assert!(b >= a);
/// ```
pub fn monotonic_ns() -> u64 {
    let anchor = ANCHOR.get_or_init(Instant::now);
    anchor.elapsed().as_nanos() as u64
}

/// Elapsed nanoseconds between a timestamp read off the wire and `now`.
///
/// A corrupt or foreign timestamp yields a meaningless, possibly negative,
/// sample instead of a panic.
pub fn elapsed_ns(now: u64, then: u64) -> i64 {
    now.wrapping_sub(then) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_monotonic_ns_advances() {
        let a = monotonic_ns();
        std::thread::sleep(Duration::from_millis(2));
        let b = monotonic_ns();
        assert!(b - a >= 2_000_000);
    }

    #[test]
    fn test_elapsed_ns() {
        assert_eq!(elapsed_ns(1_500, 1_000), 500);
        assert_eq!(elapsed_ns(1_000, 1_000), 0);
    }

    #[test]
    fn test_elapsed_ns_from_future_timestamp() {
        assert_eq!(elapsed_ns(1_000, 1_500), -500);
    }
}
