//! Timestamp helpers
//!
//! Wall-clock nanosecond timestamps guarded against going backwards, so that
//! staleness arithmetic (`now - last_data`) never underflows when the system
//! clock is adjusted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static LAST_NANOS: AtomicU64 = AtomicU64::new(0);

/// Current time in nanoseconds since the Unix epoch, monotonically
/// non-decreasing across calls within this process.
pub fn now_nanos() -> u64 {
    let raw = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);

    let prev = LAST_NANOS.fetch_max(raw, Ordering::Relaxed);
    raw.max(prev)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_nanos_never_decreases() {
        let mut last = 0u64;
        for _ in 0..1000 {
            let now = now_nanos();
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn now_nanos_is_plausible() {
        // After 2020-01-01 and before 2100
        let now = now_nanos();
        assert!(now > 1_577_836_800_000_000_000);
        assert!(now < 4_102_444_800_000_000_000);
    }
}
