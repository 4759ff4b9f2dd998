//! Timestamps for archive names.
//!
//! Archives are named `<log>.<ns>`, where `<ns>` is nanoseconds since the
//! Unix epoch. Two rotations inside one clock tick, or a wall clock stepping
//! backwards, would otherwise hand out a name that is already taken, so the
//! clock never repeats itself: `next = max(system_time_ns, last + 1)`.

use std::time::{SystemTime, UNIX_EPOCH};

/// Source of strictly increasing rotation timestamps.
#[derive(Debug, Clone, Default)]
pub struct RotationClock {
    last: u64,
}

impl RotationClock {
    /// A clock whose next value is greater than `last`.
    ///
    /// Seeded from the newest archive on disk so that a restarted process
    /// cannot reuse a name even if the wall clock moved backwards.
    #[must_use]
    pub const fn starting_after(last: u64) -> Self {
        Self { last }
    }

    /// Next timestamp: `max(system_time_ns, last + 1)`.
    pub fn next_timestamp(&mut self) -> u64 {
        let next = std::cmp::max(system_time_ns(), self.last.saturating_add(1));
        self.last = next;
        next
    }
}

/// Current system time in nanoseconds since the Unix epoch.
#[allow(clippy::cast_possible_truncation)]
#[must_use]
pub fn system_time_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_strictly_monotonic() {
        let mut clock = RotationClock::default();
        let mut prev = clock.next_timestamp();
        for _ in 0..1_000 {
            let next = clock.next_timestamp();
            assert!(next > prev, "{next} <= {prev}");
            prev = next;
        }
    }

    #[test]
    fn clock_never_goes_backward_past_seed() {
        let far_future = system_time_ns() + 3_600_000_000_000;
        let mut clock = RotationClock::starting_after(far_future);
        assert_eq!(clock.next_timestamp(), far_future + 1);
        assert_eq!(clock.next_timestamp(), far_future + 2);
    }

    #[test]
    fn system_time_ns_is_reasonable() {
        // 2020-01-01T00:00:00Z in nanoseconds.
        let y2020 = 1_577_836_800_000_000_000_u64;
        assert!(system_time_ns() > y2020);
    }
}
