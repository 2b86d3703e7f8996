//! Running allocation counters.

use serde::Serialize;

const MIB: f64 = 1024.0 * 1024.0;

/// Allocation counters. Amounts are payload bytes, excluding chunk headers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AllocStats {
    /// Chunks currently live.
    pub current_count: usize,
    /// Payload bytes currently live.
    pub current_amount: usize,
    /// Chunks ever allocated.
    pub cumulative_count: u64,
    /// Payload bytes ever allocated.
    pub cumulative_amount: u64,
    /// Highest `current_count` seen.
    pub max_count: usize,
    /// Highest `current_amount` seen.
    pub max_amount: usize,
}

impl AllocStats {
    /// All counters at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            current_count: 0,
            current_amount: 0,
            cumulative_count: 0,
            cumulative_amount: 0,
            max_count: 0,
            max_amount: 0,
        }
    }

    #[inline]
    pub(crate) fn record_alloc(&mut self, size: usize) {
        self.current_count += 1;
        self.current_amount += size;
        self.cumulative_count += 1;
        self.cumulative_amount += size as u64;
        self.max_count = self.max_count.max(self.current_count);
        self.max_amount = self.max_amount.max(self.current_amount);
    }

    #[inline]
    pub(crate) fn record_release(&mut self, size: usize) {
        debug_assert!(self.current_count > 0 && self.current_amount >= size);
        self.current_count -= 1;
        self.current_amount -= size;
    }

    /// `current_amount` in MiB.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn current_mib(&self) -> f64 {
        self.current_amount as f64 / MIB
    }

    /// `max_amount` in MiB.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn max_mib(&self) -> f64 {
        self.max_amount as f64 / MIB
    }

    /// `cumulative_amount` in MiB.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn cumulative_mib(&self) -> f64 {
        self.cumulative_amount as f64 / MIB
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maxima_track_peaks() {
        let mut stats = AllocStats::new();
        stats.record_alloc(100);
        stats.record_alloc(50);
        stats.record_release(100);
        stats.record_alloc(10);

        assert_eq!(stats.current_count, 2);
        assert_eq!(stats.current_amount, 60);
        assert_eq!(stats.max_count, 2);
        assert_eq!(stats.max_amount, 150);
        assert_eq!(stats.cumulative_count, 3);
        assert_eq!(stats.cumulative_amount, 160);
    }

    #[test]
    fn test_mib_conversion() {
        let mut stats = AllocStats::new();
        stats.record_alloc(3 * 1024 * 1024);
        assert!((stats.current_mib() - 3.0).abs() < f64::EPSILON);
        stats.record_release(3 * 1024 * 1024);
        assert!(stats.current_mib().abs() < f64::EPSILON);
        assert!((stats.max_mib() - 3.0).abs() < f64::EPSILON);
    }
}
