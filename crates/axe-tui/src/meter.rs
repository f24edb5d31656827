//! Throughput accounting for the status line

use std::time::{Duration, Instant};

const SI_UNITS: [&str; 6] = ["B", "kB", "MB", "GB", "TB", "PB"];

/// Format a byte count with SI (powers of 1000) units: two decimals below
/// 10, one below 100, none above. Values past petabytes stay in `PB`.
pub fn humanize_bytes(size: f64) -> String {
    let mut value = if size.is_finite() { size.max(0.0) } else { 0.0 };
    let mut unit = 0;
    while value >= 1000.0 && unit < SI_UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }

    let precision = if value < 10.0 {
        2
    } else if value < 100.0 {
        1
    } else {
        0
    };
    format!("{value:.precision$}{}", SI_UNITS[unit])
}

/// Counts bytes and reports the rate since the previous report
#[derive(Debug)]
pub struct Throughput {
    total: u64,
    reported: u64,
    since: Instant,
}

impl Default for Throughput {
    fn default() -> Self {
        Self::new(Instant::now())
    }
}

impl Throughput {
    pub fn new(now: Instant) -> Self {
        Self {
            total: 0,
            reported: 0,
            since: now,
        }
    }

    pub fn add(&mut self, bytes: usize) {
        self.total = self.total.saturating_add(bytes as u64);
    }

    /// Bytes per `per` since the last call, then start a new window
    pub fn rate(&mut self, now: Instant, per: Duration) -> f64 {
        let elapsed = now.saturating_duration_since(self.since);
        let delta = self.total - self.reported;

        self.reported = self.total;
        self.since = now;

        if elapsed.is_zero() {
            return 0.0;
        }
        delta as f64 * per.as_secs_f64() / elapsed.as_secs_f64()
    }
}
