use std::time::Duration;

use chrono::{DateTime, Utc};

/// How far back the first log read of a container reaches
pub const DEFAULT_LOOKBACK: Duration = Duration::from_secs(5 * 60);

/// How often a namespace watch re-delivers its full snapshot
pub const DEFAULT_RESYNC: Duration = Duration::from_secs(3 * 60);

/// Fixed pause between connection attempts of a tailer
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(5);

/// Capacity of the shared output channel
pub const DEFAULT_BUFFER: usize = 1000;

/// Tunables of the tailing core
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TailSettings {
    /// Window before "now" that the first read of each container covers
    pub lookback: Duration,

    /// Snapshot re-delivery period; zero disables resync
    pub resync: Duration,

    /// Pause after a throttled, failed or ended stream
    pub retry_interval: Duration,

    /// Output channel capacity
    pub buffer: usize,
}

impl Default for TailSettings {
    fn default() -> Self {
        Self {
            lookback: DEFAULT_LOOKBACK,
            resync: DEFAULT_RESYNC,
            retry_interval: DEFAULT_RETRY_INTERVAL,
            buffer: DEFAULT_BUFFER,
        }
    }
}

impl TailSettings {
    /// Replace zero values that would make the core misbehave
    pub fn normalized(mut self) -> Self {
        if self.lookback.is_zero() {
            self.lookback = DEFAULT_LOOKBACK;
        }
        if self.retry_interval.is_zero() {
            self.retry_interval = DEFAULT_RETRY_INTERVAL;
        }
        if self.buffer == 0 {
            self.buffer = DEFAULT_BUFFER;
        }
        self
    }

    /// Starting bookmark for a container that has never been read
    pub fn initial_since(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let lookback = chrono::Duration::from_std(self.lookback)
            .unwrap_or_else(|_| chrono::Duration::minutes(5));
        now.checked_sub_signed(lookback)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}
