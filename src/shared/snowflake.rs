//! Snowflake ID Generator
//!
//! Twitter-style unique ID generation. IDs handed out by one generator are
//! strictly increasing, which is what gives messages their per-channel order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};

/// Custom epoch (2015-01-01T00:00:00.000Z)
pub const DEFAULT_EPOCH: u64 = 1420070400000;

const MACHINE_BITS: u64 = 10;
const SEQUENCE_BITS: u64 = 12;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;
const TIMESTAMP_SHIFT: u64 = MACHINE_BITS + SEQUENCE_BITS;

/// Snowflake ID generator
///
/// Layout: 41 bits of milliseconds since the epoch, 10 bits of machine id,
/// 12 bits of sequence. The last issued `(timestamp, sequence)` pair lives in
/// a single atomic so concurrent callers can never produce equal or
/// decreasing IDs.
pub struct SnowflakeGenerator {
    machine_id: u64,
    epoch: u64,
    /// `timestamp << SEQUENCE_BITS | sequence` of the last issued ID
    last: AtomicU64,
}

impl SnowflakeGenerator {
    /// Create a new snowflake generator
    pub fn new(machine_id: u16, epoch: u64) -> Self {
        Self {
            machine_id: u64::from(machine_id) & ((1 << MACHINE_BITS) - 1),
            epoch,
            last: AtomicU64::new(0),
        }
    }

    /// Generate a new snowflake ID
    pub fn generate(&self) -> i64 {
        let mut current = self.last.load(Ordering::Acquire);
        loop {
            let now = self.current_timestamp();
            let last_ts = current >> SEQUENCE_BITS;
            let last_seq = current & SEQUENCE_MASK;

            // Clock going backwards or sequence exhaustion both borrow from
            // the next millisecond instead of repeating an ID.
            let next = if now > last_ts {
                now << SEQUENCE_BITS
            } else if last_seq < SEQUENCE_MASK {
                current + 1
            } else {
                (last_ts + 1) << SEQUENCE_BITS
            };

            match self
                .last
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return self.compose(next),
                Err(actual) => current = actual,
            }
        }
    }

    /// Wall-clock time encoded in an ID from this generator
    ///
    /// Derived from the ID bits, so times taken this way never run backwards
    /// relative to ID order.
    pub fn timestamp_of(&self, id: i64) -> DateTime<Utc> {
        let millis = extract_timestamp(id, self.epoch);
        i64::try_from(millis)
            .ok()
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or_default()
    }

    fn compose(&self, packed: u64) -> i64 {
        let timestamp = packed >> SEQUENCE_BITS;
        let sequence = packed & SEQUENCE_MASK;
        ((timestamp << TIMESTAMP_SHIFT) | (self.machine_id << SEQUENCE_BITS) | sequence) as i64
    }

    /// Milliseconds since the generator epoch
    fn current_timestamp(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        now.saturating_sub(self.epoch)
    }
}

/// Extract the unix timestamp (ms) from a snowflake ID
pub fn extract_timestamp(id: i64, epoch: u64) -> u64 {
    ((id as u64) >> TIMESTAMP_SHIFT) + epoch
}
