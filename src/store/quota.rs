//! Payload size accounting against the configured storage ceiling.

use serde::Serialize;

pub const BYTES_PER_MB: u64 = 1024 * 1024;

/// Default ceiling for the dataset slot.
pub const DEFAULT_CEILING_BYTES: u64 = 50 * BYTES_PER_MB;

/// Size of an encoded payload in bytes (utf-8 length, not char count).
pub fn measure(payload: &str) -> u64 {
    payload.len() as u64
}

pub fn fits(size: u64, ceiling: u64) -> bool {
    size <= ceiling
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StorageQuota {
    pub used_bytes: u64,
    pub ceiling_bytes: u64,
    pub over_quota: bool,
}

impl StorageQuota {
    pub fn new(used_bytes: u64, ceiling_bytes: u64) -> Self {
        StorageQuota {
            used_bytes,
            ceiling_bytes,
            over_quota: !fits(used_bytes, ceiling_bytes),
        }
    }

    pub fn usage_percent(&self) -> f64 {
        if self.ceiling_bytes == 0 {
            return if self.used_bytes == 0 { 0.0 } else { 100.0 };
        }
        self.used_bytes as f64 / self.ceiling_bytes as f64 * 100.0
    }

    /// A short hint for the user once usage gets high, None while comfortable.
    pub fn recommendation(&self) -> Option<&'static str> {
        let usage = self.usage_percent();
        if self.over_quota {
            Some("stored dataset is over the storage ceiling; narrow the search before saving again")
        } else if usage > 90.0 {
            Some("storage is nearly full; the next larger search may not fit")
        } else if usage > 75.0 {
            Some("storage usage is high")
        } else {
            None
        }
    }
}
