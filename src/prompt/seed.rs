//! Deterministic seed derivation from wall-clock time slots
//!
//! A slot is `time_slot_minutes` wide within the hour; every invocation in
//! the same slot with the same monitor discriminator derives the same seed,
//! so external timers can re-run the binary without changing the wallpaper.

use crate::io::error::{config_invalid, Result};
use chrono::{NaiveDateTime, Timelike};
use md5::{Digest, Md5};

/// Derives reproducible 64-bit seeds from an instant and a monitor name
#[derive(Debug, Clone, Copy)]
pub struct SeedSource {
    slot_minutes: u32,
    use_monitor_seed: bool,
}

impl SeedSource {
    /// Create a seed source with a validated slot width
    ///
    /// # Errors
    ///
    /// Returns `ConfigInvalid` when the slot width is outside 1..=1440.
    pub fn new(slot_minutes: u32, use_monitor_seed: bool) -> Result<Self> {
        if !(1..=1440).contains(&slot_minutes) {
            return Err(config_invalid(
                "prompt.time_slot_minutes",
                format!("must be between 1 and 1440 minutes, got {slot_minutes}"),
            ));
        }
        Ok(Self {
            slot_minutes,
            use_monitor_seed,
        })
    }

    /// Slot width in minutes
    pub const fn slot_minutes(&self) -> u32 {
        self.slot_minutes
    }

    /// Whether the monitor name participates in the seed
    pub const fn uses_monitor_seed(&self) -> bool {
        self.use_monitor_seed
    }

    /// The slot key string hashed into the seed
    ///
    /// Format: `YYYY-MM-DD-HH-{slot}-{discriminator}` where the slot index is
    /// the minute of the hour divided by the slot width, and the
    /// discriminator is the monitor name when monitor seeding is enabled.
    pub fn slot_key(&self, now: NaiveDateTime, monitor: Option<&str>) -> String {
        let slot = now.minute() / self.slot_minutes;
        let discriminator = if self.use_monitor_seed {
            monitor.unwrap_or("")
        } else {
            ""
        };
        format!("{}-{slot}-{discriminator}", now.format("%Y-%m-%d-%H"))
    }

    /// Derive the seed for an instant and monitor
    ///
    /// MD5 of the slot key, first eight hex characters read as an unsigned
    /// 32-bit integer and zero-extended to 64 bits.
    pub fn slot_seed(&self, now: NaiveDateTime, monitor: Option<&str>) -> u64 {
        let key = self.slot_key(now, monitor);
        seed_from_key(&key)
    }
}

/// Hash a slot key string into its 64-bit seed
pub fn seed_from_key(key: &str) -> u64 {
    let digest = Md5::digest(key.as_bytes());
    let head = [digest[0], digest[1], digest[2], digest[3]];
    u64::from(u32::from_be_bytes(head))
}
