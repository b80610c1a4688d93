// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Time-window indexing for radar image slots.
//!
//! Radar images are published on a fixed slot grid (every six minutes for
//! HKO) and appear upstream a few minutes after their nominal time. The
//! indexer turns a slot offset relative to the latest available image into
//! an absolute timestamp and back, and builds the image URL for a slot.
//!
//! Each operation comes in two forms: one that samples the [`Clock`] and one
//! suffixed `_at` that takes `now` explicitly. Code that needs several
//! answers for the same logical instant samples once and uses the `_at`
//! forms.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};

use crate::clock::Clock;
use crate::config::Resolution;
use crate::error::RadarError;

/// Base URL of the HKO radar image archive.
pub const DEFAULT_BASE_URL: &str = "https://www.hko.gov.hk/wxinfo/radars";

/// Spacing between published radar images.
pub const DEFAULT_SLOT_INTERVAL_MS: i64 = 360_000; // 6 minutes

/// Delay between a slot's nominal time and its image appearing upstream.
pub const DEFAULT_FRESHNESS_OFFSET_MS: i64 = 240_000; // 4 minutes

/// Calendar the image source names its files in (Hong Kong, UTC+8).
pub const DEFAULT_SOURCE_UTC_OFFSET_SECS: i32 = 8 * 3600;

/// Parameters of the slot grid and the image source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSettings {
    /// Slot spacing in milliseconds.
    pub slot_interval_ms: i64,
    /// Publication delay in milliseconds.
    pub freshness_offset_ms: i64,
    /// UTC offset of the calendar used in file names and labels.
    pub source_utc_offset_secs: i32,
    /// Image archive base URL, without trailing slash.
    pub base_url: String,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            slot_interval_ms: DEFAULT_SLOT_INTERVAL_MS,
            freshness_offset_ms: DEFAULT_FRESHNESS_OFFSET_MS,
            source_utc_offset_secs: DEFAULT_SOURCE_UTC_OFFSET_SECS,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Converts between slot offsets and timestamps.
///
/// Offset `0` is the latest slot expected to exist upstream; negative
/// offsets go back in time.
pub struct TimeWindowIndexer {
    clock: Arc<dyn Clock>,
    slot_interval_ms: i64,
    freshness_offset_ms: i64,
    source_tz: FixedOffset,
    base_url: String,
}

impl std::fmt::Debug for TimeWindowIndexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeWindowIndexer")
            .field("slot_interval_ms", &self.slot_interval_ms)
            .field("freshness_offset_ms", &self.freshness_offset_ms)
            .field("source_tz", &self.source_tz)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl TimeWindowIndexer {
    /// Create an indexer reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>, settings: WindowSettings) -> Result<Self, RadarError> {
        if settings.slot_interval_ms <= 0 {
            return Err(RadarError::InvalidWindow(format!(
                "slot interval must be positive, got {} ms",
                settings.slot_interval_ms
            )));
        }
        if settings.freshness_offset_ms < 0 {
            return Err(RadarError::InvalidWindow(format!(
                "freshness offset must not be negative, got {} ms",
                settings.freshness_offset_ms
            )));
        }
        let source_tz = FixedOffset::east_opt(settings.source_utc_offset_secs).ok_or_else(|| {
            RadarError::InvalidWindow(format!(
                "UTC offset out of range: {} s",
                settings.source_utc_offset_secs
            ))
        })?;

        Ok(Self {
            clock,
            slot_interval_ms: settings.slot_interval_ms,
            freshness_offset_ms: settings.freshness_offset_ms,
            source_tz,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Sample the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    #[must_use]
    pub fn slot_interval_ms(&self) -> i64 {
        self.slot_interval_ms
    }

    #[must_use]
    pub fn freshness_offset_ms(&self) -> i64 {
        self.freshness_offset_ms
    }

    /// Timestamp of the slot `offset` steps from the latest available one.
    ///
    /// Offsets past the representable range saturate at the earliest or
    /// latest representable instant.
    #[must_use]
    pub fn time_at_offset(&self, offset: i64) -> DateTime<Utc> {
        self.time_at_offset_at(self.now(), offset)
    }

    /// [`Self::time_at_offset`] for a given `now`.
    #[must_use]
    pub fn time_at_offset_at(&self, now: DateTime<Utc>, offset: i64) -> DateTime<Utc> {
        let latest_slot =
            (now.timestamp_millis() - self.freshness_offset_ms).div_euclid(self.slot_interval_ms);
        let millis = latest_slot
            .saturating_add(offset)
            .saturating_mul(self.slot_interval_ms);
        DateTime::from_timestamp_millis(millis).unwrap_or(if millis < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        })
    }

    /// Latest timestamp for which an image is expected to exist.
    #[must_use]
    pub fn latest_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.time_at_offset_at(now, 0)
    }

    /// Slot offset of `t` relative to the latest available slot.
    ///
    /// Timestamps between slot boundaries round down.
    #[must_use]
    pub fn offset_of_time(&self, t: DateTime<Utc>) -> i64 {
        self.offset_of_time_at(self.now(), t)
    }

    /// [`Self::offset_of_time`] for a given `now`.
    #[must_use]
    pub fn offset_of_time_at(&self, now: DateTime<Utc>, t: DateTime<Utc>) -> i64 {
        self.offset_from(self.latest_at(now), t)
    }

    /// Slot offset of `t` relative to a recorded `latest` slot.
    #[must_use]
    pub fn offset_from(&self, latest: DateTime<Utc>, t: DateTime<Utc>) -> i64 {
        (t.timestamp_millis() - latest.timestamp_millis()).div_euclid(self.slot_interval_ms)
    }

    /// `YYYYMMDDHHmm` in the image source's calendar.
    #[must_use]
    pub fn format_for_url(&self, t: DateTime<Utc>) -> String {
        t.with_timezone(&self.source_tz)
            .format("%Y%m%d%H%M")
            .to_string()
    }

    /// URL of the radar image for `resolution` at `t`.
    #[must_use]
    pub fn image_url(&self, resolution: Resolution, t: DateTime<Utc>) -> String {
        let size = resolution.as_str();
        format!(
            "{}/rad_{size}_png/2d{size}nradar_{}.jpg",
            self.base_url,
            self.format_for_url(t)
        )
    }

    /// Display label such as `1/1/2024, 8:54:00 AM`.
    #[must_use]
    pub fn display_label(&self, t: DateTime<Utc>) -> String {
        t.with_timezone(&self.source_tz)
            .format("%-m/%-d/%Y, %-I:%M:%S %p")
            .to_string()
    }
}
