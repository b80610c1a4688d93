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

//! URL-keyed cache of pre-warmed radar images.
//!
//! Entries are only ever added. The owner clears the whole cache when the
//! card is reconfigured; otherwise growth is bounded by the slot count times
//! the resolutions the user has looked at, plus one entry per refresh.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::debug;

use crate::config::Resolution;
use crate::prefetch::{ImageHandle, Prefetcher};
use crate::timeline::TimeWindowIndexer;

/// Image cache with insertion-ordered URLs.
pub struct ImageCache {
    entries: HashMap<String, ImageHandle>,
    order: Vec<String>,
    prefetcher: Arc<dyn Prefetcher>,
}

impl std::fmt::Debug for ImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageCache")
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl ImageCache {
    #[must_use]
    pub fn new(prefetcher: Arc<dyn Prefetcher>) -> Self {
        Self {
            entries: HashMap::new(),
            order: Vec::new(),
            prefetcher,
        }
    }

    /// Warm the `count` newest slots for `resolution`, oldest first.
    ///
    /// Returns how many URLs were new. URLs already cached are left alone,
    /// so repeated calls are cheap.
    pub fn preload(&mut self, indexer: &TimeWindowIndexer, resolution: Resolution, count: u32) -> usize {
        self.preload_at(indexer, indexer.now(), resolution, count)
    }

    /// [`Self::preload`] for a given `now`.
    pub fn preload_at(
        &mut self,
        indexer: &TimeWindowIndexer,
        now: DateTime<Utc>,
        resolution: Resolution,
        count: u32,
    ) -> usize {
        if count == 0 {
            return 0;
        }

        let oldest = -(i64::from(count) - 1);
        let mut added = 0;
        for offset in oldest..=0 {
            let url = indexer.image_url(resolution, indexer.time_at_offset_at(now, offset));
            if self.entries.contains_key(&url) {
                continue;
            }

            let handle = ImageHandle::new(url.clone());
            self.entries.insert(url.clone(), handle.clone());
            self.order.push(url);
            self.prefetcher.prefetch(handle);
            added += 1;
        }

        if added > 0 {
            debug!(
                "Preloaded {} new {} images ({} cached)",
                added,
                resolution,
                self.entries.len()
            );
        }
        added
    }

    /// URL to display for `resolution` at `t`.
    ///
    /// Falls back to the computed URL on a miss; the cache never decides
    /// whether an image can be shown.
    #[must_use]
    pub fn lookup(&self, indexer: &TimeWindowIndexer, resolution: Resolution, t: DateTime<Utc>) -> String {
        let url = indexer.image_url(resolution, t);
        match self.entries.get(&url) {
            Some(handle) => handle.url().to_string(),
            None => url,
        }
    }

    /// Cached handle for `resolution` at `t`, if warmed.
    #[must_use]
    pub fn handle_for(
        &self,
        indexer: &TimeWindowIndexer,
        resolution: Resolution,
        t: DateTime<Utc>,
    ) -> Option<&ImageHandle> {
        self.entries.get(&indexer.image_url(resolution, t))
    }

    #[must_use]
    pub fn get(&self, url: &str) -> Option<&ImageHandle> {
        self.entries.get(url)
    }

    #[must_use]
    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    /// Cached URLs in insertion order.
    #[must_use]
    pub fn urls(&self) -> &[String] {
        &self.order
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry. In-flight prefetches finish into orphaned handles.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::prefetch::{LoadStatus, NoopPrefetcher};
    use crate::timeline::WindowSettings;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPrefetcher {
        urls: Mutex<Vec<String>>,
    }

    impl Prefetcher for RecordingPrefetcher {
        fn prefetch(&self, handle: ImageHandle) {
            self.urls.lock().unwrap().push(handle.url().to_string());
        }
    }

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn indexer_at(now: &str) -> (Arc<ManualClock>, TimeWindowIndexer) {
        let clock = Arc::new(ManualClock::new(at(now)));
        let indexer = TimeWindowIndexer::new(clock.clone(), WindowSettings::default()).unwrap();
        (clock, indexer)
    }

    #[test]
    fn test_preload_five_slots() {
        let (_clock, indexer) = indexer_at("2024-01-01T01:00:00Z");
        let mut cache = ImageCache::new(Arc::new(NoopPrefetcher));

        assert_eq!(cache.preload(&indexer, Resolution::Medium, 5), 5);
        assert_eq!(cache.len(), 5);
        assert_eq!(
            cache.urls(),
            [
                "https://www.hko.gov.hk/wxinfo/radars/rad_128_png/2d128nradar_202401010830.jpg",
                "https://www.hko.gov.hk/wxinfo/radars/rad_128_png/2d128nradar_202401010836.jpg",
                "https://www.hko.gov.hk/wxinfo/radars/rad_128_png/2d128nradar_202401010842.jpg",
                "https://www.hko.gov.hk/wxinfo/radars/rad_128_png/2d128nradar_202401010848.jpg",
                "https://www.hko.gov.hk/wxinfo/radars/rad_128_png/2d128nradar_202401010854.jpg",
            ]
        );
    }

    #[test]
    fn test_preload_is_idempotent() {
        let (_clock, indexer) = indexer_at("2024-01-01T01:00:00Z");
        let prefetcher = Arc::new(RecordingPrefetcher::default());
        let mut cache = ImageCache::new(prefetcher.clone());

        cache.preload(&indexer, Resolution::Medium, 15);
        assert_eq!(cache.preload(&indexer, Resolution::Medium, 15), 0);
        assert_eq!(cache.len(), 15);
        assert_eq!(prefetcher.urls.lock().unwrap().len(), 15);
    }

    #[test]
    fn test_preload_after_new_slot_adds_one() {
        let (clock, indexer) = indexer_at("2024-01-01T01:00:00Z");
        let mut cache = ImageCache::new(Arc::new(NoopPrefetcher));
        cache.preload(&indexer, Resolution::Medium, 15);

        clock.set(at("2024-01-01T01:05:00Z"));
        assert_eq!(cache.preload(&indexer, Resolution::Medium, 15), 1);
        assert_eq!(cache.len(), 16);
        assert!(cache.urls()[15].ends_with("2d128nradar_202401010900.jpg"));
    }

    #[test]
    fn test_resolution_change_adds_separate_entries() {
        let (_clock, indexer) = indexer_at("2024-01-01T01:00:00Z");
        let mut cache = ImageCache::new(Arc::new(NoopPrefetcher));
        cache.preload(&indexer, Resolution::Medium, 5);
        cache.preload(&indexer, Resolution::Large, 5);
        assert_eq!(cache.len(), 10);
    }

    #[test]
    fn test_preload_zero_is_noop() {
        let (_clock, indexer) = indexer_at("2024-01-01T01:00:00Z");
        let mut cache = ImageCache::new(Arc::new(NoopPrefetcher));
        assert_eq!(cache.preload(&indexer, Resolution::Medium, 0), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_lookup_hit_and_miss() {
        let (_clock, indexer) = indexer_at("2024-01-01T01:00:00Z");
        let mut cache = ImageCache::new(Arc::new(NoopPrefetcher));
        cache.preload(&indexer, Resolution::Medium, 15);

        assert_eq!(
            cache.lookup(&indexer, Resolution::Medium, at("2024-01-01T00:54:00Z")),
            "https://www.hko.gov.hk/wxinfo/radars/rad_128_png/2d128nradar_202401010854.jpg"
        );
        // Not cached, still a valid URL
        assert_eq!(
            cache.lookup(&indexer, Resolution::Medium, at("2024-01-01T02:00:00Z")),
            "https://www.hko.gov.hk/wxinfo/radars/rad_128_png/2d128nradar_202401011000.jpg"
        );
        assert!(cache
            .handle_for(&indexer, Resolution::Medium, at("2024-01-01T02:00:00Z"))
            .is_none());

        let cached = "https://www.hko.gov.hk/wxinfo/radars/rad_128_png/2d128nradar_202401010854.jpg";
        assert!(cache.contains(cached));
        assert_eq!(cache.get(cached).unwrap().status(), LoadStatus::Pending);
        assert!(!cache.contains(&indexer.image_url(Resolution::Large, at("2024-01-01T00:54:00Z"))));
        assert!(cache.get("https://example.invalid/radar.jpg").is_none());
    }

    #[test]
    fn test_failed_handle_still_looked_up() {
        let (_clock, indexer) = indexer_at("2024-01-01T01:00:00Z");
        let mut cache = ImageCache::new(Arc::new(NoopPrefetcher));
        cache.preload(&indexer, Resolution::Small, 1);

        let t = at("2024-01-01T00:54:00Z");
        cache
            .handle_for(&indexer, Resolution::Small, t)
            .unwrap()
            .set_status(LoadStatus::Failed("HTTP error: 404 Not Found".to_string()));
        assert_eq!(cache.lookup(&indexer, Resolution::Small, t), indexer.image_url(Resolution::Small, t));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear() {
        let (_clock, indexer) = indexer_at("2024-01-01T01:00:00Z");
        let mut cache = ImageCache::new(Arc::new(NoopPrefetcher));
        cache.preload(&indexer, Resolution::Medium, 5);
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.urls().is_empty());
    }
}
