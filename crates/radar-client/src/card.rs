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

//! The radar card controller.
//!
//! [`RadarCard`] wires the indexer, cache and refresh scheduler together and
//! exposes the handlers a UI layer calls (`apply_config`, slider input, size
//! buttons, attach/detach) plus a [`CardView`] snapshot to paint from.
//!
//! All state sits behind one mutex per card. A refresh wake-up holds it for
//! the whole step (sample the clock, rebase the selection, preload, re-arm),
//! so UI handlers never observe a half-applied refresh.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::cache::ImageCache;
use crate::clock::Clock;
use crate::config::{CardConfig, Resolution};
use crate::error::RadarError;
use crate::prefetch::{LoadStatus, Prefetcher};
use crate::registry::CardDescriptor;
use crate::scheduler::{rebase_selection, RefreshScheduler, RefreshSettings, RefreshState};
use crate::timeline::{TimeWindowIndexer, WindowSettings};
use crate::timer::{Timer, TimerHandle};

/// Element name of the card.
pub const CARD_TYPE: &str = "hko-radar-card";

/// Element name of the card's config editor.
pub const EDITOR_TYPE: &str = "hko-radar-card-editor";

/// Height hint reported to the dashboard layout, in rows.
pub const CARD_SIZE: u32 = 3;

/// Settings that are fixed for the lifetime of a card.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardOptions {
    pub window: WindowSettings,
    pub refresh: RefreshSettings,
}

/// Everything a renderer needs to paint the card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardView {
    /// URL for the image element.
    pub image_url: String,
    /// Load status of the selected image, when it has been prefetched.
    pub image_status: Option<LoadStatus>,
    pub selected: DateTime<Utc>,
    /// Locale-style label of the selected time.
    pub selected_label: String,
    pub latest: DateTime<Utc>,
    pub resolution: Resolution,
    pub slider_min: i64,
    pub slider_max: i64,
    /// Position of `selected` in the window ending at `latest`.
    pub slider_value: i64,
    pub auto_refresh: bool,
    pub refresh_state: RefreshState,
}

#[derive(Debug, Clone)]
struct Selection {
    config: CardConfig,
    resolution: Resolution,
    latest: DateTime<Utc>,
    selected: DateTime<Utc>,
}

struct CardState {
    indexer: TimeWindowIndexer,
    cache: ImageCache,
    scheduler: RefreshScheduler,
    current: Option<Selection>,
    this: Weak<Mutex<CardState>>,
}

impl CardState {
    fn current(&self) -> Result<&Selection, RadarError> {
        self.current.as_ref().ok_or_else(not_configured)
    }

    fn arm(&mut self, now: DateTime<Utc>) {
        let delay = self.scheduler.next_delay(&self.indexer, now);
        let this = self.this.clone();
        self.scheduler
            .arm(delay, Box::new(move |fired| on_wake(&this, fired)));
    }

    /// One refresh step. The caller has already claimed the wake-up.
    fn refresh(&mut self) {
        let Some(current) = self.current.as_mut() else {
            return;
        };

        let now = self.indexer.now();
        let new_latest = self.indexer.latest_at(now);

        if new_latest != current.latest {
            let (selected, change) = rebase_selection(
                &self.indexer,
                now,
                current.selected,
                current.latest,
                current.config.time_slot_count,
            );
            info!(
                "New radar slot {} (was {}), selection {:?}",
                new_latest, current.latest, change
            );
            current.selected = selected;
            current.latest = new_latest;
            self.cache.preload_at(
                &self.indexer,
                now,
                current.resolution,
                current.config.time_slot_count,
            );
        } else {
            debug!("No new radar slot yet (latest {})", current.latest);
        }

        if current.config.auto_refresh {
            self.arm(now);
        }
    }
}

fn not_configured() -> RadarError {
    RadarError::InvalidConfig("card has not been configured".to_string())
}

fn on_wake(this: &Weak<Mutex<CardState>>, fired: TimerHandle) {
    let Some(state) = this.upgrade() else {
        return;
    };
    let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
    if state.scheduler.claim(fired) {
        state.refresh();
    }
}

/// A radar card instance.
///
/// Dropping the card cancels its refresh timer.
pub struct RadarCard {
    state: Arc<Mutex<CardState>>,
}

impl std::fmt::Debug for RadarCard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("RadarCard")
            .field("config", &state.current.as_ref().map(|c| &c.config))
            .field("scheduler", &state.scheduler)
            .field("cache", &state.cache)
            .finish()
    }
}

impl RadarCard {
    /// Create an unconfigured card.
    pub fn new(
        clock: Arc<dyn Clock>,
        timer: Arc<dyn Timer>,
        prefetcher: Arc<dyn Prefetcher>,
        options: CardOptions,
    ) -> Result<Self, RadarError> {
        let indexer = TimeWindowIndexer::new(clock, options.window)?;
        let state = Arc::new_cyclic(|this| {
            Mutex::new(CardState {
                indexer,
                cache: ImageCache::new(prefetcher),
                scheduler: RefreshScheduler::new(timer, options.refresh),
                current: None,
                this: this.clone(),
            })
        });
        Ok(Self { state })
    }

    /// Static metadata for registration.
    #[must_use]
    pub fn descriptor() -> CardDescriptor {
        CardDescriptor {
            card_type: CARD_TYPE,
            name: "HKO Radar Card",
            description: "Display HKO radar images with time slider and size options",
            preview: true,
            editor_type: Some(EDITOR_TYPE),
        }
    }

    /// Config offered when the card is first added to a dashboard.
    #[must_use]
    pub fn stub_config() -> CardConfig {
        CardConfig::default()
    }

    #[must_use]
    pub fn card_size() -> u32 {
        CARD_SIZE
    }

    fn lock(&self) -> MutexGuard<'_, CardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply a configuration, resetting selection, cache and timer.
    ///
    /// The selection starts on the latest slot and the resolution on the
    /// configured default.
    pub fn apply_config(&self, config: Option<CardConfig>) -> Result<(), RadarError> {
        let config = config
            .ok_or_else(|| RadarError::InvalidConfig("configuration is missing".to_string()))?;
        config.validate()?;

        let mut state = self.lock();
        state.scheduler.disarm();
        state.cache.clear();

        let now = state.indexer.now();
        let latest = state.indexer.latest_at(now);
        let CardState { indexer, cache, .. } = &mut *state;
        cache.preload_at(indexer, now, config.default_size, config.time_slot_count);

        info!(
            "Radar card configured: {} slots at {}, auto refresh {}",
            config.time_slot_count,
            config.default_size.display_name(),
            if config.auto_refresh { "on" } else { "off" }
        );

        let auto_refresh = config.auto_refresh;
        state.current = Some(Selection {
            resolution: config.default_size,
            latest,
            selected: latest,
            config,
        });

        if auto_refresh {
            state.arm(now);
        }
        Ok(())
    }

    /// Raw value from the slider element.
    pub fn on_slider_input(&self, raw: &str) -> Result<(), RadarError> {
        let index = raw
            .trim()
            .parse::<i64>()
            .map_err(|e| RadarError::InvalidSliderInput(format!("{raw}: {e}")))?;
        self.on_slider_moved(index)
    }

    /// Select slot `index` of the window, `0` being the oldest.
    ///
    /// Indices outside `0..slot_count` are clamped to the window. Without a
    /// pending refresh the window is first moved to the current latest slot.
    pub fn on_slider_moved(&self, index: i64) -> Result<(), RadarError> {
        let mut state = self.lock();
        let CardState {
            indexer,
            cache,
            scheduler,
            current,
            ..
        } = &mut *state;
        let current = current.as_mut().ok_or_else(not_configured)?;
        let slots = current.config.slots();

        let clamped = index.clamp(0, slots - 1);
        if clamped != index {
            warn!("Slider index {} outside 0..={}, clamping", index, slots - 1);
        }

        let now = indexer.now();
        if scheduler.state() == RefreshState::Disarmed {
            let latest = indexer.latest_at(now);
            if latest != current.latest {
                debug!("Window moved to latest slot {} (was {})", latest, current.latest);
                current.latest = latest;
                cache.preload_at(indexer, now, current.resolution, current.config.time_slot_count);
            }
        }

        current.selected = indexer.time_at_offset_at(now, clamped - (slots - 1));
        debug!("Selected radar slot {}", current.selected);
        Ok(())
    }

    /// Size tag from a resolution button. An empty tag is ignored.
    pub fn on_size_button_click(&self, tag: &str) -> Result<(), RadarError> {
        if tag.trim().is_empty() {
            return Ok(());
        }
        self.on_resolution_changed(tag.parse()?)
    }

    /// Switch resolution and warm the window at the new size.
    pub fn on_resolution_changed(&self, resolution: Resolution) -> Result<(), RadarError> {
        let mut state = self.lock();
        let count = state.current()?.config.time_slot_count;

        let CardState {
            indexer,
            cache,
            current,
            ..
        } = &mut *state;
        if let Some(current) = current.as_mut() {
            current.resolution = resolution;
        }
        cache.preload(indexer, resolution, count);
        info!("Radar resolution set to {}", resolution.display_name());
        Ok(())
    }

    /// The card was attached to a page; resume auto refresh if configured.
    pub fn on_attach(&self) {
        let mut state = self.lock();
        let auto_refresh = state
            .current
            .as_ref()
            .is_some_and(|c| c.config.auto_refresh);
        if auto_refresh {
            let now = state.indexer.now();
            state.arm(now);
        }
    }

    /// The card was removed from the page; cancel any pending refresh.
    pub fn on_detach(&self) {
        if self.lock().scheduler.disarm() {
            info!("Radar card detached, auto refresh stopped");
        }
    }

    /// Snapshot for the renderer, or `None` before the first config.
    #[must_use]
    pub fn view(&self) -> Option<CardView> {
        let state = self.lock();
        let current = state.current.as_ref()?;
        let indexer = &state.indexer;
        let slots = current.config.slots();

        Some(CardView {
            image_url: state
                .cache
                .lookup(indexer, current.resolution, current.selected),
            image_status: state
                .cache
                .handle_for(indexer, current.resolution, current.selected)
                .map(crate::prefetch::ImageHandle::status),
            selected: current.selected,
            selected_label: indexer.display_label(current.selected),
            latest: current.latest,
            resolution: current.resolution,
            slider_min: 0,
            slider_max: slots - 1,
            slider_value: indexer.offset_from(current.latest, current.selected) + slots - 1,
            auto_refresh: current.config.auto_refresh,
            refresh_state: state.scheduler.state(),
        })
    }

    /// The applied config, if any.
    #[must_use]
    pub fn config(&self) -> Option<CardConfig> {
        self.lock().current.as_ref().map(|c| c.config.clone())
    }

    #[must_use]
    pub fn refresh_state(&self) -> RefreshState {
        self.lock().scheduler.state()
    }

    /// Cached image URLs in insertion order.
    #[must_use]
    pub fn cached_urls(&self) -> Vec<String> {
        self.lock().cache.urls().to_vec()
    }
}

impl Drop for RadarCard {
    fn drop(&mut self) {
        self.lock().scheduler.disarm();
    }
}
