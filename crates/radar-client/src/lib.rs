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

//! Client library for the Hong Kong Observatory radar image feed.
//!
//! The Observatory publishes one radar image every six minutes per
//! resolution, a few minutes after the slot it covers. This crate turns that
//! feed into a scrollable window of recent images:
//!
//! - **Timeline**: [`TimeWindowIndexer`] maps slot offsets to timestamps and
//!   image URLs
//! - **Cache**: [`ImageCache`] pre-warms the window through a [`Prefetcher`]
//! - **Refresh**: [`RefreshScheduler`] wakes up when the next image should
//!   exist and keeps the user's selection stable
//! - **Card**: [`RadarCard`] wires the layers together behind UI handlers
//!
//! Time and timers are injected ([`Clock`], [`Timer`]), so the whole stack
//! runs deterministically under [`ManualClock`] and [`ManualTimer`].
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use chrono::{TimeDelta, TimeZone, Utc};
//! use radar_client::{
//!     CardConfig, CardOptions, ManualClock, ManualTimer, NoopPrefetcher, RadarCard, Resolution,
//! };
//!
//! let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap()));
//! let timer = Arc::new(ManualTimer::new(clock.clone()));
//! let card = RadarCard::new(
//!     clock.clone(),
//!     timer.clone(),
//!     Arc::new(NoopPrefetcher),
//!     CardOptions::default(),
//! )
//! .unwrap();
//!
//! card.apply_config(Some(CardConfig {
//!     default_size: Resolution::Medium,
//!     time_slot_count: 15,
//!     auto_refresh: true,
//! }))
//! .unwrap();
//! assert_eq!(card.view().unwrap().selected_label, "1/1/2024, 8:54:00 AM");
//!
//! // The 09:00 HKT image is expected at 01:04:05 UTC
//! timer.advance(TimeDelta::minutes(5));
//! assert_eq!(card.view().unwrap().selected_label, "1/1/2024, 9:00:00 AM");
//! ```
//!
//! # Using Individual Layers
//!
//! ```
//! use std::sync::Arc;
//! use chrono::{TimeZone, Utc};
//! use radar_client::{ManualClock, Resolution, TimeWindowIndexer, WindowSettings};
//!
//! let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap()));
//! let indexer = TimeWindowIndexer::new(clock, WindowSettings::default()).unwrap();
//!
//! let latest = indexer.time_at_offset(0);
//! assert_eq!(
//!     indexer.image_url(Resolution::Large, latest),
//!     "https://www.hko.gov.hk/wxinfo/radars/rad_256_png/2d256nradar_202401010854.jpg"
//! );
//! ```

pub mod cache;
pub mod card;
pub mod clock;
pub mod config;
pub mod editor;
pub mod error;
pub mod prefetch;
pub mod registry;
pub mod scheduler;
pub mod timeline;
pub mod timer;

pub use cache::ImageCache;
pub use card::{CardOptions, CardView, RadarCard, CARD_TYPE, EDITOR_TYPE};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CardConfig, Resolution, DEFAULT_TIME_SLOT_COUNT};
pub use editor::CardEditor;
pub use error::RadarError;
pub use prefetch::{HttpPrefetcher, ImageHandle, LoadStatus, NoopPrefetcher, Prefetcher};
pub use registry::{CardDescriptor, CardRegistry, CustomCardEntry};
pub use scheduler::{
    rebase_selection, RefreshScheduler, RefreshSettings, RefreshState, SelectionChange,
};
pub use timeline::{TimeWindowIndexer, WindowSettings};
pub use timer::{ManualTimer, RuntimeTimer, Timer, TimerHandle};
