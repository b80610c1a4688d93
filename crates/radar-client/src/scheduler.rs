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

//! Auto-refresh scheduling.
//!
//! The scheduler is a two-state machine, [`RefreshState::Armed`] while one
//! wake-up is pending and [`RefreshState::Disarmed`] otherwise. It never
//! holds more than one pending wake-up. The owner passes the fired handle
//! back through [`RefreshScheduler::claim`] before acting on it, so a
//! wake-up that raced with a cancel is dropped.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::debug;

use crate::timeline::TimeWindowIndexer;
use crate::timer::{Timer, TimerCallback, TimerHandle};

/// Extra wait after a slot is due upstream before looking for it.
pub const DEFAULT_SAFETY_MARGIN: Duration = Duration::from_secs(5);

/// Lower bound on any refresh delay.
pub const DEFAULT_MINIMUM_DELAY: Duration = Duration::from_secs(5);

/// Timing knobs for the refresh timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshSettings {
    pub safety_margin: Duration,
    pub minimum_delay: Duration,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            safety_margin: DEFAULT_SAFETY_MARGIN,
            minimum_delay: DEFAULT_MINIMUM_DELAY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Armed,
    Disarmed,
}

/// What a refresh did to the user's selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    /// Selection was on the live edge and moved with it.
    FollowedEdge,
    /// Selection scrolled out of the window and was pulled to its oldest slot.
    Clamped,
    /// Selection was inside the window and left alone.
    Unchanged,
}

/// Owns the single pending refresh wake-up.
pub struct RefreshScheduler {
    timer: Arc<dyn Timer>,
    settings: RefreshSettings,
    pending: Option<TimerHandle>,
}

impl std::fmt::Debug for RefreshScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshScheduler")
            .field("settings", &self.settings)
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl RefreshScheduler {
    #[must_use]
    pub fn new(timer: Arc<dyn Timer>, settings: RefreshSettings) -> Self {
        Self {
            timer,
            settings,
            pending: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> RefreshState {
        if self.pending.is_some() {
            RefreshState::Armed
        } else {
            RefreshState::Disarmed
        }
    }

    /// Handle of the pending wake-up, if armed.
    #[must_use]
    pub fn pending(&self) -> Option<TimerHandle> {
        self.pending
    }

    /// Delay until the next slot should be available upstream.
    ///
    /// `time_at_offset(1) - now + freshness + margin`, floored at the
    /// minimum delay so a skewed clock cannot cause a tight loop.
    #[must_use]
    pub fn next_delay(&self, indexer: &TimeWindowIndexer, now: DateTime<Utc>) -> Duration {
        let next_slot = indexer.time_at_offset_at(now, 1);
        let until_available =
            (next_slot - now).num_milliseconds() + indexer.freshness_offset_ms();
        let delay = Duration::from_millis(u64::try_from(until_available).unwrap_or(0))
            + self.settings.safety_margin;
        delay.max(self.settings.minimum_delay)
    }

    /// Schedule a wake-up unless one is already pending.
    ///
    /// Returns the new handle, or `None` when already armed.
    pub fn arm(&mut self, delay: Duration, callback: TimerCallback) -> Option<TimerHandle> {
        if self.pending.is_some() {
            return None;
        }
        let handle = self.timer.schedule_once(delay, callback);
        debug!("Refresh armed ({}) in {:?}", handle.id(), delay);
        self.pending = Some(handle);
        Some(handle)
    }

    /// Cancel the pending wake-up. Returns whether one was pending.
    pub fn disarm(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) => {
                self.timer.cancel(handle);
                debug!("Refresh disarmed ({})", handle.id());
                true
            }
            None => false,
        }
    }

    /// Accept a fired wake-up if it is still the pending one.
    ///
    /// On success the scheduler is disarmed and the caller owns the refresh
    /// step, including re-arming.
    pub fn claim(&mut self, fired: TimerHandle) -> bool {
        if self.pending == Some(fired) {
            self.pending = None;
            true
        } else {
            debug!("Ignoring stale refresh wake-up ({})", fired.id());
            false
        }
    }
}

/// Move `selected` across a change of the latest slot.
///
/// `previous_latest` is the latest slot before the refresh, `now` the
/// instant the new latest was computed from. A selection on the old edge
/// follows the new edge. One that is `slot_count` or more slots behind the
/// new edge is clamped to the oldest slot of the new window. Anything else,
/// including a selection ahead of the edge, is kept.
#[must_use]
pub fn rebase_selection(
    indexer: &TimeWindowIndexer,
    now: DateTime<Utc>,
    selected: DateTime<Utc>,
    previous_latest: DateTime<Utc>,
    slot_count: u32,
) -> (DateTime<Utc>, SelectionChange) {
    let slots = i64::from(slot_count);

    if selected == previous_latest {
        return (indexer.latest_at(now), SelectionChange::FollowedEdge);
    }

    if indexer.offset_of_time_at(now, selected) <= -slots {
        return (
            indexer.time_at_offset_at(now, -(slots - 1)),
            SelectionChange::Clamped,
        );
    }

    (selected, SelectionChange::Unchanged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::timeline::WindowSettings;
    use crate::timer::ManualTimer;

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn setup(now: &str) -> (Arc<ManualClock>, Arc<ManualTimer>, TimeWindowIndexer) {
        let clock = Arc::new(ManualClock::new(at(now)));
        let timer = Arc::new(ManualTimer::new(clock.clone()));
        let indexer = TimeWindowIndexer::new(clock.clone(), WindowSettings::default()).unwrap();
        (clock, timer, indexer)
    }

    #[test]
    fn test_next_delay_after_boundary() {
        let (_clock, timer, indexer) = setup("2024-01-01T01:00:00Z");
        let scheduler = RefreshScheduler::new(timer, RefreshSettings::default());
        assert_eq!(
            scheduler.next_delay(&indexer, at("2024-01-01T01:00:00Z")),
            Duration::from_millis(245_000)
        );
        // 01:03:59 still waits for the 01:00 slot to land at 01:04
        assert_eq!(
            scheduler.next_delay(&indexer, at("2024-01-01T01:03:59Z")),
            Duration::from_millis(6_000)
        );
    }

    #[test]
    fn test_next_delay_floor() {
        let (_clock, timer, indexer) = setup("2024-01-01T01:00:00Z");
        let scheduler = RefreshScheduler::new(
            timer,
            RefreshSettings {
                safety_margin: Duration::ZERO,
                minimum_delay: Duration::from_secs(5),
            },
        );
        assert_eq!(
            scheduler.next_delay(&indexer, at("2024-01-01T01:03:59Z")),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_arm_is_noop_when_armed() {
        let (_clock, timer, _indexer) = setup("2024-01-01T01:00:00Z");
        let mut scheduler = RefreshScheduler::new(timer.clone(), RefreshSettings::default());
        assert_eq!(scheduler.state(), RefreshState::Disarmed);

        let first = scheduler.arm(Duration::from_secs(10), Box::new(|_| {}));
        assert!(first.is_some());
        assert_eq!(scheduler.state(), RefreshState::Armed);

        assert!(scheduler.arm(Duration::from_secs(1), Box::new(|_| {})).is_none());
        assert_eq!(scheduler.pending(), first);
        assert_eq!(timer.pending_count(), 1);
    }

    #[test]
    fn test_disarm_cancels() {
        let (_clock, timer, _indexer) = setup("2024-01-01T01:00:00Z");
        let mut scheduler = RefreshScheduler::new(timer.clone(), RefreshSettings::default());
        scheduler.arm(Duration::from_secs(10), Box::new(|_| {}));

        assert!(scheduler.disarm());
        assert_eq!(scheduler.state(), RefreshState::Disarmed);
        assert_eq!(timer.pending_count(), 0);
        assert!(!scheduler.disarm());
    }

    #[test]
    fn test_claim_rejects_stale_handle() {
        let (_clock, timer, _indexer) = setup("2024-01-01T01:00:00Z");
        let mut scheduler = RefreshScheduler::new(timer, RefreshSettings::default());
        let stale = scheduler.arm(Duration::from_secs(10), Box::new(|_| {})).unwrap();
        scheduler.disarm();
        let current = scheduler.arm(Duration::from_secs(10), Box::new(|_| {})).unwrap();

        assert!(!scheduler.claim(stale));
        assert_eq!(scheduler.state(), RefreshState::Armed);
        assert!(scheduler.claim(current));
        assert_eq!(scheduler.state(), RefreshState::Disarmed);
    }

    #[test]
    fn test_rebase_follows_edge() {
        let (_clock, _timer, indexer) = setup("2024-01-01T01:05:00Z");
        let previous = at("2024-01-01T00:54:00Z");
        let (selected, change) =
            rebase_selection(&indexer, indexer.now(), previous, previous, 15);
        assert_eq!(change, SelectionChange::FollowedEdge);
        assert_eq!(selected, at("2024-01-01T01:00:00Z"));
    }

    #[test]
    fn test_rebase_clamps_to_oldest_slot() {
        let (_clock, _timer, indexer) = setup("2024-01-01T01:05:00Z");
        let (selected, change) = rebase_selection(
            &indexer,
            indexer.now(),
            at("2023-12-31T23:30:00Z"),
            at("2024-01-01T00:54:00Z"),
            15,
        );
        assert_eq!(change, SelectionChange::Clamped);
        assert_eq!(selected, at("2023-12-31T23:36:00Z"));
        assert_eq!(selected, indexer.time_at_offset(-14));
    }

    #[test]
    fn test_rebase_clamps_far_behind() {
        let (_clock, _timer, indexer) = setup("2024-01-01T01:05:00Z");
        let (selected, change) = rebase_selection(
            &indexer,
            indexer.now(),
            at("2023-12-30T00:00:00Z"),
            at("2024-01-01T00:54:00Z"),
            5,
        );
        assert_eq!(change, SelectionChange::Clamped);
        assert_eq!(selected, at("2024-01-01T00:36:00Z"));
    }

    #[test]
    fn test_rebase_leaves_mid_window_selection() {
        let (_clock, _timer, indexer) = setup("2024-01-01T01:05:00Z");
        let (selected, change) = rebase_selection(
            &indexer,
            indexer.now(),
            at("2024-01-01T00:00:00Z"),
            at("2024-01-01T00:54:00Z"),
            15,
        );
        assert_eq!(change, SelectionChange::Unchanged);
        assert_eq!(selected, at("2024-01-01T00:00:00Z"));
    }

    #[test]
    fn test_rebase_keeps_selection_ahead_of_edge() {
        let (_clock, _timer, indexer) = setup("2024-01-01T01:05:00Z");
        let ahead = at("2024-01-01T04:00:00Z");
        let (selected, change) =
            rebase_selection(&indexer, indexer.now(), ahead, at("2024-01-01T00:54:00Z"), 5);
        assert_eq!(change, SelectionChange::Unchanged);
        assert_eq!(selected, ahead);
    }
}
