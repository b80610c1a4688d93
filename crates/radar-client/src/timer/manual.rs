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

//! Timer driven by a manual clock.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use super::{Timer, TimerCallback, TimerHandle};
use crate::clock::{Clock, ManualClock};

struct PendingTimer {
    id: u64,
    due: DateTime<Utc>,
    callback: TimerCallback,
}

#[derive(Default)]
struct Queue {
    next_id: u64,
    pending: Vec<PendingTimer>,
}

/// Fires callbacks as a [`ManualClock`] is advanced through their deadlines.
///
/// Callbacks run on the caller of [`ManualTimer::advance`], in deadline
/// order, with the clock set to each deadline as it fires. A callback may
/// schedule further wake-ups; those also fire if they fall inside the
/// advanced range.
pub struct ManualTimer {
    clock: Arc<ManualClock>,
    queue: Mutex<Queue>,
}

impl std::fmt::Debug for ManualTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualTimer")
            .field("now", &self.clock.now())
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl ManualTimer {
    #[must_use]
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            clock,
            queue: Mutex::new(Queue::default()),
        }
    }

    /// Number of wake-ups not yet fired or cancelled.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    /// Deadline of the earliest pending wake-up.
    #[must_use]
    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.lock().pending.iter().map(|p| p.due).min()
    }

    /// Advance the clock by `delta`, firing every wake-up that falls due.
    ///
    /// Returns the number of callbacks run.
    pub fn advance(&self, delta: TimeDelta) -> usize {
        let target = self.clock.now() + delta;
        let mut fired = 0;

        // The queue lock is released before each callback so it can re-arm.
        while let Some(next) = self.pop_due(target) {
            if next.due > self.clock.now() {
                self.clock.set(next.due);
            }
            (next.callback)(TimerHandle(next.id));
            fired += 1;
        }

        if target > self.clock.now() {
            self.clock.set(target);
        }
        fired
    }

    fn pop_due(&self, target: DateTime<Utc>) -> Option<PendingTimer> {
        let mut queue = self.lock();
        let index = queue
            .pending
            .iter()
            .enumerate()
            .filter(|(_, p)| p.due <= target)
            .min_by_key(|(_, p)| (p.due, p.id))
            .map(|(i, _)| i)?;
        Some(queue.pending.remove(index))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Timer for ManualTimer {
    fn schedule_once(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let delay = TimeDelta::from_std(delay).unwrap_or_else(|_| TimeDelta::weeks(5200));
        let due = self
            .clock
            .now()
            .checked_add_signed(delay)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut queue = self.lock();
        queue.next_id += 1;
        let id = queue.next_id;
        queue.pending.push(PendingTimer { id, due, callback });
        TimerHandle(id)
    }

    fn cancel(&self, handle: TimerHandle) {
        self.lock().pending.retain(|p| p.id != handle.id());
    }
}
