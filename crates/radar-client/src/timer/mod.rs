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

//! One-shot timer abstraction.
//!
//! The refresh scheduler only needs "call me once after a delay" and "never
//! mind". [`RuntimeTimer`] does that on a tokio runtime; [`ManualTimer`]
//! fires callbacks when a [`ManualClock`](crate::clock::ManualClock) is
//! advanced, for deterministic tests.

mod manual;
mod runtime;

pub use manual::ManualTimer;
pub use runtime::RuntimeTimer;

use std::time::Duration;

/// Work to run when a timer fires. Receives the handle it was scheduled under.
pub type TimerCallback = Box<dyn FnOnce(TimerHandle) + Send + 'static>;

/// Identifies one scheduled wake-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

impl TimerHandle {
    /// Numeric id, unique per timer instance.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Schedules one-shot callbacks.
pub trait Timer: Send + Sync {
    /// Run `callback` once after `delay`.
    fn schedule_once(&self, delay: Duration, callback: TimerCallback) -> TimerHandle;

    /// Cancel a pending callback. Unknown or already-fired handles are ignored.
    ///
    /// A callback that is already running when this is called may still
    /// complete; callers check their own state at fire time.
    fn cancel(&self, handle: TimerHandle);
}
