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

//! Timer backed by tokio tasks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::debug;
use tokio::runtime::Handle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use super::{Timer, TimerCallback, TimerHandle};

type PendingTokens = Arc<Mutex<HashMap<u64, CancellationToken>>>;

/// Spawns one task per wake-up on a tokio runtime.
///
/// Each task sleeps until its deadline or until its cancellation token
/// fires, whichever comes first.
pub struct RuntimeTimer {
    runtime: Handle,
    next_id: AtomicU64,
    pending: PendingTokens,
}

impl std::fmt::Debug for RuntimeTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeTimer")
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}

impl RuntimeTimer {
    /// Create a timer spawning onto `runtime`.
    #[must_use]
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            next_id: AtomicU64::new(1),
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Create a timer on the runtime of the calling context, if any.
    #[must_use]
    pub fn from_current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }

    /// Number of wake-ups that have neither fired nor been cancelled.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Timer for RuntimeTimer {
    fn schedule_once(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, token.clone());

        let pending = Arc::clone(&self.pending);
        self.runtime.spawn(async move {
            tokio::select! {
                () = sleep(delay) => {
                    let still_pending = pending
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .remove(&id)
                        .is_some();
                    if still_pending {
                        callback(TimerHandle(id));
                    }
                }
                () = token.cancelled() => {
                    debug!("Timer {} cancelled", id);
                }
            }
        });

        TimerHandle(id)
    }

    fn cancel(&self, handle: TimerHandle) {
        let token = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&handle.id());
        if let Some(token) = token {
            token.cancel();
        }
    }
}

impl Drop for RuntimeTimer {
    fn drop(&mut self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        for (_, token) in pending.drain() {
            token.cancel();
        }
    }
}
