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

//! Image handles and background prefetching.
//!
//! A handle is created as soon as a URL enters the cache and is shared with
//! whatever prefetcher warms it. The prefetcher records the outcome on the
//! handle; nothing in the cache or scheduler reads that outcome, it exists
//! for the display layer.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::{debug, warn};
use tokio::runtime::Handle;

/// Load state of a prefetched image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    /// Requested, no outcome yet.
    Pending,
    /// Downloaded successfully.
    Loaded { bytes: usize },
    /// Network error or non-success HTTP status.
    Failed(String),
}

/// A cached image URL plus its shared load state.
#[derive(Debug, Clone)]
pub struct ImageHandle {
    url: String,
    status: Arc<Mutex<LoadStatus>>,
}

impl ImageHandle {
    #[must_use]
    pub fn new(url: String) -> Self {
        Self {
            url,
            status: Arc::new(Mutex::new(LoadStatus::Pending)),
        }
    }

    /// The URL this handle was created for.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn status(&self) -> LoadStatus {
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Record a load outcome. Visible through every clone of the handle.
    pub fn set_status(&self, status: LoadStatus) {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = status;
    }
}

/// Starts warming an image. Must return without waiting for the fetch.
pub trait Prefetcher: Send + Sync {
    fn prefetch(&self, handle: ImageHandle);
}

/// Prefetcher that never touches the network.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPrefetcher;

impl Prefetcher for NoopPrefetcher {
    fn prefetch(&self, handle: ImageHandle) {
        debug!("Skipping prefetch of {}", handle.url());
    }
}

/// Downloads each image once over HTTP on a tokio runtime.
///
/// There is no retry: a failed handle stays failed until the card is
/// reconfigured and the cache rebuilt.
#[derive(Debug, Clone)]
pub struct HttpPrefetcher {
    client: reqwest::Client,
    runtime: Handle,
}

impl HttpPrefetcher {
    /// Build a prefetcher whose requests time out after `timeout`.
    pub fn new(runtime: Handle, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("hko-radar/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, runtime })
    }
}

impl Prefetcher for HttpPrefetcher {
    fn prefetch(&self, handle: ImageHandle) {
        let client = self.client.clone();
        self.runtime.spawn(async move {
            let status = match download(&client, handle.url()).await {
                Ok(bytes) => {
                    debug!("Prefetched {} ({} bytes)", handle.url(), bytes);
                    LoadStatus::Loaded { bytes }
                }
                Err(e) => {
                    warn!("Prefetch of {} failed: {}", handle.url(), e);
                    LoadStatus::Failed(e)
                }
            };
            handle.set_status(status);
        });
    }
}

async fn download(client: &reqwest::Client, url: &str) -> Result<usize, String> {
    let response = client.get(url).send().await.map_err(|e| e.to_string())?;

    if !response.status().is_success() {
        return Err(format!("HTTP error: {}", response.status()));
    }

    let bytes = response.bytes().await.map_err(|e| e.to_string())?;
    Ok(bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_starts_pending() {
        let handle = ImageHandle::new("https://example.com/a.jpg".to_string());
        assert_eq!(handle.url(), "https://example.com/a.jpg");
        assert_eq!(handle.status(), LoadStatus::Pending);
    }

    #[test]
    fn test_status_shared_between_clones() {
        let handle = ImageHandle::new("https://example.com/a.jpg".to_string());
        let clone = handle.clone();
        clone.set_status(LoadStatus::Failed("HTTP error: 404 Not Found".to_string()));
        assert_eq!(
            handle.status(),
            LoadStatus::Failed("HTTP error: 404 Not Found".to_string())
        );
    }

    #[test]
    fn test_noop_leaves_pending() {
        let handle = ImageHandle::new("https://example.com/a.jpg".to_string());
        NoopPrefetcher.prefetch(handle.clone());
        assert_eq!(handle.status(), LoadStatus::Pending);
    }
}
