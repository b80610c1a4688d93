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

//! Application configuration management.
//!
//! The viewer keeps its card settings and feed overrides in a TOML file
//! managed by confy. Command-line flags override individual fields for one
//! run, and `--save` writes the result back.

use std::time::Duration;

use radar_client::timeline::DEFAULT_BASE_URL;
use radar_client::{CardConfig, CardOptions, RefreshSettings, WindowSettings};
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "hko-radar";
const CONFIG_NAME: &str = "config";

/// Application configuration stored in TOML format
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Configuration schema version for migrations
    #[serde(default = "default_config_version")]
    pub config_version: u32,

    /// Card settings, same shape as the dashboard YAML
    #[serde(default)]
    pub card: CardConfig,

    /// Root of the radar image tree
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Extra wait after an image is expected before checking for it
    #[serde(default = "default_safety_margin_secs")]
    pub safety_margin_secs: u64,

    /// Per-image download timeout
    #[serde(default = "default_prefetch_timeout_secs")]
    pub prefetch_timeout_secs: u64,

    /// Skip HTTP prefetching entirely
    #[serde(default)]
    pub offline: bool,
}

// Default value functions for serde
fn default_config_version() -> u32 {
    1
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_safety_margin_secs() -> u64 {
    5
}

fn default_prefetch_timeout_secs() -> u64 {
    10
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            config_version: default_config_version(),
            card: CardConfig::default(),
            base_url: default_base_url(),
            safety_margin_secs: default_safety_margin_secs(),
            prefetch_timeout_secs: default_prefetch_timeout_secs(),
            offline: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from disk, creating it with defaults if missing
    pub fn load() -> Result<Self, confy::ConfyError> {
        confy::load(APP_NAME, CONFIG_NAME)
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<(), confy::ConfyError> {
        confy::store(APP_NAME, CONFIG_NAME, self)
    }

    /// Get the config file path for display to user
    pub fn get_config_path() -> Result<std::path::PathBuf, confy::ConfyError> {
        confy::get_configuration_file_path(APP_NAME, CONFIG_NAME)
    }

    /// Card construction options derived from the feed settings
    pub fn card_options(&self) -> CardOptions {
        let safety_margin = Duration::from_secs(self.safety_margin_secs);
        CardOptions {
            window: WindowSettings {
                base_url: self.base_url.clone(),
                ..WindowSettings::default()
            },
            refresh: RefreshSettings {
                safety_margin,
                ..RefreshSettings::default()
            },
        }
    }

    pub fn prefetch_timeout(&self) -> Duration {
        Duration::from_secs(self.prefetch_timeout_secs)
    }
}
