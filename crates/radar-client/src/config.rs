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

//! Card configuration and image resolutions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RadarError;

/// Number of time slots shown when the config does not say otherwise.
pub const DEFAULT_TIME_SLOT_COUNT: u32 = 15;

/// Radar image resolutions published by the Observatory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "S", alias = "064", alias = "small")]
    Small,
    #[default]
    #[serde(rename = "M", alias = "128", alias = "medium")]
    Medium,
    #[serde(rename = "L", alias = "256", alias = "large")]
    Large,
}

impl Resolution {
    /// All resolutions, smallest first.
    pub const ALL: [Resolution; 3] = [Resolution::Small, Resolution::Medium, Resolution::Large];

    /// The size tag used in image URLs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Small => "064",
            Resolution::Medium => "128",
            Resolution::Large => "256",
        }
    }

    /// Human-readable button label.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Resolution::Small => "Small",
            Resolution::Medium => "Medium",
            Resolution::Large => "Large",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = RadarError;

    /// Accepts URL tags (`064`), letters (`S`) and names (`small`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "064" | "s" | "small" => Ok(Resolution::Small),
            "128" | "m" | "medium" => Ok(Resolution::Medium),
            "256" | "l" | "large" => Ok(Resolution::Large),
            _ => Err(RadarError::UnknownResolution(s.to_string())),
        }
    }
}

/// Card options as written in the dashboard YAML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardConfig {
    /// Resolution shown when the card is first rendered.
    #[serde(default)]
    pub default_size: Resolution,

    /// Number of slots in the slider window.
    #[serde(default = "default_time_slot_count")]
    pub time_slot_count: u32,

    /// Follow new imagery automatically.
    #[serde(default)]
    pub auto_refresh: bool,
}

fn default_time_slot_count() -> u32 {
    DEFAULT_TIME_SLOT_COUNT
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            default_size: Resolution::default(),
            time_slot_count: DEFAULT_TIME_SLOT_COUNT,
            auto_refresh: false,
        }
    }
}

impl CardConfig {
    /// Reject configurations the card cannot render.
    pub fn validate(&self) -> Result<(), RadarError> {
        if self.time_slot_count == 0 {
            return Err(RadarError::InvalidConfig(
                "timeSlotCount must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Slot count as a signed offset bound.
    #[must_use]
    pub(crate) fn slots(&self) -> i64 {
        i64::from(self.time_slot_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_tags() {
        assert_eq!(Resolution::Small.as_str(), "064");
        assert_eq!(Resolution::Medium.as_str(), "128");
        assert_eq!(Resolution::Large.as_str(), "256");
    }

    #[test]
    fn test_resolution_parse() {
        assert_eq!("064".parse::<Resolution>().unwrap(), Resolution::Small);
        assert_eq!("M".parse::<Resolution>().unwrap(), Resolution::Medium);
        assert_eq!("large".parse::<Resolution>().unwrap(), Resolution::Large);
        assert_eq!(
            "512".parse::<Resolution>(),
            Err(RadarError::UnknownResolution("512".to_string()))
        );
    }

    #[test]
    fn test_config_deserialize_defaults() {
        let config: CardConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, CardConfig::default());
        assert_eq!(config.time_slot_count, 15);
    }

    #[test]
    fn test_config_deserialize_accepts_size_tags() {
        let config: CardConfig = serde_json::from_str(
            r#"{"defaultSize": "256", "timeSlotCount": 20, "autoRefresh": true}"#,
        )
        .unwrap();
        assert_eq!(config.default_size, Resolution::Large);
        assert_eq!(config.time_slot_count, 20);
        assert!(config.auto_refresh);

        let config: CardConfig = serde_json::from_str(r#"{"defaultSize": "S"}"#).unwrap();
        assert_eq!(config.default_size, Resolution::Small);
    }

    #[test]
    fn test_config_serializes_camel_case() {
        let value = serde_json::to_value(CardConfig::default()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"defaultSize": "M", "timeSlotCount": 15, "autoRefresh": false})
        );
    }

    #[test]
    fn test_validate_rejects_zero_slots() {
        let config = CardConfig {
            time_slot_count: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(RadarError::InvalidConfig(_))));
        assert!(CardConfig::default().validate().is_ok());
    }
}
