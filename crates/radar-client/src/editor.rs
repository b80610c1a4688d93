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

//! Visual editor support: the form schema and config-changed events.

use serde_json::{json, Value};

use crate::config::{CardConfig, Resolution};

/// Smallest slot count offered by the editor.
pub const EDITOR_MIN_SLOTS: u32 = 10;
/// Largest slot count offered by the editor.
pub const EDITOR_MAX_SLOTS: u32 = 30;
pub const EDITOR_SLOT_STEP: u32 = 5;

/// Form schema for the host's generic form renderer.
///
/// Dropdown values are the URL size tags, which [`CardConfig`] accepts.
#[must_use]
pub fn schema() -> Value {
    let options: Vec<Value> = Resolution::ALL
        .iter()
        .map(|r| json!({ "value": r.as_str(), "label": r.display_name() }))
        .collect();

    json!([
        {
            "name": "defaultSize",
            "required": true,
            "selector": { "select": { "mode": "dropdown", "options": options } }
        },
        {
            "name": "timeSlotCount",
            "required": true,
            "selector": {
                "number": {
                    "min": EDITOR_MIN_SLOTS,
                    "max": EDITOR_MAX_SLOTS,
                    "step": EDITOR_SLOT_STEP
                }
            }
        },
        {
            "name": "autoRefresh",
            "label": "Auto Update",
            "required": true,
            "selector": { "boolean": {} }
        }
    ])
}

/// Editor state for one card.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardEditor {
    config: CardConfig,
}

impl CardEditor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_config(&mut self, config: CardConfig) {
        self.config = config;
    }

    #[must_use]
    pub fn config(&self) -> &CardConfig {
        &self.config
    }

    /// Store `config` and build the `config-changed` event detail.
    pub fn config_changed(&mut self, config: CardConfig) -> serde_json::Result<Value> {
        self.config = config;
        Ok(json!({ "config": serde_json::to_value(&self.config)? }))
    }

    /// Apply a form value from the host, as a raw JSON object.
    pub fn form_changed(&mut self, value: Value) -> serde_json::Result<Value> {
        let config: CardConfig = serde_json::from_value(value)?;
        self.config_changed(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_fields() {
        let schema = schema();
        let names: Vec<&str> = schema
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["defaultSize", "timeSlotCount", "autoRefresh"]);

        assert_eq!(
            schema[0]["selector"]["select"]["options"],
            json!([
                { "value": "064", "label": "Small" },
                { "value": "128", "label": "Medium" },
                { "value": "256", "label": "Large" }
            ])
        );
        assert_eq!(
            schema[1]["selector"]["number"],
            json!({ "min": 10, "max": 30, "step": 5 })
        );
        assert_eq!(schema[2]["label"], "Auto Update");
    }

    #[test]
    fn test_default_editor_config() {
        let editor = CardEditor::new();
        assert_eq!(editor.config(), &CardConfig::default());
    }

    #[test]
    fn test_set_config() {
        let mut editor = CardEditor::new();
        let config = CardConfig {
            default_size: Resolution::Large,
            time_slot_count: 20,
            auto_refresh: true,
        };
        editor.set_config(config.clone());
        assert_eq!(editor.config(), &config);
    }

    #[test]
    fn test_config_changed_detail() {
        let mut editor = CardEditor::new();
        let detail = editor
            .config_changed(CardConfig {
                default_size: Resolution::Small,
                time_slot_count: 25,
                auto_refresh: true,
            })
            .unwrap();
        assert_eq!(
            detail,
            json!({ "config": { "defaultSize": "S", "timeSlotCount": 25, "autoRefresh": true } })
        );
        assert_eq!(editor.config().default_size, Resolution::Small);
    }

    #[test]
    fn test_form_value_with_size_tag() {
        let mut editor = CardEditor::new();
        editor
            .form_changed(json!({ "defaultSize": "256", "timeSlotCount": 10, "autoRefresh": false }))
            .unwrap();
        assert_eq!(editor.config().default_size, Resolution::Large);
        assert_eq!(editor.config().time_slot_count, 10);

        assert!(editor.form_changed(json!({ "defaultSize": "999" })).is_err());
        assert_eq!(editor.config().default_size, Resolution::Large);
    }
}
