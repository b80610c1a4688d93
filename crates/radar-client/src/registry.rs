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

//! Registration of card types with a dashboard host.
//!
//! A host keeps one registry per page. Registering defines the card element
//! (and its editor element, if it has one) and appends a [`CustomCardEntry`]
//! to the list the host's card picker reads.

use std::collections::HashSet;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::RadarError;

/// Static metadata describing a card type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardDescriptor {
    /// Element name, e.g. `hko-radar-card`.
    pub card_type: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Whether the picker may render a live preview.
    pub preview: bool,
    /// Element name of the visual editor, if the card has one.
    pub editor_type: Option<&'static str>,
}

/// One entry of the card picker list, in the host's JSON shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomCardEntry {
    #[serde(rename = "type")]
    pub card_type: String,
    pub name: String,
    pub description: String,
    pub preview: bool,
}

impl From<&CardDescriptor> for CustomCardEntry {
    fn from(descriptor: &CardDescriptor) -> Self {
        Self {
            card_type: descriptor.card_type.to_string(),
            name: descriptor.name.to_string(),
            description: descriptor.description.to_string(),
            preview: descriptor.preview,
        }
    }
}

/// Defined element names plus the picker list.
#[derive(Debug, Default)]
pub struct CardRegistry {
    elements: HashSet<String>,
    custom_cards: Vec<CustomCardEntry>,
}

impl CardRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Define the card (and editor) elements and list the card.
    ///
    /// Fails without changing anything if either element name is taken.
    pub fn register(&mut self, descriptor: &CardDescriptor) -> Result<(), RadarError> {
        let names = std::iter::once(descriptor.card_type).chain(descriptor.editor_type);
        for name in names.clone() {
            if self.elements.contains(name) {
                return Err(RadarError::DuplicateElement(name.to_string()));
            }
        }
        if descriptor.editor_type == Some(descriptor.card_type) {
            return Err(RadarError::DuplicateElement(descriptor.card_type.to_string()));
        }

        for name in names {
            self.elements.insert(name.to_string());
        }
        self.custom_cards.push(CustomCardEntry::from(descriptor));
        info!("Registered card element {}", descriptor.card_type);
        Ok(())
    }

    #[must_use]
    pub fn is_defined(&self, element: &str) -> bool {
        self.elements.contains(element)
    }

    /// Picker entries in registration order.
    #[must_use]
    pub fn custom_cards(&self) -> &[CustomCardEntry] {
        &self.custom_cards
    }

    /// Picker list as the host's JSON array.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.custom_cards)
    }
}
