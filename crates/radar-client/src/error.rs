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

//! Error type shared by every layer of the radar client.

use thiserror::Error;

/// Errors surfaced by the radar card and its collaborators.
///
/// Image fetch failures are not represented here. They are recorded on the
/// image handle and never leave the cache or scheduler.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RadarError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid slider input: {0:?}")]
    InvalidSliderInput(String),

    #[error("unknown image resolution: {0:?}")]
    UnknownResolution(String),

    #[error("invalid time window: {0}")]
    InvalidWindow(String),

    #[error("element '{0}' is already defined")]
    DuplicateElement(String),
}
