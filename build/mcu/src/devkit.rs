// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::peripheral::LoadCapacitors;
use anyhow::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A reference board whose pin usage is preloaded into a fresh allocation.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Devkit {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub zephyr_version: Option<String>,
    #[serde(default)]
    pub supported_mcus: Vec<String>,
    #[serde(default)]
    pub package: Option<String>,
    #[serde(default)]
    pub peripherals: Vec<DevkitPeripheral>,
    #[serde(default)]
    pub oscillators: DevkitOscillators,
    #[serde(default)]
    pub gpios: Vec<DevkitGpio>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevkitPeripheral {
    pub id: String,
    /// Signal name to pin name.
    #[serde(default)]
    pub signals: IndexMap<String, String>,
    #[serde(default)]
    pub is_console: bool,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DevkitOscillators {
    #[serde(default)]
    pub hfxo: Option<LoadCapacitors>,
    #[serde(default)]
    pub lfxo: Option<LoadCapacitors>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevkitGpio {
    pub label: String,
    pub pin: String,
    #[serde(default)]
    pub active_state: ActiveState,
}

/// Polarity of a GPIO entry.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActiveState {
    #[default]
    ActiveHigh,
    ActiveLow,
}

impl Devkit {
    pub fn from_path(path: &Path) -> Result<Self> {
        build_util::json_from_path(path)
    }

    pub fn supports(&self, mcu: &str) -> bool {
        self.supported_mcus.is_empty()
            || self.supported_mcus.iter().any(|m| m == mcu)
    }
}
