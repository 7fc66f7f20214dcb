// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::peripheral::{CapacitanceRange, CHIP_SELECT};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Peripheral ids whose device-tree template is filed under another key.
const TEMPLATE_KEY_MAP: &[(&str, &str)] = &[("SAADC", "ADC")];

/// Contents of `devicetree-templates.json`.  Only the parts that steer pin
/// allocation are modeled; the rest belongs to the text emitters.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Templates {
    #[serde(default)]
    pub templates: IndexMap<String, PeripheralTemplate>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeripheralTemplate {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// The peripheral is enabled without any pin routing (ADC, NFCT).
    #[serde(default)]
    pub no_pinctrl: bool,
    /// Signals that the emitters route through a dedicated property rather
    /// than pinctrl.
    #[serde(default)]
    pub out_of_band_signals: Vec<String>,
    /// Signal name to device-tree pin function.  Signals missing here are
    /// never routed by the batch generator.
    #[serde(default)]
    pub signal_mappings: IndexMap<String, String>,
    #[serde(default)]
    pub load_capacitance_range: Option<CapacitanceRange>,
    #[serde(default)]
    pub dt_node_name: Option<String>,
    #[serde(default)]
    pub pinctrl_base_name: Option<String>,
}

impl Templates {
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn for_peripheral(&self, id: &str) -> Option<&PeripheralTemplate> {
        let key = TEMPLATE_KEY_MAP
            .iter()
            .find(|(from, _)| *from == id)
            .map_or(id, |(_, to)| *to);
        self.templates.get(key)
    }
}

impl PeripheralTemplate {
    pub fn is_uart(&self) -> bool {
        self.kind.as_deref() == Some("UART")
    }

    pub fn is_spi(&self) -> bool {
        self.kind.as_deref() == Some("SPI")
    }

    pub fn is_out_of_band(&self, signal: &str) -> bool {
        self.out_of_band_signals.iter().any(|s| s == signal)
            || (self.is_spi() && signal == CHIP_SELECT)
    }

    pub fn maps(&self, signal: &str) -> bool {
        self.signal_mappings.contains_key(signal)
    }
}
