// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use build_mcu::{ActiveState, LoadCapacitors};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Function recorded in the used-pin table for GPIO entries.
pub const GPIO_FUNCTION: &str = "GPIO";

/// Settings of a generic peripheral that don't claim pins.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeripheralConfig {
    /// UART only: the receiver is unused, so RXD need not be routed.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disable_rx: bool,
    /// SPI only: additional chip-select GPIOs beyond the routed one.  These
    /// are checked at commit time but are not reserved.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_cs_gpios: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A peripheral whose signals were routed to pins chosen from their
/// candidates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenericSelection {
    pub id: String,
    /// Pin name to signal name, in commit order.
    pub pin_functions: IndexMap<String, String>,
    /// The chip-select pin, kept out of `pin_functions` because it is
    /// emitted through a dedicated property.  It still occupies a pin.
    pub chip_select: Option<String>,
    pub config: PeripheralConfig,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OscillatorSelection {
    pub id: String,
    pub config: LoadCapacitors,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GpioSelection {
    pub id: String,
    pub label: String,
    pub pin: String,
    pub active_state: ActiveState,
    /// Preloaded from a reference board rather than added by hand.
    pub reference_board: bool,
}

/// A peripheral whose pins are fixed by the package ("checkbox"
/// peripherals); it is either on or off.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixedSelection {
    pub id: String,
    pub pin_functions: IndexMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectedPeripheral {
    Generic(GenericSelection),
    Oscillator(OscillatorSelection),
    Gpio(GpioSelection),
    Fixed(FixedSelection),
}

impl SelectedPeripheral {
    pub fn id(&self) -> &str {
        match self {
            SelectedPeripheral::Generic(g) => &g.id,
            SelectedPeripheral::Oscillator(o) => &o.id,
            SelectedPeripheral::Gpio(g) => &g.id,
            SelectedPeripheral::Fixed(f) => &f.id,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            SelectedPeripheral::Generic(_) => "a routed peripheral",
            SelectedPeripheral::Oscillator(_) => "an oscillator",
            SelectedPeripheral::Gpio(_) => "a GPIO",
            SelectedPeripheral::Fixed(_) => "a fixed-pin peripheral",
        }
    }

    /// Pins the record itself names.  Oscillators name none; their pins
    /// are derived from the catalog.
    pub fn named_pins(&self) -> Vec<&str> {
        match self {
            SelectedPeripheral::Generic(g) => g
                .pin_functions
                .keys()
                .map(String::as_str)
                .chain(g.chip_select.as_deref())
                .collect(),
            SelectedPeripheral::Fixed(f) => {
                f.pin_functions.keys().map(String::as_str).collect()
            }
            SelectedPeripheral::Gpio(g) => vec![g.pin.as_str()],
            SelectedPeripheral::Oscillator(_) => vec![],
        }
    }
}

/// Who holds a pin.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PinKind {
    /// Held by a selected peripheral, oscillator or GPIO.
    Peripheral,
    /// Dictated by the package; has no selected record behind it.
    System,
    /// Held by a GPIO that came with a reference board.
    ReferenceBoard,
}

/// One entry of the used-pin table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsedPin {
    pub owner: String,
    pub function: String,
    pub mandatory: bool,
    pub kind: PinKind,
}

/// A selected peripheral as it is stored and handed to emitters.
///
/// Every field but `id` is optional: snapshots written by older tools carry
/// a chip-select pin inside `pinFunctions`, or omit the config.  Turning a
/// record back into a selection goes through the allocation's mutation
/// operations, which is where it gets checked.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_state: Option<ActiveState>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub reference_board: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pin_functions: Option<IndexMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chip_select: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
}

impl Record {
    pub fn is_gpio(&self) -> bool {
        self.kind.as_deref() == Some(GPIO_FUNCTION)
    }

    /// Decodes `config` as `T`, or `T::default()` if there is none.
    pub fn config_or_default<T>(&self) -> Result<T, serde_json::Error>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        match &self.config {
            Some(v) => serde_json::from_value(v.clone()),
            None => Ok(T::default()),
        }
    }
}

impl From<&SelectedPeripheral> for Record {
    fn from(s: &SelectedPeripheral) -> Record {
        match s {
            SelectedPeripheral::Generic(g) => Record {
                id: g.id.clone(),
                pin_functions: Some(g.pin_functions.clone()),
                chip_select: g.chip_select.clone(),
                config: serde_json::to_value(&g.config).ok(),
                ..Default::default()
            },
            SelectedPeripheral::Oscillator(o) => Record {
                id: o.id.clone(),
                config: serde_json::to_value(o.config).ok(),
                ..Default::default()
            },
            SelectedPeripheral::Gpio(g) => Record {
                id: g.id.clone(),
                kind: Some(GPIO_FUNCTION.to_string()),
                label: Some(g.label.clone()),
                pin: Some(g.pin.clone()),
                active_state: Some(g.active_state),
                reference_board: g.reference_board,
                ..Default::default()
            },
            SelectedPeripheral::Fixed(f) => Record {
                id: f.id.clone(),
                pin_functions: Some(f.pin_functions.clone()),
                ..Default::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_shapes() {
        let generic = SelectedPeripheral::Generic(GenericSelection {
            id: "SPIM/SPIS21".into(),
            pin_functions: [("P1.04".to_string(), "SCK".to_string())]
                .into_iter()
                .collect(),
            chip_select: Some("P1.07".into()),
            config: PeripheralConfig {
                extra_cs_gpios: vec!["P1.08".into()],
                ..Default::default()
            },
        });
        assert_eq!(
            serde_json::to_value(Record::from(&generic)).unwrap(),
            json!({
                "id": "SPIM/SPIS21",
                "pinFunctions": { "P1.04": "SCK" },
                "chipSelect": "P1.07",
                "config": { "extraCsGpios": ["P1.08"] },
            })
        );

        let osc = SelectedPeripheral::Oscillator(OscillatorSelection {
            id: "HFXO".into(),
            config: LoadCapacitors::Internal { femtofarad: 15000 },
        });
        assert_eq!(
            serde_json::to_value(Record::from(&osc)).unwrap(),
            json!({
                "id": "HFXO",
                "config": {
                    "loadCapacitors": "internal",
                    "loadCapacitanceFemtofarad": 15000,
                },
            })
        );
        assert!(osc.named_pins().is_empty());

        let gpio = SelectedPeripheral::Gpio(GpioSelection {
            id: "GPIO_LED0".into(),
            label: "led0".into(),
            pin: "P2.09".into(),
            active_state: ActiveState::ActiveLow,
            reference_board: true,
        });
        let record = Record::from(&gpio);
        assert!(record.is_gpio());
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "id": "GPIO_LED0",
                "type": "GPIO",
                "label": "led0",
                "pin": "P2.09",
                "activeState": "active-low",
                "referenceBoard": true,
            })
        );
    }

    #[test]
    fn named_pins_include_chip_select() {
        let s = SelectedPeripheral::Generic(GenericSelection {
            id: "SPIM/SPIS21".into(),
            pin_functions: [("P1.04".to_string(), "SCK".to_string())]
                .into_iter()
                .collect(),
            chip_select: Some("P1.07".into()),
            config: PeripheralConfig::default(),
        });
        assert_eq!(s.named_pins(), ["P1.04", "P1.07"]);
    }

    #[test]
    fn loose_config_decoding() {
        let r: Record = serde_json::from_value(json!({
            "id": "UARTE20",
            "pinFunctions": { "P1.04": "TXD" },
            "config": { "disableRx": true },
        }))
        .unwrap();
        let c: PeripheralConfig = r.config_or_default().unwrap();
        assert!(c.disable_rx);

        let r = Record { id: "UARTE20".into(), ..Default::default() };
        assert_eq!(
            r.config_or_default::<PeripheralConfig>().unwrap(),
            PeripheralConfig::default()
        );
    }
}
