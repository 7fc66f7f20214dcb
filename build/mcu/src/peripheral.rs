// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::pattern::{PatternError, PinPattern};
use crate::pin::PinId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of the always-present high-frequency crystal oscillator.
pub const HFXO: &str = "HFXO";

/// Identifier of the optional low-frequency crystal oscillator.
pub const LFXO: &str = "LFXO";

/// Name of the chip-select signal that SPI controllers route out of band.
pub const CHIP_SELECT: &str = "CS";

/// Name of the UART receive signal, which `disableRx` makes optional.
pub const UART_RXD: &str = "RXD";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PeripheralType {
    Uart,
    Spi,
    I2c,
    Pwm,
    Adc,
    Nfct,
    Oscillator,
    Gpio,
    Other(String),
}

impl Default for PeripheralType {
    fn default() -> Self {
        PeripheralType::Other(String::new())
    }
}

impl From<String> for PeripheralType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "UART" => PeripheralType::Uart,
            "SPI" => PeripheralType::Spi,
            "I2C" => PeripheralType::I2c,
            "PWM" => PeripheralType::Pwm,
            "ADC" => PeripheralType::Adc,
            "NFCT" => PeripheralType::Nfct,
            "OSCILLATOR" => PeripheralType::Oscillator,
            "GPIO" => PeripheralType::Gpio,
            _ => PeripheralType::Other(s),
        }
    }
}

impl From<PeripheralType> for String {
    fn from(t: PeripheralType) -> String {
        t.to_string()
    }
}

impl fmt::Display for PeripheralType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PeripheralType::Uart => "UART",
            PeripheralType::Spi => "SPI",
            PeripheralType::I2c => "I2C",
            PeripheralType::Pwm => "PWM",
            PeripheralType::Adc => "ADC",
            PeripheralType::Nfct => "NFCT",
            PeripheralType::Oscillator => "OSCILLATOR",
            PeripheralType::Gpio => "GPIO",
            PeripheralType::Other(s) => s,
        };
        f.write_str(s)
    }
}

/// Memory-mapped base address.  Catalog files spell these as hex strings;
/// two peripherals with the same address are instances of one block and
/// can't be used at the same time.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
    Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct BaseAddress(pub u64);

impl TryFrom<String> for BaseAddress {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        let t = s.trim();
        let parsed = match t.strip_prefix("0x").or_else(|| t.strip_prefix("0X"))
        {
            Some(hex) => u64::from_str_radix(&hex.replace('_', ""), 16),
            None => t.parse(),
        };
        parsed
            .map(BaseAddress)
            .map_err(|_| format!("invalid base address \"{s}\""))
    }
}

impl From<BaseAddress> for String {
    fn from(a: BaseAddress) -> String {
        a.to_string()
    }
}

impl fmt::Display for BaseAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// How a peripheral is presented and, more importantly, how its pins are
/// chosen.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum UiHint {
    /// Fixed single-candidate pins plus a load-capacitance config.
    Oscillator,
    /// Fixed single-candidate pins, toggled on and off as a whole.
    Checkbox,
    Other(String),
}

impl From<String> for UiHint {
    fn from(s: String) -> Self {
        match s.as_str() {
            "oscillator" => UiHint::Oscillator,
            "checkbox" => UiHint::Checkbox,
            _ => UiHint::Other(s),
        }
    }
}

impl From<UiHint> for String {
    fn from(h: UiHint) -> String {
        match h {
            UiHint::Oscillator => "oscillator".to_string(),
            UiHint::Checkbox => "checkbox".to_string(),
            UiHint::Other(s) => s,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Input,
    Output,
    #[default]
    #[serde(alias = "inout")]
    Bidirectional,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    pub name: String,
    #[serde(default)]
    pub is_mandatory: bool,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub requires_clock_capable_pin: bool,
    /// Raw patterns, in preference order.  These are kept as strings so that
    /// a malformed entry only costs that entry its candidates; validation
    /// reports it separately.
    #[serde(default)]
    pub allowed_gpio: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Signal {
    pub fn patterns(
        &self,
    ) -> impl Iterator<Item = Result<PinPattern, PatternError>> + '_ {
        self.allowed_gpio.iter().map(|p| p.parse())
    }

    /// The single implicit pin of a fixed-pin signal: the first pattern, if
    /// it names one pin.
    pub fn fixed_pin(&self) -> Option<PinId> {
        match self.allowed_gpio.first()?.parse() {
            Ok(PinPattern::Pin(id)) => Some(id),
            _ => None,
        }
    }
}

/// Load-capacitor setup of a crystal oscillator.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "loadCapacitors", rename_all = "lowercase")]
pub enum LoadCapacitors {
    Internal {
        #[serde(rename = "loadCapacitanceFemtofarad")]
        femtofarad: u32,
    },
    External,
}

impl Default for LoadCapacitors {
    fn default() -> Self {
        LoadCapacitors::Internal { femtofarad: 15000 }
    }
}

/// Discrete range of internal load capacitance, in femtofarads.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapacitanceRange {
    pub min: u32,
    pub max: u32,
    pub step: u32,
}

impl CapacitanceRange {
    /// Range used when the device-tree templates don't give one.
    pub fn default_for(oscillator: &str) -> Self {
        if oscillator == LFXO {
            CapacitanceRange { min: 4000, max: 18000, step: 500 }
        } else {
            CapacitanceRange { min: 4000, max: 17000, step: 250 }
        }
    }

    pub fn contains(&self, femtofarad: u32) -> bool {
        self.step != 0
            && (self.min..=self.max).contains(&femtofarad)
            && (femtofarad - self.min) % self.step == 0
    }
}

impl fmt::Display for CapacitanceRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={} fF in steps of {}", self.min, self.max, self.step)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Peripheral {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: PeripheralType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_address: Option<BaseAddress>,
    #[serde(default)]
    pub signals: Vec<Signal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_hint: Option<UiHint>,
    /// Peripheral-specific defaults.  Only oscillators give this a meaning
    /// (see `default_oscillator_config`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Peripheral {
    pub fn signal(&self, name: &str) -> Option<&Signal> {
        self.signals.iter().find(|s| s.name == name)
    }

    pub fn is_oscillator(&self) -> bool {
        self.ui_hint == Some(UiHint::Oscillator)
    }

    pub fn is_fixed(&self) -> bool {
        self.ui_hint == Some(UiHint::Checkbox)
    }

    pub fn default_oscillator_config(&self) -> LoadCapacitors {
        self.config
            .as_ref()
            .and_then(|c| serde_json::from_value(c.clone()).ok())
            .unwrap_or_default()
    }

    /// Creates the stand-in used when a package file doesn't describe one of
    /// the crystal oscillators.
    pub fn synthetic_oscillator(id: &str) -> Self {
        let description = if id == HFXO {
            "High Frequency Crystal Oscillator"
        } else {
            "Low Frequency Crystal Oscillator"
        };
        Peripheral {
            id: id.to_string(),
            kind: PeripheralType::Oscillator,
            description: Some(description.to_string()),
            base_address: None,
            signals: vec![],
            ui_hint: Some(UiHint::Oscillator),
            config: serde_json::to_value(LoadCapacitors::default()).ok(),
            tags: vec![],
        }
    }
}
