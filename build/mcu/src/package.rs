// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::peripheral::{Peripheral, PeripheralType, UiHint, HFXO, LFXO};
use crate::pin::{Pin, PinId, CRYSTAL_HF};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartInfo {
    #[serde(default)]
    pub package_type: Option<String>,
}

/// A package file: the pins of one chip package plus the peripherals the
/// chip offers.  Read-only once loaded.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    #[serde(default)]
    pub part_info: Option<PartInfo>,
    #[serde(default)]
    pub pins: Vec<Pin>,
    #[serde(default)]
    pub soc_peripherals: Vec<Peripheral>,
}

impl Package {
    /// Loads a package file and normalizes its oscillators.
    pub fn from_path(path: &Path) -> Result<Self> {
        let package: Package = build_util::json_from_path(path)?;
        Ok(package.with_oscillators())
    }

    /// Makes sure both crystal oscillators exist and are marked as such.
    /// Packages that don't describe them get signal-less stand-ins, so the
    /// allocator can always treat HFXO as present.
    pub fn with_oscillators(mut self) -> Self {
        for id in [LFXO, HFXO] {
            match self.soc_peripherals.iter_mut().find(|p| p.id == id) {
                Some(p) => {
                    p.ui_hint = Some(UiHint::Oscillator);
                    if let PeripheralType::Other(_) = p.kind {
                        p.kind = PeripheralType::Oscillator;
                    }
                }
                None => {
                    self.soc_peripherals
                        .push(Peripheral::synthetic_oscillator(id));
                }
            }
        }
        self
    }

    pub fn peripheral(&self, id: &str) -> Option<&Peripheral> {
        self.soc_peripherals.iter().find(|p| p.id == id)
    }

    /// Looks a pin up by name.  `P1.4` finds `P1.04`.
    pub fn pin(&self, name: &str) -> Option<&Pin> {
        match PinId::parse(name) {
            Some(id) => self.pin_by_id(id),
            None => self.pins.iter().find(|p| p.name == name),
        }
    }

    pub fn pin_by_id(&self, id: PinId) -> Option<&Pin> {
        self.pins.iter().find(|p| p.id() == Some(id))
    }

    /// The two high-frequency crystal terminals, in catalog order, if the
    /// package has exactly two.
    pub fn crystal_pins(&self) -> Option<[&Pin; 2]> {
        let mut it = self.pins.iter().filter(|p| p.default_type == CRYSTAL_HF);
        let (a, b) = (it.next()?, it.next()?);
        if it.next().is_some() {
            return None;
        }
        Some([a, b])
    }

    pub fn peripheral_suggestion(&self, id: &str) -> String {
        // Suggest only for very small differences
        const MAX_DISTANCE: usize = 3;

        let mut scored: Vec<_> = self
            .soc_peripherals
            .iter()
            .filter_map(|p| {
                let distance = strsim::damerau_levenshtein(id, &p.id);
                (distance <= MAX_DISTANCE).then_some((distance, &p.id))
            })
            .collect();
        scored.sort();
        let mut out = format!("'{id}' is not a peripheral of this package.");
        if let Some((_, s)) = scored.first() {
            out.push_str(&format!(" Did you mean '{s}'?"));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn package() -> Package {
        serde_json::from_value::<Package>(json!({
            "partInfo": { "packageType": "QFN48" },
            "pins": [
                { "name": "P1.04", "functions": ["Digital I/O"] },
                { "name": "XC1", "defaultType": "crystal_hf" },
                { "name": "XC2", "defaultType": "crystal_hf" },
            ],
            "socPeripherals": [
                { "id": "UARTE20", "type": "UART", "signals": [] },
                { "id": "LFXO", "uiHint": "oscillator", "signals": [
                    { "name": "XL1", "allowedGpio": ["P1.00"] },
                ] },
            ],
        }))
        .unwrap()
        .with_oscillators()
    }

    #[test]
    fn oscillators_are_filled_in() {
        let p = package();
        assert!(p.peripheral(HFXO).unwrap().is_oscillator());
        assert!(p.peripheral(HFXO).unwrap().signals.is_empty());
        let lfxo = p.peripheral(LFXO).unwrap();
        assert_eq!(lfxo.kind, PeripheralType::Oscillator);
        assert_eq!(lfxo.signals.len(), 1);
        assert_eq!(
            p.soc_peripherals.iter().filter(|p| p.id == LFXO).count(),
            1
        );
    }

    #[test]
    fn lookups() {
        let p = package();
        assert_eq!(p.pin("P1.4").unwrap().name, "P1.04");
        assert_eq!(p.pin("XC1").unwrap().name, "XC1");
        assert!(p.pin("P9.00").is_none());
        let [a, b] = p.crystal_pins().unwrap();
        assert_eq!((a.name.as_str(), b.name.as_str()), ("XC1", "XC2"));
    }

    #[test]
    fn suggestions() {
        let p = package();
        assert_eq!(
            p.peripheral_suggestion("UARTE21"),
            "'UARTE21' is not a peripheral of this package. \
             Did you mean 'UARTE20'?"
        );
        assert_eq!(
            p.peripheral_suggestion("SPIM00"),
            "'SPIM00' is not a peripheral of this package."
        );
    }
}
