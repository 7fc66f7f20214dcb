// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Crystal oscillators.
//!
//! An oscillator's record only carries its load-capacitor setup.  The pins it
//! occupies are derived from the catalog: each signal's first pattern names
//! one pin.  Terminals already reserved for the system crystal stay with the
//! system.

use crate::selected::{OscillatorSelection, PinKind, SelectedPeripheral};
use crate::{AllocError, Allocation};
use build_mcu::{CapacitanceRange, LoadCapacitors, Pin, Signal};

impl<'a> Allocation<'a> {
    /// Pins `id`'s signals are tied to, whoever holds them right now.
    pub(crate) fn oscillator_pins(
        &self,
        id: &str,
    ) -> Vec<(&'a Pin, &'a Signal)> {
        let package = self.package;
        let Some(p) = package.peripheral(id) else {
            return vec![];
        };
        p.signals
            .iter()
            .filter_map(|s| Some((package.pin_by_id(s.fixed_pin()?)?, s)))
            .collect()
    }

    /// The internal load capacitance `id` accepts.
    pub fn capacitance_range(&self, id: &str) -> CapacitanceRange {
        self.template(id)
            .and_then(|t| t.load_capacitance_range)
            .unwrap_or_else(|| CapacitanceRange::default_for(id))
    }

    /// Selects oscillator `id` with `config`, or replaces its configuration.
    pub fn configure_oscillator(
        &mut self,
        id: &str,
        config: LoadCapacitors,
    ) -> Result<(), AllocError> {
        let p = self.peripheral(id)?;
        if !p.is_oscillator() {
            return Err(AllocError::WrongKind {
                peripheral: id.to_string(),
                kind: crate::state::catalog_kind(p),
            });
        }
        if let LoadCapacitors::Internal { femtofarad } = config {
            let range = self.capacitance_range(id);
            if !range.contains(femtofarad) {
                return Err(AllocError::CapacitanceOutOfRange {
                    peripheral: id.to_string(),
                    femtofarad,
                    range,
                });
            }
        }
        for (pin, _) in self.oscillator_pins(id) {
            if !self.is_system(&pin.name) {
                self.check_free(&pin.name, id)?;
            }
        }

        self.release(id);
        self.place_oscillator(id, config);
        Ok(())
    }

    /// Records `id` and claims its free derived pins.  Callers have already
    /// made sure nobody else holds them.
    pub(crate) fn place_oscillator(
        &mut self,
        id: &str,
        config: LoadCapacitors,
    ) {
        for (pin, signal) in self.oscillator_pins(id) {
            if self.is_system(&pin.name) {
                continue;
            }
            self.claim(pin, id, &signal.name, true, PinKind::Peripheral);
        }
        log::debug!("{id}: {config:?}");
        self.selected.insert(
            id.to_string(),
            SelectedPeripheral::Oscillator(OscillatorSelection {
                id: id.to_string(),
                config,
            }),
        );
    }
}
