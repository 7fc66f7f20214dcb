// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::resolve::preferred_candidates;
use crate::AllocError;
use build_mcu::{
    Peripheral, PeripheralTemplate, PeripheralType, Pin, Signal, CHIP_SELECT,
};
use indexmap::IndexMap;
use std::collections::BTreeSet;

/// Pins picked for a peripheral without a human choosing them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AutoAssignment {
    /// Pin name to signal name, in signal declaration order.
    pub pin_functions: IndexMap<String, String>,
    pub chip_select: Option<String>,
}

impl AutoAssignment {
    pub fn is_empty(&self) -> bool {
        self.pin_functions.is_empty() && self.chip_select.is_none()
    }
}

/// Whether `peripheral`'s `CS` signal goes into the dedicated chip-select
/// slot rather than the pin-function map.
pub fn routes_chip_select(
    peripheral: &Peripheral,
    template: Option<&PeripheralTemplate>,
) -> bool {
    peripheral.kind == PeripheralType::Spi
        || template.is_some_and(|t| t.is_out_of_band(CHIP_SELECT))
}

/// Whether `signal` is something pin routing deals with at all.  Signals
/// without patterns never are; with a device-tree template, only the
/// signals it maps (plus a separately routed chip select) are, and a
/// `noPinctrl` template routes nothing.
pub fn is_routed(
    signal: &Signal,
    template: Option<&PeripheralTemplate>,
    separate_cs: bool,
) -> bool {
    match template {
        Some(t) if t.no_pinctrl => false,
        _ if signal.allowed_gpio.is_empty() => false,
        _ if separate_cs && signal.name == CHIP_SELECT => true,
        Some(t) => !t.is_out_of_band(&signal.name) && t.maps(&signal.name),
        None => true,
    }
}

/// Walks `peripheral`'s signals in declaration order and gives each the
/// first preferred candidate that isn't used yet.
///
/// When a device-tree template is known, it decides which signals get
/// routed at all: out-of-band signals and signals it has no mapping for are
/// skipped, and a `noPinctrl` template routes nothing.  The chip select is
/// resolved last, whatever its position.
///
/// A mandatory signal with no free pin fails the whole peripheral; optional
/// signals are left out.
pub fn auto_assign(
    peripheral: &Peripheral,
    template: Option<&PeripheralTemplate>,
    pins: &[Pin],
    is_used: impl Fn(&str) -> bool,
) -> Result<AutoAssignment, AllocError> {
    let mut out = AutoAssignment::default();
    if template.is_some_and(|t| t.no_pinctrl) {
        return Ok(out);
    }

    let separate_cs = routes_chip_select(peripheral, template);
    let mut taken = BTreeSet::new();
    let mut pick = |signal: &Signal| -> Result<Option<String>, AllocError> {
        let found = preferred_candidates(signal, pins)
            .into_iter()
            .find(|p| !is_used(&p.name) && !taken.contains(&p.name));
        match found {
            Some(pin) => {
                taken.insert(pin.name.clone());
                Ok(Some(pin.name.clone()))
            }
            None if signal.is_mandatory => {
                log::warn!(
                    "could not find available pin for mandatory signal {} \
                     on {}",
                    signal.name,
                    peripheral.id
                );
                Err(AllocError::Unresolvable {
                    peripheral: peripheral.id.clone(),
                    signal: signal.name.clone(),
                })
            }
            None => {
                log::debug!(
                    "{}: no free pin for optional signal {}, leaving it out",
                    peripheral.id,
                    signal.name
                );
                Ok(None)
            }
        }
    };

    for signal in &peripheral.signals {
        if separate_cs && signal.name == CHIP_SELECT {
            continue;
        }
        if !is_routed(signal, template, separate_cs) {
            continue;
        }
        if let Some(pin) = pick(signal)? {
            out.pin_functions.insert(pin, signal.name.clone());
        }
    }

    if separate_cs {
        if let Some(cs) = peripheral.signal(CHIP_SELECT) {
            if is_routed(cs, template, separate_cs) {
                out.chip_select = pick(cs)?;
            }
        }
    }

    if out.is_empty() {
        return Err(AllocError::NothingAssigned(peripheral.id.clone()));
    }
    Ok(out)
}
