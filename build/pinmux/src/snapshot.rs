// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Saving and restoring a whole allocation.
//!
//! A snapshot is only ever applied by replaying its records through the
//! normal mutation operations on a reset copy of the allocation, so a
//! snapshot that would break an invariant is refused with the same error a
//! person making that selection by hand would get.  The copy replaces the
//! live allocation only once every record has gone in.

use crate::selected::{PeripheralConfig, PinKind, Record};
use crate::state::{PinSelection, Required};
use crate::{AllocError, Allocation};
use build_mcu::{Devkit, LoadCapacitors, HFXO, LFXO};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcu: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
    #[serde(default)]
    pub selected_peripherals: Vec<Record>,
    #[serde(default)]
    pub console_uart: Option<String>,
}

impl Snapshot {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        build_util::json_from_path(path)
    }
}

fn malformed(id: &str, reason: impl ToString) -> AllocError {
    AllocError::MalformedRecord {
        id: id.to_string(),
        reason: reason.to_string(),
    }
}

impl<'a> Allocation<'a> {
    /// Records every selection, in selection order.  `mcu` and `package`
    /// are left for the caller to fill in.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            mcu: None,
            package: None,
            selected_peripherals: self.selected().map(Record::from).collect(),
            console_uart: self.console.clone(),
        }
    }

    /// Replaces the allocation with the one `snapshot` describes.  On error
    /// the allocation is left as it was.
    pub fn apply_snapshot(
        &mut self,
        snapshot: &Snapshot,
    ) -> Result<(), AllocError> {
        let mut seen = BTreeSet::new();
        for r in &snapshot.selected_peripherals {
            if !seen.insert(r.id.as_str()) {
                return Err(malformed(&r.id, "listed more than once"));
            }
        }

        let mut next = self.clone();
        next.reset();
        for record in &snapshot.selected_peripherals {
            next.apply_record(record)?;
        }
        next.set_console(snapshot.console_uart.as_deref())?;
        *self = next;
        Ok(())
    }

    fn apply_record(&mut self, r: &Record) -> Result<(), AllocError> {
        if r.is_gpio() {
            let (Some(label), Some(pin)) = (&r.label, &r.pin) else {
                return Err(malformed(&r.id, "GPIO without a label and pin"));
            };
            let kind = if r.reference_board {
                PinKind::ReferenceBoard
            } else {
                PinKind::Peripheral
            };
            let active_state = r.active_state.unwrap_or_default();
            let id = self.place_gpio(label, pin, active_state, kind)?;
            if id != r.id {
                return Err(malformed(
                    &r.id,
                    format!("label {label} belongs to {id}"),
                ));
            }
            return Ok(());
        }

        let p = self.peripheral(&r.id)?;
        if p.is_oscillator() {
            let config = match &r.config {
                Some(_) => r
                    .config_or_default::<LoadCapacitors>()
                    .map_err(|e| malformed(&r.id, e))?,
                None => p.default_oscillator_config(),
            };
            return self.configure_oscillator(&r.id, config);
        }
        if p.is_fixed() {
            return self.enable_fixed(&r.id);
        }

        let config: PeripheralConfig =
            r.config_or_default().map_err(|e| malformed(&r.id, e))?;
        // Generated boards leave out signals their template doesn't route.
        self.place_routed(
            &r.id,
            &PinSelection {
                pin_functions: r.pin_functions.clone().unwrap_or_default(),
                chip_select: r.chip_select.clone(),
                config,
            },
            Required::Routed,
        )
    }

    /// Resets the allocation to a reference board's preloaded pin usage.
    /// Either the whole board goes in or nothing changes.
    pub fn apply_devkit(&mut self, devkit: &Devkit) -> Result<(), AllocError> {
        let mut next = self.clone();
        next.reset();
        for (id, config) in
            [(HFXO, devkit.oscillators.hfxo), (LFXO, devkit.oscillators.lfxo)]
        {
            if let Some(config) = config {
                next.configure_oscillator(id, config)?;
            }
        }

        let mut console = None;
        for dp in &devkit.peripherals {
            if next.peripheral(&dp.id)?.is_fixed() {
                next.enable_fixed(&dp.id)?;
            } else {
                let pin_functions = dp
                    .signals
                    .iter()
                    .map(|(signal, pin)| (pin.clone(), signal.clone()))
                    .collect();
                next.commit(
                    &dp.id,
                    &PinSelection { pin_functions, ..Default::default() },
                )?;
            }
            if dp.is_console {
                console = Some(dp.id.as_str());
            }
        }
        for g in &devkit.gpios {
            next.place_gpio(
                &g.label,
                &g.pin,
                g.active_state,
                PinKind::ReferenceBoard,
            )?;
        }
        next.set_console(console)?;

        log::info!(
            "loaded reference board {:?}: {} pin(s) in use",
            devkit.description,
            next.used_pins.len()
        );
        *self = next;
        Ok(())
    }
}
