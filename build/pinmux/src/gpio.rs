// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::selected::{
    GpioSelection, PinKind, SelectedPeripheral, GPIO_FUNCTION,
};
use crate::{AllocError, Allocation};
use build_mcu::ActiveState;

const MAX_LABEL_LEN: usize = 20;

/// Id under which the GPIO labeled `label` is selected.
pub fn gpio_id(label: &str) -> String {
    format!("GPIO_{}", label.to_ascii_uppercase())
}

fn valid_label(label: &str) -> bool {
    !label.is_empty()
        && label.len() <= MAX_LABEL_LEN
        && label
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

impl<'a> Allocation<'a> {
    /// Adds a named GPIO on `pin`, or moves an existing one there.  Returns
    /// the GPIO's id.
    pub fn commit_gpio(
        &mut self,
        label: &str,
        pin: &str,
        active_state: ActiveState,
    ) -> Result<String, AllocError> {
        self.place_gpio(label, pin, active_state, PinKind::Peripheral)
    }

    pub(crate) fn place_gpio(
        &mut self,
        label: &str,
        pin: &str,
        active_state: ActiveState,
        kind: PinKind,
    ) -> Result<String, AllocError> {
        if !valid_label(label) {
            return Err(AllocError::InvalidGpioLabel(label.to_string()));
        }
        let id = gpio_id(label);
        let pin = self.lookup_pin(pin)?;
        if pin.routable_id().is_none() {
            return Err(AllocError::PinNotAllowed {
                peripheral: id,
                signal: GPIO_FUNCTION.to_string(),
                pin: pin.name.clone(),
            });
        }
        match self.selected.get(&id) {
            Some(SelectedPeripheral::Gpio(_)) | None => (),
            Some(other) => {
                return Err(AllocError::WrongKind {
                    peripheral: id.clone(),
                    kind: other.kind_name(),
                });
            }
        }
        self.check_free(&pin.name, &id)?;

        self.release(&id);
        self.claim(pin, &id, GPIO_FUNCTION, true, kind);
        self.selected.insert(
            id.clone(),
            SelectedPeripheral::Gpio(GpioSelection {
                id: id.clone(),
                label: label.to_string(),
                pin: pin.name.clone(),
                active_state,
                reference_board: kind == PinKind::ReferenceBoard,
            }),
        );
        Ok(id)
    }
}
