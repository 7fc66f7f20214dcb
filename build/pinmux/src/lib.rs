// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Pin and base-address allocation for one chip package.
//!
//! [`Allocation`] is the whole mutable state: which peripherals are selected,
//! which pins each one holds, and which base addresses are claimed.  It
//! borrows the static catalog from `build-mcu` and is only changed through
//! its `&mut self` operations, each of which either applies in full or
//! returns an [`AllocError`] with nothing changed:
//!
//! - [`Allocation::commit`] for routed peripherals (UART, SPI, ...),
//! - [`Allocation::configure_oscillator`] for the crystal oscillators,
//! - [`Allocation::enable_fixed`] for peripherals with fixed pins,
//! - [`Allocation::commit_gpio`] for named GPIOs,
//! - [`Allocation::remove`], [`Allocation::reset`],
//! - [`Allocation::apply_snapshot`] and [`Allocation::apply_devkit`].
//!
//! Automatic assignment ([`auto_assign`], [`Allocation::auto_select`]) and
//! the batch board generator in [`batch`] are built on the same operations.

mod assign;
pub mod batch;
mod error;
mod gpio;
mod oscillator;
mod resolve;
mod selected;
mod snapshot;
mod state;

#[cfg(test)]
mod fixture;

pub use assign::{auto_assign, is_routed, routes_chip_select, AutoAssignment};
pub use error::AllocError;
pub use gpio::gpio_id;
pub use resolve::{allows, candidates, preferred_candidates};
pub use selected::{
    FixedSelection, GenericSelection, GpioSelection, OscillatorSelection,
    PeripheralConfig, PinKind, Record, SelectedPeripheral, UsedPin,
    GPIO_FUNCTION,
};
pub use snapshot::Snapshot;
pub use state::{
    Allocation, Candidate, PinSelection, SelectionPlan, SignalChoice,
    SYSTEM_CRYSTAL_OWNER,
};
