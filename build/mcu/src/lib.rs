// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Static chip descriptions: the pins of a package, the peripherals a chip
//! offers, and the catalog directory that ties them together.
//!
//! Everything in here is read-only once loaded.  The allocator in
//! `build-pinmux` only ever queries it.

mod devkit;
mod manifest;
mod package;
mod pattern;
mod peripheral;
mod pin;
mod template;
mod validate;

pub use devkit::{
    ActiveState, Devkit, DevkitGpio, DevkitOscillators, DevkitPeripheral,
};
pub use manifest::{
    CatalogDir, Manifest, McuEntry, PackageEntry, MANIFEST_FILE,
    TEMPLATES_FILE,
};
pub use package::{Package, PartInfo};
pub use pattern::{PatternError, PinPattern};
pub use peripheral::{
    BaseAddress, CapacitanceRange, Direction, LoadCapacitors, Peripheral,
    PeripheralType, Signal, UiHint, CHIP_SELECT, HFXO, LFXO, UART_RXD,
};
pub use pin::{Pin, PinId, CRYSTAL_HF, DIGITAL_IO};
pub use template::{PeripheralTemplate, Templates};
pub use validate::{validate_catalog, validate_package, Defect, Report};
