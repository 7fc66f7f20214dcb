// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Function string that marks a pin as usable for peripheral routing.
pub const DIGITAL_IO: &str = "Digital I/O";

/// `defaultType` of the two terminals of the high-frequency crystal.
pub const CRYSTAL_HF: &str = "crystal_hf";

/// Port and number of a GPIO-capable pin, parsed out of its canonical
/// `P<port>.<number>` name.
///
/// Ordering is by port, then number, which is the order pins are presented
/// in everywhere.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PinId {
    pub port: u8,
    pub number: u8,
}

impl PinId {
    pub fn new(port: u8, number: u8) -> Self {
        Self { port, number }
    }

    /// Parses `P<port>.<number>`; anything else (supply pins, crystal
    /// terminals named after their function, ...) is `None`.
    pub fn parse(name: &str) -> Option<Self> {
        let rest = name.strip_prefix('P')?;
        let (port, number) = rest.split_once('.')?;
        Some(Self { port: parse_digits(port)?, number: parse_digits(number)? })
    }
}

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}.{:02}", self.port, self.number)
    }
}

/// Parses a non-empty run of ASCII digits. `str::parse` alone would also
/// accept a leading `+`.
pub(crate) fn parse_digits(s: &str) -> Option<u8> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// One physical pin of a package, as listed in the package file.
///
/// Placement fields are carried for renderers and otherwise ignored.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pin {
    pub name: String,
    #[serde(default)]
    pub functions: Vec<String>,
    #[serde(default)]
    pub is_clock_capable: bool,
    #[serde(default)]
    pub default_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_pin_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<String>,
}

impl Pin {
    pub fn id(&self) -> Option<PinId> {
        PinId::parse(&self.name)
    }

    pub fn is_digital_io(&self) -> bool {
        self.functions.iter().any(|f| f == DIGITAL_IO)
    }

    /// A pin can carry a peripheral signal only if it is digital I/O *and*
    /// has a parseable port/number.
    pub fn routable_id(&self) -> Option<PinId> {
        if self.is_digital_io() {
            self.id()
        } else {
            None
        }
    }
}
