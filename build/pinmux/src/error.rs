// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use build_mcu::{BaseAddress, CapacitanceRange};

/// Why an allocation request was refused.
///
/// Every one of these is recoverable: the state that produced it is exactly
/// as it was before the request.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
    #[error("base address {address} is already claimed by {owner}")]
    AddressConflict { address: BaseAddress, owner: String },
    #[error("pin {pin} is already used by {owner}")]
    PinAlreadyUsed { pin: String, owner: String },
    #[error(
        "{peripheral} is missing mandatory signal(s): {}",
        .signals.join(", ")
    )]
    MissingMandatorySignal { peripheral: String, signals: Vec<String> },
    #[error("unknown peripheral {0}")]
    UnknownPeripheral(String),
    #[error("unknown pin {0}")]
    UnknownPin(String),
    #[error("{peripheral} has no signal named {signal}")]
    UnknownSignal { peripheral: String, signal: String },
    #[error("pin {pin} is not a candidate for {peripheral}.{signal}")]
    PinNotAllowed { peripheral: String, signal: String, pin: String },
    #[error("{peripheral}.{signal} is assigned more than one pin")]
    SignalAssignedTwice { peripheral: String, signal: String },
    #[error("{0} cannot be removed")]
    NotRemovable(String),
    #[error("{0} is not selected")]
    NotSelected(String),
    #[error("{peripheral} is {kind} and can't be configured that way")]
    WrongKind { peripheral: String, kind: &'static str },
    #[error("{peripheral}: {femtofarad} fF is outside {range}")]
    CapacitanceOutOfRange {
        peripheral: String,
        femtofarad: u32,
        range: CapacitanceRange,
    },
    #[error(
        "invalid GPIO label \"{0}\" (lowercase letters, digits and \
         underscores, at most 20 characters)"
    )]
    InvalidGpioLabel(String),
    #[error("{0} is not a selected UART")]
    InvalidConsole(String),
    #[error("{peripheral}: no free pin for mandatory signal {signal}")]
    Unresolvable { peripheral: String, signal: String },
    #[error("{0}: no pin could be assigned")]
    NothingAssigned(String),
    #[error("{peripheral}: extra chip select {pin} is listed more than once")]
    DuplicateCsGpio { peripheral: String, pin: String },
    #[error("record {id}: {reason}")]
    MalformedRecord { id: String, reason: String },
}
