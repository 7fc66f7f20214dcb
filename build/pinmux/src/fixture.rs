// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A small made-up package used across the unit tests.
//!
//! Port 0 is taken up by the LFXO (P0.00, P0.01) and NFC antenna (P0.02,
//! P0.03) pins.  Port 1 is general purpose; P1.05, P1.08 and P1.09 are
//! clock capable.  UARTE21 and SPIM/SPIS21 share a base address.

use build_mcu::{Package, Templates};
use serde_json::{json, Value};

pub fn package() -> Package {
    let package: Package = serde_json::from_value(package_json()).unwrap();
    package.with_oscillators()
}

pub fn templates() -> Templates {
    serde_json::from_value(templates_json()).unwrap()
}

/// The package as it would appear in a catalog file.
pub fn package_json() -> Value {
    let mut pins = vec![];
    for n in 0..4 {
        pins.push(json!({
            "name": format!("P0.{n:02}"),
            "functions": ["Digital I/O"],
            "defaultType": "io",
        }));
    }
    for n in 0..10 {
        pins.push(json!({
            "name": format!("P1.{n:02}"),
            "functions": ["Digital I/O"],
            "isClockCapable": matches!(n, 5 | 8 | 9),
            "defaultType": "io",
        }));
    }
    for n in 0..4 {
        pins.push(json!({
            "name": format!("P2.{n:02}"),
            "functions": ["Digital I/O"],
            "defaultType": "io",
        }));
    }
    pins.push(json!({ "name": "XC1", "functions": ["Crystal"],
                      "defaultType": "crystal_hf" }));
    pins.push(json!({ "name": "XC2", "functions": ["Crystal"],
                      "defaultType": "crystal_hf" }));
    pins.push(json!({ "name": "VDD", "functions": ["Power"],
                      "defaultType": "power" }));

    json!({
        "partInfo": { "packageType": "QFN" },
        "pins": pins,
        "socPeripherals": [
            {
                "id": "UARTE20",
                "type": "UART",
                "baseAddress": "0x500C6000",
                "signals": [
                    { "name": "TXD", "isMandatory": true, "direction": "output",
                      "allowedGpio": ["P1.04", "P1*"] },
                    { "name": "RXD", "isMandatory": true, "direction": "input",
                      "allowedGpio": ["P1.05", "P1*"] },
                    { "name": "RTS", "direction": "output",
                      "allowedGpio": ["P1*"] },
                    { "name": "CTS", "direction": "input",
                      "allowedGpio": ["P1*"] },
                ],
            },
            {
                "id": "UARTE21",
                "type": "UART",
                "baseAddress": "0x500C7000",
                "signals": [
                    { "name": "TXD", "isMandatory": true, "allowedGpio": ["P2*"] },
                    { "name": "RXD", "isMandatory": true, "allowedGpio": ["P2*"] },
                ],
            },
            {
                "id": "SPIM/SPIS21",
                "type": "SPI",
                "baseAddress": "0x500C7000",
                "signals": [
                    { "name": "CS", "isMandatory": true, "allowedGpio": ["P2*", "P1*"] },
                    { "name": "SCK", "isMandatory": true,
                      "requiresClockCapablePin": true, "allowedGpio": ["P1*"] },
                    { "name": "MOSI", "allowedGpio": ["P1*"] },
                    { "name": "MISO", "allowedGpio": ["P1*"] },
                ],
            },
            {
                "id": "TWIM/TWIS22",
                "type": "I2C",
                "baseAddress": "0x500C8000",
                "signals": [
                    { "name": "SCL", "isMandatory": true,
                      "requiresClockCapablePin": true, "allowedGpio": ["P1*"] },
                    { "name": "SDA", "isMandatory": true, "allowedGpio": ["P1*"] },
                ],
            },
            {
                "id": "PWM20",
                "type": "PWM",
                "baseAddress": "0x500D2000",
                "signals": [
                    { "name": "OUT0", "allowedGpio": ["P1*"] },
                    { "name": "OUT1", "allowedGpio": ["P1*"] },
                ],
            },
            {
                "id": "SAADC",
                "type": "ADC",
                "baseAddress": "0x500D5000",
                "signals": [
                    { "name": "AIN0", "allowedGpio": ["P1.04"] },
                ],
            },
            {
                "id": "NFCT",
                "type": "NFCT",
                "uiHint": "checkbox",
                "signals": [
                    { "name": "NFC1", "isMandatory": true, "allowedGpio": ["P0.02"] },
                    { "name": "NFC2", "isMandatory": true, "allowedGpio": ["P0.03"] },
                ],
            },
            {
                "id": "LFXO",
                "uiHint": "oscillator",
                "signals": [
                    { "name": "XL1", "isMandatory": true, "allowedGpio": ["P0.00"] },
                    { "name": "XL2", "isMandatory": true, "allowedGpio": ["P0.01"] },
                ],
                "config": { "loadCapacitors": "internal",
                            "loadCapacitanceFemtofarad": 15000 },
            },
            {
                "id": "UARTE30",
                "type": "UART",
                "baseAddress": "0x50104000",
                "signals": [
                    { "name": "TXD", "isMandatory": true, "allowedGpio": ["P0*"] },
                    { "name": "RXD", "isMandatory": true, "allowedGpio": ["P0*"] },
                ],
            },
        ],
    })
}

pub fn templates_json() -> Value {
    let uart = json!({
        "type": "UART",
        "signalMappings": {
            "TXD": "UART_TX", "RXD": "UART_RX",
            "RTS": "UART_RTS", "CTS": "UART_CTS",
        },
    });
    json!({
        "templates": {
            "UARTE20": uart,
            "UARTE21": uart,
            "UARTE30": uart,
            "SPIM/SPIS21": {
                "type": "SPI",
                "outOfBandSignals": ["CS"],
                "signalMappings": {
                    "SCK": "SPIM_SCK", "MOSI": "SPIM_MOSI", "MISO": "SPIM_MISO",
                },
            },
            "TWIM/TWIS22": {
                "type": "I2C",
                "signalMappings": { "SCL": "TWIM_SCL", "SDA": "TWIM_SDA" },
            },
            "PWM20": {
                "type": "PWM",
                "signalMappings": { "OUT0": "PWM_OUT0" },
            },
            "ADC": { "type": "ADC", "noPinctrl": true },
            "NFCT": { "type": "NFCT", "noPinctrl": true },
            "LFXO": {
                "loadCapacitanceRange": { "min": 4000, "max": 18000, "step": 500 },
            },
        },
    })
}
