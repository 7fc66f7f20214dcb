// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Candidate pins for a signal.
//!
//! These are pure filters over the package's pin list; they can be called as
//! often as needed and never look at allocation state.

use build_mcu::{Pin, PinId, PinPattern, Signal};
use std::collections::BTreeSet;

/// Parsed patterns of a signal.  Malformed entries are dropped, which costs
/// them their candidates and nothing else.
fn patterns(signal: &Signal) -> Vec<PinPattern> {
    signal
        .patterns()
        .filter_map(|p| match p {
            Ok(p) => Some(p),
            Err(e) => {
                log::debug!("{}: ignoring {e}", signal.name);
                None
            }
        })
        .collect()
}

/// Returns the pin's id if it could carry `signal` at all, ignoring
/// patterns.
fn eligible(signal: &Signal, pin: &Pin) -> Option<PinId> {
    let id = pin.routable_id()?;
    if signal.requires_clock_capable_pin && !pin.is_clock_capable {
        return None;
    }
    Some(id)
}

fn eligible_sorted<'p>(
    signal: &Signal,
    pins: &'p [Pin],
) -> Vec<(PinId, &'p Pin)> {
    let mut out: Vec<_> = pins
        .iter()
        .filter_map(|p| Some((eligible(signal, p)?, p)))
        .collect();
    out.sort_by_key(|(id, _)| *id);
    out
}

/// Every pin that can carry `signal`, ascending by port then number.
pub fn candidates<'p>(signal: &Signal, pins: &'p [Pin]) -> Vec<&'p Pin> {
    let patterns = patterns(signal);
    eligible_sorted(signal, pins)
        .into_iter()
        .filter(|(id, _)| patterns.iter().any(|pat| pat.matches(*id)))
        .map(|(_, p)| p)
        .collect()
}

/// The same pins as `candidates`, in the order automatic assignment should
/// try them: pattern declaration order first, so that an explicitly listed
/// pin wins over a wildcard listed after it, then ascending within each
/// wildcard.
pub fn preferred_candidates<'p>(
    signal: &Signal,
    pins: &'p [Pin],
) -> Vec<&'p Pin> {
    let eligible = eligible_sorted(signal, pins);
    let mut seen = BTreeSet::new();
    let mut out = vec![];
    for pat in patterns(signal) {
        for (id, pin) in &eligible {
            if pat.matches(*id) && seen.insert(*id) {
                out.push(*pin);
            }
        }
    }
    out
}

/// Whether `pin` is one of `signal`'s candidates.
pub fn allows(signal: &Signal, pin: &Pin) -> bool {
    match eligible(signal, pin) {
        Some(id) => patterns(signal).iter().any(|pat| pat.matches(id)),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pins() -> Vec<Pin> {
        let mut pins: Vec<Pin> = (0..10)
            .rev()
            .map(|n| {
                serde_json::from_value(json!({
                    "name": format!("P1.{n:02}"),
                    "functions": ["Digital I/O"],
                    "isClockCapable": n % 3 == 0,
                }))
                .unwrap()
            })
            .collect();
        pins.push(
            serde_json::from_value(json!({
                "name": "P2.00",
                "functions": ["Digital I/O"],
            }))
            .unwrap(),
        );
        pins.push(
            serde_json::from_value(json!({
                "name": "P2.01",
                "functions": ["Analog input"],
            }))
            .unwrap(),
        );
        pins.push(
            serde_json::from_value(json!({
                "name": "VDD",
                "functions": ["Digital I/O"],
            }))
            .unwrap(),
        );
        pins
    }

    fn signal(v: serde_json::Value) -> Signal {
        serde_json::from_value(v).unwrap()
    }

    fn names(pins: &[&Pin]) -> Vec<String> {
        pins.iter().map(|p| p.name.clone()).collect()
    }

    #[test]
    fn wildcard_expands_to_whole_port_in_order() {
        let pins = pins();
        let s = signal(json!({ "name": "TXD", "allowedGpio": ["P1*"] }));
        let c = candidates(&s, &pins);
        assert_eq!(
            names(&c),
            (0..10).map(|n| format!("P1.{n:02}")).collect::<Vec<_>>()
        );
    }

    #[test]
    fn explicit_pin_comes_first_when_preferred() {
        let pins = pins();
        let s = signal(json!({
            "name": "TXD",
            "allowedGpio": ["P2.00", "P1.07", "P1*"],
        }));
        assert_eq!(names(&candidates(&s, &pins))[..2], ["P1.00", "P1.01"]);
        let p = preferred_candidates(&s, &pins);
        assert_eq!(names(&p)[..4], ["P2.00", "P1.07", "P1.00", "P1.01"]);
        assert_eq!(p.len(), 11);
    }

    #[test]
    fn non_io_and_unparsed_pins_never_qualify() {
        let pins = pins();
        let s = signal(json!({
            "name": "AIN0",
            "allowedGpio": ["P2*", "VDD"],
        }));
        assert_eq!(names(&candidates(&s, &pins)), ["P2.00"]);
    }

    #[test]
    fn clock_capable_requirement() {
        let pins = pins();
        let s = signal(json!({
            "name": "SCK",
            "requiresClockCapablePin": true,
            "allowedGpio": ["P1*"],
        }));
        assert_eq!(
            names(&candidates(&s, &pins)),
            ["P1.00", "P1.03", "P1.06", "P1.09"]
        );
        let clock = pins.iter().find(|p| p.name == "P1.03").unwrap();
        let plain = pins.iter().find(|p| p.name == "P1.04").unwrap();
        assert!(allows(&s, clock));
        assert!(!allows(&s, plain));
    }

    #[test]
    fn malformed_patterns_have_no_candidates() {
        let pins = pins();
        let s = signal(json!({
            "name": "TXD",
            "allowedGpio": ["P1.x", "Q1*", "P2.00"],
        }));
        assert_eq!(names(&candidates(&s, &pins)), ["P2.00"]);
        assert_eq!(names(&preferred_candidates(&s, &pins)), ["P2.00"]);
    }

    #[test]
    fn exact_patterns_compare_numerically() {
        let pins = pins();
        let s = signal(json!({ "name": "TXD", "allowedGpio": ["P1.4"] }));
        assert_eq!(names(&candidates(&s, &pins)), ["P1.04"]);
    }
}
