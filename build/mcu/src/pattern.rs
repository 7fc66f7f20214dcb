// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::pin::{parse_digits, PinId};
use std::fmt;
use std::str::FromStr;

/// An `allowedGpio` entry: either one specific pin (`P1.04`) or every pin
/// of a port (`P1*`).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PinPattern {
    Pin(PinId),
    Port(u8),
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid pin pattern \"{0}\" (expected P<port>.<pin> or P<port>*)")]
pub struct PatternError(pub String);

impl PinPattern {
    pub fn matches(&self, id: PinId) -> bool {
        match *self {
            PinPattern::Pin(p) => p == id,
            PinPattern::Port(port) => port == id.port,
        }
    }
}

impl FromStr for PinPattern {
    type Err = PatternError;

    /// Accepts exactly `^P\d+(\.\d{1,2}|\*)$`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || PatternError(s.to_string());
        let rest = s.strip_prefix('P').ok_or_else(err)?;
        if let Some(port) = rest.strip_suffix('*') {
            return Ok(PinPattern::Port(parse_digits(port).ok_or_else(err)?));
        }
        let (port, number) = rest.split_once('.').ok_or_else(err)?;
        if number.len() > 2 {
            return Err(err());
        }
        Ok(PinPattern::Pin(PinId::new(
            parse_digits(port).ok_or_else(err)?,
            parse_digits(number).ok_or_else(err)?,
        )))
    }
}

impl fmt::Display for PinPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinPattern::Pin(id) => write!(f, "{id}"),
            PinPattern::Port(port) => write!(f, "P{port}*"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn good_patterns() {
        assert_eq!("P1*".parse(), Ok(PinPattern::Port(1)));
        assert_eq!("P10*".parse(), Ok(PinPattern::Port(10)));
        assert_eq!("P2.02".parse(), Ok(PinPattern::Pin(PinId::new(2, 2))));
        assert_eq!("P0.7".parse(), Ok(PinPattern::Pin(PinId::new(0, 7))));
    }

    #[test]
    fn bad_patterns() {
        let bad_patterns =
            ["", "P", "P*", "1.04", "P1.", "P1.004", "P1.0*", "Px*", "p1*"];
        for bad in bad_patterns {
            assert_eq!(
                bad.parse::<PinPattern>(),
                Err(PatternError(bad.to_string())),
                "{bad:?} should not parse"
            );
        }
    }

    #[test]
    fn wildcard_matches_whole_port() {
        let p: PinPattern = "P1*".parse().unwrap();
        assert!(p.matches(PinId::new(1, 0)));
        assert!(p.matches(PinId::new(1, 15)));
        assert!(!p.matches(PinId::new(2, 0)));
    }

    #[test]
    fn exact_matches_one_pin() {
        let p: PinPattern = "P1.04".parse().unwrap();
        assert!(p.matches(PinId::new(1, 4)));
        assert!(!p.matches(PinId::new(1, 5)));
        assert_eq!(p.to_string(), "P1.04");
    }
}
