use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

/// Vehicle system encoded in the top two bits of the first DTC byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DtcSystem {
    Powertrain = 0,
    Chassis = 1,
    Body = 2,
    Network = 3,
}

impl DtcSystem {
    pub fn letter(self) -> char {
        match self {
            DtcSystem::Powertrain => 'P',
            DtcSystem::Chassis => 'C',
            DtcSystem::Body => 'B',
            DtcSystem::Network => 'U',
        }
    }

    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => DtcSystem::Powertrain,
            1 => DtcSystem::Chassis,
            2 => DtcSystem::Body,
            _ => DtcSystem::Network,
        }
    }

    fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'P' => Some(DtcSystem::Powertrain),
            'C' => Some(DtcSystem::Chassis),
            'B' => Some(DtcSystem::Body),
            'U' => Some(DtcSystem::Network),
            _ => None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid trouble code {0:?}")]
pub struct ParseDtcError(pub String);

/// A decoded OBD-II trouble code such as `P0171`.
///
/// Layout of the two raw bytes:
///
/// ```text
///  b1: SS DD NNNN   S = system letter, D = first digit (0-3), N = second digit
///  b2: NNNNNNNN     rendered as two hex digits
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DiagnosticTroubleCode {
    raw: [u8; 2],
}

impl DiagnosticTroubleCode {
    pub fn from_bytes(b1: u8, b2: u8) -> Self {
        Self { raw: [b1, b2] }
    }

    pub fn system(&self) -> DtcSystem {
        DtcSystem::from_bits((self.raw[0] & 0xC0) >> 6)
    }

    /// Re-encodes the code into the two bytes it was decoded from.
    pub fn to_bytes(&self) -> [u8; 2] {
        self.raw
    }
}

impl fmt::Display for DiagnosticTroubleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [b1, b2] = self.raw;
        let d1 = (b1 & 0x30) >> 4;
        let d2 = b1 & 0x0F;
        write!(f, "{}{:X}{:X}{:02X}", self.system().letter(), d1, d2, b2)
    }
}

impl FromStr for DiagnosticTroubleCode {
    type Err = ParseDtcError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseDtcError(s.to_string());
        let upper = s.trim().to_ascii_uppercase();
        if upper.len() != 5 || !upper.is_ascii() {
            return Err(invalid());
        }

        let mut chars = upper.chars();
        let system = chars
            .next()
            .and_then(DtcSystem::from_letter)
            .ok_or_else(invalid)?;
        let d1 = chars.next().and_then(|c| c.to_digit(16)).ok_or_else(invalid)?;
        if d1 > 3 {
            return Err(invalid());
        }
        let d2 = chars.next().and_then(|c| c.to_digit(16)).ok_or_else(invalid)?;
        let b2 = u8::from_str_radix(&upper[3..5], 16).map_err(|_| invalid())?;

        let b1 = ((system as u8) << 6) | ((d1 as u8) << 4) | d2 as u8;
        Ok(Self::from_bytes(b1, b2))
    }
}

impl Serialize for DiagnosticTroubleCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
