//! Flight identification and status codes

use crate::address::Address;
use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use strum_macros::{Display, EnumString};

/// Deterministic identifier of a flight.
///
/// SHA-256 over the airline address, the flight designator and the departure
/// timestamp. Each field is length-prefixed so distinct triples cannot
/// collide by concatenation. The designator is trimmed and upper-cased first.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlightKey(String);

impl FlightKey {
    pub fn derive(airline: &Address, flight: &str, timestamp: u64) -> Self {
        let designator = normalize_designator(flight);
        let mut hasher = Sha256::new();

        hasher.update((airline.as_str().len() as u64).to_le_bytes());
        hasher.update(airline.as_str().as_bytes());
        hasher.update((designator.len() as u64).to_le_bytes());
        hasher.update(designator.as_bytes());
        hasher.update(timestamp.to_le_bytes());

        Self(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 8 hex characters, for log output
    pub fn short(&self) -> &str {
        &self.0[..8]
    }
}

impl fmt::Display for FlightKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A concrete flight: operating airline, designator and departure time
/// (unix seconds).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Flight {
    pub airline: Address,
    pub designator: String,
    pub timestamp: u64,
}

impl Flight {
    pub fn new(airline: Address, designator: impl AsRef<str>, timestamp: u64) -> Self {
        Self {
            airline,
            designator: normalize_designator(designator.as_ref()),
            timestamp,
        }
    }

    pub fn key(&self) -> FlightKey {
        FlightKey::derive(&self.airline, &self.designator, self.timestamp)
    }
}

impl fmt::Display for Flight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.airline, self.designator, self.timestamp)
    }
}

/// Canonical form of a flight designator ("aa 100 " -> "AA 100")
pub fn normalize_designator(flight: &str) -> String {
    flight.trim().to_uppercase()
}

/// Flight status reported by oracles
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
#[serde(rename_all = "kebab-case")]
pub enum StatusCode {
    Unknown,
    OnTime,
    /// Delay caused by the airline. The only status that pays out.
    LateAirline,
    LateWeather,
    LateTechnical,
    LateOther,
}

impl StatusCode {
    /// Numeric code used on the oracle wire
    pub fn code(&self) -> u8 {
        match self {
            StatusCode::Unknown => 0,
            StatusCode::OnTime => 10,
            StatusCode::LateAirline => 20,
            StatusCode::LateWeather => 30,
            StatusCode::LateTechnical => 40,
            StatusCode::LateOther => 50,
        }
    }

    pub fn triggers_payout(&self) -> bool {
        matches!(self, StatusCode::LateAirline)
    }
}

impl TryFrom<u8> for StatusCode {
    type Error = CoreError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(StatusCode::Unknown),
            10 => Ok(StatusCode::OnTime),
            20 => Ok(StatusCode::LateAirline),
            30 => Ok(StatusCode::LateWeather),
            40 => Ok(StatusCode::LateTechnical),
            50 => Ok(StatusCode::LateOther),
            other => Err(CoreError::UnknownStatusCode(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn airline(name: &str) -> Address {
        Address::new(name).unwrap()
    }

    #[test]
    fn test_flight_key_deterministic() {
        let k1 = FlightKey::derive(&airline("airline-a"), "AA100", 1_700_000_000);
        let k2 = FlightKey::derive(&airline("AIRLINE-A"), " aa100 ", 1_700_000_000);
        assert_eq!(k1, k2);
        assert_eq!(k1.as_str().len(), 64);
    }

    #[test]
    fn test_flight_key_distinguishes_fields() {
        let base = FlightKey::derive(&airline("a"), "AA100", 1);
        assert_ne!(base, FlightKey::derive(&airline("b"), "AA100", 1));
        assert_ne!(base, FlightKey::derive(&airline("a"), "AA101", 1));
        assert_ne!(base, FlightKey::derive(&airline("a"), "AA100", 2));
    }

    #[test]
    fn test_flight_key_length_prefix() {
        // "ab" + "c" must not collide with "a" + "bc"
        let k1 = FlightKey::derive(&airline("ab"), "C", 7);
        let k2 = FlightKey::derive(&airline("a"), "BC", 7);
        assert_ne!(k1, k2);
    }

    #[test]
    fn test_flight_key_matches_triple() {
        let flight = Flight::new(airline("a"), "ua 9", 42);
        assert_eq!(flight.designator, "UA 9");
        assert_eq!(flight.key(), FlightKey::derive(&airline("a"), "UA 9", 42));
        assert_eq!(flight.to_string(), "a/UA 9@42");
    }

    #[test]
    fn test_status_code_parsing() {
        assert_eq!(StatusCode::from_str("late-airline").unwrap(), StatusCode::LateAirline);
        assert_eq!(StatusCode::from_str("On-Time").unwrap(), StatusCode::OnTime);
        assert_eq!(StatusCode::LateWeather.to_string(), "late-weather");
        assert!(StatusCode::from_str("cancelled").is_err());
    }

    #[test]
    fn test_status_code_numeric() {
        for status in [
            StatusCode::Unknown,
            StatusCode::OnTime,
            StatusCode::LateAirline,
            StatusCode::LateWeather,
            StatusCode::LateTechnical,
            StatusCode::LateOther,
        ] {
            assert_eq!(StatusCode::try_from(status.code()).unwrap(), status);
        }
        assert!(matches!(
            StatusCode::try_from(21),
            Err(CoreError::UnknownStatusCode(21))
        ));
    }

    #[test]
    fn test_only_late_airline_pays() {
        assert!(StatusCode::LateAirline.triggers_payout());
        assert!(!StatusCode::LateWeather.triggers_payout());
        assert!(!StatusCode::OnTime.triggers_payout());
    }
}
