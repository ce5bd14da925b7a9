//! Journaled ledger commands

use flightsure_core::{Address, Amount, Flight, StatusCode};
use serde::{Deserialize, Serialize};
use strum_macros::IntoStaticStr;

/// A mutating ledger operation, as accepted by the application.
///
/// Only the arguments are recorded; the calling service and sender live on
/// the enclosing `JournalRecord`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, IntoStaticStr)]
#[serde(tag = "type", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Command {
    SetOperational {
        mode: bool,
    },
    AuthorizeCaller {
        service: Address,
    },
    DeauthorizeCaller {
        service: Address,
    },
    AddAirline {
        airline: Address,
        name: String,
    },
    RegisterAirline {
        airline: Address,
        name: String,
    },
    Vote {
        airline: Address,
    },
    FundAirline {
        airline: Address,
        amount: Amount,
    },
    BuyInsurance {
        flight: Flight,
        insuree: Address,
        premium: Amount,
    },
    CreditInsurees {
        flight: Flight,
    },
    Withdraw {
        insuree: Address,
    },
    RegisterOracle {
        oracle: Address,
        fee: Amount,
    },
    RequestStatus {
        flight: Flight,
    },
    SubmitResponse {
        oracle: Address,
        index: u8,
        flight: Flight,
        status: StatusCode,
    },
}

impl Command {
    /// Stable snake_case name, for logs
    pub fn name(&self) -> &'static str {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn addr(s: &str) -> Address {
        Address::new(s).unwrap()
    }

    #[test]
    fn test_command_name() {
        let cmd = Command::BuyInsurance {
            flight: Flight::new(addr("a1"), "AA100", 1),
            insuree: addr("p"),
            premium: Amount::new(dec!(0.5)).unwrap(),
        };
        assert_eq!(cmd.name(), "buy_insurance");
        assert_eq!(Command::SetOperational { mode: false }.name(), "set_operational");
    }

    #[test]
    fn test_command_json_shape() {
        let cmd = Command::SubmitResponse {
            oracle: addr("o1"),
            index: 7,
            flight: Flight::new(addr("a1"), "AA100", 1),
            status: StatusCode::LateAirline,
        };
        let json = serde_json::to_value(&cmd).unwrap();
        assert_eq!(json["type"], "submit_response");
        assert_eq!(json["status"], "late-airline");
        assert_eq!(json["flight"]["designator"], "AA100");

        let parsed: Command = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, cmd);
    }
}
