//! FlightLedger - state container for access control, airlines and policies
//!
//! Each component owns its records; the container only routes calls and
//! hands every component the collaborators it needs.

use crate::access::{AccessController, Caller};
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::policy::{CreditSummary, FundsTransfer, PolicyLedger};
use crate::registry::{AccountRegistry, RegistrationOutcome};
use flightsure_core::{Address, Amount, Flight, FlightKey};

#[derive(Debug, Clone)]
pub struct FlightLedger {
    pub access: AccessController,
    pub registry: AccountRegistry,
    pub policies: PolicyLedger,
}

impl FlightLedger {
    pub fn new(config: &LedgerConfig) -> Result<Self, LedgerError> {
        config.validate()?;
        Ok(Self {
            access: AccessController::new(
                config.owner.clone(),
                config.authorized_callers.iter().cloned(),
            ),
            registry: AccountRegistry::new(config),
            policies: PolicyLedger::new(config),
        })
    }

    // === Access ===

    pub fn set_operational(&mut self, caller: &Caller, mode: bool) -> Result<(), LedgerError> {
        self.access.set_operational(caller, mode)
    }

    pub fn authorize_caller(
        &mut self,
        caller: &Caller,
        service: Address,
    ) -> Result<(), LedgerError> {
        self.access.authorize_caller(caller, service)
    }

    pub fn deauthorize_caller(
        &mut self,
        caller: &Caller,
        service: &Address,
    ) -> Result<(), LedgerError> {
        self.access.deauthorize_caller(caller, service)
    }

    // === Airlines ===

    pub fn add_airline(
        &mut self,
        caller: &Caller,
        identity: Address,
        name: impl Into<String>,
    ) -> Result<(), LedgerError> {
        self.registry.add_airline(&self.access, caller, identity, name)
    }

    pub fn register_airline(
        &mut self,
        caller: &Caller,
        identity: Address,
        name: impl Into<String>,
    ) -> Result<RegistrationOutcome, LedgerError> {
        self.registry
            .register_airline(&self.access, caller, identity, name)
    }

    pub fn vote(
        &mut self,
        caller: &Caller,
        target: &Address,
    ) -> Result<RegistrationOutcome, LedgerError> {
        self.registry.vote(&self.access, caller, target)
    }

    pub fn fund_airline(
        &mut self,
        caller: &Caller,
        identity: &Address,
        amount: Amount,
    ) -> Result<Amount, LedgerError> {
        self.registry
            .fund_airline(&self.access, caller, identity, amount)
    }

    // === Policies ===

    pub fn buy_insurance(
        &mut self,
        caller: &Caller,
        flight: &Flight,
        insuree: &Address,
        premium: Amount,
    ) -> Result<FlightKey, LedgerError> {
        self.policies
            .buy_insurance(&self.access, &self.registry, caller, flight, insuree, premium)
    }

    pub fn credit_insurees(
        &mut self,
        caller: &Caller,
        flight: &Flight,
    ) -> Result<CreditSummary, LedgerError> {
        self.policies.credit_insurees(&self.access, caller, flight)
    }

    pub fn withdraw<T: FundsTransfer + ?Sized>(
        &mut self,
        caller: &Caller,
        insuree: &Address,
        payout: &mut T,
    ) -> Result<Amount, LedgerError> {
        self.policies.withdraw(&self.access, caller, insuree, payout)
    }

    pub fn balance(&self, insuree: &Address) -> Result<Amount, LedgerError> {
        self.policies.balance(&self.access, insuree)
    }

    pub fn is_operational(&self) -> bool {
        self.access.is_operational()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::PayoutBook;
    use crate::registry::AirlineStatus;
    use rust_decimal_macros::dec;

    fn addr(s: &str) -> Address {
        Address::new(s).unwrap()
    }

    fn ledger() -> FlightLedger {
        let config = LedgerConfig {
            first_airline: addr("airline-a"),
            ..LedgerConfig::default()
        };
        FlightLedger::new(&config).unwrap()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = LedgerConfig {
            oracle_quorum: 0,
            ..LedgerConfig::default()
        };
        assert!(matches!(FlightLedger::new(&config), Err(LedgerError::InvalidConfig(_))));
    }

    #[test]
    fn test_airline_to_payout_flow() {
        let mut ledger = ledger();
        let a = Caller::new(addr("app"), addr("airline-a"));

        ledger.fund_airline(&a, &addr("airline-a"), Amount::units(10)).unwrap();
        ledger.register_airline(&a, addr("airline-b"), "Bravo").unwrap();
        assert_eq!(
            ledger.registry.airline(&addr("airline-b")).unwrap().status,
            AirlineStatus::Registered
        );

        let flight = Flight::new(addr("airline-a"), "AA100", 1_700_000_000);
        let p = addr("passenger");
        ledger
            .buy_insurance(&a, &flight, &p, Amount::new(dec!(0.6)).unwrap())
            .unwrap();
        ledger.credit_insurees(&a, &flight).unwrap();
        assert_eq!(ledger.balance(&p).unwrap().value(), dec!(1.2));

        let mut book = PayoutBook::new();
        assert_eq!(ledger.withdraw(&a, &p, &mut book).unwrap().value(), dec!(1.2));
        assert!(ledger.balance(&p).unwrap().is_zero());
    }

    #[test]
    fn test_pause_blocks_all_mutations() {
        let mut ledger = ledger();
        let owner = Caller::new(addr("app"), addr("owner"));
        let a = Caller::new(addr("app"), addr("airline-a"));
        ledger.fund_airline(&a, &addr("airline-a"), Amount::units(10)).unwrap();

        ledger.set_operational(&owner, false).unwrap();
        let flight = Flight::new(addr("airline-a"), "AA100", 1);
        let p = addr("passenger");

        assert_eq!(
            ledger.add_airline(&a, addr("x"), "X"),
            Err(LedgerError::NotOperational)
        );
        assert_eq!(
            ledger.register_airline(&a, addr("x"), "X"),
            Err(LedgerError::NotOperational)
        );
        assert_eq!(ledger.vote(&a, &addr("x")), Err(LedgerError::NotOperational));
        assert_eq!(
            ledger.fund_airline(&a, &addr("airline-a"), Amount::ONE),
            Err(LedgerError::NotOperational)
        );
        assert_eq!(
            ledger.buy_insurance(&a, &flight, &p, Amount::ONE),
            Err(LedgerError::NotOperational)
        );
        assert_eq!(ledger.credit_insurees(&a, &flight), Err(LedgerError::NotOperational));
        assert_eq!(
            ledger.withdraw(&a, &p, &mut PayoutBook::new()),
            Err(LedgerError::NotOperational)
        );
        assert_eq!(
            ledger.authorize_caller(&owner, addr("svc")),
            Err(LedgerError::NotOperational)
        );

        ledger.set_operational(&owner, true).unwrap();
        assert!(ledger.is_operational());
        ledger.add_airline(&a, addr("x"), "X").unwrap();
    }
}
