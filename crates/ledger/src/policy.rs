//! Policy ledger - premiums, per-flight insurees and payout balances

use crate::access::{AccessController, Caller};
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::registry::AccountRegistry;
use flightsure_core::{Address, Amount, Flight, FlightKey};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One insuree's cover on one flight
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyEntry {
    pub insuree: Address,
    pub premium: Amount,
}

/// Result of settling a flight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreditSummary {
    pub flight_key: FlightKey,
    pub insurees: usize,
    pub total: Amount,
}

/// Outbound value transfer performed by `PolicyLedger::withdraw`.
///
/// Implementations may run arbitrary external code. The ledger has already
/// zeroed the balance when `transfer` is invoked.
pub trait FundsTransfer {
    fn transfer(&mut self, to: &Address, amount: Amount) -> Result<(), LedgerError>;
}

/// In-memory record of completed payouts
#[derive(Debug, Clone, Default)]
pub struct PayoutBook {
    paid: BTreeMap<Address, Amount>,
    transfers: usize,
}

impl PayoutBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total ever paid out to `to`
    pub fn paid_to(&self, to: &Address) -> Amount {
        self.paid.get(to).copied().unwrap_or_default()
    }

    pub fn transfer_count(&self) -> usize {
        self.transfers
    }
}

impl FundsTransfer for PayoutBook {
    fn transfer(&mut self, to: &Address, amount: Amount) -> Result<(), LedgerError> {
        let total = self
            .paid_to(to)
            .checked_add(&amount)
            .ok_or(LedgerError::Overflow)?;
        self.paid.insert(to.clone(), total);
        self.transfers += 1;
        Ok(())
    }
}

/// Owner of every insurance policy and insuree balance
#[derive(Debug, Clone)]
pub struct PolicyLedger {
    /// Cumulative premium per insuree, across all flights
    premiums: HashMap<Address, Amount>,
    /// Unsettled policies per flight, in purchase order
    flights: HashMap<FlightKey, Vec<PolicyEntry>>,
    /// Withdrawable credit
    balances: HashMap<Address, Amount>,
    premium_cap: Amount,
    payout_multiplier: Decimal,
}

impl PolicyLedger {
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            premiums: HashMap::new(),
            flights: HashMap::new(),
            balances: HashMap::new(),
            premium_cap: config.premium_cap,
            payout_multiplier: config.payout_multiplier,
        }
    }

    /// Buy cover for `insuree` on `flight`.
    ///
    /// The flight's airline must be funded, and the insuree's cumulative
    /// premium including this purchase must stay within the cap.
    pub fn buy_insurance(
        &mut self,
        access: &AccessController,
        registry: &AccountRegistry,
        caller: &Caller,
        flight: &Flight,
        insuree: &Address,
        premium: Amount,
    ) -> Result<FlightKey, LedgerError> {
        access.ensure_authorized(caller)?;
        if premium.is_zero() {
            return Err(LedgerError::InvalidAmount);
        }
        registry.ensure_funded(&flight.airline)?;

        let paid = self.premium_paid(insuree);
        let total = paid.checked_add(&premium).ok_or(LedgerError::Overflow)?;
        if total > self.premium_cap {
            return Err(LedgerError::PremiumCapExceeded {
                insuree: insuree.clone(),
                paid,
                requested: premium,
                cap: self.premium_cap,
            });
        }

        let key = flight.key();
        let entries = self.flights.entry(key.clone()).or_default();
        match entries.iter_mut().find(|e| &e.insuree == insuree) {
            Some(entry) => {
                entry.premium = entry
                    .premium
                    .checked_add(&premium)
                    .ok_or(LedgerError::Overflow)?;
            }
            None => entries.push(PolicyEntry {
                insuree: insuree.clone(),
                premium,
            }),
        }
        self.premiums.insert(insuree.clone(), total);

        tracing::info!(
            flight = %flight,
            key = key.short(),
            insuree = %insuree,
            premium = %premium,
            "Insurance purchased"
        );
        Ok(key)
    }

    /// Settle a flight delayed by its airline.
    ///
    /// Every insuree on the flight is credited `premium * payout_multiplier`
    /// for the premium paid on this flight, then the flight's policy list is
    /// cleared.
    pub fn credit_insurees(
        &mut self,
        access: &AccessController,
        caller: &Caller,
        flight: &Flight,
    ) -> Result<CreditSummary, LedgerError> {
        access.ensure_authorized(caller)?;
        let key = flight.key();

        let entries = self.flights.get(&key).map(Vec::as_slice).unwrap_or_default();

        // Compute every new balance before writing any
        let mut credited = Vec::with_capacity(entries.len());
        let mut total = Amount::ZERO;
        for entry in entries {
            let payout = entry
                .premium
                .checked_mul(self.payout_multiplier)
                .ok_or(LedgerError::Overflow)?;
            let balance = self
                .balance_of(&entry.insuree)
                .checked_add(&payout)
                .ok_or(LedgerError::Overflow)?;
            total = total.checked_add(&payout).ok_or(LedgerError::Overflow)?;
            credited.push((entry.insuree.clone(), balance));
        }

        let insurees = credited.len();
        for (insuree, balance) in credited {
            self.balances.insert(insuree, balance);
        }
        self.flights.remove(&key);

        tracing::info!(flight = %flight, insurees, total = %total, "Insurees credited");
        Ok(CreditSummary {
            flight_key: key,
            insurees,
            total,
        })
    }

    /// Pay out the insuree's entire balance.
    ///
    /// The balance is zeroed before the transfer runs and restored if the
    /// transfer fails.
    pub fn withdraw<T: FundsTransfer + ?Sized>(
        &mut self,
        access: &AccessController,
        caller: &Caller,
        insuree: &Address,
        payout: &mut T,
    ) -> Result<Amount, LedgerError> {
        access.ensure_authorized(caller)?;

        let amount = self.balance_of(insuree);
        if amount.is_zero() {
            return Err(LedgerError::ZeroBalance(insuree.clone()));
        }

        self.balances.insert(insuree.clone(), Amount::ZERO);
        if let Err(e) = payout.transfer(insuree, amount) {
            self.balances.insert(insuree.clone(), amount);
            tracing::warn!(insuree = %insuree, error = %e, "Withdrawal transfer failed");
            return Err(e);
        }

        tracing::info!(insuree = %insuree, amount = %amount, "Balance withdrawn");
        Ok(amount)
    }

    // === Queries ===

    /// Withdrawable balance. Unavailable while the ledger is paused.
    pub fn balance(
        &self,
        access: &AccessController,
        insuree: &Address,
    ) -> Result<Amount, LedgerError> {
        access.ensure_operational()?;
        Ok(self.balance_of(insuree))
    }

    fn balance_of(&self, insuree: &Address) -> Amount {
        self.balances.get(insuree).copied().unwrap_or_default()
    }

    /// Cumulative premium paid by `insuree`
    pub fn premium_paid(&self, insuree: &Address) -> Amount {
        self.premiums.get(insuree).copied().unwrap_or_default()
    }

    /// Unsettled policies on a flight
    pub fn flight_policies(&self, key: &FlightKey) -> &[PolicyEntry] {
        self.flights.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn premium_cap(&self) -> Amount {
        self.premium_cap
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn addr(s: &str) -> Address {
        Address::new(s).unwrap()
    }

    fn amount(value: Decimal) -> Amount {
        Amount::new(value).unwrap()
    }

    struct Fixture {
        access: AccessController,
        registry: AccountRegistry,
        policies: PolicyLedger,
        app: Caller,
    }

    fn setup() -> Fixture {
        let config = LedgerConfig {
            first_airline: addr("a1"),
            ..LedgerConfig::default()
        };
        let access = AccessController::new(config.owner.clone(), config.authorized_callers.clone());
        let mut registry = AccountRegistry::new(&config);
        let app = Caller::new(addr("app"), addr("a1"));
        registry
            .fund_airline(&access, &app, &addr("a1"), Amount::units(10))
            .unwrap();

        Fixture {
            access,
            registry,
            policies: PolicyLedger::new(&config),
            app,
        }
    }

    fn flight(designator: &str) -> Flight {
        Flight::new(addr("a1"), designator, 1_700_000_000)
    }

    impl Fixture {
        fn buy(
            &mut self,
            designator: &str,
            insuree: &str,
            premium: Decimal,
        ) -> Result<FlightKey, LedgerError> {
            self.policies.buy_insurance(
                &self.access,
                &self.registry,
                &self.app,
                &flight(designator),
                &addr(insuree),
                amount(premium),
            )
        }
    }

    struct FailingTransfer;

    impl FundsTransfer for FailingTransfer {
        fn transfer(&mut self, to: &Address, _amount: Amount) -> Result<(), LedgerError> {
            Err(LedgerError::TransferFailed {
                to: to.clone(),
                reason: "receiver rejected".into(),
            })
        }
    }

    #[test]
    fn test_premium_cap_is_atomic() {
        let mut fx = setup();
        fx.buy("AA100", "p", dec!(0.6)).unwrap();

        let result = fx.buy("AA100", "p", dec!(0.5));
        assert!(matches!(result, Err(LedgerError::PremiumCapExceeded { .. })));
        assert_eq!(fx.policies.premium_paid(&addr("p")).value(), dec!(0.6));

        let key = flight("AA100").key();
        assert_eq!(fx.policies.flight_policies(&key).len(), 1);
        assert_eq!(fx.policies.flight_policies(&key)[0].premium.value(), dec!(0.6));

        // Exactly reaching the cap is allowed, on another flight too
        fx.buy("AA200", "p", dec!(0.4)).unwrap();
        assert_eq!(fx.policies.premium_paid(&addr("p")), Amount::ONE);
    }

    #[test]
    fn test_repeat_purchase_merges_entry() {
        let mut fx = setup();
        fx.buy("AA100", "p", dec!(0.3)).unwrap();
        let key = fx.buy("AA100", "p", dec!(0.2)).unwrap();

        let entries = fx.policies.flight_policies(&key);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].premium.value(), dec!(0.5));
    }

    #[test]
    fn test_unfunded_airline_cannot_sell() {
        let mut fx = setup();
        let flight = Flight::new(addr("ghost-air"), "GA1", 1);
        let result = fx.policies.buy_insurance(
            &fx.access,
            &fx.registry,
            &fx.app,
            &flight,
            &addr("p"),
            amount(dec!(0.1)),
        );
        assert_eq!(result, Err(LedgerError::NotRegistered(addr("ghost-air"))));
        assert!(fx.policies.premium_paid(&addr("p")).is_zero());
    }

    #[test]
    fn test_registered_unfunded_airline_cannot_sell() {
        let mut fx = setup();
        fx.registry
            .register_airline(&fx.access, &fx.app, addr("a2"), "Second")
            .unwrap();
        assert!(fx.registry.is_registered(&addr("a2")));

        let flight = Flight::new(addr("a2"), "BB1", 1);
        let result = fx.policies.buy_insurance(
            &fx.access,
            &fx.registry,
            &fx.app,
            &flight,
            &addr("p"),
            amount(dec!(0.1)),
        );
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientFunding { ref airline, .. }) if airline == &addr("a2")
        ));
        assert!(fx.policies.premium_paid(&addr("p")).is_zero());
        assert!(fx.policies.flight_policies(&flight.key()).is_empty());
    }

    #[test]
    fn test_unauthorized_purchase_leaves_state() {
        let mut fx = setup();
        let rogue = Caller::new(addr("rogue-app"), addr("p"));
        let result = fx.policies.buy_insurance(
            &fx.access,
            &fx.registry,
            &rogue,
            &flight("AA100"),
            &addr("p"),
            amount(dec!(0.5)),
        );
        assert_eq!(result, Err(LedgerError::Unauthorized(addr("rogue-app"))));
        assert!(fx.policies.premium_paid(&addr("p")).is_zero());
        assert!(fx.policies.flight_policies(&flight("AA100").key()).is_empty());
    }

    #[test]
    fn test_credit_doubles_flight_premium_only() {
        let mut fx = setup();
        fx.buy("AA100", "p", dec!(0.3)).unwrap();
        fx.buy("AA200", "p", dec!(0.5)).unwrap();
        fx.buy("AA200", "q", dec!(0.1)).unwrap();

        let summary = fx
            .policies
            .credit_insurees(&fx.access, &fx.app, &flight("AA100"))
            .unwrap();
        assert_eq!(summary.insurees, 1);
        assert_eq!(summary.total.value(), dec!(0.6));

        let summary = fx
            .policies
            .credit_insurees(&fx.access, &fx.app, &flight("AA200"))
            .unwrap();
        assert_eq!(summary.insurees, 2);
        assert_eq!(summary.total.value(), dec!(1.2));

        // 0.6 from AA100 plus 1.0 from AA200; the earlier credit is not doubled again
        let balance = fx.policies.balance(&fx.access, &addr("p")).unwrap();
        assert_eq!(balance.value(), dec!(1.6));
        let balance = fx.policies.balance(&fx.access, &addr("q")).unwrap();
        assert_eq!(balance.value(), dec!(0.2));
    }

    #[test]
    fn test_credit_settles_flight_once() {
        let mut fx = setup();
        fx.buy("AA100", "p", dec!(0.4)).unwrap();
        fx.policies
            .credit_insurees(&fx.access, &fx.app, &flight("AA100"))
            .unwrap();

        let again = fx
            .policies
            .credit_insurees(&fx.access, &fx.app, &flight("AA100"))
            .unwrap();
        assert_eq!(again.insurees, 0);
        assert!(again.total.is_zero());
        assert_eq!(fx.policies.balance(&fx.access, &addr("p")).unwrap().value(), dec!(0.8));
    }

    #[test]
    fn test_withdraw_zeroes_balance() {
        let mut fx = setup();
        fx.buy("AA100", "p", dec!(0.6)).unwrap();
        fx.policies
            .credit_insurees(&fx.access, &fx.app, &flight("AA100"))
            .unwrap();

        let mut book = PayoutBook::new();
        let paid = fx
            .policies
            .withdraw(&fx.access, &fx.app, &addr("p"), &mut book)
            .unwrap();
        assert_eq!(paid.value(), dec!(1.2));
        assert_eq!(book.paid_to(&addr("p")).value(), dec!(1.2));
        assert!(fx.policies.balance(&fx.access, &addr("p")).unwrap().is_zero());

        let second = fx.policies.withdraw(&fx.access, &fx.app, &addr("p"), &mut book);
        assert_eq!(second, Err(LedgerError::ZeroBalance(addr("p"))));
        assert_eq!(book.transfer_count(), 1);
    }

    #[test]
    fn test_failed_transfer_restores_balance() {
        let mut fx = setup();
        fx.buy("AA100", "p", dec!(0.5)).unwrap();
        fx.policies
            .credit_insurees(&fx.access, &fx.app, &flight("AA100"))
            .unwrap();

        let result = fx
            .policies
            .withdraw(&fx.access, &fx.app, &addr("p"), &mut FailingTransfer);
        assert!(matches!(result, Err(LedgerError::TransferFailed { .. })));
        assert_eq!(fx.policies.balance(&fx.access, &addr("p")).unwrap(), Amount::ONE);
    }

    #[test]
    fn test_balance_query_gated_by_operational_flag() {
        let mut fx = setup();
        let owner = Caller::new(addr("app"), addr("owner"));
        fx.access.set_operational(&owner, false).unwrap();

        assert_eq!(
            fx.policies.balance(&fx.access, &addr("p")),
            Err(LedgerError::NotOperational)
        );
        assert_eq!(fx.buy("AA100", "p", dec!(0.1)), Err(LedgerError::NotOperational));
    }
}
