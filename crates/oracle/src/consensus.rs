//! Oracle consensus - registration, status requests and response tally

use flightsure_core::{Address, Amount, Flight, StatusCode};
use flightsure_ledger::{AccessController, Caller, LedgerConfig, PolicyLedger};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::error::OracleError;
use crate::request::{OracleRequest, RequestKey, RequestStatus};
use crate::types::{OracleEvent, OracleRegistration, ResponseOutcome};

/// Owner of oracle registrations and status requests.
///
/// Holds no reference to the policy ledger: the ledger is passed to
/// `submit_response` so a resolved late-airline status can credit insurees.
#[derive(Debug, Clone)]
pub struct OracleConsensus {
    oracles: BTreeMap<Address, OracleRegistration>,
    requests: BTreeMap<RequestKey, OracleRequest>,
    events: Vec<OracleEvent>,
    fees_collected: Amount,
    /// Advanced by every accepted index draw
    nonce: u64,
    registration_fee: Amount,
    quorum: usize,
    index_space: u8,
    indexes_per_oracle: usize,
}

impl OracleConsensus {
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            oracles: BTreeMap::new(),
            requests: BTreeMap::new(),
            events: Vec::new(),
            fees_collected: Amount::ZERO,
            nonce: 0,
            registration_fee: config.oracle_registration_fee,
            quorum: config.oracle_quorum,
            index_space: config.oracle_index_space,
            indexes_per_oracle: config.indexes_per_oracle,
        }
    }

    /// Pseudo-random index in `0..index_space` for draw number `nonce`.
    ///
    /// Derived from the nonce and `account` only, so the same sequence of
    /// accepted calls always yields the same indexes.
    fn index_at(&self, nonce: u64, account: &Address) -> u8 {
        let mut hasher = Sha256::new();
        hasher.update(nonce.to_le_bytes());
        hasher.update(account.as_str().as_bytes());

        let digest = hasher.finalize();
        let value = u64::from_le_bytes([
            digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6], digest[7],
        ]);
        (value % self.index_space as u64) as u8
    }

    /// Register an oracle and assign its indexes
    pub fn register_oracle(
        &mut self,
        access: &AccessController,
        caller: &Caller,
        oracle: Address,
        fee: Amount,
    ) -> Result<Vec<u8>, OracleError> {
        access.ensure_authorized(caller)?;
        if fee < self.registration_fee {
            return Err(OracleError::InsufficientFee {
                paid: fee,
                required: self.registration_fee,
            });
        }
        if self.oracles.contains_key(&oracle) {
            return Err(OracleError::AlreadyRegistered(oracle));
        }
        let fees_collected = self
            .fees_collected
            .checked_add(&fee)
            .ok_or(flightsure_ledger::LedgerError::Overflow)?;

        let mut nonce = self.nonce;
        let mut indexes = Vec::with_capacity(self.indexes_per_oracle);
        while indexes.len() < self.indexes_per_oracle {
            let index = self.index_at(nonce, &oracle);
            nonce = nonce.wrapping_add(1);
            if !indexes.contains(&index) {
                indexes.push(index);
            }
        }

        tracing::info!(oracle = %oracle, indexes = ?indexes, fee = %fee, "Oracle registered");
        self.nonce = nonce;
        self.fees_collected = fees_collected;
        self.oracles.insert(
            oracle,
            OracleRegistration {
                indexes: indexes.clone(),
                fee_paid: fee,
            },
        );
        Ok(indexes)
    }

    /// Ask the oracle network for the status of `flight`.
    ///
    /// Draws an index and opens a request for it unless one is already open.
    /// A drawn index whose request for this flight has resolved is skipped in
    /// favor of the next index without a resolved request. Fails with
    /// `RequestClosed` only once every index has resolved for the flight.
    pub fn request_status(
        &mut self,
        access: &AccessController,
        caller: &Caller,
        flight: &Flight,
    ) -> Result<OracleEvent, OracleError> {
        access.ensure_authorized(caller)?;

        let flight_key = flight.key();
        let drawn = self.index_at(self.nonce, &caller.sender);
        let key = (0..self.index_space)
            .map(|offset| {
                let index = ((drawn as u16 + offset as u16) % self.index_space as u16) as u8;
                RequestKey::new(index, flight_key.clone())
            })
            .find(|key| self.requests.get(key).map_or(true, OracleRequest::is_open))
            .ok_or_else(|| OracleError::RequestClosed {
                index: drawn,
                flight: flight.to_string(),
            })?;

        let index = key.index;
        self.requests
            .entry(key)
            .or_insert_with(|| OracleRequest::open(flight.clone(), caller.sender.clone()));
        self.nonce = self.nonce.wrapping_add(1);

        tracing::info!(
            index,
            flight = %flight,
            key = flight_key.short(),
            "Flight status requested"
        );
        let event = OracleEvent::StatusRequested {
            index,
            flight: flight.clone(),
            flight_key,
        };
        self.events.push(event.clone());
        Ok(event)
    }

    /// Record an oracle's report for the request opened with `index`.
    ///
    /// The first status to collect `quorum` reports resolves the request. If
    /// that status is an airline-caused delay, the flight's insurees are
    /// credited before the request is marked resolved; a failed credit leaves
    /// the request untouched.
    #[allow(clippy::too_many_arguments)]
    pub fn submit_response(
        &mut self,
        access: &AccessController,
        policies: &mut PolicyLedger,
        caller: &Caller,
        oracle: &Address,
        index: u8,
        flight: &Flight,
        status: StatusCode,
    ) -> Result<ResponseOutcome, OracleError> {
        access.ensure_authorized(caller)?;

        let registration = self
            .oracles
            .get(oracle)
            .ok_or_else(|| OracleError::UnknownOracle(oracle.clone()))?;
        if !registration.has_index(index) {
            return Err(OracleError::UnknownOracleIndex {
                oracle: oracle.clone(),
                index,
            });
        }

        let key = RequestKey::new(index, flight.key());
        let request = self
            .requests
            .get_mut(&key)
            .ok_or_else(|| OracleError::RequestNotFound {
                index,
                flight: flight.to_string(),
            })?;
        if !request.is_open() {
            return Err(OracleError::RequestClosed {
                index,
                flight: flight.to_string(),
            });
        }
        if request.has_responded(oracle) {
            return Err(OracleError::DuplicateResponse(oracle.clone()));
        }

        let reaches_quorum = request.votes_for(status) + 1 >= self.quorum;
        let credited = if reaches_quorum && status.triggers_payout() {
            Some(policies.credit_insurees(access, caller, &request.flight)?)
        } else {
            None
        };

        let votes = request.record(oracle.clone(), status);
        tracing::debug!(
            index,
            flight = %flight,
            oracle = %oracle,
            status = %status,
            votes,
            "Oracle report accepted"
        );
        self.events.push(OracleEvent::OracleReport {
            index,
            flight: flight.clone(),
            oracle: oracle.clone(),
            status,
        });

        if !reaches_quorum {
            return Ok(ResponseOutcome::Accepted {
                votes,
                required: self.quorum,
            });
        }

        request.status = RequestStatus::Resolved { status };
        tracing::info!(index, flight = %flight, status = %status, "Flight status resolved");
        self.events.push(OracleEvent::FlightStatusResolved {
            index,
            flight: flight.clone(),
            status,
        });
        Ok(ResponseOutcome::Resolved { status, credited })
    }

    /// Drain events emitted since the last call
    pub fn take_events(&mut self) -> Vec<OracleEvent> {
        std::mem::take(&mut self.events)
    }

    // === Queries ===

    pub fn oracle_indexes(&self, oracle: &Address) -> Result<&[u8], OracleError> {
        self.oracles
            .get(oracle)
            .map(|r| r.indexes.as_slice())
            .ok_or_else(|| OracleError::UnknownOracle(oracle.clone()))
    }

    pub fn is_registered(&self, oracle: &Address) -> bool {
        self.oracles.contains_key(oracle)
    }

    /// Oracles allowed to answer requests issued with `index`
    pub fn oracles_for_index(&self, index: u8) -> impl Iterator<Item = &Address> {
        self.oracles
            .iter()
            .filter(move |(_, r)| r.has_index(index))
            .map(|(oracle, _)| oracle)
    }

    pub fn oracle_count(&self) -> usize {
        self.oracles.len()
    }

    pub fn fees_collected(&self) -> Amount {
        self.fees_collected
    }

    pub fn request(&self, index: u8, flight: &Flight) -> Option<&OracleRequest> {
        self.requests.get(&RequestKey::new(index, flight.key()))
    }

    pub fn open_requests(&self) -> impl Iterator<Item = (&RequestKey, &OracleRequest)> {
        self.requests.iter().filter(|(_, r)| r.is_open())
    }

    pub fn quorum(&self) -> usize {
        self.quorum
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flightsure_ledger::{FlightLedger, LedgerError};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn addr(s: &str) -> Address {
        Address::new(s).unwrap()
    }

    struct Fixture {
        ledger: FlightLedger,
        consensus: OracleConsensus,
        app: Caller,
        flight: Flight,
    }

    fn setup(oracles: usize) -> Fixture {
        setup_with(oracles, dec!(0.6), LedgerConfig::default())
    }

    /// Funded airline, one insured passenger, a registered oracle pool
    fn setup_with(oracles: usize, premium: Decimal, config: LedgerConfig) -> Fixture {
        let config = LedgerConfig {
            first_airline: addr("airline-a"),
            ..config
        };
        let mut ledger = FlightLedger::new(&config).unwrap();
        let mut consensus = OracleConsensus::new(&config);
        let app = Caller::new(addr("app"), addr("airline-a"));

        ledger
            .fund_airline(&app, &addr("airline-a"), Amount::units(10))
            .unwrap();
        let flight = Flight::new(addr("airline-a"), "AA100", 1_700_000_000);
        ledger
            .buy_insurance(&app, &flight, &addr("p"), Amount::new(premium).unwrap())
            .unwrap();

        for i in 0..oracles {
            consensus
                .register_oracle(&ledger.access, &app, addr(&format!("oracle-{i}")), Amount::ONE)
                .unwrap();
        }

        Fixture {
            ledger,
            consensus,
            app,
            flight,
        }
    }

    impl Fixture {
        /// Open a request and return its index
        fn open(&mut self) -> u8 {
            match self
                .consensus
                .request_status(&self.ledger.access, &self.app, &self.flight)
                .unwrap()
            {
                OracleEvent::StatusRequested { index, .. } => index,
                other => panic!("unexpected event {other:?}"),
            }
        }

        /// Registered oracles holding `index`
        fn holders(&self, index: u8) -> Vec<Address> {
            self.consensus.oracles_for_index(index).cloned().collect()
        }

        fn respond(
            &mut self,
            oracle: &Address,
            index: u8,
            status: StatusCode,
        ) -> Result<ResponseOutcome, OracleError> {
            let flight = self.flight.clone();
            self.consensus.submit_response(
                &self.ledger.access,
                &mut self.ledger.policies,
                &self.app,
                oracle,
                index,
                &flight,
                status,
            )
        }
    }

    #[test]
    fn test_register_assigns_distinct_indexes() {
        let fx = setup(20);
        assert_eq!(fx.consensus.oracle_count(), 20);
        assert_eq!(fx.consensus.fees_collected(), Amount::units(20));

        for i in 0..20 {
            let indexes = fx.consensus.oracle_indexes(&addr(&format!("oracle-{i}"))).unwrap();
            assert_eq!(indexes.len(), 3);
            assert!(indexes.iter().all(|&ix| ix < 10));
            let mut sorted = indexes.to_vec();
            sorted.sort_unstable();
            sorted.dedup();
            assert_eq!(sorted.len(), 3);
        }
    }

    #[test]
    fn test_index_draw_is_deterministic() {
        let a = setup(5);
        let b = setup(5);
        for i in 0..5 {
            let oracle = addr(&format!("oracle-{i}"));
            assert_eq!(
                a.consensus.oracle_indexes(&oracle).unwrap(),
                b.consensus.oracle_indexes(&oracle).unwrap()
            );
        }
    }

    #[test]
    fn test_register_requires_fee_and_uniqueness() {
        let mut fx = setup(1);
        let result = fx.consensus.register_oracle(
            &fx.ledger.access,
            &fx.app,
            addr("cheap"),
            Amount::new(dec!(0.5)).unwrap(),
        );
        assert!(matches!(result, Err(OracleError::InsufficientFee { .. })));
        assert!(!fx.consensus.is_registered(&addr("cheap")));

        let result = fx
            .consensus
            .register_oracle(&fx.ledger.access, &fx.app, addr("oracle-0"), Amount::ONE);
        assert_eq!(result, Err(OracleError::AlreadyRegistered(addr("oracle-0"))));
        assert_eq!(fx.consensus.fees_collected(), Amount::ONE);
    }

    #[test]
    fn test_quorum_credits_insurees() {
        let mut fx = setup(50);
        let index = fx.open();
        let holders = fx.holders(index);
        assert!(holders.len() >= 3);

        let first = fx.respond(&holders[0], index, StatusCode::LateAirline).unwrap();
        assert_eq!(first, ResponseOutcome::Accepted { votes: 1, required: 3 });
        fx.respond(&holders[1], index, StatusCode::LateAirline).unwrap();
        assert!(fx.ledger.balance(&addr("p")).unwrap().is_zero());

        let outcome = fx.respond(&holders[2], index, StatusCode::LateAirline).unwrap();
        match outcome {
            ResponseOutcome::Resolved { status, credited } => {
                assert_eq!(status, StatusCode::LateAirline);
                assert_eq!(credited.unwrap().total.value(), dec!(1.2));
            }
            other => panic!("expected resolution, got {other:?}"),
        }
        assert_eq!(fx.ledger.balance(&addr("p")).unwrap().value(), dec!(1.2));

        let request = fx.consensus.request(index, &fx.flight).unwrap();
        assert_eq!(request.resolved_status(), Some(StatusCode::LateAirline));
    }

    #[test]
    fn test_first_status_to_quorum_wins() {
        let mut fx = setup(60);
        let index = fx.open();
        let holders = fx.holders(index);
        assert!(holders.len() >= 6);

        fx.respond(&holders[0], index, StatusCode::LateAirline).unwrap();
        fx.respond(&holders[1], index, StatusCode::LateWeather).unwrap();
        fx.respond(&holders[2], index, StatusCode::LateAirline).unwrap();
        fx.respond(&holders[3], index, StatusCode::LateWeather).unwrap();
        let outcome = fx.respond(&holders[4], index, StatusCode::LateWeather).unwrap();
        assert_eq!(
            outcome,
            ResponseOutcome::Resolved {
                status: StatusCode::LateWeather,
                credited: None
            }
        );

        // Resolved: the third airline vote is rejected, nobody is credited
        let late = fx.respond(&holders[5], index, StatusCode::LateAirline);
        assert!(matches!(late, Err(OracleError::RequestClosed { .. })));
        assert!(fx.ledger.balance(&addr("p")).unwrap().is_zero());
        assert_eq!(fx.ledger.policies.flight_policies(&fx.flight.key()).len(), 1);
    }

    #[test]
    fn test_response_validation() {
        let mut fx = setup(50);
        let index = fx.open();
        let holders = fx.holders(index);

        let stranger = fx.respond(&addr("stranger"), index, StatusCode::OnTime);
        assert_eq!(stranger, Err(OracleError::UnknownOracle(addr("stranger"))));

        let outsider = (0..50)
            .map(|i| addr(&format!("oracle-{i}")))
            .find(|o| !holders.contains(o))
            .unwrap();
        let wrong_index = fx.respond(&outsider, index, StatusCode::OnTime);
        assert!(matches!(wrong_index, Err(OracleError::UnknownOracleIndex { .. })));

        fx.respond(&holders[0], index, StatusCode::OnTime).unwrap();
        let duplicate = fx.respond(&holders[0], index, StatusCode::LateAirline);
        assert_eq!(duplicate, Err(OracleError::DuplicateResponse(holders[0].clone())));
        let request = fx.consensus.request(index, &fx.flight).unwrap();
        assert_eq!(request.votes_for(StatusCode::OnTime), 1);
    }

    #[test]
    fn test_response_without_request() {
        let mut fx = setup(1);
        let oracle = addr("oracle-0");
        let index = fx.consensus.oracle_indexes(&oracle).unwrap()[0];
        let result = fx.respond(&oracle, index, StatusCode::OnTime);
        assert!(matches!(result, Err(OracleError::RequestNotFound { .. })));
    }

    #[test]
    fn test_failed_credit_leaves_request_open() {
        let config = LedgerConfig {
            premium_cap: Amount::units(10),
            payout_multiplier: Decimal::MAX,
            ..LedgerConfig::default()
        };
        let mut fx = setup_with(50, dec!(2), config);
        let index = fx.open();
        let holders = fx.holders(index);
        fx.respond(&holders[0], index, StatusCode::LateAirline).unwrap();
        fx.respond(&holders[1], index, StatusCode::LateAirline).unwrap();

        // 2 * Decimal::MAX cannot be credited
        let result = fx.respond(&holders[2], index, StatusCode::LateAirline);
        assert_eq!(result, Err(OracleError::Ledger(LedgerError::Overflow)));

        let request = fx.consensus.request(index, &fx.flight).unwrap();
        assert!(request.is_open());
        assert!(!request.has_responded(&holders[2]));
        assert_eq!(request.votes_for(StatusCode::LateAirline), 2);
        assert!(fx.ledger.balance(&addr("p")).unwrap().is_zero());
        assert_eq!(fx.ledger.policies.flight_policies(&fx.flight.key()).len(), 1);
    }

    #[test]
    fn test_unauthorized_service_cannot_respond() {
        let mut fx = setup(50);
        let index = fx.open();
        let holders = fx.holders(index);

        let rogue = Caller::new(addr("rogue"), holders[0].clone());
        let flight = fx.flight.clone();
        let result = fx.consensus.submit_response(
            &fx.ledger.access,
            &mut fx.ledger.policies,
            &rogue,
            &holders[0],
            index,
            &flight,
            StatusCode::LateAirline,
        );
        assert_eq!(result, Err(OracleError::Ledger(LedgerError::Unauthorized(addr("rogue")))));
        let request = fx.consensus.request(index, &fx.flight).unwrap();
        assert_eq!(request.votes_for(StatusCode::LateAirline), 0);
    }

    #[test]
    fn test_events_emitted_in_order() {
        let mut fx = setup(50);
        let index = fx.open();
        let holders = fx.holders(index);
        for oracle in holders.iter().take(3) {
            fx.respond(oracle, index, StatusCode::OnTime).unwrap();
        }

        let events = fx.consensus.take_events();
        assert_eq!(events.len(), 5);
        assert!(matches!(events[0], OracleEvent::StatusRequested { .. }));
        assert!(matches!(events[3], OracleEvent::OracleReport { .. }));
        assert!(matches!(
            events[4],
            OracleEvent::FlightStatusResolved { status: StatusCode::OnTime, .. }
        ));
        assert!(fx.consensus.take_events().is_empty());
    }

    #[test]
    fn test_rerequest_after_resolution_opens_new_index() {
        let mut fx = setup(50);
        let first = fx.open();
        let holders = fx.holders(first);
        for oracle in holders.iter().take(3) {
            fx.respond(oracle, first, StatusCode::Unknown).unwrap();
        }
        assert_eq!(fx.consensus.open_requests().count(), 0);

        // Every retry lands on a request that is still open
        for _ in 0..100 {
            let index = fx.open();
            assert_ne!(index, first);
            assert!(fx.consensus.request(index, &fx.flight).unwrap().is_open());
        }
    }

    #[test]
    fn test_request_closed_once_every_index_resolved() {
        // Every oracle holds every index
        let config = LedgerConfig {
            oracle_index_space: 3,
            ..LedgerConfig::default()
        };
        let mut fx = setup_with(3, dec!(0.6), config);
        let oracles: Vec<Address> = (0..3).map(|i| addr(&format!("oracle-{i}"))).collect();

        let mut resolved = Vec::new();
        for _ in 0..3 {
            let index = fx.open();
            assert!(!resolved.contains(&index));
            for oracle in &oracles {
                fx.respond(oracle, index, StatusCode::OnTime).unwrap();
            }
            resolved.push(index);
        }

        let result = fx
            .consensus
            .request_status(&fx.ledger.access, &fx.app, &fx.flight);
        assert!(matches!(result, Err(OracleError::RequestClosed { .. })));
    }

    #[test]
    fn test_paused_ledger_blocks_requests_and_responses() {
        let mut fx = setup(50);
        let index = fx.open();
        let holders = fx.holders(index);

        let owner = Caller::new(addr("app"), addr("owner"));
        fx.ledger.set_operational(&owner, false).unwrap();

        let request = fx
            .consensus
            .request_status(&fx.ledger.access, &fx.app, &fx.flight);
        assert_eq!(
            request,
            Err(OracleError::Ledger(LedgerError::NotOperational))
        );
        let response = fx.respond(&holders[0], index, StatusCode::LateAirline);
        assert_eq!(
            response,
            Err(OracleError::Ledger(LedgerError::NotOperational))
        );
        assert_eq!(
            fx.consensus
                .request(index, &fx.flight)
                .unwrap()
                .votes_for(StatusCode::LateAirline),
            0
        );
        assert_eq!(fx.consensus.take_events().len(), 1);
    }
}
