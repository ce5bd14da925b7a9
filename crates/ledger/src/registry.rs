//! Airline registry - registration, voting and funding
//!
//! Lifecycle of an airline:
//!
//! ```text
//! Added --(direct registration | vote quorum)--> Registered --(funded >= stake)--> Funded
//! ```
//!
//! Only `Funded` airlines may add, register or vote for other airlines, and
//! only flights of `Funded` airlines can be insured.

use crate::access::{AccessController, Caller};
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use flightsure_core::{Address, Amount};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AirlineStatus {
    /// Known to the registry, waiting for registration votes
    Added,
    Registered,
    /// Registered and staked at least the minimum
    Funded,
}

/// A single airline record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Airline {
    pub address: Address,
    pub name: String,
    pub status: AirlineStatus,
    pub funded: Amount,
    pub votes: u32,
    voters: BTreeSet<Address>,
}

impl Airline {
    fn new(address: Address, name: String) -> Self {
        Self {
            address,
            name,
            status: AirlineStatus::Added,
            funded: Amount::ZERO,
            votes: 0,
            voters: BTreeSet::new(),
        }
    }

    pub fn is_registered(&self) -> bool {
        matches!(self.status, AirlineStatus::Registered | AirlineStatus::Funded)
    }

    pub fn is_funded(&self) -> bool {
        self.status == AirlineStatus::Funded
    }

    pub fn has_voted(&self, voter: &Address) -> bool {
        self.voters.contains(voter)
    }

    fn record_vote(&mut self, voter: Address) {
        self.voters.insert(voter);
        self.votes += 1;
    }
}

/// Result of a registration attempt or vote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    Registered,
    /// Vote recorded, quorum not reached yet
    Pending { votes: u32, required: u32 },
}

/// Owner of every airline record
#[derive(Debug, Clone)]
pub struct AccountRegistry {
    airlines: BTreeMap<Address, Airline>,
    min_stake: Amount,
    direct_registration_limit: usize,
}

impl AccountRegistry {
    /// Create a registry with the configured first airline already registered
    pub fn new(config: &LedgerConfig) -> Self {
        let mut first = Airline::new(
            config.first_airline.clone(),
            config.first_airline_name.clone(),
        );
        first.status = AirlineStatus::Registered;
        first.votes = 1;

        let mut airlines = BTreeMap::new();
        airlines.insert(first.address.clone(), first);

        Self {
            airlines,
            min_stake: config.min_airline_stake,
            direct_registration_limit: config.direct_registration_limit,
        }
    }

    pub fn min_stake(&self) -> Amount {
        self.min_stake
    }

    /// Fail unless `address` is a funded airline
    pub fn ensure_funded(&self, address: &Address) -> Result<&Airline, LedgerError> {
        let airline = self
            .airlines
            .get(address)
            .filter(|a| a.is_registered())
            .ok_or_else(|| LedgerError::NotRegistered(address.clone()))?;

        if !airline.is_funded() {
            return Err(LedgerError::InsufficientFunding {
                airline: address.clone(),
                funded: airline.funded,
                required: self.min_stake,
            });
        }
        Ok(airline)
    }

    /// Votes needed to register one more airline: half of the registered
    /// airlines, rounded up
    pub fn required_votes(&self) -> u32 {
        let registered = self.registered_count() as u32;
        registered.div_ceil(2).max(1)
    }

    /// Add an airline without registering it
    pub fn add_airline(
        &mut self,
        access: &AccessController,
        caller: &Caller,
        identity: Address,
        name: impl Into<String>,
    ) -> Result<(), LedgerError> {
        access.ensure_authorized(caller)?;
        self.ensure_funded(&caller.sender)?;
        if self.airlines.contains_key(&identity) {
            return Err(LedgerError::AlreadyExists(identity));
        }

        tracing::info!(airline = %identity, sponsor = %caller.sender, "Airline added");
        self.airlines
            .insert(identity.clone(), Airline::new(identity, name.into()));
        Ok(())
    }

    /// Register an airline on behalf of the funded airline `caller.sender`.
    ///
    /// Below the direct registration limit the target is registered at once.
    /// Past it the call counts as the sponsor's vote.
    pub fn register_airline(
        &mut self,
        access: &AccessController,
        caller: &Caller,
        identity: Address,
        name: impl Into<String>,
    ) -> Result<RegistrationOutcome, LedgerError> {
        access.ensure_authorized(caller)?;
        self.ensure_funded(&caller.sender)?;

        if let Some(existing) = self.airlines.get(&identity) {
            if existing.is_registered() {
                return Err(LedgerError::AlreadyRegistered(identity));
            }
            if existing.has_voted(&caller.sender) {
                return Err(LedgerError::DuplicateVote {
                    voter: caller.sender.clone(),
                    target: identity,
                });
            }
        }

        let direct = self.registered_count() < self.direct_registration_limit;
        let required = self.required_votes();

        let airline = self
            .airlines
            .entry(identity.clone())
            .or_insert_with(|| Airline::new(identity, name.into()));
        airline.record_vote(caller.sender.clone());

        if direct || airline.votes >= required {
            airline.status = AirlineStatus::Registered;
            tracing::info!(
                airline = %airline.address,
                sponsor = %caller.sender,
                votes = airline.votes,
                direct,
                "Airline registered"
            );
            return Ok(RegistrationOutcome::Registered);
        }

        tracing::info!(
            airline = %airline.address,
            votes = airline.votes,
            required,
            "Registration vote recorded"
        );
        Ok(RegistrationOutcome::Pending {
            votes: airline.votes,
            required,
        })
    }

    /// Cast the funded airline `caller.sender`'s vote for an added airline
    pub fn vote(
        &mut self,
        access: &AccessController,
        caller: &Caller,
        target: &Address,
    ) -> Result<RegistrationOutcome, LedgerError> {
        access.ensure_authorized(caller)?;
        self.ensure_funded(&caller.sender)?;

        let required = self.required_votes();
        let airline = self
            .airlines
            .get_mut(target)
            .ok_or_else(|| LedgerError::NotRegistered(target.clone()))?;

        if airline.status != AirlineStatus::Added {
            return Err(LedgerError::AlreadyRegistered(target.clone()));
        }
        if airline.has_voted(&caller.sender) {
            return Err(LedgerError::DuplicateVote {
                voter: caller.sender.clone(),
                target: target.clone(),
            });
        }

        airline.record_vote(caller.sender.clone());
        if airline.votes >= required {
            airline.status = AirlineStatus::Registered;
            tracing::info!(airline = %target, votes = airline.votes, "Airline registered by vote");
            return Ok(RegistrationOutcome::Registered);
        }

        Ok(RegistrationOutcome::Pending {
            votes: airline.votes,
            required,
        })
    }

    /// Add stake to a registered airline. Returns the new funded total.
    pub fn fund_airline(
        &mut self,
        access: &AccessController,
        caller: &Caller,
        identity: &Address,
        amount: Amount,
    ) -> Result<Amount, LedgerError> {
        access.ensure_authorized(caller)?;
        if amount.is_zero() {
            return Err(LedgerError::InvalidAmount);
        }

        let min_stake = self.min_stake;
        let airline = self
            .airlines
            .get_mut(identity)
            .filter(|a| a.is_registered())
            .ok_or_else(|| LedgerError::NotRegistered(identity.clone()))?;

        let funded = airline
            .funded
            .checked_add(&amount)
            .ok_or(LedgerError::Overflow)?;
        airline.funded = funded;

        if airline.status == AirlineStatus::Registered && funded >= min_stake {
            airline.status = AirlineStatus::Funded;
            tracing::info!(airline = %identity, funded = %funded, "Airline fully funded");
        } else {
            tracing::debug!(airline = %identity, funded = %funded, "Airline funding added");
        }
        Ok(funded)
    }

    // === Queries ===

    pub fn airline(&self, address: &Address) -> Option<&Airline> {
        self.airlines.get(address)
    }

    pub fn airlines(&self) -> impl Iterator<Item = &Airline> {
        self.airlines.values()
    }

    pub fn is_registered(&self, address: &Address) -> bool {
        self.airlines.get(address).is_some_and(Airline::is_registered)
    }

    pub fn is_funded(&self, address: &Address) -> bool {
        self.airlines.get(address).is_some_and(Airline::is_funded)
    }

    pub fn vote_count(&self, address: &Address) -> u32 {
        self.airlines.get(address).map_or(0, |a| a.votes)
    }

    /// All known airlines, registered or not
    pub fn airline_count(&self) -> usize {
        self.airlines.len()
    }

    pub fn registered_count(&self) -> usize {
        self.airlines.values().filter(|a| a.is_registered()).count()
    }

    pub fn funded_count(&self) -> usize {
        self.airlines.values().filter(|a| a.is_funded()).count()
    }
}
