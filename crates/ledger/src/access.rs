//! Access control - operational flag and authorized callers

use crate::error::LedgerError;
use flightsure_core::Address;
use std::collections::BTreeSet;

/// Identity of an incoming call.
///
/// `service` is the coordinating service the call arrives through and is the
/// identity checked against the authorized-caller set. `sender` is the account
/// acting through it (a sponsoring airline, an oracle, the owner).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub service: Address,
    pub sender: Address,
}

impl Caller {
    pub fn new(service: Address, sender: Address) -> Self {
        Self { service, sender }
    }
}

/// Process-wide operational flag plus the authorized-caller set.
///
/// The owner is fixed at construction.
#[derive(Debug, Clone)]
pub struct AccessController {
    owner: Address,
    operational: bool,
    authorized: BTreeSet<Address>,
}

impl AccessController {
    pub fn new(owner: Address, authorized: impl IntoIterator<Item = Address>) -> Self {
        Self {
            owner,
            operational: true,
            authorized: authorized.into_iter().collect(),
        }
    }

    pub fn owner(&self) -> &Address {
        &self.owner
    }

    pub fn is_operational(&self) -> bool {
        self.operational
    }

    pub fn is_authorized(&self, service: &Address) -> bool {
        self.authorized.contains(service)
    }

    pub fn authorized_callers(&self) -> impl Iterator<Item = &Address> {
        self.authorized.iter()
    }

    pub fn ensure_operational(&self) -> Result<(), LedgerError> {
        if self.operational {
            Ok(())
        } else {
            Err(LedgerError::NotOperational)
        }
    }

    /// Gate for every mutating entry point
    pub fn ensure_authorized(&self, caller: &Caller) -> Result<(), LedgerError> {
        self.ensure_operational()?;
        if !self.is_authorized(&caller.service) {
            return Err(LedgerError::Unauthorized(caller.service.clone()));
        }
        Ok(())
    }

    fn ensure_owner(&self, caller: &Caller) -> Result<(), LedgerError> {
        if caller.sender != self.owner {
            return Err(LedgerError::Unauthorized(caller.sender.clone()));
        }
        Ok(())
    }

    /// Toggle the operational flag. The only mutation allowed while paused.
    pub fn set_operational(&mut self, caller: &Caller, mode: bool) -> Result<(), LedgerError> {
        self.ensure_owner(caller)?;
        if self.operational == mode {
            return Err(LedgerError::OperationalUnchanged(mode));
        }
        self.operational = mode;
        tracing::info!(operational = mode, "Operational flag changed");
        Ok(())
    }

    pub fn authorize_caller(
        &mut self,
        caller: &Caller,
        service: Address,
    ) -> Result<(), LedgerError> {
        self.ensure_operational()?;
        self.ensure_owner(caller)?;
        tracing::info!(service = %service, "Caller authorized");
        self.authorized.insert(service);
        Ok(())
    }

    pub fn deauthorize_caller(
        &mut self,
        caller: &Caller,
        service: &Address,
    ) -> Result<(), LedgerError> {
        self.ensure_operational()?;
        self.ensure_owner(caller)?;
        if self.authorized.remove(service) {
            tracing::info!(service = %service, "Caller deauthorized");
        }
        Ok(())
    }
}
