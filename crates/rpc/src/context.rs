//! Application context - wires everything together

use flightsure_core::{Amount, FlightKey};
use flightsure_events::{Command, EventError, EventReader, EventStore};
use flightsure_ledger::{
    Caller, CreditSummary, FlightLedger, LedgerConfig, LedgerError, PayoutBook, RegistrationOutcome,
};
use flightsure_oracle::{OracleConsensus, OracleError, OracleEvent, ResponseOutcome};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Result of applying a command to the in-memory state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Done,
    Registration(RegistrationOutcome),
    Funded(Amount),
    Insured(FlightKey),
    Credited(CreditSummary),
    Withdrawn(Amount),
    OracleIndexes(Vec<u8>),
    Requested(OracleEvent),
    Response(ResponseOutcome),
}

/// A journaled command with its outcome
#[derive(Debug, Clone)]
pub struct Receipt {
    pub sequence: u64,
    pub outcome: Outcome,
    /// Oracle events emitted while applying the command
    pub events: Vec<OracleEvent>,
}

/// Application context - owns all ledger state and the journal
pub struct AppContext {
    pub config: LedgerConfig,
    pub ledger: FlightLedger,
    pub consensus: OracleConsensus,
    pub payouts: PayoutBook,
    event_store: EventStore,
    journal_path: PathBuf,
    replayed: usize,
}

impl AppContext {
    /// Open the data directory with its stored (or default) configuration
    pub fn new(data_path: impl AsRef<Path>) -> Result<Self, CommandError> {
        Self::open(data_path, None)
    }

    /// Open the data directory, replaying its journal.
    ///
    /// The configuration is stored as `config.json` next to the journal on
    /// first start. A different `config` is accepted only while the journal
    /// is still empty.
    pub fn open(
        data_path: impl AsRef<Path>,
        config: Option<LedgerConfig>,
    ) -> Result<Self, CommandError> {
        let data_path = data_path.as_ref();
        let journal_path = Self::journal_dir(data_path);
        let config_path = data_path.join("config.json");

        std::fs::create_dir_all(&journal_path)?;

        let records = EventReader::from_directory(&journal_path)?.read_verified()?;

        let stored = if config_path.exists() {
            Some(LedgerConfig::from_file(&config_path)?)
        } else {
            None
        };
        let config = match (stored, config) {
            (Some(stored), Some(requested)) if stored != requested && !records.is_empty() => {
                return Err(CommandError::ConfigMismatch(config_path));
            }
            (Some(stored), None) => stored,
            (_, requested) => {
                let config = requested.unwrap_or_default();
                config.validate()?;
                config.save(&config_path)?;
                config
            }
        };

        let ledger = FlightLedger::new(&config)?;
        let consensus = OracleConsensus::new(&config);
        let event_store = EventStore::open(&journal_path)?;

        let mut ctx = Self {
            config,
            ledger,
            consensus,
            payouts: PayoutBook::new(),
            event_store,
            journal_path,
            replayed: 0,
        };

        // Rebuild state from the journal
        for record in &records {
            let caller = Caller::new(record.service.clone(), record.sender.clone());
            ctx.apply(&caller, &record.command)
                .map_err(|e| CommandError::Replay {
                    sequence: record.sequence,
                    reason: e.to_string(),
                })?;
        }
        let replayed_events = ctx.consensus.take_events();
        ctx.replayed = records.len();

        if !records.is_empty() {
            info!(
                records = ctx.replayed,
                oracle_events = replayed_events.len(),
                "Journal replayed"
            );
        }

        Ok(ctx)
    }

    /// Apply a command and journal it.
    ///
    /// Flow: Apply → Append → Drain events. Rejected commands are not
    /// journaled; if the append fails the state is rolled back.
    pub fn execute(
        &mut self,
        caller: &Caller,
        command: Command,
        correlation_id: &str,
    ) -> Result<Receipt, CommandError> {
        let snapshot = (self.ledger.clone(), self.consensus.clone(), self.payouts.clone());

        let outcome = match self.apply(caller, &command) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(
                    command = command.name(),
                    service = %caller.service,
                    sender = %caller.sender,
                    error = %e,
                    "Command rejected"
                );
                return Err(e);
            }
        };

        let name = command.name();
        let record = match self.event_store.record(
            correlation_id,
            caller.service.clone(),
            caller.sender.clone(),
            command,
        ) {
            Ok(record) => record,
            Err(e) => {
                error!(command = name, error = %e, "Journal append failed, rolling back");
                (self.ledger, self.consensus, self.payouts) = snapshot;
                return Err(e.into());
            }
        };

        let events = self.consensus.take_events();
        for event in &events {
            log_event(event);
        }

        debug!(sequence = record.sequence, command = name, correlation_id, "Command applied");
        Ok(Receipt {
            sequence: record.sequence,
            outcome,
            events,
        })
    }

    /// Route a command to the component that owns it
    fn apply(&mut self, caller: &Caller, command: &Command) -> Result<Outcome, CommandError> {
        let outcome = match command {
            Command::SetOperational { mode } => {
                self.ledger.set_operational(caller, *mode)?;
                Outcome::Done
            }
            Command::AuthorizeCaller { service } => {
                self.ledger.authorize_caller(caller, service.clone())?;
                Outcome::Done
            }
            Command::DeauthorizeCaller { service } => {
                self.ledger.deauthorize_caller(caller, service)?;
                Outcome::Done
            }
            Command::AddAirline { airline, name } => {
                self.ledger.add_airline(caller, airline.clone(), name.clone())?;
                Outcome::Done
            }
            Command::RegisterAirline { airline, name } => Outcome::Registration(
                self.ledger
                    .register_airline(caller, airline.clone(), name.clone())?,
            ),
            Command::Vote { airline } => Outcome::Registration(self.ledger.vote(caller, airline)?),
            Command::FundAirline { airline, amount } => {
                Outcome::Funded(self.ledger.fund_airline(caller, airline, *amount)?)
            }
            Command::BuyInsurance {
                flight,
                insuree,
                premium,
            } => Outcome::Insured(self.ledger.buy_insurance(caller, flight, insuree, *premium)?),
            Command::CreditInsurees { flight } => {
                Outcome::Credited(self.ledger.credit_insurees(caller, flight)?)
            }
            Command::Withdraw { insuree } => {
                Outcome::Withdrawn(self.ledger.withdraw(caller, insuree, &mut self.payouts)?)
            }
            Command::RegisterOracle { oracle, fee } => Outcome::OracleIndexes(
                self.consensus
                    .register_oracle(&self.ledger.access, caller, oracle.clone(), *fee)?,
            ),
            Command::RequestStatus { flight } => Outcome::Requested(
                self.consensus
                    .request_status(&self.ledger.access, caller, flight)?,
            ),
            Command::SubmitResponse {
                oracle,
                index,
                flight,
                status,
            } => Outcome::Response(self.consensus.submit_response(
                &self.ledger.access,
                &mut self.ledger.policies,
                caller,
                oracle,
                *index,
                flight,
                *status,
            )?),
        };
        Ok(outcome)
    }

    /// Journal directory inside a data directory
    pub fn journal_dir(data_path: &Path) -> PathBuf {
        data_path.join("journal")
    }

    /// Get journal path
    pub fn journal_path(&self) -> &Path {
        &self.journal_path
    }

    /// Number of records replayed on open
    pub fn replayed(&self) -> usize {
        self.replayed
    }

    /// Get last sequence number
    pub fn last_sequence(&self) -> u64 {
        self.event_store.last_sequence()
    }
}

fn log_event(event: &OracleEvent) {
    match event {
        OracleEvent::StatusRequested {
            index,
            flight,
            flight_key,
        } => info!(index, flight = %flight, key = flight_key.short(), "OracleRequest"),
        OracleEvent::OracleReport {
            index,
            flight,
            oracle,
            status,
        } => info!(index, flight = %flight, oracle = %oracle, status = %status, "OracleReport"),
        OracleEvent::FlightStatusResolved {
            index,
            flight,
            status,
        } => info!(index, flight = %flight, status = %status, "FlightStatusInfo"),
    }
}

/// Errors while executing or replaying commands
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("Event store error: {0}")]
    Event(#[from] EventError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config {0} differs from the one the journal was written with")]
    ConfigMismatch(PathBuf),

    #[error("Replay failed at seq {sequence}: {reason}")]
    Replay { sequence: u64, reason: String },
}
