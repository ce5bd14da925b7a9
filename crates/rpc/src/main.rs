//! FlightSure CLI - Main entry point

use clap::{Args, Parser, Subcommand};
use flightsure_core::{Address, Flight, StatusCode};
use flightsure_ledger::{Caller, LedgerConfig};
use flightsure_rpc::{commands, AppContext};
use rust_decimal::Decimal;
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "flightsure")]
#[command(about = "FlightSure - flight delay insurance ledger", long_about = None)]
struct Cli {
    /// Data directory path
    #[arg(short, long, default_value = "./data")]
    data: PathBuf,

    /// Ledger configuration (JSON); only honored while the journal is empty
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Service the command is issued through
    #[arg(long, default_value = "app", global = true)]
    service: Address,

    /// Account acting through the service (defaults to the owner)
    #[arg(long = "as", global = true)]
    sender: Option<Address>,

    /// Optional correlation ID
    #[arg(long, global = true)]
    correlation_id: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FlightArgs {
    /// Operating airline
    airline: Address,
    /// Flight designator, e.g. AA100
    flight: String,
    /// Scheduled departure (unix seconds)
    timestamp: u64,
}

impl FlightArgs {
    fn into_flight(self) -> Flight {
        Flight::new(self.airline, self.flight, self.timestamp)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Show ledger status
    Status,

    /// Pause all mutations (owner only)
    Pause,

    /// Resume operation (owner only)
    Resume,

    /// Authorize a service to call the ledger (owner only)
    Authorize { service: Address },

    /// Revoke a service's authorization (owner only)
    Deauthorize { service: Address },

    /// Add an airline without registering it (sponsor must be funded)
    AddAirline { airline: Address, name: String },

    /// Register an airline, or vote for it once past the direct limit
    RegisterAirline { airline: Address, name: String },

    /// Vote for a pending airline
    Vote { airline: Address },

    /// Stake funds for a registered airline
    Fund { airline: Address, amount: Decimal },

    /// Show an airline
    Airline { airline: Address },

    /// Buy insurance for a flight
    Buy {
        #[command(flatten)]
        flight: FlightArgs,
        /// Premium to pay
        premium: Decimal,
        /// Insured passenger (defaults to the sender)
        #[arg(long)]
        insuree: Option<Address>,
    },

    /// Check withdrawable balance
    Balance {
        /// Insuree (defaults to the sender)
        insuree: Option<Address>,
    },

    /// Withdraw the full balance
    Withdraw {
        /// Insuree (defaults to the sender)
        #[arg(long)]
        insuree: Option<Address>,
    },

    /// Register an oracle and print its indexes
    RegisterOracle {
        oracle: Address,
        /// Registration fee (defaults to the configured fee)
        #[arg(long)]
        fee: Option<Decimal>,
    },

    /// Ask the oracle network for a flight's status
    RequestStatus {
        #[command(flatten)]
        flight: FlightArgs,
    },

    /// Submit an oracle response
    Respond {
        oracle: Address,
        index: u8,
        #[command(flatten)]
        flight: FlightArgs,
        /// on-time, late-airline, late-weather, late-technical, late-other, unknown
        status: StatusCode,
    },

    /// Request a flight status and answer it with mock oracles
    Simulate {
        #[command(flatten)]
        flight: FlightArgs,
        /// Status every mock oracle reports
        status: StatusCode,
    },

    /// Audit the journal (verify hash chain)
    Audit,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    // Audit reads the journal as-is; opening a context would reject a broken chain
    if let Commands::Audit = cli.command {
        commands::audit(&cli.data)?;
        return Ok(());
    }

    let config = cli
        .config
        .as_deref()
        .map(LedgerConfig::from_file)
        .transpose()?;

    // Create application context (replays the journal)
    let mut ctx = AppContext::open(&cli.data, config)?;

    let sender = cli.sender.unwrap_or_else(|| ctx.config.owner.clone());
    let caller = Caller::new(cli.service, sender);
    let correlation_id = cli
        .correlation_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    match cli.command {
        Commands::Status => commands::status(&ctx)?,

        Commands::Pause => commands::set_operational(&mut ctx, &caller, false, &correlation_id)?,

        Commands::Resume => commands::set_operational(&mut ctx, &caller, true, &correlation_id)?,

        Commands::Authorize { service } => {
            commands::authorize(&mut ctx, &caller, service, &correlation_id)?;
        }

        Commands::Deauthorize { service } => {
            commands::deauthorize(&mut ctx, &caller, service, &correlation_id)?;
        }

        Commands::AddAirline { airline, name } => {
            commands::add_airline(&mut ctx, &caller, airline, &name, &correlation_id)?;
        }

        Commands::RegisterAirline { airline, name } => {
            commands::register_airline(&mut ctx, &caller, airline, &name, &correlation_id)?;
        }

        Commands::Vote { airline } => {
            commands::vote(&mut ctx, &caller, airline, &correlation_id)?;
        }

        Commands::Fund { airline, amount } => {
            commands::fund(&mut ctx, &caller, airline, amount, &correlation_id)?;
        }

        Commands::Airline { airline } => commands::airline(&ctx, &airline)?,

        Commands::Buy {
            flight,
            premium,
            insuree,
        } => {
            let insuree = insuree.unwrap_or_else(|| caller.sender.clone());
            commands::buy(
                &mut ctx,
                &caller,
                flight.into_flight(),
                insuree,
                premium,
                &correlation_id,
            )?;
        }

        Commands::Balance { insuree } => {
            let insuree = insuree.unwrap_or_else(|| caller.sender.clone());
            commands::balance(&ctx, &insuree)?;
        }

        Commands::Withdraw { insuree } => {
            let insuree = insuree.unwrap_or_else(|| caller.sender.clone());
            commands::withdraw(&mut ctx, &caller, insuree, &correlation_id)?;
        }

        Commands::RegisterOracle { oracle, fee } => {
            commands::register_oracle(&mut ctx, &caller, oracle, fee, &correlation_id)?;
        }

        Commands::RequestStatus { flight } => {
            commands::request_status(&mut ctx, &caller, flight.into_flight(), &correlation_id)?;
        }

        Commands::Respond {
            oracle,
            index,
            flight,
            status,
        } => {
            commands::respond(
                &mut ctx,
                &caller,
                oracle,
                index,
                flight.into_flight(),
                status,
                &correlation_id,
            )?;
        }

        Commands::Simulate { flight, status } => {
            commands::simulate(&mut ctx, &caller, flight.into_flight(), status, &correlation_id)
                .await?;
        }

        // Handled before the context is opened
        Commands::Audit => {}
    }

    Ok(())
}
