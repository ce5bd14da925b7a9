//! CLI commands

use flightsure_core::{Address, Amount, Flight, StatusCode};
use flightsure_events::{verify_chain, ChainError, Command, EventReader};
use flightsure_ledger::{Caller, RegistrationOutcome};
use flightsure_oracle::{FlightStatusOracle, MockOracle, OracleEvent, ResponseOutcome};
use rust_decimal::Decimal;
use std::path::Path;

use crate::context::{AppContext, Outcome};

/// Print the operational flag and component counters
pub fn status(ctx: &AppContext) -> Result<(), anyhow::Error> {
    let access = &ctx.ledger.access;
    let registry = &ctx.ledger.registry;

    println!(
        "Operational: {}",
        if access.is_operational() { "yes" } else { "PAUSED" }
    );
    println!("Owner: {}", access.owner());
    let callers: Vec<String> = access.authorized_callers().map(|c| c.to_string()).collect();
    println!("Authorized callers: {}", callers.join(", "));
    println!(
        "Airlines: {} added, {} registered, {} funded (next registration needs {} votes)",
        registry.airline_count(),
        registry.registered_count(),
        registry.funded_count(),
        registry.required_votes()
    );
    println!(
        "Oracles: {} registered, {} fees collected, {} open requests",
        ctx.consensus.oracle_count(),
        ctx.consensus.fees_collected(),
        ctx.consensus.open_requests().count()
    );
    println!("Journal: {} records", ctx.last_sequence());
    Ok(())
}

/// Pause or resume the ledger (owner only)
pub fn set_operational(
    ctx: &mut AppContext,
    caller: &Caller,
    mode: bool,
    correlation_id: &str,
) -> Result<(), anyhow::Error> {
    let receipt = ctx.execute(caller, Command::SetOperational { mode }, correlation_id)?;
    let state = if mode { "resumed" } else { "paused" };
    println!("✅ Ledger {} (seq: {})", state, receipt.sequence);
    Ok(())
}

/// Grant a service access to the ledger
pub fn authorize(
    ctx: &mut AppContext,
    caller: &Caller,
    service: Address,
    correlation_id: &str,
) -> Result<(), anyhow::Error> {
    let command = Command::AuthorizeCaller {
        service: service.clone(),
    };
    let receipt = ctx.execute(caller, command, correlation_id)?;
    println!("✅ Authorized {} (seq: {})", service, receipt.sequence);
    Ok(())
}

/// Revoke a service's access
pub fn deauthorize(
    ctx: &mut AppContext,
    caller: &Caller,
    service: Address,
    correlation_id: &str,
) -> Result<(), anyhow::Error> {
    let command = Command::DeauthorizeCaller {
        service: service.clone(),
    };
    let receipt = ctx.execute(caller, command, correlation_id)?;
    println!("✅ Deauthorized {} (seq: {})", service, receipt.sequence);
    Ok(())
}

pub fn add_airline(
    ctx: &mut AppContext,
    caller: &Caller,
    airline: Address,
    name: &str,
    correlation_id: &str,
) -> Result<(), anyhow::Error> {
    let command = Command::AddAirline {
        airline: airline.clone(),
        name: name.to_string(),
    };
    let receipt = ctx.execute(caller, command, correlation_id)?;
    println!("✅ Added airline {} ({}) (seq: {})", airline, name, receipt.sequence);
    Ok(())
}

pub fn register_airline(
    ctx: &mut AppContext,
    caller: &Caller,
    airline: Address,
    name: &str,
    correlation_id: &str,
) -> Result<(), anyhow::Error> {
    let command = Command::RegisterAirline {
        airline: airline.clone(),
        name: name.to_string(),
    };
    let receipt = ctx.execute(caller, command, correlation_id)?;
    print_registration(&airline, &receipt.outcome, receipt.sequence);
    Ok(())
}

pub fn vote(
    ctx: &mut AppContext,
    caller: &Caller,
    airline: Address,
    correlation_id: &str,
) -> Result<(), anyhow::Error> {
    let command = Command::Vote {
        airline: airline.clone(),
    };
    let receipt = ctx.execute(caller, command, correlation_id)?;
    print_registration(&airline, &receipt.outcome, receipt.sequence);
    Ok(())
}

fn print_registration(airline: &Address, outcome: &Outcome, sequence: u64) {
    match outcome {
        Outcome::Registration(RegistrationOutcome::Registered) => {
            println!("✅ Airline {} registered (seq: {})", airline, sequence);
        }
        Outcome::Registration(RegistrationOutcome::Pending { votes, required }) => {
            println!(
                "🗳️  Vote recorded for {}: {}/{} (seq: {})",
                airline, votes, required, sequence
            );
        }
        other => println!("Unexpected outcome: {:?}", other),
    }
}

/// Stake funds for an airline
pub fn fund(
    ctx: &mut AppContext,
    caller: &Caller,
    airline: Address,
    amount: Decimal,
    correlation_id: &str,
) -> Result<(), anyhow::Error> {
    let amount = Amount::new(amount)?;
    let command = Command::FundAirline {
        airline: airline.clone(),
        amount,
    };
    let receipt = ctx.execute(caller, command, correlation_id)?;

    if let Outcome::Funded(total) = receipt.outcome {
        let funded = ctx.ledger.registry.is_funded(&airline);
        println!(
            "✅ Funded {} with {} (total: {}, participating: {}) (seq: {})",
            airline,
            amount,
            total,
            if funded { "yes" } else { "no" },
            receipt.sequence
        );
    }
    Ok(())
}

/// Show an airline's registration state
pub fn airline(ctx: &AppContext, airline: &Address) -> Result<(), anyhow::Error> {
    let Some(record) = ctx.ledger.registry.airline(airline) else {
        anyhow::bail!("Unknown airline {}", airline);
    };

    println!("Airline {} ({})", record.address, record.name);
    println!("  Status: {:?}", record.status);
    println!("  Votes:  {}", record.votes);
    println!(
        "  Funded: {} (stake required: {})",
        record.funded,
        ctx.ledger.registry.min_stake()
    );
    Ok(())
}

/// Buy flight delay insurance
pub fn buy(
    ctx: &mut AppContext,
    caller: &Caller,
    flight: Flight,
    insuree: Address,
    premium: Decimal,
    correlation_id: &str,
) -> Result<(), anyhow::Error> {
    let premium = Amount::new(premium)?;
    let command = Command::BuyInsurance {
        flight: flight.clone(),
        insuree: insuree.clone(),
        premium,
    };
    let receipt = ctx.execute(caller, command, correlation_id)?;

    if let Outcome::Insured(key) = receipt.outcome {
        println!(
            "✅ Insured {} on {} for {} (key: {}) (seq: {})",
            insuree,
            flight,
            premium,
            key.short(),
            receipt.sequence
        );
        println!(
            "   Premium paid: {} / {}",
            ctx.ledger.policies.premium_paid(&insuree),
            ctx.ledger.policies.premium_cap()
        );
    }
    Ok(())
}

/// Get withdrawable balance for an insuree
pub fn balance(ctx: &AppContext, insuree: &Address) -> Result<(), anyhow::Error> {
    let balance = ctx.ledger.balance(insuree)?;
    println!("Balance for {}: {}", insuree, balance);
    Ok(())
}

/// Withdraw an insuree's whole balance
pub fn withdraw(
    ctx: &mut AppContext,
    caller: &Caller,
    insuree: Address,
    correlation_id: &str,
) -> Result<(), anyhow::Error> {
    let command = Command::Withdraw {
        insuree: insuree.clone(),
    };
    let receipt = ctx.execute(caller, command, correlation_id)?;

    if let Outcome::Withdrawn(amount) = receipt.outcome {
        println!(
            "✅ Withdrew {} to {} (seq: {})",
            amount, insuree, receipt.sequence
        );
    }
    Ok(())
}

pub fn register_oracle(
    ctx: &mut AppContext,
    caller: &Caller,
    oracle: Address,
    fee: Option<Decimal>,
    correlation_id: &str,
) -> Result<(), anyhow::Error> {
    let fee = match fee {
        Some(fee) => Amount::new(fee)?,
        None => ctx.config.oracle_registration_fee,
    };
    let command = Command::RegisterOracle {
        oracle: oracle.clone(),
        fee,
    };
    let receipt = ctx.execute(caller, command, correlation_id)?;

    if let Outcome::OracleIndexes(indexes) = receipt.outcome {
        println!(
            "✅ Registered oracle {} with indexes {:?} (seq: {})",
            oracle, indexes, receipt.sequence
        );
    }
    Ok(())
}

pub fn request_status(
    ctx: &mut AppContext,
    caller: &Caller,
    flight: Flight,
    correlation_id: &str,
) -> Result<(), anyhow::Error> {
    let index = open_request(ctx, caller, &flight, correlation_id)?.0;
    let holders = ctx.consensus.oracles_for_index(index).count();
    println!(
        "📡 Requested status of {} at index {} ({} oracles hold it)",
        flight, index, holders
    );
    Ok(())
}

/// Submit one oracle's report
pub fn respond(
    ctx: &mut AppContext,
    caller: &Caller,
    oracle: Address,
    index: u8,
    flight: Flight,
    status: StatusCode,
    correlation_id: &str,
) -> Result<(), anyhow::Error> {
    let command = Command::SubmitResponse {
        oracle: oracle.clone(),
        index,
        flight,
        status,
    };
    let receipt = ctx.execute(caller, command, correlation_id)?;
    if let Outcome::Response(outcome) = &receipt.outcome {
        print_response(&oracle, outcome, receipt.sequence);
    }
    Ok(())
}

/// Open a status request and have every oracle holding its index answer
/// through a `MockOracle` reporting `status`.
pub async fn simulate(
    ctx: &mut AppContext,
    caller: &Caller,
    flight: Flight,
    status: StatusCode,
    correlation_id: &str,
) -> Result<(), anyhow::Error> {
    let (index, event) = open_request(ctx, caller, &flight, &format!("{correlation_id}-request"))?;

    let agents: Vec<MockOracle> = ctx
        .consensus
        .oracles_for_index(index)
        .filter(|oracle| {
            ctx.consensus
                .request(index, &flight)
                .map_or(true, |request| !request.has_responded(oracle))
        })
        .map(|oracle| MockOracle::new(oracle.clone()).with_fallback(status))
        .collect();

    println!(
        "📡 Requested status of {} at index {}; {} oracles answering",
        flight,
        index,
        agents.len()
    );

    for (n, agent) in agents.iter().enumerate() {
        let Some(answer) = agent.answer(&event).await else {
            continue;
        };
        let (index, flight, reported) = answer?;

        let command = Command::SubmitResponse {
            oracle: agent.identity().clone(),
            index,
            flight,
            status: reported,
        };
        let receipt = ctx.execute(caller, command, &format!("{correlation_id}-{n}"))?;
        if let Outcome::Response(outcome) = &receipt.outcome {
            print_response(agent.identity(), outcome, receipt.sequence);
            if matches!(outcome, ResponseOutcome::Resolved { .. }) {
                return Ok(());
            }
        }
    }

    println!(
        "⏳ Request still open: fewer than {} oracles agreed",
        ctx.consensus.quorum()
    );
    Ok(())
}

fn open_request(
    ctx: &mut AppContext,
    caller: &Caller,
    flight: &Flight,
    correlation_id: &str,
) -> Result<(u8, OracleEvent), anyhow::Error> {
    let command = Command::RequestStatus {
        flight: flight.clone(),
    };
    let receipt = ctx.execute(caller, command, correlation_id)?;
    if let Outcome::Requested(event) = receipt.outcome {
        if let OracleEvent::StatusRequested { index, .. } = event {
            return Ok((index, event));
        }
    }
    anyhow::bail!("Status request for {} was not opened", flight)
}

fn print_response(oracle: &Address, outcome: &ResponseOutcome, sequence: u64) {
    match outcome {
        ResponseOutcome::Accepted { votes, required } => {
            println!(
                "   {} reported: {}/{} (seq: {})",
                oracle, votes, required, sequence
            );
        }
        ResponseOutcome::Resolved { status, credited } => {
            println!("✅ Resolved as {} by {} (seq: {})", status, oracle, sequence);
            if let Some(summary) = credited {
                println!(
                    "   Credited {} insurees, total {}",
                    summary.insurees, summary.total
                );
            }
        }
    }
}

/// Verify the journal hash chain.
///
/// Reads the journal directly instead of opening an `AppContext`, which
/// refuses a broken chain. Returns the first break found.
pub fn audit(data_path: &Path) -> Result<Option<ChainError>, anyhow::Error> {
    let reader = EventReader::from_directory(AppContext::journal_dir(data_path))?;
    let records = reader.read_all()?;

    match verify_chain(&records) {
        Ok(()) => {
            println!("✅ Hash chain verified ({} records)", records.len());
            Ok(None)
        }
        Err(e) => {
            println!("❌ Hash chain broken: {}", e);
            Ok(Some(e))
        }
    }
}
