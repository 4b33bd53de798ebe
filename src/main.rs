
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::*;
use env_logger::Builder;
use log::{error, info, warn, LevelFilter};
use prettytable::{row, Table};
use tokio::sync::broadcast::error::TryRecvError;

use flightsure_core::config::{ConfigError, SuretyConfig};
use flightsure_core::governance::{RegistrationOutcome, VoteOutcome};
use flightsure_core::insurance::FlightStatus;
use flightsure_core::oracle::{
    ChaChaIndexSource, ChainHashIndexSource, IndexSource, ResponseOutcome,
};
use flightsure_core::storage::{SnapshotStore, StorageError};
use flightsure_core::utils::{current_time, format_timestamp, time_since};
use flightsure_core::{AccountId, Amount, FlightSurety, SuretyError, SuretyEvent, Transition};

#[derive(Parser)]
#[clap(author, version, about)]
/// Flight-delay insurance ledger with airline governance and oracle settlement
struct Cli {
    #[clap(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Ledger state file; overrides the configured one
    #[clap(short, long)]
    state: Option<PathBuf>,

    /// Log level for output; overrides the configured one
    #[clap(short, long)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy a new ledger with its founding airline
    Init {
        owner: String,
        first_airline: String,
        /// Replace an existing state file
        #[clap(long)]
        force: bool,
    },

    /// Register an airline, or open a vote on it once the committee is large enough
    RegisterAirline {
        #[clap(long)]
        caller: String,
        candidate: String,
    },

    /// Vote for a pending registration request
    Approve {
        #[clap(long)]
        caller: String,
        request_id: u64,
    },

    /// Contribute airline funding to the pool
    Fund {
        #[clap(long)]
        caller: String,
        amount: Amount,
    },

    /// Register a flight operated by the caller
    RegisterFlight {
        #[clap(long)]
        caller: String,
        designator: String,
        /// Scheduled departure (Unix seconds); defaults to now
        #[clap(short, long)]
        timestamp: Option<u64>,
        #[clap(long, default_value = "0")]
        value: Amount,
    },

    /// Insure the caller on a flight
    Buy {
        #[clap(long)]
        caller: String,
        airline: String,
        designator: String,
        timestamp: u64,
        amount: Amount,
    },

    /// Ask oracles for a flight's status
    #[clap(alias = "fetch")]
    FetchStatus {
        #[clap(long)]
        caller: String,
        airline: String,
        designator: String,
        timestamp: u64,
    },

    /// Submit an oracle report
    Respond {
        #[clap(long)]
        caller: String,
        index: u8,
        airline: String,
        designator: String,
        timestamp: u64,
        /// Status code: 0, 10, 20, 30, 40 or 50
        status: u8,
    },

    /// Withdraw the caller's credit
    Pay {
        #[clap(long)]
        caller: String,
    },

    /// Register the caller as an oracle
    RegisterOracle {
        #[clap(long)]
        caller: String,
        #[clap(long, default_value = "1")]
        fee: Amount,
    },

    /// Stop accepting transitions (owner only)
    Pause {
        #[clap(long)]
        caller: String,
    },

    /// Accept transitions again (owner only)
    Resume {
        #[clap(long)]
        caller: String,
    },

    /// List registered flights
    #[clap(alias = "ls")]
    Flights,

    /// Show the airline registration queue
    Queue,

    /// Show ledger totals
    Status,

    /// Run a complete payout scenario in memory
    Demo {
        /// Number of insured passengers
        #[clap(short, long, default_value = "1")]
        passengers: u32,
        /// Number of oracles answering requests
        #[clap(short, long, default_value = "20")]
        oracles: u32,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Surety(#[from] SuretyError),

    #[error("State file {0} already exists; pass --force to replace it")]
    StateExists(PathBuf),

    #[error("{0}")]
    Demo(String),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match SuretyConfig::load(cli.config.as_deref()).map_err(CliError::from) {
        Ok(config) => config,
        Err(e) => {
            // The logger is not up yet.
            eprintln!("{} {}", "error:".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };

    // Setup logging
    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    let log_level = match level.to_lowercase().as_str() {
        "trace" => LevelFilter::Trace,
        "debug" => LevelFilter::Debug,
        "info" => LevelFilter::Info,
        "warn" => LevelFilter::Warn,
        "error" => LevelFilter::Error,
        "off" => LevelFilter::Off,
        _ => LevelFilter::Info,
    };
    Builder::new()
        .filter_level(log_level)
        .format_timestamp_millis()
        .init();

    let state_file = cli.state.clone().unwrap_or_else(|| config.state_file.clone());
    match run(cli.command, &config, &state_file) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// Index source for a restored ledger. Seeded sources are offset by the block height so
/// successive invocations do not replay the same draws.
fn index_source_at(config: &SuretyConfig, height: u64) -> Box<dyn IndexSource> {
    match config.index_seed {
        Some(seed) => Box::new(ChaChaIndexSource::from_seed(seed.wrapping_add(height))),
        None => Box::new(ChainHashIndexSource::new()),
    }
}

fn open(config: &SuretyConfig, store: &SnapshotStore) -> Result<FlightSurety, CliError> {
    let snapshot = store.load_snapshot()?;
    let source = index_source_at(config, snapshot.block.height);
    Ok(FlightSurety::restore(snapshot, source))
}

fn run(command: Commands, config: &SuretyConfig, state_file: &Path) -> Result<(), CliError> {
    let store = SnapshotStore::new(state_file);

    match command {
        Commands::Init {
            owner,
            first_airline,
            force,
        } => {
            if store.exists() && !force {
                return Err(CliError::StateExists(state_file.to_path_buf()));
            }
            let surety = FlightSurety::from_config(owner.into(), first_airline.into(), config)?;
            store.save(&surety)?;
            println!(
                "{} ledger at {}",
                "Deployed".green().bold(),
                state_file.display()
            );
            return Ok(());
        }
        Commands::Flights => return print_flights(&open(config, &store)?),
        Commands::Queue => return print_queue(&open(config, &store)?),
        Commands::Status => return print_status(&open(config, &store)?, &store),
        Commands::Demo {
            passengers,
            oracles,
        } => return run_demo(config, passengers, oracles).map(|_| ()),
        _ => {}
    }

    let surety = open(config, &store)?;
    apply(&surety, command)?;
    store.save(&surety)?;
    Ok(())
}

/// Apply one mutating command to a loaded ledger
fn apply(surety: &FlightSurety, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::RegisterAirline { caller, candidate } => {
            match surety.register_airline(&Transition::new(caller), candidate.clone().into())? {
                RegistrationOutcome::Registered { committee } => println!(
                    "{} {} (committee of {})",
                    "Registered".green().bold(),
                    candidate,
                    committee
                ),
                RegistrationOutcome::Queued {
                    request_id,
                    committee_at_request,
                } => println!(
                    "{} request {} for {}; {} vote(s) needed",
                    "Queued".yellow().bold(),
                    request_id,
                    candidate,
                    committee_at_request.div_ceil(2)
                ),
                RegistrationOutcome::Ignored => {
                    println!("{} caller is not a registered airline", "Ignored:".yellow())
                }
            }
        }
        Commands::Approve { caller, request_id } => {
            match surety.approve_registration(&Transition::new(caller), request_id)? {
                VoteOutcome::Recorded { votes, required } => {
                    println!("{} {}/{} votes", "Vote recorded:".green(), votes, required)
                }
                VoteOutcome::Approved {
                    candidate,
                    committee,
                    ..
                } => println!(
                    "{} {} (committee of {})",
                    "Approved".green().bold(),
                    candidate,
                    committee
                ),
                VoteOutcome::DuplicateVote { votes } => {
                    println!("{} already voted ({} votes)", "Ignored:".yellow(), votes)
                }
                VoteOutcome::AlreadyApproved => {
                    println!("{} request already approved", "Ignored:".yellow())
                }
            }
        }
        Commands::Fund { caller, amount } => {
            let total = surety.fund(&Transition::new(caller.clone()).with_value(amount))?;
            println!("{} {} has funded {}", "Funded:".green(), caller, total);
        }
        Commands::RegisterFlight {
            caller,
            designator,
            timestamp,
            value,
        } => {
            let timestamp = timestamp.unwrap_or_else(current_time);
            let key = surety.register_flight(
                &Transition::new(caller).with_value(value),
                &designator,
                timestamp,
            )?;
            println!("{} {}", "Flight registered:".green(), key);
        }
        Commands::Buy {
            caller,
            airline,
            designator,
            timestamp,
            amount,
        } => {
            let total = surety.buy(
                &Transition::new(caller).with_value(amount),
                &airline.into(),
                &designator,
                timestamp,
            )?;
            println!("{} insured for {}", "Purchased:".green(), total);
        }
        Commands::FetchStatus {
            caller,
            airline,
            designator,
            timestamp,
        } => {
            let airline = AccountId::from(airline);
            let index = surety.fetch_flight_status(
                &Transition::new(caller),
                &airline,
                &designator,
                timestamp,
            )?;
            let holders = surety.oracle_holders(index);
            println!(
                "{} index {} ({} oracle(s) hold it)",
                "Requested:".green(),
                index,
                holders.len()
            );
            if holders.len() < surety.parameters().oracle_quorum {
                warn!("Index {} cannot reach quorum with current oracles", index);
            }
        }
        Commands::Respond {
            caller,
            index,
            airline,
            designator,
            timestamp,
            status,
        } => {
            let outcome = surety.submit_oracle_response(
                &Transition::new(caller),
                index,
                &airline.into(),
                &designator,
                timestamp,
                status,
            )?;
            print_response(&outcome);
        }
        Commands::Pay { caller } => {
            let amount = surety.pay(&Transition::new(caller.clone()))?;
            println!("{} {} to {}", "Paid".green().bold(), amount, caller);
        }
        Commands::RegisterOracle { caller, fee } => {
            let indexes = surety.register_oracle(&Transition::new(caller).with_value(fee))?;
            println!("{} indexes {:?}", "Oracle registered:".green(), indexes);
        }
        Commands::Pause { caller } => {
            surety.set_operating_status(&Transition::new(caller), false)?;
            println!("{}", "Ledger paused".yellow().bold());
        }
        Commands::Resume { caller } => {
            surety.set_operating_status(&Transition::new(caller), true)?;
            println!("{}", "Ledger resumed".green().bold());
        }
        Commands::Init { .. }
        | Commands::Flights
        | Commands::Queue
        | Commands::Status
        | Commands::Demo { .. } => {}
    }
    Ok(())
}

fn print_response(outcome: &ResponseOutcome) {
    match outcome {
        ResponseOutcome::Recorded {
            status,
            count,
            required,
        } => println!("{} {} ({}/{})", "Report recorded:".green(), status, count, required),
        ResponseOutcome::Finalized { status, credited } => {
            println!("{} {}", "Flight finalized:".green().bold(), status);
            for credit in credited {
                println!("  credited {} to {}", credit.amount, credit.passenger);
            }
        }
        ResponseOutcome::AlreadyFinalized => {
            println!("{} request already finalized", "Ignored:".yellow())
        }
        ResponseOutcome::DuplicateResponse => {
            println!("{} oracle already reported", "Ignored:".yellow())
        }
    }
}

fn print_flights(surety: &FlightSurety) -> Result<(), CliError> {
    let flights = surety.flight_list();
    if flights.is_empty() {
        println!("No flights registered");
        return Ok(());
    }

    let mut table = Table::new();
    table.add_row(row![b->"Airline", b->"Flight", b->"Departure", b->"Status", b->"Insured"]);
    for flight in flights {
        let insured = flight.insured_total()?;
        let status = if flight.status == FlightStatus::OpenForPurchase {
            flight.status.to_string().green()
        } else if flight.status.is_qualifying() {
            flight.status.to_string().red()
        } else {
            flight.status.to_string().normal()
        };
        table.add_row(row![
            flight.key.airline,
            flight.key.designator,
            format_timestamp(flight.key.timestamp),
            status,
            insured
        ]);
    }
    table.printstd();
    Ok(())
}

fn print_queue(surety: &FlightSurety) -> Result<(), CliError> {
    let queue = surety.registration_queue();
    if queue.is_empty() {
        println!("No registration requests");
        return Ok(());
    }

    let mut table = Table::new();
    table.add_row(row![b->"Id", b->"Airline", b->"Status", b->"Votes"]);
    for entry in queue {
        let votes = surety
            .registration_request(entry.id)
            .map(|r| format!("{}/{}", r.vote_count(), r.votes_required()))
            .unwrap_or_default();
        table.add_row(row![entry.id, entry.airline, format!("{:?}", entry.status), votes]);
    }
    table.printstd();
    Ok(())
}

fn print_status(surety: &FlightSurety, store: &SnapshotStore) -> Result<(), CliError> {
    let block = surety.block();
    let credit = surety.outstanding_credit()?;
    let operational = if surety.is_operational() {
        "operational".green()
    } else {
        "paused".red()
    };

    let mut table = Table::new();
    table.add_row(row![b->"Owner", surety.owner()]);
    table.add_row(row![b->"Status", operational]);
    table.add_row(row![b->"Committee", surety.committee()]);
    table.add_row(row![b->"Fund pool", surety.total_fund()]);
    table.add_row(row![b->"Outstanding credit", credit]);
    table.add_row(row![b->"Oracles", surety.oracles().len()]);
    table.add_row(row![b->"Oracle fees", surety.oracle_fees()]);
    table.add_row(row![b->"Open requests", surety.open_requests().len()]);
    table.add_row(row![
        b->"Block",
        format!("{} ({}s ago)", block.height, time_since(block.timestamp))
    ]);
    table.add_row(row![b->"State file", store.path().display()]);
    table.printstd();
    Ok(())
}

/// Deploy a ledger in memory, insure passengers on one flight, let in-process oracles settle it
/// as late, then pay everyone out. Returns the settled ledger.
fn run_demo(
    config: &SuretyConfig,
    passengers: u32,
    oracles: u32,
) -> Result<FlightSurety, CliError> {
    let mut params = config.parameters.clone();
    // A quorum larger than the oracle set could never be reached.
    params.oracle_quorum = params.oracle_quorum.min(oracles as usize).max(1);

    let seed = config.index_seed.unwrap_or(42);
    let owner = AccountId::new("owner");
    let airline = AccountId::new("airline-1");
    let surety = FlightSurety::deploy(
        owner,
        airline.clone(),
        params.clone(),
        Box::new(ChaChaIndexSource::from_seed(seed)),
    )?;

    println!("{}", "FlightSure payout scenario".green().bold());
    surety.fund(&Transition::new(airline.clone()).with_value(params.membership_threshold))?;
    for n in 1..=oracles {
        surety.register_oracle(
            &Transition::new(format!("oracle-{}", n)).with_value(params.oracle_registration_fee),
        )?;
    }
    let departure = current_time();
    let key = surety.register_flight(&Transition::new(airline.clone()), "ND1309", departure)?;
    println!("Flight {} registered, {} oracles online", key, oracles);

    for n in 1..=passengers {
        surety.buy(
            &Transition::new(format!("passenger-{}", n)).with_value(params.purchase_cap),
            &airline,
            &key.designator,
            departure,
        )?;
    }
    println!("{} passenger(s) insured for {} each", passengers, params.purchase_cap);

    let mut events = surety.subscribe();
    let mut finalized = None;
    for attempt in 1..=20 {
        surety.fetch_flight_status(
            &Transition::new("passenger-1"),
            &airline,
            &key.designator,
            departure,
        )?;
        loop {
            let event = match events.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => break,
                // Settling a crowded flight can outrun the channel; the history still has it.
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!("Event stream lagged, skipped {} event(s)", skipped);
                    continue;
                }
                Err(TryRecvError::Closed) => {
                    return Err(CliError::Demo("event stream closed".to_string()))
                }
            };
            let SuretyEvent::OracleRequest { index, .. } = event.event else {
                continue;
            };
            info!("Attempt {}: oracles asked on index {}", attempt, index);
            for oracle in surety.oracle_holders(index) {
                let outcome = surety.submit_oracle_response(
                    &Transition::new(oracle),
                    index,
                    &airline,
                    &key.designator,
                    departure,
                    FlightStatus::LateAirline.code(),
                )?;
                if let ResponseOutcome::Finalized { .. } = outcome {
                    print_response(&outcome);
                    finalized = Some(outcome);
                }
            }
        }
        if finalized.is_some() {
            break;
        }
    }
    if finalized.is_none() {
        return Err(CliError::Demo("no index gathered a quorum of oracles".to_string()));
    }

    let mut table = Table::new();
    table.add_row(row![b->"Passenger", b->"Credit", b->"Paid", b->"Pool after"]);
    for n in 1..=passengers {
        let passenger = AccountId::new(format!("passenger-{}", n));
        let credit = surety.refund(&passenger);
        let paid = match surety.pay(&Transition::new(passenger.clone())) {
            Ok(amount) => amount.to_string().green(),
            Err(SuretyError::InsufficientPool { .. }) => "insufficient pool".red(),
            Err(e) => return Err(e.into()),
        };
        table.add_row(row![passenger, credit, paid, surety.total_fund()]);
    }
    table.printstd();
    Ok(surety)
}
