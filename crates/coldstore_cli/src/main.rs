//! `coldstore` command-line entry point.
//!
//! # Responsibility
//! - Open a database file and run one cold storage operation against it.
//! - Map service errors to a stable `error[<code>]` line and exit status 1.

mod args;

use args::{Cli, Command};
use clap::Parser;
use coldstore_core::db::open_db;
use coldstore_core::{
    default_log_level, init_logging, init_stderr_logging, AllocationConfig, CoolingService,
    SampleKind, ServiceError,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = cli.log_level.as_deref().unwrap_or(default_log_level());
    let logging = match cli.log_dir.as_deref() {
        Some(dir) => init_logging(level, dir),
        None => init_stderr_logging(level),
    };
    if let Err(message) = logging {
        eprintln!("error[logging]: {message}");
        return ExitCode::FAILURE;
    }

    let config = AllocationConfig {
        grace_days: cli.grace_days,
        horizon_policy: cli.horizon_policy,
    };

    let mut conn = match open_db(&cli.db) {
        Ok(conn) => conn,
        Err(err) => {
            eprintln!("error[db_open]: {err}");
            return ExitCode::FAILURE;
        }
    };

    match run(&mut conn, config, cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error[{}]: {err}", err.kind().code());
            ExitCode::FAILURE
        }
    }
}

fn run(
    conn: &mut rusqlite::Connection,
    config: AllocationConfig,
    command: Command,
) -> Result<(), ServiceError> {
    let mut service = CoolingService::try_new(conn, config)?;

    match command {
        Command::Kinds => {
            for label in service.list_sample_kind_labels()? {
                println!("{label}");
            }
        }
        Command::AddKind { id, label, days } => {
            service.register_sample_kind(&SampleKind {
                id,
                label,
                valid_days: days,
            })?;
            println!("sample kind {id} registered");
        }
        Command::CreateSample { id, kind, on } => {
            let sample = match on {
                Some(date) => service.create_sample_on(id, kind, date)?,
                None => service.create_sample(id, kind)?,
            };
            println!("sample {} expires {}", sample.id, sample.expiration_date);
        }
        Command::ShowSample { id } => {
            let sample = service.find_sample_by_id(id)?;
            let location = match service.find_placement(id)? {
                Some(placement) => {
                    format!("tray {} place {}", placement.tray_id, placement.place_no)
                }
                None => "unplaced".to_string(),
            };
            println!(
                "sample {} kind {} expires {} ({location})",
                sample.id, sample.kind_id, sample.expiration_date
            );
        }
        Command::Allocate { sample, diameter } => {
            let placement = service.allocate_sample(sample, diameter)?;
            println!(
                "sample {} -> tray {} place {}",
                placement.sample_id, placement.tray_id, placement.place_no
            );
        }
        Command::ClearTray { tray } => {
            let outcome = service.clear_tray(tray)?;
            println!(
                "tray {tray} cleared: {} places, {} samples removed",
                outcome.places_removed, outcome.samples_removed
            );
        }
        Command::ProvisionTray {
            diameter,
            horizon,
            capacity,
        } => {
            let tray = service.provision_tray(diameter, horizon, capacity)?;
            println!("tray {} provisioned with {capacity} places", tray.id);
        }
        Command::Trays => {
            for tray in service.list_trays()? {
                let horizon = tray
                    .horizon
                    .map(|date| date.to_string())
                    .unwrap_or_else(|| "unbounded".to_string());
                println!("{}\tdiameter={}\thorizon={horizon}", tray.id, tray.diameter);
            }
        }
        Command::Places { tray } => {
            for place in service.list_places(tray)? {
                let occupant = place
                    .sample_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!("{}\t{occupant}", place.place_no);
            }
        }
    }

    Ok(())
}
