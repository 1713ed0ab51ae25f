//! CLI argument definitions using clap.

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueHint};
use coldstore_core::{HorizonPolicy, DEFAULT_GRACE_DAYS};
use std::path::PathBuf;

/// Allocate biological samples to refrigerated tray slots.
#[derive(Parser, Debug)]
#[command(name = "coldstore")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// SQLite database file (created and migrated on first use)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub db: PathBuf,

    /// Absolute directory for rotated log files (default: stderr)
    #[arg(long, global = true)]
    pub log_dir: Option<String>,

    /// trace|debug|info|warn|error
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Days added to a sample's expiration when a new tray is created
    #[arg(long, global = true, default_value_t = DEFAULT_GRACE_DAYS)]
    pub grace_days: u32,

    /// Tray horizon comparison: inclusive (>=) or strict (>)
    #[arg(long, global = true, default_value = "inclusive")]
    pub horizon_policy: HorizonPolicy,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List sample-kind labels ordered by id
    Kinds,

    /// Register a sample kind
    AddKind {
        id: i64,
        label: String,
        /// Validity period in days
        days: u32,
    },

    /// Register a sample; expiration is creation date + kind validity
    CreateSample {
        id: i64,
        kind: i64,
        /// Creation date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        on: Option<NaiveDate>,
    },

    /// Show a sample and where it is stored
    ShowSample { id: i64 },

    /// Place a sample on a tray of the given diameter
    Allocate { sample: i64, diameter: i64 },

    /// Remove all places of a tray and the samples they hold
    ClearTray { tray: i64 },

    /// Create an empty tray with numbered places
    ProvisionTray {
        diameter: i64,
        /// Capacity in places
        capacity: u32,
        /// Horizon (YYYY-MM-DD); omit for an unbounded tray
        #[arg(long)]
        horizon: Option<NaiveDate>,
    },

    /// List trays
    Trays,

    /// List places of a tray
    Places { tray: i64 },
}
