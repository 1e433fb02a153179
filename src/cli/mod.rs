pub mod combine;
pub mod config;
pub mod dashboard;
pub mod rules;
pub mod series;
pub mod summary;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::assoc::BasketMode;
use crate::chart::range::RangeToken;
use crate::error::Result;
use crate::importer;
use crate::models::Transaction;
use crate::reports;
use crate::settings::{shellexpand_path, Settings};

#[derive(Parser)]
#[command(
    name = "findash",
    version,
    about = "Personal finance dashboard: balance history, spending summaries and association rules."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open the interactive dashboard (default).
    Dashboard {
        /// Transactions CSV (default: the configured data file)
        #[arg(long)]
        file: Option<String>,
        /// Initial range: all, 6m or 1m
        #[arg(long, default_value = "all")]
        range: RangeToken,
        /// Only rows matching this text in any column
        #[arg(long)]
        search: Option<String>,
        /// Only these categories (repeatable)
        #[arg(long = "category")]
        categories: Vec<String>,
    },
    /// Print the running balance series.
    Series {
        #[arg(long)]
        file: Option<String>,
        #[arg(long, default_value = "all")]
        range: RangeToken,
        /// Month: YYYY-MM (instead of --range)
        #[arg(long)]
        month: Option<String>,
        /// Downsample to at most this many points
        #[arg(long)]
        points: Option<usize>,
    },
    /// Mine spending association rules.
    Rules {
        #[arg(long)]
        file: Option<String>,
        /// Basket tokens: cat, item or dow
        #[arg(long, default_value = "cat")]
        mode: BasketMode,
        #[arg(long = "min-support", default_value_t = crate::assoc::DEFAULT_MIN_SUPPORT)]
        min_support: f64,
        #[arg(long = "min-confidence", default_value_t = crate::assoc::DEFAULT_MIN_CONFIDENCE)]
        min_confidence: f64,
        /// Month: YYYY-MM
        #[arg(long, conflicts_with = "range")]
        month: Option<String>,
        #[arg(long)]
        range: Option<RangeToken>,
    },
    /// Income and expense summary.
    Summary {
        #[arg(long)]
        file: Option<String>,
        /// Month: YYYY-MM
        #[arg(long, conflicts_with = "range")]
        month: Option<String>,
        #[arg(long)]
        range: Option<RangeToken>,
    },
    /// Merge the Debit/ and Credit/ bank exports into one transactions CSV.
    Combine {
        /// Folder holding Debit/ and Credit/ (default: the data file's folder)
        #[arg(long)]
        dir: Option<String>,
        /// Output CSV (default: the data file, or combined_transactions.csv in --dir)
        #[arg(long)]
        output: Option<String>,
    },
    /// Show or change settings.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the current settings.
    Show,
    /// Change one or more settings.
    Set {
        /// Transactions CSV path
        #[arg(long)]
        file: Option<String>,
        #[arg(long = "initial-balance")]
        initial_balance: Option<f64>,
        /// dark or light
        #[arg(long)]
        theme: Option<String>,
        #[arg(long = "user-name")]
        user_name: Option<String>,
        /// Hide amounts: on or off
        #[arg(long)]
        blur: Option<String>,
    },
    /// Manage ignore keywords (matched against Tag and Name).
    Ignore {
        #[command(subcommand)]
        command: IgnoreCommands,
    },
}

#[derive(Subcommand)]
pub enum IgnoreCommands {
    Add { keyword: String },
    Remove { keyword: String },
    List,
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

pub(crate) fn data_path(file: Option<&str>, settings: &Settings) -> PathBuf {
    match file {
        Some(f) => PathBuf::from(shellexpand_path(f)),
        None => settings.data_path(),
    }
}

/// Load the CSV and drop ignored rows.
pub(crate) fn load_rows(file: Option<&str>, settings: &Settings) -> Result<Vec<Transaction>> {
    let path = data_path(file, settings);
    let rows = importer::load_transactions(&path)?;
    Ok(importer::apply_ignores(&rows, &settings.ignores))
}

/// Rows for a month, a trailing range, or everything.
pub(crate) fn period_rows(
    rows: &[Transaction],
    month: Option<&str>,
    range: Option<RangeToken>,
) -> (Vec<Transaction>, String) {
    match (month, range) {
        (Some(m), _) => (reports::rows_in_month(rows, m), m.to_string()),
        (None, Some(r)) => (reports::rows_in_range(rows, r), r.label().to_string()),
        (None, None) => (rows.to_vec(), RangeToken::All.label().to_string()),
    }
}
