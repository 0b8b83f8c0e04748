//! CLI module - Command-line interface definitions and handlers
//!
//! Uses clap v4 with derive macros for argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod commands;
pub mod output;

/// Hybrid search over marketplace listings
#[derive(Parser, Debug)]
#[command(name = "exo-search")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Emit JSON for machine consumption
    #[arg(long, global = true)]
    pub robot: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file path (default: ~/.config/exo-search/config.toml)
    #[arg(long, global = true, env = "EXO_CONFIG")]
    pub config: Option<PathBuf>,

    /// Listing database (overrides [store].database)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Search active listings
    Search(commands::search::SearchArgs),

    /// Show index and backend statistics
    Stats(commands::stats::StatsArgs),

    /// Warm up backends and build the index
    Preload(commands::preload::PreloadArgs),

    /// Show the effective configuration
    Config(commands::config::ConfigArgs),
}
