//! Command implementations

pub mod config;
pub mod preload;
pub mod search;
pub mod stats;

use crate::app::AppContext;
use crate::cli::Commands;
use crate::error::Result;

pub fn run(ctx: &AppContext, command: &Commands) -> Result<()> {
    match command {
        Commands::Search(args) => search::run(ctx, args),
        Commands::Stats(args) => stats::run(ctx, args),
        Commands::Preload(args) => preload::run(ctx, args),
        Commands::Config(args) => config::run(ctx, args),
    }
}
