//! exo-search stats - Index and backend statistics

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::{emit_robot, robot_ok};
use crate::error::Result;

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Build the index before reporting
    #[arg(long)]
    pub refresh: bool,
}

pub fn run(ctx: &AppContext, args: &StatsArgs) -> Result<()> {
    if args.refresh {
        ctx.engine.preload();
    }
    let stats = ctx.engine.stats();

    if ctx.robot_mode {
        return emit_robot(&robot_ok(&stats));
    }

    println!("{}", "Search index".bold());
    println!("  database:       {}", ctx.db_path.display());
    println!("  listings:       {}", stats.listings);
    println!("  embedded:       {}", stats.embedded);
    println!("  vocabulary:     {}", stats.vocabulary);
    println!("  lexical docs:   {}", stats.lexical_docs);
    println!("  rebuilds:       {}", stats.rebuilds);
    println!("  cached queries: {}", stats.query_cache_entries);
    println!("  embedder:       {}", stats.embedder.cyan());
    println!("  re-ranker:      {}", stats.reranker.cyan());
    if stats.rebuilds == 0 {
        println!();
        println!("{} index not built yet; pass --refresh", "!".yellow());
    }
    Ok(())
}
