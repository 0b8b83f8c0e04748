//! exo-search preload - Warm up backends and build the index

use std::time::Instant;

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::{emit_robot, robot_ok};
use crate::error::Result;

#[derive(Args, Debug)]
pub struct PreloadArgs {}

pub fn run(ctx: &AppContext, _args: &PreloadArgs) -> Result<()> {
    let started = Instant::now();
    ctx.engine.preload();
    let stats = ctx.engine.stats();
    let elapsed_ms = started.elapsed().as_millis();

    if ctx.robot_mode {
        return emit_robot(&robot_ok(serde_json::json!({
            "elapsed_ms": elapsed_ms,
            "stats": stats,
        })));
    }

    println!(
        "{} Preloaded {} listings ({} embedded) in {}ms",
        "✓".green(),
        stats.listings.to_string().bold(),
        stats.embedded,
        elapsed_ms
    );
    println!(
        "  embedder: {}, re-ranker: {}",
        stats.embedder.cyan(),
        stats.reranker.cyan()
    );
    Ok(())
}
