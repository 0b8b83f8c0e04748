//! exo-search search - Rank active listings against a query

use clap::Args;
use colored::Colorize;
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{emit_robot, robot_ok};
use crate::error::Result;
use crate::search::{MatchType, SearchHit, SearchOptions};

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Search query
    pub query: String,

    /// Maximum number of results (default: [search].top_k)
    #[arg(long, short = 'k')]
    pub top_k: Option<usize>,

    /// Minimum score (default: [search].min_score)
    #[arg(long)]
    pub min_score: Option<f32>,

    /// Skip the re-ranking pass
    #[arg(long)]
    pub no_rerank: bool,
}

#[derive(Serialize)]
struct SearchReport<'a> {
    query: &'a str,
    count: usize,
    top_k: usize,
    min_score: f32,
    results: &'a [SearchHit],
}

pub fn run(ctx: &AppContext, args: &SearchArgs) -> Result<()> {
    let defaults = ctx.engine.default_options();
    let options = SearchOptions {
        top_k: args.top_k.unwrap_or(defaults.top_k),
        min_score: args.min_score.unwrap_or(defaults.min_score),
        rerank: defaults.rerank && !args.no_rerank,
    };

    let hits = ctx.engine.try_search_with(&args.query, &options)?;

    if ctx.robot_mode {
        return emit_robot(&robot_ok(SearchReport {
            query: &args.query,
            count: hits.len(),
            top_k: options.top_k,
            min_score: options.min_score,
            results: &hits,
        }));
    }

    if hits.is_empty() {
        println!(
            "{} No listings found for '{}'",
            "!".yellow(),
            args.query.cyan()
        );
        println!();
        println!("Try:");
        println!("  - Using different keywords");
        println!("  - Lowering --min-score");
        return Ok(());
    }

    println!(
        "{} results for '{}':",
        hits.len().to_string().bold(),
        args.query.cyan()
    );
    println!();

    for (i, hit) in hits.iter().enumerate() {
        let rank = format!("{}.", i + 1);
        let match_type = match hit.match_type {
            MatchType::Exact => hit.match_type.as_str().green(),
            MatchType::Hybrid => hit.match_type.as_str().blue(),
            MatchType::Semantic => hit.match_type.as_str().magenta(),
        };

        println!(
            "{:4} {} {}",
            rank.dimmed(),
            truncate_str(&hit.title, 60).bold(),
            match_type
        );
        println!(
            "     #{} (score: {:.3}, dense: {:.3}, lexical: {:.3}, ngram: {:.3})",
            hit.listing_id.to_string().dimmed(),
            hit.score,
            hit.dense,
            hit.lexical,
            hit.ngram
        );
    }

    Ok(())
}

/// Truncate on a char boundary, appending "..." when shortened.
fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    out.push_str("...");
    out
}
