//! exo-search config - Show the effective configuration

use clap::Args;
use colored::Colorize;

use crate::app::AppContext;
use crate::cli::output::{emit_robot, robot_ok};
use crate::error::{ExoError, Result};

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Print only the config file path
    #[arg(long)]
    pub path: bool,
}

pub fn run(ctx: &AppContext, args: &ConfigArgs) -> Result<()> {
    let path = ctx
        .config_path
        .as_ref()
        .map(|p| p.display().to_string());

    if ctx.robot_mode {
        return emit_robot(&robot_ok(serde_json::json!({
            "config_path": path,
            "database": ctx.db_path.display().to_string(),
            "config": ctx.config,
        })));
    }

    if args.path {
        println!("{}", path.unwrap_or_default());
        return Ok(());
    }

    let rendered = toml::to_string_pretty(&ctx.config)
        .map_err(|err| ExoError::Config(format!("render config: {err}")))?;
    match &path {
        Some(path) => println!("{} {}", "# config:".dimmed(), path.dimmed()),
        None => println!("{}", "# config: built-in defaults".dimmed()),
    }
    println!("{} {}", "# database:".dimmed(), ctx.db_path.display().to_string().dimmed());
    println!("{rendered}");
    Ok(())
}
