mod commands;
mod config;
mod diagnostics;
mod document;
mod eligibility;
mod error;
mod ledger;
mod maintainer;
mod pattern;
mod rewrite;
mod scanner;
mod selection;
mod types;
mod vault;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::commands::Options;
use crate::types::LinkKind;

#[derive(Parser)]
#[command(name = "linkmend", about = "Keep note links pointing at the right note")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Note treated as the focused document for bare block ids
    #[arg(long, global = true)]
    context: Option<String>,
    /// Rewrite block links even when the block still exists at its origin
    #[arg(long, global = true)]
    force: bool,
    /// Do not write the change log
    #[arg(long, global = true)]
    no_log: bool,
    /// Vault root
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,
    /// Apply changes without asking
    #[arg(long, short = 'y', global = true)]
    yes: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Retarget every reference to the block in SELECTION at NEW
    Block {
        /// `note#^id` or `^id`
        selection: String,
        /// Note the block now lives in
        new: String,
    },
    /// Retarget links to OLD (optionally with an anchor) at NEW
    Search {
        /// Note the links point at now
        old: String,
        /// Note the links should point at
        new: String,
        /// Block id or heading text
        #[arg(long)]
        anchor: Option<String>,
        /// plain, block, or heading (default: block with --anchor, else plain)
        #[arg(long)]
        kind: Option<LinkKind>,
    },
}

/// Install the stderr log layer, filtered by `LINKMEND_LOG`.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("LINKMEND_LOG").unwrap_or_else(|_| return EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let options = Options {
        context: cli.context,
        force: cli.force,
        no_log: cli.no_log,
        root: cli.root,
        yes: cli.yes,
    };

    let result = match cli.command {
        Commands::Block { selection, new } => commands::block(&options, &selection, &new),
        Commands::Search { old, new, anchor, kind } => {
            commands::search(&options, &old, &new, anchor.as_deref(), kind)
        },
    };

    return match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            diagnostics::print_error(&e);
            ExitCode::FAILURE
        },
    };
}
