mod commands;

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use grain::cli::{Cli, Commands};
use grain::config::{Config, ConfigOverrides};
use grain::error::Result;

use commands::ask::cmd_ask;
use commands::chat::cmd_chat;
use commands::ingest::cmd_ingest;
use commands::status::cmd_status;

fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Logs go to stderr; `RUST_LOG` wins over `--verbose`
fn init_tracing(verbose: bool) {
    let default = if verbose { "warn,grain=info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let mut overrides = ConfigOverrides::default();

    match cli.command {
        Commands::Ingest {
            paths,
            chunk_size,
            chunk_overlap,
            chunking,
            providers,
        } => {
            paths.apply(&mut overrides);
            chunking.apply(&mut overrides);
            providers.apply(&mut overrides);
            overrides.chunk_size = chunk_size;
            overrides.chunk_overlap = chunk_overlap;
            cmd_ingest(&Config::load(&overrides)?)
        }
        Commands::Ask {
            query,
            paths,
            retrieval,
            providers,
        } => {
            paths.apply(&mut overrides);
            retrieval.apply(&mut overrides);
            providers.apply(&mut overrides);
            cmd_ask(Config::load(&overrides)?, &query, retrieval.source, cli.verbose)
        }
        Commands::Chat {
            paths,
            retrieval,
            providers,
            no_history,
        } => {
            paths.apply(&mut overrides);
            retrieval.apply(&mut overrides);
            providers.apply(&mut overrides);
            cmd_chat(
                Config::load(&overrides)?,
                retrieval.source,
                no_history,
                cli.verbose,
            )
        }
        Commands::Status { paths } => {
            paths.apply(&mut overrides);
            cmd_status(&Config::load(&overrides)?)
        }
    }
}
