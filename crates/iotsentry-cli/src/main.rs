//! iotsentry CLI - attack-type classification for IoT network traffic.

mod cli;
mod commands;
mod server;
mod web;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Predict {
            file,
            output,
            format,
            preview,
            json,
        } => commands::predict::run(
            file,
            output,
            format,
            preview,
            json,
            cli.model_dir,
        ),

        Commands::Schema { json } => commands::schema::run(json, cli.model_dir),

        Commands::Serve { port, no_open } => {
            commands::serve::run(port, no_open, cli.model_dir, cli.verbose)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Log to stderr so stdout stays clean for results. `RUST_LOG` overrides.
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "iotsentry=debug,iotsentry_cli=debug"
    } else {
        "iotsentry=info,iotsentry_cli=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
