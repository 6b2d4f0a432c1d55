//! Serve command - run the upload server.

use std::path::PathBuf;
use std::sync::Arc;

use colored::Colorize;

use super::load_sentry;
use crate::server::{app, state::AppState};

pub fn run(
    port: u16,
    no_open: bool,
    model_dir: Option<PathBuf>,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    // Fail before binding if the bundle is unusable.
    let sentry = load_sentry(model_dir)?;
    let summary = sentry.bundle().summary();
    let state = AppState::new(Arc::new(sentry));

    // Print server info
    let url = format!("http://localhost:{}", port);
    println!();
    println!(
        "{} {}",
        "Starting prediction server at".cyan().bold(),
        url.white().bold()
    );
    println!();
    if let Some(source) = &summary.source {
        println!("  Model: {}", source.display());
    }
    println!(
        "  Features: {}",
        summary
            .features
            .as_ref()
            .map(|f| f.len().to_string())
            .unwrap_or_else(|| "unrecorded (legacy mode)".to_string())
    );
    if verbose {
        println!("  Classes: {}", summary.classes.join(", "));
    }
    println!();
    println!("Press {} to stop the server", "Ctrl+C".yellow().bold());
    println!();

    // Open browser if requested
    if !no_open {
        if let Err(e) = open::that(&url) {
            eprintln!("{} Could not open browser: {}", "Warning:".yellow(), e);
        }
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        tokio::spawn(async {
            tokio::signal::ctrl_c().await.ok();
            println!();
            println!("{}", "Shutting down...".yellow());
            std::process::exit(0);
        });

        app::run_server(state, port).await
    })?;

    Ok(())
}
