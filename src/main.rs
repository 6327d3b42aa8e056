//! assetlink - serve static assets under content-hashed permalinks.

use std::sync::Arc;

use anyhow::{Context, Result};
use assetlink::cli::{Cli, Commands};
use assetlink::config::Config;
use assetlink::serve::http;
use assetlink::{log, logger, state};
use clap::{ColorChoice, Parser};
use owo_colors::OwoColorize;

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    state::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let mut config = Config::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;

    match &cli.command {
        Commands::Serve { interface, port } => {
            config.apply_serve_options(*interface, *port);
            serve(&config)
        }
        Commands::Routes => routes(&config),
    }
}

fn serve(config: &Config) -> Result<()> {
    let gateway = Arc::new(config.gateway().context("failed to register assets")?);
    let bound = http::bind(config.serve.interface, config.serve.port)?;
    bound.run(gateway, config.serve.workers)
}

fn routes(config: &Config) -> Result<()> {
    let registry = config.registry().context("failed to register assets")?;
    let routes = registry.routes();
    if routes.is_empty() {
        log!("routes"; "no assets registered");
        return Ok(());
    }

    for route in routes {
        println!(
            "{} -> {} {}",
            route.path,
            route.permalink.bold(),
            format!("({})", route.location).dimmed()
        );
    }
    Ok(())
}
