// Claude Code Router Switcher - config editor for claude-code-router
//
// Edits ~/.claude-code-router/config.json from the command line: routing
// assignments, providers and their model lists.
//
// Architecture:
// - Document: typed view of the router document with layout-preserving writes
// - Probe: endpoint shape detection and model catalog discovery (reqwest)
// - Reconcile: refreshes stored model lists against live catalogs
// - CLI (clap): one subcommand per store operation

mod cli;
mod config;
mod document;
mod logging;
mod probe;
mod reconcile;
mod restart;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Session};
use config::Config;
use document::ConfigStore;
use probe::{BlockingHttpClient, EndpointProbe};

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config)?;

    // Guard flushes file logs on exit
    let _log_guard = logging::init(&config.logging, cli.verbose);

    let client = BlockingHttpClient::new(config.probe.timeout())?;
    let stdin = std::io::stdin();

    let mut session = Session {
        store: ConfigStore::new(config.document_path.clone()),
        config,
        probe: EndpointProbe::new(client),
        input: stdin.lock(),
        out: std::io::stdout(),
    };
    tracing::debug!(document = %session.store.path().display(), "Loaded settings");
    session.run(cli.command)
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
